//! Top-level orchestration: build the per-call pipeline, feed geometry
//! through it defensively, and deliver coverage.
//!
//! Filling wires the renderer directly. Stroking wires, innermost first:
//! renderer ← delta transform ← stroker ← (dasher) ← inverse delta
//! transform ← closed-path detector ← the feed loop, with the full
//! transform applied to input coordinates. When the transform multiplies
//! every length by one constant, the delta/inverse pair is skipped and the
//! stroke width and dash lengths are scaled instead; when it is singular,
//! the stroked shape collapses to nothing and an empty path is emitted.

use crate::alpha::MaskBuffer;
use crate::basics::{coord_in_range, Bounds, PathConsumer, PathElement, WindingRule};
use crate::context::RendererContext;
use crate::dasher::{dash_is_valid, Dasher};
use crate::filters::{ClosedPathDetector, DeltaFilter};
use crate::stroker::{StrokeParams, Stroker};
use crate::trans_affine::TransAffine;

/// Narrowest useful pen, in pixels at default sub-pixel resolution.
/// Hairline strokes use this divided by the transform's maximum scale.
pub const MIN_PEN_SIZE: f32 = 1.0 / 8.0;

// ============================================================================
// Dash configuration
// ============================================================================

/// Dash configuration handed to [`stroke_to`]. An array that fails
/// [`dash_is_valid`] silently disables dashing.
#[derive(Debug, Clone, Copy)]
pub struct DashParams<'a> {
    pub dash: &'a [f32],
    pub phase: f32,
}

// ============================================================================
// Geometry feed
// ============================================================================

/// Convert path elements into protocol calls, applying `at` and dropping
/// any segment with a coordinate outside the safe envelope (which also
/// rejects NaN and infinities). When a dropped segment leaves no open
/// subpath, the next valid endpoint opens one with an implicit `move_to`.
pub fn feed_path<I, C>(elements: I, at: Option<&TransAffine>, out: &mut C)
where
    I: IntoIterator<Item = PathElement>,
    C: PathConsumer,
{
    let tp = |x: f32, y: f32| -> (f32, f32) {
        match at {
            Some(m) => {
                let mut xd = x as f64;
                let mut yd = y as f64;
                m.transform(&mut xd, &mut yd);
                (xd as f32, yd as f32)
            }
            None => (x, y),
        }
    };

    let mut subpath_started = false;

    for el in elements {
        match el {
            PathElement::MoveTo { x, y } => {
                let (x, y) = tp(x, y);
                if coord_in_range(x) && coord_in_range(y) {
                    out.move_to(x, y);
                    subpath_started = true;
                }
            }
            PathElement::LineTo { x, y } => {
                let (x, y) = tp(x, y);
                if coord_in_range(x) && coord_in_range(y) {
                    if subpath_started {
                        out.line_to(x, y);
                    } else {
                        out.move_to(x, y);
                        subpath_started = true;
                    }
                }
            }
            PathElement::QuadTo { cx, cy, x, y } => {
                let (cx, cy) = tp(cx, cy);
                let (x, y) = tp(x, y);
                if coord_in_range(x) && coord_in_range(y) {
                    if subpath_started {
                        if coord_in_range(cx) && coord_in_range(cy) {
                            out.quad_to(cx, cy, x, y);
                        } else {
                            // valid endpoint, bad control: degrade to a line
                            out.line_to(x, y);
                        }
                    } else {
                        out.move_to(x, y);
                        subpath_started = true;
                    }
                }
            }
            PathElement::CurveTo {
                c1x,
                c1y,
                c2x,
                c2y,
                x,
                y,
            } => {
                let (c1x, c1y) = tp(c1x, c1y);
                let (c2x, c2y) = tp(c2x, c2y);
                let (x, y) = tp(x, y);
                if coord_in_range(x) && coord_in_range(y) {
                    if subpath_started {
                        if coord_in_range(c1x)
                            && coord_in_range(c1y)
                            && coord_in_range(c2x)
                            && coord_in_range(c2y)
                        {
                            out.curve_to(c1x, c1y, c2x, c2y, x, y);
                        } else {
                            out.line_to(x, y);
                        }
                    } else {
                        out.move_to(x, y);
                        subpath_started = true;
                    }
                }
            }
            PathElement::ClosePath => {
                if subpath_started {
                    out.close_path();
                }
            }
        }
    }
    out.path_done();
}

// ============================================================================
// Fill
// ============================================================================

/// Feed a filled path into the context's renderer. Returns the tight
/// output bounds (empty when nothing is covered); follow up with
/// [`crate::renderer::Renderer::produce_alphas`].
pub fn fill_to<I>(
    ctx: &mut RendererContext,
    elements: I,
    at: Option<&TransAffine>,
    winding: WindingRule,
    clip: Bounds,
) -> Bounds
where
    I: IntoIterator<Item = PathElement>,
{
    ctx.mark_dirty();
    ctx.renderer.init(clip, winding);
    let at = at.filter(|m| !m.is_identity());
    feed_path(elements, at, &mut ctx.renderer);
    ctx.mark_clean();
    ctx.renderer.bounds()
}

// ============================================================================
// Stroke
// ============================================================================

/// Feed a stroked (and optionally dashed) path into the context's
/// renderer. Returns the tight output bounds.
pub fn stroke_to<I>(
    ctx: &mut RendererContext,
    elements: I,
    at: Option<&TransAffine>,
    stroke: &StrokeParams,
    dash: Option<DashParams<'_>>,
    clip: Bounds,
) -> Bounds
where
    I: IntoIterator<Item = PathElement>,
{
    ctx.mark_dirty();
    ctx.renderer.init(clip, WindingRule::NonZero);

    let at = at.filter(|m| !m.is_identity());

    if let Some(m) = at {
        if m.is_singular() {
            // widening through a singular transform squashes the shape to
            // a line of zero area: emit a valid empty path
            ctx.renderer.move_to(0.0, 0.0);
            ctx.renderer.path_done();
            ctx.mark_clean();
            return ctx.renderer.bounds();
        }
    }

    // If every length scales by one constant, scale the pen and the dash
    // pattern instead of wrapping the stroker in transform filters.
    let mut params = *stroke;
    let mut scale = 1.0f32;
    let mut at_delta: Option<&TransAffine> = None;
    if let Some(m) = at {
        match m.uniform_scale() {
            Some(s) => {
                scale = s as f32;
                params = params.scaled(scale);
            }
            None => at_delta = Some(m),
        }
    }

    // Copy the dash pattern into the context (scaled when the shortcut
    // applies); malformed patterns disable dashing.
    let (dash_len, phase) = match dash {
        Some(d) if dash_is_valid(d.dash) => {
            let buf = ctx.dash_buffer.acquire(d.dash.len());
            for (slot, &v) in buf.iter_mut().zip(d.dash) {
                *slot = v * scale;
            }
            (d.dash.len(), d.phase * scale)
        }
        _ => (0, 0.0),
    };

    {
        let renderer = &mut ctx.renderer;
        let cpd_stack = &mut ctx.cpd_stack;
        let reverse_stack = &mut ctx.reverse_stack;
        let stroker_middle = &mut ctx.stroker_middle;
        let dash_buffer = &ctx.dash_buffer;
        let first_segments = &mut ctx.first_segments;
        let closed_path = &ctx.closed_path;

        let delta = DeltaFilter::forward(&mut *renderer, at_delta, None, 0.0, 0.0);
        let mut stroker =
            Stroker::new(delta, reverse_stack, stroker_middle, closed_path, &params);

        if dash_len > 0 {
            let dash_slice = &dash_buffer.as_slice()[..dash_len];
            let dasher = Dasher::new(&mut stroker, dash_slice, phase, first_segments);
            let inv = DeltaFilter::inverse(dasher, at_delta);
            let mut det = ClosedPathDetector::new(inv, cpd_stack, closed_path);
            feed_path(elements, at, &mut det);
        } else {
            let inv = DeltaFilter::inverse(&mut stroker, at_delta);
            let mut det = ClosedPathDetector::new(inv, cpd_stack, closed_path);
            feed_path(elements, at, &mut det);
        }
    }

    ctx.mark_clean();
    ctx.renderer.bounds()
}

// ============================================================================
// Convenience entry points
// ============================================================================

fn mask_for(ctx: &mut RendererContext, bounds: Bounds) -> Option<MaskBuffer> {
    if bounds.is_empty() {
        return None;
    }
    let mut mask = MaskBuffer::new(
        bounds.min_x,
        bounds.min_y,
        bounds.width() as u32,
        bounds.height() as u32,
    );
    ctx.renderer.produce_alphas(&mut mask);
    Some(mask)
}

/// Fill a path into a freshly allocated mask sized to its tight bounds.
/// `None` when nothing is covered.
pub fn rasterize_fill<I>(
    ctx: &mut RendererContext,
    elements: I,
    at: Option<&TransAffine>,
    winding: WindingRule,
    clip: Bounds,
) -> Option<MaskBuffer>
where
    I: IntoIterator<Item = PathElement>,
{
    let b = fill_to(ctx, elements, at, winding, clip);
    mask_for(ctx, b)
}

/// Stroke a path into a freshly allocated mask sized to its tight bounds.
pub fn rasterize_stroke<I>(
    ctx: &mut RendererContext,
    elements: I,
    at: Option<&TransAffine>,
    stroke: &StrokeParams,
    dash: Option<DashParams<'_>>,
    clip: Bounds,
) -> Option<MaskBuffer>
where
    I: IntoIterator<Item = PathElement>,
{
    let b = stroke_to(ctx, elements, at, stroke, dash, clip);
    mask_for(ctx, b)
}

/// Pen width to use for hairline strokes under `at`: the minimum pen
/// size, undone by the transform's largest stretch so it survives the
/// mapping to device space.
pub fn hairline_width(at: Option<&TransAffine>) -> f32 {
    match at {
        Some(m) => MIN_PEN_SIZE / (m.max_scale() as f32).max(f32::MIN_POSITIVE),
        None => MIN_PEN_SIZE,
    }
}

// ============================================================================
// Tests
// ============================================================================
