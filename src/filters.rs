//! Stateful filters over the path event protocol: per-vertex delta
//! transforms, closed-path detection, and a diagnostic tracer.
//!
//! Filters own their downstream consumer (usually a `&mut` borrow of the
//! next stage) and are rebuilt cheaply per call; the only heap-backed
//! state — the closed-path detector's segment stack — lives in the
//! renderer context and is borrowed in.

use std::cell::Cell;

use crate::array::PolyStack;
use crate::basics::{ClipRect, PathConsumer};
use crate::trans_affine::TransAffine;

// ============================================================================
// Delta transform filters
// ============================================================================

/// Per-vertex axis scale: the cheap path when the matrix has no shear.
pub struct DeltaScaleFilter<C: PathConsumer> {
    out: C,
    sx: f32,
    sy: f32,
}

impl<C: PathConsumer> DeltaScaleFilter<C> {
    pub fn new(out: C, sx: f32, sy: f32) -> Self {
        Self { out, sx, sy }
    }
}

impl<C: PathConsumer> PathConsumer for DeltaScaleFilter<C> {
    fn move_to(&mut self, x: f32, y: f32) {
        self.out.move_to(x * self.sx, y * self.sy);
    }
    fn line_to(&mut self, x: f32, y: f32) {
        self.out.line_to(x * self.sx, y * self.sy);
    }
    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        self.out
            .quad_to(cx * self.sx, cy * self.sy, x * self.sx, y * self.sy);
    }
    fn curve_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        self.out.curve_to(
            c1x * self.sx,
            c1y * self.sy,
            c2x * self.sx,
            c2y * self.sy,
            x * self.sx,
            y * self.sy,
        );
    }
    fn close_path(&mut self) {
        self.out.close_path();
    }
    fn path_done(&mut self) {
        self.out.path_done();
    }
}

/// Per-vertex full 2x2 multiply for general linear transforms.
pub struct DeltaTransformFilter<C: PathConsumer> {
    out: C,
    mxx: f32,
    mxy: f32,
    myx: f32,
    myy: f32,
}

impl<C: PathConsumer> DeltaTransformFilter<C> {
    pub fn new(out: C, mxx: f32, mxy: f32, myx: f32, myy: f32) -> Self {
        Self {
            out,
            mxx,
            mxy,
            myx,
            myy,
        }
    }

    #[inline]
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.mxx + y * self.mxy,
            x * self.myx + y * self.myy,
        )
    }
}

impl<C: PathConsumer> PathConsumer for DeltaTransformFilter<C> {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.out.move_to(x, y);
    }
    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.out.line_to(x, y);
    }
    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        let (cx, cy) = self.map(cx, cy);
        let (x, y) = self.map(x, y);
        self.out.quad_to(cx, cy, x, y);
    }
    fn curve_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        let (c1x, c1y) = self.map(c1x, c1y);
        let (c2x, c2y) = self.map(c2x, c2y);
        let (x, y) = self.map(x, y);
        self.out.curve_to(c1x, c1y, c2x, c2y, x, y);
    }
    fn close_path(&mut self) {
        self.out.close_path();
    }
    fn path_done(&mut self) {
        self.out.path_done();
    }
}

/// Runtime-selected delta transform stage. The set of shapes is small and
/// closed, so a tagged union beats dynamic dispatch here.
pub enum DeltaFilter<C: PathConsumer> {
    Identity(C),
    Scale(DeltaScaleFilter<C>),
    General(DeltaTransformFilter<C>),
}

impl<C: PathConsumer> DeltaFilter<C> {
    /// Install the cheapest filter equivalent to the 2x2 part of `at`.
    ///
    /// When a device clip rectangle is active, it is rewritten in the same
    /// step — translated by the renderer offset, then mapped into the
    /// pre-transform coordinate space — so clip tests downstream of the
    /// filter stay valid.
    pub fn forward(
        out: C,
        at: Option<&TransAffine>,
        clip: Option<&mut ClipRect>,
        rdr_off_x: f32,
        rdr_off_y: f32,
    ) -> Self {
        let at = match at {
            None => return DeltaFilter::Identity(out),
            Some(at) => at,
        };
        if at.is_axis_scale() {
            if at.sx == 1.0 && at.sy == 1.0 {
                return DeltaFilter::Identity(out);
            }
            if let Some(clip) = clip {
                adjust_clip_offset(clip, rdr_off_x, rdr_off_y);
                adjust_clip_scale(clip, at.sx, at.sy);
            }
            DeltaFilter::Scale(DeltaScaleFilter::new(out, at.sx as f32, at.sy as f32))
        } else {
            if let Some(clip) = clip {
                adjust_clip_offset(clip, rdr_off_x, rdr_off_y);
                adjust_clip_inverse_delta(clip, at);
            }
            DeltaFilter::General(DeltaTransformFilter::new(
                out,
                at.sx as f32,
                at.shx as f32,
                at.shy as f32,
                at.sy as f32,
            ))
        }
    }

    /// Install the exact inverse of [`DeltaFilter::forward`] for the same
    /// matrix; composing the two is a no-op up to rounding.
    pub fn inverse(out: C, at: Option<&TransAffine>) -> Self {
        let at = match at {
            None => return DeltaFilter::Identity(out),
            Some(at) => at,
        };
        if at.is_axis_scale() {
            if at.sx == 1.0 && at.sy == 1.0 {
                return DeltaFilter::Identity(out);
            }
            DeltaFilter::Scale(DeltaScaleFilter::new(
                out,
                (1.0 / at.sx) as f32,
                (1.0 / at.sy) as f32,
            ))
        } else {
            let det = at.determinant();
            DeltaFilter::General(DeltaTransformFilter::new(
                out,
                (at.sy / det) as f32,
                (-at.shx / det) as f32,
                (-at.shy / det) as f32,
                (at.sx / det) as f32,
            ))
        }
    }
}

fn adjust_clip_offset(clip: &mut ClipRect, off_x: f32, off_y: f32) {
    clip[0] += off_y;
    clip[1] += off_y;
    clip[2] += off_x;
    clip[3] += off_x;
}

fn adjust_clip_scale(clip: &mut ClipRect, sx: f64, sy: f64) {
    clip[0] = (clip[0] as f64 / sy) as f32;
    clip[1] = (clip[1] as f64 / sy) as f32;
    clip[2] = (clip[2] as f64 / sx) as f32;
    clip[3] = (clip[3] as f64 / sx) as f32;
}

fn adjust_clip_inverse_delta(clip: &mut ClipRect, at: &TransAffine) {
    let det = at.determinant();
    let imxx = at.sy / det;
    let imxy = -at.shx / det;
    let imyx = -at.shy / det;
    let imyy = at.sx / det;

    let corners = [
        (clip[2] as f64, clip[0] as f64),
        (clip[3] as f64, clip[0] as f64),
        (clip[2] as f64, clip[1] as f64),
        (clip[3] as f64, clip[1] as f64),
    ];

    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for (cx, cy) in corners {
        let x = cx * imxx + cy * imxy;
        let y = cx * imyx + cy * imyy;
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }

    clip[0] = y_min as f32;
    clip[1] = y_max as f32;
    clip[2] = x_min as f32;
    clip[3] = x_max as f32;
}

impl<C: PathConsumer> PathConsumer for DeltaFilter<C> {
    fn move_to(&mut self, x: f32, y: f32) {
        match self {
            DeltaFilter::Identity(c) => c.move_to(x, y),
            DeltaFilter::Scale(f) => f.move_to(x, y),
            DeltaFilter::General(f) => f.move_to(x, y),
        }
    }
    fn line_to(&mut self, x: f32, y: f32) {
        match self {
            DeltaFilter::Identity(c) => c.line_to(x, y),
            DeltaFilter::Scale(f) => f.line_to(x, y),
            DeltaFilter::General(f) => f.line_to(x, y),
        }
    }
    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        match self {
            DeltaFilter::Identity(c) => c.quad_to(cx, cy, x, y),
            DeltaFilter::Scale(f) => f.quad_to(cx, cy, x, y),
            DeltaFilter::General(f) => f.quad_to(cx, cy, x, y),
        }
    }
    fn curve_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        match self {
            DeltaFilter::Identity(c) => c.curve_to(c1x, c1y, c2x, c2y, x, y),
            DeltaFilter::Scale(f) => f.curve_to(c1x, c1y, c2x, c2y, x, y),
            DeltaFilter::General(f) => f.curve_to(c1x, c1y, c2x, c2y, x, y),
        }
    }
    fn close_path(&mut self) {
        match self {
            DeltaFilter::Identity(c) => c.close_path(),
            DeltaFilter::Scale(f) => f.close_path(),
            DeltaFilter::General(f) => f.close_path(),
        }
    }
    fn path_done(&mut self) {
        match self {
            DeltaFilter::Identity(c) => c.path_done(),
            DeltaFilter::Scale(f) => f.path_done(),
            DeltaFilter::General(f) => f.path_done(),
        }
    }
}

// ============================================================================
// Closed-path detector
// ============================================================================

/// Buffers every drawing event of the current subpath and publishes, just
/// before replaying it downstream, whether the subpath ended in
/// `close_path`. The stroker reads the flag to choose between caps and a
/// seam join.
///
/// The buffered subpath is replayed on `move_to`, `close_path`, and
/// `path_done`; the stack is always left empty afterward, so a reused
/// context never leaks segments from a previous call.
pub struct ClosedPathDetector<'a, C: PathConsumer> {
    out: C,
    stack: &'a mut PolyStack,
    closed_path: &'a Cell<bool>,
}

impl<'a, C: PathConsumer> ClosedPathDetector<'a, C> {
    pub fn new(out: C, stack: &'a mut PolyStack, closed_path: &'a Cell<bool>) -> Self {
        stack.clear();
        closed_path.set(false);
        Self {
            out,
            stack,
            closed_path,
        }
    }

    fn finish(&mut self, closed: bool) {
        self.closed_path.set(closed);
        self.stack.pull_all(&mut self.out);
    }
}

impl<C: PathConsumer> PathConsumer for ClosedPathDetector<'_, C> {
    fn move_to(&mut self, x: f32, y: f32) {
        // previous subpath was not closed
        self.finish(false);
        self.out.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.stack.push_line(x, y);
    }

    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        self.stack.push_quad(x, y, cx, cy);
    }

    fn curve_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        self.stack.push_cubic(x, y, c2x, c2y, c1x, c1y);
    }

    fn close_path(&mut self) {
        self.finish(true);
        self.out.close_path();
    }

    fn path_done(&mut self) {
        self.finish(false);
        self.out.path_done();
        self.stack.clear();
    }
}

// ============================================================================
// Path tracer
// ============================================================================

/// Diagnostic passthrough: logs every event at trace level and forwards it
/// untouched. Correctness never depends on this filter being present.
pub struct PathTracer<C: PathConsumer> {
    out: C,
    prefix: &'static str,
}

impl<C: PathConsumer> PathTracer<C> {
    pub fn new(out: C, prefix: &'static str) -> Self {
        Self { out, prefix }
    }
}

impl<C: PathConsumer> PathConsumer for PathTracer<C> {
    fn move_to(&mut self, x: f32, y: f32) {
        log::trace!(target: "sable::pipeline", "{}: move_to({x}, {y})", self.prefix);
        self.out.move_to(x, y);
    }
    fn line_to(&mut self, x: f32, y: f32) {
        log::trace!(target: "sable::pipeline", "{}: line_to({x}, {y})", self.prefix);
        self.out.line_to(x, y);
    }
    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        log::trace!(target: "sable::pipeline", "{}: quad_to({cx}, {cy}, {x}, {y})", self.prefix);
        self.out.quad_to(cx, cy, x, y);
    }
    fn curve_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        log::trace!(
            target: "sable::pipeline",
            "{}: curve_to({c1x}, {c1y}, {c2x}, {c2y}, {x}, {y})",
            self.prefix
        );
        self.out.curve_to(c1x, c1y, c2x, c2y, x, y);
    }
    fn close_path(&mut self) {
        log::trace!(target: "sable::pipeline", "{}: close_path", self.prefix);
        self.out.close_path();
    }
    fn path_done(&mut self) {
        log::trace!(target: "sable::pipeline", "{}: path_done", self.prefix);
        self.out.path_done();
    }
}

// ============================================================================
// Tests
// ============================================================================
