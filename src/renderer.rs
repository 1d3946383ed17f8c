//! The scan converter: terminal consumer of the path event protocol.
//!
//! Incoming segments are converted to edge records in sub-pixel
//! coordinates (curves are first flattened into monotonic line chains —
//! they are never rasterized directly). After `path_done`, the sweep in
//! [`Renderer::produce_alphas`] walks sub-pixel rows top to bottom,
//! maintains the active edge list, sorts the row's crossings, converts
//! them to spans under the winding rule, and accumulates signed coverage
//! deltas at pixel granularity. Each finished pixel row is handed to the
//! alpha consumer, which resolves deltas to alpha bytes and clears them
//! for reuse.
//!
//! Sampling is done at sub-pixel centers in both axes: an edge crossing
//! row `r` contributes at `x(r + 0.5)`, quantized to the cell whose center
//! it covers. This keeps axis-aligned rectangles exact at every sub-pixel
//! resolution, including 1x1.

use crate::alpha::AlphaConsumer;
use crate::array::DirtyBuffer;
use crate::basics::{iceil, iceil_d, Bounds, PathConsumer, WindingRule};
use crate::config::Settings;
use crate::curves::{
    subdivide_at, subdivide_cubic, subdivide_quad, Curve, SEG_CUBIC, SEG_QUAD,
};
use crate::math::{filter_out_not_in_ab, isort};

// ============================================================================
// Edge record
// ============================================================================

/// A directed edge contributing one crossing per covered sub-pixel row.
/// `x` is the sub-pixel x at the first covered row center and is advanced
/// by `dxdy` per row during the sweep.
#[derive(Debug, Clone, Copy, Default)]
struct Edge {
    x: f64,
    dxdy: f64,
    first_row: i32,
    /// exclusive
    last_row: i32,
    /// +1 for a downward edge, -1 for upward
    orient: i32,
    /// bucket chain link, -1 terminates
    next: i32,
}

/// Flattening tolerance in sub-pixel units.
const FLATNESS: f32 = 0.5;
/// Recursion guard for adaptive flattening.
const FLATTEN_LIMIT: u32 = 20;

// ============================================================================
// Renderer
// ============================================================================

/// Scanline coverage renderer.
///
/// Lifecycle: `init(bounds, rule)` → path events (ending in `path_done`)
/// → `bounds()` for the tight output rectangle → `produce_alphas(...)`.
/// All scratch arrays are retained across `init` calls; none of them is
/// zeroed on reuse.
pub struct Renderer {
    subpixel_lg_x: u32,
    subpixel_lg_y: u32,
    block_size_lg: u32,

    winding: WindingRule,
    clip: Bounds,

    edges: DirtyBuffer<Edge>,

    // current subpath, sub-pixel space
    started: bool,
    sx0: f32,
    sy0: f32,
    x0: f32,
    y0: f32,

    // observed edge extent
    edge_min_x: f32,
    edge_max_x: f32,
    row_min: i32,
    row_max: i32,

    out_bounds: Bounds,
    done: bool,

    // sweep scratch
    buckets: DirtyBuffer<i32>,
    active: DirtyBuffer<u32>,
    crossings: DirtyBuffer<i64>,
    alpha_row: DirtyBuffer<i32>,
    blk_flags: DirtyBuffer<i32>,

    // flattening scratch
    curve: Curve,
}

impl Renderer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            subpixel_lg_x: settings.subpixel_lg_x,
            subpixel_lg_y: settings.subpixel_lg_y,
            block_size_lg: settings.block_size_lg,
            winding: WindingRule::NonZero,
            clip: Bounds::unbounded(),
            edges: DirtyBuffer::new(256),
            started: false,
            sx0: 0.0,
            sy0: 0.0,
            x0: 0.0,
            y0: 0.0,
            edge_min_x: f32::MAX,
            edge_max_x: f32::MIN,
            row_min: i32::MAX,
            row_max: i32::MIN,
            out_bounds: Bounds::new(0, 0, 0, 0),
            done: false,
            buckets: DirtyBuffer::new(256),
            active: DirtyBuffer::new(64),
            crossings: DirtyBuffer::new(64),
            alpha_row: DirtyBuffer::new(256),
            blk_flags: DirtyBuffer::new(16),
            curve: Curve::new(),
        }
    }

    /// Prepare for a new path: `bounds` is the device clip region the
    /// output is limited to, `winding` the fill rule. O(1) — scratch
    /// stays dirty.
    pub fn init(&mut self, bounds: Bounds, winding: WindingRule) {
        self.clip = bounds;
        self.winding = winding;
        self.edges.clear();
        self.started = false;
        self.edge_min_x = f32::MAX;
        self.edge_max_x = f32::MIN;
        self.row_min = i32::MAX;
        self.row_max = i32::MIN;
        self.out_bounds = Bounds::new(0, 0, 0, 0);
        self.done = false;
    }

    /// Maximum coverage a pixel can accumulate under these settings.
    #[inline]
    pub fn max_coverage(&self) -> u32 {
        1 << (self.subpixel_lg_x + self.subpixel_lg_y)
    }

    /// Tight output bounds, valid once `path_done` has been consumed.
    /// Empty when the path produced no coverage inside the clip region.
    pub fn bounds(&self) -> Bounds {
        debug_assert!(self.done, "bounds queried before path_done");
        self.out_bounds
    }

    #[inline]
    fn to_subpix_x(&self, v: f32) -> f32 {
        v * (1 << self.subpixel_lg_x) as f32
    }

    #[inline]
    fn to_subpix_y(&self, v: f32) -> f32 {
        v * (1 << self.subpixel_lg_y) as f32
    }

    // ========================================================================
    // Edge construction
    // ========================================================================

    /// Add one line segment in sub-pixel coordinates. Non-finite
    /// coordinates drop the segment rather than poisoning the accumulator.
    fn add_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        if !(x1.is_finite() && y1.is_finite() && x2.is_finite() && y2.is_finite()) {
            return;
        }

        let (x1, y1, x2, y2, orient) = if y2 < y1 {
            (x2, y2, x1, y1, -1)
        } else {
            (x1, y1, x2, y2, 1)
        };

        // Rows are sampled at their centers: row r is crossed iff
        // r + 0.5 lies in [y1, y2).
        let clip_row_lo = self.clip.min_y << self.subpixel_lg_y;
        let clip_row_hi = self.clip.max_y << self.subpixel_lg_y;
        let first = iceil(y1 - 0.5).max(clip_row_lo);
        let last = iceil(y2 - 0.5).min(clip_row_hi);
        if first >= last {
            return;
        }

        let slope = ((x2 - x1) as f64) / ((y2 - y1) as f64);
        let x_at_first = x1 as f64 + ((first as f64 + 0.5) - y1 as f64) * slope;

        self.edges.push(Edge {
            x: x_at_first,
            dxdy: slope,
            first_row: first,
            last_row: last,
            orient,
            next: -1,
        });

        self.edge_min_x = self.edge_min_x.min(x1.min(x2));
        self.edge_max_x = self.edge_max_x.max(x1.max(x2));
        self.row_min = self.row_min.min(first);
        self.row_max = self.row_max.max(last);
    }

    fn close_subpath(&mut self) {
        if self.started && (self.x0 != self.sx0 || self.y0 != self.sy0) {
            self.add_line(self.x0, self.y0, self.sx0, self.sy0);
            self.x0 = self.sx0;
            self.y0 = self.sy0;
        }
    }

    // ========================================================================
    // Curve flattening
    // ========================================================================

    /// Flatten one monotonic piece by recursive midpoint subdivision until
    /// its control points sit within [`FLATNESS`] of the chord.
    fn flatten_piece(&mut self, pts: &[f32], kind: usize, depth: u32) {
        let n = kind - 2;
        let (ex, ey) = (pts[n], pts[n + 1]);
        let cdx = ex - pts[0];
        let cdy = ey - pts[1];
        let chord_sq = cdx * cdx + cdy * cdy;

        let mut dev = 0.0f32;
        for i in (2..n).step_by(2) {
            let d = (pts[i] - pts[0]) * cdy - (pts[i + 1] - pts[1]) * cdx;
            dev = dev.max(d.abs());
        }

        // dev is |cross| = distance * chord_len; flat when the max control
        // distance is below tolerance. Degenerate chords fall back to a
        // direct control-point distance test.
        let flat = if chord_sq > 1e-12 {
            dev * dev <= FLATNESS * FLATNESS * chord_sq
        } else {
            let mut d2 = 0.0f32;
            for i in (2..n).step_by(2) {
                let dx = pts[i] - pts[0];
                let dy = pts[i + 1] - pts[1];
                d2 = d2.max(dx * dx + dy * dy);
            }
            d2 <= FLATNESS * FLATNESS
        };

        if flat || depth == 0 {
            self.add_line(pts[0], pts[1], ex, ey);
            return;
        }

        let mut left = [0.0f32; 8];
        let mut right = [0.0f32; 8];
        match kind {
            SEG_CUBIC => subdivide_cubic(pts, &mut left, &mut right),
            SEG_QUAD => subdivide_quad(pts, &mut left, &mut right),
            _ => panic!("unsupported curve kind: {kind}"),
        }
        self.flatten_piece(&left[..kind], kind, depth - 1);
        self.flatten_piece(&right[..kind], kind, depth - 1);
    }

    /// Break a curve at its x/y-monotonicity extrema, then flatten each
    /// monotonic piece into lines.
    fn flatten_curve(&mut self, pts: &[f32], kind: usize) {
        if pts.iter().any(|v| !v.is_finite()) {
            return;
        }

        self.curve.set(pts, kind);
        let mut ts = [0.0f32; 5];
        let mut n = 0;
        n += self.curve.dx_roots(&mut ts[n..]);
        n += self.curve.dy_roots(&mut ts[n..]);
        n = filter_out_not_in_ab(&mut ts, 0, n, 1e-4, 1.0 - 1e-4);
        isort(&mut ts, n);

        let mut buf = [0.0f32; 8];
        buf[..kind].copy_from_slice(&pts[..kind]);
        let mut prev_t = 0.0f32;
        for &t in ts.iter().take(n) {
            let mut left = [0.0f32; 8];
            let mut right = [0.0f32; 8];
            let local = (t - prev_t) / (1.0 - prev_t);
            subdivide_at(local, &buf[..kind], &mut left, &mut right, kind);
            self.flatten_piece(&left[..kind], kind, FLATTEN_LIMIT);
            buf[..kind].copy_from_slice(&right[..kind]);
            prev_t = t;
        }
        let tail = buf;
        self.flatten_piece(&tail[..kind], kind, FLATTEN_LIMIT);
    }

    // ========================================================================
    // Sweep
    // ========================================================================

    /// Deliver the accumulated coverage to `consumer`, row by row, in
    /// increasing y. The renderer's edge set is consumed; a new `init`
    /// is required afterward. The consumer's origin must coincide with
    /// `bounds()`.
    pub fn produce_alphas<A: AlphaConsumer>(&mut self, consumer: &mut A) {
        assert!(self.done, "produce_alphas before path_done");
        if self.out_bounds.is_empty() {
            return;
        }

        consumer.set_max_alpha(self.max_coverage());
        let use_blocks = consumer.supports_block_flags();

        let lg_x = self.subpixel_lg_x;
        let lg_y = self.subpixel_lg_y;
        let spx = 1i32 << lg_x;
        let mask_y = (1i32 << lg_y) - 1;

        let out = self.out_bounds;
        let width_px = out.width() as usize;
        let cell_lo = out.min_x << lg_x;
        let cell_hi = out.max_x << lg_x;
        let row_start = out.min_y << lg_y;
        let row_end = out.max_y << lg_y;
        let rows = (row_end - row_start) as usize;

        // Deltas and block flags must start clean; the consumer keeps
        // them clean from then on.
        let alpha_row = self.alpha_row.acquire(width_px + 2);
        alpha_row.fill(0);
        let blk_flags = self.blk_flags.acquire((width_px >> self.block_size_lg) + 2);
        blk_flags.fill(0);

        // Bucket edges by their first swept row, fast-forwarding edges
        // that start above the clip region.
        let buckets = self.buckets.acquire(rows);
        buckets.fill(-1);
        for i in 0..self.edges.len() {
            let e = &mut self.edges[i];
            let first = e.first_row.max(row_start);
            if e.last_row <= first || first >= row_end {
                continue;
            }
            if first > e.first_row {
                e.x += (first - e.first_row) as f64 * e.dxdy;
                e.first_row = first;
            }
            let b = (first - row_start) as usize;
            e.next = self.buckets[b];
            self.buckets[b] = i as i32;
        }

        self.active.clear();
        let mut pix_from = usize::MAX;
        let mut pix_to = 0usize;

        for row in 0..rows {
            let abs_row = row_start + row as i32;

            // activate edges starting on this row
            let mut e = self.buckets[row];
            while e >= 0 {
                self.active.push(e as u32);
                e = self.edges[e as usize].next;
            }

            // sample crossings, dropping finished edges
            self.crossings.clear();
            let mut kept = 0;
            for i in 0..self.active.len() {
                let idx = self.active[i] as usize;
                if self.edges[idx].last_row <= abs_row {
                    continue;
                }
                self.active[kept] = idx as u32;
                kept += 1;

                let ed = &mut self.edges[idx];
                let cx = ed.x;
                ed.x += ed.dxdy;
                let cell = iceil_d(cx - 0.5).clamp(cell_lo, cell_hi);
                self.crossings
                    .push(((cell as i64) << 1) | ((ed.orient < 0) as i64));
            }
            self.active.truncate(kept);

            // nearly sorted across consecutive rows; insertion sort
            let cr = self.crossings.as_mut_slice();
            for i in 1..cr.len() {
                let v = cr[i];
                let mut j = i;
                while j > 0 && cr[j - 1] > v {
                    cr[j] = cr[j - 1];
                    j -= 1;
                }
                cr[j] = v;
            }

            // crossings -> spans -> pixel deltas
            match self.winding {
                WindingRule::NonZero => {
                    let mut sum = 0i32;
                    let mut span_x0 = 0i32;
                    for i in 0..cr.len() {
                        let cell = (cr[i] >> 1) as i32;
                        let orient = if (cr[i] & 1) != 0 { -1 } else { 1 };
                        let was_inside = sum != 0;
                        sum += orient;
                        let now_inside = sum != 0;
                        if !was_inside && now_inside {
                            span_x0 = cell;
                        } else if was_inside && !now_inside && cell > span_x0 {
                            accumulate_span(
                                alpha_row,
                                blk_flags,
                                span_x0 - cell_lo,
                                cell - cell_lo,
                                lg_x,
                                spx,
                                self.block_size_lg,
                                &mut pix_from,
                                &mut pix_to,
                            );
                        }
                    }
                }
                WindingRule::EvenOdd => {
                    let mut i = 0;
                    while i + 1 < cr.len() {
                        let c0 = (cr[i] >> 1) as i32;
                        let c1 = (cr[i + 1] >> 1) as i32;
                        if c1 > c0 {
                            accumulate_span(
                                alpha_row,
                                blk_flags,
                                c0 - cell_lo,
                                c1 - cell_lo,
                                lg_x,
                                spx,
                                self.block_size_lg,
                                &mut pix_from,
                                &mut pix_to,
                            );
                        }
                        i += 2;
                    }
                }
            }

            // flush at the end of each pixel row
            let last_subrow = (abs_row & mask_y) == mask_y || row == rows - 1;
            if last_subrow {
                let pix_y = abs_row >> lg_y;
                if pix_from != usize::MAX {
                    if use_blocks {
                        consumer.set_and_clear_relative_alphas_blocks(
                            blk_flags,
                            alpha_row,
                            pix_y,
                            pix_from,
                            pix_to,
                            self.block_size_lg,
                        );
                    } else {
                        consumer.set_and_clear_relative_alphas(
                            alpha_row, pix_y, pix_from, pix_to,
                        );
                    }
                } else {
                    consumer.clear_alphas(pix_y);
                }
                pix_from = usize::MAX;
                pix_to = 0;
            }
        }

        // The edge set has been stepped; require a fresh init for reuse.
        self.done = false;
        self.edges.clear();
    }
}

/// Accumulate one sub-pixel span `[sx0, sx1)` (cell indices relative to
/// the output origin) into the pixel delta row, marking touched blocks
/// and widening the touched pixel range.
#[allow(clippy::too_many_arguments)]
#[inline]
fn accumulate_span(
    deltas: &mut [i32],
    blk_flags: &mut [i32],
    sx0: i32,
    sx1: i32,
    lg_x: u32,
    spx: i32,
    blk_lg: u32,
    pix_from: &mut usize,
    pix_to: &mut usize,
) {
    let mask_x = spx - 1;
    let p0 = (sx0 >> lg_x) as usize;
    let f0 = sx0 & mask_x;
    let p1 = (sx1 >> lg_x) as usize;
    let f1 = sx1 & mask_x;

    if p0 == p1 {
        let count = sx1 - sx0;
        deltas[p0] += count;
        deltas[p0 + 1] -= count;
    } else {
        deltas[p0] += spx - f0;
        deltas[p0 + 1] += f0;
        deltas[p1] += f1 - spx;
        deltas[p1 + 1] -= f1;
    }
    blk_flags[p0 >> blk_lg] = 1;
    blk_flags[(p0 + 1) >> blk_lg] = 1;
    blk_flags[p1 >> blk_lg] = 1;
    blk_flags[(p1 + 1) >> blk_lg] = 1;

    *pix_from = (*pix_from).min(p0);
    let covered_end = if f1 > 0 { p1 + 1 } else { p1 };
    *pix_to = (*pix_to).max(covered_end);
}

// ============================================================================
// Path consumer wiring
// ============================================================================

impl PathConsumer for Renderer {
    fn move_to(&mut self, x: f32, y: f32) {
        self.close_subpath();
        let sx = self.to_subpix_x(x);
        let sy = self.to_subpix_y(y);
        self.sx0 = sx;
        self.sy0 = sy;
        self.x0 = sx;
        self.y0 = sy;
        self.started = true;
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let sx = self.to_subpix_x(x);
        let sy = self.to_subpix_y(y);
        if !self.started {
            // defensive: drawing before any move_to opens a subpath here
            self.sx0 = sx;
            self.sy0 = sy;
            self.started = true;
        } else {
            self.add_line(self.x0, self.y0, sx, sy);
        }
        self.x0 = sx;
        self.y0 = sy;
    }

    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        if !self.started {
            self.move_to(x, y);
            return;
        }
        let pts = [
            self.x0,
            self.y0,
            self.to_subpix_x(cx),
            self.to_subpix_y(cy),
            self.to_subpix_x(x),
            self.to_subpix_y(y),
        ];
        self.flatten_curve(&pts, SEG_QUAD);
        self.x0 = pts[4];
        self.y0 = pts[5];
    }

    fn curve_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        if !self.started {
            self.move_to(x, y);
            return;
        }
        let pts = [
            self.x0,
            self.y0,
            self.to_subpix_x(c1x),
            self.to_subpix_y(c1y),
            self.to_subpix_x(c2x),
            self.to_subpix_y(c2y),
            self.to_subpix_x(x),
            self.to_subpix_y(y),
        ];
        self.flatten_curve(&pts, SEG_CUBIC);
        self.x0 = pts[6];
        self.y0 = pts[7];
    }

    fn close_path(&mut self) {
        self.close_subpath();
    }

    fn path_done(&mut self) {
        self.close_subpath();

        // Tight output bounds: quantize the observed edge extent the same
        // way the sweep quantizes crossings, then clip.
        if self.row_min < self.row_max && self.edge_min_x <= self.edge_max_x {
            let lg_x = self.subpixel_lg_x;
            let lg_y = self.subpixel_lg_y;
            let cell_lo = iceil(self.edge_min_x - 0.5);
            let cell_hi = iceil(self.edge_max_x - 0.5);
            let ebounds = Bounds::new(
                cell_lo >> lg_x,
                self.row_min >> lg_y,
                ((cell_hi.max(cell_lo + 1) - 1) >> lg_x) + 1,
                ((self.row_max - 1) >> lg_y) + 1,
            );
            self.out_bounds = ebounds.intersect(&self.clip);
            if self.out_bounds.is_empty() {
                self.out_bounds = Bounds::new(0, 0, 0, 0);
            }
        } else {
            self.out_bounds = Bounds::new(0, 0, 0, 0);
        }
        self.done = true;
    }
}

// ============================================================================
// Tests
// ============================================================================
