//! The dasher: re-emits a path as alternating rendered and skipped runs
//! according to a dash pattern.
//!
//! Lines are split at dash boundaries by direct interpolation. Curves are
//! walked through a length iterator — recursive midpoint subdivision until
//! each leaf's control-polygon and chord lengths agree within tolerance —
//! and a boundary inside a leaf is located by the leaf's local linear
//! parameter, then cut out of the original curve with `subdivide_at`. The
//! "off" side is never emitted.
//!
//! The leading "on" run of every subpath is buffered rather than emitted:
//! when the subpath turns out to be closed and the pattern is mid-"on" at
//! the seam, the buffered run is appended to the final run without a
//! `move_to`, so the seam dash is one continuous piece. Open subpaths just
//! flush the buffer at the end (the first dash is emitted last, which is
//! irrelevant to rasterization).

use smallvec::SmallVec;

use crate::array::PolyStack;
use crate::basics::PathConsumer;
use crate::curves::{subdivide_at, SEG_CUBIC, SEG_QUAD};
use crate::math::{curve_len, line_len, quad_len};

/// Leaf acceptance: control polygon vs. chord agreement.
const LEN_ERR: f32 = 0.01;
/// Subdivision depth bound for the length iterator.
const REC_LIMIT: u32 = 8;

// ============================================================================
// Dash pattern validation
// ============================================================================

/// Check a dash array for usability: finite, non-negative entries with at
/// least one positive. Anything else disables dashing (the caller passes
/// geometry through unmodified) — malformed patterns must neither loop
/// nor error.
pub fn dash_is_valid(dash: &[f32]) -> bool {
    !dash.is_empty()
        && dash.iter().all(|&d| d.is_finite() && d >= 0.0)
        && dash.iter().any(|&d| d > 0.0)
}

// ============================================================================
// Dasher
// ============================================================================

/// Dash filter over the path event protocol.
///
/// The dash slice is borrowed from the context (already validated and, if
/// the engine took the uniform-transform shortcut, pre-scaled); the
/// first-run buffer is the context's segment stack.
pub struct Dasher<'a, C: PathConsumer> {
    out: C,
    dash: &'a [f32],
    start_idx: usize,
    start_phase: f32,

    idx: usize,
    phase: f32,
    sx0: f32,
    sy0: f32,
    x0: f32,
    y0: f32,
    cur_x: f32,
    cur_y: f32,
    needs_move_to: bool,
    starting: bool,
    first_segments: &'a mut PolyStack,
}

impl<'a, C: PathConsumer> Dasher<'a, C> {
    /// `dash` must satisfy [`dash_is_valid`]; `phase` is taken by absolute
    /// value and wrapped around the pattern length.
    pub fn new(out: C, dash: &'a [f32], phase: f32, first_segments: &'a mut PolyStack) -> Self {
        debug_assert!(dash_is_valid(dash));
        first_segments.clear();

        let total: f32 = dash.iter().sum();
        let mut ph = phase.abs() % total;
        let mut idx = 0;
        while ph >= dash[idx] {
            ph -= dash[idx];
            idx = (idx + 1) % dash.len();
        }

        Self {
            out,
            dash,
            start_idx: idx,
            start_phase: ph,
            idx,
            phase: ph,
            sx0: 0.0,
            sy0: 0.0,
            x0: 0.0,
            y0: 0.0,
            cur_x: 0.0,
            cur_y: 0.0,
            needs_move_to: true,
            starting: true,
            first_segments,
        }
    }

    #[inline]
    fn dash_on(&self) -> bool {
        self.idx & 1 == 0
    }

    fn toggle(&mut self) {
        self.idx = (self.idx + 1) % self.dash.len();
        self.phase = 0.0;
    }

    fn flush_first_segments(&mut self) {
        if !self.first_segments.is_empty() {
            self.out.move_to(self.sx0, self.sy0);
            self.first_segments.pull_all(&mut self.out);
        }
    }

    /// A run of state `on` ends at `(x, y)` with a straight segment.
    fn go_to(&mut self, x: f32, y: f32, on: bool) {
        if on {
            if self.starting {
                self.first_segments.push_line(x, y);
            } else {
                if self.needs_move_to {
                    self.out.move_to(self.cur_x, self.cur_y);
                    self.needs_move_to = false;
                }
                self.out.line_to(x, y);
            }
        } else {
            self.starting = false;
            self.needs_move_to = true;
        }
        self.cur_x = x;
        self.cur_y = y;
    }

    /// A run of state `on` ends with a curve piece (`kind` coords, start
    /// included).
    fn go_to_seg(&mut self, p: &[f32], kind: usize, on: bool) {
        let n = kind - 2;
        if on {
            if self.starting {
                match kind {
                    SEG_QUAD => self.first_segments.push_quad(p[4], p[5], p[2], p[3]),
                    SEG_CUBIC => self
                        .first_segments
                        .push_cubic(p[6], p[7], p[4], p[5], p[2], p[3]),
                    _ => panic!("unsupported curve kind: {kind}"),
                }
            } else {
                if self.needs_move_to {
                    self.out.move_to(p[0], p[1]);
                    self.needs_move_to = false;
                }
                match kind {
                    SEG_QUAD => self.out.quad_to(p[2], p[3], p[4], p[5]),
                    SEG_CUBIC => self.out.curve_to(p[2], p[3], p[4], p[5], p[6], p[7]),
                    _ => panic!("unsupported curve kind: {kind}"),
                }
            }
        } else {
            self.starting = false;
            self.needs_move_to = true;
        }
        self.cur_x = p[n];
        self.cur_y = p[n + 1];
    }

    /// Cut `[a, b]` out of the original curve and hand it to `go_to_seg`.
    fn emit_curve_piece(&mut self, src: &[f32], kind: usize, a: f32, b: f32, on: bool) {
        if !on {
            // skipped side: only the current position matters
            let mut l = [0.0f32; 8];
            let mut r = [0.0f32; 8];
            subdivide_at(b, src, &mut l, &mut r, kind);
            let n = kind - 2;
            self.starting = false;
            self.needs_move_to = true;
            self.cur_x = l[n];
            self.cur_y = l[n + 1];
            return;
        }
        let mut l = [0.0f32; 8];
        let mut r = [0.0f32; 8];
        // right part from a, then left part of the renormalized b
        subdivide_at(a, src, &mut l, &mut r, kind);
        let tail: [f32; 8] = r;
        if b >= 1.0 {
            self.go_to_seg(&tail[..kind], kind, true);
            return;
        }
        let local = (b - a) / (1.0 - a);
        subdivide_at(local, &tail[..kind], &mut l, &mut r, kind);
        self.go_to_seg(&l[..kind], kind, true);
    }

    /// Walk one curve's arc length through the dash pattern.
    fn something_to(&mut self, mid: &[f32], kind: usize) {
        if mid.iter().any(|v| !v.is_finite()) {
            return;
        }

        // gather flat leaves (t0, t1, length), left to right
        let mut leaves: SmallVec<[(f32, f32, f32); 64]> = SmallVec::new();
        {
            let mut stack: SmallVec<[([f32; 8], f32, f32, u32); 16]> = SmallVec::new();
            let mut first = [0.0f32; 8];
            first[..kind].copy_from_slice(&mid[..kind]);
            stack.push((first, 0.0, 1.0, 0));
            while let Some((p, t0, t1, depth)) = stack.pop() {
                let (len_est, poly, chord) = match kind {
                    SEG_QUAD => {
                        let chord = line_len(p[0], p[1], p[4], p[5]);
                        let poly =
                            line_len(p[0], p[1], p[2], p[3]) + line_len(p[2], p[3], p[4], p[5]);
                        (quad_len(p[0], p[1], p[2], p[3], p[4], p[5]), poly, chord)
                    }
                    SEG_CUBIC => {
                        let chord = line_len(p[0], p[1], p[6], p[7]);
                        let poly = line_len(p[0], p[1], p[2], p[3])
                            + line_len(p[2], p[3], p[4], p[5])
                            + line_len(p[4], p[5], p[6], p[7]);
                        (
                            curve_len(p[0], p[1], p[2], p[3], p[4], p[5], p[6], p[7]),
                            poly,
                            chord,
                        )
                    }
                    _ => panic!("unsupported curve kind: {kind}"),
                };
                if depth >= REC_LIMIT || poly - chord <= LEN_ERR * poly || poly == 0.0 {
                    if len_est > 0.0 {
                        leaves.push((t0, t1, len_est));
                    }
                    continue;
                }
                let mut l = [0.0f32; 8];
                let mut r = [0.0f32; 8];
                subdivide_at(0.5, &p[..kind], &mut l, &mut r, kind);
                let tm = (t0 + t1) / 2.0;
                stack.push((r, tm, t1, depth + 1));
                stack.push((l, t0, tm, depth + 1));
            }
        }

        let n = kind - 2;
        if leaves.is_empty() {
            // zero-length curve: nothing to dash
            self.x0 = mid[n];
            self.y0 = mid[n + 1];
            return;
        }

        let mut cut_t = 0.0f32;
        for &(t0, t1, len) in &leaves {
            let mut consumed = 0.0f32;
            loop {
                let dash_rest = self.dash[self.idx] - self.phase;
                let leaf_rest = len - consumed;
                if leaf_rest <= dash_rest {
                    self.phase += leaf_rest;
                    break;
                }
                consumed += dash_rest;
                let t_b = t0 + (t1 - t0) * (consumed / len);
                let on = self.dash_on();
                self.emit_curve_piece(mid, kind, cut_t, t_b, on);
                cut_t = t_b;
                self.toggle();
            }
        }
        // the remainder of the curve ends in the current dash state
        if cut_t < 1.0 {
            let on = self.dash_on();
            self.emit_curve_piece(mid, kind, cut_t, 1.0, on);
        }

        self.x0 = mid[n];
        self.y0 = mid[n + 1];
    }
}

// ============================================================================
// Path consumer wiring
// ============================================================================

impl<C: PathConsumer> PathConsumer for Dasher<'_, C> {
    fn move_to(&mut self, x: f32, y: f32) {
        self.flush_first_segments();
        self.needs_move_to = true;
        self.starting = true;
        self.idx = self.start_idx;
        self.phase = self.start_phase;
        self.sx0 = x;
        self.sy0 = y;
        self.x0 = x;
        self.y0 = y;
        self.cur_x = x;
        self.cur_y = y;
    }

    fn line_to(&mut self, x1: f32, y1: f32) {
        if !(x1.is_finite() && y1.is_finite()) {
            return;
        }
        let dx = x1 - self.x0;
        let dy = y1 - self.y0;
        let len = (dx * dx + dy * dy).sqrt();
        if len == 0.0 {
            return;
        }
        let cx = dx / len;
        let cy = dy / len;

        let mut consumed = 0.0f32;
        loop {
            let dash_rest = self.dash[self.idx] - self.phase;
            let seg_rest = len - consumed;
            if seg_rest <= dash_rest {
                self.phase += seg_rest;
                let on = self.dash_on();
                self.go_to(x1, y1, on);
                break;
            }
            consumed += dash_rest;
            let bx = self.x0 + consumed * cx;
            let by = self.y0 + consumed * cy;
            let on = self.dash_on();
            self.go_to(bx, by, on);
            self.toggle();
        }

        self.x0 = x1;
        self.y0 = y1;
    }

    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        let mid = [self.x0, self.y0, cx, cy, x, y];
        self.something_to(&mid, SEG_QUAD);
    }

    fn curve_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        let mid = [self.x0, self.y0, c1x, c1y, c2x, c2y, x, y];
        self.something_to(&mid, SEG_CUBIC);
    }

    fn close_path(&mut self) {
        // consume the closing segment through the pattern
        self.line_to(self.sx0, self.sy0);
        if !self.first_segments.is_empty() {
            if !self.dash_on() || self.needs_move_to {
                self.out.move_to(self.sx0, self.sy0);
            }
            self.first_segments.pull_all(&mut self.out);
        }
        // restart at the seam, as if a fresh subpath began here
        self.needs_move_to = true;
        self.starting = true;
        self.idx = self.start_idx;
        self.phase = self.start_phase;
        self.x0 = self.sx0;
        self.y0 = self.sy0;
        self.cur_x = self.sx0;
        self.cur_y = self.sy0;
    }

    fn path_done(&mut self) {
        self.flush_first_segments();
        self.out.path_done();
        self.needs_move_to = true;
        self.starting = true;
        self.idx = self.start_idx;
        self.phase = self.start_phase;
    }
}

// ============================================================================
// Tests
// ============================================================================
