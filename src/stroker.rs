//! The stroker: converts a (possibly dashed) path into a fillable outline
//! of its stroked region, using non-zero winding.
//!
//! For every segment the two offset curves at ±half-width are produced;
//! curves are first split at the parameters from
//! [`crate::curves::find_subdiv_points`] so that no piece can produce a
//! self-intersecting offset, then each piece is offset by displacing its
//! control polygon and re-intersecting the displaced legs. The left side
//! streams straight downstream; the right side is recorded into the
//! context's reverse stack and replayed backwards when the subpath ends.
//!
//! Join geometry goes on the outer side of each vertex (miter with bevel
//! fallback, round as circular arcs of at most a quarter turn, or plain
//! bevel); the inner side always routes through the vertex itself, which
//! the non-zero winding rule resolves correctly.

use std::cell::Cell;

use crate::array::{DirtyBuffer, PolyStack};
use crate::basics::PathConsumer;
use crate::curves::{find_subdiv_points, subdivide_at, Curve, SEG_CUBIC, SEG_QUAD};
use crate::error::Error;

// ============================================================================
// Stroke configuration
// ============================================================================

/// Line cap style for open subpath endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cap {
    Butt,
    Round,
    Square,
}

/// Line join style at segment vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    Miter,
    Round,
    Bevel,
}

/// Validated stroke configuration, immutable for the duration of a call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeParams {
    pub width: f32,
    pub cap: Cap,
    pub join: Join,
    pub miter_limit: f32,
}

impl StrokeParams {
    pub fn new(width: f32, cap: Cap, join: Join, miter_limit: f32) -> Result<Self, Error> {
        if !(width > 0.0) || !width.is_finite() {
            return Err(Error::InvalidStrokeWidth(width));
        }
        if !(miter_limit >= 1.0) || !miter_limit.is_finite() {
            return Err(Error::InvalidMiterLimit(miter_limit));
        }
        Ok(Self {
            width,
            cap,
            join,
            miter_limit,
        })
    }

    /// Same parameters with every length scaled by `s` (used by the
    /// uniform-transform shortcut).
    pub fn scaled(&self, s: f32) -> Self {
        Self {
            width: self.width * s,
            ..*self
        }
    }
}

// ============================================================================
// Stroker
// ============================================================================

const C_ARC: f32 = 0.552_284_75;
const ROUND_JOIN_THRESHOLD: f32 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prev {
    Init,
    MoveTo,
    Drawing,
    Closed,
}

/// Stroke outline generator.
///
/// Owns its downstream consumer; borrows its reverse-side stack and
/// subdivision scratch from the renderer context, and reads the shared
/// closed-subpath flag published by the closed-path detector.
pub struct Stroker<'a, C: PathConsumer> {
    out: C,
    reverse: &'a mut PolyStack,
    middle: &'a mut DirtyBuffer<f32>,
    closed_path: &'a Cell<bool>,

    w2: f32,
    cap: Cap,
    join: Join,
    miter_limit_sq: f32,

    prev: Prev,
    /// closed flag latched at the subpath's first event; the shared cell
    /// may already describe the next subpath by the time this one ends
    subpath_closed: bool,
    sx0: f32,
    sy0: f32,
    sdx: f32,
    sdy: f32,
    smx: f32,
    smy: f32,
    cx0: f32,
    cy0: f32,
    cdx: f32,
    cdy: f32,
    cmx: f32,
    cmy: f32,

    curve: Curve,
}

impl<'a, C: PathConsumer> Stroker<'a, C> {
    pub fn new(
        out: C,
        reverse: &'a mut PolyStack,
        middle: &'a mut DirtyBuffer<f32>,
        closed_path: &'a Cell<bool>,
        params: &StrokeParams,
    ) -> Self {
        reverse.clear();
        let w2 = params.width / 2.0;
        Self {
            out,
            reverse,
            middle,
            closed_path,
            w2,
            cap: params.cap,
            join: params.join,
            miter_limit_sq: (params.miter_limit * w2) * (params.miter_limit * w2),
            prev: Prev::Init,
            subpath_closed: false,
            sx0: 0.0,
            sy0: 0.0,
            sdx: 1.0,
            sdy: 0.0,
            smx: 0.0,
            smy: 0.0,
            cx0: 0.0,
            cy0: 0.0,
            cdx: 1.0,
            cdy: 0.0,
            cmx: 0.0,
            cmy: 0.0,
            curve: Curve::new(),
        }
    }

    /// Perpendicular offset of magnitude `w` for direction `(lx, ly)`.
    fn compute_offset(lx: f32, ly: f32, w: f32) -> (f32, f32) {
        let len_sq = lx * lx + ly * ly;
        if len_sq == 0.0 {
            (0.0, 0.0)
        } else {
            let len = len_sq.sqrt();
            ((ly * w) / len, -(lx * w) / len)
        }
    }

    /// Whether the turn from `(pdx, pdy)` to `(dx, dy)` puts the outer
    /// side of the join on the reverse (right) side.
    #[inline]
    fn is_cw(pdx: f32, pdy: f32, dx: f32, dy: f32) -> bool {
        pdx * dy <= pdy * dx
    }

    // ========================================================================
    // Emission helpers
    // ========================================================================

    fn emit_move_to(&mut self, x: f32, y: f32) {
        self.out.move_to(x, y);
    }

    fn emit_line_to(&mut self, x: f32, y: f32, rev: bool) {
        if rev {
            self.reverse.push_line(x, y);
        } else {
            self.out.line_to(x, y);
        }
    }

    /// Emit a quad given as 6 coords (start included). The reverse side
    /// stores start + control; replay reconstructs the reversed curve.
    fn emit_quad_to(&mut self, p: &[f32], rev: bool) {
        if rev {
            self.reverse.push_quad(p[0], p[1], p[2], p[3]);
        } else {
            self.out.quad_to(p[2], p[3], p[4], p[5]);
        }
    }

    /// Emit a cubic given as 8 coords (start included).
    fn emit_curve_to(&mut self, p: &[f32], rev: bool) {
        if rev {
            self.reverse.push_cubic(p[0], p[1], p[2], p[3], p[4], p[5]);
        } else {
            self.out.curve_to(p[2], p[3], p[4], p[5], p[6], p[7]);
        }
    }

    fn emit_reverse(&mut self) {
        self.reverse.pop_all(&mut self.out);
    }

    fn emit_close(&mut self) {
        self.out.close_path();
    }

    // ========================================================================
    // Joins
    // ========================================================================

    #[allow(clippy::too_many_arguments)]
    fn draw_join(
        &mut self,
        pdx: f32,
        pdy: f32,
        x0: f32,
        y0: f32,
        dx: f32,
        dy: f32,
        omx: f32,
        omy: f32,
        mx: f32,
        my: f32,
    ) {
        if self.prev != Prev::Drawing {
            self.emit_move_to(x0 + mx, y0 + my);
            self.sdx = dx;
            self.sdy = dy;
            self.smx = mx;
            self.smy = my;
        } else {
            let cw = Self::is_cw(pdx, pdy, dx, dy);
            match self.join {
                Join::Miter => self.draw_miter(pdx, pdy, x0, y0, dx, dy, omx, omy, mx, my, cw),
                Join::Round => self.draw_round_join(x0, y0, omx, omy, mx, my, cw),
                Join::Bevel => {}
            }
            // the inner side routes through the join vertex itself; the
            // outer side is bridged by the next segment's offset start
            self.emit_line_to(x0, y0, !cw);
        }
        self.prev = Prev::Drawing;
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_miter(
        &mut self,
        pdx: f32,
        pdy: f32,
        x0: f32,
        y0: f32,
        dx: f32,
        dy: f32,
        mut omx: f32,
        mut omy: f32,
        mut mx: f32,
        mut my: f32,
        cw: bool,
    ) {
        if (mx == omx && my == omy)
            || (pdx == 0.0 && pdy == 0.0)
            || (dx == 0.0 && dy == 0.0)
        {
            return;
        }
        if cw {
            omx = -omx;
            omy = -omy;
            mx = -mx;
            my = -my;
        }

        // intersection of the two outer offset lines
        let m = compute_intersection(
            (x0 - pdx) + omx,
            (y0 - pdy) + omy,
            x0 + omx,
            y0 + omy,
            (x0 + dx) + mx,
            (y0 + dy) + my,
            x0 + mx,
            y0 + my,
        );
        let (miter_x, miter_y) = match m {
            Some(p) => p,
            None => return,
        };

        let len_sq = (miter_x - x0) * (miter_x - x0) + (miter_y - y0) * (miter_y - y0);
        if len_sq < self.miter_limit_sq {
            self.emit_line_to(miter_x, miter_y, cw);
        }
        // over the limit: nothing — the bevel connector is implicit
    }

    fn draw_round_join(
        &mut self,
        cx: f32,
        cy: f32,
        mut omx: f32,
        mut omy: f32,
        mut mx: f32,
        mut my: f32,
        rev: bool,
    ) {
        if (omx == 0.0 && omy == 0.0) || (mx == 0.0 && my == 0.0) {
            return;
        }
        let domx = omx - mx;
        let domy = omy - my;
        if domx * domx + domy * domy < ROUND_JOIN_THRESHOLD {
            return;
        }
        if rev {
            omx = -omx;
            omy = -omy;
            mx = -mx;
            my = -my;
        }

        let ext = {
            let cos = ((omx * mx + omy * my) / (self.w2 * self.w2)).clamp(-1.0, 1.0);
            cos.acos()
        };
        if ext <= 0.0 {
            return;
        }
        let sweep_sign = if omx * my - omy * mx >= 0.0 { 1.0 } else { -1.0 };
        let n = (ext / std::f32::consts::FRAC_PI_2).ceil().max(1.0) as usize;
        let step = sweep_sign * ext / n as f32;

        let mut a0 = omy.atan2(omx);
        for _ in 0..n {
            let a1 = a0 + step;
            self.emit_arc_piece(cx, cy, a0, a1, rev);
            a0 = a1;
        }
    }

    /// One circular-arc piece (at most a quarter turn) as a single cubic.
    fn emit_arc_piece(&mut self, cx: f32, cy: f32, a0: f32, a1: f32, rev: bool) {
        let r = self.w2;
        let k = (4.0 / 3.0) * ((a1 - a0) / 4.0).tan() * r;
        let (s0, c0) = a0.sin_cos();
        let (s1, c1) = a1.sin_cos();
        let p = [
            cx + r * c0,
            cy + r * s0,
            cx + r * c0 - k * s0,
            cy + r * s0 + k * c0,
            cx + r * c1 + k * s1,
            cy + r * s1 - k * c1,
            cx + r * c1,
            cy + r * s1,
        ];
        self.emit_curve_to(&p, rev);
    }

    // ========================================================================
    // Caps
    // ========================================================================

    /// Half circle cap at `(cx, cy)`; `(mx, my)` is the offset vector of
    /// the adjoining outline point, so the cap runs from `(cx + mx, cy +
    /// my)` around to `(cx - mx, cy - my)`.
    fn draw_round_cap(&mut self, cx: f32, cy: f32, mx: f32, my: f32) {
        let cmx = C_ARC * mx;
        let cmy = C_ARC * my;
        self.out.curve_to(
            cx + mx - cmy,
            cy + my + cmx,
            cx - my + cmx,
            cy + mx + cmy,
            cx - my,
            cy + mx,
        );
        self.out.curve_to(
            cx - my - cmx,
            cy + mx - cmy,
            cx - mx - cmy,
            cy - my + cmx,
            cx - mx,
            cy - my,
        );
    }

    fn draw_square_end_cap(&mut self) {
        let (x, y, mx, my) = (self.cx0, self.cy0, self.cmx, self.cmy);
        self.emit_line_to(x - my + mx, y + mx + my, false);
        self.emit_line_to(x - my - mx, y + mx - my, false);
    }

    fn draw_square_start_cap(&mut self) {
        let (x, y, mx, my) = (self.sx0, self.sy0, self.smx, self.smy);
        self.emit_line_to(x + my - mx, y - mx - my, false);
        self.emit_line_to(x + my + mx, y - mx + my, false);
    }

    // ========================================================================
    // Subpath termination
    // ========================================================================

    /// End an open subpath. If the closed-path detector flagged this
    /// subpath as closed and the geometry returned to its start point (a
    /// dash pattern can do both), seal it with a join instead of caps.
    fn finish(&mut self) {
        if self.subpath_closed && self.cx0 == self.sx0 && self.cy0 == self.sy0 {
            self.close_impl();
            return;
        }

        match self.cap {
            Cap::Round => self.draw_round_cap(self.cx0, self.cy0, self.cmx, self.cmy),
            Cap::Square => self.draw_square_end_cap(),
            Cap::Butt => {}
        }
        self.emit_reverse();
        match self.cap {
            Cap::Round => self.draw_round_cap(self.sx0, self.sy0, -self.smx, -self.smy),
            Cap::Square => self.draw_square_start_cap(),
            Cap::Butt => {}
        }
        self.emit_close();
        self.prev = Prev::Closed;
    }

    fn close_impl(&mut self) {
        if self.prev != Prev::Drawing {
            if self.prev == Prev::Closed || self.prev == Prev::Init {
                return;
            }
            // a lone close of a single point: synthesize a horizontal
            // zero-length segment so the seam join below has directions
            self.emit_move_to(self.cx0, self.cy0 - self.w2);
            self.sdx = 1.0;
            self.sdy = 0.0;
            self.cdx = 1.0;
            self.cdy = 0.0;
            self.smx = 0.0;
            self.smy = -self.w2;
            self.cmx = 0.0;
            self.cmy = -self.w2;
            self.prev = Prev::Drawing;
        }

        if self.cx0 != self.sx0 || self.cy0 != self.sy0 {
            self.line_to_impl(self.sx0, self.sy0);
        }
        let (cdx, cdy, cx0, cy0) = (self.cdx, self.cdy, self.cx0, self.cy0);
        let (sdx, sdy, cmx, cmy, smx, smy) =
            (self.sdx, self.sdy, self.cmx, self.cmy, self.smx, self.smy);
        self.draw_join(cdx, cdy, cx0, cy0, sdx, sdy, cmx, cmy, smx, smy);
        self.emit_line_to(self.sx0 + self.smx, self.sy0 + self.smy, false);
        self.emit_move_to(self.sx0 - self.smx, self.sy0 - self.smy);
        self.emit_reverse();
        self.emit_close();
        self.prev = Prev::Closed;
    }

    // ========================================================================
    // Segments
    // ========================================================================

    fn line_to_impl(&mut self, x1: f32, y1: f32) {
        let mut dx = x1 - self.cx0;
        let dy = y1 - self.cy0;
        if dx == 0.0 && dy == 0.0 {
            // degenerate segment: give it a direction so a lone one still
            // produces a cap dot
            dx = 1.0;
        }
        let (mx, my) = Self::compute_offset(dx, dy, self.w2);
        let (cdx, cdy, cx0, cy0, cmx, cmy) =
            (self.cdx, self.cdy, self.cx0, self.cy0, self.cmx, self.cmy);
        self.draw_join(cdx, cdy, cx0, cy0, dx, dy, cmx, cmy, mx, my);

        self.emit_line_to(cx0 + mx, cy0 + my, false);
        self.emit_line_to(x1 + mx, y1 + my, false);
        self.emit_line_to(cx0 - mx, cy0 - my, true);
        self.emit_line_to(x1 - mx, y1 - my, true);

        self.cmx = mx;
        self.cmy = my;
        self.cdx = dx;
        self.cdy = dy;
        self.cx0 = x1;
        self.cy0 = y1;
    }

    /// Shared quad/cubic path: join at the incoming vertex, split into
    /// offset-safe pieces, offset each piece on both sides.
    fn something_to(&mut self, kind: usize, mid: &[f32]) {
        let n = kind - 2;
        let (ex, ey) = (mid[n], mid[n + 1]);

        let tangents = curve_tangents(mid, kind);
        let (dxs, dys, dxf, dyf) = match tangents {
            Some(t) => t,
            None => {
                // fully degenerate curve: same handling as a zero-length line
                self.line_to_impl(ex, ey);
                return;
            }
        };

        let (mx, my) = Self::compute_offset(dxs, dys, self.w2);
        let (cdx, cdy, cx0, cy0, cmx, cmy) =
            (self.cdx, self.cdy, self.cx0, self.cy0, self.cmx, self.cmy);
        self.draw_join(cdx, cdy, cx0, cy0, dxs, dys, cmx, cmy, mx, my);

        // split wherever a single offset piece could go wrong
        let mut ts = [0.0f32; 12];
        let nsplits = find_subdiv_points(&mut self.curve, mid, &mut ts, kind, self.w2);

        let middle = self.middle.acquire((nsplits + 2) * kind);
        middle[..kind].copy_from_slice(&mid[..kind]);
        let mut prev_t = 0.0f32;
        for (i, &t) in ts.iter().take(nsplits).enumerate() {
            let local = (t - prev_t) / (1.0 - prev_t);
            let off = i * kind;
            let src: [f32; 8] = {
                let mut s = [0.0f32; 8];
                s[..kind].copy_from_slice(&middle[off..off + kind]);
                s
            };
            let (left, right) = middle[off..].split_at_mut(kind);
            subdivide_at(local, &src[..kind], left, &mut right[..kind], kind);
            prev_t = t;
        }

        // offset every piece on both sides
        for i in 0..=nsplits {
            let off = i * kind;
            let piece: [f32; 8] = {
                let mut s = [0.0f32; 8];
                s[..kind].copy_from_slice(&self.middle.as_slice()[off..off + kind]);
                s
            };
            self.offset_piece(&piece[..kind], kind);
        }

        let (emx, emy) = Self::compute_offset(dxf, dyf, self.w2);
        self.cmx = emx;
        self.cmy = emy;
        self.cdx = dxf;
        self.cdy = dyf;
        self.cx0 = ex;
        self.cy0 = ey;
    }

    /// Offset one monotonic, curvature-bounded piece on both sides by
    /// displacing its control polygon and re-intersecting the displaced
    /// legs. The left offset streams forward (bridged by an explicit line
    /// to its start); the right offset is recorded for reverse replay
    /// with its own bridging endpoint.
    fn offset_piece(&mut self, p: &[f32], kind: usize) {
        match kind {
            SEG_QUAD => {
                let (l, r) = match (offset_quad(p, self.w2), offset_quad(p, -self.w2)) {
                    (Some(l), Some(r)) => (l, r),
                    _ => return, // fully degenerate piece
                };
                self.emit_line_to(l[0], l[1], false);
                self.emit_quad_to(&l, false);
                self.emit_quad_to(&r, true);
                self.emit_line_to(r[4], r[5], true);
            }
            SEG_CUBIC => {
                let (l, r) = match (offset_cubic(p, self.w2), offset_cubic(p, -self.w2)) {
                    (Some(l), Some(r)) => (l, r),
                    _ => return,
                };
                self.emit_line_to(l[0], l[1], false);
                self.emit_curve_to(&l, false);
                self.emit_curve_to(&r, true);
                self.emit_line_to(r[6], r[7], true);
            }
            _ => panic!("unsupported curve kind: {kind}"),
        }
    }
}

// ============================================================================
// Control-polygon offsetting
// ============================================================================

/// Intersection of the line through `(x0,y0)-(x1,y1)` with the line
/// through `(x2,y2)-(x3,y3)`.
#[allow(clippy::too_many_arguments)]
fn compute_intersection(
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    x3: f32,
    y3: f32,
) -> Option<(f32, f32)> {
    let x10 = x1 - x0;
    let y10 = y1 - y0;
    let x32 = x3 - x2;
    let y32 = y3 - y2;
    let den = x10 * y32 - x32 * y10;
    if den == 0.0 || !den.is_finite() {
        return None;
    }
    let t = (x32 * (y0 - y2) - y32 * (x0 - x2)) / den;
    Some((x0 + t * x10, y0 + t * y10))
}

fn leg(p: &[f32], a: usize, b: usize) -> (f32, f32) {
    (p[b] - p[a], p[b + 1] - p[a + 1])
}

fn perp_offset(dx: f32, dy: f32, w: f32) -> Option<(f32, f32)> {
    let len_sq = dx * dx + dy * dy;
    if len_sq < 1e-12 {
        return None;
    }
    let len = len_sq.sqrt();
    Some(((dy * w) / len, -(dx * w) / len))
}

/// Offset a quadratic's control polygon by `w`. Returns the offset quad
/// (6 coords, start included) or `None` when the piece is too degenerate
/// to carry a curve.
fn offset_quad(p: &[f32], w: f32) -> Option<[f32; 6]> {
    let l01 = leg(p, 0, 2);
    let l12 = leg(p, 2, 4);
    let chord = leg(p, 0, 4);

    let n01 = perp_offset(l01.0, l01.1, w).or_else(|| perp_offset(chord.0, chord.1, w))?;
    let n12 = perp_offset(l12.0, l12.1, w).or_else(|| perp_offset(chord.0, chord.1, w))?;

    let q0 = (p[0] + n01.0, p[1] + n01.1);
    let q2 = (p[4] + n12.0, p[5] + n12.1);
    let q1 = compute_intersection(
        q0.0,
        q0.1,
        q0.0 + l01.0,
        q0.1 + l01.1,
        p[2] + n12.0,
        p[3] + n12.1,
        p[2] + n12.0 + l12.0,
        p[3] + n12.1 + l12.1,
    )
    .unwrap_or((p[2] + (n01.0 + n12.0) / 2.0, p[3] + (n01.1 + n12.1) / 2.0));

    Some([q0.0, q0.1, q1.0, q1.1, q2.0, q2.1])
}

/// Offset a cubic's control polygon by `w`. Returns the offset cubic
/// (8 coords, start included) or `None` when the piece is too degenerate
/// to carry a curve.
fn offset_cubic(p: &[f32], w: f32) -> Option<[f32; 8]> {
    let chord = leg(p, 0, 6);

    let mut l01 = leg(p, 0, 2);
    if l01.0 * l01.0 + l01.1 * l01.1 < 1e-12 {
        l01 = leg(p, 0, 4);
    }
    let l12 = leg(p, 2, 4);
    let mut l23 = leg(p, 4, 6);
    if l23.0 * l23.0 + l23.1 * l23.1 < 1e-12 {
        l23 = leg(p, 2, 6);
    }

    let n01 = perp_offset(l01.0, l01.1, w).or_else(|| perp_offset(chord.0, chord.1, w))?;
    let n23 = perp_offset(l23.0, l23.1, w).or_else(|| perp_offset(chord.0, chord.1, w))?;
    let n12 = perp_offset(l12.0, l12.1, w)
        .unwrap_or(((n01.0 + n23.0) / 2.0, (n01.1 + n23.1) / 2.0));

    let q0 = (p[0] + n01.0, p[1] + n01.1);
    let q3 = (p[6] + n23.0, p[7] + n23.1);

    let q1 = compute_intersection(
        q0.0,
        q0.1,
        q0.0 + l01.0,
        q0.1 + l01.1,
        p[2] + n12.0,
        p[3] + n12.1,
        p[2] + n12.0 + l12.0,
        p[3] + n12.1 + l12.1,
    )
    .unwrap_or((p[2] + n01.0, p[3] + n01.1));

    let q2 = compute_intersection(
        p[4] + n12.0,
        p[5] + n12.1,
        p[4] + n12.0 + l12.0,
        p[5] + n12.1 + l12.1,
        q3.0,
        q3.1,
        q3.0 + l23.0,
        q3.1 + l23.1,
    )
    .unwrap_or((p[4] + n23.0, p[5] + n23.1));

    Some([q0.0, q0.1, q1.0, q1.1, q2.0, q2.1, q3.0, q3.1])
}

/// Start and end tangents of a curve, with degenerate-control fallbacks.
/// `None` when every control point coincides.
fn curve_tangents(mid: &[f32], kind: usize) -> Option<(f32, f32, f32, f32)> {
    let n = kind / 2;
    let mut start = None;
    for i in 1..n {
        let dx = mid[2 * i] - mid[0];
        let dy = mid[2 * i + 1] - mid[1];
        if dx != 0.0 || dy != 0.0 {
            start = Some((dx, dy));
            break;
        }
    }
    let mut end = None;
    for i in (0..n - 1).rev() {
        let dx = mid[2 * (n - 1)] - mid[2 * i];
        let dy = mid[2 * (n - 1) + 1] - mid[2 * i + 1];
        if dx != 0.0 || dy != 0.0 {
            end = Some((dx, dy));
            break;
        }
    }
    match (start, end) {
        (Some((sx, sy)), Some((ex, ey))) => Some((sx, sy, ex, ey)),
        _ => None,
    }
}

// ============================================================================
// Path consumer wiring
// ============================================================================

impl<C: PathConsumer> PathConsumer for Stroker<'_, C> {
    fn move_to(&mut self, x: f32, y: f32) {
        if self.prev == Prev::Drawing {
            self.finish();
        }
        self.subpath_closed = self.closed_path.get();
        self.sx0 = x;
        self.sy0 = y;
        self.cx0 = x;
        self.cy0 = y;
        self.sdx = 1.0;
        self.sdy = 0.0;
        self.cdx = 1.0;
        self.cdy = 0.0;
        self.prev = Prev::MoveTo;
    }

    fn line_to(&mut self, x: f32, y: f32) {
        if self.prev == Prev::Init {
            // defensive: drawing before any move_to
            self.move_to(x, y);
            return;
        }
        self.line_to_impl(x, y);
    }

    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        if self.prev == Prev::Init {
            self.move_to(x, y);
            return;
        }
        let mid = [self.cx0, self.cy0, cx, cy, x, y];
        self.something_to(SEG_QUAD, &mid);
    }

    fn curve_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        if self.prev == Prev::Init {
            self.move_to(x, y);
            return;
        }
        let mid = [self.cx0, self.cy0, c1x, c1y, c2x, c2y, x, y];
        self.something_to(SEG_CUBIC, &mid);
    }

    fn close_path(&mut self) {
        self.close_impl();
        // the seam becomes the new current point
        self.cx0 = self.sx0;
        self.cy0 = self.sy0;
        self.prev = Prev::Closed;
    }

    fn path_done(&mut self) {
        if self.prev == Prev::Drawing {
            self.finish();
        }
        self.reverse.clear();
        self.prev = Prev::Init;
        self.out.path_done();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::line_len;

    #[derive(Default)]
    struct OutlineSink {
        verts: Vec<(f32, f32)>,
        curve_ends: Vec<(f32, f32)>,
        closes: usize,
        done: bool,
    }

    impl PathConsumer for OutlineSink {
        fn move_to(&mut self, x: f32, y: f32) {
            self.verts.push((x, y));
        }
        fn line_to(&mut self, x: f32, y: f32) {
            self.verts.push((x, y));
        }
        fn quad_to(&mut self, _cx: f32, _cy: f32, x: f32, y: f32) {
            self.verts.push((x, y));
            self.curve_ends.push((x, y));
        }
        fn curve_to(&mut self, _c1x: f32, _c1y: f32, _c2x: f32, _c2y: f32, x: f32, y: f32) {
            self.verts.push((x, y));
            self.curve_ends.push((x, y));
        }
        fn close_path(&mut self) {
            self.closes += 1;
        }
        fn path_done(&mut self) {
            self.done = true;
        }
    }

    fn stroke_events(
        params: &StrokeParams,
        feed: impl FnOnce(&mut Stroker<'_, &mut OutlineSink>),
    ) -> OutlineSink {
        let mut sink = OutlineSink::default();
        let mut reverse = PolyStack::new();
        let mut middle = DirtyBuffer::new(64);
        let flag = Cell::new(false);
        {
            let mut st = Stroker::new(&mut sink, &mut reverse, &mut middle, &flag, params);
            feed(&mut st);
        }
        sink
    }

    fn params(width: f32, cap: Cap, join: Join, ml: f32) -> StrokeParams {
        StrokeParams::new(width, cap, join, ml).unwrap()
    }

    #[test]
    fn test_params_validation() {
        assert!(StrokeParams::new(0.0, Cap::Butt, Join::Miter, 4.0).is_err());
        assert!(StrokeParams::new(-1.0, Cap::Butt, Join::Miter, 4.0).is_err());
        assert!(StrokeParams::new(f32::NAN, Cap::Butt, Join::Miter, 4.0).is_err());
        assert!(StrokeParams::new(1.0, Cap::Butt, Join::Miter, 0.5).is_err());
        assert!(StrokeParams::new(1.0, Cap::Butt, Join::Miter, f32::NAN).is_err());
        assert!(StrokeParams::new(1.0, Cap::Butt, Join::Miter, 1.0).is_ok());
    }

    #[test]
    fn test_horizontal_segment_butt_outline() {
        let sink = stroke_events(&params(2.0, Cap::Butt, Join::Miter, 4.0), |st| {
            st.move_to(0.0, 0.0);
            st.line_to(10.0, 0.0);
            st.path_done();
        });
        assert!(sink.done);
        assert_eq!(sink.closes, 1);
        // the outline is exactly the rectangle [0,10] x [-1,1]
        for &(x, y) in &sink.verts {
            assert!((-0.001..=10.001).contains(&x), "x {x}");
            assert!((y.abs() - 1.0).abs() < 1e-5, "y {y}");
        }
        assert!(sink.verts.contains(&(0.0, -1.0)));
        assert!(sink.verts.contains(&(10.0, -1.0)));
        assert!(sink.verts.contains(&(10.0, 1.0)));
        assert!(sink.verts.contains(&(0.0, 1.0)));
    }

    #[test]
    fn test_square_cap_extends_half_width() {
        let sink = stroke_events(&params(2.0, Cap::Square, Join::Miter, 4.0), |st| {
            st.move_to(0.0, 0.0);
            st.line_to(10.0, 0.0);
            st.path_done();
        });
        let max_x = sink.verts.iter().map(|v| v.0).fold(f32::MIN, f32::max);
        let min_x = sink.verts.iter().map(|v| v.0).fold(f32::MAX, f32::min);
        assert!((max_x - 11.0).abs() < 1e-5, "end extends by w/2, got {max_x}");
        assert!((min_x + 1.0).abs() < 1e-5, "start extends by w/2, got {min_x}");
    }

    #[test]
    fn test_round_cap_stays_within_half_width() {
        let sink = stroke_events(&params(2.0, Cap::Round, Join::Miter, 4.0), |st| {
            st.move_to(0.0, 0.0);
            st.line_to(10.0, 0.0);
            st.path_done();
        });
        for &(x, y) in &sink.verts {
            assert!(x >= -1.001 && x <= 11.001);
            assert!(y.abs() <= 1.001);
        }
    }

    #[test]
    fn test_right_angle_miter_within_limit() {
        let sink = stroke_events(&params(2.0, Cap::Butt, Join::Miter, 4.0), |st| {
            st.move_to(0.0, 0.0);
            st.line_to(10.0, 0.0);
            st.line_to(10.0, 10.0);
            st.path_done();
        });
        // right-angle miter point is at (11, -1): distance w2*sqrt(2)
        let found = sink
            .verts
            .iter()
            .any(|&(x, y)| (x - 11.0).abs() < 1e-4 && (y + 1.0).abs() < 1e-4);
        assert!(found, "miter vertex missing: {:?}", sink.verts);
    }

    #[test]
    fn test_miter_limit_falls_back_to_bevel() {
        // A near-reversal: unconstrained miter would be enormous.
        let sink = stroke_events(&params(2.0, Cap::Butt, Join::Miter, 4.0), |st| {
            st.move_to(0.0, 0.0);
            st.line_to(10.0, 0.0);
            st.line_to(0.0, 0.4);
            st.path_done();
        });
        let max_x = sink.verts.iter().map(|v| v.0).fold(f32::MIN, f32::max);
        assert!(max_x < 11.0, "bevel expected, got extent {max_x}");
    }

    #[test]
    fn test_miter_length_respects_limit_property() {
        // For assorted turn angles, any emitted vertex beyond the segment
        // endpoints must lie within miter_limit * w2 of the joint.
        let limit = 2.0f32;
        for i in 1..12 {
            let ang = std::f32::consts::PI * i as f32 / 12.0;
            let (s, c) = ang.sin_cos();
            let sink = stroke_events(&params(2.0, Cap::Butt, Join::Miter, limit), |st| {
                st.move_to(-10.0, 0.0);
                st.line_to(0.0, 0.0);
                st.line_to(10.0 * c, 10.0 * s);
                st.path_done();
            });
            for &(x, y) in &sink.verts {
                let d_joint = line_len(x, y, 0.0, 0.0);
                if d_joint <= 1.5 {
                    continue; // regular offset vertices sit within w2
                }
                // vertices near the segment bodies are fine; miter points
                // are the only ones that can sit away from both
                let on_seg1 = y.abs() <= 1.0 + 1e-3 && x <= 0.0 + 1e-3;
                let on_seg2 = {
                    let proj = x * c + y * s;
                    let perp = (x * s - y * c).abs();
                    perp <= 1.0 + 1e-3 && proj >= -1e-3
                };
                if !(on_seg1 || on_seg2) {
                    assert!(
                        d_joint <= limit * 1.0 + 1e-3,
                        "angle {ang}: miter vertex ({x},{y}) at {d_joint}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_closed_triangle_emits_joins_not_caps() {
        let sink = stroke_events(&params(1.0, Cap::Square, Join::Bevel, 4.0), |st| {
            st.move_to(0.0, 0.0);
            st.line_to(10.0, 0.0);
            st.line_to(5.0, 10.0);
            st.close_path();
            st.path_done();
        });
        // the inner loop carries the explicit close; the outer loop ends
        // exactly on its own starting point — no square cap spikes anywhere
        assert_eq!(sink.closes, 1);
        for &(x, y) in &sink.verts {
            assert!(
                (-2.0..=12.0).contains(&x) && (-2.0..=12.0).contains(&y),
                "cap-like excursion at ({x},{y})"
            );
        }
    }

    #[test]
    fn test_degenerate_subpath_round_cap_dot() {
        let sink = stroke_events(&params(4.0, Cap::Round, Join::Miter, 4.0), |st| {
            st.move_to(5.0, 5.0);
            st.line_to(5.0, 5.0);
            st.path_done();
        });
        // a round dot of radius 2 around (5,5): all vertices on/inside it
        assert!(sink.verts.len() >= 4, "dot outline expected");
        for &(x, y) in &sink.verts {
            let d = line_len(x, y, 5.0, 5.0);
            assert!((d - 2.0).abs() < 0.05, "dot vertex at distance {d}");
        }
    }

    #[test]
    fn test_degenerate_subpath_butt_cap_vanishes() {
        let sink = stroke_events(&params(4.0, Cap::Butt, Join::Miter, 4.0), |st| {
            st.move_to(5.0, 5.0);
            st.line_to(5.0, 5.0);
            st.path_done();
        });
        // butt caps collapse the dot to a zero-area sliver on x in [5,5]
        for &(x, _) in &sink.verts {
            assert!((x - 5.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_curve_offsets_at_half_width() {
        // Sample the stroked outline of a gentle quad: every emitted
        // vertex must lie within [w2 - tol, w2 + tol] of the center curve.
        let sink = stroke_events(&params(1.0, Cap::Butt, Join::Round, 4.0), |st| {
            st.move_to(0.0, 0.0);
            st.quad_to(5.0, 4.0, 10.0, 0.0);
            st.path_done();
        });
        let center = |t: f32| -> (f32, f32) {
            let u = 1.0 - t;
            (
                u * u * 0.0 + 2.0 * u * t * 5.0 + t * t * 10.0,
                2.0 * u * t * 4.0,
            )
        };
        for &(x, y) in &sink.verts {
            let mut best = f32::MAX;
            for i in 0..=100 {
                let (cx, cy) = center(i as f32 / 100.0);
                best = best.min(line_len(x, y, cx, cy));
            }
            assert!(
                (best - 0.5).abs() < 0.12,
                "outline vertex ({x},{y}) at distance {best} from center"
            );
        }
    }

    #[test]
    fn test_round_join_vertices_on_arc() {
        let sink = stroke_events(&params(2.0, Cap::Butt, Join::Round, 4.0), |st| {
            st.move_to(0.0, 0.0);
            st.line_to(10.0, 0.0);
            st.line_to(10.0, 10.0);
            st.path_done();
        });
        // the round join is made of curve pieces whose endpoints sit at
        // distance w2 from the joint
        assert!(!sink.curve_ends.is_empty(), "round join should emit curves");
        for &(x, y) in &sink.curve_ends {
            let d = line_len(x, y, 10.0, 0.0);
            assert!((d - 1.0).abs() < 0.05, "arc vertex ({x},{y}) at distance {d}");
        }
    }
}
