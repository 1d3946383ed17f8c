//! Affine transformations.
//!
//! A 2x2 linear matrix plus translation:
//!
//! ```text
//! x' = x * sx  + y * shx + tx
//! y' = x * shy + y * sy  + ty
//! ```
//!
//! Beyond the usual constructors and inversion, this module carries the
//! classification queries the stroking engine needs: is the matrix a pure
//! axis scale, is it a uniform orthogonal scale (so line widths scale by a
//! single factor), and what is the maximum factor by which it stretches
//! any unit vector.

// ============================================================================
// TransAffine
// ============================================================================

/// Affine transformation matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransAffine {
    pub sx: f64,
    pub shy: f64,
    pub shx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl TransAffine {
    /// Identity matrix.
    pub fn new() -> Self {
        Self {
            sx: 1.0,
            shy: 0.0,
            shx: 0.0,
            sy: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Custom matrix from all six members.
    pub fn new_all(sx: f64, shy: f64, shx: f64, sy: f64, tx: f64, ty: f64) -> Self {
        Self {
            sx,
            shy,
            shx,
            sy,
            tx,
            ty,
        }
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new_all(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self::new_all(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub fn rotation(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new_all(c, s, -s, c, 0.0, 0.0)
    }

    /// Multiply by `m` (this transform happens first, then `m`).
    pub fn multiply(&mut self, m: &TransAffine) -> &mut Self {
        let t0 = self.sx * m.sx + self.shy * m.shx;
        let t2 = self.shx * m.sx + self.sy * m.shx;
        let t4 = self.tx * m.sx + self.ty * m.shx + m.tx;
        self.shy = self.sx * m.shy + self.shy * m.sy;
        self.sy = self.shx * m.shy + self.sy * m.sy;
        self.ty = self.tx * m.shy + self.ty * m.sy + m.ty;
        self.sx = t0;
        self.shx = t2;
        self.tx = t4;
        self
    }

    /// Determinant of the 2x2 linear part.
    #[inline]
    pub fn determinant(&self) -> f64 {
        self.sx * self.sy - self.shy * self.shx
    }

    /// Invert in place. The caller must have checked the determinant;
    /// inverting a singular matrix produces infinities, not a panic.
    pub fn invert(&mut self) -> &mut Self {
        let d = 1.0 / self.determinant();

        let t0 = self.sy * d;
        self.sy = self.sx * d;
        self.shy = -self.shy * d;
        self.shx = -self.shx * d;

        let t4 = -self.tx * t0 - self.ty * self.shx;
        self.ty = -self.tx * self.shy - self.ty * self.sy;

        self.sx = t0;
        self.tx = t4;
        self
    }

    /// Transform a point.
    #[inline]
    pub fn transform(&self, x: &mut f64, y: &mut f64) {
        let tmp = *x;
        *x = tmp * self.sx + *y * self.shx + self.tx;
        *y = tmp * self.shy + *y * self.sy + self.ty;
    }

    /// Transform a vector through the 2x2 part only (no translation).
    #[inline]
    pub fn transform_2x2(&self, x: &mut f64, y: &mut f64) {
        let tmp = *x;
        *x = tmp * self.sx + *y * self.shx;
        *y = tmp * self.shy + *y * self.sy;
    }

    /// `true` when the matrix is exactly the identity.
    pub fn is_identity(&self) -> bool {
        self.sx == 1.0
            && self.shy == 0.0
            && self.shx == 0.0
            && self.sy == 1.0
            && self.tx == 0.0
            && self.ty == 0.0
    }

    /// `true` when the linear part has no shear terms (a pure axis scale,
    /// possibly with translation).
    #[inline]
    pub fn is_axis_scale(&self) -> bool {
        self.shx == 0.0 && self.shy == 0.0
    }

    /// `true` when the linear part is numerically singular: widening a
    /// stroke through it collapses the entire shape.
    pub fn is_singular(&self) -> bool {
        self.determinant().abs() <= 2.0 * f32::MIN_POSITIVE as f64
    }

    /// If the matrix is a constant multiple of an orthogonal transform —
    /// every length is scaled by the same factor — return that factor.
    ///
    /// The condition is `sx*shx + shy*sy == 0` and
    /// `sx² + shy² == shx² + sy²`, with room left for rounding error.
    pub fn uniform_scale(&self) -> Option<f64> {
        let a = self.sx;
        let b = self.shx;
        let c = self.shy;
        let d = self.sy;
        let norm = a * a + b * b + c * c + d * d;
        let eps = 1e-10 * norm;
        if (a * b + c * d).abs() <= eps && ((a * a + c * c) - (b * b + d * d)).abs() <= eps {
            Some((a * a + c * c).sqrt())
        } else {
            None
        }
    }

    /// The maximum factor by which the linear part stretches any unit
    /// vector. Used to normalize minimum pen widths: maximizing
    /// `|Mv|² = (EA x² + EB xy + EC y²)` over the unit circle gives
    /// `(EA + EC + hypot(EB, EA - EC)) / 2`.
    pub fn max_scale(&self) -> f64 {
        let a = self.sx;
        let b = self.shy;
        let c = self.shx;
        let d = self.sy;

        let ea = a * a + b * b;
        let eb = 2.0 * (a * c + b * d);
        let ec = c * c + d * d;

        let hypot = (eb * eb + (ea - ec) * (ea - ec)).sqrt();
        (0.5 * (ea + ec + hypot)).sqrt()
    }
}

impl Default for TransAffine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-10;

    #[test]
    fn test_identity() {
        let m = TransAffine::new();
        assert!(m.is_identity());
        let mut x = 3.0;
        let mut y = 4.0;
        m.transform(&mut x, &mut y);
        assert_eq!(x, 3.0);
        assert_eq!(y, 4.0);
    }

    #[test]
    fn test_translation() {
        let m = TransAffine::translation(10.0, 20.0);
        let mut x = 1.0;
        let mut y = 2.0;
        m.transform(&mut x, &mut y);
        assert_eq!(x, 11.0);
        assert_eq!(y, 22.0);
        // translation does not affect the 2x2 part
        let mut vx = 1.0;
        let mut vy = 2.0;
        m.transform_2x2(&mut vx, &mut vy);
        assert_eq!(vx, 1.0);
        assert_eq!(vy, 2.0);
    }

    #[test]
    fn test_scaling() {
        let m = TransAffine::scaling(2.0, 3.0);
        assert!(m.is_axis_scale());
        let mut x = 1.0;
        let mut y = 1.0;
        m.transform(&mut x, &mut y);
        assert_eq!(x, 2.0);
        assert_eq!(y, 3.0);
    }

    #[test]
    fn test_rotation() {
        let m = TransAffine::rotation(std::f64::consts::FRAC_PI_2);
        assert!(!m.is_axis_scale());
        let mut x = 1.0;
        let mut y = 0.0;
        m.transform(&mut x, &mut y);
        assert!(x.abs() < EPS);
        assert!((y - 1.0).abs() < EPS);
    }

    #[test]
    fn test_invert_round_trip() {
        let mut m = TransAffine::new_all(2.0, 0.5, -0.3, 1.5, 7.0, -2.0);
        let orig = m;
        m.invert();
        let mut x = 13.0;
        let mut y = -4.0;
        orig.transform(&mut x, &mut y);
        m.transform(&mut x, &mut y);
        assert!((x - 13.0).abs() < EPS);
        assert!((y + 4.0).abs() < EPS);
    }

    #[test]
    fn test_multiply_composes() {
        let mut m = TransAffine::scaling(2.0, 2.0);
        m.multiply(&TransAffine::translation(5.0, 5.0));
        let mut x = 1.0;
        let mut y = 1.0;
        m.transform(&mut x, &mut y);
        assert_eq!(x, 7.0);
        assert_eq!(y, 7.0);
    }

    #[test]
    fn test_determinant_and_singular() {
        let m = TransAffine::scaling(2.0, 3.0);
        assert!((m.determinant() - 6.0).abs() < EPS);
        assert!(!m.is_singular());

        let flat = TransAffine::new_all(1.0, 2.0, 0.5, 1.0, 0.0, 0.0);
        assert!(flat.is_singular());

        let zero = TransAffine::scaling(0.0, 5.0);
        assert!(zero.is_singular());
    }

    #[test]
    fn test_uniform_scale_detection() {
        // Rotation times uniform scale: uniform.
        let mut m = TransAffine::rotation(0.7);
        m.multiply(&TransAffine::scaling(3.0, 3.0));
        let s = m.uniform_scale().expect("rot*scale is uniform");
        assert!((s - 3.0).abs() < 1e-9);

        // Non-uniform scale: not uniform.
        assert!(TransAffine::scaling(2.0, 3.0).uniform_scale().is_none());

        // Shear: not uniform.
        assert!(TransAffine::new_all(1.0, 0.0, 0.5, 1.0, 0.0, 0.0)
            .uniform_scale()
            .is_none());
    }

    #[test]
    fn test_max_scale() {
        assert!((TransAffine::scaling(2.0, 3.0).max_scale() - 3.0).abs() < EPS);
        assert!((TransAffine::rotation(1.0).max_scale() - 1.0).abs() < EPS);
        let mut m = TransAffine::rotation(0.3);
        m.multiply(&TransAffine::scaling(4.0, 4.0));
        assert!((m.max_scale() - 4.0).abs() < 1e-9);
    }
}
