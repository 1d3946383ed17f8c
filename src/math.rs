//! Scalar curve mathematics: polynomial evaluation, root finding, arc-length
//! estimation, and the small-array sorting/filtering helpers used by the
//! subdivision machinery.
//!
//! The quadratic solver picks its branch from the sign of `b` so it never
//! adds quantities of opposite sign; the cubic solver normalizes to the
//! depressed form and runs Cardano's method in double precision, because a
//! nearly-flat cubic has a tiny leading coefficient and single precision
//! loses the roots entirely.

// ============================================================================
// Tolerance helpers
// ============================================================================

/// Returns `true` if `x` and `y` differ by no more than `err`.
/// Written so a NaN input always compares unequal.
#[inline]
pub fn within(x: f32, y: f32, err: f32) -> bool {
    let d = y - x;
    d <= err && d >= -err
}

/// Double-precision variant of [`within`].
#[inline]
pub fn within_d(x: f64, y: f64, err: f64) -> bool {
    let d = y - x;
    d <= err && d >= -err
}

// ============================================================================
// Polynomial evaluation
// ============================================================================

/// Evaluate `a*t^3 + b*t^2 + c*t + d` (Horner form).
#[inline]
pub fn eval_cubic(a: f32, b: f32, c: f32, d: f32, t: f32) -> f32 {
    t * (t * (t * a + b) + c) + d
}

/// Evaluate `a*t^2 + b*t + c` (Horner form).
#[inline]
pub fn eval_quad(a: f32, b: f32, c: f32, t: f32) -> f32 {
    t * (t * a + b) + c
}

// ============================================================================
// Root finding
// ============================================================================

/// Solve `a*t^2 + b*t + c = 0`, writing real roots into `zeroes`.
/// Returns the number of roots (0, 1, or 2). Roots are not sorted.
///
/// Uses the multiplication form of the quadratic formula on the branch
/// matching the sign of `b`, avoiding the catastrophic cancellation of
/// `-b + sqrt(dis)` when `b > 0` (and vice versa).
pub fn quadratic_roots(a: f32, b: f32, c: f32, zeroes: &mut [f32]) -> usize {
    let mut ret = 0;
    if a != 0.0 {
        let dis = b * b - 4.0 * a * c;
        if dis > 0.0 {
            let sqrt_dis = dis.sqrt();
            if b >= 0.0 {
                zeroes[ret] = (2.0 * c) / (-b - sqrt_dis);
                zeroes[ret + 1] = (-b - sqrt_dis) / (2.0 * a);
                ret += 2;
            } else {
                zeroes[ret] = (-b + sqrt_dis) / (2.0 * a);
                zeroes[ret + 1] = (2.0 * c) / (-b + sqrt_dis);
                ret += 2;
            }
        } else if dis == 0.0 {
            zeroes[ret] = -b / (2.0 * a);
            ret += 1;
        }
    } else if b != 0.0 {
        zeroes[ret] = -c / b;
        ret += 1;
    }
    ret
}

/// Find the roots of `d*t^3 + a*t^2 + b*t + c` lying in `[lo, hi)`.
/// Writes them into `pts` and returns how many there are. Falls back to
/// the quadratic solver when the cubic term vanishes.
pub fn cubic_roots_in_ab(d: f32, a: f32, b: f32, c: f32, pts: &mut [f32], lo: f32, hi: f32) -> usize {
    if d == 0.0 {
        let num = quadratic_roots(a, b, c, pts);
        return filter_out_not_in_ab(pts, 0, num, lo, hi);
    }

    // Normal form: t^3 + a*t^2 + b*t + c = 0. Double precision here: when
    // the curve is nearly flat `d` is tiny and the normalized coefficients
    // are huge, so f32 arithmetic destroys the roots.
    let a = a as f64 / d as f64;
    let b = b as f64 / d as f64;
    let c = c as f64 / d as f64;

    // Substitute t = y - a/3 to eliminate the quadratic term, giving
    // y^3 + P*y + Q = 0. The calculations below want p = P/3 and q = Q/2.
    let sub = (1.0 / 3.0) * a;
    let sq_a = a * a;
    let p = (1.0 / 3.0) * ((-1.0 / 3.0) * sq_a + b);
    let q = (1.0 / 2.0) * ((2.0 / 27.0) * a * sq_a - sub * b + c);

    // Cardano's method.
    let cb_p = p * p * p;
    let dis = q * q + cb_p;

    let num;
    if dis < 0.0 {
        // Three real roots: trigonometric branch.
        let phi = (1.0 / 3.0) * (-q / (-cb_p).sqrt()).acos();
        let t = 2.0 * (-p).sqrt();

        pts[0] = (t * phi.cos() - sub) as f32;
        pts[1] = (-t * (phi + std::f64::consts::PI / 3.0).cos() - sub) as f32;
        pts[2] = (-t * (phi - std::f64::consts::PI / 3.0).cos() - sub) as f32;
        num = 3;
    } else {
        let sqrt_dis = dis.sqrt();
        let u = (sqrt_dis - q).cbrt();
        let v = -(sqrt_dis + q).cbrt();

        pts[0] = (u + v - sub) as f32;
        num = if within_d(dis, 0.0, 1e-8) {
            pts[1] = ((-1.0 / 2.0) * (u + v) - sub) as f32;
            2
        } else {
            1
        };
    }

    filter_out_not_in_ab(pts, 0, num, lo, hi)
}

/// Keep only the values of `nums[off..off + len]` lying in `[lo, hi)`,
/// compacting them toward `off`. Returns the number kept.
pub fn filter_out_not_in_ab(nums: &mut [f32], off: usize, len: usize, lo: f32, hi: f32) -> usize {
    let mut ret = off;
    for i in off..off + len {
        let v = nums[i];
        if v >= lo && v < hi {
            nums[ret] = v;
            ret += 1;
        }
    }
    ret - off
}

/// In-place insertion sort of `a[..len]`. The subdivision-parameter arrays
/// this is used on never exceed a handful of elements.
pub fn isort(a: &mut [f32], len: usize) {
    for i in 1..len {
        let ai = a[i];
        let mut j = i;
        while j > 0 && a[j - 1] > ai {
            a[j] = a[j - 1];
            j -= 1;
        }
        a[j] = ai;
    }
}

// ============================================================================
// Arc-length estimation
// ============================================================================

/// Exact length of the segment `(x0, y0) -> (x1, y1)`.
#[inline]
pub fn line_len(x0: f32, y0: f32, x1: f32, y1: f32) -> f32 {
    let dx = x1 - x0;
    let dy = y1 - y0;
    (dx * dx + dy * dy).sqrt()
}

/// Manhattan-norm estimate of the segment length (cheap upper-ish bound).
#[inline]
pub fn fast_line_len(x0: f32, y0: f32, x1: f32, y1: f32) -> f32 {
    (x1 - x0).abs() + (y1 - y0).abs()
}

/// Estimate of a quadratic's arc length: average of its control-polygon
/// length (an upper bound) and its chord (a lower bound).
pub fn quad_len(x0: f32, y0: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    (line_len(x0, y0, x1, y1) + line_len(x1, y1, x2, y2) + line_len(x0, y0, x2, y2)) / 2.0
}

/// Manhattan-norm estimate of a quadratic's control-polygon length.
pub fn fast_quad_len(x0: f32, y0: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    (x1 - x0).abs() + (x2 - x1).abs() + (y1 - y0).abs() + (y2 - y1).abs()
}

/// Estimate of a cubic's arc length: average of its control-polygon length
/// and its chord.
#[allow(clippy::too_many_arguments)]
pub fn curve_len(x0: f32, y0: f32, x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32) -> f32 {
    (line_len(x0, y0, x1, y1)
        + line_len(x1, y1, x2, y2)
        + line_len(x2, y2, x3, y3)
        + line_len(x0, y0, x3, y3))
        / 2.0
}

/// Manhattan-norm estimate of a cubic's control-polygon length.
#[allow(clippy::too_many_arguments)]
pub fn fast_curve_len(
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    x3: f32,
    y3: f32,
) -> f32 {
    (x1 - x0).abs()
        + (x2 - x1).abs()
        + (x3 - x2).abs()
        + (y1 - y0).abs()
        + (y2 - y1).abs()
        + (y3 - y2).abs()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_within() {
        assert!(within(1.0, 1.0, 0.0));
        assert!(within(1.0, 1.000001, 1e-5));
        assert!(!within(1.0, 1.1, 1e-5));
        assert!(!within(f32::NAN, 1.0, 1e-5));
    }

    #[test]
    fn test_eval() {
        assert_eq!(eval_quad(1.0, 0.0, 0.0, 3.0), 9.0);
        assert_eq!(eval_cubic(1.0, 0.0, 0.0, 0.0, 2.0), 8.0);
        assert_eq!(eval_cubic(1.0, 1.0, 1.0, 1.0, 1.0), 4.0);
    }

    #[test]
    fn test_quadratic_two_roots() {
        // (t - 1)(t - 3) = t^2 - 4t + 3
        let mut roots = [0.0f32; 2];
        let n = quadratic_roots(1.0, -4.0, 3.0, &mut roots);
        assert_eq!(n, 2);
        roots.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((roots[0] - 1.0).abs() < EPS);
        assert!((roots[1] - 3.0).abs() < EPS);
    }

    #[test]
    fn test_quadratic_double_root() {
        // (t - 2)^2 = t^2 - 4t + 4
        let mut roots = [0.0f32; 2];
        let n = quadratic_roots(1.0, -4.0, 4.0, &mut roots);
        assert_eq!(n, 1);
        assert!((roots[0] - 2.0).abs() < EPS);
    }

    #[test]
    fn test_quadratic_no_real_roots() {
        // t^2 + 1
        let mut roots = [0.0f32; 2];
        assert_eq!(quadratic_roots(1.0, 0.0, 1.0, &mut roots), 0);
    }

    #[test]
    fn test_quadratic_degenerate_linear() {
        // 2t - 4 = 0
        let mut roots = [0.0f32; 2];
        let n = quadratic_roots(0.0, 2.0, -4.0, &mut roots);
        assert_eq!(n, 1);
        assert!((roots[0] - 2.0).abs() < EPS);
    }

    #[test]
    fn test_quadratic_degenerate_constant() {
        let mut roots = [0.0f32; 2];
        assert_eq!(quadratic_roots(0.0, 0.0, 5.0, &mut roots), 0);
    }

    #[test]
    fn test_quadratic_cancellation_stability() {
        // Large b relative to a*c: the naive formula loses the small root.
        let mut roots = [0.0f32; 2];
        let n = quadratic_roots(1.0, 1e4, 1.0, &mut roots);
        assert_eq!(n, 2);
        let small = roots[0].abs().min(roots[1].abs());
        // true small root ~ -1e-4
        assert!((small - 1e-4).abs() < 1e-7, "small root {small}");
    }

    #[test]
    fn test_cubic_three_roots() {
        // (t - 0.2)(t - 0.5)(t - 0.8)
        // = t^3 - 1.5 t^2 + 0.66 t - 0.08
        let mut pts = [0.0f32; 3];
        let n = cubic_roots_in_ab(1.0, -1.5, 0.66, -0.08, &mut pts, 0.0, 1.0);
        assert_eq!(n, 3);
        let mut r = pts;
        r.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((r[0] - 0.2).abs() < 1e-4);
        assert!((r[1] - 0.5).abs() < 1e-4);
        assert!((r[2] - 0.8).abs() < 1e-4);
    }

    #[test]
    fn test_cubic_one_root() {
        // t^3 - 0.125 → root at 0.5
        let mut pts = [0.0f32; 3];
        let n = cubic_roots_in_ab(1.0, 0.0, 0.0, -0.125, &mut pts, 0.0, 1.0);
        assert_eq!(n, 1);
        assert!((pts[0] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_cubic_interval_filtering() {
        // (t - 0.5)(t - 2)(t + 1) = t^3 - 1.5 t^2 - 1.5 t^? — compute:
        // (t-0.5)(t-2) = t^2 - 2.5t + 1; *(t+1) = t^3 - 1.5 t^2 - 1.5 t + 1
        let mut pts = [0.0f32; 3];
        let n = cubic_roots_in_ab(1.0, -1.5, -1.5, 1.0, &mut pts, 0.0, 1.0);
        assert_eq!(n, 1);
        assert!((pts[0] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_cubic_degenerates_to_quadratic() {
        // 0*t^3 + t^2 - 0.25 → root 0.5 in [0,1)
        let mut pts = [0.0f32; 3];
        let n = cubic_roots_in_ab(0.0, 1.0, 0.0, -0.25, &mut pts, 0.0, 1.0);
        assert_eq!(n, 1);
        assert!((pts[0] - 0.5).abs() < EPS);
    }

    #[test]
    fn test_cubic_tiny_leading_coefficient() {
        // Nearly-flat cubic: d very small, effectively quadratic with
        // roots 0.25 and 0.75: (t-0.25)(t-0.75) = t^2 - t + 0.1875
        let d = 1e-7f32;
        let mut pts = [0.0f32; 3];
        let n = cubic_roots_in_ab(d, 1.0, -1.0, 0.1875, &mut pts, 0.0, 1.0);
        assert!(n >= 2, "expected at least the two quadratic-like roots");
        isort(&mut pts, n);
        assert!((pts[0] - 0.25).abs() < 1e-3);
        assert!((pts[1] - 0.75).abs() < 1e-3);
    }

    #[test]
    fn test_filter_out_not_in_ab() {
        let mut a = [0.5, -0.1, 0.9, 1.0, 0.0, 0.3];
        let n = filter_out_not_in_ab(&mut a, 0, 6, 0.0, 1.0);
        assert_eq!(n, 4);
        assert_eq!(&a[..n], &[0.5, 0.9, 0.0, 0.3]);
    }

    #[test]
    fn test_isort() {
        let mut a = [0.9, 0.1, 0.5, 0.3, 0.7];
        isort(&mut a, 5);
        assert_eq!(a, [0.1, 0.3, 0.5, 0.7, 0.9]);

        let mut partial = [0.9, 0.1, 0.5, 99.0];
        isort(&mut partial, 3);
        assert_eq!(partial, [0.1, 0.5, 0.9, 99.0]);
    }

    #[test]
    fn test_line_len() {
        assert!((line_len(0.0, 0.0, 3.0, 4.0) - 5.0).abs() < EPS);
        assert_eq!(fast_line_len(0.0, 0.0, 3.0, 4.0), 7.0);
    }

    #[test]
    fn test_quad_len_bounds() {
        // Quadratic arc from (0,0) to (2,0) with control (1,1).
        let est = quad_len(0.0, 0.0, 1.0, 1.0, 2.0, 0.0);
        let chord = line_len(0.0, 0.0, 2.0, 0.0);
        let poly = line_len(0.0, 0.0, 1.0, 1.0) + line_len(1.0, 1.0, 2.0, 0.0);
        assert!(est >= chord && est <= poly);
    }

    #[test]
    fn test_curve_len_straight() {
        // Degenerate cubic along a line: estimate equals the exact length.
        let l = curve_len(0.0, 0.0, 1.0, 0.0, 2.0, 0.0, 3.0, 0.0);
        assert!((l - 3.0).abs() < EPS);
    }
}
