//! Brent's method for bracketed root finding
//!
//! Combines bisection, secant and inverse quadratic interpolation; the
//! bracket is maintained throughout, so convergence is guaranteed whenever
//! the endpoints straddle a root.

use crate::error::RootFindError;

/// Find a root of `f` inside `[lo, hi]`.
///
/// The endpoints must bracket a sign change; otherwise
/// `RootFindError::NoSignChange` reports the endpoint values so callers can
/// surface the attempted bracket.
pub fn find_root<F>(
    mut f: F,
    lo: f64,
    hi: f64,
    xtol: f64,
    max_iter: usize,
) -> Result<f64, RootFindError>
where
    F: FnMut(f64) -> f64,
{
    let (mut a, mut b) = (lo, hi);
    let (mut fa, mut fb) = (f(a), f(b));

    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }
    if (fa > 0.0) == (fb > 0.0) {
        return Err(RootFindError::NoSignChange { f_lo: fa, f_hi: fb });
    }

    let (mut c, mut fc) = (b, fb);
    let (mut d, mut e) = (b - a, b - a);

    for _ in 0..max_iter {
        if (fb > 0.0) == (fc > 0.0) {
            // Root moved between a and b: reset the third point
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 2.0 * f64::EPSILON * b.abs() + 0.5 * xtol;
        let midpoint = 0.5 * (c - b);
        if midpoint.abs() <= tol || fb == 0.0 {
            return Ok(b);
        }

        if e.abs() >= tol && fa.abs() > fb.abs() {
            // Interpolation step: secant when only two points are distinct,
            // inverse quadratic otherwise
            let s = fb / fa;
            let (mut p, mut q);
            if a == c {
                p = 2.0 * midpoint * s;
                q = 1.0 - s;
            } else {
                let q1 = fa / fc;
                let r = fb / fc;
                p = s * (2.0 * midpoint * q1 * (q1 - r) - (b - a) * (r - 1.0));
                q = (q1 - 1.0) * (r - 1.0) * (s - 1.0);
            }
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();
            let accept_1 = 3.0 * midpoint * q - (tol * q).abs();
            let accept_2 = (e * q).abs();
            if 2.0 * p < accept_1.min(accept_2) {
                e = d;
                d = p / q;
            } else {
                // Interpolation would leave the bracket; bisect instead
                d = midpoint;
                e = d;
            }
        } else {
            d = midpoint;
            e = d;
        }

        a = b;
        fa = fb;
        if d.abs() > tol {
            b += d;
        } else {
            b += if midpoint > 0.0 { tol } else { -tol };
        }
        fb = f(b);
    }

    Err(RootFindError::MaxIterations { last: b })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_simple_roots() {
        let root = find_root(|x| x * x - 4.0, 0.0, 10.0, 1e-12, 100).unwrap();
        assert!((root - 2.0).abs() < 1e-9, "got {root}");

        let root = find_root(|x| x.cos() - x, 0.0, 1.0, 1e-12, 100).unwrap();
        assert!((root - 0.739_085_133).abs() < 1e-6, "got {root}");

        // Root at an endpoint
        let root = find_root(|x| x - 3.0, 3.0, 5.0, 1e-12, 100).unwrap();
        assert_eq!(root, 3.0);
    }

    #[test]
    fn test_steep_and_flat_functions() {
        let root = find_root(|x| (x - 1.5).powi(3), 0.0, 4.0, 1e-12, 200).unwrap();
        assert!((root - 1.5).abs() < 1e-4, "got {root}");

        let root = find_root(|x| 1e6 * (x - 0.25), 0.0, 1.0, 1e-12, 100).unwrap();
        assert!((root - 0.25).abs() < 1e-9, "got {root}");
    }

    #[test]
    fn test_no_sign_change_reports_endpoints() {
        let err = find_root(|x| x * x + 1.0, -1.0, 1.0, 1e-10, 100).unwrap_err();
        match err {
            RootFindError::NoSignChange { f_lo, f_hi } => {
                assert_eq!(f_lo, 2.0);
                assert_eq!(f_hi, 2.0);
            }
            other => panic!("expected NoSignChange, got {other:?}"),
        }
    }
}
