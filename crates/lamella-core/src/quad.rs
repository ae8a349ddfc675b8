//! Adaptive Simpson quadrature for complex-valued integrands.
//!
//! Field-expansion integrals pair an arbitrary incident profile with a
//! mode's magnetic field; both are smooth within a layer, so adaptive
//! Simpson on each layer segment converges quickly. The tolerance is the
//! caller-supplied expansion accuracy.

use num_complex::Complex64;

const MAX_DEPTH: u32 = 30;

/// Integrate `f` over the real interval `[a, b]` to absolute tolerance `tol`.
pub fn adaptive_simpson<F>(f: &F, a: f64, b: f64, tol: f64) -> Complex64
where
    F: Fn(f64) -> Complex64,
{
    let m = 0.5 * (a + b);
    let fa = f(a);
    let fm = f(m);
    let fb = f(b);
    let whole = simpson(fa, fm, fb, b - a);
    recurse(f, a, b, fa, fm, fb, whole, tol, MAX_DEPTH)
}

fn simpson(fa: Complex64, fm: Complex64, fb: Complex64, h: f64) -> Complex64 {
    (fa + 4.0 * fm + fb) * (h / 6.0)
}

#[allow(clippy::too_many_arguments)]
fn recurse<F>(
    f: &F,
    a: f64,
    b: f64,
    fa: Complex64,
    fm: Complex64,
    fb: Complex64,
    whole: Complex64,
    tol: f64,
    depth: u32,
) -> Complex64
where
    F: Fn(f64) -> Complex64,
{
    let m = 0.5 * (a + b);
    let lm = 0.5 * (a + m);
    let rm = 0.5 * (m + b);
    let flm = f(lm);
    let frm = f(rm);

    let left = simpson(fa, flm, fm, m - a);
    let right = simpson(fm, frm, fb, b - m);
    let refined = left + right;
    let err = refined - whole;

    if depth == 0 || err.norm() <= 15.0 * tol {
        // Richardson extrapolation on the two half-interval estimates.
        return refined + err / 15.0;
    }

    recurse(f, a, m, fa, flm, fm, left, 0.5 * tol, depth - 1)
        + recurse(f, m, b, fm, frm, fb, right, 0.5 * tol, depth - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polynomial_is_exact() {
        // Simpson is exact for cubics.
        let f = |x: f64| Complex64::new(x * x * x - 2.0 * x, 0.0);
        let result = adaptive_simpson(&f, 0.0, 2.0, 1e-12);
        assert!((result.re - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_oscillatory_complex_integrand() {
        // ∫₀^π e^{ix} dx = 2i
        let f = |x: f64| Complex64::new(0.0, x).exp();
        let result = adaptive_simpson(&f, 0.0, std::f64::consts::PI, 1e-10);
        assert!((result - Complex64::new(0.0, 2.0)).norm() < 1e-8);
    }

    #[test]
    fn test_gaussian_integral() {
        // ∫ exp(-x²/2) over a wide interval ≈ sqrt(2π)
        let f = |x: f64| Complex64::from((-0.5 * x * x).exp());
        let result = adaptive_simpson(&f, -10.0, 10.0, 1e-10);
        let expected = (2.0 * std::f64::consts::PI).sqrt();
        assert!((result.re - expected).abs() < 1e-8);
    }
}
