//! Complex root location for analytic functions.
//!
//! The dispersion relation of a multilayer slab is an analytic function of
//! the squared propagation constant; its roots are the eigenmodes. None of
//! them may be missed, so the search is exhaustive: the argument principle
//! counts the zeros inside a rectangle, rectangles holding more than a few
//! are subdivided, and the survivors are polished with Mueller's method.
//! Deflation against already-accepted roots keeps nearby starting points
//! from collapsing onto the same mode.

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::SolverError;

/// Bisection limit for one phase step along the counting contour.
const PHASE_MAX_DEPTH: usize = 30;

/// Rectangles are split at most this many times.
const SUBDIVISION_MAX_DEPTH: usize = 48;

/// Roots closer than this (relative) are one root.
const DEDUPE_EPS: f64 = 1e-5;

/// Refine a root of `f` near `z0` with Mueller's method.
///
/// `deflate` lists roots to divide out of `f` before iterating, so that a
/// seed next to an already-found root converges to a new one.
pub fn mueller<F>(
    f: &F,
    z0: Complex64,
    z1: Complex64,
    tol: f64,
    max_iter: usize,
    deflate: &[Complex64],
) -> Result<Complex64, SolverError>
where
    F: Fn(Complex64) -> Complex64,
{
    let eval = |z: Complex64| -> Complex64 {
        let mut v = f(z);
        for &r in deflate {
            let d = z - r;
            // A deflated root exactly on a sample point would blow up; nudge.
            if d.norm() < 1e-300 {
                return Complex64::new(f64::INFINITY, 0.0);
            }
            v /= d;
        }
        v
    };

    let mut a = z0;
    let mut b = z1;
    let mut c = 0.5 * (z0 + z1);

    let mut fa = eval(a);
    let mut fb = eval(b);
    let mut fc = eval(c);

    for _ in 0..max_iter {
        let q = (c - b) / (b - a);
        let q1 = q + 1.0;

        let coeff_a = q * fc - q * q1 * fb + q * q * fa;
        let coeff_b = (2.0 * q + 1.0) * fc - q1 * q1 * fb + q * q * fa;
        let coeff_c = q1 * fc;

        let disc = (coeff_b * coeff_b - 4.0 * coeff_a * coeff_c).sqrt();
        let denom_plus = coeff_b + disc;
        let denom_minus = coeff_b - disc;
        let denom = if denom_plus.norm() >= denom_minus.norm() {
            denom_plus
        } else {
            denom_minus
        };

        if denom.norm() < 1e-300 {
            return Err(SolverError::RootSearch(
                "Mueller denominator vanished".into(),
            ));
        }

        let step = (c - b) * (2.0 * coeff_c / denom);
        let next = c - step;

        if !next.re.is_finite() || !next.im.is_finite() {
            return Err(SolverError::RootSearch("iterate diverged".into()));
        }

        if step.norm() <= tol * (1.0 + next.norm()) {
            return Ok(next);
        }

        a = b;
        b = c;
        c = next;
        fa = fb;
        fb = fc;
        fc = eval(c);
    }

    Err(SolverError::RootSearch(format!(
        "no convergence after {max_iter} iterations (last iterate {c})"
    )))
}

fn wrap_phase(mut phi: f64) -> f64 {
    while phi > PI {
        phi -= 2.0 * PI;
    }
    while phi <= -PI {
        phi += 2.0 * PI;
    }
    phi
}

fn usable(f: Complex64) -> bool {
    f.re.is_finite() && f.im.is_finite() && (f.re != 0.0 || f.im != 0.0)
}

/// Phase turned by `f` between two contour points, bisecting until every
/// step stays under a quarter turn. A zero on the contour never settles
/// and is reported as an error.
fn phase_step<F>(
    f: &F,
    z1: Complex64,
    f1: Complex64,
    z2: Complex64,
    f2: Complex64,
    depth: usize,
) -> Result<f64, SolverError>
where
    F: Fn(Complex64) -> Complex64,
{
    // Phases are differenced rather than divided: the dispersion residual
    // reaches magnitudes whose quotient arithmetic would overflow.
    let dphi = wrap_phase(f2.arg() - f1.arg());
    if dphi.abs() <= PI / 2.0 {
        return Ok(dphi);
    }
    if depth >= PHASE_MAX_DEPTH {
        return Err(SolverError::RootSearch(
            "zero on or near the counting contour".into(),
        ));
    }

    let zm = 0.5 * (z1 + z2);
    let fm = f(zm);
    if !usable(fm) {
        return Err(SolverError::RootSearch(
            "zero on or near the counting contour".into(),
        ));
    }

    Ok(phase_step(f, z1, f1, zm, fm, depth + 1)? + phase_step(f, zm, fm, z2, f2, depth + 1)?)
}

/// Number of zeros of an analytic `f` inside the rectangle spanned by
/// `lo` (bottom-left) and `hi` (top-right), by the argument principle.
///
/// `samples_per_edge` sets the initial contour sampling; oscillations
/// faster than a quarter turn per step are caught by bisection, but the
/// initial grid must be dense enough that whole turns cannot alias away.
pub fn count_zeros<F>(
    f: &F,
    lo: Complex64,
    hi: Complex64,
    samples_per_edge: usize,
) -> Result<usize, SolverError>
where
    F: Fn(Complex64) -> Complex64,
{
    let corners = [
        lo,
        Complex64::new(hi.re, lo.im),
        hi,
        Complex64::new(lo.re, hi.im),
    ];

    let mut total = 0.0;

    for e in 0..4 {
        let a = corners[e];
        let b = corners[(e + 1) % 4];

        let mut z_prev = a;
        let mut f_prev = f(a);
        if !usable(f_prev) {
            return Err(SolverError::RootSearch(
                "zero on or near the counting contour".into(),
            ));
        }

        for k in 1..=samples_per_edge {
            let z = a + (b - a) * (k as f64 / samples_per_edge as f64);
            let fz = f(z);
            if !usable(fz) {
                return Err(SolverError::RootSearch(
                    "zero on or near the counting contour".into(),
                ));
            }
            total += phase_step(f, z_prev, f_prev, z, fz, 0)?;
            z_prev = z;
            f_prev = fz;
        }
    }

    let turns = total / (2.0 * PI);
    let n = turns.round();
    if (turns - n).abs() > 0.25 || n < -0.25 {
        return Err(SolverError::RootSearch(format!(
            "inconsistent winding number {turns}"
        )));
    }

    Ok(n as usize)
}

/// Find every zero of an analytic `f` inside a rectangle, appending them
/// to `roots` (whose existing entries are deflated and never duplicated).
pub fn roots_in_rectangle<F>(
    f: &F,
    lo: Complex64,
    hi: Complex64,
    tol: f64,
    samples_per_edge: usize,
    roots: &mut Vec<Complex64>,
) -> Result<(), SolverError>
where
    F: Fn(Complex64) -> Complex64,
{
    subdivide(f, lo, hi, tol, samples_per_edge, roots, 0)
}

/// Zero count with the contour nudged outward on failure, since a zero
/// sitting exactly on an edge spoils the phase walk.
fn count_with_retry<F>(
    f: &F,
    lo: Complex64,
    hi: Complex64,
    samples_per_edge: usize,
) -> Result<usize, SolverError>
where
    F: Fn(Complex64) -> Complex64,
{
    let mut grow = 0.0;
    for attempt in 0..4 {
        let pad = grow * (hi - lo);
        match count_zeros(f, lo - pad, hi + pad, samples_per_edge) {
            Ok(n) => return Ok(n),
            Err(e) if attempt == 3 => return Err(e),
            Err(_) => grow += 0.0173,
        }
    }
    unreachable!()
}

fn subdivide<F>(
    f: &F,
    lo: Complex64,
    hi: Complex64,
    tol: f64,
    samples_per_edge: usize,
    roots: &mut Vec<Complex64>,
    depth: usize,
) -> Result<(), SolverError>
where
    F: Fn(Complex64) -> Complex64,
{
    let count = count_with_retry(f, lo, hi, samples_per_edge)?;

    let dims = hi - lo;
    let inside = |w: Complex64| {
        w.re > lo.re - 0.02 * dims.re
            && w.re < hi.re + 0.02 * dims.re
            && w.im > lo.im - 0.02 * dims.im
            && w.im < hi.im + 0.02 * dims.im
    };

    let known = roots.iter().filter(|r| inside(**r)).count();
    if count <= known {
        return Ok(());
    }
    let mut missing = count - known;

    let child_samples = (samples_per_edge / 2).max(32);
    let tiny = dims.norm() < 1e-8 * (1.0 + lo.norm());

    // Split at an off-centre fraction so a zero in the middle of the
    // rectangle cannot land on the cut.
    let split = |roots: &mut Vec<Complex64>| -> Result<(), SolverError> {
        if dims.re >= dims.im {
            let xm = lo.re + 0.513 * dims.re;
            subdivide(f, lo, Complex64::new(xm, hi.im), tol, child_samples, roots, depth + 1)?;
            subdivide(f, Complex64::new(xm, lo.im), hi, tol, child_samples, roots, depth + 1)
        } else {
            let ym = lo.im + 0.513 * dims.im;
            subdivide(f, lo, Complex64::new(hi.re, ym), tol, child_samples, roots, depth + 1)?;
            subdivide(f, Complex64::new(lo.re, ym), hi, tol, child_samples, roots, depth + 1)
        }
    };

    if missing > 3 && depth < SUBDIVISION_MAX_DEPTH && !tiny {
        return split(roots);
    }

    // Few zeros left here: polish with Mueller, deflating everything
    // found so far.
    let centre = 0.5 * (lo + hi);
    let starts = [
        centre,
        centre + Complex64::new(0.25 * dims.re, 0.17 * dims.im),
        centre - Complex64::new(0.25 * dims.re, 0.17 * dims.im),
        centre + Complex64::new(-0.21 * dims.re, 0.25 * dims.im),
        centre + Complex64::new(0.21 * dims.re, -0.25 * dims.im),
    ];

    for &z0 in &starts {
        if missing == 0 {
            break;
        }
        let z1 = z0 + 0.01 * dims;
        if let Ok(w) = mueller(f, z0, z1, tol, 100, &*roots) {
            let duplicate = roots
                .iter()
                .any(|r| (r - w).norm() < DEDUPE_EPS * (1.0 + w.norm()));
            if !duplicate {
                roots.push(w);
                if inside(w) {
                    missing -= 1;
                }
            }
        }
    }

    if missing > 0 {
        if depth < SUBDIVISION_MAX_DEPTH && !tiny {
            return split(roots);
        }
        log::warn!("{missing} root(s) unresolved near {centre}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_quadratic_root() {
        // z² + 1 = 0 has roots ±i.
        let f = |z: Complex64| z * z + 1.0;
        let root = mueller(
            &f,
            Complex64::new(0.1, 0.8),
            Complex64::new(0.0, 1.2),
            1e-14,
            50,
            &[],
        )
        .unwrap();
        assert!((root - Complex64::new(0.0, 1.0)).norm() < 1e-10);
    }

    #[test]
    fn test_transcendental_root() {
        // sin(z) = 0 near z = π.
        let f = |z: Complex64| z.sin();
        let root = mueller(
            &f,
            Complex64::new(3.0, 0.1),
            Complex64::new(3.3, -0.1),
            1e-14,
            50,
            &[],
        )
        .unwrap();
        assert!((root - Complex64::from(std::f64::consts::PI)).norm() < 1e-10);
    }

    #[test]
    fn test_count_zeros_of_cubic() {
        // (z - 1)(z - 2)(z - 3 - 0.4i): two roots in [0.5, 2.5] × [-1, 1].
        let f = |z: Complex64| (z - 1.0) * (z - 2.0) * (z - Complex64::new(3.0, 0.4));
        let n = count_zeros(
            &f,
            Complex64::new(0.5, -1.0),
            Complex64::new(2.5, 1.0),
            32,
        )
        .unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn test_count_zeros_empty_region() {
        let f = |z: Complex64| (z - 1.0) * (z - 2.0);
        let n = count_zeros(
            &f,
            Complex64::new(4.0, -1.0),
            Complex64::new(6.0, 1.0),
            32,
        )
        .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_rectangle_search_finds_every_root() {
        let r3 = Complex64::new(3.0, 0.4);
        let f = move |z: Complex64| (z - 1.0) * (z - 2.0) * (z - r3);

        let mut roots = Vec::new();
        roots_in_rectangle(
            &f,
            Complex64::new(0.0, -1.0),
            Complex64::new(4.0, 1.0),
            1e-13,
            32,
            &mut roots,
        )
        .unwrap();

        assert_eq!(roots.len(), 3);
        for expected in [Complex64::from(1.0), Complex64::from(2.0), r3] {
            assert!(
                roots.iter().any(|r| (r - expected).norm() < 1e-9),
                "missing root {expected}, got {roots:?}"
            );
        }
    }

    #[test]
    fn test_rectangle_search_with_oscillatory_function() {
        // sin(z) has zeros at mπ; the rectangle holds m = 1..=5.
        let f = |z: Complex64| z.sin();
        let mut roots = Vec::new();
        roots_in_rectangle(
            &f,
            Complex64::new(0.5, -1.0),
            Complex64::new(17.0, 1.0),
            1e-13,
            64,
            &mut roots,
        )
        .unwrap();

        assert_eq!(roots.len(), 5);
        for m in 1..=5 {
            let expected = Complex64::from(m as f64 * PI);
            assert!(
                roots.iter().any(|r| (r - expected).norm() < 1e-9),
                "missing root {expected}"
            );
        }
    }

    #[test]
    fn test_deflation_finds_second_root() {
        // (z - 1)(z - 2) with the root at 1 deflated: seed near 1 must
        // converge to 2.
        let f = |z: Complex64| (z - 1.0) * (z - 2.0);
        let root = mueller(
            &f,
            Complex64::new(1.05, 0.0),
            Complex64::new(0.95, 0.1),
            1e-14,
            50,
            &[Complex64::from(1.0)],
        )
        .unwrap();
        assert!((root - Complex64::from(2.0)).norm() < 1e-10);
    }
}
