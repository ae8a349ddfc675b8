//! Dispersion relation of a multilayer slab.
//!
//! The residual is evaluated from the transfer matrix of the wall-pinned
//! field pair, written in terms of `cos(kx d)`, `sin(kx d)/kx` and
//! `kx sin(kx d)` only. All three are even in each layer's `kx`, so the
//! residual is an entire function of `W = kz²` with no square-root branch
//! cuts, exactly what the contour-based root count needs.

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::context::{Context, Polarisation, Wall};
use crate::slab::Slab;

/// Residual of the upper-wall boundary condition as a function of `W = kz²`.
///
/// The transfer pair is `(U, V)` with `U` the wall-pinned transverse field
/// (`E2` for TE, `H2` for TM) and `V = U'/η` its continuous derivative
/// companion (`η = µ_r` for TE, `ε_r` for TM). An electric wall pins `E`,
/// a magnetic wall pins `H`; a mode exists when the pinned component
/// vanishes again at the upper wall.
pub(crate) fn dispersion(ctx: &Context, slab: &Slab, w: Complex64) -> Complex64 {
    let k0_2 = Complex64::from(ctx.k0() * ctx.k0());

    let (mut u, mut v) = match (ctx.lower_wall, ctx.polarisation) {
        (Wall::Electric, Polarisation::TE) | (Wall::Magnetic, Polarisation::TM) => {
            (Complex64::from(0.0), Complex64::from(1.0))
        }
        _ => (Complex64::from(1.0), Complex64::from(0.0)),
    };

    for layer in slab.layers() {
        let mat = &layer.material;
        let eta = match ctx.polarisation {
            Polarisation::TE => mat.mur(),
            Polarisation::TM => mat.epsr(),
        };

        let kx2 = k0_2 * mat.epsr() * mat.mur() - w;
        let kx = kx2.sqrt();
        let z = kx * layer.thickness;

        let cosd = z.cos();
        let sincd = if z.norm() < 1e-4 {
            let z2 = z * z;
            layer.thickness * (1.0 - z2 / 6.0 + z2 * z2 / 120.0)
        } else {
            z.sin() / kx
        };

        let u_next = cosd * u + eta * sincd * v;
        let v_next = -kx2 * sincd / eta * u + cosd * v;
        u = u_next;
        v = v_next;
    }

    match (ctx.upper_wall, ctx.polarisation) {
        (Wall::Electric, Polarisation::TE) | (Wall::Magnetic, Polarisation::TM) => u,
        _ => v,
    }
}

/// Rectangle in the `W` plane guaranteed to hold the first `count` modes.
///
/// The real extent spans from just above the largest material line
/// `k0² ε_r µ_r` down to the uniform-slab estimate of mode `count` in the
/// optically thinnest material. PML stretching skews the deep spectrum off
/// the real axis in proportion to `Im(D²)/Re(D²)`, which with material
/// losses sets the imaginary half-height.
pub(crate) fn search_region(ctx: &Context, slab: &Slab, count: usize) -> (Complex64, Complex64) {
    let k0_2 = ctx.k0() * ctx.k0();

    let mut re_top = f64::MIN;
    let mut re_low = f64::MAX;
    let mut im_max = 0.0f64;
    for layer in slab.layers() {
        let k2 = Complex64::from(k0_2) * layer.material.epsr() * layer.material.mur();
        re_top = re_top.max(k2.re);
        re_low = re_low.min(k2.re);
        im_max = im_max.max(k2.im.abs());
    }

    let kt_max = count as f64 * PI / slab.physical_width();
    let re_bot = re_low - kt_max * kt_max;
    let span = re_top - re_bot;

    let w2 = slab.width() * slab.width();
    let skew = w2.im.abs() / w2.re.abs().max(1e-12);
    let im_half = 2.0 * (span * skew + im_max) + 1.0;

    let pad = 0.05 * span + 1.0;
    (
        Complex64::new(re_bot - pad, -im_half),
        Complex64::new(re_top + pad, im_half),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Slice;
    use crate::roots::count_zeros;
    use lamella_materials::constant::Material;

    #[test]
    fn test_uniform_slab_dispersion_zero_at_analytic_mode() {
        // Uniform slab with electric walls: kx = mπ/d exactly.
        let ctx = Context::new(1.55, 5).unwrap();
        let air = Material::new(1.0);
        let slab = Slab::new(air.slice(5.0)).unwrap();

        let k0 = ctx.k0();
        let kx = 2.0 * PI / 5.0;
        let w = Complex64::from(k0 * k0 - kx * kx);

        let residual = dispersion(&ctx, &slab, w);
        assert!(
            residual.norm() < 1e-8,
            "dispersion residual {} at analytic mode",
            residual.norm()
        );
    }

    #[test]
    fn test_no_spurious_zero_at_cutoff() {
        // TE with electric walls has no kx = 0 mode; the sin(kx d)/kx
        // formulation must not vanish there.
        let ctx = Context::new(1.55, 5).unwrap();
        let air = Material::new(1.0);
        let slab = Slab::new(air.slice(5.0)).unwrap();

        let w = Complex64::from(ctx.k0() * ctx.k0());
        assert!(dispersion(&ctx, &slab, w).norm() > 1e-3);
    }

    #[test]
    fn test_zero_count_matches_analytic_spectrum() {
        // Air slab, d = 5, λ = 1.55: W_m = k0² - (mπ/5)² puts m = 1, 2, 3
        // inside [11, 17] and nothing else.
        let ctx = Context::new(1.55, 5).unwrap();
        let air = Material::new(1.0);
        let slab = Slab::new(air.slice(5.0)).unwrap();

        let f = |w: Complex64| dispersion(&ctx, &slab, w);
        let n = count_zeros(
            &f,
            Complex64::new(11.0, -0.5),
            Complex64::new(17.0, 0.5),
            64,
        )
        .unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn test_search_region_covers_both_material_branches() {
        let ctx = Context::new(1.55, 10).unwrap();
        let air = Material::new(1.0);
        let gaas = Material::new(3.5);
        let slab = Slab::new(air.slice(2.0) + gaas.slice(1.0) + air.slice(2.0)).unwrap();

        let (lo, hi) = search_region(&ctx, &slab, 18);

        let k0_2 = ctx.k0() * ctx.k0();
        let deep_air = k0_2 - (18.0 * PI / 5.0_f64).powi(2);
        assert!(hi.re > k0_2 * 12.25);
        assert!(lo.re < deep_air);
        assert!(lo.im < 0.0 && hi.im > 0.0);
    }
}
