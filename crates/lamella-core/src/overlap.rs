//! Unconjugated mode overlaps.
//!
//! The expansion basis is bi-orthogonal under
//! `O(I, J) = ∫ (E1ᴵ H2ᴶ - E2ᴵ H1ᴶ) dx`, without complex conjugation so
//! that lossy and PML-stretched modes stay orthogonal. Within each layer
//! both modes are sums of two exponentials, so the integral is evaluated
//! in closed form segment by segment over the union of both slabs'
//! interfaces.

use ndarray::Array2;
use num_complex::Complex64;

use crate::context::{Context, Polarisation};
use crate::slab::{Slab, SlabMode};
use crate::SolverError;

use lamella_materials::constant::C_LIGHT;

/// Interfaces closer than this (as complex points) are treated as one.
const MERGE_EPS: f64 = 1e-9;

/// `∫₀^Δ exp(iαu) du`, with a series fallback for small `αΔ`.
fn exp_integral(alpha: Complex64, delta: Complex64) -> Complex64 {
    let i = Complex64::new(0.0, 1.0);
    let ad = alpha * delta;

    if ad.norm() < 1e-8 {
        delta * (1.0 + i * ad / 2.0 - ad * ad / 6.0)
    } else {
        ((i * ad).exp() - 1.0) / (i * alpha)
    }
}

/// Integration breakpoints: the union of both slabs' interfaces, ordered
/// by real part. Interfaces at the same physical position but with
/// different imaginary parts (one slab PML-stretched, the other not)
/// both stay, so the contour passes through each slab's own endpoint.
fn merged_breakpoints(slab_i: &Slab, slab_j: &Slab) -> Vec<Complex64> {
    let mut points: Vec<Complex64> = slab_i.discontinuities().to_vec();

    for &d in slab_j.discontinuities() {
        if !points.iter().any(|p| (p - d).norm() < MERGE_EPS) {
            points.push(d);
        }
    }

    // Stable sort: coincident real parts keep the first slab's point first.
    points.sort_by(|a, b| a.re.partial_cmp(&b.re).unwrap_or(std::cmp::Ordering::Equal));
    points
}

/// Overlap `O(I, J)` of two modes, possibly living in different slabs of
/// the same cross-sectional width.
pub fn overlap(
    ctx: &Context,
    slab_i: &Slab,
    mode_i: &SlabMode,
    slab_j: &Slab,
    mode_j: &SlabMode,
) -> Complex64 {
    let k0 = Complex64::from(ctx.k0());
    let breakpoints = merged_breakpoints(slab_i, slab_j);

    let mut total = Complex64::from(0.0);
    let mut start = Complex64::from(0.0);

    for &end in &breakpoints {
        let delta = end - start;
        if delta.norm() < MERGE_EPS {
            continue;
        }

        let mid = 0.5 * (start + end);
        let seg_i = slab_i.segment_index(mid);
        let seg_j = slab_j.segment_index(mid);

        let (fw_i, bw_i) = mode_i.amplitudes_at(slab_i, seg_i, start);
        let (fw_j, bw_j) = mode_j.amplitudes_at(slab_j, seg_j, start);

        let kx_i = mode_i.kx(seg_i);
        let kx_j = mode_j.kx(seg_j);

        // Exponential coefficients of the two profile factors. TE pairs
        // E2ᴵ with -H1ᴶ; TM pairs E1ᴵ with H2ᴶ, whose backward parts
        // carry a sign flip.
        let (factor, a_fw, a_bw, b_fw, b_bw) = match ctx.polarisation {
            Polarisation::TE => {
                let c_j = 1.0 / (k0 * C_LIGHT) / slab_j.layers()[seg_j].material.mu();
                (c_j * mode_j.kz, fw_i, bw_i, fw_j, bw_j)
            }
            Polarisation::TM => {
                let c_i = 1.0 / (k0 * C_LIGHT) / slab_i.layers()[seg_i].material.eps();
                (c_i * mode_i.kz, fw_i, -bw_i, fw_j, -bw_j)
            }
        };

        let mut segment = Complex64::from(0.0);
        for (ai, si) in [(a_fw, -1.0), (a_bw, 1.0)] {
            for (bj, sj) in [(b_fw, -1.0), (b_bw, 1.0)] {
                let alpha = si * kx_i + sj * kx_j;
                segment += ai * bj * exp_integral(alpha, delta);
            }
        }

        total += factor * segment;
        start = end;
    }

    total
}

/// Overlap matrix `Q[i, j] = O(Aᵢ, Bⱼ)` between the first `n_modes` modes
/// of two slabs.
pub fn overlap_matrix(
    ctx: &Context,
    slab_a: &Slab,
    slab_b: &Slab,
) -> Result<Array2<Complex64>, SolverError> {
    let n = ctx.n_modes;
    if slab_a.modes().len() < n || slab_b.modes().len() < n {
        return Err(SolverError::ModesNotComputed);
    }

    Ok(Array2::from_shape_fn((n, n), |(i, j)| {
        overlap(ctx, slab_a, &slab_a.modes()[i], slab_b, &slab_b.modes()[j])
    }))
}
