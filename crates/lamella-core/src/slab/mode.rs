//! Eigenmodes of a multilayer slab.
//!
//! A mode is characterised by its propagation constant `kz` and, per layer,
//! a transverse wavenumber `kx` together with forward/backward plane-wave
//! amplitudes at every interface. The amplitudes are built by crossing the
//! interfaces one by one from the lower wall, factoring growing
//! exponentials out of the running values so that strongly evanescent
//! modes stay finite.

use num_complex::Complex64;

use crate::context::{Context, Polarisation};
use crate::expression::Layer;
use crate::field::Field;
use crate::slab::Slab;

use lamella_materials::constant::C_LIGHT;

const I: Complex64 = Complex64::new(0.0, 1.0);

/// Positions closer to an interface than this are evaluated on it.
const BOUNDARY_EPS: f64 = 1e-9;

/// Square root with the branch cut at 45°, used for propagation constants:
/// prefer decaying forward waves (`Im kz ≤ 0`), else `Re kz ≥ 0`.
pub fn branch_sqrt(kz2: Complex64) -> Complex64 {
    let mut kz = kz2.sqrt();

    if kz.im > 0.0 {
        kz = -kz;
    }

    if kz.im.abs() < kz.re.abs() && kz.re < 0.0 {
        kz = -kz;
    }

    kz
}

/// Square root convention for transverse wavenumbers: `Re kx ≥ 0`, and for
/// purely imaginary results `Im kx ≤ 0`.
pub fn transverse_sqrt(kx2: Complex64) -> Complex64 {
    let mut kx = kx2.sqrt();

    if kx.re < 0.0 {
        kx = -kx;
    }

    if kx.re.abs() < 1e-12 && kx.im > 0.0 {
        kx = -kx;
    }

    kx
}

/// Multiply two factors, flushing to zero when either has underflowed
/// below the stability threshold.
fn safe_mult(a: Complex64, b: Complex64, threshold: f64) -> Complex64 {
    if a.norm() < threshold || b.norm() < threshold {
        Complex64::from(0.0)
    } else {
        a * b
    }
}

/// Result of the interface ladder: amplitudes at each interface, two
/// entries per layer (start and end).
pub(crate) struct Ladder {
    /// Forward amplitudes; index 0 is the lower wall, then `2k+1` / `2k+2`
    /// are the start and end of layer `k`.
    pub right: Vec<Complex64>,
    /// Backward amplitudes, same indexing.
    pub left: Vec<Complex64>,
}

/// Relate the plane-wave amplitudes at the end of each layer to those at
/// its start, crossing interfaces and propagating through layer interiors.
///
/// Growing exponentials are factored into a common scaling that is
/// reapplied on storage, so the stored amplitudes are the true ones while
/// the running values stay bounded. Products with a factor underflowed
/// past `threshold` are flushed to zero.
pub(crate) fn interface_ladder(
    pol: Polarisation,
    layers: &[Layer],
    kx: &[Complex64],
    seed: (Complex64, Complex64),
    threshold: f64,
) -> Ladder {
    let (mut fw, mut bw) = seed;

    let mut right = Vec::with_capacity(2 * layers.len() + 1);
    let mut left = Vec::with_capacity(2 * layers.len() + 1);
    right.push(fw);
    left.push(bw);

    let mut scaling = Complex64::from(0.0);

    for k in 0..layers.len() {
        let i1 = k.saturating_sub(1);
        let i2 = k;

        let mat1 = &layers[i1].material;
        let mat2 = &layers[i2].material;

        // The lower wall is not a material crossing; a = 1 there exactly,
        // which also keeps a kx = 0 cutoff mode out of 0/0 territory.
        let a = if k == 0 {
            Complex64::from(1.0)
        } else {
            match pol {
                Polarisation::TE => kx[i1] / kx[i2] * mat2.mu() / mat1.mu(),
                Polarisation::TM => kx[i1] / kx[i2] * mat2.eps() / mat1.eps(),
            }
        };
        let sign = match pol {
            Polarisation::TE => 1.0,
            Polarisation::TM => -1.0,
        };

        // Cross the interface into layer k.
        let mut fw_end = (1.0 + a) / 2.0 * fw + sign * (1.0 - a) / 2.0 * bw;
        let mut bw_end = sign * (1.0 - a) / 2.0 * fw + (1.0 + a) / 2.0 * bw;

        right.push(safe_mult(fw_end, scaling.exp(), threshold));
        left.push(safe_mult(bw_end, scaling.exp(), threshold));

        // Propagate through the layer interior, scaling out whichever
        // exponential grows.
        let i_kx_d = I * kx[i2] * layers[i2].thickness;

        if i_kx_d.re > 0.0 {
            fw_end *= (-2.0 * i_kx_d).exp();
            scaling += i_kx_d;
        } else {
            bw_end *= (2.0 * i_kx_d).exp();
            scaling -= i_kx_d;
        }

        right.push(safe_mult(fw_end, scaling.exp(), threshold));
        left.push(safe_mult(bw_end, scaling.exp(), threshold));

        fw = fw_end;
        bw = bw_end;
    }

    Ladder { right, left }
}

/// A single eigenmode of a slab.
#[derive(Debug, Clone)]
pub struct SlabMode {
    /// Polarisation of the mode.
    pub polarisation: Polarisation,
    /// Propagation constant along the stack axis.
    pub kz: Complex64,
    /// Transverse wavenumber in each layer.
    kx: Vec<Complex64>,
    /// True forward amplitudes at each interface (ladder indexing).
    right: Vec<Complex64>,
    /// True backward amplitudes at each interface.
    left: Vec<Complex64>,
}

impl SlabMode {
    /// Build the unnormalised mode with the given propagation constant.
    pub(crate) fn new(ctx: &Context, slab: &Slab, kz: Complex64) -> Self {
        let k0_2 = Complex64::from(ctx.k0() * ctx.k0());

        let kx: Vec<Complex64> = slab
            .layers()
            .iter()
            .map(|l| transverse_sqrt(k0_2 * l.material.epsr() * l.material.mur() - kz * kz))
            .collect();

        let ladder = interface_ladder(
            ctx.polarisation,
            slab.layers(),
            &kx,
            ctx.lower_wall.start_field(),
            ctx.unstable_exp_threshold,
        );

        Self {
            polarisation: ctx.polarisation,
            kz,
            kx,
            right: ladder.right,
            left: ladder.left,
        }
    }

    /// Effective index $n_\text{eff} = k_z / k_0$.
    pub fn n_eff(&self, ctx: &Context) -> Complex64 {
        self.kz / ctx.k0()
    }

    /// Transverse wavenumber in layer `segment`.
    pub fn kx(&self, segment: usize) -> Complex64 {
        self.kx[segment]
    }

    /// Scale all amplitudes (used by normalisation).
    pub(crate) fn scale(&mut self, factor: Complex64) {
        for v in self.right.iter_mut().chain(self.left.iter_mut()) {
            *v *= factor;
        }
    }

    /// Forward and backward amplitudes at position `x` inside `segment`,
    /// propagated from whichever interface keeps the exponentials decaying.
    pub(crate) fn amplitudes_at(
        &self,
        slab: &Slab,
        segment: usize,
        x: Complex64,
    ) -> (Complex64, Complex64) {
        let (start, end) = slab.segment_bounds(segment);
        let d_prev = x - start;
        let d_next = end - x;

        let prev = 2 * segment + 1;
        let next = 2 * segment + 2;

        if d_prev.norm() < BOUNDARY_EPS {
            return (self.right[prev], self.left[prev]);
        }
        if d_next.norm() < BOUNDARY_EPS {
            return (self.right[next], self.left[next]);
        }

        let kx = self.kx[segment];

        if kx.im < 0.0 {
            (
                self.right[prev] * (-I * kx * d_prev).exp(),
                self.left[next] * (-I * kx * d_next).exp(),
            )
        } else {
            (
                self.right[next] * (I * kx * d_next).exp(),
                self.left[prev] * (I * kx * d_prev).exp(),
            )
        }
    }

    /// Forward and backward amplitudes at transverse position `x`.
    pub fn forw_backw_at(&self, slab: &Slab, x: Complex64) -> (Complex64, Complex64) {
        self.amplitudes_at(slab, slab.segment_index(x), x)
    }

    /// Full field of the mode at transverse position `x`.
    ///
    /// `forward` selects the propagation direction along z; the backward
    /// mode has the same transverse profile with the kz-proportional
    /// component sign-flipped.
    pub fn field(&self, slab: &Slab, ctx: &Context, x: Complex64, forward: bool) -> Field {
        let segment = slab.segment_index(x);
        let (fw, bw) = self.amplitudes_at(slab, segment, x);

        let kx = self.kx[segment];
        let kz = if forward { self.kz } else { -self.kz };
        let mat = &slab.layers()[segment].material;
        let k0 = Complex64::from(ctx.k0());

        let mut field = Field::default();

        match self.polarisation {
            Polarisation::TE => {
                let c = 1.0 / (k0 * C_LIGHT) / mat.mu();
                field.e2 = fw + bw;
                field.h1 = -c * kz * (fw + bw);
                field.hz = c * kx * (fw - bw);
            }
            Polarisation::TM => {
                let c = 1.0 / (k0 * C_LIGHT) / mat.eps();
                field.h2 = fw - bw;
                field.e1 = c * kz * (fw - bw);
                field.ez = -c * kx * (fw + bw);
            }
        }

        field
    }

    /// Normalise so that the unconjugated self-overlap equals one.
    pub(crate) fn normalise(&mut self, slab: &Slab, ctx: &Context) {
        let power = crate::overlap::overlap(ctx, slab, self, slab, self);

        let power = if power.norm() < 1e-10 {
            log::warn!("mode close to cutoff (kz = {}), skipping normalisation", self.kz);
            Complex64::from(1.0)
        } else {
            power
        };

        self.scale(1.0 / power.sqrt());
    }
}
