//! Multilayer slab cross-sections and their eigenmode bases.
//!
//! A [`Slab`] is an ordered list of material layers between two walls.
//! [`Slab::find_modes`] fills in the eigenmode basis: analytically for a
//! uniform slab, otherwise by locating every zero of the dispersion
//! relation inside a region of the `kz²` plane with an argument-principle
//! count plus contour subdivision, then refining with Mueller's method.
//! Incident field profiles are projected onto the basis with the
//! `expand_*` methods.

use num_complex::Complex64;

use crate::context::{Context, Polarisation, Wall};
use crate::expression::{Expression, Layer};
use crate::roots::roots_in_rectangle;
use crate::{quad, SolverError};

mod dispersion;
pub mod mode;

pub use mode::SlabMode;

use mode::branch_sqrt;

/// Extra modes the search region covers beyond the requested basis size,
/// so that roots near its deep edge cannot shortfall the basis.
const SEED_MARGIN: usize = 8;

/// A 1D multilayer cross-section with its computed mode basis.
#[derive(Debug, Clone)]
pub struct Slab {
    layers: Vec<Layer>,
    /// Cumulative layer end positions; the last entry is the total width.
    discontinuities: Vec<Complex64>,
    modes: Vec<SlabMode>,
}

impl Slab {
    /// Build a slab from a layer expression.
    pub fn new(expr: impl Into<Expression>) -> Result<Self, SolverError> {
        let expr = expr.into();
        if expr.is_empty() {
            return Err(SolverError::InvalidGeometry(
                "slab needs at least one layer".into(),
            ));
        }
        for layer in expr.layers() {
            if layer.thickness.re < 0.0 {
                return Err(SolverError::InvalidGeometry(format!(
                    "layer has negative real thickness {}",
                    layer.thickness
                )));
            }
        }

        let layers = expr.layers().to_vec();
        let mut discontinuities = Vec::with_capacity(layers.len());
        let mut acc = Complex64::from(0.0);
        for layer in &layers {
            acc += layer.thickness;
            discontinuities.push(acc);
        }

        Ok(Self {
            layers,
            discontinuities,
            modes: Vec::new(),
        })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Positions of the layer interfaces, including the upper wall.
    pub fn discontinuities(&self) -> &[Complex64] {
        &self.discontinuities
    }

    /// Total (complex) width.
    pub fn width(&self) -> Complex64 {
        *self
            .discontinuities
            .last()
            .unwrap_or(&Complex64::from(0.0))
    }

    /// Real part of the width, the physical extent of the cross-section.
    pub fn physical_width(&self) -> f64 {
        self.width().re
    }

    /// Whether the slab is filled with a single material.
    pub fn is_uniform(&self) -> bool {
        self.layers
            .iter()
            .all(|l| l.material == self.layers[0].material)
    }

    /// Index of the layer containing `x`, decided on real parts.
    pub(crate) fn segment_index(&self, x: Complex64) -> usize {
        for (i, d) in self.discontinuities.iter().enumerate() {
            if x.re < d.re + 1e-9 {
                return i;
            }
        }
        self.layers.len() - 1
    }

    /// Start and end positions of layer `segment`.
    pub(crate) fn segment_bounds(&self, segment: usize) -> (Complex64, Complex64) {
        let start = if segment == 0 {
            Complex64::from(0.0)
        } else {
            self.discontinuities[segment - 1]
        };
        (start, self.discontinuities[segment])
    }

    /// Material at transverse position `x`.
    pub fn material_at(&self, x: Complex64) -> &lamella_materials::constant::Material {
        &self.layers[self.segment_index(x)].material
    }

    /// Computed mode basis, empty before [`Slab::find_modes`].
    pub fn modes(&self) -> &[SlabMode] {
        &self.modes
    }

    /// Mode `i` of the basis.
    pub fn mode(&self, i: usize) -> Result<&SlabMode, SolverError> {
        if self.modes.is_empty() {
            return Err(SolverError::ModesNotComputed);
        }
        self.modes.get(i).ok_or(SolverError::IndexOutOfBounds {
            index: i,
            n_modes: self.modes.len(),
        })
    }

    /// Compute and normalise the first `ctx.n_modes` eigenmodes.
    ///
    /// Modes are ordered by decreasing real part of `kz²`, so the guided
    /// and least evanescent modes come first. Recomputing is cheap to
    /// skip, so calling this twice is allowed.
    pub fn find_modes(&mut self, ctx: &Context) -> Result<(), SolverError> {
        let kz_list = if self.is_uniform() {
            self.uniform_kz(ctx)
        } else {
            self.search_kz(ctx)?
        };

        if kz_list.len() < ctx.n_modes {
            return Err(SolverError::ModeShortfall {
                found: kz_list.len(),
                requested: ctx.n_modes,
            });
        }

        log::debug!(
            "slab of width {}: {} {} modes, fundamental n_eff = {}",
            self.width(),
            ctx.n_modes,
            ctx.polarisation,
            kz_list[0] / ctx.k0()
        );

        self.modes.clear();
        for &kz in kz_list.iter().take(ctx.n_modes) {
            let mut mode = SlabMode::new(ctx, self, kz);
            mode.normalise(self, ctx);
            self.modes.push(mode);
        }

        Ok(())
    }

    /// Analytic propagation constants of a uniform slab.
    ///
    /// Between identical walls the transverse wavenumbers are `mπ/d`, with
    /// the lowest order depending on which field component the walls pin;
    /// between different walls they are `(m + ½)π/d`.
    fn uniform_kz(&self, ctx: &Context) -> Vec<Complex64> {
        let d = self.width();
        let k0_2 = Complex64::from(ctx.k0() * ctx.k0());
        let mat = &self.layers[0].material;
        let k2 = k0_2 * mat.epsr() * mat.mur();

        let same_walls = ctx.lower_wall == ctx.upper_wall;
        let m0 = match (same_walls, ctx.lower_wall, ctx.polarisation) {
            (true, Wall::Electric, Polarisation::TE) => 1,
            (true, Wall::Electric, Polarisation::TM) => 0,
            (true, Wall::Magnetic, Polarisation::TE) => 0,
            (true, Wall::Magnetic, Polarisation::TM) => 1,
            (false, _, _) => 0,
        };

        (0..ctx.n_modes)
            .map(|i| {
                let order = (m0 + i) as f64;
                let kt = if same_walls {
                    Complex64::from(order * std::f64::consts::PI) / d
                } else {
                    Complex64::from((order + 0.5) * std::f64::consts::PI) / d
                };
                branch_sqrt(k2 - kt * kt)
            })
            .collect()
    }

    /// Exhaustive root search for the multilayer dispersion relation.
    ///
    /// Every zero inside the search rectangle is located, so the truncated
    /// basis is the true first `n_modes` of the spectrum rather than
    /// whichever roots a seeded iteration happens to reach.
    fn search_kz(&self, ctx: &Context) -> Result<Vec<Complex64>, SolverError> {
        let disp = |w: Complex64| dispersion::dispersion(ctx, self, w);

        let (lo, hi) = dispersion::search_region(ctx, self, ctx.n_modes + SEED_MARGIN);
        let samples = (16 * (ctx.n_modes + SEED_MARGIN)).max(64);

        let mut roots: Vec<Complex64> = Vec::new();
        roots_in_rectangle(&disp, lo, hi, 1e-12, samples, &mut roots)?;

        roots.sort_by(|a, b| b.re.partial_cmp(&a.re).unwrap_or(std::cmp::Ordering::Equal));
        roots.truncate(ctx.n_modes);

        Ok(roots.into_iter().map(branch_sqrt).collect())
    }

    /// Project an arbitrary field profile onto the mode basis.
    ///
    /// With modes normalised to unit unconjugated power overlap, the
    /// coefficient of mode `i` is the overlap of the profile with the
    /// mode's transverse magnetic (TE) or electric-dual (TM) field, taken
    /// layer by layer along the possibly complex transverse contour.
    pub fn expand_field<F>(
        &self,
        ctx: &Context,
        f: &F,
        eps: f64,
    ) -> Result<Vec<Complex64>, SolverError>
    where
        F: Fn(Complex64) -> Complex64,
    {
        if self.modes.len() < ctx.n_modes {
            return Err(SolverError::ModesNotComputed);
        }

        let mut coefficients = Vec::with_capacity(ctx.n_modes);

        for mode in self.modes.iter().take(ctx.n_modes) {
            let mut c = Complex64::from(0.0);

            for segment in 0..self.layers.len() {
                let (start, end) = self.segment_bounds(segment);
                let delta = end - start;
                if delta.norm() < 1e-12 {
                    continue;
                }

                let integrand = |t: f64| {
                    let x = start + t * delta;
                    let field = mode.field(self, ctx, x, true);
                    let weight = match ctx.polarisation {
                        Polarisation::TE => -field.h1,
                        Polarisation::TM => field.h2,
                    };
                    f(x) * weight
                };

                c += delta * quad::adaptive_simpson(&integrand, 0.0, 1.0, eps);
            }

            coefficients.push(c);
        }

        Ok(coefficients)
    }

    /// Expand a Gaussian beam `h·exp(-(x-p)²/(2w²))` onto the basis.
    pub fn expand_gaussian(
        &self,
        ctx: &Context,
        height: Complex64,
        width: Complex64,
        position: Complex64,
        eps: f64,
    ) -> Result<Vec<Complex64>, SolverError> {
        let f = move |x: Complex64| {
            let u = x - position;
            height * (-u * u / (2.0 * width * width)).exp()
        };
        self.expand_field(ctx, &f, eps)
    }

    /// Expand a linear profile `h + s·x` onto the basis.
    pub fn expand_plane_wave(
        &self,
        ctx: &Context,
        height: Complex64,
        slope: Complex64,
        eps: f64,
    ) -> Result<Vec<Complex64>, SolverError> {
        let f = move |x: Complex64| height + slope * x;
        self.expand_field(ctx, &f, eps)
    }
}
