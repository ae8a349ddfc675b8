//! Material property provider trait.
//!
//! Dispersive material models implement [`MaterialProvider`], which returns
//! the complex refractive index at a given vacuum wavelength. The mode
//! solver itself works with wavelength-resolved [`constant::Material`]
//! values; providers are sampled once per simulation wavelength.
//!
//! [`constant::Material`]: crate::constant::Material

use num_complex::Complex64;
use thiserror::Error;

use crate::constant::Material;

/// Errors from material providers.
#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("Wavelength {wavelength} is outside the data range [{min}, {max}]")]
    OutOfRange {
        wavelength: f64,
        min: f64,
        max: f64,
    },

    #[error("Data error: {0}")]
    DataError(String),
}

/// Provides wavelength-dependent material properties.
///
/// Implementations include analytic dispersion formulas (Sellmeier) and
/// spline-interpolated tabulated data. Wavelengths are in micrometres
/// throughout, matching the solver's length unit.
pub trait MaterialProvider: Send + Sync {
    /// Human-readable name of this material.
    fn name(&self) -> &str;

    /// Wavelength range over which the model is valid.
    fn wavelength_range(&self) -> (f64, f64);

    /// Complex refractive index $\tilde{n} = n + ik$ at a given wavelength.
    fn refractive_index(&self, wavelength: f64) -> Result<Complex64, MaterialError>;

    /// Complex relative permittivity $\epsilon_r = \tilde{n}^2$.
    fn epsr(&self, wavelength: f64) -> Result<Complex64, MaterialError> {
        let n = self.refractive_index(wavelength)?;
        Ok(n * n)
    }

    /// Sample this model at a wavelength, yielding a non-dispersive
    /// [`Material`] for use in the mode solver.
    fn at(&self, wavelength: f64) -> Result<Material, MaterialError> {
        Ok(Material::new(self.refractive_index(wavelength)?))
    }
}
