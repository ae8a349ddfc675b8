//! Non-dispersive isotropic materials.
//!
//! A [`Material`] is a fixed complex refractive index and (optionally) a
//! relative permeability. Losses are encoded in a negative imaginary part
//! of the index with the $e^{-i k z}$ forward-propagation convention; a
//! positive imaginary part represents gain.

use std::fmt;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::provider::{MaterialError, MaterialProvider};

/// Vacuum permeability (H/m).
pub const MU_0: f64 = 4.0e-7 * std::f64::consts::PI;
/// Speed of light in vacuum (m/s).
pub const C_LIGHT: f64 = 2.997_924_58e8;
/// Vacuum permittivity (F/m).
pub const EPS_0: f64 = 1.0 / (MU_0 * C_LIGHT * C_LIGHT);

/// Tolerance for material equality and gain detection.
const N_TOLERANCE: f64 = 1e-12;

/// An isotropic material with a fixed complex refractive index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Material {
    n: Complex64,
    mur: Complex64,
}

impl Material {
    /// Create a non-magnetic material from its complex refractive index.
    pub fn new(n: impl Into<Complex64>) -> Self {
        Self {
            n: n.into(),
            mur: Complex64::from(1.0),
        }
    }

    /// Create a magnetic material with a given relative permeability.
    pub fn magnetic(n: impl Into<Complex64>, mur: impl Into<Complex64>) -> Self {
        let mur = mur.into();
        if (mur - Complex64::from(1.0)).norm() > N_TOLERANCE {
            log::info!("magnetic material: mur = {}", mur);
        }
        Self { n: n.into(), mur }
    }

    /// Complex refractive index.
    pub fn n(&self) -> Complex64 {
        self.n
    }

    /// Relative permittivity $\epsilon_r = n^2$.
    pub fn epsr(&self) -> Complex64 {
        self.n * self.n
    }

    /// Relative permeability.
    pub fn mur(&self) -> Complex64 {
        self.mur
    }

    /// Absolute permittivity $\epsilon = n^2 \epsilon_0$.
    pub fn eps(&self) -> Complex64 {
        self.n * self.n * EPS_0
    }

    /// Absolute permeability $\mu = \mu_r \mu_0$.
    pub fn mu(&self) -> Complex64 {
        self.mur * MU_0
    }

    /// Material gain (cm⁻¹) at a vacuum wavelength in micrometres.
    ///
    /// Positive for amplifying media ($\mathrm{Im}\,n > 0$).
    pub fn gain(&self, wavelength: f64) -> f64 {
        4.0 * self.n.im * std::f64::consts::PI / (wavelength * 1e-4)
    }

    /// True when the imaginary part of the index carries no gain.
    pub fn no_gain_present(&self) -> bool {
        self.n.im < N_TOLERANCE
    }
}

impl PartialEq for Material {
    fn eq(&self, other: &Self) -> bool {
        (self.n - other.n).norm() < N_TOLERANCE && (self.mur - other.mur).norm() < N_TOLERANCE
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Isotropic n={}", self.n)
    }
}

impl MaterialProvider for Material {
    fn name(&self) -> &str {
        "constant"
    }

    fn wavelength_range(&self) -> (f64, f64) {
        (0.0, f64::INFINITY)
    }

    fn refractive_index(&self, _wavelength: f64) -> Result<Complex64, MaterialError> {
        Ok(self.n)
    }
}
