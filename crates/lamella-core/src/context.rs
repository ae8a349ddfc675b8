//! Simulation context: the global parameters of a solve.
//!
//! Older eigenmode-expansion tools keep these settings in mutable global
//! state; here they are an explicit immutable value passed to every
//! solver entry point.

use std::fmt;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::SolverError;

/// Field polarisation of the 1D problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarisation {
    /// Transverse electric: E parallel to the layer interfaces.
    TE,
    /// Transverse magnetic: H parallel to the layer interfaces.
    TM,
}

impl fmt::Display for Polarisation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarisation::TE => write!(f, "TE"),
            Polarisation::TM => write!(f, "TM"),
        }
    }
}

/// Boundary wall terminating a slab cross-section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Wall {
    /// Perfect electric conductor: tangential E vanishes.
    Electric,
    /// Perfect magnetic conductor: tangential H vanishes.
    Magnetic,
}

impl Wall {
    /// Reflection coefficient seen by the tangential E-like amplitude.
    pub fn reflection(&self) -> Complex64 {
        match self {
            Wall::Electric => Complex64::from(-1.0),
            Wall::Magnetic => Complex64::from(1.0),
        }
    }

    /// Seed forward/backward amplitudes at the lower wall.
    pub fn start_field(&self) -> (Complex64, Complex64) {
        (Complex64::from(1.0), self.reflection())
    }
}

/// Immutable parameters shared by every stage of a solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    /// Vacuum wavelength (µm).
    pub lambda: f64,
    /// Number of modes in the expansion basis.
    pub n_modes: usize,
    /// Polarisation of the solve.
    pub polarisation: Polarisation,
    /// Wall at the lower edge of every slab.
    pub lower_wall: Wall,
    /// Wall at the upper edge of every slab.
    pub upper_wall: Wall,
    /// Amplitudes smaller than this are flushed to zero when growing
    /// exponentials are rescaled out of the interface ladder.
    pub unstable_exp_threshold: f64,
}

impl Context {
    /// Create a context with the default TE polarisation and electric walls.
    pub fn new(lambda: f64, n_modes: usize) -> Result<Self, SolverError> {
        if lambda <= 0.0 || !lambda.is_finite() {
            return Err(SolverError::InvalidParameter(format!(
                "wavelength must be positive, got {lambda}"
            )));
        }
        if n_modes == 0 {
            return Err(SolverError::InvalidParameter(
                "basis size must be at least 1".into(),
            ));
        }

        Ok(Self {
            lambda,
            n_modes,
            polarisation: Polarisation::TE,
            lower_wall: Wall::Electric,
            upper_wall: Wall::Electric,
            unstable_exp_threshold: 1e-10,
        })
    }

    /// Same context with a different polarisation.
    pub fn with_polarisation(mut self, pol: Polarisation) -> Self {
        self.polarisation = pol;
        self
    }

    /// Same context with different walls.
    pub fn with_walls(mut self, lower: Wall, upper: Wall) -> Self {
        self.lower_wall = lower;
        self.upper_wall = upper;
        self
    }

    /// Vacuum wavenumber $k_0 = 2\pi/\lambda$.
    pub fn k0(&self) -> f64 {
        2.0 * std::f64::consts::PI / self.lambda
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_validation() {
        assert!(Context::new(1.55, 40).is_ok());
        assert!(Context::new(0.0, 40).is_err());
        assert!(Context::new(-1.0, 40).is_err());
        assert!(Context::new(1.55, 0).is_err());
    }

    #[test]
    fn test_wall_seeds() {
        let (fw, bw) = Wall::Electric.start_field();
        assert_eq!(fw + bw, Complex64::from(0.0));
        let (fw, bw) = Wall::Magnetic.start_field();
        assert_eq!(fw - bw, Complex64::from(0.0));
    }
}
