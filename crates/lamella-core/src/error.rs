//! Error types for the eigenmode-expansion solver.

use thiserror::Error;

/// Errors that can occur while building geometry or solving.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Mode solver found only {found} of {requested} requested modes")]
    ModeShortfall { found: usize, requested: usize },

    #[error("Root search failed: {0}")]
    RootSearch(String),

    #[error("Linear algebra error: {0}")]
    LinAlg(String),

    #[error("Mode index {index} out of bounds for a basis of {n_modes} modes")]
    IndexOutOfBounds { index: usize, n_modes: usize },

    #[error("Modes have not been computed; call Slab::find_modes first")]
    ModesNotComputed,

    #[error("Scattering matrices have not been computed; call Stack::calc first")]
    NotCalculated,
}
