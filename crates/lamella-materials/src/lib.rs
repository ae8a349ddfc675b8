//! # Lamella Materials
//!
//! Material models for the Lamella framework. Simple structures are built
//! from [`constant::Material`] (a fixed complex refractive index, possibly
//! lossy or amplifying). Wavelength-dependent models implement the
//! [`provider::MaterialProvider`] trait and are sampled at the simulation
//! wavelength before entering the mode solver.
//!
//! ## Available models
//!
//! | Model | Module | Dispersion |
//! |-------|--------|------------|
//! | Constant complex index | [`constant`] | none |
//! | Sellmeier (fused silica) | [`sellmeier`] | analytic |
//! | Tabulated n, k data | [`tabulated`] | cubic spline |

pub mod constant;
pub mod provider;
pub mod sellmeier;
pub mod spline;
pub mod tabulated;
