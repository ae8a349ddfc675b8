//! # Lamella Core
//!
//! The numerical backbone of the Lamella framework. This crate implements
//! a frequency-domain eigenmode-expansion solver for layered (1D) photonic
//! structures: multilayer slab waveguides are decomposed into their
//! eigenmodes, arbitrary incident profiles are expanded in that basis, and
//! cascades of slabs are solved through scattering-matrix composition.
//!
//! ## Pipeline
//!
//! 1. Build a [`slab::Slab`] from a layer expression
//!    ([`expression::Expression`]) of materials and complex thicknesses
//!    (complex thicknesses encode PML absorption).
//! 2. [`slab::Slab::find_modes`] solves the closed-waveguide dispersion
//!    relation for the first N eigenmodes.
//! 3. A [`stack::Stack`] cascades slabs; [`stack::Stack::calc`] assembles
//!    interface and propagation scattering matrices and composes them with
//!    the Redheffer star product.
//! 4. Incident profiles (Gaussian, plane-wave, arbitrary) are expanded via
//!    overlap integrals; reflected and transmitted modal amplitudes follow
//!    from the composite matrices.
//!
//! ## Modules
//!
//! - [`context`] — Simulation context (wavelength, basis size, walls).
//! - [`expression`] — Layer expressions built from materials.
//! - [`slab`] — Multilayer slab waveguides and their eigenmodes.
//! - [`overlap`] — Unconjugated modal overlap integrals.
//! - [`stack`] — Scattering-matrix assembly and cascading.
//! - [`fields`] — Field reconstruction from modal expansions.
//! - [`roots`] — Mueller's method for complex root refinement.
//! - [`quad`] — Adaptive quadrature for expansion integrals.
//! - [`linalg`] — Dense complex linear solves (LU via `faer`).

pub mod context;
pub mod expression;
pub mod field;
pub mod fields;
pub mod linalg;
pub mod overlap;
pub mod quad;
pub mod roots;
pub mod slab;
pub mod stack;

mod error;

pub use error::SolverError;
