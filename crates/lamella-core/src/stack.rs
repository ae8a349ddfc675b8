//! Stacks of slabs and their scattering matrices.
//!
//! A stack is a sequence of slab cross-sections along the propagation
//! axis, each with a length. Mode matching at every interface yields
//! four scattering blocks (reflection and transmission in both
//! directions); sections are combined with the Redheffer star product,
//! which stays stable for evanescent modes where straight transfer
//! matrices overflow.

use std::sync::Arc;

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use crate::context::Context;
use crate::fields::FieldExpansion;
use crate::linalg::solve;
use crate::overlap::overlap_matrix;
use crate::slab::Slab;
use crate::SolverError;

const I: Complex64 = Complex64::new(0.0, 1.0);

/// The four scattering blocks of a two-port section.
#[derive(Debug, Clone)]
pub struct ScatteringMatrices {
    /// Reflection for incidence from the left.
    pub r12: Array2<Complex64>,
    /// Transmission left to right.
    pub t12: Array2<Complex64>,
    /// Reflection for incidence from the right.
    pub r21: Array2<Complex64>,
    /// Transmission right to left.
    pub t21: Array2<Complex64>,
}

impl ScatteringMatrices {
    /// The neutral section: no reflection, unit transmission.
    pub fn identity(n: usize) -> Self {
        Self {
            r12: Array2::zeros((n, n)),
            t12: Array2::eye(n),
            r21: Array2::zeros((n, n)),
            t21: Array2::eye(n),
        }
    }

    /// Scattering of the interface between two slab cross-sections.
    ///
    /// Projecting the tangential-field continuity equations onto the
    /// bi-orthonormal bases gives, with `M = O(A,B)ᵀ` and `N = O(B,A)`,
    ///
    /// ```text
    /// R12 = (M + N)⁻¹ (N - M),    T12 = M (1 + R12)
    /// ```
    ///
    /// and the mirrored expressions for incidence from the right.
    pub fn interface(ctx: &Context, a: &Slab, b: &Slab) -> Result<Self, SolverError> {
        let n = ctx.n_modes;
        let eye = Array2::<Complex64>::eye(n);

        let o_ab = overlap_matrix(ctx, a, b)?;
        let o_ba = overlap_matrix(ctx, b, a)?;

        let m = o_ab.t().to_owned();
        let r12 = solve(&(&m + &o_ba), &(&o_ba - &m))?;
        let t12 = m.dot(&(&eye + &r12));

        let m = o_ba.t().to_owned();
        let r21 = solve(&(&m + &o_ab), &(&o_ab - &m))?;
        let t21 = m.dot(&(&eye + &r21));

        Ok(Self { r12, t12, r21, t21 })
    }

    /// Scattering of a length `d` of a single cross-section: diagonal
    /// phase and decay factors, no reflection.
    pub fn propagation(ctx: &Context, slab: &Slab, d: Complex64) -> Result<Self, SolverError> {
        let n = ctx.n_modes;
        if slab.modes().len() < n {
            return Err(SolverError::ModesNotComputed);
        }

        let mut t = Array2::<Complex64>::zeros((n, n));
        for (i, mode) in slab.modes().iter().take(n).enumerate() {
            t[[i, i]] = (-I * mode.kz * d).exp();
        }

        Ok(Self {
            r12: Array2::zeros((n, n)),
            t12: t.clone(),
            r21: Array2::zeros((n, n)),
            t21: t,
        })
    }

    /// Redheffer star product: the scattering of section `self` followed
    /// by section `rhs`, with all multiple reflections between them
    /// summed by the `(1 - R R)⁻¹` factors.
    pub fn star(&self, rhs: &ScatteringMatrices) -> Result<ScatteringMatrices, SolverError> {
        let n = self.r12.nrows();
        let eye = Array2::<Complex64>::eye(n);

        let x = solve(&(&eye - &self.r21.dot(&rhs.r12)), &self.t12)?;
        let r12 = &self.r12 + &self.t21.dot(&rhs.r12.dot(&x));
        let t12 = rhs.t12.dot(&x);

        let y = solve(&(&eye - &rhs.r12.dot(&self.r21)), &rhs.t21)?;
        let r21 = &rhs.r21 + &rhs.t12.dot(&self.r21.dot(&y));
        let t21 = self.t21.dot(&y);

        Ok(ScatteringMatrices { r12, t12, r21, t21 })
    }
}

/// One section of a stack: a cross-section and the distance propagated
/// through it. Zero-length terms contribute only their interfaces.
#[derive(Debug, Clone)]
pub struct StackTerm {
    pub slab: Arc<Slab>,
    pub length: Complex64,
}

impl StackTerm {
    pub fn new(slab: Arc<Slab>, length: impl Into<Complex64>) -> Self {
        Self {
            slab,
            length: length.into(),
        }
    }
}

/// An ordered sequence of stack terms.
#[derive(Debug, Clone, Default)]
pub struct StackExpression {
    terms: Vec<StackTerm>,
}

impl StackExpression {
    pub fn terms(&self) -> &[StackTerm] {
        &self.terms
    }
}

impl From<StackTerm> for StackExpression {
    fn from(term: StackTerm) -> Self {
        Self { terms: vec![term] }
    }
}

impl std::ops::Add<StackTerm> for StackTerm {
    type Output = StackExpression;

    fn add(self, rhs: StackTerm) -> StackExpression {
        StackExpression {
            terms: vec![self, rhs],
        }
    }
}

impl std::ops::Add<StackTerm> for StackExpression {
    type Output = StackExpression;

    fn add(mut self, rhs: StackTerm) -> StackExpression {
        self.terms.push(rhs);
        self
    }
}

impl std::ops::Add<StackExpression> for StackExpression {
    type Output = StackExpression;

    fn add(mut self, rhs: StackExpression) -> StackExpression {
        self.terms.extend(rhs.terms);
        self
    }
}

/// A layered structure along the propagation axis.
///
/// All cross-sections must share the same physical width, and their mode
/// bases must be computed (see [`Slab::find_modes`]) before [`Stack::calc`].
#[derive(Debug, Clone)]
pub struct Stack {
    terms: Vec<StackTerm>,
    matrices: Option<ScatteringMatrices>,
    inc_field: Option<Array1<Complex64>>,
}

impl Stack {
    pub fn new(expr: impl Into<StackExpression>) -> Result<Self, SolverError> {
        let expr = expr.into();
        if expr.terms.is_empty() {
            return Err(SolverError::InvalidGeometry(
                "stack needs at least one term".into(),
            ));
        }

        let w0 = expr.terms[0].slab.physical_width();
        for term in &expr.terms {
            if (term.slab.physical_width() - w0).abs() > 1e-9 {
                return Err(SolverError::InvalidGeometry(format!(
                    "stack mixes cross-sections of width {} and {}",
                    w0,
                    term.slab.physical_width()
                )));
            }
        }

        Ok(Self {
            terms: expr.terms,
            matrices: None,
            inc_field: None,
        })
    }

    /// Cross-section of the incidence side.
    pub fn inc(&self) -> &Arc<Slab> {
        &self.terms[0].slab
    }

    /// Cross-section of the exit side.
    pub fn ext(&self) -> &Arc<Slab> {
        &self.terms[self.terms.len() - 1].slab
    }

    /// Total (complex) length along the propagation axis.
    pub fn length(&self) -> Complex64 {
        self.terms.iter().map(|t| t.length).sum()
    }

    /// Assemble the stack's scattering matrices by starring interfaces
    /// and propagation sections left to right.
    pub fn calc(&mut self, ctx: &Context) -> Result<(), SolverError> {
        for term in &self.terms {
            if term.slab.modes().len() < ctx.n_modes {
                return Err(SolverError::ModesNotComputed);
            }
        }

        let mut total = ScatteringMatrices::identity(ctx.n_modes);

        for k in 0..self.terms.len() {
            if k > 0 && !Arc::ptr_eq(&self.terms[k - 1].slab, &self.terms[k].slab) {
                let step =
                    ScatteringMatrices::interface(ctx, &self.terms[k - 1].slab, &self.terms[k].slab)?;
                total = total.star(&step)?;
            }

            if self.terms[k].length.norm() > 0.0 {
                let step =
                    ScatteringMatrices::propagation(ctx, &self.terms[k].slab, self.terms[k].length)?;
                total = total.star(&step)?;
            }
        }

        log::debug!(
            "stack of {} terms assembled, |T12[0,0]| = {}",
            self.terms.len(),
            total.t12[[0, 0]].norm()
        );

        self.matrices = Some(total);
        Ok(())
    }

    fn matrices(&self) -> Result<&ScatteringMatrices, SolverError> {
        self.matrices.as_ref().ok_or(SolverError::NotCalculated)
    }

    fn check_index(&self, ctx_free_n: usize, i: usize, j: usize) -> Result<(), SolverError> {
        let bad = if i >= ctx_free_n { i } else { j };
        if i >= ctx_free_n || j >= ctx_free_n {
            return Err(SolverError::IndexOutOfBounds {
                index: bad,
                n_modes: ctx_free_n,
            });
        }
        Ok(())
    }

    /// Reflection coefficient from incident mode `j` into mode `i`.
    pub fn r12(&self, i: usize, j: usize) -> Result<Complex64, SolverError> {
        let m = self.matrices()?;
        self.check_index(m.r12.nrows(), i, j)?;
        Ok(m.r12[[i, j]])
    }

    /// Transmission coefficient from incident mode `j` into exit mode `i`.
    pub fn t12(&self, i: usize, j: usize) -> Result<Complex64, SolverError> {
        let m = self.matrices()?;
        self.check_index(m.t12.nrows(), i, j)?;
        Ok(m.t12[[i, j]])
    }

    /// Reflection for incidence from the exit side.
    pub fn r21(&self, i: usize, j: usize) -> Result<Complex64, SolverError> {
        let m = self.matrices()?;
        self.check_index(m.r21.nrows(), i, j)?;
        Ok(m.r21[[i, j]])
    }

    /// Transmission from the exit side to the incidence side.
    pub fn t21(&self, i: usize, j: usize) -> Result<Complex64, SolverError> {
        let m = self.matrices()?;
        self.check_index(m.t21.nrows(), i, j)?;
        Ok(m.t21[[i, j]])
    }

    /// Set the incident field as modal amplitudes in the incidence basis.
    pub fn set_inc_field(&mut self, field: Array1<Complex64>) {
        self.inc_field = Some(field);
    }

    /// Expand a Gaussian profile onto the incidence basis and use it as
    /// the incident field.
    pub fn set_inc_field_gaussian(
        &mut self,
        ctx: &Context,
        height: Complex64,
        width: Complex64,
        position: Complex64,
        eps: f64,
    ) -> Result<(), SolverError> {
        let c = self.inc().expand_gaussian(ctx, height, width, position, eps)?;
        self.inc_field = Some(Array1::from(c));
        Ok(())
    }

    /// Expand a linear profile `h + s·x` onto the incidence basis and use
    /// it as the incident field.
    pub fn set_inc_field_plane_wave(
        &mut self,
        ctx: &Context,
        height: Complex64,
        slope: Complex64,
        eps: f64,
    ) -> Result<(), SolverError> {
        let c = self.inc().expand_plane_wave(ctx, height, slope, eps)?;
        self.inc_field = Some(Array1::from(c));
        Ok(())
    }

    /// Incident modal amplitudes, if set.
    pub fn inc_field(&self) -> Option<&Array1<Complex64>> {
        self.inc_field.as_ref()
    }

    fn inc_field_required(&self) -> Result<&Array1<Complex64>, SolverError> {
        self.inc_field.as_ref().ok_or_else(|| {
            SolverError::InvalidParameter("no incident field set".into())
        })
    }

    /// Reflected modal amplitudes in the incidence basis.
    pub fn refl_field(&self) -> Result<Array1<Complex64>, SolverError> {
        Ok(self.matrices()?.r12.dot(self.inc_field_required()?))
    }

    /// Transmitted modal amplitudes in the exit basis.
    pub fn trans_field(&self) -> Result<Array1<Complex64>, SolverError> {
        Ok(self.matrices()?.t12.dot(self.inc_field_required()?))
    }

    /// Total field in the incidence cross-section: incident forward plus
    /// reflected backward amplitudes.
    pub fn inc_field_expansion(&self) -> Result<FieldExpansion, SolverError> {
        Ok(FieldExpansion::new(
            Arc::clone(self.inc()),
            self.inc_field_required()?.clone(),
            self.refl_field()?,
        ))
    }

    /// Total field in the exit cross-section: transmitted forward
    /// amplitudes only.
    pub fn ext_field_expansion(&self) -> Result<FieldExpansion, SolverError> {
        let trans = self.trans_field()?;
        let n = trans.len();
        Ok(FieldExpansion::new(
            Arc::clone(self.ext()),
            trans,
            Array1::zeros(n),
        ))
    }

    /// Net power flux through the incidence cross-section between the
    /// transverse positions `x0` and `x1`.
    pub fn inc_s_flux(
        &self,
        ctx: &Context,
        x0: f64,
        x1: f64,
        eps: f64,
    ) -> Result<f64, SolverError> {
        Ok(self.inc_field_expansion()?.s_flux(ctx, x0, x1, eps))
    }

    /// Net power flux through the exit cross-section.
    pub fn ext_s_flux(
        &self,
        ctx: &Context,
        x0: f64,
        x1: f64,
        eps: f64,
    ) -> Result<f64, SolverError> {
        Ok(self.ext_field_expansion()?.s_flux(ctx, x0, x1, eps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Polarisation;
    use crate::expression::Slice;
    use lamella_materials::constant::Material;

    fn solved_slab(ctx: &Context, n: f64, width: f64) -> Arc<Slab> {
        let mat = Material::new(n);
        let mut slab = Slab::new(mat.slice(width)).unwrap();
        slab.find_modes(ctx).unwrap();
        Arc::new(slab)
    }

    #[test]
    fn test_interface_reduces_to_fresnel() {
        // Uniform-uniform interface: mode i sees the plane-wave Fresnel
        // reflection for its own kz; in the power-normalised basis the
        // transmission is the symmetric 2√(kzA·kzB)/(kzA + kzB).
        let ctx = Context::new(1.55, 4).unwrap();
        let a = solved_slab(&ctx, 1.0, 5.0);
        let b = solved_slab(&ctx, 3.5, 5.0);

        let s = ScatteringMatrices::interface(&ctx, &a, &b).unwrap();

        for i in 0..4 {
            let kz_a = a.modes()[i].kz;
            let kz_b = b.modes()[i].kz;
            let r = (kz_a - kz_b) / (kz_a + kz_b);
            let t = 2.0 * (kz_a * kz_b).sqrt() / (kz_a + kz_b);

            assert!((s.r12[[i, i]] - r).norm() < 1e-8, "r12[{i}]");
            // The mode normalisation fixes t12 only up to sign.
            assert!((s.t12[[i, i]].norm() - t.norm()).abs() < 1e-8, "t12[{i}]");
            assert!((s.r21[[i, i]] + r).norm() < 1e-8, "r21[{i}]");

            // Off-diagonal coupling vanishes between matched bases.
            for j in 0..4 {
                if i != j {
                    assert!(s.r12[[i, j]].norm() < 1e-8);
                    assert!(s.t12[[i, j]].norm() < 1e-8);
                }
            }
        }
    }

    #[test]
    fn test_star_with_identity_is_neutral() {
        let ctx = Context::new(1.55, 3).unwrap();
        let a = solved_slab(&ctx, 1.0, 5.0);
        let b = solved_slab(&ctx, 2.0, 5.0);

        let s = ScatteringMatrices::interface(&ctx, &a, &b).unwrap();
        let eye = ScatteringMatrices::identity(3);

        let left = eye.star(&s).unwrap();
        let right = s.star(&eye).unwrap();

        for ((i, j), v) in s.r12.indexed_iter() {
            assert!((left.r12[[i, j]] - v).norm() < 1e-12);
            assert!((right.r12[[i, j]] - v).norm() < 1e-12);
        }
        for ((i, j), v) in s.t12.indexed_iter() {
            assert!((left.t12[[i, j]] - v).norm() < 1e-12);
            assert!((right.t12[[i, j]] - v).norm() < 1e-12);
        }
    }

    #[test]
    fn test_fabry_perot_etalon_against_analytic() {
        // Air / GaAs film / air: compare the fundamental-mode transmission
        // with the single-interface coefficients summed over multiple
        // reflections.
        let ctx = Context::new(1.55, 3).unwrap();
        let air = solved_slab(&ctx, 1.0, 5.0);
        let gaas = solved_slab(&ctx, 3.5, 5.0);
        let d = Complex64::from(0.3);

        let mut stack = Stack::new(
            StackTerm::new(Arc::clone(&air), 0.0)
                + StackTerm::new(Arc::clone(&gaas), d)
                + StackTerm::new(Arc::clone(&air), 0.0),
        )
        .unwrap();
        stack.calc(&ctx).unwrap();

        let kz_a = air.modes()[0].kz;
        let kz_g = gaas.modes()[0].kz;
        let r = (kz_a - kz_g) / (kz_a + kz_g);
        let t = 2.0 * kz_a / (kz_a + kz_g);
        let t_back = 2.0 * kz_g / (kz_a + kz_g);
        let phase = (-Complex64::new(0.0, 1.0) * kz_g * d).exp();

        let expected = t * t_back * phase / (1.0 - r * r * phase * phase);
        let got = stack.t12(0, 0).unwrap();
        assert!(
            (got - expected).norm() < 1e-8,
            "t12 = {got}, analytic {expected}"
        );
    }

    #[test]
    fn test_tm_interface_follows_kz_over_eps() {
        // TM mode matching weighs with kz/ε instead of kz; the diagonal
        // reflection is sign-definite while transmission carries the
        // normalisation sign ambiguity.
        let ctx = Context::new(1.55, 4)
            .unwrap()
            .with_polarisation(Polarisation::TM);
        let a = solved_slab(&ctx, 1.0, 5.0);
        let b = solved_slab(&ctx, 3.5, 5.0);

        let s = ScatteringMatrices::interface(&ctx, &a, &b).unwrap();

        for i in 0..4 {
            let q_a = a.modes()[i].kz;
            let q_b = b.modes()[i].kz / Complex64::from(12.25);
            let r = (q_b - q_a) / (q_a + q_b);
            let t = 2.0 * (q_a * q_b).sqrt() / (q_a + q_b);

            assert!((s.r12[[i, i]] - r).norm() < 1e-8, "r12[{i}] = {}", s.r12[[i, i]]);
            assert!((s.t12[[i, i]].norm() - t.norm()).abs() < 1e-8, "t12[{i}]");

            for j in 0..4 {
                if i != j {
                    assert!(s.r12[[i, j]].norm() < 1e-8);
                    assert!(s.t12[[i, j]].norm() < 1e-8);
                }
            }
        }

        // Both sides propagating: power balances without kz weighting.
        let r0 = s.r12[[0, 0]].norm_sqr();
        let t0 = s.t12[[0, 0]].norm_sqr();
        assert!((r0 + t0 - 1.0).abs() < 1e-8, "R + T = {}", r0 + t0);
    }

    #[test]
    fn test_tm_fabry_perot_etalon_against_analytic() {
        // The round-trip products t·t' = 1 - r² and r² are free of the
        // normalisation sign, so the summed multiple-reflection series is
        // an exact reference for the TM path.
        let ctx = Context::new(1.55, 3)
            .unwrap()
            .with_polarisation(Polarisation::TM);
        let air = solved_slab(&ctx, 1.0, 5.0);
        let gaas = solved_slab(&ctx, 3.5, 5.0);
        let d = Complex64::from(0.3);

        let mut stack = Stack::new(
            StackTerm::new(Arc::clone(&air), 0.0)
                + StackTerm::new(Arc::clone(&gaas), d)
                + StackTerm::new(Arc::clone(&air), 0.0),
        )
        .unwrap();
        stack.calc(&ctx).unwrap();

        let kz_g = gaas.modes()[0].kz;
        let q_a = air.modes()[0].kz;
        let q_g = kz_g / Complex64::from(12.25);
        let r2 = ((q_g - q_a) / (q_a + q_g)).powi(2);
        let phase = (-Complex64::new(0.0, 1.0) * kz_g * d).exp();

        let expected = (1.0 - r2) * phase / (1.0 - r2 * phase * phase);
        let got = stack.t12(0, 0).unwrap();
        assert!(
            (got - expected).norm() < 1e-8,
            "TM t12 = {got}, analytic {expected}"
        );
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let ctx = Context::new(1.55, 2).unwrap();
        let a = solved_slab(&ctx, 1.0, 5.0);
        let b = solved_slab(&ctx, 1.0, 4.0);
        assert!(Stack::new(StackTerm::new(a, 0.0) + StackTerm::new(b, 0.0)).is_err());
    }

    #[test]
    fn test_accessors_before_calc_fail() {
        let ctx = Context::new(1.55, 2).unwrap();
        let a = solved_slab(&ctx, 1.0, 5.0);
        let stack = Stack::new(StackExpression::from(StackTerm::new(a, 0.0))).unwrap();
        assert!(matches!(stack.r12(0, 0), Err(SolverError::NotCalculated)));
        assert!(matches!(stack.trans_field(), Err(_)));
    }

    #[test]
    fn test_index_bounds_checked() {
        let ctx = Context::new(1.55, 2).unwrap();
        let a = solved_slab(&ctx, 1.0, 5.0);
        let b = solved_slab(&ctx, 2.0, 5.0);
        let mut stack = Stack::new(StackTerm::new(a, 0.0) + StackTerm::new(b, 0.0)).unwrap();
        stack.calc(&ctx).unwrap();
        assert!(matches!(
            stack.r12(5, 0),
            Err(SolverError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_energy_conservation_lossless_interface() {
        // For a lossless structure the propagating-mode powers balance.
        let ctx = Context::new(1.55, 6).unwrap();
        let a = solved_slab(&ctx, 1.0, 5.0);
        let b = solved_slab(&ctx, 3.5, 5.0);
        let mut stack = Stack::new(
            StackTerm::new(Arc::clone(&a), 0.0) + StackTerm::new(Arc::clone(&b), 0.0),
        )
        .unwrap();
        stack.calc(&ctx).unwrap();

        // Fundamental mode is propagating on both sides; in the
        // power-normalised basis |r|² + |t|² = 1 without kz weighting.
        let r = stack.r12(0, 0).unwrap();
        let t = stack.t12(0, 0).unwrap();

        let refl = r.norm_sqr();
        let trans = t.norm_sqr();
        assert!(
            (refl + trans - 1.0).abs() < 1e-8,
            "R + T = {}",
            refl + trans
        );
    }
}
