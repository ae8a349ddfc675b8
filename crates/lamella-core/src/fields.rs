//! Total fields reconstructed from modal amplitudes.

use std::sync::Arc;

use ndarray::Array1;
use num_complex::Complex64;

use crate::context::Context;
use crate::field::Field;
use crate::quad::adaptive_simpson;
use crate::slab::Slab;

/// A field in one cross-section, given as forward and backward modal
/// amplitudes over the slab's basis.
#[derive(Debug, Clone)]
pub struct FieldExpansion {
    slab: Arc<Slab>,
    fw: Array1<Complex64>,
    bw: Array1<Complex64>,
}

impl FieldExpansion {
    pub fn new(slab: Arc<Slab>, fw: Array1<Complex64>, bw: Array1<Complex64>) -> Self {
        Self { slab, fw, bw }
    }

    pub fn slab(&self) -> &Arc<Slab> {
        &self.slab
    }

    pub fn fw(&self) -> &Array1<Complex64> {
        &self.fw
    }

    pub fn bw(&self) -> &Array1<Complex64> {
        &self.bw
    }

    /// Total field at transverse position `x`.
    pub fn field(&self, ctx: &Context, x: Complex64) -> Field {
        let mut total = Field::default();

        for (i, mode) in self.slab.modes().iter().enumerate() {
            if i < self.fw.len() && self.fw[i].norm() > 0.0 {
                total = total + self.fw[i] * mode.field(&self.slab, ctx, x, true);
            }
            if i < self.bw.len() && self.bw[i].norm() > 0.0 {
                total = total + self.bw[i] * mode.field(&self.slab, ctx, x, false);
            }
        }

        total
    }

    /// Net power flux along the propagation axis between the transverse
    /// positions `x0` and `x1`.
    pub fn s_flux(&self, ctx: &Context, x0: f64, x1: f64, eps: f64) -> f64 {
        let integrand = |x: f64| Complex64::from(self.field(ctx, Complex64::from(x)).sz());
        adaptive_simpson(&integrand, x0, x1, eps).re
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Slice;
    use lamella_materials::constant::Material;

    #[test]
    fn test_single_mode_expansion_matches_mode_field() {
        let ctx = Context::new(1.55, 3).unwrap();
        let air = Material::new(1.0);
        let mut slab = Slab::new(air.slice(5.0)).unwrap();
        slab.find_modes(&ctx).unwrap();
        let slab = Arc::new(slab);

        let mut fw = Array1::zeros(3);
        fw[1] = Complex64::from(2.0);
        let expansion = FieldExpansion::new(Arc::clone(&slab), fw, Array1::zeros(3));

        let x = Complex64::from(1.7);
        let direct = slab.modes()[1].field(&slab, &ctx, x, true);
        let total = expansion.field(&ctx, x);

        assert!((total.e2 - 2.0 * direct.e2).norm() < 1e-12);
        assert!((total.h1 - 2.0 * direct.h1).norm() < 1e-12);
    }

    #[test]
    fn test_counterpropagating_equal_amplitudes_carry_no_flux() {
        let ctx = Context::new(1.55, 2).unwrap();
        let air = Material::new(1.0);
        let mut slab = Slab::new(air.slice(5.0)).unwrap();
        slab.find_modes(&ctx).unwrap();
        let slab = Arc::new(slab);

        let mut fw = Array1::zeros(2);
        fw[0] = Complex64::from(1.0);
        let bw = fw.clone();
        let expansion = FieldExpansion::new(slab, fw, bw);

        let flux = expansion.s_flux(&ctx, 0.0, 5.0, 1e-8);
        assert!(flux.abs() < 1e-8, "flux = {flux}");
    }
}
