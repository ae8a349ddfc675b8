//! Layer expressions: materials with complex thicknesses.
//!
//! Slab cross-sections are written as sums of material slices, e.g.
//!
//! ```
//! use lamella_core::expression::Slice;
//! use lamella_materials::constant::Material;
//! use num_complex::Complex64;
//!
//! let air = Material::new(1.0);
//! let gaas = Material::new(3.5);
//! let expr = air.slice(Complex64::new(2.0, -0.1))
//!     + gaas.slice(1.0)
//!     + air.slice(Complex64::new(2.0, -0.1));
//! assert_eq!(expr.layers().len(), 3);
//! ```
//!
//! A complex thickness stretches the transverse coordinate into the
//! complex plane, which is how PML absorbers are expressed; the physical
//! width of a layer is the real part.

use num_complex::Complex64;

use lamella_materials::constant::Material;

/// A slice of material with a (possibly complex) thickness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layer {
    pub material: Material,
    pub thickness: Complex64,
}

impl Layer {
    pub fn new(material: Material, thickness: impl Into<Complex64>) -> Self {
        let thickness = thickness.into();
        if thickness.re < 0.0 {
            log::warn!("negative real thickness {} for layer", thickness);
        }
        Self {
            material,
            thickness,
        }
    }
}

/// Extension trait giving materials the `slice` constructor.
pub trait Slice {
    fn slice(&self, thickness: impl Into<Complex64>) -> Layer;
}

impl Slice for Material {
    fn slice(&self, thickness: impl Into<Complex64>) -> Layer {
        Layer::new(*self, thickness)
    }
}

/// An ordered sequence of layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expression {
    layers: Vec<Layer>,
}

impl Expression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Total (complex) width of the expression.
    pub fn width(&self) -> Complex64 {
        self.layers.iter().map(|l| l.thickness).sum()
    }

    /// Repeat this expression `count` times (periodic structures).
    pub fn repeat(&self, count: usize) -> Expression {
        let mut layers = Vec::with_capacity(self.layers.len() * count);
        for _ in 0..count {
            layers.extend_from_slice(&self.layers);
        }
        Expression { layers }
    }

    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }
}

impl From<Layer> for Expression {
    fn from(layer: Layer) -> Self {
        Expression {
            layers: vec![layer],
        }
    }
}

impl std::ops::Add<Layer> for Layer {
    type Output = Expression;

    fn add(self, rhs: Layer) -> Expression {
        Expression {
            layers: vec![self, rhs],
        }
    }
}

impl std::ops::Add<Layer> for Expression {
    type Output = Expression;

    fn add(mut self, rhs: Layer) -> Expression {
        self.layers.push(rhs);
        self
    }
}

impl std::ops::Add<Expression> for Expression {
    type Output = Expression;

    fn add(mut self, rhs: Expression) -> Expression {
        self.layers.extend(rhs.layers);
        self
    }
}

impl std::ops::Add<Expression> for Layer {
    type Output = Expression;

    fn add(self, rhs: Expression) -> Expression {
        Expression::from(self) + rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_sums_complex_thicknesses() {
        let air = Material::new(1.0);
        let gaas = Material::new(3.5);
        let expr = air.slice(Complex64::new(2.0, -0.1))
            + gaas.slice(1.0)
            + air.slice(Complex64::new(2.0, -0.1));
        let w = expr.width();
        assert!((w - Complex64::new(5.0, -0.2)).norm() < 1e-12);
    }

    #[test]
    fn test_repeat() {
        let a = Material::new(1.0);
        let b = Material::new(2.0);
        let period = a.slice(0.25) + b.slice(0.75);
        let grating = period.repeat(3);
        assert_eq!(grating.layers().len(), 6);
        assert!((grating.width() - Complex64::from(3.0)).norm() < 1e-12);
    }
}
