//! Spline-interpolated tabulated refractive index data.

use num_complex::Complex64;

use crate::provider::{MaterialError, MaterialProvider};
use crate::spline::CubicSpline;

/// A material defined by measured `(wavelength, n, k)` samples.
///
/// Real and imaginary parts are interpolated independently with natural
/// cubic splines. The loss convention is $\tilde{n} = n - i k$ with
/// $k \geq 0$ for absorbing media.
#[derive(Debug, Clone)]
pub struct TabulatedIndex {
    name: String,
    n_spline: CubicSpline,
    k_spline: CubicSpline,
}

impl TabulatedIndex {
    /// Build from `(wavelength_um, n, k)` rows sorted by wavelength.
    pub fn from_samples(
        name: impl Into<String>,
        rows: &[(f64, f64, f64)],
    ) -> Result<Self, MaterialError> {
        let wavelengths: Vec<f64> = rows.iter().map(|r| r.0).collect();
        let n_values: Vec<f64> = rows.iter().map(|r| r.1).collect();
        let k_values: Vec<f64> = rows.iter().map(|r| r.2).collect();

        Ok(Self {
            name: name.into(),
            n_spline: CubicSpline::new(wavelengths.clone(), n_values)?,
            k_spline: CubicSpline::new(wavelengths, k_values)?,
        })
    }
}

impl MaterialProvider for TabulatedIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> (f64, f64) {
        self.n_spline.range()
    }

    fn refractive_index(&self, wavelength: f64) -> Result<Complex64, MaterialError> {
        let (min, max) = self.wavelength_range();
        if wavelength < min || wavelength > max {
            return Err(MaterialError::OutOfRange {
                wavelength,
                min,
                max,
            });
        }

        Ok(Complex64::new(
            self.n_spline.evaluate(wavelength),
            -self.k_spline.evaluate(wavelength),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_range_check() {
        let table = TabulatedIndex::from_samples(
            "test",
            &[
                (1.0, 3.50, 0.00),
                (1.3, 3.45, 0.01),
                (1.6, 3.40, 0.02),
            ],
        )
        .unwrap();

        let n = table.refractive_index(1.3).unwrap();
        assert!((n.re - 3.45).abs() < 1e-12);
        assert!((n.im + 0.01).abs() < 1e-12);

        assert!(table.refractive_index(0.5).is_err());
        assert!(table.refractive_index(2.0).is_err());
    }
}
