//! Sellmeier dispersion model.
//!
//! The three-term Sellmeier equation
//! $n^2(\lambda) = 1 + \sum_i \frac{B_i \lambda^2}{\lambda^2 - C_i}$
//! with $\lambda$ in micrometres. Coefficients for fused silica are from
//! Malitson, *J. Opt. Soc. Am.* **55**, 1205 (1965).

use num_complex::Complex64;

use crate::provider::{MaterialError, MaterialProvider};

/// A three-term Sellmeier material model.
#[derive(Debug, Clone)]
pub struct Sellmeier {
    name: String,
    /// Oscillator strengths $B_i$.
    b: [f64; 3],
    /// Resonance wavelengths squared $C_i$ (µm²).
    c: [f64; 3],
    /// Validity range (µm).
    range: (f64, f64),
}

impl Sellmeier {
    /// Construct a Sellmeier model from raw coefficients.
    pub fn new(name: impl Into<String>, b: [f64; 3], c: [f64; 3], range: (f64, f64)) -> Self {
        Self {
            name: name.into(),
            b,
            c,
            range,
        }
    }

    /// Fused silica (Malitson 1965), valid 0.21–6.7 µm.
    pub fn fused_silica() -> Self {
        Self::new(
            "SiO2_Malitson",
            [0.696_166_3, 0.407_942_6, 0.897_479_4],
            [
                0.068_404_3 * 0.068_404_3,
                0.116_241_4 * 0.116_241_4,
                9.896_161 * 9.896_161,
            ],
            (0.21, 6.7),
        )
    }
}

impl MaterialProvider for Sellmeier {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> (f64, f64) {
        self.range
    }

    fn refractive_index(&self, wavelength: f64) -> Result<Complex64, MaterialError> {
        let (min, max) = self.range;
        if wavelength < min || wavelength > max {
            return Err(MaterialError::OutOfRange {
                wavelength,
                min,
                max,
            });
        }

        let l2 = wavelength * wavelength;
        let n2 = 1.0
            + self
                .b
                .iter()
                .zip(self.c.iter())
                .map(|(&b, &c)| b * l2 / (l2 - c))
                .sum::<f64>();

        Ok(Complex64::from(n2.sqrt()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fused_silica_at_1550nm() {
        let silica = Sellmeier::fused_silica();
        let n = silica.refractive_index(1.55).unwrap();
        // Malitson gives n = 1.4440 at 1.55 µm.
        assert!(
            (n.re - 1.4440).abs() < 2e-4,
            "n(1.55 µm) = {}, expected ~1.4440",
            n.re
        );
        assert_eq!(n.im, 0.0);
    }

    #[test]
    fn test_out_of_range_is_an_error() {
        let silica = Sellmeier::fused_silica();
        assert!(silica.refractive_index(0.1).is_err());
        assert!(silica.refractive_index(10.0).is_err());
    }

    #[test]
    fn test_normal_dispersion() {
        let silica = Sellmeier::fused_silica();
        let n_short = silica.refractive_index(0.6).unwrap().re;
        let n_long = silica.refractive_index(1.6).unwrap().re;
        assert!(n_short > n_long, "index should fall with wavelength");
    }
}
