//! Natural cubic spline interpolation for tabulated material data.
//!
//! Measured n, k tables are sampled at discrete wavelengths; the spline
//! provides smooth values in between. Evaluation outside the knot range is
//! refused by the callers (see [`tabulated`](crate::tabulated)), so no
//! extrapolation policy is needed here.

use crate::provider::MaterialError;

/// A natural cubic spline through real-valued samples.
///
/// Construction solves the tridiagonal system for the second derivatives
/// at the knots; evaluation is a binary search plus a cubic Hermite form.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    knots: Vec<f64>,
    values: Vec<f64>,
    second_derivs: Vec<f64>,
}

impl CubicSpline {
    /// Build a spline from `(x, y)` samples with strictly increasing `x`.
    pub fn new(knots: Vec<f64>, values: Vec<f64>) -> Result<Self, MaterialError> {
        if knots.len() != values.len() {
            return Err(MaterialError::DataError(format!(
                "knot/value length mismatch: {} vs {}",
                knots.len(),
                values.len()
            )));
        }
        if knots.len() < 2 {
            return Err(MaterialError::DataError(
                "need at least 2 samples for interpolation".into(),
            ));
        }
        if knots.windows(2).any(|w| w[1] <= w[0]) {
            return Err(MaterialError::DataError(
                "sample wavelengths must be strictly increasing".into(),
            ));
        }

        let n = knots.len();
        let mut second_derivs = vec![0.0; n];
        let mut scratch = vec![0.0; n - 1];

        // Forward elimination of the tridiagonal system; natural boundary
        // conditions leave the end second derivatives at zero.
        for i in 1..n - 1 {
            let sig = (knots[i] - knots[i - 1]) / (knots[i + 1] - knots[i - 1]);
            let p = sig * second_derivs[i - 1] + 2.0;
            second_derivs[i] = (sig - 1.0) / p;
            let slope_right = (values[i + 1] - values[i]) / (knots[i + 1] - knots[i]);
            let slope_left = (values[i] - values[i - 1]) / (knots[i] - knots[i - 1]);
            let rhs = slope_right - slope_left;
            scratch[i] = (6.0 * rhs / (knots[i + 1] - knots[i - 1]) - sig * scratch[i - 1]) / p;
        }

        for k in (1..n - 1).rev() {
            second_derivs[k] = second_derivs[k] * second_derivs[k + 1] + scratch[k];
        }

        Ok(Self {
            knots,
            values,
            second_derivs,
        })
    }

    /// The covered x range.
    pub fn range(&self) -> (f64, f64) {
        (self.knots[0], *self.knots.last().unwrap_or(&0.0))
    }

    /// Evaluate the spline at `x` (assumed within range).
    pub fn evaluate(&self, x: f64) -> f64 {
        let mut lo = 0;
        let mut hi = self.knots.len() - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.knots[mid] > x {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        let h = self.knots[hi] - self.knots[lo];
        let a = (self.knots[hi] - x) / h;
        let b = (x - self.knots[lo]) / h;

        a * self.values[lo]
            + b * self.values[hi]
            + ((a * a * a - a) * self.second_derivs[lo]
                + (b * b * b - b) * self.second_derivs[hi])
                * h
                * h
                / 6.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolation_passes_through_samples() {
        let xs = vec![0.5, 1.0, 1.5, 2.0];
        let ys = vec![1.45, 1.44, 1.43, 1.41];
        let spline = CubicSpline::new(xs.clone(), ys.clone()).unwrap();

        for (x, y) in xs.iter().zip(ys.iter()) {
            assert!((spline.evaluate(*x) - y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rejects_unsorted_samples() {
        assert!(CubicSpline::new(vec![1.0, 0.5], vec![1.0, 2.0]).is_err());
        assert!(CubicSpline::new(vec![1.0], vec![1.0]).is_err());
        assert!(CubicSpline::new(vec![1.0, 2.0], vec![1.0]).is_err());
    }

    #[test]
    fn test_linear_data_reproduced_between_knots() {
        let xs = vec![0.0, 1.0, 2.0, 3.0];
        let ys = vec![0.0, 2.0, 4.0, 6.0];
        let spline = CubicSpline::new(xs, ys).unwrap();
        assert!((spline.evaluate(1.5) - 3.0).abs() < 1e-10);
    }
}
