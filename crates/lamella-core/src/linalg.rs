//! Dense complex linear solves.
//!
//! Scattering-matrix assembly repeatedly needs $(\mathbf{I} -
//! \mathbf{X})^{-1}\mathbf{Y}$ products. These are computed as LU solves
//! via `faer` rather than explicit inversion.

use faer::linalg::solvers::SpSolver;
use ndarray::Array2;
use num_complex::Complex64;

use crate::SolverError;

/// Solve `A X = B` for a matrix right-hand side by LU with partial pivoting.
pub fn solve(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Result<Array2<Complex64>, SolverError> {
    let dim = a.nrows();
    if a.ncols() != dim {
        return Err(SolverError::LinAlg(format!(
            "matrix is {}x{}, expected square",
            a.nrows(),
            a.ncols()
        )));
    }
    if b.nrows() != dim {
        return Err(SolverError::LinAlg(format!(
            "RHS has {} rows, expected {}",
            b.nrows(),
            dim
        )));
    }

    let ncols = b.ncols();

    let faer_a = faer::Mat::<faer::complex_native::c64>::from_fn(dim, dim, |i, j| {
        let c = a[[i, j]];
        faer::complex_native::c64::new(c.re, c.im)
    });
    let faer_b = faer::Mat::<faer::complex_native::c64>::from_fn(dim, ncols, |i, j| {
        let c = b[[i, j]];
        faer::complex_native::c64::new(c.re, c.im)
    });

    let lu = faer_a.partial_piv_lu();
    let faer_x = lu.solve(&faer_b);

    Ok(Array2::from_shape_fn((dim, ncols), |(i, j)| {
        let c = faer_x[(i, j)];
        Complex64::new(c.re, c.im)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_identity_solve() {
        let eye = Array2::<Complex64>::eye(4);
        let b = Array2::from_shape_fn((4, 2), |(i, j)| Complex64::new(i as f64, j as f64));
        let x = solve(&eye, &b).unwrap();
        for ((i, j), v) in x.indexed_iter() {
            assert!((v - b[[i, j]]).norm() < 1e-13);
        }
    }

    #[test]
    fn test_complex_system_residual() {
        let a = array![
            [Complex64::new(1.0, 1.0), Complex64::new(2.0, 0.0)],
            [Complex64::new(0.0, 1.0), Complex64::new(3.0, -1.0)],
        ];
        let b = array![[Complex64::new(5.0, 1.0)], [Complex64::new(4.0, 2.0)]];

        let x = solve(&a, &b).unwrap();
        let check = a.dot(&x);
        for i in 0..2 {
            assert!(
                (check[[i, 0]] - b[[i, 0]]).norm() < 1e-12,
                "residual too large at row {}: {:?} vs {:?}",
                i,
                check[[i, 0]],
                b[[i, 0]]
            );
        }
    }

    #[test]
    fn test_non_square_rejected() {
        let a = Array2::<Complex64>::zeros((2, 3));
        let b = Array2::<Complex64>::zeros((2, 2));
        assert!(solve(&a, &b).is_err());
    }
}
