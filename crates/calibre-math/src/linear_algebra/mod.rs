//! Linear algebra capability.
//!
//! This module defines the [`LinearSolver`] trait, the injectable
//! decomposition strategy used by the calibration solvers, together with two
//! implementations:
//!
//! - [`LuSolver`]: Gaussian elimination with partial pivoting. Fast, rejects
//!   matrices with a pivot below its tolerance.
//! - [`SvdSolver`]: SVD-based solve/pseudo-inverse. Slower but robust to
//!   near-singular matrices, with an explicit rank check.
//!
//! Both report [`MathError::SingularMatrix`] instead of returning amplified
//! noise when the input is not invertible within tolerance.

use crate::error::{MathError, MathResult};
use nalgebra::{DMatrix, DVector};

/// Injectable linear-system capability.
///
/// Calibration code never commits to a decomposition; it receives a
/// `&dyn LinearSolver` and calls [`solve`](LinearSolver::solve) for Newton
/// steps and [`inverse`](LinearSolver::inverse) for sensitivity blocks.
pub trait LinearSolver: Send + Sync {
    /// Solves the square system `A·x = b`.
    ///
    /// # Errors
    ///
    /// Returns [`MathError::DimensionMismatch`] if `A` is not square or `b`
    /// has the wrong length, and [`MathError::SingularMatrix`] if `A` is not
    /// invertible within the solver's tolerance.
    fn solve(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<DVector<f64>>;

    /// Computes the inverse of the square matrix `A`.
    fn inverse(&self, a: &DMatrix<f64>) -> MathResult<DMatrix<f64>>;

    /// Returns the name of the decomposition.
    fn name(&self) -> &'static str;
}

fn check_square(a: &DMatrix<f64>) -> MathResult<usize> {
    let n = a.nrows();
    if n == 0 || n != a.ncols() {
        return Err(MathError::dimension_mismatch(n, a.ncols(), n, n));
    }
    Ok(n)
}

fn check_rhs(a: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<usize> {
    let n = check_square(a)?;
    if b.len() != n {
        return Err(MathError::dimension_mismatch(n, n, b.len(), 1));
    }
    Ok(n)
}

/// Gaussian elimination with partial pivoting.
#[derive(Debug, Clone, Copy)]
pub struct LuSolver {
    /// Absolute pivot threshold below which the matrix is declared singular.
    pub pivot_tolerance: f64,
}

impl Default for LuSolver {
    fn default() -> Self {
        Self {
            pivot_tolerance: 1e-13,
        }
    }
}

impl LuSolver {
    /// Creates a solver with a custom pivot tolerance.
    #[must_use]
    pub fn new(pivot_tolerance: f64) -> Self {
        Self { pivot_tolerance }
    }

    /// Eliminates the augmented system `[A | B]` in place and back-substitutes.
    fn solve_augmented(&self, a: &DMatrix<f64>, rhs: &DMatrix<f64>) -> MathResult<DMatrix<f64>> {
        let n = a.nrows();
        let m = rhs.ncols();

        let mut lhs = a.clone();
        let mut out = rhs.clone();

        // Forward elimination with partial pivoting
        for k in 0..n {
            let mut max_row = k;
            for i in k + 1..n {
                if lhs[(i, k)].abs() > lhs[(max_row, k)].abs() {
                    max_row = i;
                }
            }
            if max_row != k {
                lhs.swap_rows(k, max_row);
                out.swap_rows(k, max_row);
            }

            if lhs[(k, k)].abs() < self.pivot_tolerance {
                return Err(MathError::SingularMatrix);
            }

            for i in k + 1..n {
                let factor = lhs[(i, k)] / lhs[(k, k)];
                for j in k..n {
                    lhs[(i, j)] -= factor * lhs[(k, j)];
                }
                for j in 0..m {
                    out[(i, j)] -= factor * out[(k, j)];
                }
            }
        }

        // Back substitution
        for j in 0..m {
            for i in (0..n).rev() {
                let mut sum = out[(i, j)];
                for k in i + 1..n {
                    sum -= lhs[(i, k)] * out[(k, j)];
                }
                out[(i, j)] = sum / lhs[(i, i)];
            }
        }

        Ok(out)
    }
}

impl LinearSolver for LuSolver {
    fn solve(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<DVector<f64>> {
        let n = check_rhs(a, b)?;
        let rhs = DMatrix::from_column_slice(n, 1, b.as_slice());
        let x = self.solve_augmented(a, &rhs)?;
        Ok(DVector::from_iterator(n, x.column(0).iter().copied()))
    }

    fn inverse(&self, a: &DMatrix<f64>) -> MathResult<DMatrix<f64>> {
        let n = check_square(a)?;
        self.solve_augmented(a, &DMatrix::identity(n, n))
    }

    fn name(&self) -> &'static str {
        "LU"
    }
}

/// SVD-based solve and pseudo-inverse.
///
/// The matrix is declared singular when its numerical rank, measured against
/// `rank_tolerance` relative to the largest singular value, is below full.
#[derive(Debug, Clone, Copy)]
pub struct SvdSolver {
    /// Relative singular-value threshold for the rank decision.
    pub rank_tolerance: f64,
}

impl Default for SvdSolver {
    fn default() -> Self {
        Self {
            rank_tolerance: 1e-12,
        }
    }
}

impl SvdSolver {
    /// Creates a solver with a custom rank tolerance.
    #[must_use]
    pub fn new(rank_tolerance: f64) -> Self {
        Self { rank_tolerance }
    }

    fn epsilon(&self, svd: &nalgebra::SVD<f64, nalgebra::Dyn, nalgebra::Dyn>) -> MathResult<f64> {
        let s_max = svd.singular_values.max();
        if s_max <= 0.0 || !s_max.is_finite() {
            return Err(MathError::SingularMatrix);
        }
        Ok(self.rank_tolerance * s_max)
    }
}

impl LinearSolver for SvdSolver {
    fn solve(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<DVector<f64>> {
        let n = check_rhs(a, b)?;
        let svd = a.clone().svd(true, true);
        let eps = self.epsilon(&svd)?;
        if svd.rank(eps) < n {
            return Err(MathError::SingularMatrix);
        }
        svd.solve(b, eps).map_err(|_| MathError::SingularMatrix)
    }

    fn inverse(&self, a: &DMatrix<f64>) -> MathResult<DMatrix<f64>> {
        let n = check_square(a)?;
        let svd = a.clone().svd(true, true);
        let eps = self.epsilon(&svd)?;
        if svd.rank(eps) < n {
            return Err(MathError::SingularMatrix);
        }
        svd.pseudo_inverse(eps)
            .map_err(|_| MathError::SingularMatrix)
    }

    fn name(&self) -> &'static str {
        "SVD"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn solvers() -> Vec<Box<dyn LinearSolver>> {
        vec![Box::new(LuSolver::default()), Box::new(SvdSolver::default())]
    }

    #[test]
    fn test_solve_2x2() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let b = DVector::from_vec(vec![5.0, 5.0]);

        for solver in solvers() {
            let x = solver.solve(&a, &b).unwrap();
            assert_relative_eq!(x[0], 2.0, epsilon = 1e-10);
            assert_relative_eq!(x[1], 1.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_solve_needs_pivoting() {
        // Zero leading pivot forces a row swap
        let a = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        let b = DVector::from_vec(vec![3.0, 7.0]);

        for solver in solvers() {
            let x = solver.solve(&a, &b).unwrap();
            assert_relative_eq!(x[0], 7.0, epsilon = 1e-12);
            assert_relative_eq!(x[1], 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_inverse_roundtrip() {
        let a = DMatrix::from_row_slice(3, 3, &[2.0, 1.0, 1.0, 4.0, 3.0, 3.0, 8.0, 7.0, 9.0]);

        for solver in solvers() {
            let inv = solver.inverse(&a).unwrap();
            let product = &a * &inv;
            for i in 0..3 {
                for j in 0..3 {
                    let expected = if i == j { 1.0 } else { 0.0 };
                    assert_relative_eq!(product[(i, j)], expected, epsilon = 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_singular_matrix_rejected() {
        // Second row is a multiple of the first
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let b = DVector::from_vec(vec![1.0, 2.0]);

        for solver in solvers() {
            assert!(matches!(
                solver.solve(&a, &b),
                Err(MathError::SingularMatrix)
            ));
            assert!(matches!(solver.inverse(&a), Err(MathError::SingularMatrix)));
        }
    }

    #[test]
    fn test_non_square_rejected() {
        let a = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let b = DVector::from_vec(vec![1.0, 1.0]);

        for solver in solvers() {
            assert!(matches!(
                solver.solve(&a, &b),
                Err(MathError::DimensionMismatch { .. })
            ));
        }
    }

    #[test]
    fn test_rhs_length_checked() {
        let a = DMatrix::identity(3, 3);
        let b = DVector::from_vec(vec![1.0, 1.0]);

        for solver in solvers() {
            assert!(matches!(
                solver.solve(&a, &b),
                Err(MathError::DimensionMismatch { .. })
            ));
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Diagonally dominant systems are well conditioned, so both
            // decompositions must reproduce A·x = b to tight tolerance.
            #[test]
            fn solve_reproduces_rhs(
                entries in proptest::collection::vec(-1.0f64..1.0, 9),
                rhs in proptest::collection::vec(-10.0f64..10.0, 3),
            ) {
                let mut a = DMatrix::from_row_slice(3, 3, &entries);
                for i in 0..3 {
                    a[(i, i)] += 4.0;
                }
                let b = DVector::from_vec(rhs);

                for solver in solvers() {
                    let x = solver.solve(&a, &b).unwrap();
                    let reproduced = &a * &x;
                    for i in 0..3 {
                        prop_assert!((reproduced[i] - b[i]).abs() < 1e-9);
                    }
                }
            }
        }
    }

    #[test]
    fn test_near_singular_svd_tolerance() {
        // Condition number ~1e14 exceeds the default rank tolerance
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1e-14]);
        let b = DVector::from_vec(vec![1.0, 1.0]);

        let svd = SvdSolver::default();
        assert!(matches!(svd.solve(&a, &b), Err(MathError::SingularMatrix)));

        // A looser tolerance accepts it
        let loose = SvdSolver::new(1e-15);
        assert!(loose.solve(&a, &b).is_ok());
    }
}
