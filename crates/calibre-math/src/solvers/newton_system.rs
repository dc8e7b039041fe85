//! Damped Newton iteration for square nonlinear systems.

use nalgebra::{DMatrix, DVector};

use crate::error::{MathError, MathResult};
use crate::linear_algebra::LinearSolver;
use crate::solvers::{SolverConfig, SystemSolution};

/// Solves the square system `F(x) = 0` by damped Newton iteration.
///
/// Each step recomputes the full Jacobian and performs one linear solve
/// `J·Δ = F` through `linear`. When the full step does not reduce the
/// residual norm, the step is halved up to
/// [`max_step_halvings`](SolverConfig::max_step_halvings) times and the last
/// candidate is accepted, which keeps the iteration moving on stiff systems.
///
/// The solver is generic over the caller's error type: objective and
/// Jacobian failures propagate unchanged, while solver-internal conditions
/// (singular Jacobian, non-convergence, shape mismatches) are raised as
/// [`MathError`] and converted through `E: From<MathError>`.
///
/// # Arguments
///
/// * `objective` - The vector-valued function `F: ℝⁿ → ℝⁿ`
/// * `jacobian` - The derivative `J: ℝⁿ → ℝⁿˣⁿ`
/// * `x0` - Initial guess
/// * `linear` - Decomposition used for the Newton step
/// * `config` - Tolerances and iteration budget
///
/// # Errors
///
/// * [`MathError::DimensionMismatch`] if the objective or Jacobian output
///   shape disagrees with `x0`
/// * [`MathError::SingularMatrix`] if the Jacobian is not invertible within
///   the decomposition's tolerance
/// * [`MathError::ConvergenceFailed`] after the iteration budget, carrying
///   the last iterate and residual
///
/// # Example
///
/// ```rust
/// use calibre_math::error::MathResult;
/// use calibre_math::linear_algebra::SvdSolver;
/// use calibre_math::solvers::{solve_system, SolverConfig};
/// use nalgebra::{DMatrix, DVector};
///
/// // x² + y² = 2, x − y = 0 → root at (1, 1)
/// let objective = |x: &DVector<f64>| -> MathResult<DVector<f64>> {
///     Ok(DVector::from_vec(vec![
///         x[0] * x[0] + x[1] * x[1] - 2.0,
///         x[0] - x[1],
///     ]))
/// };
/// let jacobian = |x: &DVector<f64>| -> MathResult<DMatrix<f64>> {
///     Ok(DMatrix::from_row_slice(2, 2, &[
///         2.0 * x[0], 2.0 * x[1],
///         1.0, -1.0,
///     ]))
/// };
///
/// let x0 = DVector::from_vec(vec![2.0, 0.5]);
/// let solution = solve_system(
///     objective,
///     jacobian,
///     x0,
///     &SvdSolver::default(),
///     &SolverConfig::default(),
/// )
/// .unwrap();
/// assert!((solution.root[0] - 1.0).abs() < 1e-10);
/// ```
pub fn solve_system<F, J, E>(
    mut objective: F,
    mut jacobian: J,
    x0: DVector<f64>,
    linear: &dyn LinearSolver,
    config: &SolverConfig,
) -> Result<SystemSolution, E>
where
    F: FnMut(&DVector<f64>) -> Result<DVector<f64>, E>,
    J: FnMut(&DVector<f64>) -> Result<DMatrix<f64>, E>,
    E: From<MathError>,
{
    let n = x0.len();
    if n == 0 {
        return Err(MathError::invalid_input("empty initial guess").into());
    }

    let mut x = x0;
    let mut fx = evaluate(&mut objective, &x, n)?;

    if fx.amax() <= config.abs_tolerance {
        return Ok(SystemSolution {
            residual_norm: fx.amax(),
            root: x,
            iterations: 0,
        });
    }

    for iteration in 1..=config.max_iterations {
        let j = jacobian(&x)?;
        if j.nrows() != n || j.ncols() != n {
            return Err(MathError::dimension_mismatch(j.nrows(), j.ncols(), n, n).into());
        }

        let delta = linear.solve(&j, &fx)?;

        // Damped update: halve the step while it worsens the residual
        let current_norm = fx.norm();
        let mut scale = 1.0;
        let mut candidate = &x - &delta;
        let mut f_candidate = evaluate(&mut objective, &candidate, n)?;
        for _ in 0..config.max_step_halvings {
            if f_candidate.norm() < current_norm {
                break;
            }
            scale *= 0.5;
            candidate = &x - &(&delta * scale);
            f_candidate = evaluate(&mut objective, &candidate, n)?;
        }

        let step_norm = delta.norm() * scale;
        x = candidate;
        fx = f_candidate;

        let residual_ok = fx.amax() <= config.abs_tolerance;
        let step_ok = step_norm <= config.step_tolerance * (1.0 + x.norm());
        if residual_ok && step_ok {
            return Ok(SystemSolution {
                residual_norm: fx.amax(),
                root: x,
                iterations: iteration,
            });
        }
    }

    Err(MathError::convergence_failed(
        config.max_iterations,
        fx.amax(),
        x.iter().copied().collect(),
    )
    .into())
}

fn evaluate<F, E>(objective: &mut F, x: &DVector<f64>, n: usize) -> Result<DVector<f64>, E>
where
    F: FnMut(&DVector<f64>) -> Result<DVector<f64>, E>,
    E: From<MathError>,
{
    let fx = objective(x)?;
    if fx.len() != n {
        return Err(MathError::dimension_mismatch(fx.len(), 1, n, 1).into());
    }
    if fx.iter().any(|v| !v.is_finite()) {
        return Err(MathError::invalid_input("objective returned a non-finite value").into());
    }
    Ok(fx)
}

/// Central-difference Jacobian of a vector-valued function.
///
/// Used by callers without analytic sensitivities and by tests as a
/// cross-check against analytic Jacobians.
pub fn finite_difference_jacobian<F, E>(
    mut objective: F,
    x: &DVector<f64>,
    step: f64,
) -> Result<DMatrix<f64>, E>
where
    F: FnMut(&DVector<f64>) -> Result<DVector<f64>, E>,
    E: From<MathError>,
{
    if step <= 0.0 || !step.is_finite() {
        return Err(MathError::invalid_input("step must be positive and finite").into());
    }

    let n = x.len();
    let mut jacobian = DMatrix::zeros(n, n);

    for j in 0..n {
        let mut up = x.clone();
        up[j] += step;
        let mut down = x.clone();
        down[j] -= step;

        let f_up = objective(&up)?;
        let f_down = objective(&down)?;
        if f_up.len() != n || f_down.len() != n {
            return Err(MathError::dimension_mismatch(f_up.len(), 1, n, 1).into());
        }

        for i in 0..n {
            jacobian[(i, j)] = (f_up[i] - f_down[i]) / (2.0 * step);
        }
    }

    Ok(jacobian)
}
