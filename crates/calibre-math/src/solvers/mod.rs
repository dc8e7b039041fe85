//! Nonlinear system solvers.
//!
//! This module provides the damped Newton solver used to calibrate curve
//! units: a square vector-valued objective is driven to zero by iterating
//! `x_{k+1} = x_k − J(x_k)⁻¹·F(x_k)`, with the linear solve delegated to an
//! injected [`LinearSolver`](crate::linear_algebra::LinearSolver).
//!
//! # Convergence
//!
//! The solver stops when both an absolute tolerance on `‖F(x)‖∞` and a
//! relative tolerance on the last step are satisfied. If neither holds after
//! the iteration budget, it reports
//! [`MathError::ConvergenceFailed`](crate::error::MathError::ConvergenceFailed)
//! carrying the last iterate for diagnosis.

mod newton_system;

pub use newton_system::{finite_difference_jacobian, solve_system};

use nalgebra::DVector;

/// Default absolute tolerance on the residual norm.
pub const DEFAULT_ABS_TOLERANCE: f64 = 1e-12;

/// Default relative tolerance on successive steps.
pub const DEFAULT_STEP_TOLERANCE: f64 = 1e-10;

/// Default maximum iterations.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Configuration for the Newton system solver.
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// Absolute tolerance on `‖F(x)‖∞`.
    pub abs_tolerance: f64,
    /// Relative tolerance on the step size, scaled by `1 + ‖x‖`.
    pub step_tolerance: f64,
    /// Maximum number of Newton iterations.
    pub max_iterations: u32,
    /// Maximum number of step halvings per iteration when damping.
    pub max_step_halvings: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            abs_tolerance: DEFAULT_ABS_TOLERANCE,
            step_tolerance: DEFAULT_STEP_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_step_halvings: 8,
        }
    }
}

impl SolverConfig {
    /// Creates a new solver configuration.
    #[must_use]
    pub fn new(abs_tolerance: f64, step_tolerance: f64, max_iterations: u32) -> Self {
        Self {
            abs_tolerance,
            step_tolerance,
            max_iterations,
            max_step_halvings: 8,
        }
    }

    /// Sets the absolute residual tolerance.
    #[must_use]
    pub fn with_abs_tolerance(mut self, abs_tolerance: f64) -> Self {
        self.abs_tolerance = abs_tolerance;
        self
    }

    /// Sets the relative step tolerance.
    #[must_use]
    pub fn with_step_tolerance(mut self, step_tolerance: f64) -> Self {
        self.step_tolerance = step_tolerance;
        self
    }

    /// Sets the maximum iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Result of a successful system solve.
#[derive(Debug, Clone)]
pub struct SystemSolution {
    /// The root found.
    pub root: DVector<f64>,
    /// Number of Newton iterations used.
    pub iterations: u32,
    /// Final residual norm `‖F(x)‖∞`.
    pub residual_norm: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_config_builder() {
        let config = SolverConfig::default()
            .with_abs_tolerance(1e-9)
            .with_max_iterations(25);

        assert!((config.abs_tolerance - 1e-9).abs() < f64::EPSILON);
        assert_eq!(config.max_iterations, 25);
    }
}
