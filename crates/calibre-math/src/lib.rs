//! # Calibre Math
//!
//! Numerical substrate for the Calibre multi-curve calibration library.
//!
//! This crate provides:
//!
//! - **Linear Algebra**: An injectable [`linear_algebra::LinearSolver`]
//!   capability with LU and SVD implementations
//! - **Solvers**: A damped Newton solver for square nonlinear systems
//!
//! ## Design Philosophy
//!
//! - **Numerical Stability**: The default decomposition is SVD-based so that
//!   near-singular Jacobians are detected rather than silently amplified
//! - **Swappable Decompositions**: Callers inject the decomposition strategy,
//!   which keeps singular-matrix handling independently testable

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]

pub mod error;
pub mod linear_algebra;
pub mod solvers;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MathError, MathResult};
    pub use crate::linear_algebra::{LinearSolver, LuSolver, SvdSolver};
    pub use crate::solvers::{
        finite_difference_jacobian, solve_system, SolverConfig, SystemSolution,
    };
}

pub use error::{MathError, MathResult};
pub use linear_algebra::{LinearSolver, LuSolver, SvdSolver};
pub use solvers::{solve_system, SolverConfig, SystemSolution};
