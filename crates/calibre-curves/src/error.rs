//! Error types for curve construction and calibration.
//!
//! All calibration failures are fatal for their unit and bubble up to the
//! caller; the engine performs no partial-unit retries. Errors raised while
//! pricing an instrument propagate unchanged rather than being replaced by a
//! default value.

use calibre_math::MathError;
use thiserror::Error;

/// A specialized Result type for curve operations.
pub type CurveResult<T> = Result<T, CurveError>;

/// Error types for curve construction and calibration.
#[derive(Error, Debug, Clone)]
pub enum CurveError {
    /// A count disagrees with what the operation requires.
    ///
    /// Raised before any solve when a unit's instrument count does not equal
    /// its free parameter count, or when a parameter vector is shorter than
    /// the generators require.
    #[error("Dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        /// What was being sized up.
        context: String,
        /// Required count.
        expected: usize,
        /// Actual count.
        got: usize,
    },

    /// The root finder exhausted its iteration budget on a unit.
    #[error("Unit '{unit}' failed to converge after {iterations} iterations (residual: {residual:.2e})")]
    NonConvergence {
        /// Label of the failed unit (joined curve names).
        unit: String,
        /// Iterations attempted.
        iterations: u32,
        /// Final residual norm.
        residual: f64,
        /// The parameter iterate at the point of failure.
        last_iterate: Vec<f64>,
    },

    /// A unit's Jacobian block is not invertible within tolerance.
    ///
    /// Indicates an ill-posed or redundant instrument set that does not span
    /// the unit's parameter space.
    #[error("Unit '{unit}': singular Jacobian, instrument set does not span the parameter space")]
    SingularJacobian {
        /// Label of the failed unit.
        unit: String,
    },

    /// The valuation or sensitivity visitor failed for an instrument.
    #[error("Valuation failed for {instrument}: {reason}")]
    Visitor {
        /// Description of the offending instrument.
        instrument: String,
        /// Why the visitor rejected it.
        reason: String,
    },

    /// Curve not found in the provider.
    #[error("Curve not found: {name}")]
    CurveNotFound {
        /// Name or role of the missing curve.
        name: String,
    },

    /// A curve name was written twice.
    #[error("Duplicate curve name: {name}")]
    DuplicateCurve {
        /// The repeated name.
        name: String,
    },

    /// Invalid calibration instrument.
    #[error("Invalid instrument: {reason}")]
    InvalidInstrument {
        /// Description of what's wrong with the instrument.
        reason: String,
    },

    /// Node times are not strictly increasing.
    #[error("Non-monotonic node times at index {index}: {prev:.4} >= {current:.4}")]
    NonMonotonicTimes {
        /// Index where monotonicity breaks.
        index: usize,
        /// Previous node time.
        prev: f64,
        /// Current node time.
        current: f64,
    },

    /// Not enough data points for the operation.
    #[error("Insufficient points: need at least {required}, got {got}")]
    InsufficientPoints {
        /// Minimum required points.
        required: usize,
        /// Actual number of points provided.
        got: usize,
    },

    /// Invalid value (NaN, Inf, or domain error).
    #[error("Invalid value: {reason}")]
    InvalidValue {
        /// Description of why the value is invalid.
        reason: String,
    },

    /// Numerical error from the math layer.
    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

impl CurveError {
    /// Creates a dimension mismatch error.
    #[must_use]
    pub fn dimension_mismatch(context: impl Into<String>, expected: usize, got: usize) -> Self {
        Self::DimensionMismatch {
            context: context.into(),
            expected,
            got,
        }
    }

    /// Creates a visitor failure error.
    #[must_use]
    pub fn visitor(instrument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Visitor {
            instrument: instrument.into(),
            reason: reason.into(),
        }
    }

    /// Creates a curve not found error.
    #[must_use]
    pub fn curve_not_found(name: impl Into<String>) -> Self {
        Self::CurveNotFound { name: name.into() }
    }

    /// Creates a duplicate curve error.
    #[must_use]
    pub fn duplicate_curve(name: impl Into<String>) -> Self {
        Self::DuplicateCurve { name: name.into() }
    }

    /// Creates an invalid instrument error.
    #[must_use]
    pub fn invalid_instrument(reason: impl Into<String>) -> Self {
        Self::InvalidInstrument {
            reason: reason.into(),
        }
    }

    /// Creates a non-monotonic times error.
    #[must_use]
    pub fn non_monotonic_times(index: usize, prev: f64, current: f64) -> Self {
        Self::NonMonotonicTimes {
            index,
            prev,
            current,
        }
    }

    /// Creates an insufficient points error.
    #[must_use]
    pub fn insufficient_points(required: usize, got: usize) -> Self {
        Self::InsufficientPoints { required, got }
    }

    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            reason: reason.into(),
        }
    }

    /// Attaches unit context to solver-level failures.
    ///
    /// Non-convergence and singular-matrix conditions coming out of the math
    /// layer are re-labelled with the unit that produced them; every other
    /// error passes through unchanged.
    #[must_use]
    pub(crate) fn for_unit(self, unit: &str) -> Self {
        match self {
            Self::Math(MathError::ConvergenceFailed {
                iterations,
                residual,
                last_iterate,
            }) => Self::NonConvergence {
                unit: unit.to_string(),
                iterations,
                residual,
                last_iterate,
            },
            Self::Math(MathError::SingularMatrix) => Self::SingularJacobian {
                unit: unit.to_string(),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_display() {
        let err = CurveError::dimension_mismatch("unit 'USD-OIS'", 3, 2);
        let msg = err.to_string();
        assert!(msg.contains("unit 'USD-OIS'"));
        assert!(msg.contains("expected 3"));
    }

    #[test]
    fn test_for_unit_relabels_convergence() {
        let math = MathError::convergence_failed(100, 1e-3, vec![0.1]);
        let err = CurveError::from(math).for_unit("EUR-6M");

        match err {
            CurveError::NonConvergence {
                unit, iterations, ..
            } => {
                assert_eq!(unit, "EUR-6M");
                assert_eq!(iterations, 100);
            }
            other => panic!("expected NonConvergence, got {other:?}"),
        }
    }

    #[test]
    fn test_for_unit_relabels_singular() {
        let err = CurveError::from(MathError::SingularMatrix).for_unit("USD-OIS");
        assert!(matches!(err, CurveError::SingularJacobian { .. }));
    }

    #[test]
    fn test_for_unit_passes_through_visitor() {
        let err = CurveError::visitor("Deposit 3M", "unsupported convention").for_unit("USD-OIS");
        assert!(matches!(err, CurveError::Visitor { .. }));
    }
}
