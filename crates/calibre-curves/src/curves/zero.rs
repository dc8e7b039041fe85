//! Interpolated zero-rate curve.
//!
//! [`ZeroCurve`] is the concrete curve shape produced by the generators: a
//! set of node times with continuously-compounded zero rates, interpolated
//! by an [`InterpolationMethod`]. Its node values are the curve's free
//! parameters during calibration, so alongside discount factors it exposes
//! the analytic gradient of any discount factor with respect to the node
//! values — the chain-rule link between instrument sensitivities and curve
//! parameters.

use nalgebra::DVector;

use crate::error::{CurveError, CurveResult};
use crate::interpolation::{locate, Bracket, InterpolationMethod};

/// An interpolated zero-rate curve.
///
/// Times are year fractions from the valuation date; node values are
/// continuously-compounded zero rates. The zero rate is extrapolated flat
/// before the first and after the last node.
#[derive(Debug, Clone, PartialEq)]
pub struct ZeroCurve {
    times: Vec<f64>,
    values: Vec<f64>,
    method: InterpolationMethod,
}

impl ZeroCurve {
    /// Creates a curve from node times and zero rates.
    ///
    /// # Errors
    ///
    /// * [`CurveError::InsufficientPoints`] if `times` is empty
    /// * [`CurveError::DimensionMismatch`] if `times` and `values` differ in
    ///   length
    /// * [`CurveError::NonMonotonicTimes`] if times are not strictly
    ///   increasing
    /// * [`CurveError::InvalidValue`] on non-positive or non-finite inputs
    pub fn new(
        times: Vec<f64>,
        values: Vec<f64>,
        method: InterpolationMethod,
    ) -> CurveResult<Self> {
        if times.is_empty() {
            return Err(CurveError::insufficient_points(1, 0));
        }
        if times.len() != values.len() {
            return Err(CurveError::dimension_mismatch(
                "curve node values",
                times.len(),
                values.len(),
            ));
        }
        if times[0] <= 0.0 || !times[0].is_finite() {
            return Err(CurveError::invalid_value(format!(
                "node times must be positive, got {}",
                times[0]
            )));
        }
        for i in 1..times.len() {
            if times[i] <= times[i - 1] {
                return Err(CurveError::non_monotonic_times(i, times[i - 1], times[i]));
            }
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CurveError::invalid_value("non-finite node value"));
        }

        Ok(Self {
            times,
            values,
            method,
        })
    }

    /// Returns the node times.
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Returns the node zero rates.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns the interpolation method.
    #[must_use]
    pub fn method(&self) -> InterpolationMethod {
        self.method
    }

    /// Returns the number of nodes, which is also the number of free
    /// parameters the curve contributes to a calibration.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.times.len()
    }

    fn check_time(t: f64) -> CurveResult<()> {
        if t < 0.0 || !t.is_finite() {
            return Err(CurveError::invalid_value(format!(
                "query time must be non-negative and finite, got {t}"
            )));
        }
        Ok(())
    }

    /// Returns the interpolated zero rate at `t`.
    pub fn zero_rate(&self, t: f64) -> CurveResult<f64> {
        Self::check_time(t)?;
        Ok(match self.method {
            InterpolationMethod::LinearZero => match locate(&self.times, t) {
                Bracket::Below => self.values[0],
                Bracket::Above => self.values[self.values.len() - 1],
                Bracket::Interior { left, weight } => {
                    (1.0 - weight) * self.values[left] + weight * self.values[left + 1]
                }
            },
            InterpolationMethod::LogLinearDiscount => {
                if t == 0.0 {
                    self.values[0]
                } else {
                    -self.log_discount(t) / t
                }
            }
        })
    }

    /// Returns the discount factor at `t`.
    pub fn discount_factor(&self, t: f64) -> CurveResult<f64> {
        Self::check_time(t)?;
        if t == 0.0 {
            return Ok(1.0);
        }
        Ok(match self.method {
            InterpolationMethod::LinearZero => {
                let z = self.zero_rate(t)?;
                (-z * t).exp()
            }
            InterpolationMethod::LogLinearDiscount => self.log_discount(t).exp(),
        })
    }

    /// Returns the simply-compounded forward rate between `t1` and `t2`.
    pub fn forward_rate(&self, t1: f64, t2: f64) -> CurveResult<f64> {
        if t2 <= t1 {
            return Err(CurveError::invalid_value(format!(
                "forward period must be positive, got [{t1}, {t2}]"
            )));
        }
        let df1 = self.discount_factor(t1)?;
        let df2 = self.discount_factor(t2)?;
        Ok((df1 / df2 - 1.0) / (t2 - t1))
    }

    /// Log discount factor under log-linear interpolation.
    fn log_discount(&self, t: f64) -> f64 {
        match locate(&self.times, t) {
            // Flat zero extrapolation at both ends
            Bracket::Below => -self.values[0] * t,
            Bracket::Above => -self.values[self.values.len() - 1] * t,
            Bracket::Interior { left, weight } => {
                let ld_left = -self.values[left] * self.times[left];
                let ld_right = -self.values[left + 1] * self.times[left + 1];
                (1.0 - weight) * ld_left + weight * ld_right
            }
        }
    }

    /// Gradient of the discount factor at `t` with respect to the node
    /// zero rates.
    ///
    /// This is the chain-rule factor that turns an instrument's
    /// discount-factor sensitivities into parameter sensitivities. The
    /// returned vector has one entry per node.
    pub fn discount_factor_gradient(&self, t: f64) -> CurveResult<DVector<f64>> {
        Self::check_time(t)?;
        let n = self.times.len();
        let mut gradient = DVector::zeros(n);
        if t == 0.0 {
            return Ok(gradient);
        }

        let df = self.discount_factor(t)?;
        match self.method {
            InterpolationMethod::LinearZero => match locate(&self.times, t) {
                Bracket::Below => gradient[0] = -t * df,
                Bracket::Above => gradient[n - 1] = -t * df,
                Bracket::Interior { left, weight } => {
                    gradient[left] = -t * (1.0 - weight) * df;
                    gradient[left + 1] = -t * weight * df;
                }
            },
            InterpolationMethod::LogLinearDiscount => match locate(&self.times, t) {
                Bracket::Below => gradient[0] = -t * df,
                Bracket::Above => gradient[n - 1] = -t * df,
                Bracket::Interior { left, weight } => {
                    gradient[left] = -(1.0 - weight) * self.times[left] * df;
                    gradient[left + 1] = -weight * self.times[left + 1] * df;
                }
            },
        }

        Ok(gradient)
    }

    /// Gradient of the interpolated zero rate at `t` with respect to the
    /// node zero rates.
    ///
    /// Pure interpolation weights: for both methods they depend only on the
    /// node grid, not on the current node values. Spread generators use them
    /// to express a derived curve's values in terms of its base curve's
    /// parameters.
    pub fn zero_rate_gradient(&self, t: f64) -> CurveResult<DVector<f64>> {
        Self::check_time(t)?;
        let n = self.times.len();
        let mut gradient = DVector::zeros(n);
        match self.method {
            InterpolationMethod::LinearZero => match locate(&self.times, t) {
                Bracket::Below => gradient[0] = 1.0,
                Bracket::Above => gradient[n - 1] = 1.0,
                Bracket::Interior { left, weight } => {
                    gradient[left] = 1.0 - weight;
                    gradient[left + 1] = weight;
                }
            },
            InterpolationMethod::LogLinearDiscount => {
                if t == 0.0 {
                    gradient[0] = 1.0;
                } else {
                    match locate(&self.times, t) {
                        Bracket::Below => gradient[0] = 1.0,
                        Bracket::Above => gradient[n - 1] = 1.0,
                        Bracket::Interior { left, weight } => {
                            gradient[left] = (1.0 - weight) * self.times[left] / t;
                            gradient[left + 1] = weight * self.times[left + 1] / t;
                        }
                    }
                }
            }
        }
        Ok(gradient)
    }
}
