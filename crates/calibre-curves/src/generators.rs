//! Curve generators.
//!
//! A [`CurveGenerator`] is the parametric template named by a curve spec.
//! Some families cannot size themselves until they see their own instrument
//! list (node placement follows instrument maturities), so generation is a
//! two-step affair: the template is [`finalized`](CurveGenerator::finalized)
//! against the spec's instruments into a [`FinalizedGenerator`] with a known
//! parameter count, and the finalized form materializes concrete curves
//! from parameter sub-vectors during the solve.
//!
//! `materialize` receives the running provider state, so a generator may
//! reference curves written earlier in the same mapping pass (see
//! [`SpreadNodeGenerator`]).

use nalgebra::DMatrix;

use crate::curves::ZeroCurve;
use crate::error::{CurveError, CurveResult};
use crate::instruments::CalibrationInstrument;
use crate::interpolation::InterpolationMethod;
use crate::multicurve::CurveProvider;

/// A parametric curve template, not yet sized.
pub trait CurveGenerator: Send + Sync {
    /// Produces the concrete generator for the given instrument list.
    fn finalized(
        &self,
        instruments: &[CalibrationInstrument],
    ) -> CurveResult<Box<dyn FinalizedGenerator>>;
}

/// A sized generator that turns parameter sub-vectors into curves.
pub trait FinalizedGenerator: Send + Sync + std::fmt::Debug {
    /// Number of free parameters the generated curve consumes.
    fn parameter_count(&self) -> usize;

    /// Materializes a concrete curve from `params`.
    ///
    /// `state` is the provider as built so far in the current mapping pass;
    /// generators may read curves already written to it.
    fn materialize(&self, params: &[f64], state: &CurveProvider) -> CurveResult<ZeroCurve>;

    /// Parameter linkage of the materialized curve to other curves.
    ///
    /// Returns, per referenced curve, the Jacobian of the materialized node
    /// values with respect to that curve's node values. Empty for
    /// self-contained families. The matrices are interpolation weights and
    /// depend only on node geometry, so they stay valid as node values move
    /// during and after the solve.
    fn value_dependencies(
        &self,
        _state: &CurveProvider,
    ) -> CurveResult<Vec<(String, DMatrix<f64>)>> {
        Ok(Vec::new())
    }
}

/// Extracts strictly increasing node times from instrument maturities.
fn node_times(instruments: &[CalibrationInstrument]) -> CurveResult<Vec<f64>> {
    if instruments.is_empty() {
        return Err(CurveError::insufficient_points(1, 0));
    }

    let times: Vec<f64> = instruments
        .iter()
        .map(CalibrationInstrument::maturity)
        .collect();
    if times[0] <= 0.0 {
        return Err(CurveError::invalid_instrument(format!(
            "instrument maturity must be positive, got {}",
            times[0]
        )));
    }
    for i in 1..times.len() {
        if times[i] <= times[i - 1] {
            return Err(CurveError::non_monotonic_times(i, times[i - 1], times[i]));
        }
    }
    Ok(times)
}

/// Interpolated curve with one node per instrument maturity.
///
/// The standard bootstrap family: finalization places a node at each
/// instrument's maturity, so the curve always has exactly as many free
/// parameters as the spec has instruments.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpolatedNodeGenerator {
    method: InterpolationMethod,
}

impl InterpolatedNodeGenerator {
    /// Creates a generator with the given interpolation method.
    #[must_use]
    pub fn new(method: InterpolationMethod) -> Self {
        Self { method }
    }
}

impl CurveGenerator for InterpolatedNodeGenerator {
    fn finalized(
        &self,
        instruments: &[CalibrationInstrument],
    ) -> CurveResult<Box<dyn FinalizedGenerator>> {
        Ok(Box::new(NodeTemplate {
            times: node_times(instruments)?,
            method: self.method,
        }))
    }
}

/// Interpolated curve on a caller-fixed node grid.
#[derive(Debug, Clone)]
pub struct FixedNodeGenerator {
    times: Vec<f64>,
    method: InterpolationMethod,
}

impl FixedNodeGenerator {
    /// Creates a generator with explicit node times.
    #[must_use]
    pub fn new(times: Vec<f64>, method: InterpolationMethod) -> Self {
        Self { times, method }
    }
}

impl CurveGenerator for FixedNodeGenerator {
    fn finalized(
        &self,
        _instruments: &[CalibrationInstrument],
    ) -> CurveResult<Box<dyn FinalizedGenerator>> {
        if self.times.is_empty() {
            return Err(CurveError::insufficient_points(1, 0));
        }
        Ok(Box::new(NodeTemplate {
            times: self.times.clone(),
            method: self.method,
        }))
    }
}

#[derive(Debug)]
struct NodeTemplate {
    times: Vec<f64>,
    method: InterpolationMethod,
}

impl FinalizedGenerator for NodeTemplate {
    fn parameter_count(&self) -> usize {
        self.times.len()
    }

    fn materialize(&self, params: &[f64], _state: &CurveProvider) -> CurveResult<ZeroCurve> {
        if params.len() != self.times.len() {
            return Err(CurveError::dimension_mismatch(
                "curve parameters",
                self.times.len(),
                params.len(),
            ));
        }
        ZeroCurve::new(self.times.clone(), params.to_vec(), self.method)
    }
}

/// Zero-rate spread over a base curve already present in the provider.
///
/// Each parameter is an additive zero-rate spread at a node placed at the
/// corresponding instrument maturity. The base curve is read from the
/// running provider state at materialization time, so the base may come
/// from an earlier unit or from earlier in the same mapping pass. Because
/// the materialized values are base rate plus spread, the generator reports
/// a value dependency on the base: the base's interpolation weights at the
/// spread nodes, which the calibration uses to chain instrument
/// sensitivities through to the base curve's parameters.
#[derive(Debug, Clone)]
pub struct SpreadNodeGenerator {
    base: String,
    method: InterpolationMethod,
}

impl SpreadNodeGenerator {
    /// Creates a generator spreading over the named base curve.
    #[must_use]
    pub fn new(base: impl Into<String>, method: InterpolationMethod) -> Self {
        Self {
            base: base.into(),
            method,
        }
    }
}

impl CurveGenerator for SpreadNodeGenerator {
    fn finalized(
        &self,
        instruments: &[CalibrationInstrument],
    ) -> CurveResult<Box<dyn FinalizedGenerator>> {
        Ok(Box::new(SpreadTemplate {
            base: self.base.clone(),
            times: node_times(instruments)?,
            method: self.method,
        }))
    }
}

#[derive(Debug)]
struct SpreadTemplate {
    base: String,
    times: Vec<f64>,
    method: InterpolationMethod,
}

impl FinalizedGenerator for SpreadTemplate {
    fn parameter_count(&self) -> usize {
        self.times.len()
    }

    fn materialize(&self, params: &[f64], state: &CurveProvider) -> CurveResult<ZeroCurve> {
        if params.len() != self.times.len() {
            return Err(CurveError::dimension_mismatch(
                "curve parameters",
                self.times.len(),
                params.len(),
            ));
        }
        let base = state.curve(&self.base)?;
        let values = self
            .times
            .iter()
            .zip(params)
            .map(|(&t, &spread)| Ok(base.zero_rate(t)? + spread))
            .collect::<CurveResult<Vec<f64>>>()?;
        ZeroCurve::new(self.times.clone(), values, self.method)
    }

    fn value_dependencies(
        &self,
        state: &CurveProvider,
    ) -> CurveResult<Vec<(String, DMatrix<f64>)>> {
        let base = state.curve(&self.base)?;
        let mut weights = DMatrix::zeros(self.times.len(), base.node_count());
        for (i, &t) in self.times.iter().enumerate() {
            weights
                .row_mut(i)
                .copy_from(&base.zero_rate_gradient(t)?.transpose());
        }
        Ok(vec![(self.base.clone(), weights)])
    }
}
