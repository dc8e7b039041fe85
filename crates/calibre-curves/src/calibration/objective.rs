//! Root-finding objective and Jacobian for one unit.
//!
//! A [`UnitProblem`] freezes the known-curve snapshot, the unit's finalized
//! specs, and the caller's pricer into a pair of pure functions of the
//! parameter vector: the par-spread objective (one scalar per instrument)
//! and the unit-local square Jacobian. Both rebuild trial curves through the
//! mapper on every call and never touch the engine's provider.

use nalgebra::{DMatrix, DVector};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::calibration::mapper::build_curves;
use crate::calibration::sensitivity::{chain_dependencies, LayoutEntry};
use crate::calibration::unit::FinalizedSpec;
use crate::error::{CurveError, CurveResult};
use crate::instruments::CalibrationInstrument;
use crate::multicurve::{CurveAssignments, CurveProvider};
use crate::pricing::InstrumentPricer;

/// The frozen valuation problem for one unit's solve.
pub(crate) struct UnitProblem<'a> {
    specs: &'a [FinalizedSpec],
    base: &'a CurveProvider,
    assignments: &'a CurveAssignments,
    pricer: &'a dyn InstrumentPricer,
    instruments: Vec<&'a CalibrationInstrument>,
}

impl<'a> UnitProblem<'a> {
    pub(crate) fn new(
        specs: &'a [FinalizedSpec],
        base: &'a CurveProvider,
        assignments: &'a CurveAssignments,
        pricer: &'a dyn InstrumentPricer,
    ) -> Self {
        let instruments = specs
            .iter()
            .flat_map(|spec| spec.instruments.iter())
            .collect();
        Self {
            specs,
            base,
            assignments,
            pricer,
            instruments,
        }
    }

    /// Total parameter count across the unit's specs.
    pub(crate) fn parameter_count(&self) -> usize {
        self.specs.iter().map(FinalizedSpec::parameter_count).sum()
    }

    /// Instrument count across the unit's specs.
    pub(crate) fn instrument_count(&self) -> usize {
        self.instruments.len()
    }

    /// Evaluates one value per instrument, preserving instrument order.
    fn per_instrument<T, F>(&self, f: F) -> CurveResult<Vec<T>>
    where
        T: Send,
        F: Fn(&CalibrationInstrument) -> CurveResult<T> + Sync,
    {
        #[cfg(feature = "parallel")]
        {
            self.instruments.par_iter().map(|inst| f(inst)).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            self.instruments.iter().map(|inst| f(inst)).collect()
        }
    }

    /// The par-spread objective: `F(x)`, one scalar per instrument.
    ///
    /// Pricer failures propagate unchanged; no value is substituted.
    pub(crate) fn objective(&self, x: &DVector<f64>) -> CurveResult<DVector<f64>> {
        let provider = build_curves(x, self.base, self.specs, self.assignments)?;
        let spreads = self.per_instrument(|inst| self.pricer.par_spread(inst, &provider))?;
        Ok(DVector::from_vec(spreads))
    }

    /// The unit-local Jacobian: `∂F_i/∂x_j` over the unit's own parameters.
    ///
    /// Gradients against a derived curve (e.g. a spread over another unit
    /// curve) are chain-ruled onto its base through the generators' value
    /// dependencies, so same-pass curve references yield an exact Jacobian.
    /// Sensitivities landing on curves outside the unit are not part of
    /// this matrix; they enter later through the block sensitivity assembly.
    pub(crate) fn jacobian(&self, x: &DVector<f64>) -> CurveResult<DMatrix<f64>> {
        let provider = build_curves(x, self.base, self.specs, self.assignments)?;
        let mut gradients =
            self.per_instrument(|inst| self.pricer.parameter_sensitivity(inst, &provider))?;

        let unit_layout: Vec<LayoutEntry> = self
            .specs
            .iter()
            .map(|spec| {
                Ok(LayoutEntry {
                    name: spec.name.clone(),
                    parameter_count: spec.parameter_count(),
                    dependencies: spec.template.value_dependencies(&provider)?,
                })
            })
            .collect::<CurveResult<_>>()?;

        let n = self.parameter_count();
        let mut jacobian = DMatrix::zeros(self.instruments.len(), n);

        for (row, per_curve) in gradients.iter_mut().enumerate() {
            chain_dependencies(per_curve, &unit_layout)?;
            let mut offset = 0;
            for spec in self.specs {
                let count = spec.parameter_count();
                if let Some(gradient) = per_curve.get(&spec.name) {
                    if gradient.len() != count {
                        return Err(CurveError::dimension_mismatch(
                            format!("sensitivity for curve '{}'", spec.name),
                            count,
                            gradient.len(),
                        ));
                    }
                    for k in 0..count {
                        jacobian[(row, offset + k)] = gradient[k];
                    }
                }
                offset += count;
            }
        }

        Ok(jacobian)
    }

    /// Concatenated initial guess across the unit's specs.
    pub(crate) fn initial_guess(&self) -> DVector<f64> {
        let guess: Vec<f64> = self
            .specs
            .iter()
            .flat_map(|spec| spec.initial_guess.iter().copied())
            .collect();
        DVector::from_vec(guess)
    }
}
