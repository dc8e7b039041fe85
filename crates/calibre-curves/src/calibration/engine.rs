//! Calibration orchestration.
//!
//! [`CalibrationEngine`] drives the whole pipeline as an explicit fold over
//! the ordered unit list, threading the accumulator (provider, instrument
//! history, bundle, parameter layout) through each unit: finalize the
//! unit's generators, check the square invariant, solve, merge the curves
//! into the running state, then assemble the unit's sensitivity blocks
//! against the full instrument history.
//!
//! Every failure is fatal for the whole calibration; there are no
//! partial-unit retries, and the error names the unit that failed.

use calibre_math::linear_algebra::{LinearSolver, SvdSolver};
use calibre_math::solvers::{solve_system, SolverConfig};

use crate::calibration::blocks::CurveBlockBundle;
use crate::calibration::mapper::build_curves;
use crate::calibration::objective::UnitProblem;
use crate::calibration::sensitivity::{update_bundle, LayoutEntry};
use crate::calibration::unit::{CalibrationUnit, FinalizedSpec};
use crate::error::{CurveError, CurveResult};
use crate::instruments::CalibrationInstrument;
use crate::multicurve::{CurveAssignments, CurveProvider};
use crate::pricing::InstrumentPricer;

/// Per-unit solver diagnostics.
#[derive(Debug, Clone)]
pub struct UnitDiagnostics {
    /// Unit label (joined curve names).
    pub label: String,
    /// Newton iterations used.
    pub iterations: u32,
    /// Final residual norm `‖F‖∞`.
    pub residual_norm: f64,
}

/// Result of a full calibration.
#[derive(Debug, Clone)]
pub struct CalibrationOutput {
    /// All curves: the a-priori known state plus every calibrated curve.
    pub provider: CurveProvider,
    /// Per-curve parameter blocks and quote sensitivities.
    pub bundle: CurveBlockBundle,
    /// Every calibration instrument in processing order; the bundle's
    /// matrix columns follow this order.
    pub instruments: Vec<CalibrationInstrument>,
    /// Per-unit solver diagnostics, in unit order.
    pub diagnostics: Vec<UnitDiagnostics>,
}

/// Multi-curve calibration engine.
///
/// Stateless between invocations: everything a calibration produces is in
/// its [`CalibrationOutput`].
///
/// # Example
///
/// ```rust,ignore
/// let engine = CalibrationEngine::new();
/// let output = engine.calibrate(units, known, &assignments, &ParSpreadPricer::new())?;
///
/// let ois = output.provider.curve("USD-OIS")?;
/// let risk = output.bundle.sensitivity("USD-3M").unwrap();
/// ```
pub struct CalibrationEngine {
    solver_config: SolverConfig,
    linear: Box<dyn LinearSolver>,
}

impl Default for CalibrationEngine {
    fn default() -> Self {
        Self {
            solver_config: SolverConfig::default(),
            linear: Box::new(SvdSolver::default()),
        }
    }
}

impl CalibrationEngine {
    /// Creates an engine with the default SVD decomposition and tolerances.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root-finder configuration.
    #[must_use]
    pub fn with_solver_config(mut self, config: SolverConfig) -> Self {
        self.solver_config = config;
        self
    }

    /// Sets the linear decomposition used for Newton steps and block
    /// inversion.
    #[must_use]
    pub fn with_linear_solver(mut self, linear: Box<dyn LinearSolver>) -> Self {
        self.linear = linear;
        self
    }

    /// Calibrates the units in order against the a-priori known state.
    ///
    /// # Arguments
    ///
    /// * `units` - Units in dependency order; unit *k* may reference curves
    ///   of units *1..k-1* and of `known`
    /// * `known` - Curves fixed outside the calibration
    /// * `assignments` - Currency and index assignment tables
    /// * `pricer` - The valuation/sensitivity visitor pair
    ///
    /// # Errors
    ///
    /// * [`CurveError::DimensionMismatch`] before any solve when a unit is
    ///   not square or a guess has the wrong length
    /// * [`CurveError::NonConvergence`] when a unit exhausts the iteration
    ///   budget
    /// * [`CurveError::SingularJacobian`] when a unit's Jacobian or direct
    ///   block is not invertible
    /// * Any pricer failure, propagated unchanged
    pub fn calibrate(
        &self,
        units: Vec<CalibrationUnit>,
        known: CurveProvider,
        assignments: &CurveAssignments,
        pricer: &dyn InstrumentPricer,
    ) -> CurveResult<CalibrationOutput> {
        let mut provider = known;
        let mut bundle = CurveBlockBundle::new();
        let mut history: Vec<CalibrationInstrument> = Vec::new();
        let mut layout: Vec<LayoutEntry> = Vec::new();
        let mut diagnostics = Vec::new();

        for unit in units {
            let label = unit.label();
            let specs = unit.into_specs();
            if specs.is_empty() {
                return Err(CurveError::invalid_value("calibration unit has no curves"));
            }

            // Finalize generators against their own instrument lists
            let mut finalized: Vec<FinalizedSpec> = Vec::with_capacity(specs.len());
            for spec in specs {
                if provider.contains(spec.name()) || bundle.contains(spec.name()) {
                    return Err(CurveError::duplicate_curve(spec.name()));
                }
                if !assignments.references(spec.name()) {
                    tracing::warn!(
                        curve = spec.name(),
                        "generated curve matches no assignment table entry"
                    );
                }
                finalized.push(spec.finalize()?);
            }

            // Square invariant, checked before any solve or inversion
            let instrument_count: usize =
                finalized.iter().map(|spec| spec.instruments.len()).sum();
            let parameter_count: usize =
                finalized.iter().map(FinalizedSpec::parameter_count).sum();
            if instrument_count != parameter_count {
                return Err(CurveError::dimension_mismatch(
                    format!("unit '{label}' instruments vs free parameters"),
                    parameter_count,
                    instrument_count,
                ));
            }

            let problem = UnitProblem::new(&finalized, &provider, assignments, pricer);
            let x0 = problem.initial_guess();

            tracing::debug!(unit = %label, parameters = parameter_count, "solving unit");
            let solution = solve_system(
                |x| problem.objective(x),
                |x| problem.jacobian(x),
                x0,
                self.linear.as_ref(),
                &self.solver_config,
            )
            .map_err(|err: CurveError| err.for_unit(&label))?;
            tracing::info!(
                unit = %label,
                iterations = solution.iterations,
                residual = solution.residual_norm,
                "unit calibrated"
            );

            // Merge the solved curves into the running state
            provider = build_curves(&solution.root, &provider, &finalized, assignments)?;

            // Extend the instrument history and parameter layout; the
            // dependency weights are pure node geometry, so capturing them
            // once against the merged provider stays valid for later units
            for spec in &finalized {
                history.extend(spec.instruments.iter().copied());
                layout.push(LayoutEntry {
                    name: spec.name.clone(),
                    parameter_count: spec.parameter_count(),
                    dependencies: spec.template.value_dependencies(&provider)?,
                });
            }

            // Record this unit's sensitivities against the full history
            update_bundle(
                &history,
                &provider,
                pricer,
                &layout,
                finalized.len(),
                self.linear.as_ref(),
                &mut bundle,
            )
            .map_err(|err| err.for_unit(&label))?;

            diagnostics.push(UnitDiagnostics {
                label,
                iterations: solution.iterations,
                residual_norm: solution.residual_norm,
            });
        }

        Ok(CalibrationOutput {
            provider,
            bundle,
            instruments: history,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::unit::CurveSpec;
    use crate::generators::{FixedNodeGenerator, InterpolatedNodeGenerator};
    use crate::instruments::Deposit;
    use crate::interpolation::InterpolationMethod;
    use crate::multicurve::Currency;
    use crate::pricing::{CurveGradients, ParSpreadPricer};
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    fn deposit(end: f64, rate: f64) -> CalibrationInstrument {
        CalibrationInstrument::Deposit(Deposit::new(Currency::USD, 0.0, end, rate))
    }

    fn usd_assignments() -> CurveAssignments {
        CurveAssignments::new().assign_currency(Currency::USD, "USD-OIS")
    }

    fn deposit_unit(rates: &[(f64, f64)]) -> CalibrationUnit {
        CalibrationUnit::single(CurveSpec::new(
            "USD-OIS",
            Box::new(InterpolatedNodeGenerator::new(
                InterpolationMethod::LinearZero,
            )),
            rates.iter().map(|&(end, rate)| deposit(end, rate)).collect(),
            vec![0.03; rates.len()],
        ))
    }

    #[test]
    fn test_three_deposit_unit_reprices_quotes() {
        let quotes = [(0.5, 0.030), (1.0, 0.032), (2.0, 0.035)];
        let engine = CalibrationEngine::new();
        let pricer = ParSpreadPricer::new();

        let output = engine
            .calibrate(
                vec![deposit_unit(&quotes)],
                CurveProvider::new(),
                &usd_assignments(),
                &pricer,
            )
            .unwrap();

        // Round trip: every instrument reprices to zero par spread
        for instrument in &output.instruments {
            let spread = pricer.par_spread(instrument, &output.provider).unwrap();
            assert_relative_eq!(spread, 0.0, epsilon = 1e-10);
        }

        assert_eq!(output.diagnostics.len(), 1);
        assert!(output.diagnostics[0].iterations <= 10);
        assert_eq!(
            output.bundle.sensitivity("USD-OIS").unwrap().shape(),
            (3, 3)
        );
    }

    #[test]
    fn test_non_square_unit_fails_fast() {
        // Two fixed nodes against three instruments: rejected before any
        // matrix work
        let unit = CalibrationUnit::single(CurveSpec::new(
            "USD-OIS",
            Box::new(FixedNodeGenerator::new(
                vec![0.5, 1.0],
                InterpolationMethod::LinearZero,
            )),
            vec![
                deposit(0.5, 0.03),
                deposit(1.0, 0.032),
                deposit(2.0, 0.035),
            ],
            vec![0.03, 0.03],
        ));

        let engine = CalibrationEngine::new();
        let err = engine
            .calibrate(
                vec![unit],
                CurveProvider::new(),
                &usd_assignments(),
                &ParSpreadPricer::new(),
            )
            .unwrap_err();

        assert!(matches!(err, CurveError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_duplicate_curve_across_units_rejected() {
        let engine = CalibrationEngine::new();
        let err = engine
            .calibrate(
                vec![
                    deposit_unit(&[(0.5, 0.03)]),
                    deposit_unit(&[(1.0, 0.032)]),
                ],
                CurveProvider::new(),
                &usd_assignments(),
                &ParSpreadPricer::new(),
            )
            .unwrap_err();

        assert!(matches!(err, CurveError::DuplicateCurve { .. }));
    }

    /// Pricer whose par spread never depends on the parameters.
    struct ConstantPricer;
    impl InstrumentPricer for ConstantPricer {
        fn par_spread(
            &self,
            _instrument: &CalibrationInstrument,
            _provider: &CurveProvider,
        ) -> CurveResult<f64> {
            Ok(1.0)
        }

        fn parameter_sensitivity(
            &self,
            _instrument: &CalibrationInstrument,
            _provider: &CurveProvider,
        ) -> CurveResult<CurveGradients> {
            Ok(CurveGradients::new())
        }
    }

    #[test]
    fn test_flat_jacobian_is_singular() {
        let engine = CalibrationEngine::new();
        let err = engine
            .calibrate(
                vec![deposit_unit(&[(1.0, 0.03)])],
                CurveProvider::new(),
                &usd_assignments(),
                &ConstantPricer,
            )
            .unwrap_err();

        match err {
            CurveError::SingularJacobian { unit } => assert_eq!(unit, "USD-OIS"),
            other => panic!("expected SingularJacobian, got {other:?}"),
        }
    }

    /// Pricer with a root the solver cannot reach: spread = z² + 1.
    struct NoRootPricer;
    impl InstrumentPricer for NoRootPricer {
        fn par_spread(
            &self,
            _instrument: &CalibrationInstrument,
            provider: &CurveProvider,
        ) -> CurveResult<f64> {
            let z = provider.curve("USD-OIS")?.values()[0];
            Ok(z * z + 1.0)
        }

        fn parameter_sensitivity(
            &self,
            _instrument: &CalibrationInstrument,
            provider: &CurveProvider,
        ) -> CurveResult<CurveGradients> {
            let z = provider.curve("USD-OIS")?.values()[0];
            let mut gradients = CurveGradients::new();
            gradients.insert("USD-OIS".to_string(), DVector::from_vec(vec![2.0 * z]));
            Ok(gradients)
        }
    }

    #[test]
    fn test_non_convergence_carries_unit_and_residual() {
        let engine = CalibrationEngine::new()
            .with_solver_config(SolverConfig::default().with_max_iterations(8));
        let err = engine
            .calibrate(
                vec![deposit_unit(&[(1.0, 0.03)])],
                CurveProvider::new(),
                &usd_assignments(),
                &NoRootPricer,
            )
            .unwrap_err();

        match err {
            CurveError::NonConvergence {
                unit,
                iterations,
                residual,
                last_iterate,
            } => {
                assert_eq!(unit, "USD-OIS");
                assert_eq!(iterations, 8);
                assert!(residual >= 1.0);
                assert_eq!(last_iterate.len(), 1);
            }
            other => panic!("expected NonConvergence, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_unit_rejected() {
        let engine = CalibrationEngine::new();
        let err = engine
            .calibrate(
                vec![CalibrationUnit::new(vec![])],
                CurveProvider::new(),
                &usd_assignments(),
                &ParSpreadPricer::new(),
            )
            .unwrap_err();
        assert!(matches!(err, CurveError::InvalidValue { .. }));
    }

    #[test]
    fn test_visitor_failure_aborts_unit() {
        struct RejectingPricer;
        impl InstrumentPricer for RejectingPricer {
            fn par_spread(
                &self,
                instrument: &CalibrationInstrument,
                _provider: &CurveProvider,
            ) -> CurveResult<f64> {
                Err(CurveError::visitor(
                    instrument.description(),
                    "no market convention",
                ))
            }

            fn parameter_sensitivity(
                &self,
                instrument: &CalibrationInstrument,
                _provider: &CurveProvider,
            ) -> CurveResult<CurveGradients> {
                Err(CurveError::visitor(
                    instrument.description(),
                    "no market convention",
                ))
            }
        }

        let engine = CalibrationEngine::new();
        let err = engine
            .calibrate(
                vec![deposit_unit(&[(1.0, 0.03)])],
                CurveProvider::new(),
                &usd_assignments(),
                &RejectingPricer,
            )
            .unwrap_err();

        assert!(matches!(err, CurveError::Visitor { .. }));
    }
}
