//! Calibration units and curve specs.

use crate::error::{CurveError, CurveResult};
use crate::generators::{CurveGenerator, FinalizedGenerator};
use crate::instruments::CalibrationInstrument;

/// Specification of one curve to calibrate.
///
/// Pairs a name and generator template with the ordered instruments whose
/// quotes the curve must reproduce, and the initial parameter guess for the
/// solver. Immutable once its unit starts solving.
pub struct CurveSpec {
    name: String,
    generator: Box<dyn CurveGenerator>,
    instruments: Vec<CalibrationInstrument>,
    initial_guess: Vec<f64>,
}

impl CurveSpec {
    /// Creates a curve spec.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        generator: Box<dyn CurveGenerator>,
        instruments: Vec<CalibrationInstrument>,
        initial_guess: Vec<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            generator,
            instruments,
            initial_guess,
        }
    }

    /// Returns the curve name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the calibration instruments.
    #[must_use]
    pub fn instruments(&self) -> &[CalibrationInstrument] {
        &self.instruments
    }

    /// Returns the initial parameter guess.
    #[must_use]
    pub fn initial_guess(&self) -> &[f64] {
        &self.initial_guess
    }

    /// Finalizes the generator against this spec's own instrument list.
    pub(crate) fn finalize(self) -> CurveResult<FinalizedSpec> {
        let template = self.generator.finalized(&self.instruments)?;
        if self.initial_guess.len() != template.parameter_count() {
            return Err(CurveError::dimension_mismatch(
                format!("initial guess for curve '{}'", self.name),
                template.parameter_count(),
                self.initial_guess.len(),
            ));
        }
        Ok(FinalizedSpec {
            name: self.name,
            template,
            instruments: self.instruments,
            initial_guess: self.initial_guess,
        })
    }
}

impl std::fmt::Debug for CurveSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurveSpec")
            .field("name", &self.name)
            .field("instruments", &self.instruments.len())
            .field("initial_guess", &self.initial_guess.len())
            .finish()
    }
}

/// A group of curves calibrated jointly in one root-finding solve.
///
/// Units are processed in the caller-supplied sequence; a unit may read
/// curves from earlier units as fixed inputs but never from later ones.
#[derive(Debug)]
pub struct CalibrationUnit {
    specs: Vec<CurveSpec>,
}

impl CalibrationUnit {
    /// Creates a unit from its ordered curve specs.
    #[must_use]
    pub fn new(specs: Vec<CurveSpec>) -> Self {
        Self { specs }
    }

    /// Creates a unit with a single curve.
    #[must_use]
    pub fn single(spec: CurveSpec) -> Self {
        Self { specs: vec![spec] }
    }

    /// Returns the curve specs.
    #[must_use]
    pub fn specs(&self) -> &[CurveSpec] {
        &self.specs
    }

    /// Returns the total instrument count across the unit's specs.
    #[must_use]
    pub fn instrument_count(&self) -> usize {
        self.specs.iter().map(|spec| spec.instruments.len()).sum()
    }

    /// Label for diagnostics: the unit's curve names joined.
    #[must_use]
    pub fn label(&self) -> String {
        self.specs
            .iter()
            .map(CurveSpec::name)
            .collect::<Vec<_>>()
            .join("+")
    }

    pub(crate) fn into_specs(self) -> Vec<CurveSpec> {
        self.specs
    }
}

/// A spec whose generator has been finalized against its instruments.
pub(crate) struct FinalizedSpec {
    pub(crate) name: String,
    pub(crate) template: Box<dyn FinalizedGenerator>,
    pub(crate) instruments: Vec<CalibrationInstrument>,
    pub(crate) initial_guess: Vec<f64>,
}

impl std::fmt::Debug for FinalizedSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinalizedSpec")
            .field("name", &self.name)
            .field("instruments", &self.instruments.len())
            .field("initial_guess", &self.initial_guess.len())
            .finish()
    }
}

impl FinalizedSpec {
    pub(crate) fn parameter_count(&self) -> usize {
        self.template.parameter_count()
    }
}
