//! Repricing validation for calibrated curve sets.
//!
//! A calibration that cannot reprice its own inputs within tolerance is
//! wrong; this module re-evaluates every calibration instrument against the
//! final provider and reports the residual par spreads.

use crate::error::CurveResult;
use crate::instruments::{CalibrationInstrument, InstrumentKind};
use crate::multicurve::CurveProvider;
use crate::pricing::InstrumentPricer;

/// Default repricing tolerances by instrument kind, in par-rate terms.
pub mod tolerances {
    use super::InstrumentKind;

    /// Deposit tolerance - near machine precision.
    pub const DEPOSIT: f64 = 1e-9;

    /// FRA tolerance - near machine precision.
    pub const FRA: f64 = 1e-9;

    /// Swap tolerance - multi-period instruments accumulate small errors.
    pub const SWAP: f64 = 1e-8;

    /// OIS tolerance - near machine precision.
    pub const OIS: f64 = 1e-9;

    /// Returns the tolerance for an instrument kind.
    #[must_use]
    pub fn for_kind(kind: InstrumentKind) -> f64 {
        match kind {
            InstrumentKind::Deposit => DEPOSIT,
            InstrumentKind::Fra => FRA,
            InstrumentKind::Swap => SWAP,
            InstrumentKind::Ois => OIS,
        }
    }
}

/// Result of repricing a single instrument.
#[derive(Debug, Clone)]
pub struct RepricingCheck {
    /// Instrument description.
    pub instrument: String,
    /// Instrument kind.
    pub kind: InstrumentKind,
    /// Residual par spread against the final curves.
    pub par_spread: f64,
    /// Tolerance the residual was checked against.
    pub tolerance: f64,
}

impl RepricingCheck {
    /// Returns true when the residual is within tolerance.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.par_spread.abs() <= self.tolerance
    }
}

/// Repricing results for a whole calibration.
#[derive(Debug, Clone, Default)]
pub struct RepricingReport {
    checks: Vec<RepricingCheck>,
}

impl RepricingReport {
    /// Returns all checks in instrument order.
    #[must_use]
    pub fn checks(&self) -> &[RepricingCheck] {
        &self.checks
    }

    /// Returns true when every instrument repriced within tolerance.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.checks.iter().all(RepricingCheck::passed)
    }

    /// Returns the failed checks.
    #[must_use]
    pub fn failures(&self) -> Vec<&RepricingCheck> {
        self.checks.iter().filter(|check| !check.passed()).collect()
    }

    /// Returns the largest absolute residual.
    #[must_use]
    pub fn max_abs_spread(&self) -> f64 {
        self.checks
            .iter()
            .map(|check| check.par_spread.abs())
            .fold(0.0, f64::max)
    }
}

/// Reprices `instruments` against `provider` using per-kind default
/// tolerances.
pub fn reprice(
    instruments: &[CalibrationInstrument],
    provider: &CurveProvider,
    pricer: &dyn InstrumentPricer,
) -> CurveResult<RepricingReport> {
    let mut checks = Vec::with_capacity(instruments.len());
    for instrument in instruments {
        let par_spread = pricer.par_spread(instrument, provider)?;
        checks.push(RepricingCheck {
            instrument: instrument.description(),
            kind: instrument.kind(),
            par_spread,
            tolerance: tolerances::for_kind(instrument.kind()),
        });
    }
    Ok(RepricingReport { checks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::ZeroCurve;
    use crate::instruments::Deposit;
    use crate::interpolation::InterpolationMethod;
    use crate::multicurve::{Currency, CurveAssignments};
    use crate::pricing::ParSpreadPricer;

    #[test]
    fn test_report_flags_mispriced_instrument() {
        let assignments = CurveAssignments::new().assign_currency(Currency::USD, "USD-OIS");
        let mut provider = CurveProvider::new();
        provider
            .insert(
                "USD-OIS",
                ZeroCurve::new(vec![1.0], vec![0.03], InterpolationMethod::LinearZero).unwrap(),
                &assignments,
            )
            .unwrap();

        // Quote the exact implied rate, and a quote 10bp away
        let implied = (0.03f64.exp() - 1.0) / 1.0;
        let instruments = vec![
            CalibrationInstrument::Deposit(Deposit::new(Currency::USD, 0.0, 1.0, implied)),
            CalibrationInstrument::Deposit(Deposit::new(Currency::USD, 0.0, 1.0, implied + 0.001)),
        ];

        let report = reprice(&instruments, &provider, &ParSpreadPricer::new()).unwrap();
        assert!(!report.is_valid());
        assert_eq!(report.failures().len(), 1);
        assert!(report.max_abs_spread() > 9e-4);
        assert!(report.checks()[0].passed());
    }

    #[test]
    fn test_tolerances_by_kind() {
        assert!(tolerances::for_kind(InstrumentKind::Swap) > tolerances::for_kind(InstrumentKind::Deposit));
    }
}
