//! Calibration instruments.
//!
//! Each instrument carries a market par-rate quote; the engine drives every
//! instrument's par spread (model-implied rate minus quote) to zero. Rather
//! than an open visitor hierarchy, the instrument universe is a closed sum
//! type, [`CalibrationInstrument`], dispatched by a single pattern match in
//! the pricer.
//!
//! All schedules are expressed as year fractions from the valuation date;
//! calendar and day-count conventions are resolved by the caller before
//! instruments are constructed.

mod deposit;
mod fra;
mod ois;
mod swap;

pub use deposit::Deposit;
pub use fra::Fra;
pub use ois::Ois;
pub use swap::{Frequency, IrSwap};

/// Instrument kind for categorization and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InstrumentKind {
    /// Money market deposit
    Deposit,
    /// Forward Rate Agreement
    Fra,
    /// Fixed-for-floating interest rate swap
    Swap,
    /// Overnight index swap
    Ois,
}

impl std::fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deposit => write!(f, "Deposit"),
            Self::Fra => write!(f, "FRA"),
            Self::Swap => write!(f, "Swap"),
            Self::Ois => write!(f, "OIS"),
        }
    }
}

/// A market instrument usable for curve calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationInstrument {
    /// Money market deposit
    Deposit(Deposit),
    /// Forward Rate Agreement
    Fra(Fra),
    /// Fixed-for-floating interest rate swap
    Swap(IrSwap),
    /// Overnight index swap
    Ois(Ois),
}

impl CalibrationInstrument {
    /// Returns the market par-rate quote.
    #[must_use]
    pub fn quote(&self) -> f64 {
        match self {
            Self::Deposit(deposit) => deposit.rate(),
            Self::Fra(fra) => fra.rate(),
            Self::Swap(swap) => swap.fixed_rate(),
            Self::Ois(ois) => ois.rate(),
        }
    }

    /// Returns the maturity as a year fraction from the valuation date.
    #[must_use]
    pub fn maturity(&self) -> f64 {
        match self {
            Self::Deposit(deposit) => deposit.end(),
            Self::Fra(fra) => fra.end(),
            Self::Swap(swap) => swap.maturity(),
            Self::Ois(ois) => ois.end(),
        }
    }

    /// Returns the instrument kind.
    #[must_use]
    pub fn kind(&self) -> InstrumentKind {
        match self {
            Self::Deposit(_) => InstrumentKind::Deposit,
            Self::Fra(_) => InstrumentKind::Fra,
            Self::Swap(_) => InstrumentKind::Swap,
            Self::Ois(_) => InstrumentKind::Ois,
        }
    }

    /// Returns a description string for diagnostics.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Deposit(deposit) => deposit.description(),
            Self::Fra(fra) => fra.description(),
            Self::Swap(swap) => swap.description(),
            Self::Ois(ois) => ois.description(),
        }
    }
}

impl From<Deposit> for CalibrationInstrument {
    fn from(deposit: Deposit) -> Self {
        Self::Deposit(deposit)
    }
}

impl From<Fra> for CalibrationInstrument {
    fn from(fra: Fra) -> Self {
        Self::Fra(fra)
    }
}

impl From<IrSwap> for CalibrationInstrument {
    fn from(swap: IrSwap) -> Self {
        Self::Swap(swap)
    }
}

impl From<Ois> for CalibrationInstrument {
    fn from(ois: Ois) -> Self {
        Self::Ois(ois)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multicurve::{Currency, IborIndex, OvernightIndex};

    #[test]
    fn test_quote_and_maturity_dispatch() {
        let deposit: CalibrationInstrument = Deposit::new(Currency::USD, 0.0, 0.5, 0.04).into();
        assert!((deposit.quote() - 0.04).abs() < 1e-15);
        assert!((deposit.maturity() - 0.5).abs() < 1e-15);
        assert_eq!(deposit.kind(), InstrumentKind::Deposit);

        let fra: CalibrationInstrument = Fra::new(IborIndex::TermSofr3M, 0.25, 0.5, 0.042).into();
        assert_eq!(fra.kind(), InstrumentKind::Fra);

        let ois: CalibrationInstrument = Ois::new(OvernightIndex::Sofr, 0.0, 1.0, 0.03).into();
        assert_eq!(ois.kind(), InstrumentKind::Ois);
    }

    #[test]
    fn test_description_contains_kind() {
        let swap: CalibrationInstrument = IrSwap::new(
            Currency::USD,
            IborIndex::TermSofr3M,
            0.0,
            5.0,
            0.035,
            Frequency::SemiAnnual,
        )
        .into();
        assert!(swap.description().contains("Swap"));
    }
}
