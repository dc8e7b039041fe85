//! Fixed-for-floating interest rate swap instrument.
//!
//! The primary instrument for the medium-to-long end of projection curves.
//! The floating leg projects forwards off the index curve while both legs
//! discount on the currency's discount curve, which is what couples a
//! projection unit to a previously calibrated discount unit.

use crate::multicurve::{Currency, IborIndex};

/// Payment frequency of the fixed leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    /// Annual payments
    Annual,
    /// Semi-annual payments
    SemiAnnual,
    /// Quarterly payments
    Quarterly,
}

impl Frequency {
    /// Returns the period length in years.
    #[must_use]
    pub fn period_years(&self) -> f64 {
        match self {
            Self::Annual => 1.0,
            Self::SemiAnnual => 0.5,
            Self::Quarterly => 0.25,
        }
    }
}

/// A fixed-for-floating interest rate swap.
///
/// # Pricing
///
/// ```text
/// Float PV = Σ_j (DF_p(s_j)/DF_p(e_j) − 1) · DF_d(e_j)
/// Annuity  = Σ_k τ_k · DF_d(p_k)
/// par      = Float PV / Annuity
/// ```
///
/// where `DF_p` is the projection curve of the floating index and `DF_d`
/// the discount curve of the swap currency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrSwap {
    currency: Currency,
    index: IborIndex,
    start: f64,
    maturity: f64,
    fixed_rate: f64,
    fixed_frequency: Frequency,
}

impl IrSwap {
    /// Creates a new swap.
    ///
    /// # Arguments
    ///
    /// * `currency` - Currency whose discount curve prices both legs
    /// * `index` - Floating leg rate index
    /// * `start` - Effective time (year fraction)
    /// * `maturity` - Termination time (year fraction)
    /// * `fixed_rate` - Fixed leg rate quote
    /// * `fixed_frequency` - Fixed leg payment frequency
    #[must_use]
    pub fn new(
        currency: Currency,
        index: IborIndex,
        start: f64,
        maturity: f64,
        fixed_rate: f64,
        fixed_frequency: Frequency,
    ) -> Self {
        Self {
            currency,
            index,
            start,
            maturity,
            fixed_rate,
            fixed_frequency,
        }
    }

    /// Returns the swap currency.
    #[must_use]
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns the floating leg index.
    #[must_use]
    pub fn index(&self) -> IborIndex {
        self.index
    }

    /// Returns the effective time.
    #[must_use]
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Returns the termination time.
    #[must_use]
    pub fn maturity(&self) -> f64 {
        self.maturity
    }

    /// Returns the fixed rate quote.
    #[must_use]
    pub fn fixed_rate(&self) -> f64 {
        self.fixed_rate
    }

    /// Returns the fixed leg frequency.
    #[must_use]
    pub fn fixed_frequency(&self) -> Frequency {
        self.fixed_frequency
    }

    /// Fixed leg payment times.
    #[must_use]
    pub fn fixed_schedule(&self) -> Vec<f64> {
        payment_schedule(self.start, self.maturity, self.fixed_frequency.period_years())
    }

    /// Floating leg period end times, one per index tenor.
    #[must_use]
    pub fn float_schedule(&self) -> Vec<f64> {
        payment_schedule(self.start, self.maturity, self.index.tenor_years())
    }

    /// Returns a description string for diagnostics.
    #[must_use]
    pub fn description(&self) -> String {
        format!(
            "Swap {} vs {} {:.4}% [{:.2}y, {:.2}y]",
            self.currency,
            self.index,
            self.fixed_rate * 100.0,
            self.start,
            self.maturity
        )
    }
}

/// Generates payment times from `start` (exclusive) to `end` (inclusive).
///
/// Steps by `period`; a final short stub is rolled into the last payment.
/// Returns an empty schedule when the period is degenerate.
fn payment_schedule(start: f64, end: f64, period: f64) -> Vec<f64> {
    if period <= 0.0 || end - start < period * 0.5 {
        return Vec::new();
    }

    let count = ((end - start) / period).round().max(1.0) as usize;
    let mut times: Vec<f64> = (1..count).map(|i| start + i as f64 * period).collect();
    times.push(end);
    times
}
