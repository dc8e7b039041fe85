//! Overnight index swap instrument.

use crate::multicurve::OvernightIndex;

/// A single-period overnight index swap.
///
/// Quoted as the fixed rate against the compounded overnight rate. For a
/// single period the discounting cancels out of the par quote, so the model
/// par rate is the simple rate implied by the overnight curve over
/// `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ois {
    index: OvernightIndex,
    start: f64,
    end: f64,
    rate: f64,
}

impl Ois {
    /// Creates a new OIS.
    #[must_use]
    pub fn new(index: OvernightIndex, start: f64, end: f64, rate: f64) -> Self {
        Self {
            index,
            start,
            end,
            rate,
        }
    }

    /// Returns the overnight index.
    #[must_use]
    pub fn index(&self) -> OvernightIndex {
        self.index
    }

    /// Returns the start time.
    #[must_use]
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Returns the maturity time.
    #[must_use]
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Returns the market rate quote.
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Returns the accrual year fraction.
    #[must_use]
    pub fn year_fraction(&self) -> f64 {
        self.end - self.start
    }

    /// Returns a description string for diagnostics.
    #[must_use]
    pub fn description(&self) -> String {
        format!(
            "OIS {} {:.4}% [{:.2}y, {:.2}y]",
            self.index,
            self.rate * 100.0,
            self.start,
            self.end
        )
    }
}
