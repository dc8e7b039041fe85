//! Currencies and rate indices keying the curve assignment tables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency of a cash flow or discount curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// US Dollar
    USD,
    /// Euro
    EUR,
    /// British Pound
    GBP,
    /// Japanese Yen
    JPY,
    /// Swiss Franc
    CHF,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::JPY => "JPY",
            Self::CHF => "CHF",
        };
        write!(f, "{code}")
    }
}

/// Term rate index projected by a forward curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IborIndex {
    /// 1-month Term SOFR
    TermSofr1M,
    /// 3-month Term SOFR
    TermSofr3M,
    /// 3-month EURIBOR
    Euribor3M,
    /// 6-month EURIBOR
    Euribor6M,
}

impl IborIndex {
    /// Returns the index currency.
    #[must_use]
    pub fn currency(&self) -> Currency {
        match self {
            Self::TermSofr1M | Self::TermSofr3M => Currency::USD,
            Self::Euribor3M | Self::Euribor6M => Currency::EUR,
        }
    }

    /// Returns the index tenor in years.
    #[must_use]
    pub fn tenor_years(&self) -> f64 {
        match self {
            Self::TermSofr1M => 1.0 / 12.0,
            Self::TermSofr3M | Self::Euribor3M => 0.25,
            Self::Euribor6M => 0.5,
        }
    }
}

impl fmt::Display for IborIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TermSofr1M => write!(f, "Term SOFR 1M"),
            Self::TermSofr3M => write!(f, "Term SOFR 3M"),
            Self::Euribor3M => write!(f, "EURIBOR 3M"),
            Self::Euribor6M => write!(f, "EURIBOR 6M"),
        }
    }
}

/// Overnight index underlying an OIS curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OvernightIndex {
    /// Secured Overnight Financing Rate (USD)
    Sofr,
    /// Euro Short-Term Rate
    Estr,
    /// Sterling Overnight Index Average
    Sonia,
}

impl OvernightIndex {
    /// Returns the index currency.
    #[must_use]
    pub fn currency(&self) -> Currency {
        match self {
            Self::Sofr => Currency::USD,
            Self::Estr => Currency::EUR,
            Self::Sonia => Currency::GBP,
        }
    }
}

impl fmt::Display for OvernightIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sofr => "SOFR",
            Self::Estr => "ESTR",
            Self::Sonia => "SONIA",
        };
        write!(f, "{name}")
    }
}
