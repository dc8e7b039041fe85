//! # Calibre Curves
//!
//! Multi-curve calibration for the Calibre fixed income library: a set of
//! interdependent discount and forward curves is solved so that every market
//! instrument prices back to its quote (zero par spread), together with the
//! full sensitivity of every curve parameter to every calibration quote.
//!
//! This crate provides:
//!
//! - **Curves**: Interpolated zero curves with analytic parameter gradients
//! - **Generators**: Parametric curve templates finalized against their own
//!   instrument lists
//! - **Multi-Curve**: The curve provider with currency and index assignment
//!   tables
//! - **Instruments**: Deposits, FRAs, swaps, and OIS as calibration
//!   instruments
//! - **Pricing**: The pluggable valuation/sensitivity visitor pair, with a
//!   built-in par-spread pricer
//! - **Calibration**: The unit-by-unit engine, block sensitivity assembly,
//!   and repricing validation
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use calibre_curves::prelude::*;
//!
//! // One unit: a SOFR discount curve from three deposits
//! let unit = CalibrationUnit::single(CurveSpec::new(
//!     "USD-OIS",
//!     Box::new(InterpolatedNodeGenerator::new(InterpolationMethod::LinearZero)),
//!     vec![
//!         Deposit::new(Currency::USD, 0.0, 0.5, 0.0430).into(),
//!         Deposit::new(Currency::USD, 0.0, 1.0, 0.0415).into(),
//!         Deposit::new(Currency::USD, 0.0, 2.0, 0.0390).into(),
//!     ],
//!     vec![0.04; 3],
//! ));
//!
//! let assignments = CurveAssignments::new()
//!     .assign_currency(Currency::USD, "USD-OIS");
//!
//! let output = CalibrationEngine::new().calibrate(
//!     vec![unit],
//!     CurveProvider::new(),
//!     &assignments,
//!     &ParSpreadPricer::new(),
//! )?;
//!
//! let curve = output.provider.curve("USD-OIS")?;
//! let risk = output.bundle.sensitivity("USD-OIS").unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]

pub mod calibration;
pub mod curves;
pub mod error;
pub mod generators;
pub mod instruments;
pub mod interpolation;
pub mod multicurve;
pub mod pricing;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::calibration::{
        reprice, CalibrationEngine, CalibrationOutput, CalibrationUnit, CurveBlock,
        CurveBlockBundle, CurveSpec, RepricingReport, UnitDiagnostics,
    };
    pub use crate::curves::ZeroCurve;
    pub use crate::error::{CurveError, CurveResult};
    pub use crate::generators::{
        CurveGenerator, FinalizedGenerator, FixedNodeGenerator, InterpolatedNodeGenerator,
        SpreadNodeGenerator,
    };
    pub use crate::instruments::{
        CalibrationInstrument, Deposit, Fra, Frequency, InstrumentKind, IrSwap, Ois,
    };
    pub use crate::interpolation::InterpolationMethod;
    pub use crate::multicurve::{
        Currency, CurveAssignments, CurveProvider, IborIndex, OvernightIndex,
    };
    pub use crate::pricing::{CurveGradients, InstrumentPricer, ParSpreadPricer};
}

pub use calibration::{CalibrationEngine, CalibrationOutput, CurveBlockBundle};
pub use error::{CurveError, CurveResult};
pub use multicurve::CurveProvider;
