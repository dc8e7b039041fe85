//! Curve types.

mod zero;

pub use zero::ZeroCurve;
