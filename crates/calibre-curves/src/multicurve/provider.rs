//! The curve provider: named curves plus assignment tables.

use std::collections::HashMap;
use std::sync::Arc;

use crate::curves::ZeroCurve;
use crate::error::{CurveError, CurveResult};

use super::rate_index::{Currency, IborIndex, OvernightIndex};

/// Declares which curve serves each currency and rate index.
///
/// Assignments are by curve name; several table entries may name the same
/// curve (e.g. one OIS curve both discounting USD and projecting SOFR).
///
/// # Example
///
/// ```rust
/// use calibre_curves::multicurve::{Currency, CurveAssignments, OvernightIndex};
///
/// let assignments = CurveAssignments::new()
///     .assign_currency(Currency::USD, "USD-OIS")
///     .assign_overnight(OvernightIndex::Sofr, "USD-OIS");
/// assert!(assignments.references("USD-OIS"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CurveAssignments {
    currencies: HashMap<Currency, String>,
    ibor: HashMap<IborIndex, String>,
    overnight: HashMap<OvernightIndex, String>,
}

impl CurveAssignments {
    /// Creates an empty assignment set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a discount curve to a currency.
    #[must_use]
    pub fn assign_currency(mut self, currency: Currency, curve: impl Into<String>) -> Self {
        self.currencies.insert(currency, curve.into());
        self
    }

    /// Assigns a projection curve to a term rate index.
    #[must_use]
    pub fn assign_ibor(mut self, index: IborIndex, curve: impl Into<String>) -> Self {
        self.ibor.insert(index, curve.into());
        self
    }

    /// Assigns a curve to an overnight index.
    #[must_use]
    pub fn assign_overnight(mut self, index: OvernightIndex, curve: impl Into<String>) -> Self {
        self.overnight.insert(index, curve.into());
        self
    }

    /// Returns the curve name discounting `currency`, if assigned.
    #[must_use]
    pub fn currency_curve(&self, currency: Currency) -> Option<&str> {
        self.currencies.get(&currency).map(String::as_str)
    }

    /// Returns the curve name projecting `index`, if assigned.
    #[must_use]
    pub fn ibor_curve(&self, index: IborIndex) -> Option<&str> {
        self.ibor.get(&index).map(String::as_str)
    }

    /// Returns the curve name for `index`, if assigned.
    #[must_use]
    pub fn overnight_curve(&self, index: OvernightIndex) -> Option<&str> {
        self.overnight.get(&index).map(String::as_str)
    }

    /// Returns true when any table entry names `curve`.
    #[must_use]
    pub fn references(&self, curve: &str) -> bool {
        self.currencies.values().any(|name| name == curve)
            || self.ibor.values().any(|name| name == curve)
            || self.overnight.values().any(|name| name == curve)
    }
}

/// The set of curves known at a point in the calibration.
///
/// Curves are stored once by name and shared into the lookup tables via
/// `Arc`, so cloning a provider copies pointers, not curve data. The
/// calibration engine owns the provider; objective and Jacobian evaluations
/// work on a clone overlaid with the unit's trial curves and never mutate
/// the engine's copy.
#[derive(Debug, Clone, Default)]
pub struct CurveProvider {
    curves: HashMap<String, Arc<ZeroCurve>>,
    discount_names: HashMap<Currency, String>,
    ibor_names: HashMap<IborIndex, String>,
    overnight_names: HashMap<OvernightIndex, String>,
}

impl CurveProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a curve under `name` and wires it into every assignment
    /// table entry that names it.
    ///
    /// # Errors
    ///
    /// Returns [`CurveError::DuplicateCurve`] if `name` is already present.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        curve: ZeroCurve,
        assignments: &CurveAssignments,
    ) -> CurveResult<()> {
        let name = name.into();
        if self.curves.contains_key(&name) {
            return Err(CurveError::duplicate_curve(name));
        }

        for (&currency, assigned) in &assignments.currencies {
            if *assigned == name {
                self.discount_names.insert(currency, name.clone());
            }
        }
        for (&index, assigned) in &assignments.ibor {
            if *assigned == name {
                self.ibor_names.insert(index, name.clone());
            }
        }
        for (&index, assigned) in &assignments.overnight {
            if *assigned == name {
                self.overnight_names.insert(index, name.clone());
            }
        }

        self.curves.insert(name, Arc::new(curve));
        Ok(())
    }

    /// Returns the curve stored under `name`.
    pub fn curve(&self, name: &str) -> CurveResult<&ZeroCurve> {
        self.curves
            .get(name)
            .map(Arc::as_ref)
            .ok_or_else(|| CurveError::curve_not_found(name))
    }

    /// Returns true when a curve named `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.curves.contains_key(name)
    }

    /// Returns the number of curves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    /// Returns true when no curves are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Iterates over the curve names (unordered).
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.curves.keys().map(String::as_str)
    }

    /// Returns the discount curve for `currency` together with its name.
    pub fn discount(&self, currency: Currency) -> CurveResult<(&str, &ZeroCurve)> {
        let name = self
            .discount_names
            .get(&currency)
            .ok_or_else(|| CurveError::curve_not_found(format!("{currency} discount curve")))?;
        Ok((name.as_str(), self.curve(name)?))
    }

    /// Returns the projection curve for `index` together with its name.
    pub fn ibor(&self, index: IborIndex) -> CurveResult<(&str, &ZeroCurve)> {
        let name = self
            .ibor_names
            .get(&index)
            .ok_or_else(|| CurveError::curve_not_found(format!("{index} projection curve")))?;
        Ok((name.as_str(), self.curve(name)?))
    }

    /// Returns the curve for the overnight `index` together with its name.
    pub fn overnight(&self, index: OvernightIndex) -> CurveResult<(&str, &ZeroCurve)> {
        let name = self
            .overnight_names
            .get(&index)
            .ok_or_else(|| CurveError::curve_not_found(format!("{index} curve")))?;
        Ok((name.as_str(), self.curve(name)?))
    }
}
