//! Curve parameter blocks and the sensitivity bundle.

use std::collections::HashMap;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{CurveError, CurveResult};

/// Location of a curve's parameters inside its unit's parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveBlock {
    start: usize,
    len: usize,
}

impl CurveBlock {
    /// Creates a block at `start` with `len` parameters.
    #[must_use]
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Returns the start offset.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Returns the parameter count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true for an empty block.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the block as an index range.
    #[must_use]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

/// Append-only map from curve name to its parameter block and the
/// sensitivity of its parameters to every calibration instrument quote.
///
/// Each entry's matrix has one row per curve parameter and one column per
/// instrument processed up to and including the curve's own unit, in
/// processing order. Entries are written exactly once, when the curve's
/// unit is solved; a downstream risk engine consumes the bundle to bucket
/// curve risk without recalibrating.
#[derive(Debug, Clone, Default)]
pub struct CurveBlockBundle {
    entries: HashMap<String, (CurveBlock, DMatrix<f64>)>,
    order: Vec<String>,
}

impl CurveBlockBundle {
    /// Creates an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a curve's block and sensitivity matrix.
    ///
    /// # Errors
    ///
    /// Returns [`CurveError::DuplicateCurve`] if the name is already
    /// present, and [`CurveError::DimensionMismatch`] if the matrix row
    /// count disagrees with the block length.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        block: CurveBlock,
        sensitivity: DMatrix<f64>,
    ) -> CurveResult<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(CurveError::duplicate_curve(name));
        }
        if sensitivity.nrows() != block.len() {
            return Err(CurveError::dimension_mismatch(
                format!("sensitivity rows for curve '{name}'"),
                block.len(),
                sensitivity.nrows(),
            ));
        }
        self.order.push(name.clone());
        self.entries.insert(name, (block, sensitivity));
        Ok(())
    }

    /// Returns a curve's block and sensitivity matrix.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<(&CurveBlock, &DMatrix<f64>)> {
        self.entries
            .get(name)
            .map(|(block, matrix)| (block, matrix))
    }

    /// Returns a curve's parameter block.
    #[must_use]
    pub fn block(&self, name: &str) -> Option<&CurveBlock> {
        self.entries.get(name).map(|(block, _)| block)
    }

    /// Returns a curve's sensitivity matrix.
    #[must_use]
    pub fn sensitivity(&self, name: &str) -> Option<&DMatrix<f64>> {
        self.entries.get(name).map(|(_, matrix)| matrix)
    }

    /// Returns true when the bundle holds an entry for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterates over curve names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the bundle is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
