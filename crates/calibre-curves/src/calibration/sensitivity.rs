//! Block sensitivity assembly.
//!
//! After a unit solves, every curve in it owes the bundle one matrix: the
//! sensitivity of its parameters to all instrument quotes processed so far.
//! By the implicit function theorem on the unit's par-spread equations
//! `F(q, p_prev, p_unit) = 0`:
//!
//! ```text
//! ∂p_unit/∂q_unit = (∂F/∂p_unit)⁻¹                    (the direct block)
//! ∂p_unit/∂q_prev = −(∂F/∂p_unit)⁻¹ · ∂F/∂p_prev · S_prev
//! ```
//!
//! where `S_prev` stacks the previously stored sensitivities of earlier
//! units' curves. Earlier curves do not respond to later quotes, so their
//! bundle entries are left untouched and each entry keeps exactly as many
//! columns as there were instruments up to its own unit.

use calibre_math::linear_algebra::LinearSolver;
use nalgebra::DMatrix;

use crate::calibration::blocks::{CurveBlock, CurveBlockBundle};
use crate::error::{CurveError, CurveResult};
use crate::instruments::CalibrationInstrument;
use crate::multicurve::CurveProvider;
use crate::pricing::{CurveGradients, InstrumentPricer};

/// One calibrated curve's position in the global parameter layout.
///
/// Entries are kept in calibration order; their concatenation defines the
/// global parameter vector the sensitivity rows are laid out against.
pub(crate) struct LayoutEntry {
    pub(crate) name: String,
    pub(crate) parameter_count: usize,
    /// Jacobians of this curve's materialized node values with respect to
    /// other curves' node values, as reported by its generator. Empty for
    /// self-contained curve families.
    pub(crate) dependencies: Vec<(String, DMatrix<f64>)>,
}

/// Ordered layout of every calibrated curve's parameters.
pub(crate) type CurveLayout = [LayoutEntry];

/// Chain-rules per-curve gradients through generator value dependencies.
///
/// A gradient reported against a derived curve contributes `Wᵀ·g` to every
/// curve its values are built from. Entries are walked newest-first, so a
/// chain of derived curves resolves in a single pass (later curves only
/// ever depend on earlier ones).
pub(crate) fn chain_dependencies(
    gradients: &mut CurveGradients,
    entries: &CurveLayout,
) -> CurveResult<()> {
    for entry in entries.iter().rev() {
        if entry.dependencies.is_empty() {
            continue;
        }
        let Some(gradient) = gradients.get(&entry.name).cloned() else {
            continue;
        };
        for (base, weights) in &entry.dependencies {
            if weights.nrows() != gradient.len() {
                return Err(CurveError::dimension_mismatch(
                    format!("value dependency of curve '{}'", entry.name),
                    weights.nrows(),
                    gradient.len(),
                ));
            }
            let contribution = weights.transpose() * &gradient;
            match gradients.get_mut(base) {
                Some(existing) => {
                    if existing.len() != contribution.len() {
                        return Err(CurveError::dimension_mismatch(
                            format!("gradient for base curve '{base}'"),
                            existing.len(),
                            contribution.len(),
                        ));
                    }
                    *existing += contribution;
                }
                None => {
                    gradients.insert(base.clone(), contribution);
                }
            }
        }
    }
    Ok(())
}

/// Computes and records the sensitivity matrices for the unit just solved.
///
/// # Arguments
///
/// * `accumulated` - All instruments processed so far, in processing order,
///   the current unit's last
/// * `provider` - Provider holding every calibrated curve including the
///   current unit's
/// * `pricer` - The sensitivity visitor
/// * `layout` - Parameter layout of all calibrated curves; the last
///   `unit_curve_count` entries belong to the current unit
/// * `unit_curve_count` - Number of curves in the current unit
/// * `linear` - Decomposition used to invert the direct block
/// * `bundle` - Bundle receiving one entry per current-unit curve
///
/// # Errors
///
/// Returns [`calibre_math::MathError::SingularMatrix`] (wrapped) when the
/// direct block is not invertible, meaning the unit's instrument set does
/// not span its parameter space.
pub(crate) fn update_bundle(
    accumulated: &[CalibrationInstrument],
    provider: &CurveProvider,
    pricer: &dyn InstrumentPricer,
    layout: &CurveLayout,
    unit_curve_count: usize,
    linear: &dyn LinearSolver,
    bundle: &mut CurveBlockBundle,
) -> CurveResult<()> {
    let total_params: usize = layout.iter().map(|entry| entry.parameter_count).sum();
    let total_instruments = accumulated.len();

    // Sensitivity of every accumulated instrument to every known parameter
    let full = assemble_full_matrix(accumulated, provider, pricer, layout, total_params)?;

    let unit_params: usize = layout[layout.len() - unit_curve_count..]
        .iter()
        .map(|entry| entry.parameter_count)
        .sum();
    let prev_params = total_params - unit_params;
    let prev_instruments = total_instruments - unit_params;

    // Column split: direct = current unit's own parameters, indirect = all
    // earlier units' parameters; rows are the current unit's instruments
    let direct = full
        .view((prev_instruments, prev_params), (unit_params, unit_params))
        .into_owned();
    let direct_inverse = linear.inverse(&direct)?;

    let mut unit_matrix = DMatrix::zeros(unit_params, total_instruments);
    if prev_params > 0 {
        let indirect = full
            .view((prev_instruments, 0), (unit_params, prev_params))
            .into_owned();
        let stacked_prev =
            stack_previous(layout, unit_curve_count, prev_params, prev_instruments, bundle)?;

        // Chain rule through the earlier solves
        let composed = -(&direct_inverse * &indirect) * &stacked_prev;
        unit_matrix
            .view_mut((0, 0), (unit_params, prev_instruments))
            .copy_from(&composed);
    }
    unit_matrix
        .view_mut((0, prev_instruments), (unit_params, unit_params))
        .copy_from(&direct_inverse);

    // One bundle entry per current-unit curve, rows restricted to its block
    let mut unit_offset = 0;
    for entry in &layout[layout.len() - unit_curve_count..] {
        let block = CurveBlock::new(unit_offset, entry.parameter_count);
        let sensitivity = unit_matrix.rows(unit_offset, entry.parameter_count).into_owned();
        bundle.insert(entry.name.clone(), block, sensitivity)?;
        unit_offset += entry.parameter_count;
    }

    Ok(())
}

/// Builds the rectangular matrix of every accumulated instrument's
/// sensitivity to every calibrated curve parameter, chain-ruled through
/// generator value dependencies.
fn assemble_full_matrix(
    accumulated: &[CalibrationInstrument],
    provider: &CurveProvider,
    pricer: &dyn InstrumentPricer,
    layout: &CurveLayout,
    total_params: usize,
) -> CurveResult<DMatrix<f64>> {
    let mut full = DMatrix::zeros(accumulated.len(), total_params);

    for (row, instrument) in accumulated.iter().enumerate() {
        let mut gradients = pricer.parameter_sensitivity(instrument, provider)?;
        chain_dependencies(&mut gradients, layout)?;

        let mut offset = 0;
        for entry in layout {
            if let Some(gradient) = gradients.get(&entry.name) {
                if gradient.len() != entry.parameter_count {
                    return Err(CurveError::dimension_mismatch(
                        format!("sensitivity for curve '{}'", entry.name),
                        entry.parameter_count,
                        gradient.len(),
                    ));
                }
                for k in 0..entry.parameter_count {
                    full[(row, offset + k)] = gradient[k];
                }
            }
            offset += entry.parameter_count;
        }
    }

    Ok(full)
}

/// Stacks the stored sensitivities of all earlier units' curves into one
/// `prev_params × prev_instruments` matrix, zero-padded on the right for
/// curves whose unit saw fewer instruments.
fn stack_previous(
    layout: &CurveLayout,
    unit_curve_count: usize,
    prev_params: usize,
    prev_instruments: usize,
    bundle: &CurveBlockBundle,
) -> CurveResult<DMatrix<f64>> {
    let mut stacked = DMatrix::zeros(prev_params, prev_instruments);
    let mut offset = 0;

    for entry in &layout[..layout.len() - unit_curve_count] {
        let stored = bundle
            .sensitivity(&entry.name)
            .ok_or_else(|| CurveError::curve_not_found(entry.name.clone()))?;
        if stored.nrows() != entry.parameter_count || stored.ncols() > prev_instruments {
            return Err(CurveError::dimension_mismatch(
                format!("stored sensitivity for curve '{}'", entry.name),
                entry.parameter_count,
                stored.nrows(),
            ));
        }
        stacked
            .view_mut((offset, 0), (stored.nrows(), stored.ncols()))
            .copy_from(stored);
        offset += entry.parameter_count;
    }

    Ok(stacked)
}
