//! Parameter-to-curve mapping.
//!
//! Turns a flat parameter vector into concrete curves overlaid on the known
//! provider state. The mapping is copy-on-write: the base provider is never
//! mutated, so the root finder can evaluate it repeatedly with different
//! trial vectors.

use nalgebra::DVector;

use crate::calibration::unit::FinalizedSpec;
use crate::error::{CurveError, CurveResult};
use crate::multicurve::{CurveAssignments, CurveProvider};

/// Builds the unit's curves from the flat parameter vector `x`.
///
/// Specs are walked in order; each consumes the next
/// `parameter_count` entries of `x`. A curve is materialized against the
/// running provider — which already holds curves written earlier in this
/// same pass — then stored by name and wired into every assignment-table
/// entry that names it.
///
/// # Errors
///
/// Returns [`CurveError::DimensionMismatch`] when `x` is shorter than the
/// sum of the specs' parameter counts.
pub(crate) fn build_curves(
    x: &DVector<f64>,
    base: &CurveProvider,
    specs: &[FinalizedSpec],
    assignments: &CurveAssignments,
) -> CurveResult<CurveProvider> {
    let mut provider = base.clone();
    let mut offset = 0;

    for spec in specs {
        let count = spec.parameter_count();
        if offset + count > x.len() {
            return Err(CurveError::dimension_mismatch(
                "unit parameter vector",
                offset + count,
                x.len(),
            ));
        }
        let params = &x.as_slice()[offset..offset + count];
        let curve = spec.template.materialize(params, &provider)?;
        provider.insert(&spec.name, curve, assignments)?;
        offset += count;
    }

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::unit::CurveSpec;
    use crate::generators::{InterpolatedNodeGenerator, SpreadNodeGenerator};
    use crate::instruments::{CalibrationInstrument, Deposit};
    use crate::interpolation::InterpolationMethod;
    use crate::multicurve::Currency;
    use approx::assert_relative_eq;

    fn deposit(end: f64) -> CalibrationInstrument {
        CalibrationInstrument::Deposit(Deposit::new(Currency::USD, 0.0, end, 0.03))
    }

    fn finalized(name: &str, maturities: &[f64]) -> FinalizedSpec {
        CurveSpec::new(
            name,
            Box::new(InterpolatedNodeGenerator::new(
                InterpolationMethod::LinearZero,
            )),
            maturities.iter().map(|&end| deposit(end)).collect(),
            vec![0.0; maturities.len()],
        )
        .finalize()
        .unwrap()
    }

    fn assignments() -> CurveAssignments {
        CurveAssignments::new().assign_currency(Currency::USD, "FIRST")
    }

    #[test]
    fn test_slices_parameters_in_order() {
        let specs = vec![finalized("FIRST", &[0.5, 1.0]), finalized("SECOND", &[2.0])];
        let x = DVector::from_vec(vec![0.030, 0.032, 0.035]);

        let provider = build_curves(&x, &CurveProvider::new(), &specs, &assignments()).unwrap();

        assert_eq!(provider.curve("FIRST").unwrap().values(), &[0.030, 0.032]);
        assert_eq!(provider.curve("SECOND").unwrap().values(), &[0.035]);
    }

    #[test]
    fn test_base_state_is_not_mutated() {
        let base = CurveProvider::new();
        let specs = vec![finalized("FIRST", &[1.0])];
        let x = DVector::from_vec(vec![0.03]);

        let overlay = build_curves(&x, &base, &specs, &assignments()).unwrap();

        assert!(base.is_empty());
        assert!(overlay.contains("FIRST"));
    }

    #[test]
    fn test_short_vector_rejected() {
        let specs = vec![finalized("FIRST", &[0.5, 1.0])];
        let x = DVector::from_vec(vec![0.03]);

        let err = build_curves(&x, &CurveProvider::new(), &specs, &assignments()).unwrap_err();
        assert!(matches!(err, CurveError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_same_pass_curve_reference() {
        // The second spec spreads over the first, written earlier in the
        // same mapping pass
        let spread_spec = CurveSpec::new(
            "SECOND",
            Box::new(SpreadNodeGenerator::new(
                "FIRST",
                InterpolationMethod::LinearZero,
            )),
            vec![deposit(1.0)],
            vec![0.0],
        )
        .finalize()
        .unwrap();

        let specs = vec![finalized("FIRST", &[1.0]), spread_spec];
        let x = DVector::from_vec(vec![0.03, 0.002]);

        let provider = build_curves(&x, &CurveProvider::new(), &specs, &assignments()).unwrap();
        assert_relative_eq!(
            provider.curve("SECOND").unwrap().values()[0],
            0.032,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_wires_assignment_tables() {
        let specs = vec![finalized("FIRST", &[1.0])];
        let x = DVector::from_vec(vec![0.03]);

        let provider = build_curves(&x, &CurveProvider::new(), &specs, &assignments()).unwrap();
        let (name, _) = provider.discount(Currency::USD).unwrap();
        assert_eq!(name, "FIRST");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Whatever the split of nodes across the unit's specs, each
            // curve receives exactly its contiguous slice of the flat
            // parameter vector
            #[test]
            fn slices_partition_the_vector(
                first_len in 1usize..4,
                second_len in 1usize..4,
                values in proptest::collection::vec(-0.01f64..0.08, 8),
            ) {
                let first_maturities: Vec<f64> =
                    (1..=first_len).map(|i| i as f64).collect();
                let second_maturities: Vec<f64> =
                    (1..=second_len).map(|i| i as f64).collect();
                let specs = vec![
                    finalized("FIRST", &first_maturities),
                    finalized("SECOND", &second_maturities),
                ];
                let x = DVector::from_vec(values[..first_len + second_len].to_vec());

                let provider =
                    build_curves(&x, &CurveProvider::new(), &specs, &assignments()).unwrap();

                prop_assert_eq!(
                    provider.curve("FIRST").unwrap().values(),
                    &x.as_slice()[..first_len]
                );
                prop_assert_eq!(
                    provider.curve("SECOND").unwrap().values(),
                    &x.as_slice()[first_len..]
                );
            }
        }
    }
}
