//! Instrument valuation and sensitivity visitors.
//!
//! The calibration engine is generic over an [`InstrumentPricer`]: the pair
//! of caller-supplied functions that value an instrument against a curve
//! provider (the par spread driven to zero) and differentiate that value
//! with respect to curve parameters. A pricer failure for any instrument
//! aborts the unit's solve; the engine never substitutes a default value.
//!
//! [`ParSpreadPricer`] is the built-in implementation for the closed
//! instrument set, with analytic gradients chain-ruled through the curve
//! interpolation via [`ZeroCurve::discount_factor_gradient`].

use std::collections::HashMap;

use nalgebra::DVector;

use crate::curves::ZeroCurve;
use crate::error::{CurveError, CurveResult};
use crate::instruments::{CalibrationInstrument, Deposit, Fra, IrSwap, Ois};
use crate::multicurve::CurveProvider;

/// Per-curve parameter gradients of one instrument's par spread.
///
/// Keys are curve names; each vector has one entry per node of that curve.
/// Curves the instrument does not touch are simply absent.
pub type CurveGradients = HashMap<String, DVector<f64>>;

/// The valuation/sensitivity visitor pair supplied to the engine.
///
/// Implementations must be pure functions of their arguments: the engine
/// evaluates them repeatedly against snapshot providers during root finding.
pub trait InstrumentPricer: Send + Sync {
    /// Returns the instrument's par spread: model-implied par rate minus
    /// market quote. Zero when the curves price the instrument exactly.
    fn par_spread(
        &self,
        instrument: &CalibrationInstrument,
        provider: &CurveProvider,
    ) -> CurveResult<f64>;

    /// Returns the gradients of the par spread with respect to the
    /// parameters of every curve the instrument touches.
    fn parameter_sensitivity(
        &self,
        instrument: &CalibrationInstrument,
        provider: &CurveProvider,
    ) -> CurveResult<CurveGradients>;
}

/// Built-in par-spread pricer for the closed instrument set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParSpreadPricer;

impl ParSpreadPricer {
    /// Creates a new pricer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl InstrumentPricer for ParSpreadPricer {
    fn par_spread(
        &self,
        instrument: &CalibrationInstrument,
        provider: &CurveProvider,
    ) -> CurveResult<f64> {
        let par = match instrument {
            CalibrationInstrument::Deposit(deposit) => {
                let (_, curve) = provider.discount(deposit.currency())?;
                simple_par(instrument, curve, deposit.start(), deposit.end())?
            }
            CalibrationInstrument::Ois(ois) => {
                let (_, curve) = provider.overnight(ois.index())?;
                simple_par(instrument, curve, ois.start(), ois.end())?
            }
            CalibrationInstrument::Fra(fra) => {
                let (_, curve) = provider.ibor(fra.index())?;
                simple_par(instrument, curve, fra.start(), fra.end())?
            }
            CalibrationInstrument::Swap(swap) => {
                let (_, discount) = provider.discount(swap.currency())?;
                let (_, projection) = provider.ibor(swap.index())?;
                swap_par(swap, discount, projection)?
            }
        };
        Ok(par - instrument.quote())
    }

    fn parameter_sensitivity(
        &self,
        instrument: &CalibrationInstrument,
        provider: &CurveProvider,
    ) -> CurveResult<CurveGradients> {
        let mut gradients = CurveGradients::new();
        match instrument {
            CalibrationInstrument::Deposit(deposit) => {
                let (name, curve) = provider.discount(deposit.currency())?;
                let gradient = simple_par_gradient(instrument, curve, deposit.start(), deposit.end())?;
                accumulate(&mut gradients, name, gradient);
            }
            CalibrationInstrument::Ois(ois) => {
                let (name, curve) = provider.overnight(ois.index())?;
                let gradient = simple_par_gradient(instrument, curve, ois.start(), ois.end())?;
                accumulate(&mut gradients, name, gradient);
            }
            CalibrationInstrument::Fra(fra) => {
                let (name, curve) = provider.ibor(fra.index())?;
                let gradient = simple_par_gradient(instrument, curve, fra.start(), fra.end())?;
                accumulate(&mut gradients, name, gradient);
            }
            CalibrationInstrument::Swap(swap) => {
                let (discount_name, discount) = provider.discount(swap.currency())?;
                let (projection_name, projection) = provider.ibor(swap.index())?;
                let (discount_gradient, projection_gradient) =
                    swap_par_gradients(swap, discount, projection)?;
                accumulate(&mut gradients, discount_name, discount_gradient);
                accumulate(&mut gradients, projection_name, projection_gradient);
            }
        }
        Ok(gradients)
    }
}

/// Adds `gradient` into the entry for `name`, summing when the same curve
/// plays several roles for one instrument.
fn accumulate(gradients: &mut CurveGradients, name: &str, gradient: DVector<f64>) {
    match gradients.get_mut(name) {
        Some(existing) => *existing += gradient,
        None => {
            gradients.insert(name.to_string(), gradient);
        }
    }
}

/// Simple par rate `(DF(start)/DF(end) − 1)/τ` on a single curve.
fn simple_par(
    instrument: &CalibrationInstrument,
    curve: &ZeroCurve,
    start: f64,
    end: f64,
) -> CurveResult<f64> {
    let tau = end - start;
    if tau <= 0.0 {
        return Err(CurveError::visitor(
            instrument.description(),
            format!("non-positive accrual period [{start}, {end}]"),
        ));
    }
    let df_start = curve.discount_factor(start)?;
    let df_end = curve.discount_factor(end)?;
    Ok((df_start / df_end - 1.0) / tau)
}

/// Gradient of [`simple_par`] with respect to the curve's node values.
fn simple_par_gradient(
    instrument: &CalibrationInstrument,
    curve: &ZeroCurve,
    start: f64,
    end: f64,
) -> CurveResult<DVector<f64>> {
    let tau = end - start;
    if tau <= 0.0 {
        return Err(CurveError::visitor(
            instrument.description(),
            format!("non-positive accrual period [{start}, {end}]"),
        ));
    }
    let df_start = curve.discount_factor(start)?;
    let df_end = curve.discount_factor(end)?;
    let g_start = curve.discount_factor_gradient(start)?;
    let g_end = curve.discount_factor_gradient(end)?;

    // d/dz [(df_s/df_e − 1)/τ] = (g_s/df_e − df_s·g_e/df_e²)/τ
    Ok((g_start / df_end - g_end * (df_start / (df_end * df_end))) / tau)
}

/// Float leg PV and fixed leg annuity for a unit notional.
fn swap_legs(
    swap: &IrSwap,
    discount: &ZeroCurve,
    projection: &ZeroCurve,
) -> CurveResult<(f64, f64)> {
    let float_times = swap.float_schedule();
    let fixed_times = swap.fixed_schedule();
    if float_times.is_empty() || fixed_times.is_empty() {
        return Err(CurveError::visitor(
            swap.description(),
            "degenerate payment schedule",
        ));
    }

    let mut float_pv = 0.0;
    let mut period_start = swap.start();
    for &period_end in &float_times {
        let ratio = projection.discount_factor(period_start)? / projection.discount_factor(period_end)?;
        float_pv += (ratio - 1.0) * discount.discount_factor(period_end)?;
        period_start = period_end;
    }

    let mut annuity = 0.0;
    let mut prev = swap.start();
    for &pay in &fixed_times {
        annuity += (pay - prev) * discount.discount_factor(pay)?;
        prev = pay;
    }

    Ok((float_pv, annuity))
}

/// Model par rate of a swap: float leg PV over fixed leg annuity.
fn swap_par(swap: &IrSwap, discount: &ZeroCurve, projection: &ZeroCurve) -> CurveResult<f64> {
    let (float_pv, annuity) = swap_legs(swap, discount, projection)?;
    Ok(float_pv / annuity)
}

/// Gradients of the swap par rate with respect to the discount and
/// projection curve node values, in that order.
fn swap_par_gradients(
    swap: &IrSwap,
    discount: &ZeroCurve,
    projection: &ZeroCurve,
) -> CurveResult<(DVector<f64>, DVector<f64>)> {
    let (float_pv, annuity) = swap_legs(swap, discount, projection)?;

    let float_times = swap.float_schedule();
    let fixed_times = swap.fixed_schedule();

    // dF/dz_p and dF/dz_d
    let mut d_float_projection = DVector::zeros(projection.node_count());
    let mut d_float_discount = DVector::zeros(discount.node_count());
    let mut period_start = swap.start();
    for &period_end in &float_times {
        let df_p_start = projection.discount_factor(period_start)?;
        let df_p_end = projection.discount_factor(period_end)?;
        let g_p_start = projection.discount_factor_gradient(period_start)?;
        let g_p_end = projection.discount_factor_gradient(period_end)?;
        let df_d_end = discount.discount_factor(period_end)?;
        let g_d_end = discount.discount_factor_gradient(period_end)?;

        let ratio = df_p_start / df_p_end;
        d_float_projection +=
            (g_p_start / df_p_end - g_p_end * (df_p_start / (df_p_end * df_p_end))) * df_d_end;
        d_float_discount += g_d_end * (ratio - 1.0);

        period_start = period_end;
    }

    // dA/dz_d
    let mut d_annuity_discount = DVector::zeros(discount.node_count());
    let mut prev = swap.start();
    for &pay in &fixed_times {
        d_annuity_discount += discount.discount_factor_gradient(pay)? * (pay - prev);
        prev = pay;
    }

    // par = F/A
    let par = float_pv / annuity;
    let discount_gradient = d_float_discount / annuity - d_annuity_discount * (par / annuity);
    let projection_gradient = d_float_projection / annuity;

    Ok((discount_gradient, projection_gradient))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::Frequency;
    use crate::interpolation::InterpolationMethod;
    use crate::multicurve::{Currency, CurveAssignments, IborIndex, OvernightIndex};
    use approx::assert_relative_eq;

    fn assignments() -> CurveAssignments {
        CurveAssignments::new()
            .assign_currency(Currency::USD, "USD-OIS")
            .assign_overnight(OvernightIndex::Sofr, "USD-OIS")
            .assign_ibor(IborIndex::TermSofr3M, "USD-3M")
    }

    fn provider_with(ois_rates: &[f64], projection_rates: &[f64]) -> CurveProvider {
        let mut provider = CurveProvider::new();
        provider
            .insert(
                "USD-OIS",
                ZeroCurve::new(
                    vec![0.5, 1.0, 2.0, 5.0],
                    ois_rates.to_vec(),
                    InterpolationMethod::LinearZero,
                )
                .unwrap(),
                &assignments(),
            )
            .unwrap();
        provider
            .insert(
                "USD-3M",
                ZeroCurve::new(
                    vec![0.5, 1.0, 2.0, 5.0],
                    projection_rates.to_vec(),
                    InterpolationMethod::LinearZero,
                )
                .unwrap(),
                &assignments(),
            )
            .unwrap();
        provider
    }

    fn flat_provider(rate: f64) -> CurveProvider {
        provider_with(&[rate; 4], &[rate; 4])
    }

    #[test]
    fn test_deposit_par_spread_flat_curve() {
        let provider = flat_provider(0.03);
        let pricer = ParSpreadPricer::new();

        // Implied simple rate over [0, 1] on a 3% flat curve
        let implied = (0.03f64.exp() - 1.0) / 1.0;
        let deposit = CalibrationInstrument::Deposit(Deposit::new(Currency::USD, 0.0, 1.0, implied));

        let spread = pricer.par_spread(&deposit, &provider).unwrap();
        assert_relative_eq!(spread, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ois_uses_overnight_table() {
        let provider = flat_provider(0.03);
        let pricer = ParSpreadPricer::new();

        let ois = CalibrationInstrument::Ois(Ois::new(OvernightIndex::Sofr, 0.0, 2.0, 0.02));
        let spread = pricer.par_spread(&ois, &provider).unwrap();

        let implied = ((0.03f64 * 2.0).exp() - 1.0) / 2.0;
        assert_relative_eq!(spread, implied - 0.02, epsilon = 1e-12);
    }

    #[test]
    fn test_fra_prices_off_projection_curve() {
        // Projection curve at 4%, discount at 3%: the FRA must see only 4%
        let provider = provider_with(&[0.03; 4], &[0.04; 4]);
        let pricer = ParSpreadPricer::new();

        let fra = CalibrationInstrument::Fra(Fra::new(IborIndex::TermSofr3M, 0.5, 0.75, 0.04));
        let spread = pricer.par_spread(&fra, &provider).unwrap();

        let forward = ((0.04f64 * 0.25).exp() - 1.0) / 0.25;
        assert_relative_eq!(spread, forward - 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_swap_par_flat_single_curve() {
        // With projection == discount == flat r, the swap par rate equals
        // the telescoped float leg over the annuity
        let provider = flat_provider(0.03);
        let pricer = ParSpreadPricer::new();

        let swap = CalibrationInstrument::Swap(IrSwap::new(
            Currency::USD,
            IborIndex::TermSofr3M,
            0.0,
            2.0,
            0.0,
            Frequency::SemiAnnual,
        ));
        let spread = pricer.par_spread(&swap, &provider).unwrap();

        // Analytic par: float telescopes to 1 − DF(2) on a single curve
        let df = |t: f64| (-0.03f64 * t).exp();
        let annuity = 0.5 * (df(0.5) + df(1.0) + df(1.5) + df(2.0));
        let expected = (1.0 - df(2.0)) / annuity;
        assert_relative_eq!(spread, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_curve_propagates() {
        let provider = CurveProvider::new();
        let pricer = ParSpreadPricer::new();

        let deposit = CalibrationInstrument::Deposit(Deposit::new(Currency::USD, 0.0, 1.0, 0.03));
        assert!(matches!(
            pricer.par_spread(&deposit, &provider),
            Err(CurveError::CurveNotFound { .. })
        ));
    }

    #[test]
    fn test_degenerate_swap_is_visitor_failure() {
        let provider = flat_provider(0.03);
        let pricer = ParSpreadPricer::new();

        let swap = CalibrationInstrument::Swap(IrSwap::new(
            Currency::USD,
            IborIndex::TermSofr3M,
            1.0,
            1.0,
            0.03,
            Frequency::Annual,
        ));
        assert!(matches!(
            pricer.par_spread(&swap, &provider),
            Err(CurveError::Visitor { .. })
        ));
    }

    /// Finite-difference check of `parameter_sensitivity` by bumping each
    /// node of each curve and repricing.
    fn check_gradients(instrument: &CalibrationInstrument) {
        let ois_rates = [0.028, 0.030, 0.031, 0.033];
        let projection_rates = [0.033, 0.035, 0.037, 0.040];
        let provider = provider_with(&ois_rates, &projection_rates);
        let pricer = ParSpreadPricer::new();

        let gradients = pricer.parameter_sensitivity(instrument, &provider).unwrap();

        let h = 1e-7;
        for (curve_name, base_rates) in [
            ("USD-OIS", ois_rates),
            ("USD-3M", projection_rates),
        ] {
            for node in 0..4 {
                let mut up = base_rates.to_vec();
                up[node] += h;
                let mut down = base_rates.to_vec();
                down[node] -= h;

                let (bumped_up, bumped_down) = if curve_name == "USD-OIS" {
                    (
                        provider_with(&up, &projection_rates),
                        provider_with(&down, &projection_rates),
                    )
                } else {
                    (
                        provider_with(&ois_rates, &up),
                        provider_with(&ois_rates, &down),
                    )
                };

                let numeric = (pricer.par_spread(instrument, &bumped_up).unwrap()
                    - pricer.par_spread(instrument, &bumped_down).unwrap())
                    / (2.0 * h);
                let analytic = gradients
                    .get(curve_name)
                    .map_or(0.0, |gradient| gradient[node]);

                assert_relative_eq!(analytic, numeric, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_deposit_gradient_matches_bump() {
        check_gradients(&CalibrationInstrument::Deposit(Deposit::new(
            Currency::USD,
            0.0,
            1.5,
            0.03,
        )));
    }

    #[test]
    fn test_fra_gradient_matches_bump() {
        check_gradients(&CalibrationInstrument::Fra(Fra::new(
            IborIndex::TermSofr3M,
            0.75,
            1.0,
            0.035,
        )));
    }

    #[test]
    fn test_swap_gradient_matches_bump() {
        check_gradients(&CalibrationInstrument::Swap(IrSwap::new(
            Currency::USD,
            IborIndex::TermSofr3M,
            0.0,
            3.0,
            0.035,
            Frequency::SemiAnnual,
        )));
    }

    #[test]
    fn test_gradient_keys_name_touched_curves_only() {
        let provider = flat_provider(0.03);
        let pricer = ParSpreadPricer::new();

        let deposit = CalibrationInstrument::Deposit(Deposit::new(Currency::USD, 0.0, 1.0, 0.03));
        let gradients = pricer.parameter_sensitivity(&deposit, &provider).unwrap();

        assert_eq!(gradients.len(), 1);
        assert!(gradients.contains_key("USD-OIS"));
    }
}
