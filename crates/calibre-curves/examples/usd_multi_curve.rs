//! USD Multi-Curve Calibration Example
//!
//! Calibrates the standard USD two-curve setup in dependency order:
//!
//! 1. **USD-OIS**: SOFR discount curve from OIS quotes
//! 2. **USD-3M**: Term SOFR 3M projection curve from FRAs and swaps,
//!    discounting on the OIS curve solved in step 1
//!
//! and then reads curve risk straight out of the sensitivity bundle: how
//! every calibrated curve parameter responds to a 1bp move in any input
//! quote, without recalibrating.
//!
//! Market Data (stylized USD levels):
//!
//! | Curve   | Instrument | Maturity | Quote  |
//! |---------|------------|----------|--------|
//! | USD-OIS | OIS SOFR   | 6M       | 4.30%  |
//! | USD-OIS | OIS SOFR   | 1Y       | 4.15%  |
//! | USD-OIS | OIS SOFR   | 2Y       | 3.90%  |
//! | USD-OIS | OIS SOFR   | 5Y       | 3.70%  |
//! | USD-3M  | FRA 3Mx6M  | 6M       | 4.45%  |
//! | USD-3M  | FRA 9Mx12M | 1Y       | 4.30%  |
//! | USD-3M  | Swap vs 3M | 2Y       | 4.05%  |
//! | USD-3M  | Swap vs 3M | 5Y       | 3.85%  |
//!
//! Run with: cargo run --example usd_multi_curve

use anyhow::Result;
use calibre_curves::prelude::*;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("===========================================");
    println!("  USD Multi-Curve Calibration Example");
    println!("===========================================\n");

    // === UNIT 1: SOFR DISCOUNT CURVE ===
    let ois_unit = CalibrationUnit::single(CurveSpec::new(
        "USD-OIS",
        Box::new(InterpolatedNodeGenerator::new(
            InterpolationMethod::LinearZero,
        )),
        vec![
            Ois::new(OvernightIndex::Sofr, 0.0, 0.5, 0.0430).into(),
            Ois::new(OvernightIndex::Sofr, 0.0, 1.0, 0.0415).into(),
            Ois::new(OvernightIndex::Sofr, 0.0, 2.0, 0.0390).into(),
            Ois::new(OvernightIndex::Sofr, 0.0, 5.0, 0.0370).into(),
        ],
        vec![0.04; 4],
    ));

    // === UNIT 2: TERM SOFR 3M PROJECTION CURVE ===
    // Swaps discount on USD-OIS, so this unit couples to unit 1
    let projection_unit = CalibrationUnit::single(CurveSpec::new(
        "USD-3M",
        Box::new(InterpolatedNodeGenerator::new(
            InterpolationMethod::LinearZero,
        )),
        vec![
            Fra::new(IborIndex::TermSofr3M, 0.25, 0.5, 0.0445).into(),
            Fra::new(IborIndex::TermSofr3M, 0.75, 1.0, 0.0430).into(),
            IrSwap::new(
                Currency::USD,
                IborIndex::TermSofr3M,
                0.0,
                2.0,
                0.0405,
                Frequency::SemiAnnual,
            )
            .into(),
            IrSwap::new(
                Currency::USD,
                IborIndex::TermSofr3M,
                0.0,
                5.0,
                0.0385,
                Frequency::SemiAnnual,
            )
            .into(),
        ],
        vec![0.04; 4],
    ));

    let assignments = CurveAssignments::new()
        .assign_currency(Currency::USD, "USD-OIS")
        .assign_overnight(OvernightIndex::Sofr, "USD-OIS")
        .assign_ibor(IborIndex::TermSofr3M, "USD-3M");

    let pricer = ParSpreadPricer::new();
    let output = CalibrationEngine::new().calibrate(
        vec![ois_unit, projection_unit],
        CurveProvider::new(),
        &assignments,
        &pricer,
    )?;

    // === CALIBRATED CURVES ===
    println!("=== CALIBRATED ZERO CURVES ===");
    println!("{:<10} {:>8} {:>12} {:>12}", "Curve", "Node", "Zero (CC)", "DF");
    println!("{}", "-".repeat(46));
    for name in ["USD-OIS", "USD-3M"] {
        let curve = output.provider.curve(name)?;
        for (&t, &z) in curve.times().iter().zip(curve.values()) {
            println!(
                "{:<10} {:>7.2}y {:>11.4}% {:>12.6}",
                name,
                t,
                z * 100.0,
                curve.discount_factor(t)?
            );
        }
    }

    println!("\n=== SOLVER DIAGNOSTICS ===");
    for diag in &output.diagnostics {
        println!(
            "{}: {} iterations, residual {:.2e}",
            diag.label, diag.iterations, diag.residual_norm
        );
    }

    // === REPRICING ===
    let report = reprice(&output.instruments, &output.provider, &pricer)?;
    println!("\n=== REPRICING REPORT ===");
    for check in report.checks() {
        println!(
            "{:<28} spread {:>10.2e}  [{}]",
            check.instrument,
            check.par_spread,
            if check.passed() { "ok" } else { "FAIL" }
        );
    }
    println!("Max |par spread|: {:.2e}", report.max_abs_spread());

    // === BUCKETED CURVE RISK FROM THE BUNDLE ===
    // Row i, column j: change of curve parameter i per unit change of
    // quote j. Scaled by 1bp this is the classic bucketed delta ladder.
    println!("\n=== USD-3M SENSITIVITY TO A 1bp QUOTE BUMP ===");
    let sensitivity = output
        .bundle
        .sensitivity("USD-3M")
        .expect("calibrated curve is in the bundle");
    let curve = output.provider.curve("USD-3M")?;
    print!("{:>8}", "node");
    for j in 0..output.instruments.len() {
        print!(" {:>9}", format!("q{j}"));
    }
    println!();
    for (i, &t) in curve.times().iter().enumerate() {
        print!("{:>7.2}y", t);
        for j in 0..sensitivity.ncols() {
            print!(" {:>9.2e}", sensitivity[(i, j)] * 1e-4);
        }
        println!();
    }

    println!("\nColumns q0..q3 are the OIS quotes, q4..q7 the projection");
    println!("quotes, in calibration order.");

    Ok(())
}
