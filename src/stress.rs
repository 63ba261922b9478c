//! Stress scenarios: re-run the optimizer under shocked inputs.
//!
//! Each scenario perturbs either the priced items or the fee
//! configuration, then runs the full bisection search. Scenarios are
//! independent, so they evaluate in parallel; the seeded simulator keeps
//! each individual run reproducible.

use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;

use crate::config::Config;
use crate::error::LotResult;
use crate::item::Item;
use crate::optimize::{optimize_bid, OptimizerParams};
use crate::simulate::{percentile, CashConstraints};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StressScenario {
    Baseline,
    /// Price estimates down 15%
    PriceDown15,
    /// Return rate up 30%, capped at 1.0
    ReturnsUp30,
    /// Shipping cost per order up 20%
    ShippingUp20,
    /// Sell-through probabilities down 10%
    SellP60Down10,
}

impl StressScenario {
    pub fn all() -> Vec<StressScenario> {
        vec![
            StressScenario::Baseline,
            StressScenario::PriceDown15,
            StressScenario::ReturnsUp30,
            StressScenario::ShippingUp20,
            StressScenario::SellP60Down10,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            StressScenario::Baseline => "baseline",
            StressScenario::PriceDown15 => "price_down_15",
            StressScenario::ReturnsUp30 => "returns_up_30",
            StressScenario::ShippingUp20 => "shipping_up_20",
            StressScenario::SellP60Down10 => "sell_p60_down_10",
        }
    }

    pub fn parse(name: &str) -> Option<StressScenario> {
        match name.trim() {
            "baseline" => Some(StressScenario::Baseline),
            "price_down_15" => Some(StressScenario::PriceDown15),
            "returns_up_30" => Some(StressScenario::ReturnsUp30),
            "shipping_up_20" => Some(StressScenario::ShippingUp20),
            "sell_p60_down_10" => Some(StressScenario::SellP60Down10),
            _ => None,
        }
    }
}

/// One scenario's optimizer summary.
#[derive(Debug, Clone, Serialize)]
pub struct StressSummary {
    pub scenario: String,
    pub recommended_bid: f64,
    pub roi_p5: f64,
    pub roi_p50: f64,
    pub roi_p95: f64,
    /// ROI quantile at the configured var_alpha
    pub roi_tail: f64,
    pub prob_roi_ge_target: Option<f64>,
    pub expected_cash_60d: f64,
    pub cash_60d_p5: f64,
    pub meets_constraints: bool,
}

fn scale_price_fields(item: &mut Item, factor: f64) {
    let scale = |v: &mut Option<f64>| {
        if let Some(x) = v {
            *x = (*x * factor).max(0.0);
        }
    };
    scale(&mut item.est_price_mu);
    scale(&mut item.est_price_sigma);
    scale(&mut item.est_price_p5);
    scale(&mut item.est_price_p50);
    scale(&mut item.est_price_p95);
}

/// Apply one scenario's shock to a copy of the inputs.
pub fn apply_scenario(
    items: &[Item],
    config: &Config,
    scenario: StressScenario,
) -> (Vec<Item>, Config) {
    let mut items = items.to_vec();
    let mut config = config.clone();

    match scenario {
        StressScenario::Baseline => {}
        StressScenario::PriceDown15 => {
            for item in items.iter_mut() {
                scale_price_fields(item, 0.85);
            }
        }
        StressScenario::ReturnsUp30 => {
            config.fees.return_rate = (config.fees.return_rate * 1.30).min(1.0);
        }
        StressScenario::ShippingUp20 => {
            config.fees.shipping_per_order *= 1.20;
        }
        StressScenario::SellP60Down10 => {
            for item in items.iter_mut() {
                if let Some(p) = &mut item.sell_p60 {
                    *p = (*p * 0.90).clamp(0.0, 1.0);
                }
            }
        }
    }

    (items, config)
}

/// Run the optimizer under every requested scenario, in parallel.
pub fn run_stress(
    items: &[Item],
    config: &Config,
    params: &OptimizerParams,
    constraints: &CashConstraints,
    scenarios: &[StressScenario],
) -> LotResult<Vec<StressSummary>> {
    scenarios
        .par_iter()
        .map(|&scenario| {
            let (shocked_items, shocked_config) = apply_scenario(items, config, scenario);
            let result = optimize_bid(&shocked_items, &shocked_config, params, constraints)?;

            let roi_tail = {
                let mut sorted = result.roi_by_sim.clone();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                percentile(&sorted, shocked_config.decision.var_alpha)
            };

            Ok(StressSummary {
                scenario: scenario.name().to_string(),
                recommended_bid: result.bid,
                roi_p5: result.roi_p5,
                roi_p50: result.roi_p50,
                roi_p95: result.roi_p95,
                roi_tail,
                prob_roi_ge_target: result.prob_roi_ge_target,
                expected_cash_60d: result.expected_cash_60d,
                cash_60d_p5: result.cash_60d_p5,
                meets_constraints: result.meets_constraints,
            })
        })
        .collect()
}

/// Save the scenario summary table to CSV.
pub fn save_stress_csv(summaries: &[StressSummary], path: &Path) -> LotResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "scenario",
        "recommended_bid",
        "roi_p5",
        "roi_p50",
        "roi_p95",
        "roi_tail",
        "prob_roi_ge_target",
        "expected_cash_60d",
        "cash_60d_p5",
        "meets_constraints",
    ])?;

    for s in summaries {
        wtr.write_record(&[
            s.scenario.clone(),
            format!("{:.2}", s.recommended_bid),
            format!("{:.6}", s.roi_p5),
            format!("{:.6}", s.roi_p50),
            format!("{:.6}", s.roi_p95),
            format!("{:.6}", s.roi_tail),
            s.prob_roi_ge_target
                .map(|p| format!("{:.6}", p))
                .unwrap_or_default(),
            format!("{:.2}", s.expected_cash_60d),
            format!("{:.2}", s.cash_60d_p5),
            s.meets_constraints.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save the scenario summary table to JSON.
pub fn save_stress_json(summaries: &[StressSummary], path: &Path) -> LotResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(summaries)?;
    std::fs::write(path, json)?;
    Ok(())
}
