//! Lot pipeline: gate → price → sell → optimize.
//!
//! Runs the stages strictly in sequence on a single task, partitions the
//! admitted manifest into the core set (counted in ROI) and the upside
//! set (reported only), and hands the core view to the optimizer.
//! Evidence records for each item are appended in stage order; the
//! lot-level optimizer record always comes last.

use std::path::Path;

use serde_json::json;

use crate::config::{Config, SellModelKind};
use crate::error::LotResult;
use crate::evidence::{EvidenceRecord, EvidenceSink};
use crate::gate::{evidence_gate, GateDecision};
use crate::item::Item;
use crate::ladder;
use crate::optimize::{optimize_bid, OptimizerParams};
use crate::sell::{estimate_sell_p60, SellParams};
use crate::simulate::{CashConstraints, SimulationResult};
use crate::survival::estimate_sell_survival;
use crate::triangulate::estimate_prices;

/// Per-invocation knobs that are not configuration policy.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub optimizer: OptimizerParams,
    pub constraints: CashConstraints,
    /// Calendar month 1..=12 for seasonality lookups
    pub month: u32,
}

impl PipelineOptions {
    pub fn new(lo: f64, hi: f64) -> Self {
        PipelineOptions {
            optimizer: OptimizerParams::new(lo, hi),
            constraints: CashConstraints::default(),
            month: 1,
        }
    }
}

/// Everything one lot run produced. `gates` is parallel to `items`;
/// `core` and `upside` are disjoint index sets partitioning the manifest.
#[derive(Debug)]
pub struct LotReport {
    pub items: Vec<Item>,
    pub gates: Vec<GateDecision>,
    pub core: Vec<usize>,
    pub upside: Vec<usize>,
    pub result: SimulationResult,
}

/// Run the full pipeline over an already-coerced manifest.
pub fn run_lot(
    mut items: Vec<Item>,
    config: &Config,
    opts: &PipelineOptions,
    sink: &dyn EvidenceSink,
) -> LotResult<LotReport> {
    config.validate()?;

    // (1) Gate every item and record the verdicts
    let gates: Vec<GateDecision> = items
        .iter()
        .map(|item| {
            let decision = evidence_gate(
                item,
                item.sold_comps_count_180d(),
                item.has_secondary_signal(),
                item.has_high_trust_id(),
                &config.gating,
                &config.evidence,
            );
            sink.write(&EvidenceRecord::new(
                Some(&item.sku_local),
                "gate",
                decision.passed,
                json!({
                    "core_included": decision.core_included,
                    "reason": decision.reason.clone(),
                    "tags": decision.tags.clone(),
                    "sold_comps_count_180d": item.sold_comps_count_180d(),
                    "has_secondary_signal": item.has_secondary_signal(),
                    "has_high_trust_id": item.has_high_trust_id(),
                }),
            ));
            decision
        })
        .collect();

    // (2) Price triangulation for every admitted item
    estimate_prices(&mut items, &config.triangulation, sink);

    // (3) Sell-through
    let horizon = config.decision.sellthrough_horizon_days;
    let sell_params = SellParams::new(horizon, opts.month, config.triangulation.cv_fallback);
    match config.sell.model {
        SellModelKind::Proxy => estimate_sell_p60(&mut items, &config.sell, &sell_params, sink),
        SellModelKind::Loglogistic => {
            estimate_sell_survival(&mut items, &config.sell, &sell_params, sink)
        }
    }

    // (3b) Ladder composition replaces the flat estimate when enabled
    if config.ladder.enabled {
        for item in items.iter_mut() {
            let base_price = item.est_price_p50.or(item.est_price_mu);
            if let Some(p) =
                ladder::ladder_sell_p60(base_price, item.sell_hazard_daily, horizon, &config.ladder)
            {
                item.sell_p60 = Some(p);
            }
        }
    }

    // (4) Partition into core and upside views
    let mut core = Vec::new();
    let mut upside = Vec::new();
    for (idx, decision) in gates.iter().enumerate() {
        if decision.core_included {
            core.push(idx);
        } else {
            upside.push(idx);
        }
    }
    tracing::info!(
        core = core.len(),
        upside = upside.len(),
        "evidence gate partitioned manifest"
    );

    // (5) Optimize over the core view only
    let core_items: Vec<Item> = core.iter().map(|&i| items[i].clone()).collect();
    let result = optimize_bid(&core_items, config, &opts.optimizer, &opts.constraints)?;

    sink.write(&EvidenceRecord::new(
        None,
        "optimize:bid",
        result.meets_constraints,
        json!({
            "roi_target": result.roi_target,
            "risk_threshold": result.risk_threshold,
            "min_cash_60d": result.min_cash_60d,
            "min_cash_60d_p5": result.min_cash_60d_p5,
            "sims": result.sims,
            "lo": opts.optimizer.lo,
            "hi": opts.optimizer.hi,
            "tol": opts.optimizer.tol,
            "max_iter": opts.optimizer.max_iter,
            "seed": opts.optimizer.seed,
            "var_alpha": config.decision.var_alpha,
            "payout_lag_days": config.fees.payout_lag_days,
            "items_in_core": result.items,
            "bid": result.bid,
            "roi_p5": result.roi_p5,
            "roi_p50": result.roi_p50,
            "roi_p95": result.roi_p95,
            "prob_roi_ge_target": result.prob_roi_ge_target,
            "expected_cash_60d": result.expected_cash_60d,
            "cash_60d_p5": result.cash_60d_p5,
            "throughput_ok": result.throughput.throughput_ok,
            "iterations": result.iterations,
            "meets_constraints": result.meets_constraints,
        }),
    ));

    Ok(LotReport {
        items,
        gates,
        core,
        upside,
        result,
    })
}

/// Export the enriched item table: inputs, derived estimates, and the
/// gate verdict columns downstream report renderers key on.
pub fn save_enriched_csv(report: &LotReport, path: &Path) -> LotResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "sku_local",
        "title",
        "brand",
        "category",
        "condition",
        "quantity",
        "hazmat",
        "asin",
        "upc",
        "ean",
        "canonical_id",
        "est_price_mu",
        "est_price_sigma",
        "est_price_p5",
        "est_price_p50",
        "est_price_p95",
        "est_price_p5_floored",
        "sell_p60",
        "sell_hazard_daily",
        "sell_ptm_z",
        "gate_passed",
        "gate_core_included",
        "gate_reason",
        "gate_tags",
    ])?;

    let fmt = |v: Option<f64>| v.map(|x| format!("{:.6}", x)).unwrap_or_default();

    for (item, gate) in report.items.iter().zip(&report.gates) {
        wtr.write_record(&[
            item.sku_local.clone(),
            item.title.clone(),
            item.brand.clone(),
            item.category.clone(),
            item.condition.label().to_string(),
            item.quantity.to_string(),
            item.hazmat.to_string(),
            item.asin.clone().unwrap_or_default(),
            item.upc.clone().unwrap_or_default(),
            item.ean.clone().unwrap_or_default(),
            item.canonical_id.clone().unwrap_or_default(),
            fmt(item.est_price_mu),
            fmt(item.est_price_sigma),
            fmt(item.est_price_p5),
            fmt(item.est_price_p50),
            fmt(item.est_price_p95),
            item.est_price_p5_floored.to_string(),
            fmt(item.sell_p60),
            fmt(item.sell_hazard_daily),
            fmt(item.sell_ptm_z),
            gate.passed.to_string(),
            gate.core_included.to_string(),
            gate.reason.clone(),
            gate.tags.join(","),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Record `ok=false` evidence for rows the coercion boundary refused.
pub fn record_rejected(
    rejected: &[crate::item::RejectedRow],
    sink: &dyn EvidenceSink,
) {
    for row in rejected {
        sink.write(&EvidenceRecord::new(
            Some(&row.sku_local),
            "item:coerce",
            false,
            json!({ "reason": row.reason.clone() }),
        ));
    }
}
