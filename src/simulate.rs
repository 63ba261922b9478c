//! Monte-Carlo lot simulator and feasibility predicate.
//!
//! Draws per-item sale prices from Normal(µ, σ) clipped at zero and sale
//! indicators from Bernoulli(sell_p60), nets out fees and per-order
//! costs, credits salvage for unsold units, and aggregates revenue, cash
//! within the horizon, and ROI per simulation. A fixed seed on the named
//! PRNG makes single-threaded runs bit-reproducible.
//!
//! Returns are applied to sold revenue as an expectation multiplier, not
//! a second draw; callers relying on tail risk should be aware the
//! variance of returns is not modelled.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Bernoulli, Distribution, Normal};
use serde::Serialize;

use crate::config::Config;
use crate::item::Item;

pub const DEFAULT_SIMS: usize = 2000;
pub const DEFAULT_SEED: u64 = 1337;

/// Items with a fused mean at or below this never enter the simulation.
const MIN_MU_FOR_ITEM: f64 = 1e-6;

/// Outcome of the operational throughput gate.
#[derive(Debug, Clone, Serialize)]
pub struct ThroughputCheck {
    pub mins_per_unit: f64,
    pub capacity_mins_per_day: f64,
    pub total_minutes_required: f64,
    pub available_minutes: f64,
    pub throughput_ok: bool,
}

/// Everything one feasibility evaluation produced.
///
/// The `*_by_sim` arrays are cleared by [`SimulationResult::without_samples`]
/// before external serialization unless the caller asked for samples.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub bid: f64,
    pub sims: usize,
    /// Core items that survived the validity filter
    pub items: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub revenue_by_sim: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cash_60d_by_sim: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roi_by_sim: Vec<f64>,
    pub roi_p5: f64,
    pub roi_p50: f64,
    pub roi_p95: f64,
    pub cash_60d_p5: f64,
    pub cash_60d_p50: f64,
    pub cash_60d_p95: f64,
    /// None when the core set was empty
    pub prob_roi_ge_target: Option<f64>,
    pub expected_cash_60d: f64,
    pub meets_constraints: bool,
    // Constraint echoes, for audit
    pub roi_target: f64,
    pub risk_threshold: f64,
    /// Effective cash floor: caller override or the configured cashfloor
    pub min_cash_60d: f64,
    pub min_cash_60d_p5: Option<f64>,
    pub throughput: ThroughputCheck,
    /// Bisection iterations consumed (0 for a bare simulation)
    pub iterations: u32,
    pub timestamp: Option<String>,
}

impl SimulationResult {
    /// Strip the per-sim arrays for compact external payloads.
    pub fn without_samples(mut self) -> SimulationResult {
        self.revenue_by_sim = Vec::new();
        self.cash_60d_by_sim = Vec::new();
        self.roi_by_sim = Vec::new();
        self
    }
}

/// Optional cash constraints supplied per call; anything omitted falls
/// back to configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct CashConstraints {
    /// Overrides the configured cashfloor when present
    pub min_cash_60d: Option<f64>,
    /// VaR-style floor on the 5th percentile of horizon cash
    pub min_cash_60d_p5: Option<f64>,
}

/// Linear-interpolation percentile on a pre-sorted slice, p in [0, 1].
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let idx = p * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = idx - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    v
}

/// Operational throughput gate over the core set.
pub fn throughput_check(items: &[Item], config: &Config) -> ThroughputCheck {
    let units: u32 = items.iter().map(|i| i.quantity.max(1)).sum();
    let total_minutes_required = f64::from(units) * config.throughput.mins_per_unit;
    let available_minutes = config.throughput.capacity_mins_per_day
        * f64::from(config.decision.sellthrough_horizon_days);
    ThroughputCheck {
        mins_per_unit: config.throughput.mins_per_unit,
        capacity_mins_per_day: config.throughput.capacity_mins_per_day,
        total_minutes_required,
        available_minutes,
        throughput_ok: total_minutes_required <= available_minutes,
    }
}

struct ValidItem {
    price: Normal<f64>,
    sold: Bernoulli,
}

/// Apply the validity filter: usable µ, imputed σ, clamped sell_p60.
fn valid_items(items: &[Item]) -> Vec<ValidItem> {
    items
        .iter()
        .filter_map(|item| {
            let mu = item.est_price_mu.filter(|m| m.is_finite())?;
            if mu <= MIN_MU_FOR_ITEM {
                return None;
            }
            // Missing or unusable sigma imputes the 20% CV fallback
            let sigma = match item.est_price_sigma {
                Some(s) if s.is_finite() && s >= 0.0 => s,
                _ => 0.20 * mu,
            };
            // Missing sell probability is conservatively zero
            let p = item
                .sell_p60
                .filter(|p| p.is_finite())
                .unwrap_or(0.0)
                .clamp(0.0, 1.0);

            let price = Normal::new(mu, sigma).ok()?;
            let sold = Bernoulli::new(p).ok()?;
            Some(ValidItem { price, sold })
        })
        .collect()
}

/// Run the Monte-Carlo simulation for one candidate bid.
///
/// Constraint fields are left at their defaults; [`feasible`] fills them.
/// An empty core set yields the degenerate all-zeros result.
pub fn simulate_lot_outcomes(
    items: &[Item],
    bid: f64,
    sims: usize,
    seed: u64,
    config: &Config,
) -> SimulationResult {
    let valid = valid_items(items);
    let n = valid.len();

    let fees = &config.fees;
    let throughput = throughput_check(items, config);

    if n == 0 {
        return SimulationResult {
            bid,
            sims,
            items: 0,
            revenue_by_sim: vec![0.0; sims],
            cash_60d_by_sim: vec![0.0; sims],
            roi_by_sim: vec![0.0; sims],
            roi_p5: 0.0,
            roi_p50: 0.0,
            roi_p95: 0.0,
            cash_60d_p5: 0.0,
            cash_60d_p50: 0.0,
            cash_60d_p95: 0.0,
            prob_roi_ge_target: None,
            expected_cash_60d: 0.0,
            meets_constraints: false,
            roi_target: config.decision.min_roi_target,
            risk_threshold: config.decision.risk_threshold,
            min_cash_60d: config.decision.cashfloor,
            min_cash_60d_p5: None,
            throughput,
            iterations: 0,
            timestamp: None,
        };
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let fee_pct = fees.marketplace_fee_pct + fees.payment_fee_pct;
    let per_order_cost = fees.per_order_fee_fixed
        + fees.shipping_per_order
        + fees.packaging_per_order
        + fees.refurb_per_order;
    let total_cost = bid + fees.lot_fixed_cost;

    let mut revenue_by_sim = vec![0.0f64; sims];
    let mut cash_by_sim = vec![0.0f64; sims];

    for s in 0..sims {
        let mut revenue = 0.0;
        let mut cash = 0.0;
        for item in &valid {
            let price = item.price.sample(&mut rng).max(0.0);
            let sold = item.sold.sample(&mut rng);

            if sold {
                let net = (price * (1.0 - fee_pct) - per_order_cost) * (1.0 - fees.return_rate);
                let net = net.max(0.0);
                revenue += net;
                cash += net;
            } else {
                let salvage = price * fees.salvage_frac * (1.0 - fees.salvage_fee_pct);
                revenue += salvage.max(0.0);
            }
        }
        revenue_by_sim[s] = revenue;
        cash_by_sim[s] = cash;
    }

    let roi_by_sim: Vec<f64> = revenue_by_sim
        .iter()
        .map(|r| if total_cost > 0.0 { r / total_cost } else { 0.0 })
        .collect();

    let roi_sorted = sorted_copy(&roi_by_sim);
    let cash_sorted = sorted_copy(&cash_by_sim);

    SimulationResult {
        bid,
        sims,
        items: n,
        roi_p5: percentile(&roi_sorted, 0.05),
        roi_p50: percentile(&roi_sorted, 0.50),
        roi_p95: percentile(&roi_sorted, 0.95),
        cash_60d_p5: percentile(&cash_sorted, 0.05),
        cash_60d_p50: percentile(&cash_sorted, 0.50),
        cash_60d_p95: percentile(&cash_sorted, 0.95),
        revenue_by_sim,
        cash_60d_by_sim: cash_by_sim,
        roi_by_sim,
        prob_roi_ge_target: None,
        expected_cash_60d: 0.0,
        meets_constraints: false,
        roi_target: config.decision.min_roi_target,
        risk_threshold: config.decision.risk_threshold,
        min_cash_60d: config.decision.cashfloor,
        min_cash_60d_p5: None,
        throughput,
        iterations: 0,
        timestamp: None,
    }
}

/// Evaluate the full feasibility predicate at one bid.
///
/// Feasible iff P(ROI ≥ target) clears the risk threshold, mean horizon
/// cash clears the effective floor, the optional P5 cash floor holds,
/// and the throughput gate passes.
pub fn feasible(
    items: &[Item],
    bid: f64,
    sims: usize,
    seed: u64,
    config: &Config,
    constraints: &CashConstraints,
) -> (bool, SimulationResult) {
    let mut mc = simulate_lot_outcomes(items, bid, sims, seed, config);

    let roi_target = config.decision.min_roi_target;
    let prob = if mc.items == 0 {
        None
    } else {
        let hits = mc.roi_by_sim.iter().filter(|r| **r >= roi_target).count();
        Some(hits as f64 / mc.roi_by_sim.len() as f64)
    };

    let cash_mean = if mc.cash_60d_by_sim.is_empty() {
        0.0
    } else {
        mc.cash_60d_by_sim.iter().sum::<f64>() / mc.cash_60d_by_sim.len() as f64
    };

    let min_cash_60d = constraints
        .min_cash_60d
        .unwrap_or(config.decision.cashfloor);

    let ok = prob.map_or(false, |p| p >= config.decision.risk_threshold)
        && cash_mean >= min_cash_60d
        && constraints
            .min_cash_60d_p5
            .map_or(true, |floor| mc.cash_60d_p5 >= floor)
        && mc.throughput.throughput_ok;

    mc.prob_roi_ge_target = prob;
    mc.expected_cash_60d = cash_mean;
    mc.meets_constraints = ok;
    mc.min_cash_60d = min_cash_60d;
    mc.min_cash_60d_p5 = constraints.min_cash_60d_p5;

    (ok, mc)
}
