//! Proxy sell-through model.
//!
//! Per-item daily hazard from market rank, offer depth, and the listing
//! price's standardized deviation from the modelled market mean, then
//! exponential survival out to the horizon. Condition and seasonality
//! multipliers scale the hazard after the cap, matching the calibration
//! the rank power-law was fit under.

use serde_json::json;

use crate::config::SellConfig;
use crate::evidence::{EvidenceRecord, EvidenceSink};
use crate::item::Item;

/// How the list price is chosen before computing the price-to-market z.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPriceMode {
    /// Triangulated P50, falling back to the mean (default)
    P50,
    /// Triangulated mean
    Mu,
    /// Manual price column, falling back to P50 then the mean
    Manual,
}

/// Knobs for one sell-estimation pass.
#[derive(Debug, Clone)]
pub struct SellParams {
    pub horizon_days: u32,
    pub list_price_mode: ListPriceMode,
    pub list_price_multiplier: f64,
    /// Calendar month 1..=12 for seasonality lookups
    pub month: u32,
    pub cv_fallback: f64,
}

impl SellParams {
    pub fn new(horizon_days: u32, month: u32, cv_fallback: f64) -> Self {
        SellParams {
            horizon_days,
            list_price_mode: ListPriceMode::P50,
            list_price_multiplier: 1.0,
            month,
            cv_fallback,
        }
    }
}

/// Price-to-market standardized deviation.
///
/// Missing or non-positive σ falls back to `cv_fallback·µ` floored at
/// 1e-6; without a usable µ the z is 0.
pub fn ptm_z(
    list_price: Option<f64>,
    mu: Option<f64>,
    sigma: Option<f64>,
    cv_fallback: f64,
) -> f64 {
    let mu = match mu {
        Some(m) if m > 0.0 && m.is_finite() => m,
        _ => return 0.0,
    };
    let sigma = match sigma {
        Some(s) if s > 0.0 && s.is_finite() => s,
        _ => (cv_fallback * mu).max(1e-6),
    };
    let lp = list_price.unwrap_or(mu);
    (lp - mu) / sigma
}

/// Hazard multiplier from the price-to-market z.
///
/// Over-market prices slow sales via exp(−β·z); under-market prices get
/// the symmetric boost, capped at 3x to avoid extremes.
pub fn price_factor_from_z(z: f64, beta: f64) -> f64 {
    if z >= 0.0 {
        (-beta * z).exp()
    } else {
        (-beta * z).exp().min(3.0)
    }
}

/// Market daily sales from rank via the bounded power-law a·rank^b.
pub fn daily_sales_from_rank(rank: f64, config: &SellConfig) -> f64 {
    let r = rank.clamp(config.min_rank, config.max_rank);
    (config.rank_a * r.powf(config.rank_b)).max(0.0)
}

/// Convert market daily sales into a per-item hazard, saturating by the
/// number of competing offers and the price factor, capped.
pub fn hazard_per_item(daily_sales_market: f64, offers: u32, price_factor: f64, cap: f64) -> f64 {
    let offers = offers.max(1);
    let lam = (daily_sales_market / f64::from(offers)) * price_factor.max(0.0);
    lam.min(cap)
}

fn list_price_for(item: &Item, params: &SellParams) -> Option<f64> {
    let base = match params.list_price_mode {
        ListPriceMode::P50 => item.est_price_p50.or(item.est_price_mu),
        ListPriceMode::Mu => item.est_price_mu,
        ListPriceMode::Manual => item
            .manual_price
            .or(item.est_price_p50)
            .or(item.est_price_mu),
    };
    base.map(|b| b * params.list_price_multiplier)
}

/// Estimate `sell_p60` and the daily hazard for every item, writing one
/// `sell:estimate` evidence record per item.
pub fn estimate_sell_p60(
    items: &mut [Item],
    config: &SellConfig,
    params: &SellParams,
    sink: &dyn EvidenceSink,
) {
    for item in items.iter_mut() {
        let list_price = list_price_for(item, params);
        let rank = item.keepa_salesrank_med.filter(|r| *r > 0.0);
        let offers = item.keepa_offers_count.map_or(1, |o| o.max(1));

        let z = ptm_z(
            list_price,
            item.est_price_mu,
            item.est_price_sigma,
            params.cv_fallback,
        );
        let pf = price_factor_from_z(z, config.beta_price);

        let daily_sales_market = match rank {
            Some(r) => daily_sales_from_rank(r, config),
            None => config.baseline_daily_sales,
        };

        let lam = hazard_per_item(daily_sales_market, offers, pf, config.hazard_cap);
        let condition_factor = config.condition_velocity_factor.get(item.condition);
        let seasonality_factor = config.seasonality_factor(&item.category, params.month);
        let lam_adjusted = lam * condition_factor * seasonality_factor;

        let p60 = (1.0 - (-lam_adjusted * f64::from(params.horizon_days)).exp()).clamp(0.0, 1.0);

        item.sell_p60 = Some(p60);
        item.sell_hazard_daily = Some(lam_adjusted);
        item.sell_ptm_z = Some(z);

        sink.write(&EvidenceRecord::new(
            Some(&item.sku_local),
            "sell:estimate",
            true,
            json!({
                "days": params.horizon_days,
                "list_price": list_price,
                "list_price_multiplier": params.list_price_multiplier,
                "rank": rank,
                "offers": offers,
                "mu": item.est_price_mu,
                "sigma": item.est_price_sigma,
                "ptm_z": z,
                "price_beta": config.beta_price,
                "daily_sales_market": daily_sales_market,
                "hazard_daily_raw": lam,
                "hazard_daily_adjusted": lam_adjusted,
                "condition": item.condition.label(),
                "condition_factor": condition_factor,
                "seasonality_factor": seasonality_factor,
                "p60": p60,
            }),
        ));
    }
}
