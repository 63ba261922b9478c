//! Log-logistic sell-through model.
//!
//! Alternative to the proxy hazard: a parametric survival curve whose
//! scale stretches for overpriced, poor-condition, or out-of-season
//! items. The implied daily hazard is recorded alongside so downstream
//! consumers see the same fields either model writes.

use serde_json::json;

use crate::config::SellConfig;
use crate::evidence::{EvidenceRecord, EvidenceSink};
use crate::item::Item;
use crate::sell::{ptm_z, SellParams};

/// P(sold within `days`) under a log-logistic survival curve:
/// (t/α)^β / (1 + (t/α)^β). Callers guarantee α, β > 0 via config
/// validation.
pub fn p_sold_within(days: f64, alpha: f64, beta: f64) -> f64 {
    if days <= 0.0 {
        return 0.0;
    }
    let t_ratio_beta = (days / alpha).powf(beta);
    (t_ratio_beta / (1.0 + t_ratio_beta)).clamp(0.0, 1.0)
}

/// Daily hazard that would reproduce `p_sold` under exponential
/// survival: λ = −ln(1−p) / t.
pub fn implied_hazard(p_sold: f64, days: f64) -> f64 {
    if p_sold <= 0.0 {
        return 0.0;
    }
    if p_sold >= 1.0 {
        return f64::INFINITY;
    }
    -(1.0 - p_sold).ln() / days
}

/// Estimate sell-through with the log-logistic model, writing one
/// `sell:survival` evidence record per item.
///
/// Per-item scale: α · α_category · exp(0.1·max(z,0)) divided by the
/// condition × seasonality velocity (slower buckets stretch the curve).
pub fn estimate_sell_survival(
    items: &mut [Item],
    config: &SellConfig,
    params: &SellParams,
    sink: &dyn EvidenceSink,
) {
    let days = f64::from(params.horizon_days);

    for item in items.iter_mut() {
        let ref_price = item.est_price_p50.or(item.est_price_mu);
        let z = ptm_z(
            ref_price,
            item.est_price_mu,
            item.est_price_sigma,
            params.cv_fallback,
        );

        let condition_factor = config.condition_velocity_factor.get(item.condition);
        let seasonality_factor = config.seasonality_factor(&item.category, params.month);
        let alpha_scale_category = config.alpha_scale(&item.category);

        // Overpriced items stretch the scale; underpriced ones do not shrink it
        let alpha_scaling = (0.1 * z.max(0.0)).exp();
        let velocity = (condition_factor * seasonality_factor).max(1e-6);
        let alpha_item = config.survival_alpha * alpha_scale_category * alpha_scaling / velocity;
        let beta_item = config.survival_beta;

        let p60 = p_sold_within(days, alpha_item, beta_item);
        let hazard_daily = implied_hazard(p60, days);

        item.sell_p60 = Some(p60);
        item.sell_hazard_daily = Some(hazard_daily);
        item.sell_ptm_z = Some(z);

        sink.write(&EvidenceRecord::new(
            Some(&item.sku_local),
            "sell:survival",
            true,
            json!({
                "days": params.horizon_days,
                "model": "log-logistic",
                "alpha_base": config.survival_alpha,
                "beta_base": config.survival_beta,
                "alpha_used": alpha_item,
                "beta_used": beta_item,
                "ref_price": ref_price,
                "ptm_z": z,
                "alpha_scaling": alpha_scaling,
                "alpha_scale_category": alpha_scale_category,
                "condition": item.condition.label(),
                "condition_velocity_factor": condition_factor,
                "seasonality_factor": seasonality_factor,
                "p60": p60,
                "hazard_daily": hazard_daily,
            }),
        ));
    }
}
