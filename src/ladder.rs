//! Pricing ladder: staged markdowns over the horizon.
//!
//! Generates up to three non-overlapping day segments (base, discount,
//! clearance) and composes per-segment exponential sell-through into a
//! total probability by telescoping survival across segments.

use serde::Serialize;

use crate::config::LadderConfig;

/// One constant-price phase of the schedule.
#[derive(Debug, Clone, Serialize)]
pub struct LadderSegment {
    pub day_from: u32,
    /// Inclusive last day of the segment
    pub day_to: u32,
    pub days: u32,
    pub price: f64,
    /// Hazard scale at this price relative to the base price
    pub hazard_multiplier: f64,
}

/// Build the markdown schedule for a base price over the horizon.
///
/// Segments never overlap; the discount phase is clipped to the horizon
/// and the clearance phase only exists when the horizon reaches it.
pub fn pricing_ladder(base_price: f64, horizon_days: u32, config: &LadderConfig) -> Vec<LadderSegment> {
    let discount_price = base_price * (1.0 - config.discount_rate);
    let clearance_price = base_price * config.clearance_fraction;

    let mut segments = Vec::new();

    if config.discount_day > 0 {
        let to = config.discount_day - 1;
        segments.push(LadderSegment {
            day_from: 0,
            day_to: to,
            days: to + 1,
            price: base_price,
            hazard_multiplier: 1.0,
        });
    }

    if config.clearance_day > config.discount_day && horizon_days >= config.discount_day {
        let to = (config.clearance_day - 1).min(horizon_days);
        segments.push(LadderSegment {
            day_from: config.discount_day,
            day_to: to,
            days: to - config.discount_day + 1,
            price: discount_price,
            hazard_multiplier: (discount_price / base_price).powf(config.ladder_elasticity),
        });
    }

    if horizon_days >= config.clearance_day {
        segments.push(LadderSegment {
            day_from: config.clearance_day,
            day_to: horizon_days,
            days: horizon_days - config.clearance_day + 1,
            price: clearance_price,
            hazard_multiplier: (clearance_price / base_price).powf(config.ladder_elasticity),
        });
    }

    segments
}

/// Expected sell-through across the schedule.
///
/// Each segment's hazard is the base hazard scaled by
/// (price/reference)^elasticity; the total is the telescoped sum
/// Σ S_prev · (1 − exp(−λ_seg · days_seg)), capped at 1.
pub fn ladder_sellthrough(
    segments: &[LadderSegment],
    base_hazard: f64,
    elasticity: f64,
    reference_price: Option<f64>,
) -> f64 {
    if segments.is_empty() {
        return 0.0;
    }
    let reference = reference_price.unwrap_or(segments[0].price);

    let mut total = 0.0;
    let mut survival = 1.0;
    for segment in segments {
        let price_ratio = segment.price / reference;
        let hazard = base_hazard * price_ratio.powf(elasticity);
        let sell_prob = 1.0 - (-hazard * f64::from(segment.days)).exp();

        total += survival * sell_prob;
        survival *= 1.0 - sell_prob;
    }

    total.min(1.0)
}

/// Ladder-adjusted sell-through for one item, given its base price and
/// flat daily hazard. None when either input is unusable.
pub fn ladder_sell_p60(
    base_price: Option<f64>,
    base_hazard: Option<f64>,
    horizon_days: u32,
    config: &LadderConfig,
) -> Option<f64> {
    let price = base_price.filter(|p| *p > 0.0)?;
    let hazard = base_hazard.filter(|h| h.is_finite() && *h >= 0.0)?;
    let segments = pricing_ladder(price, horizon_days, config);
    Some(ladder_sellthrough(
        &segments,
        hazard,
        config.ladder_elasticity,
        None,
    ))
}
