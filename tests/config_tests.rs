use approx::assert_relative_eq;

use lotbid::config::{Config, HazmatPolicy, SellModelKind};
use lotbid::error::LotError;

#[test]
fn defaults_match_the_documented_policy() {
    let config = Config::default();
    assert_relative_eq!(config.decision.min_roi_target, 1.25);
    assert_relative_eq!(config.decision.risk_threshold, 0.80);
    assert_eq!(config.decision.sellthrough_horizon_days, 60);
    assert_relative_eq!(config.decision.cashfloor, 0.0);
    assert_relative_eq!(config.decision.var_alpha, 0.20);

    assert_relative_eq!(config.fees.marketplace_fee_pct, 0.12);
    assert_relative_eq!(config.fees.payment_fee_pct, 0.03);
    assert_relative_eq!(config.fees.per_order_fee_fixed, 0.40);
    assert_relative_eq!(config.fees.return_rate, 0.08);
    assert_relative_eq!(config.fees.salvage_frac, 0.50);
    assert_eq!(config.fees.payout_lag_days, 14);

    assert_eq!(config.evidence.min_comps_base, 3);
    assert_eq!(config.evidence.min_comps_max, 5);
    assert!(config.evidence.require_secondary);
    assert_eq!(config.evidence.lookback_days, 180);

    assert_relative_eq!(config.throughput.mins_per_unit, 5.0);
    assert_relative_eq!(config.throughput.capacity_mins_per_day, 480.0);

    assert_eq!(config.gating.hazmat_policy, HazmatPolicy::Review);
    assert_relative_eq!(config.triangulation.cv_fallback, 0.20);
    assert_relative_eq!(config.triangulation.priors.keepa, 0.50);
    assert_relative_eq!(config.triangulation.priors.ebay, 0.35);
    assert_relative_eq!(config.triangulation.priors.other, 0.15);

    assert_eq!(config.sell.model, SellModelKind::Proxy);
    assert_relative_eq!(config.sell.rank_a, 500.0);
    assert_relative_eq!(config.sell.rank_b, -0.80);
    assert_relative_eq!(config.sell.beta_price, 0.8);
    assert_relative_eq!(config.sell.hazard_cap, 1.0);
    assert_relative_eq!(config.sell.condition_velocity_factor.for_parts, 0.50);

    assert!(!config.ladder.enabled);
    assert_relative_eq!(config.ladder.ladder_elasticity, -0.5);
    assert!(config.validate().is_ok());
}

#[test]
fn partial_toml_keeps_the_other_defaults() {
    let config = Config::from_toml_str(
        r#"
[decision]
min_roi_target = 1.5

[gating]
gated_brands = ["apple", "dyson"]
hazmat_policy = "exclude"

[sell]
model = "loglogistic"
survival_alpha = 45.0
survival_beta = 1.5
"#,
    )
    .expect("parse");

    assert_relative_eq!(config.decision.min_roi_target, 1.5);
    // Untouched sections and fields keep their defaults
    assert_relative_eq!(config.decision.risk_threshold, 0.80);
    assert_relative_eq!(config.fees.marketplace_fee_pct, 0.12);
    assert_eq!(config.gating.hazmat_policy, HazmatPolicy::Exclude);
    assert!(config.gating.is_gated_brand("Apple"));
    assert!(config.gating.is_gated_brand("  DYSON  "));
    assert!(!config.gating.is_gated_brand("sony"));
    assert_eq!(config.sell.model, SellModelKind::Loglogistic);
    assert_relative_eq!(config.sell.survival_alpha, 45.0);
}

#[test]
fn unknown_keys_are_ignored() {
    let config = Config::from_toml_str(
        r#"
some_future_section = { x = 1 }

[decision]
min_roi_target = 1.3
not_a_real_knob = true
"#,
    )
    .expect("lenient parse");
    assert_relative_eq!(config.decision.min_roi_target, 1.3);
}

#[test]
fn invalid_values_fail_fast() {
    let negative_fee = Config::from_toml_str("[fees]\nmarketplace_fee_pct = -0.05\n");
    assert!(matches!(negative_fee, Err(LotError::Config(_))));

    let bad_risk = Config::from_toml_str("[decision]\nrisk_threshold = 1.5\n");
    assert!(matches!(bad_risk, Err(LotError::Config(_))));

    let zero_horizon = Config::from_toml_str("[decision]\nsellthrough_horizon_days = 0\n");
    assert!(matches!(zero_horizon, Err(LotError::Config(_))));

    let bad_survival = Config::from_toml_str(
        "[sell]\nmodel = \"loglogistic\"\nsurvival_alpha = 0.0\n",
    );
    assert!(matches!(bad_survival, Err(LotError::Config(_))));
}

#[test]
fn seasonality_lookup_falls_back() {
    let config = Config::from_toml_str(
        r#"
[sell]
seasonality_default = 0.9

[sell.seasonality]
toys = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.2, 1.5, 2.0]
"#,
    )
    .expect("parse");

    assert_relative_eq!(config.sell.seasonality_factor("toys", 12), 2.0);
    assert_relative_eq!(config.sell.seasonality_factor("toys", 1), 1.0);
    // Unlisted category: default factor
    assert_relative_eq!(config.sell.seasonality_factor("books", 12), 0.9);
}

#[test]
fn condition_factor_tables() {
    let config = Config::default();
    use lotbid::condition::Condition;
    let velocity = &config.sell.condition_velocity_factor;
    assert_relative_eq!(velocity.get(Condition::New), 1.00);
    assert_relative_eq!(velocity.get(Condition::UsedFair), 0.85);
    assert_relative_eq!(velocity.get(Condition::Unknown), 0.90);

    let price = &config.sell.condition_price_factor;
    assert_relative_eq!(price.get(Condition::LikeNew), 0.95);
    assert_relative_eq!(price.get(Condition::ForParts), 0.40);
}
