use lotbid::config::Config;
use lotbid::item::Item;
use lotbid::optimize::OptimizerParams;
use lotbid::simulate::CashConstraints;
use lotbid::stress::{self, StressScenario};

fn priced_item(sku: &str, mu: f64, sigma: f64, p60: f64) -> Item {
    let mut item = Item::new(sku);
    item.est_price_mu = Some(mu);
    item.est_price_sigma = Some(sigma);
    item.est_price_p50 = Some(mu);
    item.sell_p60 = Some(p60);
    item
}

fn lot() -> Vec<Item> {
    vec![
        priced_item("sku-1", 100.0, 10.0, 0.9),
        priced_item("sku-2", 60.0, 6.0, 0.85),
        priced_item("sku-3", 40.0, 4.0, 0.8),
    ]
}

fn params() -> OptimizerParams {
    let mut p = OptimizerParams::new(0.0, 500.0);
    p.sims = 500;
    p
}

#[test]
fn default_set_runs_all_scenarios_in_order() {
    let summaries = stress::run_stress(
        &lot(),
        &Config::default(),
        &params(),
        &CashConstraints::default(),
        &StressScenario::all(),
    )
    .expect("stress run");

    let names: Vec<&str> = summaries.iter().map(|s| s.scenario.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "baseline",
            "price_down_15",
            "returns_up_30",
            "shipping_up_20",
            "sell_p60_down_10"
        ]
    );
}

#[test]
fn price_shock_lowers_the_recommended_bid() {
    let config = Config::default();
    let scenarios = [StressScenario::Baseline, StressScenario::PriceDown15];
    let summaries = stress::run_stress(
        &lot(),
        &config,
        &params(),
        &CashConstraints::default(),
        &scenarios,
    )
    .expect("stress run");

    let baseline = &summaries[0];
    let shocked = &summaries[1];
    assert!(baseline.meets_constraints, "baseline lot should be biddable");
    assert!(
        shocked.recommended_bid <= baseline.recommended_bid,
        "15% price haircut cannot raise the bid: {} vs {}",
        shocked.recommended_bid,
        baseline.recommended_bid
    );
}

#[test]
fn scenario_shocks_do_not_leak_into_inputs() {
    let items = lot();
    let config = Config::default();
    let (shocked_items, shocked_config) =
        stress::apply_scenario(&items, &config, StressScenario::PriceDown15);

    assert!((shocked_items[0].est_price_mu.unwrap() - 85.0).abs() < 1e-9);
    // The originals are untouched
    assert!((items[0].est_price_mu.unwrap() - 100.0).abs() < 1e-9);
    assert_eq!(
        shocked_config.fees.return_rate,
        config.fees.return_rate
    );
}

#[test]
fn returns_shock_caps_at_one() {
    let mut config = Config::default();
    config.fees.return_rate = 0.9;
    let (_, shocked) = stress::apply_scenario(&lot(), &config, StressScenario::ReturnsUp30);
    assert!((shocked.fees.return_rate - 1.0).abs() < 1e-12);
}

#[test]
fn sell_shock_clamps_to_unit_interval() {
    let mut items = lot();
    items[0].sell_p60 = Some(1.0);
    let (shocked, _) =
        stress::apply_scenario(&items, &Config::default(), StressScenario::SellP60Down10);
    assert!((shocked[0].sell_p60.unwrap() - 0.9).abs() < 1e-12);
}

#[test]
fn scenario_names_parse() {
    assert_eq!(
        StressScenario::parse("price_down_15"),
        Some(StressScenario::PriceDown15)
    );
    assert_eq!(StressScenario::parse(" baseline "), Some(StressScenario::Baseline));
    assert_eq!(StressScenario::parse("nonsense"), None);
}

#[test]
fn summary_export_writes_both_formats() {
    let dir = tempfile::tempdir().expect("tempdir");
    let csv_path = dir.path().join("stress.csv");
    let json_path = dir.path().join("stress.json");

    let summaries = stress::run_stress(
        &lot(),
        &Config::default(),
        &params(),
        &CashConstraints::default(),
        &[StressScenario::Baseline],
    )
    .expect("stress run");

    stress::save_stress_csv(&summaries, &csv_path).expect("csv");
    stress::save_stress_json(&summaries, &json_path).expect("json");

    let csv_text = std::fs::read_to_string(&csv_path).expect("read csv");
    assert!(csv_text.lines().count() == 2, "header plus one scenario row");
    assert!(csv_text.contains("baseline"));

    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).expect("read json"))
            .expect("valid json");
    assert_eq!(parsed.as_array().map(|a| a.len()), Some(1));
}
