use approx::assert_relative_eq;

use lotbid::config::LadderConfig;
use lotbid::ladder::{ladder_sell_p60, ladder_sellthrough, pricing_ladder, LadderSegment};

#[test]
fn default_schedule_has_three_phases() {
    let config = LadderConfig::default();
    let segments = pricing_ladder(100.0, 60, &config);
    assert_eq!(segments.len(), 3);

    assert_eq!((segments[0].day_from, segments[0].day_to), (0, 20));
    assert_relative_eq!(segments[0].price, 100.0);
    assert_relative_eq!(segments[0].hazard_multiplier, 1.0);

    assert_eq!((segments[1].day_from, segments[1].day_to), (21, 44));
    assert_relative_eq!(segments[1].price, 90.0);
    assert!(segments[1].hazard_multiplier > 1.0, "markdown speeds the sale");

    assert_eq!((segments[2].day_from, segments[2].day_to), (45, 60));
    assert_relative_eq!(segments[2].price, 50.0);

    // Segments tile the horizon without overlap
    assert_eq!(segments[0].day_to + 1, segments[1].day_from);
    assert_eq!(segments[1].day_to + 1, segments[2].day_from);
}

#[test]
fn short_horizon_drops_the_clearance_phase() {
    let config = LadderConfig::default();
    let segments = pricing_ladder(100.0, 40, &config);
    assert_eq!(segments.len(), 2, "no clearance before day 45");
    assert_eq!(segments[1].day_to, 40);
}

#[test]
fn flat_segment_matches_exponential_survival() {
    let segments = vec![LadderSegment {
        day_from: 0,
        day_to: 59,
        days: 60,
        price: 100.0,
        hazard_multiplier: 1.0,
    }];
    let p = ladder_sellthrough(&segments, 0.02, -0.5, None);
    assert_relative_eq!(p, 1.0 - (-0.02f64 * 60.0).exp(), epsilon = 1e-12);
}

#[test]
fn markdowns_raise_total_sellthrough() {
    let config = LadderConfig::default();
    let segments = pricing_ladder(100.0, 60, &config);
    let laddered = ladder_sellthrough(&segments, 0.02, config.ladder_elasticity, None);

    // The same day-splits at a constant price: strictly less sell-through
    let flat: Vec<LadderSegment> = segments
        .iter()
        .map(|s| LadderSegment {
            price: 100.0,
            hazard_multiplier: 1.0,
            ..s.clone()
        })
        .collect();
    let flat_total = ladder_sellthrough(&flat, 0.02, config.ladder_elasticity, None);

    assert!(
        laddered > flat_total,
        "discounting must help: laddered {} vs flat {}",
        laddered,
        flat_total
    );
    assert!(laddered <= 1.0);
}

#[test]
fn zero_hazard_sells_nothing() {
    let config = LadderConfig::default();
    let segments = pricing_ladder(100.0, 60, &config);
    assert_relative_eq!(
        ladder_sellthrough(&segments, 0.0, config.ladder_elasticity, None),
        0.0,
        epsilon = 1e-12
    );
}

#[test]
fn huge_hazard_caps_at_one() {
    let config = LadderConfig::default();
    let segments = pricing_ladder(100.0, 60, &config);
    let p = ladder_sellthrough(&segments, 5.0, config.ladder_elasticity, None);
    assert!(p <= 1.0 && p > 0.999);
}

#[test]
fn item_level_wrapper_guards_inputs() {
    let config = LadderConfig::default();
    assert!(ladder_sell_p60(None, Some(0.02), 60, &config).is_none());
    assert!(ladder_sell_p60(Some(100.0), None, 60, &config).is_none());
    assert!(ladder_sell_p60(Some(0.0), Some(0.02), 60, &config).is_none());

    let p = ladder_sell_p60(Some(100.0), Some(0.02), 60, &config).unwrap();
    assert!((0.0..=1.0).contains(&p));
}

#[test]
fn empty_schedule_is_zero() {
    assert_relative_eq!(ladder_sellthrough(&[], 0.05, -0.5, None), 0.0);
}
