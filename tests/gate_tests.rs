use lotbid::config::{EvidenceConfig, GatingConfig, HazmatPolicy};
use lotbid::gate::{ambiguity_flags, evidence_gate};
use lotbid::item::Item;

fn clean_item() -> Item {
    let mut item = Item::new("sku-1");
    item.title = "Sony WH-1000XM4 Wireless Headphones".to_string();
    item.brand = "sony".to_string();
    item.condition_raw = "New".to_string();
    item
}

fn gate(
    item: &Item,
    comps: u32,
    secondary: bool,
    high_trust: bool,
) -> lotbid::gate::GateDecision {
    evidence_gate(
        item,
        comps,
        secondary,
        high_trust,
        &GatingConfig::default(),
        &EvidenceConfig::default(),
    )
}

#[test]
fn high_trust_id_bypasses_comps() {
    let item = clean_item();
    // Zero comps, no secondary: the ID alone is enough
    let d = gate(&item, 0, false, true);
    assert!(d.passed);
    assert!(d.core_included);
    assert!(d.tags.contains(&"id:trusted".to_string()));
}

#[test]
fn comps_and_secondary_admit() {
    let item = clean_item();
    let d = gate(&item, 3, true, false);
    assert!(d.core_included, "3 comps + secondary should admit: {:?}", d);
    assert!(d.tags.contains(&"comps:>=3".to_string()));
    assert!(d.tags.contains(&"secondary:yes".to_string()));
}

#[test]
fn missing_secondary_excludes() {
    let item = clean_item();
    let d = gate(&item, 3, false, false);
    assert!(!d.core_included);
    assert!(d.tags.contains(&"secondary:no".to_string()));
}

#[test]
fn insufficient_comps_excludes_with_legacy_tag() {
    let item = clean_item();
    let d = gate(&item, 2, true, false);
    assert!(!d.core_included);
    assert!(d.tags.contains(&"comps:<3".to_string()));
}

#[test]
fn ambiguity_raises_the_requirement() {
    // Generic title + missing brand = 2 flags, so 3 + 2 = 5 comps required
    let mut item = Item::new("sku-2");
    item.title = "Bundle of assorted electronics".to_string();
    item.condition_raw = "New".to_string();

    let flags = ambiguity_flags(&item);
    assert_eq!(flags.len(), 2, "expected 2 flags, got {:?}", flags);

    let d = gate(&item, 4, true, false);
    assert!(!d.core_included, "4 comps < 5 required: {:?}", d);
    assert!(d.tags.contains(&"comps:<5".to_string()));
    assert!(d.tags.contains(&"conf:req_comps:5".to_string()));

    let d = gate(&item, 5, true, false);
    assert!(d.core_included, "5 comps should clear the raised bar");
}

#[test]
fn bare_item_has_no_flags() {
    let item = Item::new("sku-3");
    assert!(ambiguity_flags(&item).is_empty());
}

#[test]
fn explicit_unknown_condition_flags() {
    let mut item = clean_item();
    item.condition_raw = "Unknown".to_string();
    let flags = ambiguity_flags(&item);
    assert!(flags.contains(&"ambiguous:condition".to_string()));

    // A missing condition alone does not trigger the flag
    let mut item = clean_item();
    item.condition_raw = String::new();
    let flags = ambiguity_flags(&item);
    assert!(!flags.contains(&"ambiguous:condition".to_string()));
}

#[test]
fn gated_brand_excludes_regardless() {
    let mut item = clean_item();
    item.brand = "Apple".to_string();
    let gating = GatingConfig {
        gated_brands: vec!["apple".to_string()],
        ..GatingConfig::default()
    };
    let d = evidence_gate(&item, 10, true, true, &gating, &EvidenceConfig::default());
    assert!(!d.core_included);
    assert!(d.reason.contains("Brand gated"), "reason: {}", d.reason);
    assert!(d.tags.contains(&"brand:gated".to_string()));
}

#[test]
fn hazmat_policies() {
    let mut item = clean_item();
    item.hazmat = true;

    let exclude = GatingConfig {
        hazmat_policy: HazmatPolicy::Exclude,
        ..GatingConfig::default()
    };
    let d = evidence_gate(&item, 3, true, false, &exclude, &EvidenceConfig::default());
    assert!(!d.core_included);
    assert!(d.reason.contains("Hazmat excluded"));

    let review = GatingConfig {
        hazmat_policy: HazmatPolicy::Review,
        ..GatingConfig::default()
    };
    let d = evidence_gate(&item, 3, true, false, &review, &EvidenceConfig::default());
    assert!(d.core_included);
    assert!(d.tags.contains(&"hazmat:review".to_string()));

    let allow = GatingConfig {
        hazmat_policy: HazmatPolicy::Allow,
        ..GatingConfig::default()
    };
    let d = evidence_gate(&item, 3, true, false, &allow, &EvidenceConfig::default());
    assert!(d.core_included);
    assert!(d.tags.contains(&"hazmat:allow".to_string()));
}

#[test]
fn requirement_caps_at_max() {
    // Three flags would push 3 + 3 = 6, but the cap is 5
    let mut item = Item::new("sku-4");
    item.title = "Lot of damaged items".to_string();
    item.condition_raw = "unspecified".to_string();

    let flags = ambiguity_flags(&item);
    assert_eq!(flags.len(), 3, "expected 3 flags, got {:?}", flags);

    let d = gate(&item, 5, true, false);
    assert!(d.core_included, "cap keeps the requirement at 5: {:?}", d);
}
