use std::collections::HashSet;

use lotbid::config::Config;
use lotbid::evidence::{EvidenceSink, JsonlSink, MemorySink};
use lotbid::item::{self, Item};
use lotbid::pipeline::{self, PipelineOptions};

fn trusted_item(sku: &str) -> Item {
    let mut item = Item::new(sku);
    item.title = "Sony WH-1000XM4 Wireless Headphones".to_string();
    item.brand = "sony".to_string();
    item.condition_raw = "New".to_string();
    item.condition = lotbid::condition::Condition::New;
    item.asin = Some("B00EXMPL01".to_string());
    item.keepa_price_new_med = Some(120.0);
    item.keepa_offers_count = Some(8);
    item.keepa_salesrank_med = Some(4000.0);
    item
}

fn weak_item(sku: &str) -> Item {
    // No identifier, no comps, no secondary signal
    let mut item = Item::new(sku);
    item.title = "Mystery accessory".to_string();
    item.brand = "acme".to_string();
    item.condition_raw = "Used".to_string();
    item.condition = lotbid::condition::Condition::UsedGood;
    item.keepa_price_used_med = Some(15.0);
    item
}

fn options() -> PipelineOptions {
    let mut opts = PipelineOptions::new(0.0, 500.0);
    opts.optimizer.sims = 500;
    opts.month = 6;
    opts
}

#[test]
fn core_and_upside_partition_the_manifest() {
    let items = vec![
        trusted_item("sku-1"),
        weak_item("sku-2"),
        trusted_item("sku-3"),
        weak_item("sku-4"),
    ];
    let sink = MemorySink::new();
    let report = pipeline::run_lot(items, &Config::default(), &options(), &sink).expect("run");

    assert_eq!(report.core.len() + report.upside.len(), report.items.len());
    let core: HashSet<_> = report.core.iter().collect();
    let upside: HashSet<_> = report.upside.iter().collect();
    assert!(core.is_disjoint(&upside));

    // The trusted items are core, the weak ones upside
    assert_eq!(report.core, vec![0, 2]);
    assert_eq!(report.upside, vec![1, 3]);

    // Upside items still got priced and sell-estimated
    assert!(report.items[1].est_price_mu.is_some());
    assert!(report.items[1].sell_p60.is_some());
}

#[test]
fn evidence_round_trip_for_one_core_item() {
    let items = vec![trusted_item("sku-1")];
    let sink = MemorySink::new();
    let report = pipeline::run_lot(items, &Config::default(), &options(), &sink).expect("run");

    assert_eq!(report.core.len(), 1);

    let records = sink.records();
    let count = |source: &str| records.iter().filter(|r| r.source == source).count();
    assert_eq!(count("gate"), 1);
    assert_eq!(count("price:estimate"), 1);
    assert_eq!(count("sell:estimate"), 1);
    assert_eq!(count("optimize:bid"), 1);
    assert_eq!(records.len(), 4);

    // Stage ordering: gate, then price, then sell, then the lot-level optimizer
    let order: Vec<&str> = records.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(order, vec!["gate", "price:estimate", "sell:estimate", "optimize:bid"]);

    // The optimizer record is lot-level
    assert!(records.last().unwrap().sku_local.is_none());
}

#[test]
fn upside_items_do_not_move_the_simulation() {
    let core_only = vec![trusted_item("sku-1")];
    let sink = MemorySink::new();
    let a = pipeline::run_lot(core_only, &Config::default(), &options(), &sink).expect("run");

    let with_upside = vec![trusted_item("sku-1"), weak_item("sku-2")];
    let b = pipeline::run_lot(with_upside, &Config::default(), &options(), &sink).expect("run");

    assert_eq!(a.result.items, b.result.items, "upside never enters the core");
    assert_eq!(a.result.bid, b.result.bid);
    assert_eq!(a.result.roi_p50, b.result.roi_p50);
}

#[test]
fn ladder_replaces_the_flat_sell_through() {
    let mut config = Config::default();
    let flat = pipeline::run_lot(
        vec![trusted_item("sku-1")],
        &config,
        &options(),
        &MemorySink::new(),
    )
    .expect("run");

    config.ladder.enabled = true;
    let laddered = pipeline::run_lot(
        vec![trusted_item("sku-1")],
        &config,
        &options(),
        &MemorySink::new(),
    )
    .expect("run");

    let p_flat = flat.items[0].sell_p60.unwrap();
    let p_ladder = laddered.items[0].sell_p60.unwrap();
    assert!(
        p_ladder >= p_flat,
        "markdown schedule cannot slow the sale: {} vs {}",
        p_ladder,
        p_flat
    );
}

#[test]
fn enriched_csv_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("items.csv");

    let items = vec![trusted_item("sku-1"), weak_item("sku-2")];
    let sink = MemorySink::new();
    let report = pipeline::run_lot(items, &Config::default(), &options(), &sink).expect("run");
    pipeline::save_enriched_csv(&report, &path).expect("save");

    let loaded = item::load_items_csv(&path).expect("load");
    assert_eq!(loaded.items.len(), 2);
    assert!(loaded.rejected.is_empty());

    let original = &report.items[0];
    let round = &loaded.items[0];
    assert_eq!(round.sku_local, original.sku_local);
    let diff = (round.est_price_mu.unwrap() - original.est_price_mu.unwrap()).abs();
    assert!(diff < 1e-4, "mu must survive the CSV round trip");
    assert!(round.sell_p60.is_some());
}

#[test]
fn rejected_rows_record_failed_evidence() {
    let rejected = vec![item::RejectedRow {
        sku_local: "sku-bad".to_string(),
        reason: "quantity must be a positive integer, got -2".to_string(),
    }];
    let sink = MemorySink::new();
    pipeline::record_rejected(&rejected, &sink);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source, "item:coerce");
    assert!(!records[0].ok);
    assert_eq!(records[0].sku_local.as_deref(), Some("sku-bad"));
}

#[test]
fn jsonl_sink_appends_parseable_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("evidence.jsonl");
    let sink = JsonlSink::new(&path);

    let items = vec![trusted_item("sku-1")];
    pipeline::run_lot(items, &Config::default(), &options(), &sink).expect("run");

    let text = std::fs::read_to_string(&path).expect("read ledger");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    for line in lines {
        let value: serde_json::Value = serde_json::from_str(line).expect("valid JSON line");
        assert!(value.get("source").is_some());
        assert!(value.get("timestamp").is_some());
    }
}

#[test]
fn failing_sink_never_aborts_the_pipeline() {
    let dir = tempfile::tempdir().expect("tempdir");
    // The sink path is a directory: every append fails, the run continues
    let sink = JsonlSink::new(dir.path());
    let items = vec![trusted_item("sku-1")];
    let report = pipeline::run_lot(items, &Config::default(), &options(), &sink);
    assert!(report.is_ok(), "sink failures must be swallowed");
}
