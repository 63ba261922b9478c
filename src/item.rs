//! Typed manifest items and the loose-row coercion boundary.
//!
//! Manifest tables arrive as loosely typed CSV rows. Coercion happens
//! exactly once, here: numerics must parse finite, quantity must be a
//! positive integer, identifiers are normalized, and the condition bucket
//! is resolved. Rows that fail coercion are rejected with a reason so the
//! caller can record `ok=false` evidence for them.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::condition::{self, Condition};
use crate::error::LotResult;
use crate::ids;

/// One manifest item, immutable inputs plus pipeline-written estimates.
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub sku_local: String,
    pub title: String,
    pub brand: String,
    pub category: String,
    /// Raw condition text as it appeared in the manifest
    pub condition_raw: String,
    pub condition: Condition,
    pub quantity: u32,
    pub hazmat: bool,

    pub asin: Option<String>,
    pub upc: Option<String>,
    pub ean: Option<String>,
    pub canonical_id: Option<String>,

    pub keepa_price_new_med: Option<f64>,
    pub keepa_price_used_med: Option<f64>,
    pub keepa_offers_count: Option<u32>,
    pub keepa_salesrank_med: Option<f64>,
    pub keepa_new_count: Option<u32>,
    pub keepa_used_count: Option<u32>,
    pub manual_price: Option<f64>,

    // Written by the pricing stage
    pub est_price_mu: Option<f64>,
    pub est_price_sigma: Option<f64>,
    pub est_price_p5: Option<f64>,
    pub est_price_p50: Option<f64>,
    pub est_price_p95: Option<f64>,
    /// True when the category floor raised P5
    pub est_price_p5_floored: bool,

    // Written by the sell stage
    pub sell_p60: Option<f64>,
    pub sell_hazard_daily: Option<f64>,
    pub sell_ptm_z: Option<f64>,
}

impl Item {
    /// A bare item with the given key; everything else empty or defaulted.
    pub fn new(sku_local: &str) -> Item {
        Item {
            sku_local: sku_local.to_string(),
            title: String::new(),
            brand: String::new(),
            category: String::new(),
            condition_raw: String::new(),
            condition: Condition::Unknown,
            quantity: 1,
            hazmat: false,
            asin: None,
            upc: None,
            ean: None,
            canonical_id: None,
            keepa_price_new_med: None,
            keepa_price_used_med: None,
            keepa_offers_count: None,
            keepa_salesrank_med: None,
            keepa_new_count: None,
            keepa_used_count: None,
            manual_price: None,
            est_price_mu: None,
            est_price_sigma: None,
            est_price_p5: None,
            est_price_p50: None,
            est_price_p95: None,
            est_price_p5_floored: false,
            sell_p60: None,
            sell_hazard_daily: None,
            sell_ptm_z: None,
        }
    }

    /// True iff any validated identifier (ASIN / UPC / EAN) is present.
    pub fn has_high_trust_id(&self) -> bool {
        self.asin.is_some() || self.upc.is_some() || self.ean.is_some()
    }

    /// Sold comps over the lookback window, pre-aggregated upstream into
    /// the Keepa offer counts.
    pub fn sold_comps_count_180d(&self) -> u32 {
        self.keepa_new_count.unwrap_or(0) + self.keepa_used_count.unwrap_or(0)
    }

    /// Any corroborating signal beyond the primary price medians:
    /// offer depth, rank data, or a manual price override.
    pub fn has_secondary_signal(&self) -> bool {
        self.keepa_offers_count.map_or(false, |o| o > 0)
            || self.keepa_salesrank_med.is_some()
            || self.manual_price.is_some()
    }
}

/// A loosely typed manifest row, straight out of the CSV reader.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    pub sku_local: String,
    pub title: String,
    pub brand: String,
    pub category: String,
    pub condition: String,
    pub notes: String,
    pub grade: String,
    pub quantity: String,
    pub hazmat: String,
    pub asin: String,
    pub upc: String,
    pub ean: String,
    pub upc_ean_asin: String,
    pub keepa_price_new_med: String,
    pub keepa_price_used_med: String,
    pub keepa_offers_count: String,
    pub keepa_salesrank_med: String,
    pub keepa_new_count: String,
    pub keepa_used_count: String,
    pub manual_price: String,
    pub est_price_mu: String,
    pub est_price_sigma: String,
    pub est_price_p5: String,
    pub est_price_p50: String,
    pub est_price_p95: String,
    pub sell_p60: String,
    pub sell_hazard_daily: String,
}

/// A row the coercion boundary refused, with the reason.
#[derive(Debug, Clone)]
pub struct RejectedRow {
    pub sku_local: String,
    pub reason: String,
}

/// A coerced manifest: usable items plus the rows that were dropped.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub items: Vec<Item>,
    pub rejected: Vec<RejectedRow>,
}

fn parse_f64(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_count(s: &str) -> Option<u32> {
    parse_f64(s).filter(|v| *v >= 0.0).map(|v| v as u32)
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "t" | "yes" | "y"
    )
}

fn opt_str(s: &str) -> Option<&str> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t)
    }
}

/// Coerce one raw row. `idx` is the zero-based row index, used to
/// synthesize a key when the manifest has none.
pub fn coerce_row(idx: usize, raw: &RawRecord) -> Result<Item, RejectedRow> {
    let sku = {
        let t = raw.sku_local.trim();
        if t.is_empty() {
            format!("row-{}", idx + 1)
        } else {
            t.to_string()
        }
    };

    let quantity = {
        let t = raw.quantity.trim();
        if t.is_empty() {
            1
        } else {
            match t.parse::<f64>() {
                Ok(q) if q.is_finite() && q >= 1.0 => q as u32,
                Ok(q) => {
                    return Err(RejectedRow {
                        sku_local: sku,
                        reason: format!("quantity must be a positive integer, got {}", q),
                    })
                }
                Err(_) => {
                    return Err(RejectedRow {
                        sku_local: sku,
                        reason: format!("quantity is not numeric: {:?}", t),
                    })
                }
            }
        }
    };

    let extracted = ids::extract_ids(
        opt_str(&raw.asin),
        opt_str(&raw.upc),
        opt_str(&raw.ean),
        opt_str(&raw.upc_ean_asin),
    );

    let mut item = Item::new(&sku);
    item.title = raw.title.trim().to_string();
    item.brand = raw.brand.trim().to_string();
    item.category = raw.category.trim().to_string();
    item.condition_raw = raw.condition.trim().to_string();
    item.condition = condition::bucket_from_fields(&raw.condition, &raw.notes, &raw.grade);
    item.quantity = quantity;
    item.hazmat = parse_bool(&raw.hazmat);
    item.asin = extracted.asin;
    item.upc = extracted.upc;
    item.ean = extracted.ean;
    item.canonical_id = extracted.canonical;
    item.keepa_price_new_med = parse_f64(&raw.keepa_price_new_med);
    item.keepa_price_used_med = parse_f64(&raw.keepa_price_used_med);
    item.keepa_offers_count = parse_count(&raw.keepa_offers_count);
    item.keepa_salesrank_med = parse_f64(&raw.keepa_salesrank_med);
    item.keepa_new_count = parse_count(&raw.keepa_new_count);
    item.keepa_used_count = parse_count(&raw.keepa_used_count);
    item.manual_price = parse_f64(&raw.manual_price);
    item.est_price_mu = parse_f64(&raw.est_price_mu);
    item.est_price_sigma = parse_f64(&raw.est_price_sigma);
    item.est_price_p5 = parse_f64(&raw.est_price_p5);
    item.est_price_p50 = parse_f64(&raw.est_price_p50);
    item.est_price_p95 = parse_f64(&raw.est_price_p95);
    item.sell_p60 = parse_f64(&raw.sell_p60);
    item.sell_hazard_daily = parse_f64(&raw.sell_hazard_daily);

    Ok(item)
}

/// Load and coerce a manifest CSV. Unparseable rows land in `rejected`;
/// only a malformed file as a whole is an error.
pub fn load_items_csv(path: &Path) -> LotResult<Manifest> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;

    let mut manifest = Manifest::default();
    for (idx, record) in reader.deserialize::<RawRecord>().enumerate() {
        let raw = record?;
        match coerce_row(idx, &raw) {
            Ok(item) => manifest.items.push(item),
            Err(rejected) => manifest.rejected.push(rejected),
        }
    }
    Ok(manifest)
}
