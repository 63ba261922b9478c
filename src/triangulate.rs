//! Price triangulation.
//!
//! Fuses zero or more noisy per-item price sources into a single price
//! distribution by inverse-variance weighting, then reads P5/P50/P95 off
//! a Normal approximation. Every fused estimate records its per-source
//! weights in the evidence ledger so the number can be reproduced.

use serde::Serialize;
use serde_json::json;

use crate::config::TriangulationConfig;
use crate::evidence::{EvidenceRecord, EvidenceSink};
use crate::item::Item;

/// Standard-normal 5% / 95% quantile magnitude.
pub const Z95: f64 = 1.6448536269514729;

const MU_FLOOR: f64 = 1e-6;
const CV_FLOOR: f64 = 1e-6;

/// One noisy price estimate for an item.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStat {
    /// e.g. "keepa:new", "keepa:used", "other:manual"
    pub name: String,
    /// Point estimate
    pub mu: f64,
    /// Coefficient of variation (sigma / mu)
    pub cv: f64,
    /// Sample-strength proxy, at least 1
    pub n: u32,
    /// Recency discount in [0, 1]
    pub recency: f64,
    /// Prior weight in [0, 1]
    pub prior: f64,
}

/// Weight ∝ (prior × recency × n) / variance with variance = (cv·µ)².
/// cv and µ are floored so a degenerate source cannot blow up the fuse.
pub fn inverse_variance_weight(s: &SourceStat) -> f64 {
    let cv = s.cv.max(CV_FLOOR);
    let var = (cv * s.mu.max(MU_FLOOR)).powi(2);
    s.prior * s.recency.max(0.0) * f64::from(s.n.max(1)) / var
}

/// Result of fusing the sources for one item.
#[derive(Debug, Clone)]
pub struct Fusion {
    pub mu: f64,
    pub sigma: f64,
    pub sum_w: f64,
    /// (weight, source) pairs, for the audit trail
    pub weighted: Vec<(f64, SourceStat)>,
}

/// Inverse-variance weighted µ and σ. None when no sources are usable.
pub fn triangulate(sources: &[SourceStat]) -> Option<Fusion> {
    let weighted: Vec<(f64, SourceStat)> = sources
        .iter()
        .filter(|s| s.mu.is_finite() && s.cv.is_finite())
        .map(|s| (inverse_variance_weight(s), s.clone()))
        .filter(|(w, _)| w.is_finite() && *w > 0.0)
        .collect();

    if weighted.is_empty() {
        return None;
    }

    let sum_w: f64 = weighted.iter().map(|(w, _)| w).sum();
    let mu = weighted.iter().map(|(w, s)| w * s.mu).sum::<f64>() / sum_w;
    // Under inverse-variance weighting, σ² ≈ 1 / Σw
    let sigma = (1.0 / sum_w).sqrt();

    Some(Fusion {
        mu,
        sigma,
        sum_w,
        weighted,
    })
}

fn clip_pos(x: f64) -> f64 {
    if x > 0.0 {
        x
    } else {
        0.0
    }
}

/// Build the source list for one item from the Keepa medians.
///
/// New-ish conditions prefer the new-price median, everything else the
/// used median; whichever family is missing falls back to the other.
/// No medians at all yields no sources.
pub fn build_sources(item: &Item, config: &TriangulationConfig) -> Vec<SourceStat> {
    let n = item.keepa_offers_count.map_or(1, |o| o.max(1));
    let prior = config.priors.keepa;
    let recency = 1.0;

    let keepa = |name: &str, mu: f64| SourceStat {
        name: name.to_string(),
        mu,
        cv: config.cv_fallback,
        n,
        recency,
        prior,
    };

    let new_med = item.keepa_price_new_med;
    let used_med = item.keepa_price_used_med;

    let mut sources = Vec::new();
    if item.condition.is_newish() {
        if let Some(mu) = new_med {
            sources.push(keepa("keepa:new", mu));
        } else if let Some(mu) = used_med {
            sources.push(keepa("keepa:used", mu));
        }
    } else if let Some(mu) = used_med {
        sources.push(keepa("keepa:used", mu));
    } else if let Some(mu) = new_med {
        sources.push(keepa("keepa:new", mu));
    }
    sources
}

/// Fuse prices for every item, writing the `est_price_*` fields and one
/// `price:estimate` evidence record per item. Items with no sources keep
/// empty price fields and record `ok=false`.
pub fn estimate_prices(
    items: &mut [Item],
    config: &TriangulationConfig,
    sink: &dyn EvidenceSink,
) {
    for item in items.iter_mut() {
        let sources = build_sources(item, config);
        let fusion = triangulate(&sources);

        let (ok, meta) = match fusion {
            Some(f) => {
                let mut p5 = clip_pos(f.mu - Z95 * f.sigma);
                let p50 = clip_pos(f.mu);
                let p95 = clip_pos(f.mu + Z95 * f.sigma);

                let mut floored = false;
                if let Some(floor) = config.floor_for(&item.category, f.mu) {
                    if p5 < floor {
                        // Keep the percentile ordering intact
                        p5 = floor.min(p50);
                        floored = true;
                    }
                }

                item.est_price_mu = Some(f.mu);
                item.est_price_sigma = Some(f.sigma);
                item.est_price_p5 = Some(p5);
                item.est_price_p50 = Some(p50);
                item.est_price_p95 = Some(p95);
                item.est_price_p5_floored = floored;

                let sources_meta: Vec<serde_json::Value> = f
                    .weighted
                    .iter()
                    .map(|(w, s)| {
                        json!({
                            "name": s.name.clone(),
                            "mu": s.mu,
                            "cv": s.cv,
                            "n": s.n,
                            "recency": s.recency,
                            "prior": s.prior,
                            "weight": w,
                        })
                    })
                    .collect();
                (
                    true,
                    json!({
                        "triangulation": {
                            "sources": sources_meta,
                            "sum_w": f.sum_w,
                            "mu": f.mu,
                            "sigma": f.sigma,
                            "p5_floored": floored,
                        }
                    }),
                )
            }
            None => (false, json!({ "triangulation": { "note": "no sources" } })),
        };

        sink.write(&EvidenceRecord::new(
            Some(&item.sku_local),
            "price:estimate",
            ok,
            meta,
        ));
    }
}
