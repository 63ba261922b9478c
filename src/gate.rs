//! Evidence gate: per-item admission policy.
//!
//! Decides whether an item's pricing evidence is trustworthy enough to
//! count toward lot ROI (`core_included`) or whether it rides along as
//! upside only. Policy gates (brand list, hazmat) run first, a high-trust
//! identifier bypasses the comp requirements, and everything else faces
//! an adaptive comps threshold that rises with ambiguity.

use crate::config::{EvidenceConfig, GatingConfig, HazmatPolicy};
use crate::item::Item;

/// Title terms that mark a listing as generic or mixed-lot.
const GENERIC_TITLE_TERMS: [&str; 13] = [
    "bundle",
    "lot",
    "assorted",
    "various",
    "pack",
    "generic",
    "case",
    "piece",
    "damaged",
    "broken",
    "repair",
    "for parts",
    "wholesale",
];

/// Gate verdict for one item.
#[derive(Debug, Clone)]
pub struct GateDecision {
    /// Quality indicator: the item cleared whichever path admitted it
    pub passed: bool,
    /// Whether the item counts toward ROI
    pub core_included: bool,
    pub reason: String,
    pub tags: Vec<String>,
}

/// Ambiguity flags that raise the comps requirement.
///
/// Only evaluated when the item carries at least one descriptive field;
/// a completely bare row yields no flags.
pub fn ambiguity_flags(item: &Item) -> Vec<String> {
    let mut flags = Vec::new();

    let title = item.title.trim();
    if !title.is_empty() {
        let lower = title.to_lowercase();
        if GENERIC_TITLE_TERMS.iter().any(|t| lower.contains(t)) {
            flags.push("generic:title".to_string());
        }
    }

    let has_descriptive = !item.title.trim().is_empty()
        || !item.brand.trim().is_empty()
        || !item.condition_raw.trim().is_empty()
        || !item.category.trim().is_empty();
    if has_descriptive {
        if item.brand.trim().is_empty() && !title.is_empty() {
            flags.push("ambiguous:brand".to_string());
        }
        // Only an explicit unknown counts; a missing condition does not
        let cond = item.condition_raw.trim().to_lowercase();
        if cond == "unknown" || cond == "unspecified" {
            flags.push("ambiguous:condition".to_string());
        }
    }

    flags
}

/// Evaluate the gate for one item.
///
/// `sold_comps_count_180d`, `has_secondary_signal` and `has_high_trust_id`
/// are pre-aggregated by the caller (see the accessors on [`Item`]).
pub fn evidence_gate(
    item: &Item,
    sold_comps_count_180d: u32,
    has_secondary_signal: bool,
    has_high_trust_id: bool,
    gating: &GatingConfig,
    evidence: &EvidenceConfig,
) -> GateDecision {
    let mut tags: Vec<String> = Vec::new();
    let mut gated = false;
    let mut gated_reason: Option<String> = None;

    if gating.is_gated_brand(&item.brand) {
        gated = true;
        gated_reason = Some(format!("Brand gated: {}", item.brand.trim()));
        tags.push("brand:gated".to_string());
    }

    if item.hazmat {
        tags.push("hazmat".to_string());
        match gating.hazmat_policy {
            HazmatPolicy::Exclude => {
                gated = true;
                gated_reason = Some(match gated_reason {
                    Some(r) => format!("{}; Hazmat excluded", r),
                    None => "Hazmat excluded".to_string(),
                });
            }
            HazmatPolicy::Review => tags.push("hazmat:review".to_string()),
            HazmatPolicy::Allow => tags.push("hazmat:allow".to_string()),
        }
    }

    if gated {
        return GateDecision {
            passed: false,
            core_included: false,
            reason: gated_reason.unwrap_or_else(|| "Gated by policy".to_string()),
            tags,
        };
    }

    if has_high_trust_id {
        let mut t = vec!["id:trusted".to_string()];
        t.append(&mut tags);
        return GateDecision {
            passed: true,
            core_included: true,
            reason: "High-trust ID present".to_string(),
            tags: t,
        };
    }

    let flags = ambiguity_flags(item);
    let required = evidence
        .min_comps_max
        .min(evidence.min_comps_base + evidence.ambiguity_bonus_per_flag * flags.len() as u32);
    let req_tag = format!("conf:req_comps:{}", required);

    let secondary_ok = has_secondary_signal || !evidence.require_secondary;
    if sold_comps_count_180d >= required && secondary_ok {
        let mut t = vec![format!("comps:>={}", required), "secondary:yes".to_string()];
        t.extend(flags);
        t.push(req_tag);
        t.append(&mut tags);
        return GateDecision {
            passed: true,
            core_included: true,
            reason: "Comps+secondary OK".to_string(),
            tags: t,
        };
    }

    let mut fail_tags = Vec::new();
    if sold_comps_count_180d < required {
        // Legacy tag shape when the requirement is the plain base
        if required == 3 {
            fail_tags.push("comps:<3".to_string());
        } else {
            fail_tags.push(format!("comps:<{}", required));
        }
    }
    if !secondary_ok {
        fail_tags.push("secondary:no".to_string());
    }
    fail_tags.extend(flags);
    fail_tags.push(req_tag);
    fail_tags.append(&mut tags);

    let reason = if sold_comps_count_180d < required && !secondary_ok {
        "Insufficient comps and no secondary signals"
    } else if sold_comps_count_180d < required {
        "Insufficient comps"
    } else {
        "No secondary signals"
    };

    GateDecision {
        passed: false,
        core_included: false,
        reason: reason.to_string(),
        tags: fail_tags,
    }
}
