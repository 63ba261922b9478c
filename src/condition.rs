//! Condition normalisation.
//!
//! Maps free-text condition descriptions onto a closed bucket set so the
//! pricing and sell-through stages can apply per-bucket factors.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    LikeNew,
    OpenBox,
    UsedGood,
    UsedFair,
    ForParts,
    Unknown,
}

impl Condition {
    pub fn all() -> [Condition; 7] {
        [
            Condition::New,
            Condition::LikeNew,
            Condition::OpenBox,
            Condition::UsedGood,
            Condition::UsedFair,
            Condition::ForParts,
            Condition::Unknown,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::LikeNew => "like_new",
            Condition::OpenBox => "open_box",
            Condition::UsedGood => "used_good",
            Condition::UsedFair => "used_fair",
            Condition::ForParts => "for_parts",
            Condition::Unknown => "unknown",
        }
    }

    /// New-ish buckets prefer the "new" price family during triangulation.
    pub fn is_newish(&self) -> bool {
        matches!(
            self,
            Condition::New | Condition::LikeNew | Condition::OpenBox
        )
    }
}

/// Lowercase, collapse whitespace, and turn `_ - /` separators into spaces.
fn clean(raw: &str) -> String {
    let mapped: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if matches!(c, '_' | '-' | '/') { ' ' } else { c })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Normalize a raw condition string to a bucket.
///
/// Ordering matters: "open box" and "like new" are checked before the
/// generic "new" test, and refurbished grades land in `used_good` before
/// the word "renewed" can match as new.
pub fn normalize_condition(raw: &str) -> Condition {
    if raw.trim().is_empty() {
        return Condition::Unknown;
    }
    let c = clean(raw);

    if contains_any(
        &c,
        &[
            "open box",
            "openbox",
            "display",
            "demo",
            "floor model",
            "new other",
            "new(other)",
            "new (other)",
        ],
    ) {
        return Condition::OpenBox;
    }

    if contains_any(
        &c,
        &[
            "like new",
            "likenew",
            "mint",
            "pristine",
            "excellent",
            "near new",
            "barely used",
            "lightly used",
        ],
    ) {
        return Condition::LikeNew;
    }

    if contains_any(
        &c,
        &["refurbished", "refurb", "reconditioned", "renewed", "certified"],
    ) {
        return Condition::UsedGood;
    }

    let new_exact = contains_any(
        &c,
        &["brand new", "sealed", "unopened", "bnib", "nib", "bnwt", "nwt"],
    );
    let new_bare = c.contains("new")
        && !contains_any(
            &c,
            &[
                "like", "other", "open", "used", "refurb", "excellent", "mint",
                "pristine", "renewed",
            ],
        );
    if new_exact || new_bare {
        return Condition::New;
    }

    if contains_any(
        &c,
        &[
            "parts",
            "repair",
            "not working",
            "broken",
            "damaged",
            "defective",
            "faulty",
            "as is",
            "asis",
            "salvage",
            "scrap",
            "junk",
        ],
    ) {
        return Condition::ForParts;
    }

    if c.contains("used") || c.contains("pre owned") || c.contains("preowned") {
        if contains_any(&c, &["good", "very good", "great", "vg"]) {
            return Condition::UsedGood;
        }
        if contains_any(&c, &["fair", "acceptable", "ok", "okay", "average", "moderate"]) {
            return Condition::UsedFair;
        }
        // Unqualified "used" defaults to good
        return Condition::UsedGood;
    }

    if contains_any(&c, &["good", "very good", "great", "vg"]) {
        return Condition::UsedGood;
    }
    if contains_any(&c, &["fair", "acceptable", "ok", "okay"]) {
        return Condition::UsedFair;
    }

    // Customer returns: damaged ones are parts, the rest open box
    if contains_any(&c, &["return", "customer return", "returned"]) {
        if contains_any(&c, &["damaged", "broken", "defective"]) {
            return Condition::ForParts;
        }
        return Condition::OpenBox;
    }

    Condition::Unknown
}

/// Resolve a bucket from the fields a manifest row may carry.
///
/// Priority: the condition field itself, then free-text notes, then a
/// letter grade. Later fields are only consulted while the bucket is
/// still unknown.
pub fn bucket_from_fields(condition: &str, notes: &str, grade: &str) -> Condition {
    let bucket = normalize_condition(condition);
    if bucket != Condition::Unknown {
        return bucket;
    }

    if !notes.trim().is_empty() {
        let n = clean(notes);
        if n.contains("open box") || n.contains("opened") {
            return Condition::OpenBox;
        }
        if n.contains("damaged") || n.contains("broken") {
            return Condition::ForParts;
        }
        if n.contains("like new") || n.contains("mint") {
            return Condition::LikeNew;
        }
        if n.contains("refurb") {
            return Condition::UsedGood;
        }
    }

    match grade.trim().to_ascii_uppercase().as_str() {
        "A" | "A+" => Condition::LikeNew,
        "B" | "B+" => Condition::UsedGood,
        "C" | "C+" => Condition::UsedFair,
        "D" | "F" => Condition::ForParts,
        _ => Condition::Unknown,
    }
}
