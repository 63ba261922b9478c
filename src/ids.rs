//! Product identifier classification.
//!
//! The gate only trusts identifiers that survive these checks: ASIN is a
//! 10-character alphanumeric token, UPC is exactly 12 digits with a valid
//! modulo-10 check digit, EAN is exactly 13 digits. The canonical
//! identifier is derived with priority ASIN > UPC > EAN.

/// Normalized identifiers extracted from a manifest row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedIds {
    pub asin: Option<String>,
    pub upc: Option<String>,
    pub ean: Option<String>,
    /// The single identifier the rest of the pipeline keys on.
    pub canonical: Option<String>,
}

impl ExtractedIds {
    /// True iff any validated identifier is present.
    pub fn has_high_trust_id(&self) -> bool {
        self.asin.is_some() || self.upc.is_some() || self.ean.is_some()
    }
}

/// Keep only ASCII digits. Returns None when nothing is left.
pub fn normalize_digits(s: &str) -> Option<String> {
    let d: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    if d.is_empty() {
        None
    } else {
        Some(d)
    }
}

/// Uppercase and validate a candidate ASIN: exactly 10 alphanumeric chars.
pub fn normalize_asin(s: &str) -> Option<String> {
    let t = s.trim().to_ascii_uppercase();
    if t.len() == 10 && t.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(t)
    } else {
        None
    }
}

/// UPC-A modulo-10 check digit validation on a 12-digit string.
pub fn valid_upc_check_digit(upc: &str) -> bool {
    if upc.len() != 12 || !upc.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let digit = |i: usize| (upc.as_bytes()[i] - b'0') as u32;

    // Odd positions carry weight 3 in UPC-A (indices 0,2,..,10)
    let odd_sum: u32 = (0..11).step_by(2).map(digit).sum();
    let even_sum: u32 = (1..10).step_by(2).map(digit).sum();
    let check = (10 - ((odd_sum * 3 + even_sum) % 10)) % 10;

    digit(11) == check
}

/// Extract and normalize identifiers from the raw manifest fields.
///
/// A combined `upc_ean_asin` field is classified first: tried as an ASIN,
/// then by digit count (12 digits with a valid check digit -> UPC,
/// 13 digits -> EAN). The separate fields fill any slot the combined
/// field did not claim. The canonical identifier follows the priority
/// ASIN > UPC > EAN.
pub fn extract_ids(
    asin: Option<&str>,
    upc: Option<&str>,
    ean: Option<&str>,
    combined: Option<&str>,
) -> ExtractedIds {
    let mut asin = asin.and_then(normalize_asin);
    let mut result_upc = None;
    let mut result_ean = None;

    if let Some(raw) = combined.filter(|s| !s.trim().is_empty()) {
        if let Some(a) = normalize_asin(raw) {
            asin.get_or_insert(a);
        } else if let Some(digits) = normalize_digits(raw) {
            if digits.len() == 12 && valid_upc_check_digit(&digits) {
                result_upc = Some(digits);
            } else if digits.len() == 13 {
                result_ean = Some(digits);
            }
        }
    }

    if result_upc.is_none() {
        if let Some(digits) = upc.and_then(normalize_digits) {
            if digits.len() == 12 && valid_upc_check_digit(&digits) {
                result_upc = Some(digits);
            }
        }
    }
    if result_ean.is_none() {
        if let Some(digits) = ean.and_then(normalize_digits) {
            if digits.len() == 13 {
                result_ean = Some(digits);
            }
        }
    }

    let canonical = asin
        .clone()
        .or_else(|| result_upc.clone())
        .or_else(|| result_ean.clone());

    ExtractedIds {
        asin,
        upc: result_upc,
        ean: result_ean,
        canonical,
    }
}
