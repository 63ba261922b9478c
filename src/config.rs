//! Pipeline configuration.
//!
//! All knobs live in one immutable `Config` value passed into the
//! pipeline. Every section deserializes from TOML with missing fields
//! filled from the defaults below; unknown keys are ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::error::{LotError, LotResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub decision: DecisionConfig,
    pub fees: FeeConfig,
    pub evidence: EvidenceConfig,
    pub throughput: ThroughputConfig,
    pub gating: GatingConfig,
    pub triangulation: TriangulationConfig,
    pub sell: SellConfig,
    pub ladder: LadderConfig,
}

impl Config {
    /// Parse a TOML config. Unknown keys are ignored; missing keys take
    /// the documented defaults.
    pub fn from_toml_str(s: &str) -> LotResult<Config> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on values that would poison every downstream stage.
    pub fn validate(&self) -> LotResult<()> {
        let d = &self.decision;
        if !d.min_roi_target.is_finite() || d.min_roi_target <= 0.0 {
            return Err(LotError::Config(format!(
                "min_roi_target must be finite and positive, got {}",
                d.min_roi_target
            )));
        }
        if !d.risk_threshold.is_finite() || !(0.0..=1.0).contains(&d.risk_threshold) {
            return Err(LotError::Config(format!(
                "risk_threshold must be in [0, 1], got {}",
                d.risk_threshold
            )));
        }
        if d.sellthrough_horizon_days == 0 {
            return Err(LotError::Config(
                "sellthrough_horizon_days must be at least 1".to_string(),
            ));
        }
        if !d.cashfloor.is_finite() {
            return Err(LotError::Config("cashfloor must be finite".to_string()));
        }
        if !(0.0..=1.0).contains(&d.var_alpha) {
            return Err(LotError::Config(format!(
                "var_alpha must be in [0, 1], got {}",
                d.var_alpha
            )));
        }

        let f = &self.fees;
        for (name, v) in [
            ("marketplace_fee_pct", f.marketplace_fee_pct),
            ("payment_fee_pct", f.payment_fee_pct),
            ("per_order_fee_fixed", f.per_order_fee_fixed),
            ("shipping_per_order", f.shipping_per_order),
            ("packaging_per_order", f.packaging_per_order),
            ("refurb_per_order", f.refurb_per_order),
            ("return_rate", f.return_rate),
            ("salvage_frac", f.salvage_frac),
            ("salvage_fee_pct", f.salvage_fee_pct),
            ("lot_fixed_cost", f.lot_fixed_cost),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(LotError::Config(format!(
                    "{} must be finite and non-negative, got {}",
                    name, v
                )));
            }
        }
        if f.return_rate > 1.0 {
            return Err(LotError::Config(format!(
                "return_rate must be at most 1.0, got {}",
                f.return_rate
            )));
        }

        let t = &self.throughput;
        if !t.mins_per_unit.is_finite() || t.mins_per_unit < 0.0 {
            return Err(LotError::Config(format!(
                "mins_per_unit must be finite and non-negative, got {}",
                t.mins_per_unit
            )));
        }
        if !t.capacity_mins_per_day.is_finite() || t.capacity_mins_per_day < 0.0 {
            return Err(LotError::Config(format!(
                "capacity_mins_per_day must be finite and non-negative, got {}",
                t.capacity_mins_per_day
            )));
        }

        let s = &self.sell;
        if !s.hazard_cap.is_finite() || s.hazard_cap <= 0.0 {
            return Err(LotError::Config(format!(
                "hazard_cap must be finite and positive, got {}",
                s.hazard_cap
            )));
        }
        if s.max_rank < s.min_rank {
            return Err(LotError::Config(format!(
                "max_rank {} below min_rank {}",
                s.max_rank, s.min_rank
            )));
        }
        if s.model == SellModelKind::Loglogistic
            && (s.survival_alpha <= 0.0 || s.survival_beta <= 0.0)
        {
            return Err(LotError::Config(format!(
                "survival_alpha and survival_beta must be positive, got {} / {}",
                s.survival_alpha, s.survival_beta
            )));
        }

        if !self.triangulation.cv_fallback.is_finite() || self.triangulation.cv_fallback <= 0.0 {
            return Err(LotError::Config(format!(
                "cv_fallback must be finite and positive, got {}",
                self.triangulation.cv_fallback
            )));
        }

        Ok(())
    }
}

/// Decision thresholds the optimizer enforces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Minimum acceptable ROI multiple (revenue over total cost)
    pub min_roi_target: f64,
    /// Required P(ROI >= target)
    pub risk_threshold: f64,
    /// Horizon in days for sell-through and cash recovery
    pub sellthrough_horizon_days: u32,
    /// Minimum expected cash recovered by the horizon
    pub cashfloor: f64,
    /// Tail-risk alpha for VaR reporting (0.20 => 80% VaR)
    pub var_alpha: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        DecisionConfig {
            min_roi_target: 1.25,
            risk_threshold: 0.80,
            sellthrough_horizon_days: 60,
            cashfloor: 0.0,
            var_alpha: 0.20,
        }
    }
}

/// Marketplace fees and per-order costs, all applied inside the simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    pub marketplace_fee_pct: f64,
    pub payment_fee_pct: f64,
    pub per_order_fee_fixed: f64,
    pub shipping_per_order: f64,
    pub packaging_per_order: f64,
    pub refurb_per_order: f64,
    /// Applied to sold revenue as an expectation multiplier, never a draw
    pub return_rate: f64,
    /// Recovered fraction of the drawn price for unsold units
    pub salvage_frac: f64,
    pub salvage_fee_pct: f64,
    /// Fixed cost added to the bid in the ROI denominator
    pub lot_fixed_cost: f64,
    /// Days between sale and realised cash; policy value for reporting
    pub payout_lag_days: u32,
}

impl Default for FeeConfig {
    fn default() -> Self {
        FeeConfig {
            marketplace_fee_pct: 0.12,
            payment_fee_pct: 0.03,
            per_order_fee_fixed: 0.40,
            shipping_per_order: 0.0,
            packaging_per_order: 0.0,
            refurb_per_order: 0.0,
            return_rate: 0.08,
            salvage_frac: 0.50,
            salvage_fee_pct: 0.0,
            lot_fixed_cost: 0.0,
            payout_lag_days: 14,
        }
    }
}

/// Evidence gate thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceConfig {
    /// Sold comps required before any ambiguity bonus
    pub min_comps_base: u32,
    /// Extra comps required per ambiguity flag
    pub ambiguity_bonus_per_flag: u32,
    /// Ceiling on the adaptive comps requirement
    pub min_comps_max: u32,
    /// Require at least one secondary signal alongside comps
    pub require_secondary: bool,
    /// Lookback window for sold comps, in days
    pub lookback_days: u32,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        EvidenceConfig {
            min_comps_base: 3,
            ambiguity_bonus_per_flag: 1,
            min_comps_max: 5,
            require_secondary: true,
            lookback_days: 180,
        }
    }
}

/// Operational throughput capacity; a hard feasibility gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThroughputConfig {
    pub mins_per_unit: f64,
    pub capacity_mins_per_day: f64,
}

impl Default for ThroughputConfig {
    fn default() -> Self {
        ThroughputConfig {
            mins_per_unit: 5.0,
            capacity_mins_per_day: 480.0,
        }
    }
}

/// What to do with hazmat-flagged items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazmatPolicy {
    Exclude,
    Review,
    Allow,
}

/// Brand and hazmat policy gates, applied before any evidence scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatingConfig {
    /// Brands excluded outright; matched case-insensitively on the
    /// trimmed brand string
    pub gated_brands: Vec<String>,
    pub hazmat_policy: HazmatPolicy,
}

impl Default for GatingConfig {
    fn default() -> Self {
        GatingConfig {
            gated_brands: Vec::new(),
            hazmat_policy: HazmatPolicy::Review,
        }
    }
}

impl GatingConfig {
    pub fn is_gated_brand(&self, brand: &str) -> bool {
        let b = brand.trim().to_lowercase();
        if b.is_empty() {
            return false;
        }
        self.gated_brands
            .iter()
            .any(|g| g.trim().to_lowercase() == b)
    }
}

/// Per-family prior weights for price sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePriors {
    pub keepa: f64,
    pub ebay: f64,
    pub other: f64,
}

impl Default for SourcePriors {
    fn default() -> Self {
        SourcePriors {
            keepa: 0.50,
            ebay: 0.35,
            other: 0.15,
        }
    }
}

/// Price triangulation knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangulationConfig {
    /// Coefficient of variation assumed when a source reports none
    pub cv_fallback: f64,
    pub priors: SourcePriors,
    /// Absolute P5 floor per category
    pub category_floor_abs: HashMap<String, f64>,
    /// P5 floor per category as a fraction of the fused mean
    pub category_floor_frac: HashMap<String, f64>,
}

impl Default for TriangulationConfig {
    fn default() -> Self {
        TriangulationConfig {
            cv_fallback: 0.20,
            priors: SourcePriors::default(),
            category_floor_abs: HashMap::new(),
            category_floor_frac: HashMap::new(),
        }
    }
}

impl TriangulationConfig {
    /// Effective P5 floor for a category, if any.
    pub fn floor_for(&self, category: &str, mu: f64) -> Option<f64> {
        let abs = self.category_floor_abs.get(category).copied();
        let frac = self.category_floor_frac.get(category).map(|f| f * mu);
        match (abs, frac) {
            (Some(a), Some(f)) => Some(a.max(f)),
            (Some(a), None) => Some(a),
            (None, Some(f)) => Some(f),
            (None, None) => None,
        }
    }
}

/// Which sell-through model runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellModelKind {
    Proxy,
    Loglogistic,
}

/// Per-bucket multipliers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionFactors {
    pub new: f64,
    pub like_new: f64,
    pub open_box: f64,
    pub used_good: f64,
    pub used_fair: f64,
    pub for_parts: f64,
    pub unknown: f64,
}

impl ConditionFactors {
    pub fn get(&self, condition: Condition) -> f64 {
        match condition {
            Condition::New => self.new,
            Condition::LikeNew => self.like_new,
            Condition::OpenBox => self.open_box,
            Condition::UsedGood => self.used_good,
            Condition::UsedFair => self.used_fair,
            Condition::ForParts => self.for_parts,
            Condition::Unknown => self.unknown,
        }
    }

    /// Sell-through velocity multipliers by bucket.
    pub fn default_velocity() -> Self {
        ConditionFactors {
            new: 1.00,
            like_new: 1.00,
            open_box: 0.95,
            used_good: 0.90,
            used_fair: 0.85,
            for_parts: 0.50,
            unknown: 0.90,
        }
    }

    /// Price multipliers by bucket; carried for report-layer collaborators.
    pub fn default_price() -> Self {
        ConditionFactors {
            new: 1.00,
            like_new: 0.95,
            open_box: 0.92,
            used_good: 0.85,
            used_fair: 0.75,
            for_parts: 0.40,
            unknown: 0.90,
        }
    }
}

impl Default for ConditionFactors {
    fn default() -> Self {
        ConditionFactors::default_velocity()
    }
}

/// Sell-through model parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SellConfig {
    pub model: SellModelKind,
    /// Power-law scale for market daily sales from rank
    pub rank_a: f64,
    /// Power-law exponent (negative: deeper rank sells slower)
    pub rank_b: f64,
    pub min_rank: f64,
    pub max_rank: f64,
    /// Market daily sales assumed when no usable rank exists
    pub baseline_daily_sales: f64,
    /// Price-to-market elasticity on the hazard
    pub beta_price: f64,
    pub hazard_cap: f64,
    /// Log-logistic scale parameter (time to 50% survival)
    pub survival_alpha: f64,
    /// Log-logistic shape parameter
    pub survival_beta: f64,
    /// Per-category scaling of survival alpha
    pub survival_alpha_scale: HashMap<String, f64>,
    pub condition_velocity_factor: ConditionFactors,
    pub condition_price_factor: ConditionFactors,
    /// Monthly hazard multipliers per category (12 entries, Jan..Dec)
    pub seasonality: HashMap<String, [f64; 12]>,
    pub seasonality_default: f64,
}

impl Default for SellConfig {
    fn default() -> Self {
        SellConfig {
            model: SellModelKind::Proxy,
            rank_a: 500.0,
            rank_b: -0.80,
            min_rank: 1.0,
            max_rank: 2_000_000.0,
            baseline_daily_sales: 0.0,
            beta_price: 0.8,
            hazard_cap: 1.0,
            survival_alpha: 1.0,
            survival_beta: 1.0,
            survival_alpha_scale: HashMap::new(),
            condition_velocity_factor: ConditionFactors::default_velocity(),
            condition_price_factor: ConditionFactors::default_price(),
            seasonality: HashMap::new(),
            seasonality_default: 1.0,
        }
    }
}

impl SellConfig {
    /// Seasonality multiplier for a category in a given month (1..=12).
    /// Falls back to the "default" category, then to the default factor.
    pub fn seasonality_factor(&self, category: &str, month: u32) -> f64 {
        let idx = (month.clamp(1, 12) - 1) as usize;
        self.seasonality
            .get(category)
            .or_else(|| self.seasonality.get("default"))
            .map(|m| m[idx])
            .unwrap_or(self.seasonality_default)
    }

    /// Survival alpha scaling for a category, defaulting to 1.0.
    pub fn alpha_scale(&self, category: &str) -> f64 {
        self.survival_alpha_scale
            .get(category)
            .or_else(|| self.survival_alpha_scale.get("default"))
            .copied()
            .unwrap_or(1.0)
    }
}

/// Pricing ladder schedule parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LadderConfig {
    /// When true, the ladder sell-through replaces the flat estimate
    pub enabled: bool,
    /// Day the discount phase starts
    pub discount_day: u32,
    pub discount_rate: f64,
    /// Day the clearance phase starts
    pub clearance_day: u32,
    /// Clearance price as a fraction of the base price
    pub clearance_fraction: f64,
    /// Elasticity applied to segment hazards; distinct from beta_price
    pub ladder_elasticity: f64,
}

impl Default for LadderConfig {
    fn default() -> Self {
        LadderConfig {
            enabled: false,
            discount_day: 21,
            discount_rate: 0.10,
            clearance_day: 45,
            clearance_fraction: 0.50,
            ladder_elasticity: -0.5,
        }
    }
}
