//! Recommendation output model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of the recommended price move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceAction {
    Up,
    Down,
    Hold,
}

/// Recommended change to advertising spend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdsAction {
    Scale,
    Reduce,
    Pause,
    Hold,
}

/// Machine-checkable reason attached to every decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    InsufficientData,
    CooldownActive,
    Stop,
    Clear,
    LowStock,
    LowStockElastic,
    LowStockDrr,
    Overpriced,
    DrrSpike,
    ElasticityPremium,
    ElasticityInelastic,
    MinMarginBlock,
    GoldProtection,
    HoldNoTrigger,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::InsufficientData => "INSUFFICIENT_DATA",
            ReasonCode::CooldownActive => "COOLDOWN_ACTIVE",
            ReasonCode::Stop => "STOP",
            ReasonCode::Clear => "CLEAR",
            ReasonCode::LowStock => "LOW_STOCK",
            ReasonCode::LowStockElastic => "LOW_STOCK_ELASTIC",
            ReasonCode::LowStockDrr => "LOW_STOCK_DRR",
            ReasonCode::Overpriced => "OVERPRICED",
            ReasonCode::DrrSpike => "DRR_SPIKE",
            ReasonCode::ElasticityPremium => "ELASTICITY_PREMIUM",
            ReasonCode::ElasticityInelastic => "ELASTICITY_INELASTIC",
            ReasonCode::MinMarginBlock => "MIN_MARGIN_BLOCK",
            ReasonCode::GoldProtection => "GOLD_PROTECTION",
            ReasonCode::HoldNoTrigger => "HOLD_NO_TRIGGER",
        }
    }

    /// Whether the code comes from the guard layer rather than a trigger
    pub fn is_guard(&self) -> bool {
        matches!(self, ReasonCode::InsufficientData | ReasonCode::CooldownActive)
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price and advertising recommendation for one SKU
///
/// Always a fresh value computed from the inputs; nothing mutates it after
/// the engine returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub sku: String,

    pub price_action: PriceAction,

    /// Signed step in percent; 0 when the price action is HOLD
    pub price_step_pct: f64,

    /// Target price in whole currency units; `None` when holding
    pub recommended_price: Option<i64>,

    pub ads_action: AdsAction,

    pub reason: ReasonCode,

    /// Display text with the concrete values that triggered the rule
    pub reason_text: String,

    pub ttl_days: u32,

    pub next_review_date: Option<NaiveDate>,

    pub evaluated_on: NaiveDate,
}

impl Decision {
    /// A decision that leaves the price untouched
    pub fn hold(
        sku: impl Into<String>,
        ads_action: AdsAction,
        reason: ReasonCode,
        reason_text: impl Into<String>,
        evaluated_on: NaiveDate,
    ) -> Self {
        Self {
            sku: sku.into(),
            price_action: PriceAction::Hold,
            price_step_pct: 0.0,
            recommended_price: None,
            ads_action,
            reason,
            reason_text: reason_text.into(),
            ttl_days: 0,
            next_review_date: None,
            evaluated_on,
        }
    }

    /// Set the validity window and derive the next review date from it
    pub fn with_ttl(mut self, ttl_days: u32) -> Self {
        self.ttl_days = ttl_days;
        self.next_review_date = self
            .evaluated_on
            .checked_add_days(chrono::Days::new(u64::from(ttl_days)));
        self
    }

    pub fn is_hold(&self) -> bool {
        self.price_action == PriceAction::Hold
    }
}
