//! Category thresholds and engine settings
//!
//! This module defines the configuration structures consumed by the
//! recommendation engine. A [`PricingConfig`] document is typically loaded
//! from YAML or JSON and holds engine-wide settings plus per-category
//! thresholds.

use crate::error::{PricingError, PricingResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Canonical form of a category name used as a lookup key
pub fn normalize_category(category: &str) -> String {
    category.trim().to_uppercase()
}

/// Thresholds for one product category
///
/// All rates are percentages. Stock bounds are in days of cover.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Margin above which elasticity-based price increases are considered
    #[serde(default = "default_min_margin_pct")]
    pub min_margin_pct: f64,

    /// CTR at or above which a weak order conversion means overpriced
    #[serde(default = "default_ctr_warning_pct")]
    pub ctr_warning_pct: f64,

    /// Order conversion below which a high-CTR SKU is considered overpriced
    #[serde(default = "default_cr_order_warning_pct")]
    pub cr_order_warning_pct: f64,

    /// Magnitude of a single price move
    #[serde(default = "default_price_step_pct")]
    pub price_step_pct: f64,

    /// Total ad-spend/revenue ratio that counts as a spike
    #[serde(default = "default_drr_warning_pct")]
    pub drr_warning_pct: f64,

    #[serde(default = "default_stock_critical_days")]
    pub stock_critical_days: f64,

    #[serde(default = "default_stock_overstock_days")]
    pub stock_overstock_days: f64,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            min_margin_pct: default_min_margin_pct(),
            ctr_warning_pct: default_ctr_warning_pct(),
            cr_order_warning_pct: default_cr_order_warning_pct(),
            price_step_pct: default_price_step_pct(),
            drr_warning_pct: default_drr_warning_pct(),
            stock_critical_days: default_stock_critical_days(),
            stock_overstock_days: default_stock_overstock_days(),
        }
    }
}

impl CategoryConfig {
    pub fn validate(&self) -> PricingResult<()> {
        let fields = [
            ("min_margin_pct", self.min_margin_pct),
            ("ctr_warning_pct", self.ctr_warning_pct),
            ("cr_order_warning_pct", self.cr_order_warning_pct),
            ("price_step_pct", self.price_step_pct),
            ("drr_warning_pct", self.drr_warning_pct),
            ("stock_critical_days", self.stock_critical_days),
            ("stock_overstock_days", self.stock_overstock_days),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(PricingError::InvalidConfig(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.price_step_pct == 0.0 {
            return Err(PricingError::InvalidConfig(
                "price_step_pct must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Engine-wide tunables shared by every category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Minimum clicks in the trailing week for a trustworthy evaluation
    #[serde(default = "default_min_clicks_7d")]
    pub min_clicks_7d: u64,

    /// Minimum orders in the trailing week for a trustworthy evaluation
    #[serde(default = "default_min_orders_7d")]
    pub min_orders_7d: u64,

    /// Days a regular SKU's price is frozen after a change
    #[serde(default = "default_cooldown_days")]
    pub cooldown_days: u32,

    /// Days a gold SKU's price is frozen after a change
    #[serde(default = "default_gold_cooldown_days")]
    pub gold_cooldown_days: u32,

    /// Largest step a gold SKU may take in one move
    #[serde(default = "default_gold_max_abs_step_pct")]
    pub gold_max_abs_step_pct: f64,

    /// Margin floor below which price decreases are blocked
    #[serde(default = "default_engine_min_margin_pct")]
    pub min_margin_pct: f64,

    /// Validity window of a trigger-layer decision
    #[serde(default = "default_decision_ttl_days")]
    pub decision_ttl_days: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            min_clicks_7d: default_min_clicks_7d(),
            min_orders_7d: default_min_orders_7d(),
            cooldown_days: default_cooldown_days(),
            gold_cooldown_days: default_gold_cooldown_days(),
            gold_max_abs_step_pct: default_gold_max_abs_step_pct(),
            min_margin_pct: default_engine_min_margin_pct(),
            decision_ttl_days: default_decision_ttl_days(),
        }
    }
}

impl EngineSettings {
    /// Cooldown period that applies to a SKU
    pub fn cooldown_for(&self, is_gold: bool) -> u32 {
        if is_gold {
            self.gold_cooldown_days
        } else {
            self.cooldown_days
        }
    }

    pub fn validate(&self) -> PricingResult<()> {
        if !self.gold_max_abs_step_pct.is_finite() || self.gold_max_abs_step_pct < 0.0 {
            return Err(PricingError::InvalidConfig(format!(
                "gold_max_abs_step_pct must be a finite non-negative number, got {}",
                self.gold_max_abs_step_pct
            )));
        }
        if !self.min_margin_pct.is_finite() {
            return Err(PricingError::InvalidConfig(format!(
                "min_margin_pct must be finite, got {}",
                self.min_margin_pct
            )));
        }
        Ok(())
    }
}

/// Complete pricing configuration document
///
/// ```yaml
/// engine:
///   cooldown_days: 7
/// categories:
///   ELECTRONICS:
///     price_step_pct: 2.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default)]
    pub engine: EngineSettings,

    /// Thresholds returned for categories with no entry of their own
    #[serde(default)]
    pub default_category: CategoryConfig,

    #[serde(default)]
    pub categories: HashMap<String, CategoryConfig>,
}

impl PricingConfig {
    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> PricingResult<Self> {
        let config: PricingConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> PricingResult<Self> {
        let config: PricingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from YAML file
    pub fn from_yaml_file(path: &str) -> PricingResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn to_yaml(&self) -> PricingResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check engine settings and every category entry
    pub fn validate(&self) -> PricingResult<()> {
        self.engine.validate()?;
        self.default_category.validate()?;
        for (name, category) in &self.categories {
            category.validate().map_err(|e| match e {
                PricingError::InvalidConfig(msg) => {
                    PricingError::InvalidConfig(format!("category {}: {}", name, msg))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

// Default value functions
fn default_min_margin_pct() -> f64 {
    20.0
}

fn default_ctr_warning_pct() -> f64 {
    2.0
}

fn default_cr_order_warning_pct() -> f64 {
    2.5
}

fn default_price_step_pct() -> f64 {
    3.0
}

fn default_drr_warning_pct() -> f64 {
    15.0
}

fn default_stock_critical_days() -> f64 {
    10.0
}

fn default_stock_overstock_days() -> f64 {
    120.0
}

fn default_min_clicks_7d() -> u64 {
    30
}

fn default_min_orders_7d() -> u64 {
    10
}

fn default_cooldown_days() -> u32 {
    7
}

fn default_gold_cooldown_days() -> u32 {
    14
}

fn default_gold_max_abs_step_pct() -> f64 {
    2.0
}

fn default_engine_min_margin_pct() -> f64 {
    15.0
}

fn default_decision_ttl_days() -> u32 {
    7
}
