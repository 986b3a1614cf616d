//! Per-SKU input model
//!
//! A [`MetricsSnapshot`] is assembled upstream by joining funnel imports with
//! stock and catalog data. All rates are percentages (0-100); fraction inputs
//! are converted once with [`MetricsSnapshot::normalized`].

use crate::error::{PricingError, PricingResult};
use crate::numeric::{self, FunnelRates};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Scale the caller's rate fields are expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateScale {
    /// 0-100
    Percent,
    /// 0-1
    Fraction,
}

/// Advertising spend as a percentage of revenue, per channel
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AdSpendRatios {
    #[serde(default)]
    pub search_pct: f64,
    #[serde(default)]
    pub media_pct: f64,
    #[serde(default)]
    pub bloggers_pct: f64,
    #[serde(default)]
    pub other_pct: f64,
}

impl AdSpendRatios {
    /// Total DRR across all channels
    pub fn total_pct(&self) -> f64 {
        self.search_pct + self.media_pct + self.bloggers_pct + self.other_pct
    }
}

/// Elasticity signals for one SKU
///
/// Estimation happens elsewhere; the engine only consumes the result.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElasticityResult {
    /// Δ%units / Δ%price
    pub price_elasticity: f64,
    /// Δ%DRR / Δ%price
    pub drr_elasticity: f64,
}

impl ElasticityResult {
    /// Zero signals: blocks nothing, accelerates nothing
    pub fn neutral() -> Self {
        Self::default()
    }
}

/// Funnel, stock and commercial metrics for one SKU
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub sku: String,

    /// Category name; matched case-insensitively against the config table
    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub clicks_7d: u64,
    #[serde(default)]
    pub orders_7d: u64,
    #[serde(default)]
    pub views_7d: u64,
    #[serde(default)]
    pub cart_adds_7d: u64,

    #[serde(default)]
    pub ctr_pct: f64,
    #[serde(default)]
    pub cart_conversion_pct: f64,
    #[serde(default)]
    pub order_conversion_pct: f64,

    /// Average selling price over the window
    pub avg_price: f64,

    /// Price the buyer actually pays after marketplace discounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_price: Option<f64>,

    pub profit_before_marketing: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin_pct: Option<f64>,

    #[serde(default)]
    pub stock_units: u64,

    /// Precomputed cover; derived from stock and orders when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_cover_days: Option<f64>,

    #[serde(default)]
    pub ads: AdSpendRatios,

    /// Flagship SKU: smaller steps, longer cooldown
    #[serde(default)]
    pub is_gold: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_price_change: Option<DateTime<Utc>>,

    /// Evaluation date; the engine uses today when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
}

impl MetricsSnapshot {
    /// Create a snapshot with only the required fields set
    pub fn new(
        sku: impl Into<String>,
        category: impl Into<String>,
        avg_price: f64,
        profit_before_marketing: f64,
    ) -> Self {
        Self {
            sku: sku.into(),
            category: category.into(),
            clicks_7d: 0,
            orders_7d: 0,
            views_7d: 0,
            cart_adds_7d: 0,
            ctr_pct: 0.0,
            cart_conversion_pct: 0.0,
            order_conversion_pct: 0.0,
            avg_price,
            buyer_price: None,
            profit_before_marketing,
            margin_pct: None,
            stock_units: 0,
            stock_cover_days: None,
            ads: AdSpendRatios::default(),
            is_gold: false,
            last_price_change: None,
            as_of: None,
        }
    }

    /// Reject snapshots that cannot be evaluated at all
    pub fn validate(&self) -> PricingResult<()> {
        if self.sku.trim().is_empty() {
            return Err(PricingError::MissingField("sku"));
        }
        Ok(())
    }

    /// Fill the rate fields from the funnel counts
    pub fn with_derived_rates(mut self) -> Self {
        let rates = FunnelRates::from_counts(
            self.views_7d,
            self.clicks_7d,
            self.cart_adds_7d,
            self.orders_7d,
        );
        self.ctr_pct = rates.ctr_pct;
        self.cart_conversion_pct = rates.cart_conversion_pct;
        self.order_conversion_pct = rates.order_conversion_pct;
        self
    }

    /// Convert every rate field to percent from the given scale
    pub fn normalized(mut self, scale: RateScale) -> Self {
        if scale == RateScale::Percent {
            return self;
        }
        let pct = numeric::fraction_to_pct;
        self.ctr_pct = pct(self.ctr_pct);
        self.cart_conversion_pct = pct(self.cart_conversion_pct);
        self.order_conversion_pct = pct(self.order_conversion_pct);
        self.margin_pct = self.margin_pct.map(pct);
        self.ads = AdSpendRatios {
            search_pct: pct(self.ads.search_pct),
            media_pct: pct(self.ads.media_pct),
            bloggers_pct: pct(self.ads.bloggers_pct),
            other_pct: pct(self.ads.other_pct),
        };
        self
    }

    /// Stock cover in days, or `None` when it cannot be known
    pub fn effective_stock_cover(&self) -> Option<f64> {
        match self.stock_cover_days {
            Some(days) if days.is_finite() => Some(days),
            Some(_) => None,
            None => numeric::stock_cover_days(self.stock_units, self.orders_7d),
        }
    }
}
