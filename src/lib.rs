//! # ag-pricing: Price and Ads Recommendation Engine
//!
//! This library turns per-SKU funnel, stock and margin metrics into a price
//! move and an advertising action, each tagged with a machine-checkable
//! reason code.
//!
//! ## Core Components
//!
//! - **Guard layer**: holds evaluations with too little data or a recent
//!   price change
//! - **Trigger layer**: ordered rule chain (STOP, LOW_STOCK, CLEAR,
//!   OVERPRICED, DRR_SPIKE, ELASTICITY) plus margin-floor and gold-SKU filters
//! - **Configuration**: per-category thresholds loaded from YAML/JSON, looked
//!   up case-insensitively through a read-through cache
//! - **RecommendationLog**: applied/not-applied tracking and effectiveness
//!
//! All rates are percentages (0-100).
//!
//! ## Example Usage
//!
//! ```rust
//! use ag_pricing::{MetricsSnapshot, PriceAction, ReasonCode, RecommendationEngine};
//! use chrono::NaiveDate;
//!
//! let yaml = r#"
//! engine:
//!   min_clicks_7d: 30
//!   min_orders_7d: 10
//! categories:
//!   electronics:
//!     stock_overstock_days: 120
//!     price_step_pct: 3.0
//! "#;
//!
//! let (engine, categories) = RecommendationEngine::from_yaml(yaml).unwrap();
//!
//! let mut snapshot = MetricsSnapshot::new("SKU-42", "Electronics", 1000.0, 350.0);
//! snapshot.clicks_7d = 600;
//! snapshot.orders_7d = 35;
//! snapshot.stock_cover_days = Some(130.0);
//!
//! let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
//! let decision = engine.evaluate_at(&snapshot, &categories, None, today).unwrap();
//! assert_eq!(decision.reason, ReasonCode::Clear);
//! assert_eq!(decision.price_action, PriceAction::Down);
//! assert_eq!(decision.recommended_price, Some(970));
//! ```

mod config;
mod decision;
mod engine;
mod error;
mod log;
mod metrics;
mod provider;

pub mod guards;
pub mod numeric;
pub mod triggers;

pub use config::{normalize_category, CategoryConfig, EngineSettings, PricingConfig};
pub use decision::{AdsAction, Decision, PriceAction, ReasonCode};
pub use engine::{BatchItem, BatchSummary, RecommendationEngine, SkuInput};
pub use error::{PricingError, PricingResult};
pub use guards::GuardOutcome;
pub use log::{EffectivenessReport, LogEntry, OutcomeDelta, ReasonEffectiveness, RecommendationLog};
pub use metrics::{AdSpendRatios, ElasticityResult, MetricsSnapshot, RateScale};
pub use numeric::FunnelRates;
pub use provider::{
    CachedConfigProvider, CategoryTable, ConfigProvider, ConfigSource, InMemoryConfigSource,
};
