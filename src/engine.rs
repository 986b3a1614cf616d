//! Recommendation engine
//!
//! This module ties the guard layer, the configuration lookup and the trigger
//! layer together for one SKU or a batch of SKUs.

use crate::config::{EngineSettings, PricingConfig};
use crate::decision::{Decision, PriceAction, ReasonCode};
use crate::error::PricingResult;
use crate::guards::{self, GuardOutcome};
use crate::metrics::{ElasticityResult, MetricsSnapshot};
use crate::provider::{CategoryTable, ConfigProvider};
use crate::triggers;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// One SKU's inputs for a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuInput {
    pub snapshot: MetricsSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elasticity: Option<ElasticityResult>,
}

impl SkuInput {
    pub fn new(snapshot: MetricsSnapshot) -> Self {
        Self {
            snapshot,
            elasticity: None,
        }
    }

    pub fn with_elasticity(mut self, elasticity: ElasticityResult) -> Self {
        self.elasticity = Some(elasticity);
        self
    }
}

/// Result for one SKU of a batch, keyed by SKU
pub type BatchItem = (String, PricingResult<Decision>);

/// Price and advertising recommendation engine
///
/// The engine holds only engine-wide settings. Category thresholds are passed
/// in on every call so that a batch can pin one immutable table.
#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    settings: EngineSettings,
}

impl RecommendationEngine {
    /// Create a new engine from settings
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &PricingConfig) -> Self {
        Self::new(config.engine)
    }

    /// Load settings and category table from a YAML document
    ///
    /// # Example
    ///
    /// ```
    /// use ag_pricing::{ConfigProvider, RecommendationEngine};
    ///
    /// let yaml = r#"
    /// engine:
    ///   cooldown_days: 5
    /// categories:
    ///   shoes:
    ///     price_step_pct: 4.0
    /// "#;
    ///
    /// let (engine, table) = RecommendationEngine::from_yaml(yaml).unwrap();
    /// assert_eq!(engine.settings().cooldown_days, 5);
    /// assert_eq!(table.category_config("SHOES").price_step_pct, 4.0);
    /// ```
    pub fn from_yaml(yaml: &str) -> PricingResult<(Self, CategoryTable)> {
        let config = PricingConfig::from_yaml(yaml)?;
        Ok((Self::from_config(&config), CategoryTable::from_config(&config)))
    }

    /// Load settings and category table from a JSON document
    pub fn from_json(json: &str) -> PricingResult<(Self, CategoryTable)> {
        let config = PricingConfig::from_json(json)?;
        Ok((Self::from_config(&config), CategoryTable::from_config(&config)))
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Evaluate one SKU as of its `as_of` date, or today
    pub fn evaluate<P>(
        &self,
        snapshot: &MetricsSnapshot,
        configs: &P,
        elasticity: Option<&ElasticityResult>,
    ) -> PricingResult<Decision>
    where
        P: ConfigProvider + ?Sized,
    {
        self.evaluate_at(snapshot, configs, elasticity, Utc::now().date_naive())
    }

    /// Evaluate one SKU, using `today` when the snapshot carries no `as_of`
    ///
    /// Only a snapshot without a SKU is an error. Guard holds come back as
    /// regular decisions.
    ///
    /// # Example
    ///
    /// ```
    /// use ag_pricing::{
    ///     CategoryTable, MetricsSnapshot, PriceAction, ReasonCode, RecommendationEngine,
    /// };
    /// use chrono::NaiveDate;
    ///
    /// let engine = RecommendationEngine::default();
    /// let mut snapshot = MetricsSnapshot::new("SKU-1", "SHOES", 1000.0, -500.0);
    /// snapshot.clicks_7d = 200;
    /// snapshot.orders_7d = 20;
    ///
    /// let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    /// let decision = engine
    ///     .evaluate_at(&snapshot, &CategoryTable::default(), None, today)
    ///     .unwrap();
    /// assert_eq!(decision.reason, ReasonCode::Stop);
    /// assert_eq!(decision.price_action, PriceAction::Up);
    /// ```
    pub fn evaluate_at<P>(
        &self,
        snapshot: &MetricsSnapshot,
        configs: &P,
        elasticity: Option<&ElasticityResult>,
        today: NaiveDate,
    ) -> PricingResult<Decision>
    where
        P: ConfigProvider + ?Sized,
    {
        snapshot.validate()?;
        let today = snapshot.as_of.unwrap_or(today);

        if let GuardOutcome::Hold(decision) = guards::check(snapshot, &self.settings, today) {
            debug!(sku = %snapshot.sku, reason = %decision.reason, "Guard hold");
            return Ok(decision);
        }

        let category = configs.category_config(&snapshot.category);
        let decision = triggers::evaluate(snapshot, &category, elasticity, &self.settings, today);
        debug!(
            sku = %decision.sku,
            price_action = ?decision.price_action,
            step_pct = decision.price_step_pct,
            reason = %decision.reason,
            "Decision produced"
        );
        Ok(decision)
    }

    /// Evaluate a batch against one pinned category table
    pub fn evaluate_batch(&self, inputs: &[SkuInput], table: &CategoryTable) -> Vec<BatchItem> {
        self.evaluate_batch_at(inputs, table, Utc::now().date_naive())
    }

    pub fn evaluate_batch_at(
        &self,
        inputs: &[SkuInput],
        table: &CategoryTable,
        today: NaiveDate,
    ) -> Vec<BatchItem> {
        let results: Vec<BatchItem> = inputs
            .iter()
            .map(|input| {
                let decision =
                    self.evaluate_at(&input.snapshot, table, input.elasticity.as_ref(), today);
                (input.snapshot.sku.clone(), decision)
            })
            .collect();

        let summary = BatchSummary::from_results(&results);
        info!(
            total = summary.total,
            errors = summary.errors,
            up = summary.count(PriceAction::Up),
            down = summary.count(PriceAction::Down),
            hold = summary.count(PriceAction::Hold),
            "Batch evaluated"
        );
        results
    }

    /// Evaluate a batch across blocking tasks, one per chunk
    ///
    /// Results keep the input order.
    #[cfg(feature = "async")]
    pub async fn evaluate_batch_concurrent(
        self: std::sync::Arc<Self>,
        inputs: Vec<SkuInput>,
        table: std::sync::Arc<CategoryTable>,
        chunk_size: usize,
    ) -> PricingResult<Vec<BatchItem>> {
        let today = Utc::now().date_naive();
        let chunk_size = chunk_size.max(1);

        let mut handles = Vec::new();
        for chunk in inputs.chunks(chunk_size) {
            let chunk = chunk.to_vec();
            let engine = std::sync::Arc::clone(&self);
            let table = std::sync::Arc::clone(&table);
            handles.push(tokio::task::spawn_blocking(move || {
                engine.evaluate_batch_at(&chunk, &table, today)
            }));
        }

        let mut results = Vec::with_capacity(inputs.len());
        for handle in handles {
            let chunk = handle
                .await
                .map_err(|e| crate::PricingError::TaskFailed(e.to_string()))?;
            results.extend(chunk);
        }
        Ok(results)
    }
}

/// Counts over a batch of decisions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub errors: usize,
    pub by_price_action: HashMap<PriceAction, usize>,
    pub by_reason: BTreeMap<ReasonCode, usize>,
}

impl BatchSummary {
    pub fn from_results(results: &[BatchItem]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for (_, result) in results {
            match result {
                Ok(decision) => summary.add(decision),
                Err(_) => summary.errors += 1,
            }
        }
        summary
    }

    pub fn from_decisions<'a>(decisions: impl IntoIterator<Item = &'a Decision>) -> Self {
        let mut summary = Self::default();
        for decision in decisions {
            summary.total += 1;
            summary.add(decision);
        }
        summary
    }

    fn add(&mut self, decision: &Decision) {
        *self.by_price_action.entry(decision.price_action).or_insert(0) += 1;
        *self.by_reason.entry(decision.reason).or_insert(0) += 1;
    }

    pub fn count(&self, action: PriceAction) -> usize {
        self.by_price_action.get(&action).copied().unwrap_or(0)
    }

    pub fn reason_count(&self, reason: ReasonCode) -> usize {
        self.by_reason.get(&reason).copied().unwrap_or(0)
    }
}
