//! Recommendation log
//!
//! This module keeps decisions keyed by SKU and recording time so that the
//! effect of applied recommendations can be measured later.

use crate::decision::{Decision, PriceAction, ReasonCode};
use crate::error::{PricingError, PricingResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// Observed change after a recommendation was applied
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeDelta {
    /// Revenue change versus the period before, in percent
    pub revenue_delta_pct: f64,
    /// Order conversion change, in percentage points
    pub cr_delta_pct: f64,
}

/// One logged recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub decision: Decision,
    pub recorded_at: DateTime<Utc>,
    pub applied_at: Option<DateTime<Utc>>,
    pub outcome: Option<OutcomeDelta>,
}

impl LogEntry {
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// In-memory recommendation log
///
/// Entries for a SKU are kept sorted by `recorded_at`. Recording twice at the
/// same instant replaces the earlier entry. Retention is up to the caller
/// through [`prune_before`](Self::prune_before).
#[derive(Debug, Clone, Default)]
pub struct RecommendationLog {
    entries: HashMap<String, Vec<LogEntry>>,
}

impl RecommendationLog {
    /// Create an empty log
    ///
    /// # Example
    ///
    /// ```
    /// use ag_pricing::{AdsAction, Decision, ReasonCode, RecommendationLog};
    /// use chrono::{NaiveDate, Utc};
    ///
    /// let mut log = RecommendationLog::new();
    /// let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    /// let decision = Decision::hold("SKU-1", AdsAction::Reduce, ReasonCode::DrrSpike, "", day);
    ///
    /// let at = Utc::now();
    /// log.record(decision, at);
    /// log.mark_applied("SKU-1", at, at).unwrap();
    /// assert!(log.latest("SKU-1").unwrap().is_applied());
    /// ```
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn record(&mut self, decision: Decision, recorded_at: DateTime<Utc>) {
        let entries = self.entries.entry(decision.sku.clone()).or_default();
        let entry = LogEntry {
            decision,
            recorded_at,
            applied_at: None,
            outcome: None,
        };
        match entries.binary_search_by_key(&recorded_at, |e| e.recorded_at) {
            Ok(idx) => entries[idx] = entry,
            Err(idx) => entries.insert(idx, entry),
        }
    }

    /// Flag a logged recommendation as applied by the operator
    pub fn mark_applied(
        &mut self,
        sku: &str,
        recorded_at: DateTime<Utc>,
        applied_at: DateTime<Utc>,
    ) -> PricingResult<()> {
        self.entry_mut(sku, recorded_at)?.applied_at = Some(applied_at);
        Ok(())
    }

    /// Attach the realized revenue/CR change to a logged recommendation
    pub fn record_outcome(
        &mut self,
        sku: &str,
        recorded_at: DateTime<Utc>,
        outcome: OutcomeDelta,
    ) -> PricingResult<()> {
        self.entry_mut(sku, recorded_at)?.outcome = Some(outcome);
        Ok(())
    }

    fn entry_mut(
        &mut self,
        sku: &str,
        recorded_at: DateTime<Utc>,
    ) -> PricingResult<&mut LogEntry> {
        let not_found = || PricingError::EntryNotFound {
            sku: sku.to_string(),
            recorded_at,
        };
        let entries = self.entries.get_mut(sku).ok_or_else(not_found)?;
        let idx = entries
            .binary_search_by_key(&recorded_at, |e| e.recorded_at)
            .map_err(|_| not_found())?;
        Ok(&mut entries[idx])
    }

    pub fn entries_for(&self, sku: &str) -> &[LogEntry] {
        self.entries.get(sku).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn latest(&self, sku: &str) -> Option<&LogEntry> {
        self.entries_for(sku).last()
    }

    /// When the SKU's price was last actually changed through the log
    ///
    /// Feeds `MetricsSnapshot::last_price_change` for the cooldown guard.
    pub fn last_applied_change(&self, sku: &str) -> Option<DateTime<Utc>> {
        self.entries_for(sku)
            .iter()
            .filter(|e| e.decision.price_action != PriceAction::Hold)
            .filter_map(|e| e.applied_at)
            .max()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop entries recorded before `cutoff`, returning how many were removed
    ///
    /// The log never expires entries on its own. Callers decide the retention
    /// window, e.g. `Utc::now() - Duration::days(90)`.
    pub fn prune_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.len();
        for entries in self.entries.values_mut() {
            // Sorted by recorded_at
            let keep_from = entries.partition_point(|e| e.recorded_at < cutoff);
            entries.drain(..keep_from);
        }
        self.entries.retain(|_, entries| !entries.is_empty());

        let removed = before - self.len();
        if removed > 0 {
            info!(removed, cutoff = %cutoff, "Pruned recommendation log");
        }
        removed
    }

    /// Aggregate outcomes of applied recommendations
    pub fn effectiveness(&self) -> EffectivenessReport {
        let mut report = EffectivenessReport::default();
        let mut overall = OutcomeAccumulator::default();
        let mut per_reason: BTreeMap<ReasonCode, (usize, OutcomeAccumulator)> = BTreeMap::new();

        for entry in self.entries.values().flatten() {
            report.recorded += 1;
            if !entry.is_applied() {
                continue;
            }
            report.applied += 1;
            let slot = per_reason.entry(entry.decision.reason).or_default();
            slot.0 += 1;
            if let Some(outcome) = entry.outcome {
                overall.add(outcome);
                slot.1.add(outcome);
            }
        }

        report.with_outcome = overall.count;
        report.mean_revenue_delta_pct = overall.mean_revenue();
        report.mean_cr_delta_pct = overall.mean_cr();
        report.by_reason = per_reason
            .into_iter()
            .map(|(reason, (applied, acc))| {
                (
                    reason,
                    ReasonEffectiveness {
                        applied,
                        with_outcome: acc.count,
                        mean_revenue_delta_pct: acc.mean_revenue(),
                        mean_cr_delta_pct: acc.mean_cr(),
                    },
                )
            })
            .collect();
        report
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct OutcomeAccumulator {
    count: usize,
    revenue_sum: f64,
    cr_sum: f64,
}

impl OutcomeAccumulator {
    fn add(&mut self, outcome: OutcomeDelta) {
        self.count += 1;
        self.revenue_sum += outcome.revenue_delta_pct;
        self.cr_sum += outcome.cr_delta_pct;
    }

    fn mean_revenue(&self) -> Option<f64> {
        (self.count > 0).then(|| self.revenue_sum / self.count as f64)
    }

    fn mean_cr(&self) -> Option<f64> {
        (self.count > 0).then(|| self.cr_sum / self.count as f64)
    }
}

/// How applied recommendations performed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EffectivenessReport {
    pub recorded: usize,
    pub applied: usize,
    /// Applied entries with a measured outcome
    pub with_outcome: usize,
    pub mean_revenue_delta_pct: Option<f64>,
    pub mean_cr_delta_pct: Option<f64>,
    pub by_reason: BTreeMap<ReasonCode, ReasonEffectiveness>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReasonEffectiveness {
    pub applied: usize,
    pub with_outcome: usize,
    pub mean_revenue_delta_pct: Option<f64>,
    pub mean_cr_delta_pct: Option<f64>,
}
