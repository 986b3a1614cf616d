//! Guard layer
//!
//! Pre-checks that can short-circuit an evaluation with a HOLD before any
//! trigger runs. Guards are checked in order: insufficient data, then
//! cooldown.

use crate::config::EngineSettings;
use crate::decision::{AdsAction, Decision, ReasonCode};
use crate::metrics::MetricsSnapshot;
use crate::numeric::days_between;
use chrono::{Days, NaiveDate};

/// Result of running the guards for one SKU
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    /// A guard fired; this is the final decision
    Hold(Decision),
    /// No guard fired; go on to the triggers
    Continue,
}

impl GuardOutcome {
    pub fn is_hold(&self) -> bool {
        matches!(self, GuardOutcome::Hold(_))
    }
}

/// Run every guard in precedence order
pub fn check(
    snapshot: &MetricsSnapshot,
    settings: &EngineSettings,
    today: NaiveDate,
) -> GuardOutcome {
    if let Some(decision) = insufficient_data(snapshot, settings, today) {
        return GuardOutcome::Hold(decision);
    }
    if let Some(decision) = cooldown(snapshot, settings, today) {
        return GuardOutcome::Hold(decision);
    }
    GuardOutcome::Continue
}

/// HOLD when the trailing week has too few clicks or orders to trust
pub fn insufficient_data(
    snapshot: &MetricsSnapshot,
    settings: &EngineSettings,
    today: NaiveDate,
) -> Option<Decision> {
    if snapshot.clicks_7d >= settings.min_clicks_7d
        && snapshot.orders_7d >= settings.min_orders_7d
    {
        return None;
    }

    let text = format!(
        "Not enough data: {} clicks (min {}), {} orders (min {}) in 7 days",
        snapshot.clicks_7d, settings.min_clicks_7d, snapshot.orders_7d, settings.min_orders_7d
    );
    Some(Decision::hold(
        snapshot.sku.clone(),
        AdsAction::Hold,
        ReasonCode::InsufficientData,
        text,
        today,
    ))
}

/// HOLD while the last price change is still inside its cooldown window.
///
/// A change dated in the future (negative elapsed days) does not count.
pub fn cooldown(
    snapshot: &MetricsSnapshot,
    settings: &EngineSettings,
    today: NaiveDate,
) -> Option<Decision> {
    let changed_on = snapshot.last_price_change?.date_naive();
    let period = settings.cooldown_for(snapshot.is_gold);
    let elapsed = days_between(changed_on, today);

    if elapsed < 0 || elapsed >= i64::from(period) {
        return None;
    }

    let remaining = period - elapsed as u32;
    let mut decision = Decision::hold(
        snapshot.sku.clone(),
        AdsAction::Hold,
        ReasonCode::CooldownActive,
        format!(
            "Price changed {} day(s) ago on {}, cooldown is {} days",
            elapsed, changed_on, period
        ),
        today,
    );
    decision.ttl_days = remaining;
    decision.next_review_date = changed_on.checked_add_days(Days::new(u64::from(period)));
    Some(decision)
}
