//! Numeric and date helpers shared by the guard and trigger layers

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Length of the trailing funnel window in days
pub const FUNNEL_WINDOW_DAYS: f64 = 7.0;

/// Days of inventory left at the current sell-through rate.
///
/// Returns `None` when no orders were made in the window or the result is not
/// finite. Unknown cover is not the same as zero cover: stock triggers must
/// not fire on it.
pub fn stock_cover_days(stock_units: u64, orders_7d: u64) -> Option<f64> {
    if orders_7d == 0 {
        return None;
    }
    let per_day = orders_7d as f64 / FUNNEL_WINDOW_DAYS;
    let cover = stock_units as f64 / per_day;
    cover.is_finite().then_some(cover)
}

/// Apply a signed percentage step to a price and round to whole currency units.
///
/// Non-finite or non-positive prices yield 0.
pub fn round_price(current_price: f64, step_pct: f64) -> i64 {
    if !current_price.is_finite() || current_price <= 0.0 {
        return 0;
    }
    let target = (current_price * (1.0 + step_pct / 100.0)).round();
    if target.is_finite() && target > 0.0 {
        target as i64
    } else {
        0
    }
}

/// Whole days from `from` to `to` (negative when `to` is earlier)
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

pub fn fraction_to_pct(value: f64) -> f64 {
    value * 100.0
}

fn ratio_pct(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}

/// Funnel conversion rates, in percent
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FunnelRates {
    /// clicks / views
    pub ctr_pct: f64,
    /// cart adds / clicks
    pub cart_conversion_pct: f64,
    /// orders / clicks
    pub order_conversion_pct: f64,
}

impl FunnelRates {
    /// Derive rates from raw funnel counts. A zero denominator gives 0%.
    pub fn from_counts(views: u64, clicks: u64, cart_adds: u64, orders: u64) -> Self {
        Self {
            ctr_pct: ratio_pct(clicks, views),
            cart_conversion_pct: ratio_pct(cart_adds, clicks),
            order_conversion_pct: ratio_pct(orders, clicks),
        }
    }
}
