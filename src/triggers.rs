//! Trigger/decision layer
//!
//! Rules are evaluated top to bottom and the first one that fires wins:
//!
//! 1. STOP - non-positive profit before marketing
//! 2. LOW_STOCK - cover at or below the critical bound (beats CLEAR)
//! 3. CLEAR - cover at or above the overstock bound
//! 4. OVERPRICED - strong CTR, weak order conversion
//! 5. DRR_SPIKE - total ad spend ratio above the warning level
//! 6. ELASTICITY - upside moves when margin is healthy
//!
//! When nothing fires the price is held. The margin floor and the gold clamp
//! then run over the winning outcome.

use crate::config::{CategoryConfig, EngineSettings};
use crate::decision::{AdsAction, Decision, PriceAction, ReasonCode};
use crate::metrics::{ElasticityResult, MetricsSnapshot};
use crate::numeric::round_price;
use chrono::NaiveDate;
use tracing::{debug, warn};

/// Elasticity below this means raising the price would sharply cut volume
const HIGHLY_ELASTIC: f64 = -1.0;

/// Elasticity above this is treated as inelastic enough to raise the price
const INELASTIC_FLOOR: f64 = -0.3;

/// Inputs every rule can see
#[derive(Debug, Clone, Copy)]
pub struct TriggerContext<'a> {
    pub snapshot: &'a MetricsSnapshot,
    pub category: &'a CategoryConfig,
    pub elasticity: ElasticityResult,
    pub stock_cover: Option<f64>,
}

/// What a rule decided, before post-filters
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerOutcome {
    pub price_action: PriceAction,
    pub step_pct: f64,
    pub ads_action: AdsAction,
    pub reason: ReasonCode,
    pub text: String,
}

impl TriggerOutcome {
    fn up(step_pct: f64, ads_action: AdsAction, reason: ReasonCode, text: String) -> Self {
        Self {
            price_action: PriceAction::Up,
            step_pct: step_pct.abs(),
            ads_action,
            reason,
            text,
        }
    }

    fn down(step_pct: f64, ads_action: AdsAction, reason: ReasonCode, text: String) -> Self {
        Self {
            price_action: PriceAction::Down,
            step_pct: -step_pct.abs(),
            ads_action,
            reason,
            text,
        }
    }

    fn hold(ads_action: AdsAction, reason: ReasonCode, text: String) -> Self {
        Self {
            price_action: PriceAction::Hold,
            step_pct: 0.0,
            ads_action,
            reason,
            text,
        }
    }
}

type Rule = fn(&TriggerContext<'_>) -> Option<TriggerOutcome>;

/// Priority chain; order is significant
const RULES: [(&str, Rule); 6] = [
    ("stop", stop),
    ("low_stock", low_stock),
    ("clear", clear),
    ("overpriced", overpriced),
    ("drr_spike", drr_spike),
    ("elasticity", elasticity_upside),
];

/// Run the rule chain and post-filters for a SKU that passed the guards
pub fn evaluate(
    snapshot: &MetricsSnapshot,
    category: &CategoryConfig,
    elasticity: Option<&ElasticityResult>,
    settings: &EngineSettings,
    today: NaiveDate,
) -> Decision {
    let ctx = TriggerContext {
        snapshot,
        category,
        elasticity: elasticity.copied().unwrap_or_else(ElasticityResult::neutral),
        stock_cover: snapshot.effective_stock_cover(),
    };

    let outcome = first_match(&ctx);
    let outcome = apply_margin_floor(outcome, snapshot, settings);
    let outcome = apply_gold_clamp(outcome, snapshot, settings);
    let outcome = hold_without_step(outcome, snapshot);

    let recommended_price = match outcome.price_action {
        PriceAction::Hold => None,
        _ => {
            if !snapshot.avg_price.is_finite() || snapshot.avg_price <= 0.0 {
                warn!(
                    sku = %snapshot.sku,
                    avg_price = snapshot.avg_price,
                    "Current price is not usable, recommending 0"
                );
            }
            Some(round_price(snapshot.avg_price, outcome.step_pct))
        }
    };

    Decision {
        sku: snapshot.sku.clone(),
        price_action: outcome.price_action,
        price_step_pct: outcome.step_pct,
        recommended_price,
        ads_action: outcome.ads_action,
        reason: outcome.reason,
        reason_text: outcome.text,
        ttl_days: 0,
        next_review_date: None,
        evaluated_on: today,
    }
    .with_ttl(settings.decision_ttl_days)
}

/// First rule in priority order that fires, or the default hold
pub fn first_match(ctx: &TriggerContext<'_>) -> TriggerOutcome {
    for (name, rule) in RULES.iter() {
        if let Some(outcome) = rule(ctx) {
            debug!(
                sku = %ctx.snapshot.sku,
                rule = *name,
                reason = %outcome.reason,
                "Trigger fired"
            );
            return outcome;
        }
    }
    TriggerOutcome::hold(
        AdsAction::Hold,
        ReasonCode::HoldNoTrigger,
        "No trigger matched".to_string(),
    )
}

fn stop(ctx: &TriggerContext<'_>) -> Option<TriggerOutcome> {
    let profit = ctx.snapshot.profit_before_marketing;
    if profit > 0.0 || profit.is_nan() {
        return None;
    }
    Some(TriggerOutcome::up(
        ctx.category.price_step_pct,
        AdsAction::Pause,
        ReasonCode::Stop,
        format!("Unprofitable before marketing: profit {:.2}", profit),
    ))
}

fn low_stock(ctx: &TriggerContext<'_>) -> Option<TriggerOutcome> {
    let cover = ctx.stock_cover?;
    if cover > ctx.category.stock_critical_days {
        return None;
    }

    let e = ctx.elasticity;
    let critical = ctx.category.stock_critical_days;
    if e.price_elasticity < HIGHLY_ELASTIC {
        return Some(TriggerOutcome::hold(
            AdsAction::Reduce,
            ReasonCode::LowStockElastic,
            format!(
                "Low stock: {:.1} days cover (critical {:.0}), demand too elastic ({:.2}) to raise price",
                cover, critical, e.price_elasticity
            ),
        ));
    }
    if e.drr_elasticity > 0.0 {
        return Some(TriggerOutcome::hold(
            AdsAction::Reduce,
            ReasonCode::LowStockDrr,
            format!(
                "Low stock: {:.1} days cover (critical {:.0}), DRR would worsen with a price rise ({:.2})",
                cover, critical, e.drr_elasticity
            ),
        ));
    }

    let step = if e.price_elasticity > 0.0 {
        ctx.category.price_step_pct * 2.0
    } else {
        ctx.category.price_step_pct
    };
    Some(TriggerOutcome::up(
        step,
        AdsAction::Reduce,
        ReasonCode::LowStock,
        format!("Low stock: {:.1} days cover (critical {:.0})", cover, critical),
    ))
}

fn clear(ctx: &TriggerContext<'_>) -> Option<TriggerOutcome> {
    let cover = ctx.stock_cover?;
    if cover < ctx.category.stock_overstock_days {
        return None;
    }
    Some(TriggerOutcome::down(
        ctx.category.price_step_pct,
        AdsAction::Scale,
        ReasonCode::Clear,
        format!(
            "Overstock: {:.1} days cover (limit {:.0})",
            cover, ctx.category.stock_overstock_days
        ),
    ))
}

fn overpriced(ctx: &TriggerContext<'_>) -> Option<TriggerOutcome> {
    let s = ctx.snapshot;
    let c = ctx.category;
    if s.ctr_pct >= c.ctr_warning_pct && s.order_conversion_pct < c.cr_order_warning_pct {
        return Some(TriggerOutcome::down(
            c.price_step_pct,
            AdsAction::Hold,
            ReasonCode::Overpriced,
            format!(
                "Clicks without orders: CTR {:.2}% (>= {:.2}%), order CR {:.2}% (< {:.2}%)",
                s.ctr_pct, c.ctr_warning_pct, s.order_conversion_pct, c.cr_order_warning_pct
            ),
        ));
    }
    None
}

fn drr_spike(ctx: &TriggerContext<'_>) -> Option<TriggerOutcome> {
    let drr = ctx.snapshot.ads.total_pct();
    if drr <= ctx.category.drr_warning_pct || drr.is_nan() {
        return None;
    }
    Some(TriggerOutcome::hold(
        AdsAction::Reduce,
        ReasonCode::DrrSpike,
        format!(
            "Ad spend at {:.1}% of revenue (warning {:.1}%)",
            drr, ctx.category.drr_warning_pct
        ),
    ))
}

fn elasticity_upside(ctx: &TriggerContext<'_>) -> Option<TriggerOutcome> {
    let margin = ctx.snapshot.margin_pct?;
    if margin.is_nan() || margin <= ctx.category.min_margin_pct {
        return None;
    }

    let e = ctx.elasticity;
    let step = ctx.category.price_step_pct;
    if e.price_elasticity > 0.0 {
        return Some(TriggerOutcome::up(
            step * 2.0,
            AdsAction::Scale,
            ReasonCode::ElasticityPremium,
            format!(
                "Margin {:.1}%, demand rises with price (elasticity {:.2})",
                margin, e.price_elasticity
            ),
        ));
    }
    if e.price_elasticity > INELASTIC_FLOOR && e.drr_elasticity <= 0.0 {
        return Some(TriggerOutcome::up(
            step,
            AdsAction::Hold,
            ReasonCode::ElasticityInelastic,
            format!(
                "Margin {:.1}%, inelastic demand (elasticity {:.2})",
                margin, e.price_elasticity
            ),
        ));
    }
    None
}

/// Block price cuts on SKUs whose margin is already below the engine floor
pub fn apply_margin_floor(
    outcome: TriggerOutcome,
    snapshot: &MetricsSnapshot,
    settings: &EngineSettings,
) -> TriggerOutcome {
    if outcome.price_action != PriceAction::Down {
        return outcome;
    }
    match snapshot.margin_pct {
        Some(margin) if margin < settings.min_margin_pct => {
            debug!(
                sku = %snapshot.sku,
                blocked = %outcome.reason,
                margin,
                "Margin floor blocked price cut"
            );
            TriggerOutcome::hold(
                outcome.ads_action,
                ReasonCode::MinMarginBlock,
                format!(
                    "{} blocked: margin {:.1}% below floor {:.1}% ({})",
                    outcome.reason, margin, settings.min_margin_pct, outcome.text
                ),
            )
        }
        _ => outcome,
    }
}

/// Limit gold SKUs to small price moves
pub fn apply_gold_clamp(
    mut outcome: TriggerOutcome,
    snapshot: &MetricsSnapshot,
    settings: &EngineSettings,
) -> TriggerOutcome {
    if !snapshot.is_gold || outcome.price_action == PriceAction::Hold {
        return outcome;
    }

    // NaN and negative bounds disable moves rather than flip them
    let max = settings.gold_max_abs_step_pct.max(0.0);
    let clamped = outcome.step_pct.signum() * outcome.step_pct.abs().min(max);
    if clamped == 0.0 {
        return TriggerOutcome::hold(
            outcome.ads_action,
            ReasonCode::GoldProtection,
            format!("Gold SKU: price moves disabled ({})", outcome.text),
        );
    }
    if clamped != outcome.step_pct {
        outcome.text = format!(
            "{} [gold: step {:+.1}% clamped to {:+.1}%]",
            outcome.text, outcome.step_pct, clamped
        );
        outcome.step_pct = clamped;
    }
    outcome
}

/// Turn a price move whose step is zero or not finite into a hold
///
/// The reason and ads action of the rule are kept.
fn hold_without_step(outcome: TriggerOutcome, snapshot: &MetricsSnapshot) -> TriggerOutcome {
    let usable = outcome.step_pct.is_finite() && outcome.step_pct != 0.0;
    if outcome.price_action == PriceAction::Hold || usable {
        return outcome;
    }
    warn!(
        sku = %snapshot.sku,
        reason = %outcome.reason,
        step_pct = outcome.step_pct,
        "Price move has no usable step, holding"
    );
    TriggerOutcome::hold(
        outcome.ads_action,
        outcome.reason,
        format!("{} [no usable price step]", outcome.text),
    )
}
