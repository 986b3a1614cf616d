//! Integration tests for the recommendation engine
//!
//! These tests verify end-to-end behavior including config loading,
//! category lookup, rule evaluation and the recommendation log.

use ag_pricing::{
    AdsAction, CachedConfigProvider, CategoryConfig, CategoryTable, ConfigProvider, ConfigSource,
    ElasticityResult, InMemoryConfigSource, MetricsSnapshot, OutcomeDelta, PriceAction,
    PricingConfig, PricingResult, ReasonCode, RecommendationEngine, RecommendationLog, SkuInput,
};
use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::HashMap;
use std::fs;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()
}

fn load(name: &str) -> (RecommendationEngine, CategoryTable) {
    let path = format!("{}/configs/{}", env!("CARGO_MANIFEST_DIR"), name);
    let yaml = fs::read_to_string(&path).expect("Failed to read config");
    RecommendationEngine::from_yaml(&yaml).expect("Failed to parse config")
}

/// SKU with enough data and no trigger conditions under the default category
fn nominal(sku: &str, category: &str) -> MetricsSnapshot {
    let mut s = MetricsSnapshot::new(sku, category, 1000.0, 300.0);
    s.views_7d = 40_000;
    s.clicks_7d = 600;
    s.cart_adds_7d = 120;
    s.orders_7d = 42;
    s.stock_units = 300; // 6 orders/day -> 50 days
    s.ctr_pct = 1.5;
    s.cart_conversion_pct = 20.0;
    s.order_conversion_pct = 7.0;
    s.ads.search_pct = 4.0;
    s.ads.media_pct = 2.0;
    s
}

fn elasticity(price: f64, drr: f64) -> ElasticityResult {
    ElasticityResult {
        price_elasticity: price,
        drr_elasticity: drr,
    }
}

#[test]
fn test_load_default_config() {
    let (engine, table) = load("default.yaml");
    assert_eq!(engine.settings().min_clicks_7d, 30);
    assert!(table.is_empty());

    let decision = engine
        .evaluate_at(&nominal("SKU-1", "anything"), &table, None, today())
        .unwrap();
    assert_eq!(decision.reason, ReasonCode::HoldNoTrigger);
}

#[test]
fn test_scenario_stop() {
    let (engine, table) = load("default.yaml");
    let mut s = nominal("SKU-1", "SHOES");
    s.profit_before_marketing = -500.0;

    let d = engine.evaluate_at(&s, &table, None, today()).unwrap();
    assert_eq!(d.price_action, PriceAction::Up);
    assert_eq!(d.ads_action, AdsAction::Pause);
    assert_eq!(d.reason, ReasonCode::Stop);
}

#[test]
fn test_scenario_clear() {
    let (engine, table) = load("default.yaml");
    let mut s = nominal("SKU-1", "SHOES");
    s.stock_cover_days = Some(130.0);

    let d = engine.evaluate_at(&s, &table, None, today()).unwrap();
    assert_eq!(d.price_action, PriceAction::Down);
    assert_eq!(d.ads_action, AdsAction::Scale);
    assert_eq!(d.reason, ReasonCode::Clear);
}

#[test]
fn test_scenario_low_stock_elastic() {
    let (engine, table) = load("default.yaml");
    let mut s = nominal("SKU-1", "SHOES");
    s.stock_cover_days = Some(5.0);

    let e = elasticity(-1.5, 0.0);
    let d = engine.evaluate_at(&s, &table, Some(&e), today()).unwrap();
    assert_eq!(d.price_action, PriceAction::Hold);
    assert_eq!(d.ads_action, AdsAction::Reduce);
    assert_eq!(d.reason, ReasonCode::LowStockElastic);
    assert!(d.recommended_price.is_none());
}

#[test]
fn test_scenario_overpriced() {
    let (engine, table) = load("default.yaml");
    let mut s = nominal("SKU-1", "SHOES");
    s.ctr_pct = 3.0;
    s.order_conversion_pct = 1.0;

    let d = engine.evaluate_at(&s, &table, None, today()).unwrap();
    assert_eq!(d.price_action, PriceAction::Down);
    assert_eq!(d.reason, ReasonCode::Overpriced);
}

#[test]
fn test_scenario_elasticity_premium() {
    let (engine, table) = load("default.yaml");
    let mut s = nominal("SKU-1", "SHOES");
    s.margin_pct = Some(40.0);

    let e = elasticity(0.5, 0.0);
    let d = engine.evaluate_at(&s, &table, Some(&e), today()).unwrap();
    let base = table.category_config("SHOES").price_step_pct;
    assert_eq!(d.price_action, PriceAction::Up);
    assert_eq!(d.price_step_pct, 2.0 * base);
    assert_eq!(d.reason, ReasonCode::ElasticityPremium);
    assert_eq!(d.recommended_price, Some(1060));
}

#[test]
fn test_hold_has_no_recommended_price() {
    let (engine, table) = load("default.yaml");
    let d = engine
        .evaluate_at(&nominal("SKU-1", "SHOES"), &table, None, today())
        .unwrap();
    assert_eq!(d.price_step_pct, 0.0);
    assert_eq!(d.recommended_price, None);
}

#[test]
fn test_marketplace_categories() {
    let (engine, table) = load("marketplace.yaml");

    // 50 days cover: below the 90 day electronics bound
    let mut electronics = nominal("SKU-E", "electronics");
    electronics.avg_price = 5000.0;
    let d = engine.evaluate_at(&electronics, &table, None, today()).unwrap();
    assert_eq!(d.reason, ReasonCode::HoldNoTrigger);

    // 100 days cover
    electronics.stock_units = 600;
    let d = engine.evaluate_at(&electronics, &table, None, today()).unwrap();
    assert_eq!(d.reason, ReasonCode::Clear);
    assert_eq!(d.price_step_pct, -2.0);
    assert_eq!(d.recommended_price, Some(4900));
    assert_eq!(d.ttl_days, 5);

    // Lower-case key in the file, upper-case on the SKU
    let mut apparel = nominal("SKU-A", "APPAREL");
    apparel.avg_price = 2000.0;
    apparel.ctr_pct = 3.5;
    apparel.order_conversion_pct = 3.0;
    let d = engine.evaluate_at(&apparel, &table, None, today()).unwrap();
    assert_eq!(d.reason, ReasonCode::Overpriced);
    assert_eq!(d.recommended_price, Some(1900));

    // Partially configured category keeps defaults for the rest
    let mut garden = nominal("SKU-G", "home & garden");
    garden.stock_cover_days = Some(150.0);
    let d = engine.evaluate_at(&garden, &table, None, today()).unwrap();
    assert_eq!(d.reason, ReasonCode::HoldNoTrigger);
    assert_eq!(table.category_config("HOME & GARDEN").ctr_warning_pct, 2.0);
}

#[test]
fn test_marketplace_requires_more_clicks() {
    let (engine, table) = load("marketplace.yaml");
    let mut s = nominal("SKU-1", "ELECTRONICS");
    s.clicks_7d = 45;
    s.profit_before_marketing = -100.0;

    let d = engine.evaluate_at(&s, &table, None, today()).unwrap();
    assert_eq!(d.reason, ReasonCode::InsufficientData);
    assert!(d.next_review_date.is_none());
}

#[test]
fn test_cached_provider_batch_workflow() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/marketplace.yaml");
    let config = PricingConfig::from_yaml_file(path).unwrap();
    let engine = RecommendationEngine::from_config(&config);
    let provider = CachedConfigProvider::new(InMemoryConfigSource::from_config(&config));

    let mut overstocked = nominal("SKU-1", "electronics");
    overstocked.stock_units = 600;
    let inputs = vec![
        SkuInput::new(overstocked.clone()),
        SkuInput::new(nominal("SKU-2", "apparel")),
    ];

    // One table for the whole batch
    let table = provider.snapshot().unwrap();
    let results = engine.evaluate_batch_at(&inputs, &table, today());
    assert_eq!(results[0].1.as_ref().unwrap().reason, ReasonCode::Clear);

    // Operator raises the electronics overstock bound
    let mut edited = provider.category_config("ELECTRONICS");
    edited.stock_overstock_days = 200.0;
    provider.update_category("Electronics", edited).unwrap();

    // The pinned table is unchanged; a fresh one sees the edit
    let results = engine.evaluate_batch_at(&inputs, &table, today());
    assert_eq!(results[0].1.as_ref().unwrap().reason, ReasonCode::Clear);

    let table = provider.snapshot().unwrap();
    let results = engine.evaluate_batch_at(&inputs, &table, today());
    assert_eq!(results[0].1.as_ref().unwrap().reason, ReasonCode::HoldNoTrigger);
}

/// Settings table rows as an external store returns them
struct StoredRows(HashMap<String, CategoryConfig>);

impl ConfigSource for StoredRows {
    fn load_all(&self) -> PricingResult<HashMap<String, CategoryConfig>> {
        Ok(self.0.clone())
    }

    fn put(&self, _category: &str, _config: CategoryConfig) -> PricingResult<()> {
        Ok(())
    }
}

#[test]
fn test_stored_zero_step_row_uses_default() {
    let mut rows = HashMap::new();
    rows.insert(
        "toys".to_string(),
        CategoryConfig {
            price_step_pct: 0.0,
            ..CategoryConfig::default()
        },
    );
    let provider = CachedConfigProvider::new(StoredRows(rows));
    let engine = RecommendationEngine::default();

    let mut s = nominal("SKU-T", "toys");
    s.profit_before_marketing = -10.0;

    let table = provider.snapshot().unwrap();
    let d = engine.evaluate_at(&s, table.as_ref(), None, today()).unwrap();
    assert_eq!(d.reason, ReasonCode::Stop);
    assert_eq!(d.price_action, PriceAction::Up);
    assert_eq!(d.price_step_pct, 3.0);
    assert_eq!(d.recommended_price, Some(1030));
}

#[test]
fn test_log_feeds_cooldown() {
    let (engine, table) = load("default.yaml");
    let mut log = RecommendationLog::new();

    let mut s = nominal("SKU-1", "SHOES");
    s.stock_cover_days = Some(130.0);

    let recorded_at = Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap();
    let decision = engine.evaluate_at(&s, &table, None, today()).unwrap();
    assert_eq!(decision.reason, ReasonCode::Clear);
    log.record(decision, recorded_at);
    log.mark_applied("SKU-1", recorded_at, recorded_at).unwrap();

    // Three days later the SKU is still cooling down
    s.last_price_change = log.last_applied_change("SKU-1");
    let later = NaiveDate::from_ymd_opt(2024, 9, 5).unwrap();
    let d = engine.evaluate_at(&s, &table, None, later).unwrap();
    assert_eq!(d.reason, ReasonCode::CooldownActive);
    assert_eq!(d.next_review_date, NaiveDate::from_ymd_opt(2024, 9, 9));

    // A week later it can move again
    let week_later = NaiveDate::from_ymd_opt(2024, 9, 9).unwrap();
    let d = engine.evaluate_at(&s, &table, None, week_later).unwrap();
    assert_eq!(d.reason, ReasonCode::Clear);

    log.record_outcome(
        "SKU-1",
        recorded_at,
        OutcomeDelta {
            revenue_delta_pct: 12.0,
            cr_delta_pct: 0.8,
        },
    )
    .unwrap();
    let report = log.effectiveness();
    assert_eq!(report.applied, 1);
    assert_eq!(report.mean_revenue_delta_pct, Some(12.0));
}

#[test]
fn test_fraction_inputs_normalized() {
    let (engine, table) = load("default.yaml");
    let mut s = nominal("SKU-1", "SHOES");
    s.ctr_pct = 0.03;
    s.cart_conversion_pct = 0.2;
    s.order_conversion_pct = 0.01;
    s.ads.search_pct = 0.04;
    s.ads.media_pct = 0.02;

    let s = s.normalized(ag_pricing::RateScale::Fraction);
    let d = engine.evaluate_at(&s, &table, None, today()).unwrap();
    assert_eq!(d.reason, ReasonCode::Overpriced);
}

#[test]
fn test_decision_json_shape() {
    let (engine, table) = load("default.yaml");
    let mut s = nominal("SKU-1", "SHOES");
    s.profit_before_marketing = -1.0;
    let d = engine.evaluate_at(&s, &table, None, today()).unwrap();

    let json = serde_json::to_value(&d).unwrap();
    assert_eq!(json["price_action"], "UP");
    assert_eq!(json["ads_action"], "PAUSE");
    assert_eq!(json["reason"], "STOP");
    assert_eq!(json["recommended_price"], 1030);
    assert_eq!(json["next_review_date"], "2024-09-09");
}
