//! Evaluate a small batch of SKUs against the marketplace config
//!
//! Run with: RUST_LOG=ag_pricing=debug cargo run --example evaluate_batch

use ag_pricing::{
    BatchSummary, CachedConfigProvider, ElasticityResult, InMemoryConfigSource, MetricsSnapshot,
    PricingConfig, RecommendationEngine, SkuInput,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/marketplace.yaml");
    let config = PricingConfig::from_yaml_file(path)?;
    let engine = RecommendationEngine::from_config(&config);
    let provider = CachedConfigProvider::new(InMemoryConfigSource::from_config(&config));

    let mut overstocked = MetricsSnapshot::new("EL-1001", "electronics", 24_990.0, 4_100.0);
    overstocked.clicks_7d = 1_250;
    overstocked.orders_7d = 28;
    overstocked.stock_units = 420;
    overstocked.ctr_pct = 1.1;
    overstocked.order_conversion_pct = 2.2;

    let mut losing = MetricsSnapshot::new("AP-2002", "apparel", 3_490.0, -120.0);
    losing.clicks_7d = 900;
    losing.orders_7d = 45;
    losing.stock_units = 300;

    let mut running_out = MetricsSnapshot::new("AP-2003", "apparel", 2_190.0, 640.0);
    running_out.clicks_7d = 1_800;
    running_out.orders_7d = 140;
    running_out.stock_units = 90;
    running_out.is_gold = true;

    let mut new_listing = MetricsSnapshot::new("HG-3004", "Home & Garden", 1_290.0, 300.0);
    new_listing.clicks_7d = 12;
    new_listing.orders_7d = 1;

    let inputs = vec![
        SkuInput::new(overstocked),
        SkuInput::new(losing),
        SkuInput::new(running_out).with_elasticity(ElasticityResult {
            price_elasticity: 0.3,
            drr_elasticity: -0.1,
        }),
        SkuInput::new(new_listing),
    ];

    let table = provider.snapshot()?;
    let results = engine.evaluate_batch(&inputs, &table);

    for (sku, result) in &results {
        match result {
            Ok(d) => println!(
                "{:<8} {:?}/{:?} {:+.1}% -> {:?} [{}] {}",
                sku,
                d.price_action,
                d.ads_action,
                d.price_step_pct,
                d.recommended_price,
                d.reason,
                d.reason_text
            ),
            Err(e) => println!("{:<8} rejected: {}", sku, e),
        }
    }

    let summary = BatchSummary::from_results(&results);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
