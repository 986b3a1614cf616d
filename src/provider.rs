//! Category configuration lookup
//!
//! The engine never reaches for a process-wide cache. Callers hand it a
//! [`ConfigProvider`], normally an immutable [`CategoryTable`] taken from a
//! [`CachedConfigProvider`] once at the start of a batch.

use crate::config::{normalize_category, CategoryConfig, PricingConfig};
use crate::error::{PricingError, PricingResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Read-only access to category thresholds
pub trait ConfigProvider {
    /// Thresholds for `category`, or the default when it has no entry.
    /// Lookups are case-insensitive.
    fn category_config(&self, category: &str) -> CategoryConfig;

    /// Every configured category keyed by its normalized name
    fn all_category_configs(&self) -> HashMap<String, CategoryConfig>;
}

/// Immutable category lookup table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTable {
    default: CategoryConfig,
    categories: HashMap<String, CategoryConfig>,
}

impl CategoryTable {
    /// Build a table from raw category entries
    ///
    /// Entries that fail validation or normalize to an empty name are skipped,
    /// so those categories get the default. When two names normalize to the
    /// same key, the first in byte order wins. An invalid default is replaced
    /// by the built-in one.
    pub fn new(default: CategoryConfig, categories: HashMap<String, CategoryConfig>) -> Self {
        let default = match default.validate() {
            Ok(()) => default,
            Err(e) => {
                warn!(error = %e, "Invalid default category config, using built-in defaults");
                CategoryConfig::default()
            }
        };

        let mut entries: Vec<_> = categories.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut table = HashMap::with_capacity(entries.len());
        for (name, config) in entries {
            if let Err(e) = config.validate() {
                warn!(category = %name, error = %e, "Skipping invalid category config");
                continue;
            }
            let key = normalize_category(&name);
            if key.is_empty() {
                warn!(category = %name, "Skipping category with an empty name");
                continue;
            }
            if table.contains_key(&key) {
                warn!(category = %name, key = %key, "Duplicate category name, keeping the first");
                continue;
            }
            table.insert(key, config);
        }

        Self {
            default,
            categories: table,
        }
    }

    pub fn from_config(config: &PricingConfig) -> Self {
        Self::new(config.default_category, config.categories.clone())
    }

    pub fn default_config(&self) -> CategoryConfig {
        self.default
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.contains_key(&normalize_category(category))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl ConfigProvider for CategoryTable {
    fn category_config(&self, category: &str) -> CategoryConfig {
        self.categories
            .get(&normalize_category(category))
            .copied()
            .unwrap_or(self.default)
    }

    fn all_category_configs(&self) -> HashMap<String, CategoryConfig> {
        self.categories.clone()
    }
}

/// Backing store for category configs (the settings table)
///
/// Loaded entries go through [`CategoryTable::new`], so a source holding an
/// invalid row degrades that category to the default.
pub trait ConfigSource: Send + Sync {
    fn load_all(&self) -> PricingResult<HashMap<String, CategoryConfig>>;

    fn put(&self, category: &str, config: CategoryConfig) -> PricingResult<()>;

    /// Thresholds used for unconfigured categories
    fn default_config(&self) -> CategoryConfig {
        CategoryConfig::default()
    }
}

/// Config source held in memory
#[derive(Debug, Default)]
pub struct InMemoryConfigSource {
    default: CategoryConfig,
    categories: RwLock<HashMap<String, CategoryConfig>>,
}

impl InMemoryConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &PricingConfig) -> Self {
        let table = CategoryTable::from_config(config);
        Self {
            default: table.default_config(),
            categories: RwLock::new(table.all_category_configs()),
        }
    }
}

impl ConfigSource for InMemoryConfigSource {
    fn load_all(&self) -> PricingResult<HashMap<String, CategoryConfig>> {
        Ok(self.categories.read().clone())
    }

    fn put(&self, category: &str, config: CategoryConfig) -> PricingResult<()> {
        let key = normalize_category(category);
        if key.is_empty() {
            return Err(PricingError::Source("category name is empty".to_string()));
        }
        config.validate()?;
        self.categories.write().insert(key, config);
        Ok(())
    }

    fn default_config(&self) -> CategoryConfig {
        self.default
    }
}

/// Read-through cache over a [`ConfigSource`]
///
/// The table is loaded on first use and shared as an `Arc` until an edit or
/// an explicit [`invalidate`](Self::invalidate) drops it.
pub struct CachedConfigProvider<S: ConfigSource> {
    source: S,
    cache: RwLock<Option<Arc<CategoryTable>>>,
}

impl<S: ConfigSource> CachedConfigProvider<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: RwLock::new(None),
        }
    }

    /// Current table, loading it from the source if the cache is empty
    pub fn snapshot(&self) -> PricingResult<Arc<CategoryTable>> {
        if let Some(table) = self.cache.read().as_ref() {
            return Ok(Arc::clone(table));
        }

        let mut cache = self.cache.write();
        // Another writer may have filled it while we waited
        if let Some(table) = cache.as_ref() {
            return Ok(Arc::clone(table));
        }

        let categories = self.source.load_all()?;
        let table = Arc::new(CategoryTable::new(self.source.default_config(), categories));
        info!(categories = table.len(), "Loaded category configs");
        *cache = Some(Arc::clone(&table));
        Ok(table)
    }

    /// Drop the cached table; the next lookup reloads from the source
    pub fn invalidate(&self) {
        debug!("Invalidating category config cache");
        *self.cache.write() = None;
    }

    /// Write an operator edit through to the source and invalidate
    pub fn update_category(&self, category: &str, config: CategoryConfig) -> PricingResult<()> {
        config.validate()?;
        self.source.put(category, config)?;
        info!(category = %normalize_category(category), "Category config updated");
        self.invalidate();
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.read().is_some()
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: ConfigSource> ConfigProvider for CachedConfigProvider<S> {
    fn category_config(&self, category: &str) -> CategoryConfig {
        match self.snapshot() {
            Ok(table) => table.category_config(category),
            Err(e) => {
                warn!(error = %e, category, "Config source failed, using default");
                self.source.default_config()
            }
        }
    }

    fn all_category_configs(&self) -> HashMap<String, CategoryConfig> {
        match self.snapshot() {
            Ok(table) => table.all_category_configs(),
            Err(e) => {
                warn!(error = %e, "Config source failed, no categories available");
                HashMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn electronics() -> CategoryConfig {
        CategoryConfig {
            price_step_pct: 2.0,
            stock_overstock_days: 90.0,
            ..CategoryConfig::default()
        }
    }

    /// Source that counts loads
    #[derive(Default)]
    struct CountingSource {
        inner: InMemoryConfigSource,
        loads: AtomicUsize,
    }

    impl ConfigSource for CountingSource {
        fn load_all(&self) -> PricingResult<HashMap<String, CategoryConfig>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load_all()
        }

        fn put(&self, category: &str, config: CategoryConfig) -> PricingResult<()> {
            self.inner.put(category, config)
        }
    }

    /// Source that hands back whatever rows it was given, unchecked
    struct RawSource(HashMap<String, CategoryConfig>);

    impl ConfigSource for RawSource {
        fn load_all(&self) -> PricingResult<HashMap<String, CategoryConfig>> {
            Ok(self.0.clone())
        }

        fn put(&self, _category: &str, _config: CategoryConfig) -> PricingResult<()> {
            Ok(())
        }
    }

    struct FailingSource;

    impl ConfigSource for FailingSource {
        fn load_all(&self) -> PricingResult<HashMap<String, CategoryConfig>> {
            Err(PricingError::Source("connection refused".to_string()))
        }

        fn put(&self, _category: &str, _config: CategoryConfig) -> PricingResult<()> {
            Err(PricingError::Source("connection refused".to_string()))
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut categories = HashMap::new();
        categories.insert("Electronics".to_string(), electronics());
        let table = CategoryTable::new(CategoryConfig::default(), categories);

        assert_eq!(table.category_config("ELECTRONICS"), electronics());
        assert_eq!(table.category_config("electronics"), electronics());
        assert_eq!(table.category_config(" Electronics "), electronics());
        assert!(table.contains("eLeCtRoNiCs"));
    }

    #[test]
    fn test_unknown_category_returns_default() {
        let table = CategoryTable::default();
        assert_eq!(table.category_config("GARDEN"), CategoryConfig::default());
        assert_eq!(table.category_config(""), CategoryConfig::default());
        assert!(table.is_empty());
    }

    #[test]
    fn test_all_category_configs_normalized() {
        let mut categories = HashMap::new();
        categories.insert("toys".to_string(), CategoryConfig::default());
        categories.insert("Books".to_string(), electronics());
        let table = CategoryTable::new(CategoryConfig::default(), categories);

        let all = table.all_category_configs();
        assert_eq!(all.len(), 2);
        assert!(all.contains_key("TOYS"));
        assert!(all.contains_key("BOOKS"));
    }

    #[test]
    fn test_cache_loads_once() {
        let provider = CachedConfigProvider::new(CountingSource::default());
        provider.source().put("electronics", electronics()).unwrap();
        assert!(!provider.is_loaded());

        for _ in 0..10 {
            provider.category_config("ELECTRONICS");
        }
        provider.all_category_configs();

        assert!(provider.is_loaded());
        assert_eq!(provider.source().loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalidate_reloads() {
        let provider = CachedConfigProvider::new(CountingSource::default());
        provider.snapshot().unwrap();
        provider.invalidate();
        assert!(!provider.is_loaded());
        provider.snapshot().unwrap();
        assert_eq!(provider.source().loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_update_writes_through_and_invalidates() {
        let provider = CachedConfigProvider::new(InMemoryConfigSource::new());
        let before = provider.snapshot().unwrap();
        assert_eq!(before.category_config("TOYS"), CategoryConfig::default());

        provider.update_category("toys", electronics()).unwrap();
        assert!(!provider.is_loaded());
        assert_eq!(provider.category_config("Toys"), electronics());

        // The old snapshot a running batch holds is unchanged
        assert_eq!(before.category_config("TOYS"), CategoryConfig::default());
    }

    #[test]
    fn test_update_rejects_invalid_config() {
        let provider = CachedConfigProvider::new(InMemoryConfigSource::new());
        let bad = CategoryConfig {
            price_step_pct: f64::NAN,
            ..CategoryConfig::default()
        };
        assert!(provider.update_category("toys", bad).is_err());
        assert!(provider.source().load_all().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_loaded_rows_fall_back_to_default() {
        let mut rows = HashMap::new();
        rows.insert(
            "toys".to_string(),
            CategoryConfig {
                price_step_pct: 0.0,
                ..CategoryConfig::default()
            },
        );
        rows.insert(
            "games".to_string(),
            CategoryConfig {
                ctr_warning_pct: -1.0,
                ..CategoryConfig::default()
            },
        );
        rows.insert("electronics".to_string(), electronics());
        let provider = CachedConfigProvider::new(RawSource(rows));

        let table = provider.snapshot().unwrap();
        assert_eq!(table.len(), 1);
        assert!(!table.contains("TOYS"));
        assert_eq!(table.category_config("TOYS"), CategoryConfig::default());
        assert_eq!(table.category_config("GAMES"), CategoryConfig::default());
        assert_eq!(table.category_config("ELECTRONICS"), electronics());
    }

    #[test]
    fn test_invalid_default_replaced() {
        let bad = CategoryConfig {
            price_step_pct: f64::NAN,
            ..CategoryConfig::default()
        };
        let table = CategoryTable::new(bad, HashMap::new());
        assert_eq!(table.default_config(), CategoryConfig::default());
    }

    #[test]
    fn test_duplicate_names_resolve_deterministically() {
        let mut categories = HashMap::new();
        categories.insert("electronics".to_string(), CategoryConfig::default());
        categories.insert("Electronics".to_string(), electronics());
        categories.insert(" ELECTRONICS".to_string(), CategoryConfig::default());
        let table = CategoryTable::new(CategoryConfig::default(), categories.clone());

        // " ELECTRONICS" sorts first
        assert_eq!(table.len(), 1);
        assert_eq!(table.category_config("electronics"), CategoryConfig::default());

        categories.remove(" ELECTRONICS");
        let table = CategoryTable::new(CategoryConfig::default(), categories);
        assert_eq!(table.category_config("electronics"), electronics());
    }

    #[test]
    fn test_in_memory_put_rejects_invalid() {
        let source = InMemoryConfigSource::new();
        let zero_step = CategoryConfig {
            price_step_pct: 0.0,
            ..CategoryConfig::default()
        };
        assert!(matches!(
            source.put("toys", zero_step),
            Err(PricingError::InvalidConfig(_))
        ));
        assert!(source.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_failing_source_falls_back_to_default() {
        let provider = CachedConfigProvider::new(FailingSource);
        assert!(provider.snapshot().is_err());
        assert_eq!(provider.category_config("TOYS"), CategoryConfig::default());
        assert!(provider.all_category_configs().is_empty());
    }

    #[test]
    fn test_in_memory_source_from_config() {
        let yaml = r#"
default_category:
  price_step_pct: 5.0
categories:
  shoes:
    price_step_pct: 4.0
"#;
        let config = PricingConfig::from_yaml(yaml).unwrap();
        let provider = CachedConfigProvider::new(InMemoryConfigSource::from_config(&config));

        assert_eq!(provider.category_config("SHOES").price_step_pct, 4.0);
        assert_eq!(provider.category_config("BAGS").price_step_pct, 5.0);
    }
}
