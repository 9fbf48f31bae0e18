use crate::api::TextSummarizer;
use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sled::Db;
use std::path::Path;
use std::sync::Arc;

/// Cache for generated rollups, keyed by the text that was summarized
pub struct SummaryCache {
    db: Db,
    ttl_hours: u32,
}

impl SummaryCache {
    /// Create or open a cache
    pub fn new(cache_dir: &Path, ttl_hours: u32) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)?;

        let db_path = cache_dir.join("rollups.sled");
        let db = sled::open(db_path)?;

        Ok(Self { db, ttl_hours })
    }

    /// Create cache from config
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache_dir = Config::default_cache_dir()?;
        Self::new(&cache_dir, config.cache_ttl_hours)
    }

    /// Generate a cache key from the summarizer input
    pub fn generate_key(text: &str) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);

        format!("rollup_{:x}", hasher.finish())
    }

    /// Get a rollup from cache if it exists and is not expired
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(data) = self.db.get(key)? {
            let cached: CachedRollup = serde_json::from_slice(&data)?;

            if self.is_expired(&cached.cached_at) {
                self.db.remove(key)?;
                return Ok(None);
            }

            Ok(Some(cached.rollup))
        } else {
            Ok(None)
        }
    }

    /// Store a rollup in cache
    pub fn set(&self, key: &str, rollup: String) -> Result<()> {
        let cached = CachedRollup {
            rollup,
            cached_at: Utc::now(),
        };

        let data = serde_json::to_vec(&cached)?;
        self.db.insert(key, data)?;
        self.db.flush()?;

        Ok(())
    }

    fn is_expired(&self, cached_at: &DateTime<Utc>) -> bool {
        let ttl = Duration::hours(self.ttl_hours as i64);
        Utc::now() - *cached_at > ttl
    }

    /// Drop every cached rollup, returning how many there were
    pub fn clear(&self) -> Result<usize> {
        let removed = self.db.len();
        self.db.clear()?;
        self.db.flush()?;
        Ok(removed)
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.db.len(),
            db_size_bytes: self.db.size_on_disk().unwrap_or(0),
        }
    }

    /// Remove expired entries
    pub fn cleanup_expired(&self) -> Result<usize> {
        let mut removed = 0;

        for item in self.db.iter() {
            let (key, value) = item?;

            if let Ok(cached) = serde_json::from_slice::<CachedRollup>(&value) {
                if self.is_expired(&cached.cached_at) {
                    self.db.remove(key)?;
                    removed += 1;
                }
            }
        }

        self.db.flush()?;
        Ok(removed)
    }
}

/// Cached rollup with metadata
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct CachedRollup {
    rollup: String,
    cached_at: DateTime<Utc>,
}

/// Cache statistics
#[derive(Debug)]
pub struct CacheStats {
    pub total_entries: usize,
    pub db_size_bytes: u64,
}

impl CacheStats {
    /// Format size in human-readable format
    pub fn format_size(&self) -> String {
        let bytes = self.db_size_bytes;
        if bytes < 1024 {
            format!("{} B", bytes)
        } else if bytes < 1024 * 1024 {
            format!("{:.2} KB", bytes as f64 / 1024.0)
        } else {
            format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
        }
    }
}

/// A summarizer that consults the cache before calling the wrapped one
pub struct CachedSummarizer {
    inner: Arc<dyn TextSummarizer>,
    cache: SummaryCache,
}

impl CachedSummarizer {
    pub fn new(inner: Arc<dyn TextSummarizer>, cache: SummaryCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl TextSummarizer for CachedSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        let key = SummaryCache::generate_key(text);
        if let Some(rollup) = self.cache.get(&key)? {
            tracing::debug!(%key, "rollup cache hit");
            return Ok(rollup);
        }

        let rollup = self.inner.summarize(text).await?;
        self.cache.set(&key, rollup.clone())?;
        Ok(rollup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeSummarizer;
    use tempfile::TempDir;

    #[test]
    fn test_set_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let cache = SummaryCache::new(temp_dir.path(), 24).unwrap();

        let key = SummaryCache::generate_key("### Fix login");
        assert!(cache.get(&key).unwrap().is_none());

        cache.set(&key, "• Fixed login".to_string()).unwrap();
        assert_eq!(cache.get(&key).unwrap().as_deref(), Some("• Fixed login"));
        assert_eq!(cache.stats().total_entries, 1);
    }

    #[test]
    fn test_clear_reports_removed_entries() {
        let temp_dir = TempDir::new().unwrap();
        let cache = SummaryCache::new(temp_dir.path(), 24).unwrap();
        cache.set("rollup_a", "• a".to_string()).unwrap();
        cache.set("rollup_b", "• b".to_string()).unwrap();

        assert_eq!(cache.clear().unwrap(), 2);
        assert_eq!(cache.stats().total_entries, 0);
        assert!(cache.get("rollup_a").unwrap().is_none());
        assert_eq!(cache.clear().unwrap(), 0);
    }

    #[test]
    fn test_keys_differ_by_text() {
        assert_ne!(
            SummaryCache::generate_key("a"),
            SummaryCache::generate_key("b")
        );
        assert_eq!(
            SummaryCache::generate_key("a"),
            SummaryCache::generate_key("a")
        );
    }

    #[test]
    fn test_format_size() {
        let stats = CacheStats {
            total_entries: 0,
            db_size_bytes: 2048,
        };
        assert_eq!(stats.format_size(), "2.00 KB");
    }

    #[tokio::test]
    async fn test_cached_summarizer_calls_inner_once() {
        let temp_dir = TempDir::new().unwrap();
        let cache = SummaryCache::new(temp_dir.path(), 24).unwrap();
        let inner = Arc::new(FakeSummarizer::default());
        let summarizer = CachedSummarizer::new(inner.clone(), cache);

        assert_eq!(summarizer.summarize("text").await.unwrap(), "• summarized");
        assert_eq!(summarizer.summarize("text").await.unwrap(), "• summarized");
        assert_eq!(inner.calls().len(), 1);
    }
}
