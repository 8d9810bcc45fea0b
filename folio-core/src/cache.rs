use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::article::RemoteArticle;
use crate::store::KeyValueStore;

pub const CACHE_KEY: &str = "qiita-cache";
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// The single cached slot: last fetched articles plus an optional rate-limit window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub articles: Vec<RemoteArticle>,
    /// Epoch milliseconds of the write.
    pub timestamp: i64,
    /// Epoch seconds at which the upstream rate limit lifts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit_reset: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntryRef<'a> {
    articles: &'a [RemoteArticle],
    timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    rate_limit_reset: Option<i64>,
}

impl CacheEntry {
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    pub fn rate_limit_reset_at(&self) -> Option<DateTime<Utc>> {
        self.rate_limit_reset
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// True while the remembered reset time is still ahead of `now`.
    pub fn is_rate_limited_at(&self, now: DateTime<Utc>) -> bool {
        self.rate_limit_reset_at()
            .map(|reset| reset > now)
            .unwrap_or(false)
    }
}

/// Time-boxed cache over an injected [`KeyValueStore`].
///
/// Expired or unreadable entries are deleted when read. Write failures are
/// logged and never reach the caller.
#[derive(Clone)]
pub struct LocalCache {
    store: Option<Arc<dyn KeyValueStore>>,
    key: String,
    ttl: Duration,
}

impl LocalCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store: Some(store),
            key: CACHE_KEY.to_string(),
            ttl: DEFAULT_TTL,
        }
    }

    /// A cache with no backing storage (e.g. while pre-rendering): reads are
    /// always absent, writes do nothing.
    pub fn unavailable() -> Self {
        Self {
            store: None,
            key: CACHE_KEY.to_string(),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }

    pub fn read(&self) -> Option<CacheEntry> {
        self.read_at(Utc::now())
    }

    pub fn read_at(&self, now: DateTime<Utc>) -> Option<CacheEntry> {
        let store = self.store.as_deref()?;
        let raw = match store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, key = %self.key, "failed to read cache");
                return None;
            }
        };

        let entry = match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, key = %self.key, "failed to parse cached data, discarding");
                self.evict(store);
                return None;
            }
        };

        let age_ms = now.timestamp_millis() - entry.timestamp;
        if age_ms < 0 {
            warn!(key = %self.key, "cache entry is dated in the future, discarding");
            self.evict(store);
            return None;
        }
        if (age_ms as u128) >= self.ttl.as_millis() {
            debug!(key = %self.key, age_ms, "cache entry expired");
            self.evict(store);
            return None;
        }
        Some(entry)
    }

    pub fn write(&self, articles: &[RemoteArticle], rate_limit_reset: Option<i64>) {
        self.write_at(Utc::now(), articles, rate_limit_reset)
    }

    pub fn write_at(
        &self,
        now: DateTime<Utc>,
        articles: &[RemoteArticle],
        rate_limit_reset: Option<i64>,
    ) {
        let Some(store) = self.store.as_deref() else {
            debug!("cache storage unavailable; skipping write");
            return;
        };
        let entry = CacheEntryRef {
            articles,
            timestamp: now.timestamp_millis(),
            rate_limit_reset,
        };
        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "failed to serialize cache entry");
                return;
            }
        };
        if let Err(err) = store.set(&self.key, &json) {
            warn!(error = %err, key = %self.key, "failed to cache data");
        }
    }

    fn evict(&self, store: &dyn KeyValueStore) {
        if let Err(err) = store.delete(&self.key) {
            warn!(error = %err, key = %self.key, "failed to delete cache entry");
        }
    }
}
