use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::article::RemoteArticle;
use crate::cache::LocalCache;
use crate::error::rate_limit_active_message;
use crate::fetcher::{FetchOutcome, QiitaClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    /// No fetch has completed yet; render local content only.
    Initializing,
    Loaded,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub phase: FeedPhase,
    pub articles: Vec<RemoteArticle>,
    pub error: Option<String>,
    pub rate_limited: bool,
    pub reset_at: Option<DateTime<Utc>>,
    pub from_cache: bool,
}

impl Default for FeedSnapshot {
    fn default() -> Self {
        Self {
            phase: FeedPhase::Initializing,
            articles: Vec::new(),
            error: None,
            rate_limited: false,
            reset_at: None,
            from_cache: false,
        }
    }
}

impl FeedSnapshot {
    pub fn is_loading(&self) -> bool {
        self.phase == FeedPhase::Initializing
    }
}

impl From<FetchOutcome> for FeedSnapshot {
    fn from(outcome: FetchOutcome) -> Self {
        let phase = if outcome.error.is_some() {
            FeedPhase::Errored
        } else {
            FeedPhase::Loaded
        };
        Self {
            phase,
            articles: outcome.articles,
            error: outcome.error,
            rate_limited: outcome.rate_limited,
            reset_at: outcome.reset_at,
            from_cache: outcome.from_cache,
        }
    }
}

/// Remote article state shared by every view of one page.
///
/// Starts in [`FeedPhase::Initializing`] so a first render can go ahead with
/// local posts while [`ArticleFeed::refresh`] runs. Only one refresh talks to
/// the network at a time; later callers wait and then hit the cache.
#[derive(Clone)]
pub struct ArticleFeed {
    client: QiitaClient,
    cache: LocalCache,
    state: Arc<RwLock<FeedSnapshot>>,
    gate: Arc<Mutex<()>>,
}

impl ArticleFeed {
    pub fn new(client: QiitaClient, cache: LocalCache) -> Self {
        Self {
            client,
            cache,
            state: Arc::new(RwLock::new(FeedSnapshot::default())),
            gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn refresh(&self) -> FeedSnapshot {
        let _in_flight = self.gate.lock().await;

        let now = Utc::now();
        if let Some(reset_at) = self.active_rate_limit(now) {
            info!(%reset_at, "rate limit still active; skipping Qiita request");
            let mut state = self.write_state();
            state.phase = FeedPhase::Errored;
            state.error = Some(rate_limit_active_message(&reset_at));
            return state.clone();
        }

        let outcome = self.client.fetch_with_cache(&self.cache).await;
        let snapshot = FeedSnapshot::from(outcome);
        debug!(phase = ?snapshot.phase, articles = snapshot.articles.len(), "feed refreshed");
        *self.write_state() = snapshot.clone();
        snapshot
    }

    /// Lifts a rate limit whose reset time has passed. Returns whether it did.
    pub fn clear_expired_rate_limit(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.write_state();
        let expired = state.rate_limited && state.reset_at.is_some_and(|reset| now > reset);
        if expired {
            info!("Qiita rate limit window has passed");
            state.rate_limited = false;
            state.reset_at = None;
            state.error = None;
            if state.phase == FeedPhase::Errored {
                state.phase = FeedPhase::Loaded;
            }
        }
        expired
    }

    fn active_rate_limit(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if !state.rate_limited {
            return None;
        }
        state.reset_at.filter(|reset| *reset > now)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, FeedSnapshot> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
