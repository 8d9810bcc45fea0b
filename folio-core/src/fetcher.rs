use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder, StatusCode};
use tracing::{debug, info, warn};
use url::Url;

use crate::article::RemoteArticle;
use crate::cache::{CacheEntry, LocalCache};
use crate::config::QiitaConfig;
use crate::error::{rate_limit_message, FetchError};

/// Header carrying the epoch second at which a 403 rate limit lifts.
pub const RATE_RESET_HEADER: &str = "rate-reset";

/// Result of a cache-aware fetch. Failures are folded into `error`, so the
/// caller always gets something renderable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    pub articles: Vec<RemoteArticle>,
    pub error: Option<String>,
    pub rate_limited: bool,
    pub reset_at: Option<DateTime<Utc>>,
    pub from_cache: bool,
}

impl FetchOutcome {
    fn failed(err: &FetchError) -> Self {
        let (rate_limited, reset_at) = match err {
            FetchError::RateLimited { reset_at } => (true, *reset_at),
            _ => (false, None),
        };
        Self {
            articles: Vec::new(),
            error: Some(err.to_string()),
            rate_limited,
            reset_at,
            from_cache: false,
        }
    }
}

pub fn http_client(config: &QiitaConfig) -> reqwest::Result<Client> {
    ClientBuilder::new()
        .timeout(config.request_timeout())
        .user_agent(config.user_agent.clone())
        .build()
}

#[derive(Debug, Clone)]
pub struct QiitaClient {
    client: Client,
    endpoint: Url,
}

impl QiitaClient {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// One GET against the listing endpoint, no caching involved.
    pub async fn fetch(&self) -> Result<Vec<RemoteArticle>, FetchError> {
        debug!(url = %self.endpoint, "fetching Qiita articles");
        let response = self.client.get(self.endpoint.clone()).send().await?;
        let status = response.status();

        if status == StatusCode::FORBIDDEN {
            let reset_at = rate_reset(response.headers())
                .and_then(|secs| DateTime::from_timestamp(secs, 0));
            return Err(FetchError::RateLimited { reset_at });
        }
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let bytes = response.bytes().await?;
        let articles: Vec<RemoteArticle> = serde_json::from_slice(&bytes)?;
        Ok(articles)
    }

    /// Serves a fresh cache entry when there is one; otherwise fetches and
    /// records the result (or the rate-limit window) in the cache. An entry
    /// that only remembers a rate-limit window which has since passed counts
    /// as a miss.
    pub async fn fetch_with_cache(&self, cache: &LocalCache) -> FetchOutcome {
        let now = Utc::now();
        if let Some(entry) = cache
            .read_at(now)
            .filter(|entry| !lapsed_rate_limit(entry, now))
        {
            let reset_at = entry.rate_limit_reset_at().filter(|reset| *reset > now);
            debug!(
                articles = entry.articles.len(),
                rate_limited = reset_at.is_some(),
                "serving Qiita articles from cache"
            );
            return FetchOutcome {
                error: reset_at.as_ref().map(|at| rate_limit_message(Some(at))),
                rate_limited: reset_at.is_some(),
                reset_at,
                articles: entry.articles,
                from_cache: true,
            };
        }

        match self.fetch().await {
            Ok(articles) => {
                info!(count = articles.len(), "fetched Qiita articles");
                cache.write(&articles, None);
                FetchOutcome {
                    articles,
                    ..FetchOutcome::default()
                }
            }
            Err(err) => {
                warn!(error = %err, url = %self.endpoint, "failed to fetch Qiita articles");
                if let FetchError::RateLimited {
                    reset_at: Some(reset_at),
                } = &err
                {
                    cache.write(&[], Some(reset_at.timestamp()));
                }
                FetchOutcome::failed(&err)
            }
        }
    }
}

fn lapsed_rate_limit(entry: &CacheEntry, now: DateTime<Utc>) -> bool {
    if entry.rate_limit_reset.is_some() && !entry.is_rate_limited_at(now) {
        debug!("cached rate-limit window has passed; refetching");
        return true;
    }
    false
}

fn rate_reset(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(RATE_RESET_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
