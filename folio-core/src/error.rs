use chrono::{DateTime, Local, Utc};
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("failed to decode article list: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("HTTP error! status: {}", .0.as_u16())]
    Status(StatusCode),
    #[error("{}", rate_limit_message(.reset_at.as_ref()))]
    RateLimited { reset_at: Option<DateTime<Utc>> },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage is unavailable")]
    Unavailable,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("refresher task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Message shown when the upstream API answered 403.
pub fn rate_limit_message(reset_at: Option<&DateTime<Utc>>) -> String {
    format!(
        "Qiita API rate limit reached. Resets at: {}",
        format_reset(reset_at)
    )
}

/// Message shown when a remembered rate-limit window suppresses a request.
pub fn rate_limit_active_message(reset_at: &DateTime<Utc>) -> String {
    format!(
        "Qiita API is rate limited. Resets at: {}",
        format_reset(Some(reset_at))
    )
}

fn format_reset(reset_at: Option<&DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => at
            .with_timezone(&Local)
            .format("%Y/%m/%d %H:%M:%S")
            .to_string(),
        None => "unknown".to_string(),
    }
}
