use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::FeedError;
use crate::feed::{ArticleFeed, FeedSnapshot};

#[derive(Debug, Clone, Copy)]
pub struct RefreshConfig {
    /// How often an expired rate-limit window is looked for.
    pub check_interval: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Updated(FeedSnapshot),
}

pub struct RefresherHandle {
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl RefresherHandle {
    /// Stops the task; a fetch still in flight is dropped.
    pub async fn stop(self) -> Result<(), FeedError> {
        let _ = self.cancel_tx.send(());
        self.join.await.map_err(FeedError::from)
    }
}

/// Refreshes `feed` once right away, then refreshes again each time a
/// rate-limit window runs out. Every refresh is reported on `update_tx`.
pub fn spawn_refresher(
    feed: ArticleFeed,
    config: RefreshConfig,
    update_tx: mpsc::Sender<FeedEvent>,
) -> RefresherHandle {
    let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
    let join = tokio::spawn(async move {
        if !refresh_and_send(&feed, &update_tx, &mut cancel_rx).await {
            return;
        }

        let mut ticker = tokio::time::interval(config.check_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel_rx.recv() => {
                    info!("refresher shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    if feed.clear_expired_rate_limit(Utc::now())
                        && !refresh_and_send(&feed, &update_tx, &mut cancel_rx).await
                    {
                        break;
                    }
                }
            }
        }
    });

    RefresherHandle { cancel_tx, join }
}

async fn refresh_and_send(
    feed: &ArticleFeed,
    update_tx: &mpsc::Sender<FeedEvent>,
    cancel_rx: &mut broadcast::Receiver<()>,
) -> bool {
    let snapshot = tokio::select! {
        _ = cancel_rx.recv() => {
            info!("refresh cancelled before completion");
            return false;
        }
        snapshot = feed.refresh() => snapshot,
    };
    if update_tx.send(FeedEvent::Updated(snapshot)).await.is_err() {
        warn!("update receiver dropped");
        return false;
    }
    true
}
