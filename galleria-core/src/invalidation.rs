//! Debounced refresh on catalog mutations pushed by the server.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use galleria_config::InvalidationConfig;
use galleria_contracts::{CatalogError, MutationEventStream, MutationFeed};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, trace};

use crate::session::PaginationSession;

/// Something that can reload itself from the catalog.
#[async_trait]
pub trait Refresh: Send + Sync {
    async fn refresh(&self);
}

#[async_trait]
impl Refresh for PaginationSession {
    async fn refresh(&self) {
        let outcome = PaginationSession::refresh(self).await;
        debug!(target: "gallery::invalidation", ?outcome, "session refreshed");
    }
}

#[derive(Debug, Default)]
pub struct BridgeStats {
    events_seen: AtomicU64,
    events_ignored: AtomicU64,
    refreshes: AtomicU64,
}

impl BridgeStats {
    pub fn events_seen(&self) -> u64 {
        self.events_seen.load(Ordering::Relaxed)
    }

    pub fn events_ignored(&self) -> u64 {
        self.events_ignored.load(Ordering::Relaxed)
    }

    pub fn refreshes(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }
}

/// Running bridge. Dropping the handle leaves the listener running; call
/// [`InvalidationHandle::unsubscribe`] to stop it.
#[derive(Debug)]
pub struct InvalidationHandle {
    task: JoinHandle<()>,
    stats: Arc<BridgeStats>,
}

impl InvalidationHandle {
    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop listening. A refresh still waiting out the debounce is dropped.
    pub fn unsubscribe(self) {
        self.task.abort();
    }

    /// Wait for the listener to end on its own, which happens once the feed
    /// closes its stream.
    pub async fn join(self) {
        if let Err(err) = self.task.await
            && err.is_panic()
        {
            tracing::error!(target: "gallery::invalidation", "bridge task panicked");
        }
    }
}

/// Subscribes a refresh target to a mutation feed.
#[derive(Debug)]
pub struct InvalidationBridge;

impl InvalidationBridge {
    /// Subscribe to `feed` and refresh `target` after each burst of relevant
    /// events settles for the configured debounce window.
    pub async fn spawn(
        feed: &dyn MutationFeed,
        target: Arc<dyn Refresh>,
        config: InvalidationConfig,
    ) -> Result<InvalidationHandle, CatalogError> {
        let stream = feed.subscribe().await?;
        Ok(Self::spawn_with_stream(stream, target, config))
    }

    pub fn spawn_with_stream(
        stream: MutationEventStream,
        target: Arc<dyn Refresh>,
        config: InvalidationConfig,
    ) -> InvalidationHandle {
        let stats = Arc::new(BridgeStats::default());
        info!(
            target: "gallery::invalidation",
            debounce_ms = config.debounce_ms,
            kinds = ?config.kinds,
            "invalidation bridge subscribed"
        );
        let task = tokio::spawn(run_bridge(stream, target, config, Arc::clone(&stats)));
        InvalidationHandle { task, stats }
    }
}

async fn run_bridge(
    mut stream: MutationEventStream,
    target: Arc<dyn Refresh>,
    config: InvalidationConfig,
    stats: Arc<BridgeStats>,
) {
    let debounce = config.debounce();
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            event = stream.next() => match event {
                Some(event) => {
                    stats.events_seen.fetch_add(1, Ordering::Relaxed);
                    if config.reacts_to(event.kind) {
                        trace!(
                            target: "gallery::invalidation",
                            kind = %event.kind,
                            items = event.item_ids.len(),
                            "mutation scheduled refresh"
                        );
                        deadline = Some(Instant::now() + debounce);
                    } else {
                        stats.events_ignored.fetch_add(1, Ordering::Relaxed);
                    }
                }
                None => {
                    if deadline.is_some() {
                        fire(&*target, &stats).await;
                    }
                    debug!(target: "gallery::invalidation", "mutation feed closed");
                    break;
                }
            },
            _ = wait_until(deadline) => {
                deadline = None;
                fire(&*target, &stats).await;
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn fire(target: &dyn Refresh, stats: &BridgeStats) {
    stats.refreshes.fetch_add(1, Ordering::Relaxed);
    target.refresh().await;
}
