use async_trait::async_trait;
use galleria_contracts::{CatalogError, MutationEventStream, MutationFeed};
use galleria_model::{MutationEvent, MutationKind};
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;

/// In-process mutation feed backed by a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastMutationFeed {
    sender: broadcast::Sender<MutationEvent>,
}

impl Default for BroadcastMutationFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

impl BroadcastMutationFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Announce a mutation. Returns how many subscribers received it.
    pub fn publish(&self, event: MutationEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl MutationFeed for BroadcastMutationFeed {
    async fn subscribe(&self) -> Result<MutationEventStream, CatalogError> {
        let stream = BroadcastStream::new(self.sender.subscribe()).map(|received| {
            match received {
                Ok(event) => event,
                Err(BroadcastStreamRecvError::Lagged(missed)) => {
                    // Missed events may have changed the catalog; treat the
                    // gap as a bulk edit so subscribers still refresh.
                    warn!(missed, "mutation subscriber lagged");
                    MutationEvent::new(MutationKind::BulkEdit, Vec::new())
                }
            }
        });
        Ok(Box::pin(stream))
    }
}
