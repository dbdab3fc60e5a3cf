use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use galleria_model::MutationEvent;

use crate::error::CatalogError;

/// Stream of catalog mutations for one subscriber.
///
/// Dropping the stream unsubscribes.
pub type MutationEventStream =
    Pin<Box<dyn Stream<Item = MutationEvent> + Send>>;

/// Push channel fired on any server-side catalog mutation.
#[async_trait]
pub trait MutationFeed: Send + Sync {
    async fn subscribe(&self) -> Result<MutationEventStream, CatalogError>;
}
