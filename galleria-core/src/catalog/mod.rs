//! Local implementations of the catalog contracts.

pub mod feed;
pub mod memory;

pub use feed::BroadcastMutationFeed;
pub use memory::InMemoryCatalog;
