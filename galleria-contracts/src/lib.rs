//! Trait surfaces that describe the external collaborators of a gallery:
//! the catalog query service and the push channel announcing mutations.

pub mod catalog;
pub mod error;
pub mod feed;

pub use catalog::CatalogQuery;
pub use error::CatalogError;
pub use feed::{MutationEventStream, MutationFeed};

/// Frequently used contracts for session and bridge wiring.
pub mod prelude {
    pub use super::catalog::CatalogQuery;
    pub use super::error::CatalogError;
    pub use super::feed::{MutationEventStream, MutationFeed};
    pub use galleria_model::prelude::*;
}
