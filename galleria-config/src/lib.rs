//! Shared configuration library for Galleria.
//!
//! This crate centralizes config defaults, loading from the environment or
//! config files, validation guard rails, and the tracing bootstrap used by
//! applications embedding the pagination engine. There is a single source of
//! truth for tuning constants so the session, prefetch manager and
//! invalidation bridge never disagree about defaults.

pub mod loader;
pub mod logging;
pub mod models;
pub mod validation;

pub use loader::GalleryConfigSource;
pub use models::{
    GalleryConfig, InvalidationConfig, PaginationConfig, PrefetchConfig,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
