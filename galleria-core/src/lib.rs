//! # Galleria Core
//!
//! Client-side pagination engine for large, continuously changing media
//! galleries: cursor-based paging, velocity-adaptive prefetching and live
//! invalidation driven by server push events.
//!
//! ## Overview
//!
//! - **Cursors**: opaque, versioned tokens encoding the `(sort value, id)` of
//!   the last item consumed, so pages never skip or repeat items when sort
//!   values tie ([`cursor`]).
//! - **Sessions**: per-gallery item lists that stay ordered and duplicate
//!   free across overlapping loads, and drop responses for superseded
//!   filters ([`session`]).
//! - **Prefetching**: scroll telemetry feeds a pure planner that decides when
//!   and how deep to fetch ahead; pages land in a shared TTL cache with
//!   request coalescing ([`prefetch`], [`cache`]).
//! - **Invalidation**: bursts of catalog mutation events collapse into one
//!   debounced refresh ([`invalidation`]).
//!
//! ## Architecture
//!
//! - [`catalog`]: in-memory catalog and broadcast mutation feed
//! - [`error`]: the [`GalleryError`] type surfaced in session snapshots
//! - [`ordering`]: the total order every view and catalog agrees on
//!
//! The catalog query service and the push channel are trait seams defined in
//! `galleria-contracts`; tuning constants come from `galleria-config`.
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use galleria_config::GalleryConfig;
//! use galleria_core::{
//!     cache::PageCache, catalog::InMemoryCatalog, session::PaginationSession,
//! };
//! use galleria_model::GalleryFilters;
//!
//! async fn open_gallery(catalog: Arc<InMemoryCatalog>) {
//!     let config = GalleryConfig::default();
//!     let cache = Arc::new(PageCache::new(config.prefetch.cache_ttl()));
//!     let session =
//!         PaginationSession::with_cache(catalog, &config.pagination, cache);
//!
//!     session.load(GalleryFilters::default()).await;
//!     while session.snapshot().has_more {
//!         session.load_more().await;
//!     }
//! }
//! ```
#![allow(missing_docs)]

pub mod cache;
pub mod catalog;
pub mod cursor;
pub mod error;
pub mod invalidation;
pub mod ordering;
pub mod prefetch;
pub mod prelude;
pub mod session;

pub use cache::{PageCache, PageKey, PageSource};
pub use cursor::{CursorDecodeError, CursorPosition};
pub use error::GalleryError;
pub use invalidation::{InvalidationBridge, InvalidationHandle, Refresh};
pub use prefetch::{PrefetchDiagnostics, PrefetchManager, PrefetchPhase};
pub use session::{LoadOutcome, PaginationSession, SessionPhase, SessionSnapshot};
