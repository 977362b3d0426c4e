//! Vellum - a client for space/environment-scoped content management APIs.
//!
//! This library provides a single request executor with deterministic query
//! encoding, typed API error classification, bounded rate-limit retries, and
//! two collection engines: offset pagination and token-based incremental
//! sync.
//!
//! # Example
//!
//! ```ignore
//! use vellum::{ApiClient, ApiConfig, EntriesService, PageOptions};
//!
//! let client = ApiClient::new(ApiConfig::management("cma-token"))?;
//! let entries = EntriesService::new(client, "space-id", "master");
//!
//! let mut listing = entries.list(PageOptions { limit: 100 });
//! let page = listing.next().await?;
//! ```

pub mod client;
pub mod collection;
pub mod error;
pub mod http;
pub mod model;
pub mod query;
pub mod resources;
pub mod sync;

pub use client::{ApiClient, ApiConfig, RetryPolicy};
pub use collection::{Collection, PageOptions, Paginated};
pub use error::{ApiError, Error, ErrorKind};
pub use http::Transport;
pub use model::{Entry, Link, Locale, Sys, Versioned};
pub use query::QueryBuilder;
pub use resources::{EntriesService, LocalesService, SyncService};
pub use sync::{SyncCollection, SyncResult, SyncType};
