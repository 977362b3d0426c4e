//! Thin per-resource services.
//!
//! Each service scopes a client to one space/environment, builds resource
//! paths, and delegates everything else to the executor and the collection
//! engines. They are representative wrappers; the full resource catalogue
//! follows the same shape.

pub mod entries;
pub mod locales;
pub mod sync;

pub use entries::EntriesService;
pub use locales::LocalesService;
pub use sync::SyncService;

/// Path prefix for a space/environment scope.
pub(crate) fn environment_path(space_id: &str, environment: &str) -> String {
    format!("/spaces/{space_id}/environments/{environment}")
}
