//! Sync sessions scoped to one environment.

use crate::client::ApiClient;
use crate::sync::{SyncCollection, SyncType};

use super::environment_path;

/// Service for `/spaces/{space}/environments/{env}/sync`.
#[derive(Clone)]
pub struct SyncService {
    client: ApiClient,
    base_path: String,
}

impl SyncService {
    #[must_use]
    pub fn new(client: ApiClient, space_id: &str, environment: &str) -> Self {
        Self {
            client,
            base_path: format!("{}/sync", environment_path(space_id, environment)),
        }
    }

    /// Start a fresh sync session.
    #[must_use]
    pub fn init(&self, sync_type: SyncType, content_type: Option<&str>) -> SyncCollection {
        SyncCollection::init(
            self.client.clone(),
            self.base_path.clone(),
            sync_type,
            content_type,
        )
    }

    /// Resume a previous session from its `nextSyncUrl` token.
    #[must_use]
    pub fn from_sync_url(&self, sync_url: impl Into<String>) -> SyncCollection {
        SyncCollection::from_sync_url(self.client.clone(), self.base_path.clone(), sync_url)
    }
}
