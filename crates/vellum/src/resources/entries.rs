//! Entry management within one environment.

use crate::client::{decode, version_header, ApiClient};
use crate::collection::{PageOptions, Paginated};
use crate::error::Error;
use crate::model::{Entry, Versioned};

use super::environment_path;

/// Header naming the content type of a newly created entry.
pub const CONTENT_TYPE_HEADER: &str = "X-Vellum-Content-Type";

/// Service for `/spaces/{space}/environments/{env}/entries`.
#[derive(Clone)]
pub struct EntriesService {
    client: ApiClient,
    base_path: String,
}

impl EntriesService {
    #[must_use]
    pub fn new(client: ApiClient, space_id: &str, environment: &str) -> Self {
        Self {
            client,
            base_path: format!("{}/entries", environment_path(space_id, environment)),
        }
    }

    /// Paginated listing of all entries in the environment.
    #[must_use]
    pub fn list(&self, options: PageOptions) -> Paginated<Entry> {
        Paginated::new(self.client.clone(), self.base_path.clone(), options)
    }

    pub async fn get(&self, entry_id: &str) -> Result<Entry, Error> {
        let response = self
            .client
            .get(&format!("{}/{entry_id}", self.base_path), &[], &[])
            .await?;
        decode(&response)
    }

    /// Create or update the entry, refreshing it from the response.
    ///
    /// New entries are created with the content-type header; existing ones
    /// are updated with their version as the concurrency token.
    pub async fn upsert(&self, content_type_id: &str, entry: &mut Entry) -> Result<(), Error> {
        let body = serde_json::to_vec(&entry)?;
        let headers = vec![
            version_header(entry.version()),
            (CONTENT_TYPE_HEADER.to_string(), content_type_id.to_string()),
        ];

        let response = match entry.id() {
            None => self.client.post(&self.base_path, &[], &headers, body).await?,
            Some(id) => {
                let path = format!("{}/{id}", self.base_path);
                self.client.put(&path, &[], &headers, body).await?
            }
        };

        *entry = decode(&response)?;
        Ok(())
    }

    pub async fn delete(&self, entry: &Entry) -> Result<(), Error> {
        let Some(id) = entry.id() else {
            return Ok(());
        };
        self.client
            .delete(&format!("{}/{id}", self.base_path), &[], &[])
            .await?;
        Ok(())
    }

    /// Publish the entry at its current version.
    pub async fn publish(&self, entry: &mut Entry) -> Result<(), Error> {
        let Some(id) = entry.id() else {
            return Ok(());
        };
        let path = format!("{}/{id}/published", self.base_path);
        let headers = vec![version_header(entry.version())];
        let response = self.client.put(&path, &[], &headers, Vec::new()).await?;
        *entry = decode(&response)?;
        Ok(())
    }

    pub async fn unpublish(&self, entry: &mut Entry) -> Result<(), Error> {
        let Some(id) = entry.id() else {
            return Ok(());
        };
        let path = format!("{}/{id}/published", self.base_path);
        let headers = vec![version_header(entry.version())];
        let response = self.client.delete(&path, &[], &headers).await?;
        *entry = decode(&response)?;
        Ok(())
    }
}
