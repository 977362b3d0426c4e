//! Locale management within one environment.

use crate::client::{decode, version_header, ApiClient};
use crate::collection::{PageOptions, Paginated};
use crate::error::Error;
use crate::model::{Locale, Versioned};

use super::environment_path;

/// Service for `/spaces/{space}/environments/{env}/locales`.
#[derive(Clone)]
pub struct LocalesService {
    client: ApiClient,
    base_path: String,
}

impl LocalesService {
    #[must_use]
    pub fn new(client: ApiClient, space_id: &str, environment: &str) -> Self {
        Self {
            client,
            base_path: format!("{}/locales", environment_path(space_id, environment)),
        }
    }

    #[must_use]
    pub fn list(&self, options: PageOptions) -> Paginated<Locale> {
        Paginated::new(self.client.clone(), self.base_path.clone(), options)
    }

    pub async fn get(&self, locale_id: &str) -> Result<Locale, Error> {
        let response = self
            .client
            .get(&format!("{}/{locale_id}", self.base_path), &[], &[])
            .await?;
        decode(&response)
    }

    /// Create or update the locale, refreshing it from the response.
    pub async fn upsert(&self, locale: &mut Locale) -> Result<(), Error> {
        let body = serde_json::to_vec(&locale)?;
        let headers = vec![version_header(locale.version())];

        let response = match locale.id() {
            None => self.client.post(&self.base_path, &[], &headers, body).await?,
            Some(id) => {
                let path = format!("{}/{id}", self.base_path);
                self.client.put(&path, &[], &headers, body).await?
            }
        };

        *locale = decode(&response)?;
        Ok(())
    }

    pub async fn delete(&self, locale: &Locale) -> Result<(), Error> {
        let Some(id) = locale.id() else {
            return Ok(());
        };
        self.client
            .delete(&format!("{}/{id}", self.base_path), &[], &[])
            .await?;
        Ok(())
    }
}
