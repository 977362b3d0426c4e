//! Generic paginated listings.
//!
//! A [`Paginated`] cursor turns a sequence of bounded collection responses
//! into repeated [`Paginated::next`] calls. The cursor owns its query and
//! page counter; callers drive it until [`Collection::is_exhausted`] reports
//! the end (or a page comes back empty).

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::client::{decode, ApiClient};
use crate::error::Error;
use crate::model::Sys;
use crate::query::QueryBuilder;

/// One page of a resource listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Collection<T> {
    #[serde(default)]
    pub sys: Option<Sys>,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub skip: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub items: Vec<T>,
    #[serde(default)]
    pub includes: Option<Value>,
}

impl<T> Collection<T> {
    /// Whether this page reaches the end of the listing.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.skip as usize + self.items.len() >= self.total as usize
    }
}

/// Construction options for a paginated listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageOptions {
    /// Initial page size. Zero leaves the choice to the server.
    pub limit: u16,
}

/// Single-page-at-a-time cursor over a listing endpoint.
///
/// Cursor state is single-threaded by contract: `next` takes `&mut self`,
/// and an instance belongs to one logical listing. Create a fresh cursor
/// for each independent listing.
pub struct Paginated<T> {
    client: ApiClient,
    path: String,
    query: QueryBuilder,
    page: u16,
    limit: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Paginated<T> {
    /// Create a cursor for `path`, ordered by creation time ascending
    /// unless the caller overrides the order directive.
    #[must_use]
    pub fn new(client: ApiClient, path: impl Into<String>, options: PageOptions) -> Self {
        let mut query = QueryBuilder::new();
        query.order("sys.createdAt", false);
        if options.limit > 0 {
            query.limit(options.limit);
        }

        Self {
            client,
            path: path.into(),
            query,
            page: 1,
            limit: u32::from(options.limit),
            _marker: PhantomData,
        }
    }

    /// Filter and sort directives for the listing. Changing pagination
    /// directives here is undefined; the cursor manages `skip` itself.
    pub fn query_mut(&mut self) -> &mut QueryBuilder {
        &mut self.query
    }

    /// Fetch the next page.
    ///
    /// Recomputes `skip = limit * (page - 1)` before the request, where
    /// `limit` is the effective page size reported by the previous response
    /// (initially the configured one). The page counter advances by exactly
    /// one per successful call.
    pub async fn next(&mut self) -> Result<Collection<T>, Error> {
        let skip = self.limit * (u32::from(self.page) - 1);
        self.query.skip(skip);

        let response = self.client.get(&self.path, self.query.pairs(), &[]).await?;
        let collection: Collection<T> = decode(&response)?;

        self.page += 1;
        self.limit = collection.limit;

        Ok(collection)
    }
}
