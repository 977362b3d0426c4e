//! Incremental synchronization over the `/sync` endpoint.
//!
//! A sync session fetches "everything since last time" as a chain of pages
//! linked by `nextPageUrl` continuations. [`SyncCollection::next`] follows
//! the whole chain iteratively and returns one logical result: the
//! concatenated items plus the terminal `nextSyncUrl` token that resumes the
//! next session.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::client::{decode, ApiClient};
use crate::error::Error;
use crate::model::Sys;
use crate::query::QueryBuilder;

/// Server-side page cap for sync requests.
pub const SYNC_PAGE_LIMIT: u16 = 1000;

/// Page size for entry syncs, which additionally filter on a content type.
/// Smaller than [`SYNC_PAGE_LIMIT`] for no documented reason upstream;
/// override via [`SyncCollection::query_mut`] if needed.
pub const ENTRY_SYNC_PAGE_LIMIT: u16 = 100;

/// Hard cap on followed continuation pages in one `next()` call.
pub const MAX_SYNC_PAGES: usize = 64;

/// What a sync session selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncType {
    All,
    Entry,
    Asset,
    Deletion,
    DeletedAsset,
    DeletedEntry,
}

impl SyncType {
    /// Wire value for the `type` directive.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncType::All => "all",
            SyncType::Entry => "Entry",
            SyncType::Asset => "Asset",
            SyncType::Deletion => "Deletion",
            SyncType::DeletedAsset => "DeletedAsset",
            SyncType::DeletedEntry => "DeletedEntry",
        }
    }
}

/// One page of a sync response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncPage {
    #[serde(default)]
    #[allow(dead_code)]
    sys: Option<Sys>,
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default)]
    next_page_url: Option<String>,
    #[serde(default)]
    next_sync_url: Option<String>,
}

/// The outcome of one sync session: every followed page's items in request
/// order, plus the token that resumes the next session.
#[derive(Debug, Default)]
pub struct SyncResult {
    pub items: Vec<Value>,
    pub next_sync_url: Option<String>,
}

impl SyncResult {
    /// Decode every item into a concrete model.
    pub fn typed<T: DeserializeOwned>(&self) -> Result<Vec<T>, Error> {
        self.items
            .iter()
            .map(|item| Ok(serde_json::from_value(item.clone())?))
            .collect()
    }
}

/// Accumulating cursor over a sync session.
///
/// Owns private cursor state and must not be shared between callers; a
/// session is created per logical sync and discarded afterwards.
pub struct SyncCollection {
    client: ApiClient,
    path: String,
    query: QueryBuilder,
    sync_url: Option<String>,
    /// Items accumulated across `next()` calls on this instance.
    pub items: Vec<Value>,
    /// Resumption token surfaced by the most recent `next()`.
    pub next_sync_url: Option<String>,
}

impl SyncCollection {
    /// Start a fresh sync session.
    ///
    /// Entry syncs use the smaller [`ENTRY_SYNC_PAGE_LIMIT`] and carry a
    /// content-type filter; everything else uses [`SYNC_PAGE_LIMIT`].
    #[must_use]
    pub fn init(
        client: ApiClient,
        path: impl Into<String>,
        sync_type: SyncType,
        content_type: Option<&str>,
    ) -> Self {
        let mut query = QueryBuilder::new();
        query
            .limit(SYNC_PAGE_LIMIT)
            .equal("type", sync_type.as_str())
            .equal("initial", "true");

        if sync_type == SyncType::Entry {
            query.limit(ENTRY_SYNC_PAGE_LIMIT);
            if let Some(id) = content_type {
                query.content_type(id);
            }
        }

        Self {
            client,
            path: path.into(),
            query,
            sync_url: None,
            items: Vec::new(),
            next_sync_url: None,
        }
    }

    /// Resume a previous session from its `nextSyncUrl` token.
    ///
    /// The token's embedded query string is the real request; the
    /// collection's own query is bypassed entirely in this mode.
    #[must_use]
    pub fn from_sync_url(
        client: ApiClient,
        path: impl Into<String>,
        sync_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            path: path.into(),
            query: QueryBuilder::new(),
            sync_url: Some(sync_url.into()),
            items: Vec::new(),
            next_sync_url: None,
        }
    }

    /// Directives for a fresh sync. Ignored when resuming from a token.
    pub fn query_mut(&mut self) -> &mut QueryBuilder {
        &mut self.query
    }

    /// Run the session: fetch the first page, follow every `nextPageUrl`
    /// continuation, and return the concatenated result.
    ///
    /// All-or-nothing: a failure at any depth aborts the whole call and the
    /// partial accumulation is not exposed. Chains longer than
    /// [`MAX_SYNC_PAGES`] abort with [`Error::SyncPageCapExceeded`].
    pub async fn next(&mut self) -> Result<SyncResult, Error> {
        let first_query = match &self.sync_url {
            Some(token) => continuation_query(token)?,
            None => self.query.pairs().to_vec(),
        };

        let mut result = SyncResult::default();
        let mut frontier = Some(first_query);
        let mut pages = 0usize;

        while let Some(query) = frontier.take() {
            if pages == MAX_SYNC_PAGES {
                return Err(Error::SyncPageCapExceeded(MAX_SYNC_PAGES));
            }
            pages += 1;

            let response = self.client.get(&self.path, &query, &[]).await?;
            let page: SyncPage = decode(&response)?;
            result.items.extend(page.items);

            match page.next_page_url.filter(|url| !url.is_empty()) {
                Some(next_page) => {
                    tracing::debug!(page = pages, "following sync continuation");
                    // Only the embedded query of the continuation is used;
                    // the request still goes to the configured path.
                    frontier = Some(continuation_query(&next_page)?);
                }
                None => {
                    result.next_sync_url = page.next_sync_url.filter(|url| !url.is_empty());
                }
            }
        }

        tracing::debug!(pages, items = result.items.len(), "sync session complete");

        self.items.extend(result.items.iter().cloned());
        self.next_sync_url = result.next_sync_url.clone();

        Ok(result)
    }
}

/// Extract the query pairs embedded in a continuation or resumption URL.
fn continuation_query(token: &str) -> Result<Vec<(String, String)>, Error> {
    let url = Url::parse(token)?;
    Ok(url.query_pairs().into_owned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::client::{ApiClient, ApiConfig, RATE_LIMIT_RESET_HEADER};
    use crate::error::ErrorKind;
    use crate::http::mock::MockTransport;
    use crate::http::{Method, Response};
    use crate::model::Entry;

    const BASE: &str = "https://cdn.test.dev";
    const PATH: &str = "/spaces/s1/environments/master/sync";

    fn client(transport: &MockTransport) -> ApiClient {
        let config = ApiConfig::delivery("token").with_base_url(BASE);
        ApiClient::with_transport(config, Arc::new(transport.clone())).expect("client builds")
    }

    fn page(ids: &[&str], next_page: Option<&str>, next_sync: Option<&str>) -> String {
        let items: Vec<String> = ids
            .iter()
            .map(|id| format!(r#"{{"sys":{{"id":"{id}","type":"Entry"}},"fields":{{}}}}"#))
            .collect();
        let mut body = format!(r#"{{"sys":{{"type":"Array"}},"items":[{}]"#, items.join(","));
        if let Some(url) = next_page {
            body.push_str(&format!(r#","nextPageUrl":"{url}""#));
        }
        if let Some(url) = next_sync {
            body.push_str(&format!(r#","nextSyncUrl":"{url}""#));
        }
        body.push('}');
        body
    }

    fn item_ids(items: &[Value]) -> Vec<String> {
        items
            .iter()
            .map(|item| item["sys"]["id"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn sync_types_map_to_their_wire_values() {
        assert_eq!(SyncType::All.as_str(), "all");
        assert_eq!(SyncType::Entry.as_str(), "Entry");
        assert_eq!(SyncType::Asset.as_str(), "Asset");
        assert_eq!(SyncType::Deletion.as_str(), "Deletion");
        assert_eq!(SyncType::DeletedAsset.as_str(), "DeletedAsset");
        assert_eq!(SyncType::DeletedEntry.as_str(), "DeletedEntry");
    }

    #[test]
    fn entry_syncs_use_the_smaller_page_size_and_content_type_filter() {
        let transport = MockTransport::new();
        let collection = SyncCollection::init(
            client(&transport),
            PATH,
            SyncType::Entry,
            Some("article"),
        );
        assert_eq!(
            collection.query.encode(),
            "limit=100&type=Entry&initial=true&content_type=article"
        );

        let all = SyncCollection::init(client(&transport), PATH, SyncType::All, None);
        assert_eq!(all.query.encode(), "limit=1000&type=all&initial=true");
    }

    #[tokio::test]
    async fn single_page_sync_issues_one_call_and_returns_items_verbatim() {
        let transport = MockTransport::new();
        transport.push_json(
            Method::Get,
            format!("{BASE}{PATH}?limit=1000&type=all&initial=true"),
            200,
            &page(&["a", "b"], None, Some("https://cdn.test.dev/sync?sync_token=final")),
        );

        let mut sync = SyncCollection::init(client(&transport), PATH, SyncType::All, None);
        let result = sync.next().await.expect("sync succeeds");

        assert_eq!(item_ids(&result.items), vec!["a", "b"]);
        assert_eq!(
            result.next_sync_url.as_deref(),
            Some("https://cdn.test.dev/sync?sync_token=final")
        );
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn continuations_concatenate_in_request_order() {
        let transport = MockTransport::new();
        transport.push_json(
            Method::Get,
            format!("{BASE}{PATH}?limit=1000&type=all&initial=true"),
            200,
            &page(&["a"], Some("https://cdn.test.dev/sync?sync_token=p2"), None),
        );
        transport.push_json(
            Method::Get,
            format!("{BASE}{PATH}?sync_token=p2"),
            200,
            &page(&["b", "c"], Some("https://cdn.test.dev/sync?sync_token=p3"), None),
        );
        transport.push_json(
            Method::Get,
            format!("{BASE}{PATH}?sync_token=p3"),
            200,
            &page(&["d"], None, Some("https://cdn.test.dev/sync?sync_token=final")),
        );

        let mut sync = SyncCollection::init(client(&transport), PATH, SyncType::All, None);
        let result = sync.next().await.expect("sync succeeds");

        assert_eq!(item_ids(&result.items), vec!["a", "b", "c", "d"]);
        assert_eq!(
            result.next_sync_url.as_deref(),
            Some("https://cdn.test.dev/sync?sync_token=final")
        );
        assert_eq!(transport.requests().len(), 3);

        // The accumulator mirrors the returned result.
        assert_eq!(item_ids(&sync.items), vec!["a", "b", "c", "d"]);
        assert_eq!(sync.next_sync_url, result.next_sync_url);
    }

    #[tokio::test]
    async fn resuming_bypasses_the_collection_query() {
        let transport = MockTransport::new();
        transport.push_json(
            Method::Get,
            format!("{BASE}{PATH}?sync_token=resume1"),
            200,
            &page(&["z"], None, Some("https://cdn.test.dev/sync?sync_token=resume2")),
        );

        let mut sync = SyncCollection::from_sync_url(
            client(&transport),
            PATH,
            "https://cdn.test.dev/sync?sync_token=resume1",
        );
        let result = sync.next().await.expect("resume succeeds");

        assert_eq!(item_ids(&result.items), vec!["z"]);
        assert_eq!(
            result.next_sync_url.as_deref(),
            Some("https://cdn.test.dev/sync?sync_token=resume2")
        );
    }

    #[tokio::test]
    async fn failures_mid_chain_abort_the_whole_call() {
        let transport = MockTransport::new();
        transport.push_json(
            Method::Get,
            format!("{BASE}{PATH}?limit=1000&type=all&initial=true"),
            200,
            &page(&["a"], Some("https://cdn.test.dev/sync?sync_token=p2"), None),
        );
        transport.push_response(
            Method::Get,
            format!("{BASE}{PATH}?sync_token=p2"),
            Response {
                status: 429,
                headers: vec![(RATE_LIMIT_RESET_HEADER.to_string(), "nope".to_string())],
                body: br#"{"sys":{"id":"RateLimitExceeded","type":"Error"},"message":"slow down"}"#
                    .to_vec(),
            },
        );

        let mut sync = SyncCollection::init(client(&transport), PATH, SyncType::All, None);
        let err = sync.next().await.expect_err("expected rate limit error");
        assert_eq!(
            err.as_api().expect("api error").kind,
            ErrorKind::RateLimitExceeded
        );
        // Nothing accumulated from the aborted session.
        assert!(sync.items.is_empty());
    }

    #[tokio::test]
    async fn runaway_continuation_chains_hit_the_page_cap() {
        let transport = MockTransport::new();
        transport.push_json(
            Method::Get,
            format!("{BASE}{PATH}?limit=1000&type=all&initial=true"),
            200,
            &page(&["x"], Some("https://cdn.test.dev/sync?sync_token=p1"), None),
        );
        for i in 1..=MAX_SYNC_PAGES {
            transport.push_json(
                Method::Get,
                format!("{BASE}{PATH}?sync_token=p{i}"),
                200,
                &page(
                    &["x"],
                    Some(&format!("https://cdn.test.dev/sync?sync_token=p{}", i + 1)),
                    None,
                ),
            );
        }

        let mut sync = SyncCollection::init(client(&transport), PATH, SyncType::All, None);
        let err = sync.next().await.expect_err("expected page cap error");
        assert!(matches!(err, Error::SyncPageCapExceeded(MAX_SYNC_PAGES)));
        assert_eq!(transport.requests().len(), MAX_SYNC_PAGES);
    }

    #[tokio::test]
    async fn results_decode_into_typed_models() {
        let transport = MockTransport::new();
        transport.push_json(
            Method::Get,
            format!("{BASE}{PATH}?limit=100&type=Entry&initial=true&content_type=article"),
            200,
            &page(&["e1"], None, None),
        );

        let mut sync = SyncCollection::init(
            client(&transport),
            PATH,
            SyncType::Entry,
            Some("article"),
        );
        let result = sync.next().await.expect("sync succeeds");
        let entries: Vec<Entry> = result.typed().expect("items decode");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sys.as_ref().expect("sys").id, "e1");
    }
}
