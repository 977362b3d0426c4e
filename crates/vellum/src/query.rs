//! Ordered query string construction.
//!
//! The API accepts filter, sort and pagination directives as query
//! parameters. Directive order is significant for nothing on the server
//! side, but a stable serialization makes requests reproducible and lets
//! tests assert on byte-identical query strings, so the builder preserves
//! insertion order and re-setting a directive replaces its value in place.

use url::form_urlencoded;

/// Builder for the query string of a listing or sync request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryBuilder {
    pairs: Vec<(String, String)>,
}

impl QueryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a directive, replacing an existing one with the same key in place.
    fn set(&mut self, key: &str, value: String) {
        if let Some(pair) = self.pairs.iter_mut().find(|(k, _)| k == key) {
            pair.1 = value;
        } else {
            self.pairs.push((key.to_string(), value));
        }
    }

    /// Equality filter on a field.
    pub fn equal(&mut self, field: &str, value: impl Into<String>) -> &mut Self {
        self.set(field, value.into());
        self
    }

    /// Sort by a field. `reverse` flips to descending (`-field`).
    pub fn order(&mut self, field: &str, reverse: bool) -> &mut Self {
        let value = if reverse {
            format!("-{field}")
        } else {
            field.to_string()
        };
        self.set("order", value);
        self
    }

    /// Page size. The server applies its own default when absent.
    pub fn limit(&mut self, limit: u16) -> &mut Self {
        self.set("limit", limit.to_string());
        self
    }

    /// Number of items to skip.
    pub fn skip(&mut self, skip: u32) -> &mut Self {
        self.set("skip", skip.to_string());
        self
    }

    /// Restrict results to one content type.
    pub fn content_type(&mut self, id: &str) -> &mut Self {
        self.set("content_type", id.to_string());
        self
    }

    /// Ordered key/value pairs, un-encoded.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Percent-encoded query string in insertion order.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut ser = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.pairs {
            ser.append_pair(k, v);
        }
        ser.finish()
    }
}
