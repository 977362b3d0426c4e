//! API error envelope decoding and classification.
//!
//! Every non-success response carries a JSON envelope whose `sys.id` string
//! discriminates the failure. The discriminator maps totally onto the closed
//! [`ErrorKind`] enum; strings the mapping does not know land in
//! [`ErrorKind::Unclassified`] instead of being dropped.

use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::http::{header_get, Method, Request, Response, TransportError};

/// Header carrying the optimistic-concurrency token on mutating calls.
pub const VERSION_HEADER: &str = "X-Vellum-Version";

/// `sys` block of an error envelope.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorSys {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// The raw JSON body of a non-success response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub sys: ErrorSys,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub details: ErrorDetails,
}

/// One field-level failure inside `details.errors`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: Option<Value>,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub value: Option<Value>,
}

/// The polymorphic `details` field.
///
/// The server sends one of three shapes: a bare string, an object with an
/// `errors` array, or an object with a `reasons` string. Decoding inspects
/// the JSON kind first; a bare string becomes a single synthetic
/// [`ErrorDetail`] with only `details` populated, and unknown shapes decode
/// to the empty value.
#[derive(Debug, Clone, Default)]
pub struct ErrorDetails {
    pub errors: Vec<ErrorDetail>,
    pub reasons: String,
}

impl<'de> Deserialize<'de> for ErrorDetails {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        let mut out = ErrorDetails::default();

        match raw {
            Value::String(text) => {
                out.errors.push(ErrorDetail {
                    details: text,
                    ..ErrorDetail::default()
                });
            }
            Value::Object(map) => {
                if let Some(errors) = map.get("errors") {
                    out.errors =
                        serde_json::from_value(errors.clone()).map_err(serde::de::Error::custom)?;
                }
                if let Some(Value::String(reasons)) = map.get("reasons") {
                    out.reasons = reasons.clone();
                }
            }
            _ => {}
        }

        Ok(out)
    }
}

/// Closed set of failure kinds the API reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    RateLimitExceeded,
    AccessTokenInvalid,
    ValidationFailed,
    VersionMismatch,
    InvalidEntry,
    Unclassified,
}

impl ErrorKind {
    /// Total mapping from the `sys.id` discriminator.
    ///
    /// `"Conflict"` is the server's older spelling of a version mismatch and
    /// classifies identically.
    #[must_use]
    pub fn from_discriminator(id: &str) -> Self {
        match id {
            "NotFound" => ErrorKind::NotFound,
            "RateLimitExceeded" => ErrorKind::RateLimitExceeded,
            "AccessTokenInvalid" => ErrorKind::AccessTokenInvalid,
            "ValidationFailed" => ErrorKind::ValidationFailed,
            "VersionMismatch" | "Conflict" => ErrorKind::VersionMismatch,
            "InvalidEntry" => ErrorKind::InvalidEntry,
            _ => ErrorKind::Unclassified,
        }
    }
}

/// A classified API failure.
///
/// Retains the request method/URL, response status and the decoded envelope
/// so callers can inspect failures programmatically; `Display` renders the
/// kind-specific human message.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub method: Method,
    pub url: String,
    pub status: u16,
    /// The optimistic-concurrency version sent with the request, if any.
    pub sent_version: Option<String>,
    pub envelope: ErrorEnvelope,
}

impl ApiError {
    /// Classify a decoded envelope against the request/response pair.
    #[must_use]
    pub fn classify(request: &Request, response: &Response, envelope: ErrorEnvelope) -> Self {
        let kind = ErrorKind::from_discriminator(&envelope.sys.id);
        tracing::debug!(
            discriminator = %envelope.sys.id,
            status = response.status,
            url = %request.url,
            ?kind,
            "classified api error"
        );
        Self {
            kind,
            method: request.method,
            url: request.url.clone(),
            status: response.status,
            sent_version: header_get(&request.headers, VERSION_HEADER).map(str::to_string),
            envelope,
        }
    }

    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.kind == ErrorKind::RateLimitExceeded
    }

    fn render_validation_failed(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for detail in &self.envelope.details.errors {
            match detail.path.as_ref().and_then(path_as_string) {
                Some(path) => writeln!(
                    f,
                    "Value \"{}\" in path \"{}\" with details: \"{}\"",
                    render_value(detail.value.as_ref()),
                    path,
                    detail.details
                )?,
                None => writeln!(
                    f,
                    "Value {} in path {} {}",
                    render_value(detail.value.as_ref()),
                    detail
                        .path
                        .as_ref()
                        .map_or_else(|| "null".to_string(), Value::to_string),
                    detail.details
                )?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::NotFound => write!(f, "the requested resource can not be found"),
            ErrorKind::VersionMismatch => write!(
                f,
                "Version {} is mismatched",
                self.sent_version.as_deref().unwrap_or_default()
            ),
            ErrorKind::ValidationFailed => self.render_validation_failed(f),
            ErrorKind::InvalidEntry => {
                for detail in &self.envelope.details.errors {
                    writeln!(f, "{}", detail.details)?;
                }
                Ok(())
            }
            ErrorKind::RateLimitExceeded
            | ErrorKind::AccessTokenInvalid
            | ErrorKind::Unclassified => write!(f, "{}", self.envelope.message),
        }
    }
}

impl std::error::Error for ApiError {}

/// Join a list-shaped `path` with dots. Non-string segments render as JSON;
/// non-list paths are not interpretable.
fn path_as_string(path: &Value) -> Option<String> {
    match path {
        Value::Array(segments) => Some(
            segments
                .iter()
                .map(|segment| match segment {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("."),
        ),
        _ => None,
    }
}

/// Bare strings render unquoted, everything else as JSON.
fn render_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Crate-level error type.
///
/// Transport failures propagate unmodified; HTTP-level failures arrive
/// classified as [`ApiError`]. A malformed error body surfaces as `Decode`
/// and discards the original HTTP status, a known rough edge.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("sync followed more than {0} continuation pages")]
    SyncPageCapExceeded(usize),
}

impl Error {
    /// The classified API failure, when this error is one.
    #[must_use]
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(api) => Some(api),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(body: Value) -> ErrorEnvelope {
        serde_json::from_value(body).expect("envelope decodes")
    }

    fn classified(discriminator: &str, body: Value) -> ApiError {
        let request = Request {
            method: Method::Get,
            url: "https://api.example.com/spaces/s1/entries/e1".to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        };
        let response = Response {
            status: 400,
            headers: Vec::new(),
            body: Vec::new(),
        };
        let mut env = envelope(body);
        env.sys.id = discriminator.to_string();
        ApiError::classify(&request, &response, env)
    }

    #[test]
    fn bare_string_details_become_one_synthetic_entry() {
        let env = envelope(json!({
            "sys": {"id": "BadRequest", "type": "Error"},
            "message": "nope",
            "details": "something went sideways"
        }));

        assert_eq!(env.details.errors.len(), 1);
        let detail = &env.details.errors[0];
        assert_eq!(detail.details, "something went sideways");
        assert!(detail.name.is_empty());
        assert!(detail.path.is_none());
        assert!(env.details.reasons.is_empty());
    }

    #[test]
    fn object_details_decode_errors_array() {
        let env = envelope(json!({
            "sys": {"id": "ValidationFailed", "type": "Error"},
            "details": {"errors": [
                {"name": "regexp", "path": ["src"], "details": "bad", "value": "localhost"}
            ]}
        }));

        assert_eq!(env.details.errors.len(), 1);
        assert_eq!(env.details.errors[0].name, "regexp");
    }

    #[test]
    fn object_details_decode_reasons_string() {
        let env = envelope(json!({
            "sys": {"id": "AccessDenied", "type": "Error"},
            "details": {"reasons": "insufficient permissions"}
        }));

        assert!(env.details.errors.is_empty());
        assert_eq!(env.details.reasons, "insufficient permissions");
    }

    #[test]
    fn unknown_details_shapes_decode_to_empty() {
        let env = envelope(json!({
            "sys": {"id": "ServerError", "type": "Error"},
            "details": [1, 2, 3]
        }));

        assert!(env.details.errors.is_empty());
        assert!(env.details.reasons.is_empty());
    }

    #[test]
    fn discriminator_mapping_is_total_and_deterministic() {
        let table = [
            ("NotFound", ErrorKind::NotFound),
            ("RateLimitExceeded", ErrorKind::RateLimitExceeded),
            ("AccessTokenInvalid", ErrorKind::AccessTokenInvalid),
            ("ValidationFailed", ErrorKind::ValidationFailed),
            ("VersionMismatch", ErrorKind::VersionMismatch),
            ("Conflict", ErrorKind::VersionMismatch),
            ("InvalidEntry", ErrorKind::InvalidEntry),
            ("SomethingElse", ErrorKind::Unclassified),
            ("", ErrorKind::Unclassified),
        ];
        for (discriminator, expected) in table {
            assert_eq!(ErrorKind::from_discriminator(discriminator), expected);
            // Same input, same kind.
            assert_eq!(
                ErrorKind::from_discriminator(discriminator),
                ErrorKind::from_discriminator(discriminator)
            );
        }
    }

    #[test]
    fn not_found_renders_the_fixed_message() {
        let err = classified(
            "NotFound",
            json!({"message": "The resource could not be found."}),
        );
        assert_eq!(err.to_string(), "the requested resource can not be found");
    }

    #[test]
    fn validation_failed_renders_each_flat_path_entry() {
        let err = classified(
            "ValidationFailed",
            json!({"details": {"errors": [
                {"name": "regexp", "path": ["src"], "details": "does not match the pattern", "value": "localhost"}
            ]}}),
        );
        assert_eq!(
            err.to_string(),
            "Value \"localhost\" in path \"src\" with details: \"does not match the pattern\"\n"
        );
    }

    #[test]
    fn validation_failed_joins_mixed_paths_with_dots() {
        let err = classified(
            "ValidationFailed",
            json!({"details": {"errors": [
                {"path": ["fields", "title", 0], "details": "required", "value": "x"}
            ]}}),
        );
        assert_eq!(
            err.to_string(),
            "Value \"x\" in path \"fields.title.0\" with details: \"required\"\n"
        );
    }

    #[test]
    fn validation_failed_falls_back_for_non_list_paths() {
        let err = classified(
            "ValidationFailed",
            json!({"details": {"errors": [
                {"path": "not-a-list", "details": "odd", "value": "v"}
            ]}}),
        );
        assert_eq!(err.to_string(), "Value v in path \"not-a-list\" odd\n");
    }

    #[test]
    fn invalid_entry_concatenates_detail_lines() {
        let err = classified(
            "InvalidEntry",
            json!({"details": {"errors": [
                {"details": "first problem"},
                {"details": "second problem"}
            ]}}),
        );
        assert_eq!(err.to_string(), "first problem\nsecond problem\n");
    }

    #[test]
    fn version_mismatch_reports_the_sent_version() {
        let request = Request {
            method: Method::Put,
            url: "https://api.example.com/spaces/s1/entries/e1".to_string(),
            headers: vec![(VERSION_HEADER.to_string(), "3".to_string())],
            body: Vec::new(),
        };
        let response = Response {
            status: 409,
            headers: Vec::new(),
            body: Vec::new(),
        };
        let env = envelope(json!({"sys": {"id": "Conflict", "type": "Error"}}));
        let err = ApiError::classify(&request, &response, env);

        assert_eq!(err.kind, ErrorKind::VersionMismatch);
        assert_eq!(err.to_string(), "Version 3 is mismatched");
    }

    #[test]
    fn rate_limit_and_token_errors_surface_the_envelope_message() {
        let limited = classified("RateLimitExceeded", json!({"message": "slow down"}));
        assert_eq!(limited.to_string(), "slow down");
        assert!(limited.is_rate_limited());

        let token = classified("AccessTokenInvalid", json!({"message": "bad token"}));
        assert_eq!(token.to_string(), "bad token");
        assert!(!token.is_rate_limited());
    }

    #[test]
    fn unclassified_errors_keep_their_metadata() {
        let err = classified(
            "TotallyNewKind",
            json!({"message": "mystery", "requestId": "req-9"}),
        );
        assert_eq!(err.kind, ErrorKind::Unclassified);
        assert_eq!(err.to_string(), "mystery");
        assert_eq!(err.envelope.request_id, "req-9");
        assert_eq!(err.status, 400);
    }
}
