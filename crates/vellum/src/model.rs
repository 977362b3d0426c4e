//! Envelope models shared by every resource type.
//!
//! Only the `sys` envelope is modeled here; resource fields stay loosely
//! typed. Field-level validation is a server concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A reference to another resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub sys: LinkSys,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSys {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link_type: String,
}

/// The `sys` envelope carried by every API resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sys {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_version: Option<u32>,
}

/// An entry: localized fields under an envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sys: Option<Sys>,
    #[serde(default)]
    pub fields: Value,
}

/// A locale definition within an environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locale {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sys: Option<Sys>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    pub fallback_code: Option<String>,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(rename = "contentDeliveryApi", default)]
    pub cda: bool,
    #[serde(rename = "contentManagementApi", default)]
    pub cma: bool,
}

/// The entity version used as the optimistic-concurrency token.
///
/// New entities that have never round-tripped through the API report
/// version 1.
pub trait Versioned {
    fn sys(&self) -> Option<&Sys>;

    fn version(&self) -> u32 {
        self.sys().and_then(|s| s.version).unwrap_or(1)
    }

    fn is_new(&self) -> bool {
        self.sys().map_or(true, |s| s.id.is_empty())
    }

    fn id(&self) -> Option<&str> {
        self.sys().filter(|s| !s.id.is_empty()).map(|s| s.id.as_str())
    }
}

impl Versioned for Entry {
    fn sys(&self) -> Option<&Sys> {
        self.sys.as_ref()
    }
}

impl Versioned for Locale {
    fn sys(&self) -> Option<&Sys> {
        self.sys.as_ref()
    }
}

impl Entry {
    /// Whether the current version is the published one.
    #[must_use]
    pub fn is_published(&self) -> bool {
        match &self.sys {
            Some(sys) => match (sys.published_version, sys.version) {
                (Some(published), Some(version)) => published > 0 && version == published + 1,
                _ => false,
            },
            None => false,
        }
    }
}
