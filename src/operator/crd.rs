//! ShortURL custom resource definition.

use std::fmt;

use chrono::{DateTime, Utc};
use kube::{CustomResource, CustomResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired state of a ShortURL: the URL to shorten and an optional expiry.
///
/// Both fields are treated as immutable; changing them after the short path
/// has been assigned has no effect.
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "urlshortener.shortener.io",
    version = "v1",
    kind = "ShortURL",
    plural = "shorturls",
    shortname = "surl",
    namespaced,
    status = "ShortURLStatus",
    printcolumn = r#"{"name":"Target", "type":"string", "jsonPath":".spec.targetURL"}"#,
    printcolumn = r#"{"name":"ShortPath", "type":"string", "jsonPath":".status.shortPath"}"#,
    printcolumn = r#"{"name":"Clicks", "type":"integer", "jsonPath":".status.clickCount"}"#,
    printcolumn = r#"{"name":"Valid", "type":"string", "jsonPath":".status.isValid"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
pub struct ShortURLSpec {
    /// URL the short path redirects to
    #[serde(rename = "targetURL")]
    pub target_url: String,

    /// Time after which the short path stops redirecting
    #[serde(rename = "expireAt", default, skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<DateTime<Utc>>,
}

/// Observed state of a ShortURL.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShortURLStatus {
    /// Short code issued by the shortening service; written once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_path: Option<String>,

    /// Redirects served for the short path
    #[serde(default)]
    pub click_count: u64,

    /// Whether the short path still redirects
    #[serde(default)]
    pub is_valid: Validity,

    /// Time of the last successful status write (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl ShortURLStatus {
    /// The assigned short path, treating an empty string as unassigned.
    pub fn assigned_short_path(&self) -> Option<&str> {
        self.short_path.as_deref().filter(|p| !p.is_empty())
    }
}

impl ShortURL {
    /// Short path from the status, if one has been assigned.
    pub fn short_path(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(ShortURLStatus::assigned_short_path)
    }
}

/// Renders the CustomResourceDefinition manifest as YAML.
pub fn crd_yaml() -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&ShortURL::crd())
}

/// Validity of a short path as reported on the resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Validity {
    /// Not checked yet
    #[default]
    Unknown,
    True,
    False,
}

impl From<bool> for Validity {
    fn from(valid: bool) -> Self {
        if valid { Validity::True } else { Validity::False }
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validity::Unknown => write!(f, "unknown"),
            Validity::True => write!(f, "true"),
            Validity::False => write!(f, "false"),
        }
    }
}
