//! Block registry entries.

use serde::{Deserialize, Serialize};

/// A domain the user has chosen to restrict during focus sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockedSite {
    /// Time-ordered UUID, so list order and id order agree.
    pub id: String,
    /// Canonical domain (lowercased host without `www.`).
    pub url: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}
