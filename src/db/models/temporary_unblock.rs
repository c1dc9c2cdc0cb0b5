//! Time-bounded exceptions to blocking.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryUnblock {
    /// Canonical domain the grant applies to (subdomains included).
    pub url: String,
    /// Epoch milliseconds; the grant is active while `expires_at > now`.
    pub expires_at: i64,
    /// Requested duration in milliseconds. Only used for progress display.
    #[serde(rename = "originalDuration")]
    pub original_duration_ms: i64,
}

impl TemporaryUnblock {
    pub fn is_active(&self, now_ms: i64) -> bool {
        self.expires_at > now_ms
    }
}
