use std::time::Duration;

use anyhow::Result;
use log::debug;
use serde::Serialize;

use crate::{
    db::{BlockedSite, TemporaryUnblock},
    domain,
};

use super::{BlockRegistry, UnblockLedger};

pub const CACHE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub blocked_sites: Vec<BlockedSite>,
    pub temporary_unblocks: Vec<TemporaryUnblock>,
    /// Epoch milliseconds; `None` until the first successful load.
    pub last_refreshed_at: Option<i64>,
}

impl CacheSnapshot {
    /// First registry entry covering `host`.
    pub fn blocking_rule(&self, host: &str) -> Option<&BlockedSite> {
        self.blocked_sites
            .iter()
            .find(|site| domain::matches(host, &domain::canonical(&site.url)))
    }

    /// Unexpired grant covering `host`. Expiry is checked against `now_ms`
    /// here as well, so a grant stops applying the moment it lapses even if
    /// the snapshot is a few seconds old.
    pub fn active_unblock(&self, host: &str, now_ms: i64) -> Option<&TemporaryUnblock> {
        self.temporary_unblocks.iter().find(|unblock| {
            unblock.is_active(now_ms) && domain::matches(host, &domain::canonical(&unblock.url))
        })
    }
}

/// In-memory mirror of the registry and ledger.
///
/// `ensure_fresh` reloads once the snapshot is older than the TTL;
/// `force_refresh` reloads unconditionally and is called after every write so
/// the next navigation check sees the change.
pub struct BlockCache {
    snapshot: CacheSnapshot,
    ttl: Duration,
}

impl BlockCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            snapshot: CacheSnapshot::default(),
            ttl,
        }
    }

    pub fn snapshot(&self) -> &CacheSnapshot {
        &self.snapshot
    }

    pub fn is_fresh(&self, now_ms: i64) -> bool {
        match self.snapshot.last_refreshed_at {
            Some(at) => now_ms - at < self.ttl.as_millis() as i64,
            None => false,
        }
    }

    /// Mark the snapshot stale without dropping it, so the next
    /// `ensure_fresh` reloads while lookups keep the last known rules.
    pub fn invalidate(&mut self) {
        self.snapshot.last_refreshed_at = None;
    }

    /// Reload if stale. Returns whether a reload happened.
    pub async fn ensure_fresh(
        &mut self,
        registry: &BlockRegistry,
        ledger: &UnblockLedger,
    ) -> Result<bool> {
        if self.is_fresh(ledger.now_ms()) {
            return Ok(false);
        }
        self.force_refresh(registry, ledger).await?;
        Ok(true)
    }

    /// Reload both collections. On failure the previous snapshot is kept and
    /// stays stale, so the next `ensure_fresh` retries.
    pub async fn force_refresh(
        &mut self,
        registry: &BlockRegistry,
        ledger: &UnblockLedger,
    ) -> Result<()> {
        let blocked_sites = registry.list().await?;
        let temporary_unblocks = ledger.list_active().await?;

        debug!(
            "Block cache refreshed: {} site(s), {} active unblock(s)",
            blocked_sites.len(),
            temporary_unblocks.len()
        );

        self.snapshot = CacheSnapshot {
            blocked_sites,
            temporary_unblocks,
            last_refreshed_at: Some(ledger.now_ms()),
        };
        Ok(())
    }
}
