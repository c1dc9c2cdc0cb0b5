use std::time::Duration;

use anyhow::{bail, Result};
use log::{debug, info};

use crate::{
    clock::SharedClock,
    db::{Database, TemporaryUnblock},
    domain,
};

/// Time the block screen spends animating (spinner, then countdown) between
/// the user's approval and the actual navigation. Grants requested in minutes
/// are padded by this much so the full window is usable.
pub const GRANT_UI_DELAY: Duration = Duration::from_secs(4);

/// Time-bounded exceptions to blocking, at most one per canonical domain.
///
/// Expired entries are dropped on every read and by the periodic sweep, so
/// every consumer sees the same set without doing its own expiry math.
#[derive(Clone)]
pub struct UnblockLedger {
    db: Database,
    clock: SharedClock,
}

impl UnblockLedger {
    pub fn new(db: Database, clock: SharedClock) -> Self {
        Self { db, clock }
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Grant access to `url` for `duration_ms` starting now, replacing any
    /// earlier grant for the same domain.
    pub async fn grant(&self, url: &str, duration_ms: i64) -> Result<TemporaryUnblock> {
        if duration_ms <= 0 {
            bail!("unblock duration must be positive");
        }
        let canonical = domain::canonical(url);
        if canonical.is_empty() {
            bail!("'{url}' is not a valid site");
        }

        let Some(expires_at) = self.clock.now_ms().checked_add(duration_ms) else {
            bail!("unblock duration of {duration_ms}ms is out of range");
        };

        let mut unblocks = self.db.load_temporary_unblocks().await?;
        unblocks.retain(|unblock| domain::canonical(&unblock.url) != canonical);

        let grant = TemporaryUnblock {
            url: canonical,
            expires_at,
            original_duration_ms: duration_ms,
        };
        unblocks.push(grant.clone());
        self.db.save_temporary_unblocks(&unblocks).await?;

        info!(
            "Temporarily unblocked {} for {}s",
            grant.url,
            duration_ms / 1000
        );
        Ok(grant)
    }

    /// Grant in whole minutes, padded by `ui_delay`.
    pub async fn grant_minutes(
        &self,
        url: &str,
        minutes: u32,
        ui_delay: Duration,
    ) -> Result<TemporaryUnblock> {
        if minutes == 0 {
            bail!("unblock duration must be at least one minute");
        }
        let duration_ms = i64::from(minutes) * 60_000 + ui_delay.as_millis() as i64;
        self.grant(url, duration_ms).await
    }

    /// Remove the grant for `url`. Returns whether one existed.
    pub async fn revoke(&self, url: &str) -> Result<bool> {
        let canonical = domain::canonical(url);
        let mut unblocks = self.db.load_temporary_unblocks().await?;
        let original_len = unblocks.len();
        unblocks.retain(|unblock| {
            unblock.url != url && domain::canonical(&unblock.url) != canonical
        });

        if unblocks.len() == original_len {
            return Ok(false);
        }

        self.db.save_temporary_unblocks(&unblocks).await?;
        info!("Revoked temporary unblock for {canonical}");
        Ok(true)
    }

    /// Grants that are still running. Stale entries found on the way are
    /// written back out of the store.
    pub async fn list_active(&self) -> Result<Vec<TemporaryUnblock>> {
        let (active, _) = self.prune().await?;
        Ok(active)
    }

    /// Periodic cleanup. Returns how many expired grants were dropped.
    pub async fn sweep_expired(&self) -> Result<usize> {
        let (_, removed) = self.prune().await?;
        if removed > 0 {
            debug!("Swept {removed} expired temporary unblock(s)");
        }
        Ok(removed)
    }

    async fn prune(&self) -> Result<(Vec<TemporaryUnblock>, usize)> {
        let unblocks = self.db.load_temporary_unblocks().await?;
        let now = self.clock.now_ms();
        let total = unblocks.len();

        let active: Vec<TemporaryUnblock> = unblocks
            .into_iter()
            .filter(|unblock| unblock.is_active(now))
            .collect();

        let removed = total - active.len();
        if removed > 0 {
            self.db.save_temporary_unblocks(&active).await?;
        }
        Ok((active, removed))
    }
}
