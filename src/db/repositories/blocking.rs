use anyhow::Result;

use crate::db::{keys, models::TemporaryUnblock, BlockedSite, Database};

impl Database {
    /// Raw block list in insertion order.
    pub async fn load_blocked_sites(&self) -> Result<Vec<BlockedSite>> {
        Ok(self.get_json(keys::BLOCKED_SITES).await?.unwrap_or_default())
    }

    pub async fn save_blocked_sites(&self, sites: &[BlockedSite]) -> Result<()> {
        self.put_json(keys::BLOCKED_SITES, sites).await
    }

    /// Raw unblock ledger, including entries that may already have expired.
    pub async fn load_temporary_unblocks(&self) -> Result<Vec<TemporaryUnblock>> {
        Ok(self.get_json(keys::TEMP_UNBLOCKS).await?.unwrap_or_default())
    }

    pub async fn save_temporary_unblocks(&self, unblocks: &[TemporaryUnblock]) -> Result<()> {
        self.put_json(keys::TEMP_UNBLOCKS, unblocks).await
    }
}
