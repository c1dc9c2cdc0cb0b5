use anyhow::Result;

use crate::db::{keys, Database, FocusSessionState};

impl Database {
    /// Persisted focus state, or the idle default when nothing was ever saved.
    pub async fn load_focus_state(&self) -> Result<FocusSessionState> {
        Ok(self.get_json(keys::FOCUS_MODE).await?.unwrap_or_default())
    }

    pub async fn save_focus_state(&self, state: &FocusSessionState) -> Result<()> {
        self.put_json(keys::FOCUS_MODE, state).await
    }
}
