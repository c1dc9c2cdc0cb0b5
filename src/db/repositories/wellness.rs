use std::collections::HashSet;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use log::info;

use crate::db::{keys, Database, HydrationState, Task};

impl Database {
    /// Today's hydration log. A state left over from an earlier day is reset
    /// and the reset is persisted before returning.
    pub async fn load_or_reset_hydration(&self, today: NaiveDate) -> Result<HydrationState> {
        let stored: Option<HydrationState> = self.get_json(keys::HYDRATION).await?;

        match stored {
            Some(state) if state.is_from(today) => Ok(state),
            _ => {
                let fresh = HydrationState::fresh(today);
                info!("Resetting hydration log for {}", fresh.last_reset_date);
                self.put_json(keys::HYDRATION, &fresh).await?;
                Ok(fresh)
            }
        }
    }

    pub async fn save_hydration(&self, state: &HydrationState) -> Result<()> {
        if state.current_liters < 0.0 || state.goal_liters <= 0.0 {
            bail!("hydration amounts must be positive");
        }
        self.put_json(keys::HYDRATION, state).await
    }

    pub async fn load_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.get_json(keys::TASKS).await?.unwrap_or_default())
    }

    /// Replace the task list. Ids must be unique within the list.
    pub async fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        let mut seen = HashSet::new();
        for task in tasks {
            if !seen.insert(task.id.as_str()) {
                bail!("duplicate task id '{}'", task.id);
            }
        }
        self.put_json(keys::TASKS, tasks).await
    }
}
