use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GOAL_LITERS: f64 = 2.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HydrationState {
    pub current_liters: f64,
    pub goal_liters: f64,
    /// `YYYY-MM-DD`, UTC.
    pub last_reset_date: String,
}

impl HydrationState {
    pub fn fresh(day: NaiveDate) -> Self {
        Self {
            current_liters: 0.0,
            goal_liters: DEFAULT_GOAL_LITERS,
            last_reset_date: day.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn is_from(&self, day: NaiveDate) -> bool {
        self.last_reset_date == day.format("%Y-%m-%d").to_string()
    }
}
