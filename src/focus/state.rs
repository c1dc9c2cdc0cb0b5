use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FOCUS_SECONDS: u64 = 25 * 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FocusPhase {
    Idle,
    Running,
    Paused,
}

/// Persisted focus timer.
///
/// Nothing here counts down. Remaining time is re-derived from
/// `session_start_time` and `original_duration` on every read, so a state
/// loaded after a process restart reports the same remaining time as the
/// process that wrote it would have.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FocusSessionState {
    #[serde(default = "default_configured_duration")]
    pub configured_duration_seconds: u64,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_paused: bool,
    /// Epoch milliseconds of the current run segment's start.
    #[serde(default)]
    pub session_start_time: Option<i64>,
    /// Seconds remaining as of the last start/pause/resume boundary.
    #[serde(default)]
    pub original_duration: u64,
}

fn default_configured_duration() -> u64 {
    DEFAULT_FOCUS_SECONDS
}

impl Default for FocusSessionState {
    fn default() -> Self {
        Self {
            configured_duration_seconds: DEFAULT_FOCUS_SECONDS,
            is_active: false,
            is_paused: false,
            session_start_time: None,
            original_duration: 0,
        }
    }
}

impl FocusSessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> FocusPhase {
        match (self.is_active, self.is_paused) {
            (false, _) => FocusPhase::Idle,
            (true, true) => FocusPhase::Paused,
            (true, false) => FocusPhase::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase() == FocusPhase::Running
    }

    /// Whole seconds since the current run segment started.
    pub fn elapsed_seconds(&self, now_ms: i64) -> u64 {
        self.session_start_time
            .map(|start| (now_ms.saturating_sub(start).max(0) / 1000) as u64)
            .unwrap_or(0)
    }

    pub fn remaining_seconds(&self, now_ms: i64) -> u64 {
        match self.phase() {
            FocusPhase::Idle => 0,
            FocusPhase::Paused => self.original_duration,
            FocusPhase::Running => self
                .original_duration
                .saturating_sub(self.elapsed_seconds(now_ms)),
        }
    }

    /// Running with nothing left on the clock.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.is_running() && self.remaining_seconds(now_ms) == 0
    }

    pub fn start(&mut self, duration_seconds: u64, now_ms: i64) -> Result<()> {
        if self.phase() != FocusPhase::Idle {
            bail!("focus session already active");
        }
        if duration_seconds == 0 {
            bail!("focus duration must be greater than zero");
        }

        *self = Self {
            configured_duration_seconds: duration_seconds,
            is_active: true,
            is_paused: false,
            session_start_time: Some(now_ms),
            original_duration: duration_seconds,
        };
        Ok(())
    }

    pub fn pause(&mut self, now_ms: i64) -> Result<()> {
        if self.phase() != FocusPhase::Running {
            bail!("focus session is not running");
        }

        self.original_duration = self.remaining_seconds(now_ms);
        self.is_paused = true;
        Ok(())
    }

    pub fn resume(&mut self, now_ms: i64) -> Result<()> {
        if self.phase() != FocusPhase::Paused {
            bail!("focus session is not paused");
        }

        self.session_start_time = Some(now_ms);
        self.is_paused = false;
        Ok(())
    }

    /// Return to idle. Returns whether a session was active.
    pub fn stop(&mut self) -> bool {
        let was_active = self.is_active;
        self.is_active = false;
        self.is_paused = false;
        self.session_start_time = None;
        self.original_duration = 0;
        was_active
    }

    /// Sanity checks for whole-state writes coming from the UI.
    pub fn validate(&self, now_ms: i64) -> Result<()> {
        if self.is_running() && self.session_start_time.is_none() {
            bail!("running focus state requires a session start time");
        }
        if !self.is_active && self.is_paused {
            bail!("an idle focus state cannot be paused");
        }
        if let Some(start) = self.session_start_time {
            if !(0..=now_ms).contains(&start) {
                bail!("session start time {start} is outside 0..={now_ms}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn starts_idle() {
        let state = FocusSessionState::new();
        assert_eq!(state.phase(), FocusPhase::Idle);
        assert_eq!(state.remaining_seconds(T0), 0);
    }

    #[test]
    fn running_remaining_is_derived_from_start_time() {
        let mut state = FocusSessionState::new();
        state.start(1500, T0).unwrap();

        assert_eq!(state.remaining_seconds(T0), 1500);
        assert_eq!(state.remaining_seconds(T0 + 999), 1500);
        assert_eq!(state.remaining_seconds(T0 + 1_000), 1499);
        assert_eq!(state.remaining_seconds(T0 + 1_600_000), 0);
        assert!(state.is_expired(T0 + 1_500_000));
    }

    #[test]
    fn pause_then_resume_keeps_remaining() {
        let mut state = FocusSessionState::new();
        state.start(1500, T0).unwrap();
        state.pause(T0 + 300_000).unwrap();

        assert_eq!(state.phase(), FocusPhase::Paused);
        assert_eq!(state.original_duration, 1200);
        assert_eq!(state.session_start_time, Some(T0));
        // Time spent paused does not count.
        assert_eq!(state.remaining_seconds(T0 + 900_000), 1200);

        state.resume(T0 + 900_000).unwrap();
        assert_eq!(state.remaining_seconds(T0 + 900_000), 1200);
        assert_eq!(state.remaining_seconds(T0 + 960_000), 1140);
    }

    #[test]
    fn immediate_pause_then_resume_after_delay() {
        let mut state = FocusSessionState::new();
        state.start(1500, T0).unwrap();
        state.pause(T0).unwrap();
        state.resume(T0 + 400_000).unwrap();

        assert_eq!(state.remaining_seconds(T0 + 400_000), 1500);
        assert_eq!(state.remaining_seconds(T0 + 500_000), 1400);
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut state = FocusSessionState::new();
        assert!(state.pause(T0).is_err());
        assert!(state.resume(T0).is_err());
        assert!(state.start(0, T0).is_err());

        state.start(60, T0).unwrap();
        assert!(state.start(60, T0).is_err());
        assert!(state.resume(T0).is_err());

        state.pause(T0).unwrap();
        assert!(state.pause(T0).is_err());
        assert!(state.start(60, T0).is_err());
    }

    #[test]
    fn stop_resets_to_idle_shape() {
        let mut state = FocusSessionState::new();
        state.start(600, T0).unwrap();
        state.pause(T0 + 1_000).unwrap();

        assert!(state.stop());
        assert!(!state.is_active);
        assert!(!state.is_paused);
        assert_eq!(state.session_start_time, None);
        assert_eq!(state.original_duration, 0);
        assert!(!state.stop());
    }

    #[test]
    fn deserializes_legacy_shape() {
        let json = r#"{"time":25,"isActive":true,"sessionStartTime":1700000000000,"isPaused":false,"originalDuration":1500}"#;
        let state: FocusSessionState = serde_json::from_str(json).unwrap();

        assert_eq!(state.phase(), FocusPhase::Running);
        assert_eq!(state.configured_duration_seconds, DEFAULT_FOCUS_SECONDS);
        assert_eq!(state.remaining_seconds(T0 + 60_000), 1440);
    }

    #[test]
    fn validate_rejects_inconsistent_states() {
        let running_without_start = FocusSessionState {
            is_active: true,
            original_duration: 60,
            ..FocusSessionState::default()
        };
        assert!(running_without_start.validate(T0).is_err());

        let paused_idle = FocusSessionState {
            is_paused: true,
            ..FocusSessionState::default()
        };
        assert!(paused_idle.validate(T0).is_err());

        assert!(FocusSessionState::default().validate(T0).is_ok());
    }

    #[test]
    fn validate_bounds_the_start_time() {
        let running_from = |start| FocusSessionState {
            is_active: true,
            session_start_time: Some(start),
            original_duration: 60,
            ..FocusSessionState::default()
        };

        assert!(running_from(T0).validate(T0).is_ok());
        assert!(running_from(T0 + 1).validate(T0).is_err());
        assert!(running_from(-1).validate(T0).is_err());
        assert!(running_from(i64::MIN).validate(T0).is_err());
    }

    #[test]
    fn extreme_start_times_do_not_overflow() {
        let state = FocusSessionState {
            is_active: true,
            session_start_time: Some(i64::MIN),
            original_duration: 60,
            ..FocusSessionState::default()
        };
        assert_eq!(state.remaining_seconds(T0), 0);

        let future = FocusSessionState {
            session_start_time: Some(i64::MAX),
            ..state
        };
        assert_eq!(future.remaining_seconds(i64::MIN), 60);
    }
}
