use std::sync::Arc;

use anyhow::Result;
use log::{error, info, warn};
use serde::Serialize;

use crate::{
    browser::{Browser, BrowserCommand},
    clock::SharedClock,
    db::Database,
};

use super::{
    badge::{badge_text, format_clock, BADGE_COLOR},
    notify::completion_notification,
    FocusPhase, FocusSessionState,
};

/// Focus state as reported to the UI.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FocusSnapshot {
    pub state: FocusSessionState,
    pub remaining_time: u64,
    pub formatted_time: String,
}

impl FocusSnapshot {
    fn of(state: FocusSessionState, now_ms: i64) -> Self {
        let remaining_time = state.remaining_seconds(now_ms);
        Self {
            formatted_time: format_clock(remaining_time),
            remaining_time,
            state,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Running { remaining_seconds: u64 },
    Paused,
    /// The session ran out on this tick and the notification went out.
    Completed,
}

/// Drives the persisted focus timer.
///
/// Every operation reads the state from the store, applies one transition and
/// writes it back, so a freshly started process picks up exactly where the
/// previous one stopped. The background actor serializes calls.
#[derive(Clone)]
pub struct FocusController {
    db: Database,
    clock: SharedClock,
    browser: Arc<dyn Browser>,
}

impl FocusController {
    pub fn new(db: Database, clock: SharedClock, browser: Arc<dyn Browser>) -> Self {
        Self { db, clock, browser }
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Current state. A running session whose time is up is completed here,
    /// through the same path as the ticker.
    pub async fn snapshot(&self) -> Result<FocusSnapshot> {
        let state = self.db.load_focus_state().await?;
        let now = self.clock.now_ms();

        if state.is_expired(now) {
            let completed = self.complete(state).await?;
            return Ok(FocusSnapshot::of(completed, now));
        }
        Ok(FocusSnapshot::of(state, now))
    }

    /// Raw persisted state without completing anything.
    pub async fn state(&self) -> Result<FocusSessionState> {
        self.db.load_focus_state().await
    }

    pub async fn start(&self, duration_seconds: u64) -> Result<FocusSnapshot> {
        let mut state = self.db.load_focus_state().await?;
        let now = self.clock.now_ms();
        if state.is_expired(now) {
            state = self.complete(state).await?;
        }

        state.start(duration_seconds, now)?;
        self.persist(&state).await?;
        info!("Focus session started for {duration_seconds}s");
        Ok(FocusSnapshot::of(state, now))
    }

    pub async fn pause(&self) -> Result<FocusSnapshot> {
        let mut state = self.db.load_focus_state().await?;
        let now = self.clock.now_ms();

        state.pause(now)?;
        self.persist(&state).await?;
        info!(
            "Focus session paused with {}s remaining",
            state.original_duration
        );
        Ok(FocusSnapshot::of(state, now))
    }

    pub async fn resume(&self) -> Result<FocusSnapshot> {
        let mut state = self.db.load_focus_state().await?;
        let now = self.clock.now_ms();

        state.resume(now)?;
        self.persist(&state).await?;
        info!(
            "Focus session resumed with {}s remaining",
            state.original_duration
        );
        Ok(FocusSnapshot::of(state, now))
    }

    pub async fn stop(&self) -> Result<FocusSnapshot> {
        let mut state = self.db.load_focus_state().await?;
        let now = self.clock.now_ms();

        if state.stop() {
            self.persist(&state).await?;
            info!("Focus session stopped");
        }
        Ok(FocusSnapshot::of(state, now))
    }

    /// Whole-state write from UIs that compute transitions themselves.
    pub async fn replace(&self, state: FocusSessionState) -> Result<FocusSnapshot> {
        let now = self.clock.now_ms();
        state.validate(now)?;
        self.persist(&state).await?;
        Ok(FocusSnapshot::of(state, now))
    }

    /// Once-a-second check: refresh the badge and complete an expired session.
    pub async fn tick(&self) -> Result<TickOutcome> {
        let state = self.db.load_focus_state().await?;
        let now = self.clock.now_ms();

        match state.phase() {
            FocusPhase::Idle => {
                self.render_badge(&state, now);
                Ok(TickOutcome::Idle)
            }
            FocusPhase::Paused => {
                self.render_badge(&state, now);
                Ok(TickOutcome::Paused)
            }
            FocusPhase::Running if state.is_expired(now) => {
                self.complete(state).await?;
                Ok(TickOutcome::Completed)
            }
            FocusPhase::Running => {
                self.render_badge(&state, now);
                Ok(TickOutcome::Running {
                    remaining_seconds: state.remaining_seconds(now),
                })
            }
        }
    }

    /// Session ran out: persist idle first, then notify. The notification is
    /// only sent once the idle state is stored, so later ticks never see the
    /// same session as running again.
    async fn complete(&self, mut state: FocusSessionState) -> Result<FocusSessionState> {
        state.stop();
        self.persist(&state).await?;
        info!("Focus session completed");

        if let Err(err) = self
            .browser
            .dispatch(BrowserCommand::CreateNotification(completion_notification()))
        {
            error!("Failed to send completion notification: {err:?}");
        }
        Ok(state)
    }

    async fn persist(&self, state: &FocusSessionState) -> Result<()> {
        self.db.save_focus_state(state).await?;
        self.render_badge(state, self.clock.now_ms());
        Ok(())
    }

    pub fn render_badge(&self, state: &FocusSessionState, now_ms: i64) {
        if let Err(err) = self
            .browser
            .set_badge(badge_text(state, now_ms), BADGE_COLOR)
        {
            warn!("Failed to update badge: {err:?}");
        }
    }
}
