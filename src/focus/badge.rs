//! Toolbar badge text and the `MM:SS` clock shown by the UI.

use super::state::{FocusPhase, FocusSessionState};

pub const BADGE_COLOR: &str = "#364153";
pub const PAUSED_GLYPH: &str = "▶︎";

/// `"42s"` under a minute, `"05m"` otherwise.
pub fn format_badge_seconds(remaining_seconds: u64) -> String {
    if remaining_seconds < 60 {
        format!("{remaining_seconds}s")
    } else {
        format!("{:02}m", remaining_seconds / 60)
    }
}

/// Badge text for the current state; empty clears the badge.
pub fn badge_text(state: &FocusSessionState, now_ms: i64) -> String {
    match state.phase() {
        FocusPhase::Idle => String::new(),
        FocusPhase::Paused => PAUSED_GLYPH.to_string(),
        FocusPhase::Running => match state.remaining_seconds(now_ms) {
            0 => String::new(),
            remaining => format_badge_seconds(remaining),
        },
    }
}

pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn seconds_and_minutes() {
        assert_eq!(format_badge_seconds(1), "1s");
        assert_eq!(format_badge_seconds(59), "59s");
        assert_eq!(format_badge_seconds(60), "01m");
        assert_eq!(format_badge_seconds(25 * 60), "25m");
        assert_eq!(format_badge_seconds(125 * 60), "125m");
    }

    #[test]
    fn badge_follows_phase() {
        let mut state = FocusSessionState::new();
        assert_eq!(badge_text(&state, T0), "");

        state.start(300, T0).unwrap();
        assert_eq!(badge_text(&state, T0), "05m");
        assert_eq!(badge_text(&state, T0 + 250_000), "50s");

        state.pause(T0 + 250_000).unwrap();
        assert_eq!(badge_text(&state, T0 + 250_000), PAUSED_GLYPH);

        state.stop();
        assert_eq!(badge_text(&state, T0), "");
    }

    #[test]
    fn expired_running_session_clears_badge() {
        let mut state = FocusSessionState::new();
        state.start(10, T0).unwrap();
        assert_eq!(badge_text(&state, T0 + 10_000), "");
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(61), "01:01");
        assert_eq!(format_clock(1500), "25:00");
    }
}
