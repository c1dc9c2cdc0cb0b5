//! Focus session timer: persisted state, badge rendering and completion.

pub mod badge;
pub mod controller;
pub mod notify;
pub mod state;

pub use badge::{BADGE_COLOR, PAUSED_GLYPH};
pub use controller::{FocusController, FocusSnapshot, TickOutcome};
pub use notify::{Dashboard, DashboardView, Shortcut};
pub use state::{FocusPhase, FocusSessionState, DEFAULT_FOCUS_SECONDS};
