pub mod blocked_site;
pub mod hydration;
pub mod task;
pub mod temporary_unblock;

pub use blocked_site::BlockedSite;
pub use hydration::HydrationState;
pub use task::Task;
pub use temporary_unblock::TemporaryUnblock;

pub use crate::focus::FocusSessionState;
