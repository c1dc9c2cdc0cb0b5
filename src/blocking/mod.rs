//! Block registry, temporary unblock ledger and the read-through cache that
//! mirrors both for navigation checks.

pub mod cache;
pub mod ledger;
pub mod registry;

pub use cache::{BlockCache, CacheSnapshot, CACHE_TTL};
pub use ledger::{UnblockLedger, GRANT_UI_DELAY};
pub use registry::BlockRegistry;
