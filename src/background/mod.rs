//! The background process: a single task that owns the block cache, the tab
//! tracker and every write to the store.
//!
//! Requests come in through [`BackgroundHandle`] and are handled one at a
//! time, so read-modify-write cycles on the registry and ledger never
//! interleave. The same task runs the tick, cache-refresh and sweep timers.

mod actor;
mod handle;

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    blocking::{BlockCache, BlockRegistry, UnblockLedger},
    browser::Browser,
    clock::SharedClock,
    db::Database,
    focus::{Dashboard, FocusController},
    interceptor::{BlockPage, TabTracker},
    settings::HostSettings,
};

use actor::BackgroundActor;

pub use handle::{BackgroundHandle, UNBLOCK_POLL_ATTEMPTS, UNBLOCK_POLL_INTERVAL};

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 64;

/// Everything the background task needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct BackgroundConfig {
    /// `chrome-extension://<id>/`, passed to the host on launch.
    pub extension_origin: String,
    pub block_page_path: String,
    pub dashboard_path: String,
    pub cache_ttl: Duration,
    pub tick_interval: Duration,
    pub cache_refresh_interval: Duration,
    pub unblock_sweep_interval: Duration,
    pub grant_padding: Duration,
}

impl BackgroundConfig {
    pub fn from_settings(settings: &HostSettings, extension_origin: &str) -> Self {
        Self {
            extension_origin: extension_origin.to_string(),
            block_page_path: settings.block_page_path.clone(),
            dashboard_path: settings.dashboard_path.clone(),
            cache_ttl: settings.cache_ttl(),
            tick_interval: settings.tick_interval(),
            cache_refresh_interval: settings.cache_refresh_interval(),
            unblock_sweep_interval: settings.unblock_sweep_interval(),
            grant_padding: settings.grant_padding(),
        }
    }
}

/// Start the background task. It runs until `shutdown` is cancelled or every
/// handle has been dropped.
pub fn spawn_background(
    db: Database,
    clock: SharedClock,
    browser: Arc<dyn Browser>,
    config: BackgroundConfig,
    shutdown: CancellationToken,
) -> Result<(BackgroundHandle, JoinHandle<()>)> {
    let block_page = BlockPage::new(&config.extension_origin, &config.block_page_path)?;
    let dashboard = Dashboard::new(&config.extension_origin, &config.dashboard_path)?;

    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (events_tx, _) = broadcast::channel(EVENT_BUFFER);

    let actor = BackgroundActor {
        registry: BlockRegistry::new(db.clone()),
        ledger: UnblockLedger::new(db.clone(), clock.clone()),
        cache: BlockCache::new(config.cache_ttl),
        focus: FocusController::new(db.clone(), clock.clone(), browser.clone()),
        tabs: TabTracker::new(),
        db,
        clock,
        browser,
        block_page,
        dashboard,
        events: events_tx.clone(),
        grant_padding: config.grant_padding,
    };

    let worker = tokio::spawn(actor.run(command_rx, config, shutdown));
    Ok((BackgroundHandle::new(command_tx, events_tx), worker))
}
