pub mod background;
pub mod blocking;
pub mod browser;
pub mod clock;
pub mod db;
pub mod domain;
pub mod focus;
pub mod host;
pub mod interceptor;
pub mod native_messaging;
pub mod protocol;
pub mod settings;
pub mod utils;

use std::{env, sync::Arc};

use anyhow::{Context, Result};
use log::info;
use tokio_util::sync::CancellationToken;

use background::{spawn_background, BackgroundConfig};
use browser::ChannelBrowser;
use clock::SystemClock;
use db::Database;
use settings::{HostSettings, DATABASE_FILE, SETTINGS_FILE};

/// Entry point of the native-messaging host. Chrome starts it with the
/// calling extension's origin as the first argument and talks to it over
/// stdin/stdout until the extension disconnects.
pub fn run() -> Result<()> {
    utils::init_logging();

    let extension_origin = env::args()
        .nth(1)
        .context("expected the calling extension's origin as the first argument")?;

    info!("Desklamp host starting up for {extension_origin}");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("desklamp-host")
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(serve_stdio(extension_origin))
}

async fn serve_stdio(extension_origin: String) -> Result<()> {
    let data_dir = settings::data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let settings = HostSettings::load(&data_dir.join(SETTINGS_FILE))?;
    let database = Database::new(data_dir.join(DATABASE_FILE))?;

    let (browser, commands) = ChannelBrowser::new();
    let shutdown = CancellationToken::new();
    let (handle, worker) = spawn_background(
        database,
        Arc::new(SystemClock),
        Arc::new(browser),
        BackgroundConfig::from_settings(&settings, &extension_origin),
        shutdown.clone(),
    )?;

    let result = host::serve(
        handle,
        commands,
        tokio::io::stdin(),
        tokio::io::stdout(),
        shutdown,
    )
    .await;

    if let Err(err) = worker.await {
        log::error!("Background task panicked: {err:?}");
    }
    info!("Desklamp host stopped");
    result
}
