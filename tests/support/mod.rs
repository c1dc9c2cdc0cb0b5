#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use desklamp_lib::{
    background::{spawn_background, BackgroundConfig, BackgroundHandle},
    browser::{BrowserCommand, ChannelBrowser, TabId},
    clock::ManualClock,
    db::Database,
    protocol::{Request, Response},
    settings::HostSettings,
};
use tokio::{sync::mpsc::UnboundedReceiver, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use url::Url;

pub const ORIGIN: &str = "chrome-extension://desklampextid/";
pub const T0: i64 = 1_700_000_000_000;

/// Timers far enough out that only explicit `tick`/`sweep` calls move state.
pub fn quiet_config() -> BackgroundConfig {
    let mut config = BackgroundConfig::from_settings(&HostSettings::default(), ORIGIN);
    config.tick_interval = Duration::from_secs(3600);
    config.cache_refresh_interval = Duration::from_secs(3600);
    config.unblock_sweep_interval = Duration::from_secs(3600);
    config
}

pub struct Harness {
    pub handle: BackgroundHandle,
    pub clock: Arc<ManualClock>,
    pub commands: UnboundedReceiver<BrowserCommand>,
    shutdown: CancellationToken,
    worker: JoinHandle<()>,
}

impl Harness {
    pub fn start() -> Self {
        let db = Database::open_in_memory().unwrap();
        Self::with(db, Arc::new(ManualClock::new(T0)))
    }

    pub fn with(db: Database, clock: Arc<ManualClock>) -> Self {
        let (browser, commands) = ChannelBrowser::new();
        let shutdown = CancellationToken::new();
        let (handle, worker) = spawn_background(
            db,
            clock.clone(),
            Arc::new(browser),
            quiet_config(),
            shutdown.clone(),
        )
        .unwrap();

        Self {
            handle,
            clock,
            commands,
            shutdown,
            worker,
        }
    }

    pub async fn call(&self, request: Request) -> Response {
        self.handle.call(request).await.unwrap()
    }

    pub async fn event(&self, request: Request) {
        assert!(self.handle.request(request).await.unwrap().is_none());
    }

    pub async fn navigate(&self, tab_id: TabId, url: &str) {
        self.event(Request::BeforeNavigate {
            tab_id,
            url: url.to_string(),
            frame_id: 0,
        })
        .await;
    }

    pub fn drain(&mut self) -> Vec<BrowserCommand> {
        let mut commands = Vec::new();
        while let Ok(command) = self.commands.try_recv() {
            commands.push(command);
        }
        commands
    }

    /// Redirects issued since the last drain, as `(tab, block url)`.
    pub fn redirects(&mut self) -> Vec<(Option<TabId>, String)> {
        self.drain()
            .into_iter()
            .filter_map(|command| match command {
                BrowserCommand::UpdateTab { tab_id, url, .. } => Some((tab_id, url)),
                _ => None,
            })
            .collect()
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        self.worker.await.unwrap();
    }
}

pub fn query_param(url: &str, key: &str) -> Option<String> {
    Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
