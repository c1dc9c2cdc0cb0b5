use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::{
    db::TemporaryUnblock,
    domain,
    focus::TickOutcome,
    protocol::{Request, Response, StateEvent},
};

use super::actor::ActorCommand;

pub const UNBLOCK_POLL_ATTEMPTS: usize = 3;
pub const UNBLOCK_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Cloneable entry point into the background task. Every call fails once the
/// task has stopped.
#[derive(Clone)]
pub struct BackgroundHandle {
    sender: mpsc::Sender<ActorCommand>,
    events: broadcast::Sender<StateEvent>,
}

impl BackgroundHandle {
    pub(super) fn new(
        sender: mpsc::Sender<ActorCommand>,
        events: broadcast::Sender<StateEvent>,
    ) -> Self {
        Self { sender, events }
    }

    async fn send<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> ActorCommand) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(build(reply_tx))
            .await
            .map_err(|_| anyhow!("background task is not running"))?;
        reply_rx
            .await
            .map_err(|_| anyhow!("background task stopped before replying"))
    }

    /// Handle one request. Browser events yield `None`.
    pub async fn request(&self, request: Request) -> Result<Option<Response>> {
        self.send(|reply| ActorCommand::Request { request, reply })
            .await
    }

    /// Like [`request`](Self::request) for requests that always answer.
    pub async fn call(&self, request: Request) -> Result<Response> {
        self.request(request)
            .await?
            .ok_or_else(|| anyhow!("request produced no response"))
    }

    /// Run one focus tick now instead of waiting for the timer.
    pub async fn tick(&self) -> Result<TickOutcome> {
        self.send(|reply| ActorCommand::Tick { reply }).await?
    }

    pub async fn refresh_cache(&self) -> Result<()> {
        self.send(|reply| ActorCommand::RefreshCache { reply }).await?
    }

    /// Drop expired unblocks now. Returns how many were removed.
    pub async fn sweep_expired(&self) -> Result<usize> {
        self.send(|reply| ActorCommand::SweepExpired { reply }).await?
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.events.subscribe()
    }

    /// Poll for an active unblock covering `url`, for callers that raced a
    /// grant still being written. Gives up after a few attempts.
    pub async fn wait_for_unblock(&self, url: &str) -> Result<Option<TemporaryUnblock>> {
        let canonical = domain::canonical(url);
        if canonical.is_empty() {
            bail!("'{url}' is not a valid site");
        }

        for attempt in 1..=UNBLOCK_POLL_ATTEMPTS {
            let unblocks = match self.call(Request::GetTemporaryUnblocks).await? {
                Response::TemporaryUnblocks(unblocks) => unblocks,
                Response::Failure { error, .. } => bail!(error),
                other => bail!("unexpected response to getTemporaryUnblocks: {other:?}"),
            };

            if let Some(unblock) = unblocks
                .into_iter()
                .find(|unblock| domain::matches(&canonical, &unblock.url))
            {
                return Ok(Some(unblock));
            }
            if attempt < UNBLOCK_POLL_ATTEMPTS {
                tokio::time::sleep(UNBLOCK_POLL_INTERVAL).await;
            }
        }
        Ok(None)
    }
}
