use std::{sync::Arc, time::Duration};

use anyhow::Result;
use log::{debug, info, warn};
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    time::{self, Instant, Interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    blocking::{BlockCache, BlockRegistry, UnblockLedger},
    browser::{Browser, BrowserCommand, TabId},
    clock::SharedClock,
    db::Database,
    domain,
    focus::{
        notify::{route_click, COMPLETION_NOTIFICATION_ID},
        Dashboard, DashboardView, FocusController, FocusSessionState, FocusSnapshot, Shortcut,
        TickOutcome,
    },
    interceptor::{self, BlockPage, TabTracker, Verdict},
    log_error, log_info, log_warn,
    protocol::{self, Request, Response, StateEvent},
};

use super::BackgroundConfig;

const ENABLE_LOGS: bool = true;

pub(super) enum ActorCommand {
    Request {
        request: Request,
        reply: oneshot::Sender<Option<Response>>,
    },
    Tick {
        reply: oneshot::Sender<Result<TickOutcome>>,
    },
    RefreshCache {
        reply: oneshot::Sender<Result<()>>,
    },
    SweepExpired {
        reply: oneshot::Sender<Result<usize>>,
    },
}

pub(super) struct BackgroundActor {
    pub(super) registry: BlockRegistry,
    pub(super) ledger: UnblockLedger,
    pub(super) cache: BlockCache,
    pub(super) focus: FocusController,
    pub(super) tabs: TabTracker,
    pub(super) db: Database,
    pub(super) clock: SharedClock,
    pub(super) browser: Arc<dyn Browser>,
    pub(super) block_page: BlockPage,
    pub(super) dashboard: Dashboard,
    pub(super) events: broadcast::Sender<StateEvent>,
    pub(super) grant_padding: Duration,
}

fn delayed_interval(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

impl BackgroundActor {
    pub(super) async fn run(
        mut self,
        mut commands: mpsc::Receiver<ActorCommand>,
        config: BackgroundConfig,
        shutdown: CancellationToken,
    ) {
        self.recover().await;

        let mut tick = delayed_interval(config.tick_interval);
        let mut refresh = delayed_interval(config.cache_refresh_interval);
        let mut sweep = delayed_interval(config.unblock_sweep_interval);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        info!("All background handles dropped");
                        break;
                    }
                },
                _ = tick.tick() => {
                    if let Err(err) = self.on_tick().await {
                        log_error!("focus tick failed: {err:?}");
                    }
                }
                _ = refresh.tick() => {
                    if let Err(err) = self.cache.force_refresh(&self.registry, &self.ledger).await {
                        log_error!("periodic cache refresh failed: {err:?}");
                    }
                }
                _ = sweep.tick() => {
                    if let Err(err) = self.sweep_expired().await {
                        log_error!("unblock sweep failed: {err:?}");
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Background task shutting down");
                    break;
                }
            }
        }
    }

    /// Pick up whatever the previous process left behind.
    async fn recover(&mut self) {
        if let Err(err) = self.cache.force_refresh(&self.registry, &self.ledger).await {
            log_error!("initial cache load failed: {err:?}");
        }

        match self.focus.state().await {
            Ok(state) => {
                let now = self.clock.now_ms();
                self.focus.render_badge(&state, now);
                if state.is_active {
                    info!(
                        "Recovered {:?} focus session with {}s remaining",
                        state.phase(),
                        state.remaining_seconds(now)
                    );
                }
            }
            Err(err) => log_error!("failed to load focus state: {err:?}"),
        }
    }

    async fn handle_command(&mut self, command: ActorCommand) {
        match command {
            ActorCommand::Request { request, reply } => {
                let response = self.handle_request(request).await;
                let _ = reply.send(response);
            }
            ActorCommand::Tick { reply } => {
                let _ = reply.send(self.on_tick().await);
            }
            ActorCommand::RefreshCache { reply } => {
                let result = self.cache.force_refresh(&self.registry, &self.ledger).await;
                let _ = reply.send(result);
            }
            ActorCommand::SweepExpired { reply } => {
                let _ = reply.send(self.sweep_expired().await);
            }
        }
    }

    async fn handle_request(&mut self, request: Request) -> Option<Response> {
        let is_event = request.is_event();
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(err) if is_event => {
                log_warn!("browser event handling failed: {err:?}");
                None
            }
            Err(err) => {
                warn!("Request failed: {err:#}");
                Some(Response::failure(&err))
            }
        }
    }

    async fn dispatch(&mut self, request: Request) -> Result<Option<Response>> {
        let response = match request {
            Request::GetBlockedSites => Response::BlockedSites(self.registry.list().await?),
            Request::AddBlockedSite { url, name, favicon } => {
                let site = self.registry.add(&url, &name, favicon).await?;
                self.refresh_after_write().await;
                self.publish_blocked_sites().await;
                self.rescan_tabs().await;
                Response::SiteAdded {
                    success: true,
                    site,
                }
            }
            Request::RemoveBlockedSite { site_id } => {
                if !self.registry.remove(&site_id).await? {
                    debug!("No blocked site with id {site_id}");
                }
                self.refresh_after_write().await;
                self.publish_blocked_sites().await;
                Response::ok()
            }
            Request::TemporaryUnblock { url, duration } => {
                self.ledger.grant(&url, duration).await?;
                self.refresh_after_write().await;
                self.publish_unblocks().await;
                Response::ok()
            }
            Request::GrantTemporaryAccess { url, minutes } => {
                self.ledger
                    .grant_minutes(&url, minutes, self.grant_padding)
                    .await?;
                self.refresh_after_write().await;
                self.publish_unblocks().await;
                Response::ok()
            }
            Request::GetTemporaryUnblocks => {
                Response::TemporaryUnblocks(self.ledger.list_active().await?)
            }
            Request::RemoveTemporaryUnblock {
                url,
                redirect_to_block,
                tab_id,
            } => {
                self.ledger.revoke(&url).await?;
                self.refresh_after_write().await;
                self.publish_unblocks().await;
                if redirect_to_block {
                    self.reblock(&url, tab_id).await?;
                }
                Response::ok()
            }
            Request::GetFocusModeState => {
                let was_active = self.focus.state().await?.is_active;
                let snapshot = self.focus.snapshot().await?;
                if was_active && !snapshot.state.is_active {
                    self.publish_focus(&snapshot);
                }
                Response::focus(snapshot)
            }
            Request::UpdateFocusModeState { state } => {
                let was_running = self.focus.state().await?.is_running();
                let snapshot = self.focus.replace(state).await?;
                self.after_focus_change(&snapshot, was_running).await;
                Response::ok()
            }
            Request::StartFocusSession { duration_seconds } => {
                let duration = match duration_seconds {
                    Some(seconds) => seconds,
                    None => self.focus.state().await?.configured_duration_seconds,
                };
                let snapshot = self.focus.start(duration).await?;
                self.after_focus_change(&snapshot, false).await;
                Response::focus(snapshot)
            }
            Request::PauseFocusSession => {
                let snapshot = self.focus.pause().await?;
                self.after_focus_change(&snapshot, true).await;
                Response::focus(snapshot)
            }
            Request::ResumeFocusSession => {
                let snapshot = self.focus.resume().await?;
                self.after_focus_change(&snapshot, false).await;
                Response::focus(snapshot)
            }
            Request::StopFocusSession => {
                let snapshot = self.focus.stop().await?;
                self.after_focus_change(&snapshot, true).await;
                Response::focus(snapshot)
            }
            Request::RedirectToBlockScreen { url, name, tab_id } => {
                let name = name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| domain::site_name(&url));
                self.browser
                    .redirect_tab(tab_id, self.block_page.url_for(&url, &name))?;
                Response::ok()
            }
            Request::GetHydrationState => {
                Response::Hydration(self.db.load_or_reset_hydration(self.clock.today()).await?)
            }
            Request::UpdateHydrationState { state } => {
                self.db.save_hydration(&state).await?;
                self.publish(StateEvent::HydrationChanged { state });
                Response::ok()
            }
            Request::GetTasks => Response::Tasks(self.db.load_tasks().await?),
            Request::SaveTasks { tasks } => {
                self.db.save_tasks(&tasks).await?;
                self.publish(StateEvent::TasksChanged { tasks });
                Response::ok()
            }
            Request::TabCreated { tab_id, url } => {
                if let Some(url) = url {
                    self.tabs.record(tab_id, &url);
                    self.check_tab(tab_id, &url).await?;
                }
                return Ok(None);
            }
            Request::TabUpdated {
                tab_id,
                url,
                status,
            } => {
                if let Some(url) = &url {
                    self.tabs.record(tab_id, url);
                }
                if protocol::is_load_complete(status.as_deref()) {
                    let current = url.or_else(|| self.tabs.url(tab_id).map(str::to_string));
                    if let Some(url) = current {
                        self.check_tab(tab_id, &url).await?;
                    }
                }
                return Ok(None);
            }
            Request::TabRemoved { tab_id } => {
                self.tabs.forget(tab_id);
                return Ok(None);
            }
            Request::BeforeNavigate {
                tab_id,
                url,
                frame_id,
            } => {
                if protocol::is_main_frame(frame_id) {
                    self.tabs.record(tab_id, &url);
                    self.check_tab(tab_id, &url).await?;
                }
                return Ok(None);
            }
            Request::NotificationClicked { notification_id } => {
                self.on_notification_click(&notification_id, None)?;
                return Ok(None);
            }
            Request::NotificationButtonClicked {
                notification_id,
                button_index,
            } => {
                self.on_notification_click(&notification_id, Some(button_index))?;
                return Ok(None);
            }
            Request::CommandInvoked { command } => {
                self.on_shortcut(&command)?;
                return Ok(None);
            }
        };
        Ok(Some(response))
    }

    /// The write has already landed by the time this runs. A failed reload
    /// leaves the cache marked stale for the next `ensure_fresh`.
    async fn refresh_after_write(&mut self) {
        if let Err(err) = self.cache.force_refresh(&self.registry, &self.ledger).await {
            log_error!("cache reload after write failed: {err:?}");
            self.cache.invalidate();
        }
    }

    async fn on_tick(&mut self) -> Result<TickOutcome> {
        let outcome = self.focus.tick().await?;
        if outcome == TickOutcome::Completed {
            self.publish(StateEvent::FocusModeChanged {
                state: self.focus.state().await?,
            });
        }
        Ok(outcome)
    }

    async fn sweep_expired(&mut self) -> Result<usize> {
        let removed = self.ledger.sweep_expired().await?;
        if removed > 0 {
            self.refresh_after_write().await;
            self.publish_unblocks().await;
        }
        Ok(removed)
    }

    async fn after_focus_change(&mut self, snapshot: &FocusSnapshot, was_running: bool) {
        self.publish_focus(snapshot);
        if !was_running && snapshot.state.is_running() {
            self.rescan_tabs().await;
        }
    }

    /// Block or allow one main-frame page load.
    async fn check_tab(&mut self, tab_id: TabId, url: &str) -> Result<Verdict> {
        let focus = self.focus.state().await?;
        let now = self.clock.now_ms();
        if !focus.is_running() || focus.is_expired(now) {
            return Ok(Verdict::Allow(interceptor::AllowReason::FocusInactive));
        }

        if let Err(err) = self.cache.ensure_fresh(&self.registry, &self.ledger).await {
            log_warn!("block cache reload failed, using previous snapshot: {err:?}");
        }

        let verdict = interceptor::evaluate(url, &focus, self.cache.snapshot(), now, &self.block_page);
        if let Verdict::Redirect { block_url, rule } = &verdict {
            log_info!("Blocking tab {tab_id}: {} matches {}", domain::normalize(url), rule.url);
            self.browser.redirect_tab(Some(tab_id), block_url.clone())?;
            self.tabs.record(tab_id, block_url);
        }
        Ok(verdict)
    }

    /// Re-check every tracked tab, for pages opened before blocking applied.
    async fn rescan_tabs(&mut self) {
        let tabs: Vec<(TabId, String)> = self
            .tabs
            .iter()
            .map(|(id, url)| (id, url.to_string()))
            .collect();

        for (tab_id, url) in tabs {
            if let Err(err) = self.check_tab(tab_id, &url).await {
                log_warn!("re-scan of tab {tab_id} failed: {err:?}");
            }
        }
    }

    /// Send a tab back to the block screen after its unblock was revoked.
    async fn reblock(&mut self, url: &str, tab_id: Option<TabId>) -> Result<()> {
        let focus: FocusSessionState = self.focus.state().await?;
        let page_url = if interceptor::is_interceptable(url) {
            url.to_string()
        } else {
            format!("https://{url}")
        };

        let verdict = interceptor::evaluate(
            &page_url,
            &focus,
            self.cache.snapshot(),
            self.clock.now_ms(),
            &self.block_page,
        );
        if let Verdict::Redirect { block_url, .. } = verdict {
            self.browser.redirect_tab(tab_id, block_url)?;
        }
        Ok(())
    }

    fn on_notification_click(&mut self, notification_id: &str, button: Option<u8>) -> Result<()> {
        if notification_id != COMPLETION_NOTIFICATION_ID {
            debug!("Ignoring click on notification {notification_id}");
            return Ok(());
        }

        if let Some(view) = route_click(button) {
            self.open_dashboard(view)?;
        }
        self.browser.dispatch(BrowserCommand::ClearNotification {
            notification_id: notification_id.to_string(),
        })
    }

    fn on_shortcut(&mut self, command: &str) -> Result<()> {
        let Some(shortcut) = Shortcut::from_command(command) else {
            log_warn!("Ignoring unknown shortcut command {command}");
            return Ok(());
        };

        match shortcut.view() {
            Some(view) => self.open_dashboard(view),
            None => self.browser.dispatch(BrowserCommand::OpenOptionsPage),
        }
    }

    /// Focus an open dashboard tab on `view`, or open a new one. The home
    /// view leaves an open dashboard where it is.
    fn open_dashboard(&mut self, view: DashboardView) -> Result<()> {
        let url = self.dashboard.url_for(view);
        let command = match self.tabs.find_with_prefix(self.dashboard.prefix()) {
            Some(tab_id) if view == DashboardView::Home => BrowserCommand::ActivateTab { tab_id },
            Some(tab_id) => {
                self.tabs.record(tab_id, &url);
                BrowserCommand::UpdateTab {
                    tab_id: Some(tab_id),
                    url,
                    active: true,
                }
            }
            None => BrowserCommand::CreateTab { url, active: true },
        };
        self.browser.dispatch(command)
    }

    fn publish(&self, event: StateEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn publish_focus(&self, snapshot: &FocusSnapshot) {
        self.publish(StateEvent::FocusModeChanged {
            state: snapshot.state.clone(),
        });
    }

    // Read from storage rather than the cache, which may have failed to reload.
    async fn publish_blocked_sites(&self) {
        match self.registry.list().await {
            Ok(sites) => self.publish(StateEvent::BlockedSitesChanged { sites }),
            Err(err) => log_warn!("could not publish blocked sites: {err:?}"),
        }
    }

    async fn publish_unblocks(&self) {
        match self.ledger.list_active().await {
            Ok(unblocks) => self.publish(StateEvent::TemporaryUnblocksChanged { unblocks }),
            Err(err) => log_warn!("could not publish temporary unblocks: {err:?}"),
        }
    }
}
