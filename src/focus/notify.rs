//! Completion notification, keyboard shortcuts, and the dashboard views they
//! lead to.

use anyhow::{Context, Result};
use url::Url;

use crate::browser::Notification;

pub const COMPLETION_NOTIFICATION_ID: &str = "desklamp-focus-complete";
pub const DASHBOARD_PATH: &str = "src/newtab/index.html";

const TAKE_A_BREAK: u8 = 0;
const START_NEW_SESSION: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardView {
    /// The bare new-tab page.
    Home,
    Focus,
    Break,
}

impl DashboardView {
    fn fragment(self) -> Option<&'static str> {
        match self {
            DashboardView::Home => None,
            DashboardView::Focus => Some("/dashboard/focus"),
            DashboardView::Break => Some("/dashboard/break"),
        }
    }
}

/// `chrome.commands` ids declared in the extension manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    FocusPage,
    BreakPage,
    NewTab,
    Settings,
}

impl Shortcut {
    pub fn from_command(command: &str) -> Option<Self> {
        match command {
            "focus-page" => Some(Shortcut::FocusPage),
            "break-page" => Some(Shortcut::BreakPage),
            "newtab" => Some(Shortcut::NewTab),
            "settings" => Some(Shortcut::Settings),
            _ => None,
        }
    }

    /// Dashboard view the shortcut opens; `None` for the options page.
    pub fn view(self) -> Option<DashboardView> {
        match self {
            Shortcut::FocusPage => Some(DashboardView::Focus),
            Shortcut::BreakPage => Some(DashboardView::Break),
            Shortcut::NewTab => Some(DashboardView::Home),
            Shortcut::Settings => None,
        }
    }
}

pub fn completion_notification() -> Notification {
    Notification {
        notification_id: COMPLETION_NOTIFICATION_ID.to_string(),
        title: "Focus Session Complete! 🎉".to_string(),
        message: "Great work! Time to take a break and recharge.".to_string(),
        buttons: vec!["Take a Break".to_string(), "Start New Session".to_string()],
        priority: 2,
    }
}

/// View to open for a click on the notification body (`None`) or one of its
/// buttons.
pub fn route_click(button_index: Option<u8>) -> Option<DashboardView> {
    match button_index {
        None | Some(TAKE_A_BREAK) => Some(DashboardView::Break),
        Some(START_NEW_SESSION) => Some(DashboardView::Focus),
        Some(_) => None,
    }
}

/// The extension's new-tab dashboard.
#[derive(Debug, Clone)]
pub struct Dashboard {
    base: Url,
}

impl Dashboard {
    pub fn new(extension_origin: &str, path: &str) -> Result<Self> {
        let base = Url::parse(extension_origin)
            .and_then(|origin| origin.join(path))
            .with_context(|| format!("invalid dashboard location {extension_origin}{path}"))?;
        Ok(Self { base })
    }

    /// Prefix shared by every dashboard tab, fragment excluded.
    pub fn prefix(&self) -> &str {
        self.base.as_str()
    }

    pub fn url_for(&self, view: DashboardView) -> String {
        let mut url = self.base.clone();
        url.set_fragment(view.fragment());
        url.to_string()
    }
}
