//! Side effects the host asks the extension to perform.
//!
//! The host never touches tabs, the badge or notifications itself. It emits
//! [`BrowserCommand`]s through a [`Browser`] and the extension shell carries
//! them out.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub type TabId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub notification_id: String,
    pub title: String,
    pub message: String,
    pub buttons: Vec<String>,
    pub priority: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(
    tag = "command",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum BrowserCommand {
    /// Navigate a tab. `None` targets the active tab.
    UpdateTab {
        tab_id: Option<TabId>,
        url: String,
        active: bool,
    },
    CreateTab {
        url: String,
        active: bool,
    },
    /// Bring a tab to the front without navigating it.
    ActivateTab {
        tab_id: TabId,
    },
    OpenOptionsPage,
    SetBadge {
        text: String,
        color: String,
    },
    CreateNotification(Notification),
    ClearNotification {
        notification_id: String,
    },
}

pub trait Browser: Send + Sync {
    fn dispatch(&self, command: BrowserCommand) -> Result<()>;

    fn redirect_tab(&self, tab_id: Option<TabId>, url: String) -> Result<()> {
        self.dispatch(BrowserCommand::UpdateTab {
            tab_id,
            url,
            active: false,
        })
    }

    fn set_badge(&self, text: String, color: &str) -> Result<()> {
        self.dispatch(BrowserCommand::SetBadge {
            text,
            color: color.to_string(),
        })
    }
}

/// Browser that forwards commands to whoever owns the receiving end, usually
/// the native-messaging writer.
#[derive(Clone)]
pub struct ChannelBrowser {
    sender: mpsc::UnboundedSender<BrowserCommand>,
}

impl ChannelBrowser {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BrowserCommand>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Browser for ChannelBrowser {
    fn dispatch(&self, command: BrowserCommand) -> Result<()> {
        self.sender
            .send(command)
            .map_err(|_| anyhow!("browser command channel closed"))
    }
}
