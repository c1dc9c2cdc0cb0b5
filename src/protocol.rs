//! Messages exchanged with the extension.
//!
//! Requests arrive as `{ "id"?: n, "action": "...", ...payload }`. Everything
//! the host writes back is a [`HostMessage`] tagged by `type`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    browser::{BrowserCommand, TabId},
    db::{BlockedSite, HydrationState, Task, TemporaryUnblock},
    focus::{FocusSessionState, FocusSnapshot},
};

pub type RequestId = u64;

const TAB_STATUS_COMPLETE: &str = "complete";
const MAIN_FRAME: i64 = 0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "action",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Request {
    GetBlockedSites,
    AddBlockedSite {
        url: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        favicon: Option<String>,
    },
    RemoveBlockedSite {
        site_id: String,
    },
    /// Grant for an exact number of milliseconds.
    TemporaryUnblock {
        url: String,
        duration: i64,
    },
    /// Grant in minutes from the block screen, padded for its countdown.
    GrantTemporaryAccess {
        url: String,
        minutes: u32,
    },
    GetTemporaryUnblocks,
    RemoveTemporaryUnblock {
        url: String,
        #[serde(default)]
        redirect_to_block: bool,
        #[serde(default)]
        tab_id: Option<TabId>,
    },
    GetFocusModeState,
    UpdateFocusModeState {
        state: FocusSessionState,
    },
    StartFocusSession {
        #[serde(default)]
        duration_seconds: Option<u64>,
    },
    PauseFocusSession,
    ResumeFocusSession,
    StopFocusSession,
    RedirectToBlockScreen {
        url: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        tab_id: Option<TabId>,
    },
    GetHydrationState,
    UpdateHydrationState {
        state: HydrationState,
    },
    GetTasks,
    SaveTasks {
        tasks: Vec<Task>,
    },
    TabCreated {
        tab_id: TabId,
        #[serde(default)]
        url: Option<String>,
    },
    TabUpdated {
        tab_id: TabId,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        status: Option<String>,
    },
    TabRemoved {
        tab_id: TabId,
    },
    BeforeNavigate {
        tab_id: TabId,
        url: String,
        #[serde(default)]
        frame_id: i64,
    },
    NotificationClicked {
        notification_id: String,
    },
    NotificationButtonClicked {
        notification_id: String,
        button_index: u8,
    },
    /// A keyboard shortcut from `chrome.commands`.
    CommandInvoked {
        command: String,
    },
}

impl Request {
    /// Browser events are fire-and-forget; they never get a response.
    pub fn is_event(&self) -> bool {
        matches!(
            self,
            Request::TabCreated { .. }
                | Request::TabUpdated { .. }
                | Request::TabRemoved { .. }
                | Request::BeforeNavigate { .. }
                | Request::NotificationClicked { .. }
                | Request::NotificationButtonClicked { .. }
                | Request::CommandInvoked { .. }
        )
    }
}

/// Tab update that finished loading.
pub fn is_load_complete(status: Option<&str>) -> bool {
    status == Some(TAB_STATUS_COMPLETE)
}

pub fn is_main_frame(frame_id: i64) -> bool {
    frame_id == MAIN_FRAME
}

/// A decoded inbound frame. The id is kept even when the action is
/// unknown or malformed so the failure can still be answered.
#[derive(Debug)]
pub struct Incoming {
    pub id: Option<RequestId>,
    pub request: Result<Request>,
}

pub fn decode_incoming(bytes: &[u8]) -> Result<Incoming> {
    let mut value: Value =
        serde_json::from_slice(bytes).context("message is not valid JSON")?;

    let id = match value.as_object_mut() {
        Some(object) => object.remove("id").and_then(|id| id.as_u64()),
        None => None,
    };
    let request = serde_json::from_value(value).context("unrecognized request");
    Ok(Incoming { id, request })
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Response {
    Ack {
        success: bool,
    },
    Failure {
        success: bool,
        error: String,
    },
    SiteAdded {
        success: bool,
        site: BlockedSite,
    },
    FocusMode {
        success: bool,
        #[serde(flatten)]
        snapshot: FocusSnapshot,
    },
    BlockedSites(Vec<BlockedSite>),
    TemporaryUnblocks(Vec<TemporaryUnblock>),
    Hydration(HydrationState),
    Tasks(Vec<Task>),
}

impl Response {
    pub fn ok() -> Self {
        Response::Ack { success: true }
    }

    pub fn failure(err: &anyhow::Error) -> Self {
        Response::Failure {
            success: false,
            error: format!("{err:#}"),
        }
    }

    pub fn focus(snapshot: FocusSnapshot) -> Self {
        Response::FocusMode {
            success: true,
            snapshot,
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            Response::Ack { success }
            | Response::Failure { success, .. }
            | Response::SiteAdded { success, .. }
            | Response::FocusMode { success, .. } => *success,
            Response::BlockedSites(_)
            | Response::TemporaryUnblocks(_)
            | Response::Hydration(_)
            | Response::Tasks(_) => true,
        }
    }
}

/// Published after every state change so open UIs can re-render.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(
    tag = "name",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum StateEvent {
    FocusModeChanged { state: FocusSessionState },
    BlockedSitesChanged { sites: Vec<BlockedSite> },
    TemporaryUnblocksChanged { unblocks: Vec<TemporaryUnblock> },
    HydrationChanged { state: HydrationState },
    TasksChanged { tasks: Vec<Task> },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostMessage {
    Response {
        id: Option<RequestId>,
        body: Response,
    },
    Command {
        command: BrowserCommand,
    },
    Event {
        event: StateEvent,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> Incoming {
        decode_incoming(value.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn decodes_actions_with_camel_case_payloads() {
        let incoming = decode(json!({
            "id": 4,
            "action": "addBlockedSite",
            "url": "reddit.com",
            "name": "Reddit"
        }));

        assert_eq!(incoming.id, Some(4));
        assert_eq!(
            incoming.request.unwrap(),
            Request::AddBlockedSite {
                url: "reddit.com".into(),
                name: "Reddit".into(),
                favicon: None,
            }
        );

        let incoming = decode(json!({
            "action": "removeTemporaryUnblock",
            "url": "reddit.com",
            "redirectToBlock": true,
            "tabId": 12
        }));
        assert_eq!(incoming.id, None);
        assert_eq!(
            incoming.request.unwrap(),
            Request::RemoveTemporaryUnblock {
                url: "reddit.com".into(),
                redirect_to_block: true,
                tab_id: Some(12),
            }
        );
    }

    #[test]
    fn unit_actions_decode() {
        let incoming = decode(json!({ "id": 1, "action": "getFocusModeState" }));
        assert_eq!(incoming.request.unwrap(), Request::GetFocusModeState);
    }

    #[test]
    fn unknown_action_keeps_the_id() {
        let incoming = decode(json!({ "id": 9, "action": "launchRockets" }));
        assert_eq!(incoming.id, Some(9));
        assert!(incoming.request.is_err());
    }

    #[test]
    fn non_json_is_rejected() {
        assert!(decode_incoming(b"{not json").is_err());
    }

    #[test]
    fn legacy_focus_state_payload_decodes() {
        let incoming = decode(json!({
            "action": "updateFocusModeState",
            "state": {
                "isActive": true,
                "isPaused": false,
                "time": 1500,
                "sessionStartTime": 1_700_000_000_000i64,
                "originalDuration": 1500
            }
        }));

        let Request::UpdateFocusModeState { state } = incoming.request.unwrap() else {
            panic!("expected updateFocusModeState");
        };
        assert!(state.is_running());
        assert_eq!(state.original_duration, 1500);
    }

    #[test]
    fn events_are_fire_and_forget() {
        let tab = decode(json!({ "action": "tabRemoved", "tabId": 3 }));
        assert!(tab.request.unwrap().is_event());
        assert!(!Request::GetTasks.is_event());

        let shortcut = decode(json!({ "action": "commandInvoked", "command": "break-page" }));
        assert_eq!(
            shortcut.request.unwrap(),
            Request::CommandInvoked {
                command: "break-page".into()
            }
        );
    }

    #[test]
    fn responses_serialize_flat() {
        assert_eq!(serde_json::to_value(Response::ok()).unwrap(), json!({ "success": true }));

        let failure = Response::failure(&anyhow::anyhow!("reddit.com is already blocked"));
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            json!({ "success": false, "error": "reddit.com is already blocked" })
        );
        assert!(!failure.is_success());

        assert_eq!(
            serde_json::to_value(Response::BlockedSites(vec![])).unwrap(),
            json!([])
        );
    }

    #[test]
    fn host_messages_are_tagged_by_type() {
        let message = HostMessage::Response {
            id: Some(2),
            body: Response::ok(),
        };
        assert_eq!(
            serde_json::to_value(message).unwrap(),
            json!({ "type": "response", "id": 2, "body": { "success": true } })
        );

        let message = HostMessage::Event {
            event: StateEvent::TasksChanged { tasks: vec![] },
        };
        assert_eq!(
            serde_json::to_value(message).unwrap(),
            json!({ "type": "event", "event": { "name": "tasksChanged", "tasks": [] } })
        );
    }

    #[test]
    fn frame_and_status_helpers() {
        assert!(is_main_frame(0));
        assert!(!is_main_frame(3));
        assert!(is_load_complete(Some("complete")));
        assert!(!is_load_complete(Some("loading")));
        assert!(!is_load_complete(None));
    }
}
