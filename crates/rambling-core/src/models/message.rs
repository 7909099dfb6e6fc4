use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Online and login state reported by a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub is_online: bool,
    pub is_logged_in: bool,
}

/// Message delivered to the router by a page.
///
/// Only `statusUpdate` is understood; unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    #[serde(default)]
    pub status_update: Option<StatusUpdate>,
}

impl InboundMessage {
    /// Extract a status update from arbitrary message data.
    /// Returns `None` for anything that is not a well-formed update.
    pub fn status_update(data: &Value) -> Option<StatusUpdate> {
        serde_json::from_value::<InboundMessage>(data.clone())
            .ok()
            .and_then(|msg| msg.status_update)
    }
}

/// Message broadcast by the router to open pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub request_status_update: bool,
}

impl OutboundMessage {
    /// Ask every page to report its online and login state.
    pub fn request_status_update() -> Self {
        Self {
            request_status_update: true,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "requestStatusUpdate": self.request_status_update })
    }
}
