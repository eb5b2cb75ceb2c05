use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::notification::Notification;

/// An open page controlled (or controllable) by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub id: String,
    pub url: String,
    pub focusable: bool,
}

/// Platform hooks the gateway drives: lifecycle hand-off, notifications and
/// page focus.
#[async_trait]
pub trait Host: Send + Sync {
    /// Take over without waiting for existing pages to release the old gateway.
    async fn skip_waiting(&self);
    /// Start controlling already-open pages without a reload.
    async fn claim_clients(&self);
    async fn show_notification(&self, notification: &Notification);
    async fn clients(&self) -> Vec<ClientInfo>;
    /// Returns whether the client accepted focus.
    async fn focus(&self, client: &ClientInfo) -> bool;
    async fn open_window(&self, url: &str);
}

/// Control messages posted to the gateway by a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    SkipWaiting,
    GetVersion,
    ClearCache,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Reply {
    Version(String),
}

/// Button pressed on a notification, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    Explore,
    Close,
    Default,
}

impl ClickAction {
    pub fn from_action(action: Option<&str>) -> Self {
        match action {
            Some("explore") => ClickAction::Explore,
            Some("close") => ClickAction::Close,
            _ => ClickAction::Default,
        }
    }
}
