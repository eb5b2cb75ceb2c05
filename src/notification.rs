use std::io::{self, Write};

use tracing::debug;

use crate::session::SessionType;

pub const APP_NAME: &str = "POROMODO";
pub const NOTIFICATION_TAG: &str = "poromodo-timer";
pub const NOTIFICATION_ICON: &str = "icons/icon-192x192.svg";

/// A user-facing notification. `tag` is stable so a newer notification
/// replaces an older one instead of stacking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub tag: String,
}

impl Notification {
    /// Payload announcing the end of a session of `finished` type.
    pub fn session_complete(finished: SessionType) -> Self {
        let (title, body) = match finished {
            SessionType::Focus => ("🍅 Focus Session Complete!", "Great job! Time for a break."),
            SessionType::ShortBreak | SessionType::LongBreak => {
                ("☕ Break Time Over!", "Break's over. Ready to focus?")
            }
        };
        Self {
            title: title.to_string(),
            body: body.to_string(),
            icon: NOTIFICATION_ICON.to_string(),
            tag: NOTIFICATION_TAG.to_string(),
        }
    }
}

/// Sink for the two end-of-session alerts. Implementations never fail
/// loudly: a missing capability is skipped.
pub trait Alerts {
    fn play_sound(&mut self);
    fn notify(&mut self, notification: &Notification);
}

/// Terminal bell plus a desktop notification through the platform daemon.
#[derive(Debug, Default)]
pub struct DesktopAlerts;

impl Alerts for DesktopAlerts {
    fn play_sound(&mut self) {
        let mut stdout = io::stdout();
        if let Err(e) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
            debug!(error = %e, "terminal bell unavailable");
        }
    }

    fn notify(&mut self, notification: &Notification) {
        let shown = notify_rust::Notification::new()
            .appname(APP_NAME)
            .summary(&notification.title)
            .body(&notification.body)
            .icon(&notification.icon)
            .show();
        if let Err(e) = shown {
            debug!(error = %e, tag = %notification.tag, "desktop notification unavailable");
        }
    }
}

/// Drops every alert; used for headless runs.
#[derive(Debug, Default)]
pub struct SilentAlerts;

impl Alerts for SilentAlerts {
    fn play_sound(&mut self) {}
    fn notify(&mut self, _notification: &Notification) {}
}
