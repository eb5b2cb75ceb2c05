use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::SessionType;

/// User-tunable timer settings, persisted under the `settings` key.
///
/// Every field carries a serde default so a blob written by an older build
/// (or hand-edited down to a few fields) is merged over the defaults on load.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub focus_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub sound_enabled: bool,
    pub notifications_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            sound_enabled: true,
            notifications_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("{0} duration must be at least one minute")]
    ZeroDuration(SessionType),
}

impl Settings {
    pub fn minutes_for(&self, session_type: SessionType) -> u32 {
        match session_type {
            SessionType::Focus => self.focus_minutes,
            SessionType::ShortBreak => self.short_break_minutes,
            SessionType::LongBreak => self.long_break_minutes,
        }
    }

    /// Whole seconds for a session of the given type.
    pub fn seconds_for(&self, session_type: SessionType) -> u32 {
        self.minutes_for(session_type).saturating_mul(60)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        for session_type in SessionType::ALL {
            if self.minutes_for(session_type) == 0 {
                return Err(SettingsError::ZeroDuration(session_type));
            }
        }
        Ok(())
    }

    pub fn minutes_mut(&mut self, session_type: SessionType) -> &mut u32 {
        match session_type {
            SessionType::Focus => &mut self.focus_minutes,
            SessionType::ShortBreak => &mut self.short_break_minutes,
            SessionType::LongBreak => &mut self.long_break_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn partial_blob_merges_over_defaults() {
        let loaded: Settings = serde_json::from_str(r#"{"focusMinutes": 50}"#).unwrap();
        assert_eq!(loaded.focus_minutes, 50);
        assert_eq!(loaded.short_break_minutes, 5);
        assert_eq!(loaded.long_break_minutes, 15);
        assert!(loaded.sound_enabled);
        assert!(loaded.notifications_enabled);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["focusMinutes"], 25);
        assert_eq!(json["shortBreakMinutes"], 5);
        assert_eq!(json["longBreakMinutes"], 15);
        assert_eq!(json["soundEnabled"], true);
        assert_eq!(json["notificationsEnabled"], true);
    }

    #[test]
    fn seconds_follow_session_type() {
        let settings = Settings::default();
        assert_eq!(settings.seconds_for(SessionType::Focus), 1500);
        assert_eq!(settings.seconds_for(SessionType::ShortBreak), 300);
        assert_eq!(settings.seconds_for(SessionType::LongBreak), 900);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let settings = Settings {
            short_break_minutes: 0,
            ..Settings::default()
        };
        assert_matches!(
            settings.validate(),
            Err(SettingsError::ZeroDuration(SessionType::ShortBreak))
        );
        assert!(Settings::default().validate().is_ok());
    }
}
