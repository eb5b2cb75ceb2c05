use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// Focus sessions completed before a long break replaces the short one.
pub const FOCUS_SESSIONS_PER_LONG_BREAK: u32 = 4;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "camelCase")]
pub enum SessionType {
    #[strum(to_string = "focus")]
    Focus,
    #[strum(to_string = "short break")]
    ShortBreak,
    #[strum(to_string = "long break")]
    LongBreak,
}

impl SessionType {
    pub const ALL: [SessionType; 3] = [
        SessionType::Focus,
        SessionType::ShortBreak,
        SessionType::LongBreak,
    ];

    /// Heading shown above the countdown
    pub fn label(&self) -> &'static str {
        match self {
            SessionType::Focus => "Focus Time",
            SessionType::ShortBreak => "Short Break",
            SessionType::LongBreak => "Long Break",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, SessionType::Focus)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Paused,
}

/// The whole timer, owned by the controller and threaded through the
/// transitions in `timer`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerState {
    pub run_state: RunState,
    pub time_left_secs: u32,
    pub total_secs: u32,
    pub session_type: SessionType,
    pub completed_focus_count: u32,
    pub session_number: u32,
    pub settings: Settings,
    pub break_mode: bool,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(Settings::default(), 0)
    }
}

impl TimerState {
    pub fn new(settings: Settings, completed_focus_count: u32) -> Self {
        let total = settings.seconds_for(SessionType::Focus);
        Self {
            run_state: RunState::Idle,
            time_left_secs: total,
            total_secs: total,
            session_type: SessionType::Focus,
            completed_focus_count,
            session_number: 1,
            settings,
            break_mode: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.run_state == RunState::Paused
    }

    /// Rewinds the countdown to the full configured length of the current type.
    pub fn reset_duration(&mut self) {
        let total = self.settings.seconds_for(self.session_type);
        self.total_secs = total;
        self.time_left_secs = total;
    }

    /// Fraction of the current session already elapsed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.total_secs == 0 {
            return 1.0;
        }
        1.0 - f64::from(self.time_left_secs) / f64::from(self.total_secs)
    }

    /// `MM:SS` rendering of the remaining time.
    pub fn clock_face(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.time_left_secs / 60,
            self.time_left_secs % 60
        )
    }
}
