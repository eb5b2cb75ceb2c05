//! Pure timer/session state machine.
//!
//! Every operation takes the current [`TimerState`] by value and returns the
//! next state together with the side effects the shell has to carry out.
//! Nothing in here touches a clock, a store, or the terminal.

use crate::notification::Notification;
use crate::persistence::{Record, Snapshot};
use crate::session::{RunState, SessionType, TimerState, FOCUS_SESSIONS_PER_LONG_BREAK};
use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Pause,
    Reset,
    Tick,
    /// Settings must already have passed [`Settings::validate`].
    UpdateSettings(Settings),
    EnterBackground {
        now_ms: i64,
    },
    ExitBackground {
        snapshot: Option<Snapshot>,
        now_ms: i64,
    },
}

/// Transient visual cues owned by the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Pulse,
    Shake,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Arm the 1 Hz driver, replacing any driver already armed.
    StartDriver,
    StopDriver,
    PlaySound,
    ShowNotification(Notification),
    Persist(Record),
    Cue(Cue),
    Theme { break_mode: bool },
}

pub type Transition = (TimerState, Vec<Effect>);

/// Single entry point: apply `command` to `state`.
pub fn dispatch(mut state: TimerState, command: Command) -> Transition {
    let mut effects = Vec::new();
    match command {
        Command::Start => apply_start(&mut state, &mut effects),
        Command::Pause => apply_pause(&mut state, &mut effects),
        Command::Reset => apply_reset(&mut state, &mut effects),
        Command::Tick => apply_tick(&mut state, &mut effects),
        Command::UpdateSettings(settings) => {
            apply_update_settings(&mut state, settings, &mut effects)
        }
        Command::EnterBackground { now_ms } => {
            apply_enter_background(&mut state, now_ms, &mut effects)
        }
        Command::ExitBackground { snapshot, now_ms } => {
            apply_exit_background(&mut state, snapshot, now_ms, &mut effects)
        }
    }
    (state, effects)
}

pub fn start(state: TimerState) -> Transition {
    dispatch(state, Command::Start)
}

pub fn pause(state: TimerState) -> Transition {
    dispatch(state, Command::Pause)
}

pub fn reset(state: TimerState) -> Transition {
    dispatch(state, Command::Reset)
}

pub fn tick(state: TimerState) -> Transition {
    dispatch(state, Command::Tick)
}

pub fn complete_session(mut state: TimerState) -> Transition {
    let mut effects = Vec::new();
    apply_complete(&mut state, &mut effects);
    (state, effects)
}

pub fn next_session(mut state: TimerState) -> Transition {
    let mut effects = Vec::new();
    apply_next_session(&mut state, &mut effects);
    (state, effects)
}

fn apply_start(state: &mut TimerState, effects: &mut Vec<Effect>) {
    match state.run_state {
        RunState::Running => {}
        RunState::Idle | RunState::Paused => {
            // Resuming keeps time_left as is; only idle sessions start full.
            state.run_state = RunState::Running;
            effects.push(Effect::StartDriver);
            effects.push(Effect::Cue(Cue::Pulse));
        }
    }
}

fn apply_pause(state: &mut TimerState, effects: &mut Vec<Effect>) {
    if state.run_state == RunState::Running {
        state.run_state = RunState::Paused;
        effects.push(Effect::StopDriver);
    }
}

fn apply_reset(state: &mut TimerState, effects: &mut Vec<Effect>) {
    effects.push(Effect::StopDriver);
    state.run_state = RunState::Idle;
    state.reset_duration();
    state.break_mode = false;
    effects.push(Effect::Theme { break_mode: false });
}

fn apply_tick(state: &mut TimerState, effects: &mut Vec<Effect>) {
    if state.run_state != RunState::Running {
        return;
    }
    state.time_left_secs = state.time_left_secs.saturating_sub(1);
    if state.time_left_secs == 0 {
        apply_complete(state, effects);
    }
}

fn apply_complete(state: &mut TimerState, effects: &mut Vec<Effect>) {
    effects.push(Effect::StopDriver);
    state.run_state = RunState::Idle;

    if state.settings.sound_enabled {
        effects.push(Effect::PlaySound);
    }
    if state.settings.notifications_enabled {
        effects.push(Effect::ShowNotification(Notification::session_complete(
            state.session_type,
        )));
    }

    apply_next_session(state, effects);
    effects.push(Effect::Cue(Cue::Shake));
}

fn apply_next_session(state: &mut TimerState, effects: &mut Vec<Effect>) {
    state.session_type = match state.session_type {
        SessionType::Focus => {
            state.completed_focus_count += 1;
            effects.push(Effect::Persist(Record::DailyCount(
                state.completed_focus_count,
            )));
            if state.completed_focus_count % FOCUS_SESSIONS_PER_LONG_BREAK == 0 {
                SessionType::LongBreak
            } else {
                SessionType::ShortBreak
            }
        }
        SessionType::ShortBreak | SessionType::LongBreak => {
            state.session_number += 1;
            SessionType::Focus
        }
    };

    state.reset_duration();
    state.break_mode = state.session_type.is_break();
    effects.push(Effect::Theme {
        break_mode: state.break_mode,
    });
}

fn apply_update_settings(state: &mut TimerState, settings: Settings, effects: &mut Vec<Effect>) {
    state.settings = settings;
    effects.push(Effect::Persist(Record::Settings(settings)));
    if state.run_state != RunState::Running {
        state.reset_duration();
    }
}

fn apply_enter_background(state: &mut TimerState, now_ms: i64, effects: &mut Vec<Effect>) {
    effects.push(Effect::Persist(Record::Snapshot(Snapshot {
        running: state.is_running(),
        time_left_seconds: state.time_left_secs,
        session_type: state.session_type,
        saved_at_epoch_ms: now_ms,
    })));
    if state.is_running() {
        // Still conceptually running; exit_background catches up.
        effects.push(Effect::StopDriver);
    }
}

fn apply_exit_background(
    state: &mut TimerState,
    snapshot: Option<Snapshot>,
    now_ms: i64,
    effects: &mut Vec<Effect>,
) {
    let snapshot = match snapshot {
        Some(snapshot) if snapshot.running => snapshot,
        _ => {
            if state.is_running() {
                effects.push(Effect::StartDriver);
            }
            return;
        }
    };

    let elapsed_secs = now_ms.saturating_sub(snapshot.saved_at_epoch_ms).max(0) / 1000;
    let elapsed_secs = u32::try_from(elapsed_secs).unwrap_or(u32::MAX);
    let left = snapshot.time_left_seconds.saturating_sub(elapsed_secs);

    if state.session_type != snapshot.session_type {
        state.session_type = snapshot.session_type;
        state.break_mode = state.session_type.is_break();
        effects.push(Effect::Theme {
            break_mode: state.break_mode,
        });
    }
    state.total_secs = state.settings.seconds_for(snapshot.session_type);

    if left == 0 {
        state.time_left_secs = 0;
        apply_complete(state, effects);
        return;
    }

    state.time_left_secs = left.min(state.total_secs);
    state.run_state = RunState::Running;
    effects.push(Effect::StartDriver);
}
