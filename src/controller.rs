use chrono::NaiveDate;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::notification::Alerts;
use crate::persistence::{self, write_record};
use crate::session::TimerState;
use crate::settings::{Settings, SettingsError};
use crate::store::KeyValueStore;
use crate::timer::{self, Command, Effect};

/// Effectful shell around the pure state machine in [`timer`].
///
/// Owns the timer state and its collaborators, executes persistence and
/// alert effects, and tracks whether the 1 Hz driver should be armed. The
/// remaining effects (cues, theme) are handed back for the display.
pub struct SessionController<S, C, A> {
    state: TimerState,
    store: S,
    clock: C,
    alerts: A,
    driver_active: bool,
    /// Day the completed count belongs to.
    count_date: NaiveDate,
}

impl<S: KeyValueStore, C: Clock, A: Alerts> SessionController<S, C, A> {
    /// Builds the timer from defaults overlaid with persisted settings and
    /// today's completed count.
    pub fn open(store: S, clock: C, alerts: A) -> Self {
        let settings = persistence::load_settings(&store);
        let today = clock.today();
        let count = persistence::load_daily_count(&store, today);
        info!(
            focus = settings.focus_minutes,
            short_break = settings.short_break_minutes,
            long_break = settings.long_break_minutes,
            completed_today = count,
            "timer loaded"
        );
        Self {
            state: TimerState::new(settings, count),
            store,
            clock,
            alerts,
            driver_active: false,
            count_date: today,
        }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn alerts(&self) -> &A {
        &self.alerts
    }

    /// Whether the shell should be delivering ticks
    pub fn driver_active(&self) -> bool {
        self.driver_active
    }

    pub fn dispatch(&mut self, command: Command) -> Vec<Effect> {
        debug!(?command, "dispatch");
        self.roll_over_day();
        let before = self.state.session_type;
        let (next, effects) = timer::dispatch(self.state.clone(), command);
        self.state = next;
        if self.state.session_type != before {
            info!(
                from = %before,
                to = %self.state.session_type,
                completed_today = self.state.completed_focus_count,
                session = self.state.session_number,
                "session boundary"
            );
        }
        for effect in &effects {
            self.execute(effect);
        }
        effects
    }

    /// Starts a fresh daily count once the calendar day has changed.
    fn roll_over_day(&mut self) {
        let today = self.clock.today();
        if today == self.count_date {
            return;
        }
        info!(
            previous = %self.count_date,
            completed = self.state.completed_focus_count,
            "new day, daily count reset"
        );
        self.count_date = today;
        self.state.completed_focus_count = 0;
    }

    fn execute(&mut self, effect: &Effect) {
        match effect {
            Effect::StartDriver => self.driver_active = true,
            Effect::StopDriver => self.driver_active = false,
            Effect::PlaySound => self.alerts.play_sound(),
            Effect::ShowNotification(notification) => self.alerts.notify(notification),
            Effect::Persist(record) => write_record(&mut self.store, record, self.clock.today()),
            Effect::Cue(_) | Effect::Theme { .. } => {}
        }
    }

    pub fn start(&mut self) -> Vec<Effect> {
        self.dispatch(Command::Start)
    }

    pub fn pause(&mut self) -> Vec<Effect> {
        self.dispatch(Command::Pause)
    }

    /// Start/pause toggle bound to space and enter
    pub fn toggle(&mut self) -> Vec<Effect> {
        if self.state.is_running() {
            self.pause()
        } else {
            self.start()
        }
    }

    pub fn reset(&mut self) -> Vec<Effect> {
        self.dispatch(Command::Reset)
    }

    pub fn tick(&mut self) -> Vec<Effect> {
        self.dispatch(Command::Tick)
    }

    /// Rejects zero durations before they can reach the countdown.
    pub fn update_settings(&mut self, settings: Settings) -> Result<Vec<Effect>, SettingsError> {
        settings.validate()?;
        Ok(self.dispatch(Command::UpdateSettings(settings)))
    }

    pub fn snapshot_for_background(&mut self) -> Vec<Effect> {
        let now_ms = self.clock.now_ms();
        self.dispatch(Command::EnterBackground { now_ms })
    }

    pub fn restore_from_background(&mut self) -> Vec<Effect> {
        let snapshot = persistence::take_snapshot(&mut self.store);
        let now_ms = self.clock.now_ms();
        self.dispatch(Command::ExitBackground { snapshot, now_ms })
    }

    /// Leaves a snapshot behind so the next launch can catch up.
    pub fn shutdown(&mut self) {
        self.snapshot_for_background();
        info!(
            running = self.state.is_running(),
            time_left = self.state.time_left_secs,
            "timer state saved"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::notification::{Notification, SilentAlerts};
    use crate::persistence::{CURRENT_STATE_KEY, SESSION_DATA_KEY, SETTINGS_KEY};
    use crate::session::{RunState, SessionType};
    use crate::store::MemoryStore;
    use assert_matches::assert_matches;

    #[derive(Default)]
    struct RecordingAlerts {
        sounds: usize,
        notifications: Vec<Notification>,
    }

    impl Alerts for RecordingAlerts {
        fn play_sound(&mut self) {
            self.sounds += 1;
        }

        fn notify(&mut self, notification: &Notification) {
            self.notifications.push(notification.clone());
        }
    }

    #[test]
    fn start_and_pause_track_the_driver() {
        let clock = ManualClock::new(0);
        let mut ctl = SessionController::open(MemoryStore::new(), &clock, SilentAlerts);
        assert!(!ctl.driver_active());
        ctl.toggle();
        assert!(ctl.driver_active());
        ctl.start();
        assert!(ctl.driver_active());
        ctl.toggle();
        assert!(!ctl.driver_active());
        assert_eq!(ctl.state().run_state, RunState::Paused);
    }

    #[test]
    fn completion_fires_alerts_and_persists_count() {
        let clock = ManualClock::new(0);
        let mut store = MemoryStore::new();
        store.set(SETTINGS_KEY, r#"{"focusMinutes":1}"#).unwrap();
        let mut ctl = SessionController::open(store, &clock, RecordingAlerts::default());

        ctl.start();
        for _ in 0..60 {
            ctl.tick();
        }

        assert!(!ctl.driver_active());
        assert_eq!(ctl.state().session_type, SessionType::ShortBreak);
        assert_eq!(ctl.alerts().sounds, 1);
        assert_eq!(
            ctl.alerts().notifications,
            vec![Notification::session_complete(SessionType::Focus)]
        );
        let raw = ctl.store().get(SESSION_DATA_KEY).unwrap().unwrap();
        assert!(raw.contains(r#""count":1"#));
    }

    #[test]
    fn invalid_settings_are_rejected_and_not_persisted() {
        let clock = ManualClock::new(0);
        let mut ctl = SessionController::open(MemoryStore::new(), &clock, SilentAlerts);
        let result = ctl.update_settings(Settings {
            focus_minutes: 0,
            ..Settings::default()
        });
        assert_matches!(result, Err(SettingsError::ZeroDuration(SessionType::Focus)));
        assert_eq!(ctl.store().get(SETTINGS_KEY).unwrap(), None);
        assert_eq!(ctl.state().total_secs, 1500);
    }

    #[test]
    fn background_round_trip_catches_up() {
        let clock = ManualClock::new(1_000_000);
        let mut ctl = SessionController::open(MemoryStore::new(), &clock, SilentAlerts);
        ctl.start();
        ctl.tick();
        ctl.snapshot_for_background();
        assert!(!ctl.driver_active());
        assert!(ctl.store().get(CURRENT_STATE_KEY).unwrap().is_some());

        clock.advance_secs(99);
        ctl.restore_from_background();
        assert!(ctl.driver_active());
        assert_eq!(ctl.state().time_left_secs, 1499 - 99);
        assert_eq!(ctl.store().get(CURRENT_STATE_KEY).unwrap(), None);
    }

    #[test]
    fn shutdown_snapshot_resumes_on_next_launch() {
        let clock = ManualClock::new(0);
        let mut ctl = SessionController::open(MemoryStore::new(), &clock, SilentAlerts);
        ctl.start();
        ctl.shutdown();
        let store = ctl.store().clone();

        clock.advance_secs(60);
        let mut relaunched = SessionController::open(store, &clock, SilentAlerts);
        assert_eq!(relaunched.state().run_state, RunState::Idle);
        relaunched.restore_from_background();
        assert_eq!(relaunched.state().run_state, RunState::Running);
        assert_eq!(relaunched.state().time_left_secs, 1440);
    }

    #[test]
    fn count_rolls_over_at_midnight() {
        use chrono::TimeZone;
        let noon = chrono::Local
            .with_ymd_and_hms(2026, 6, 15, 12, 0, 0)
            .single()
            .unwrap();
        let clock = ManualClock::new(noon.timestamp_millis());
        let mut store = MemoryStore::new();
        store
            .set(SETTINGS_KEY, r#"{"focusMinutes":1,"shortBreakMinutes":1}"#)
            .unwrap();
        let mut ctl = SessionController::open(store, &clock, SilentAlerts);

        let finish = |ctl: &mut SessionController<MemoryStore, &ManualClock, SilentAlerts>| {
            ctl.start();
            while ctl.state().is_running() {
                ctl.tick();
            }
        };

        finish(&mut ctl);
        assert_eq!(ctl.state().completed_focus_count, 1);

        clock.advance_secs(24 * 60 * 60);
        finish(&mut ctl); // the short break, now on the next day
        assert_eq!(ctl.state().completed_focus_count, 0);
        finish(&mut ctl);
        assert_eq!(ctl.state().completed_focus_count, 1);

        let raw = ctl.store().get(SESSION_DATA_KEY).unwrap().unwrap();
        assert_eq!(raw, r#"{"date":"2026-06-16","count":1}"#);
    }
}
