use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use poromodo::clock::{Clock, ManualClock};
use poromodo::controller::SessionController;
use poromodo::notification::SilentAlerts;
use poromodo::persistence::{DailyRecord, SESSION_DATA_KEY, SETTINGS_KEY};
use poromodo::runtime::{FixedTicker, Runner, TestEventSource, TimerEvent};
use poromodo::session::{RunState, SessionType};
use poromodo::store::{KeyValueStore, MemoryStore};

// 2026-06-15 12:00 UTC, far from any midnight or DST switch.
const NOON: i64 = 1_781_524_800_000;

fn one_minute_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store
        .set(
            SETTINGS_KEY,
            r#"{"focusMinutes":1,"shortBreakMinutes":1,"longBreakMinutes":1}"#,
        )
        .unwrap();
    store
}

fn run_to_completion<C: Clock>(ctl: &mut SessionController<MemoryStore, C, SilentAlerts>) {
    ctl.start();
    while ctl.state().is_running() {
        ctl.tick();
    }
}

#[test]
fn every_fourth_focus_session_earns_a_long_break() {
    let clock = ManualClock::new(NOON);
    let mut ctl = SessionController::open(one_minute_store(), &clock, SilentAlerts);

    let mut seen = Vec::new();
    for _ in 0..8 {
        run_to_completion(&mut ctl);
        seen.push(ctl.state().session_type);
    }

    use SessionType::*;
    assert_eq!(
        seen,
        vec![ShortBreak, Focus, ShortBreak, Focus, ShortBreak, Focus, LongBreak, Focus]
    );
    assert_eq!(ctl.state().completed_focus_count, 4);
    assert_eq!(ctl.state().run_state, RunState::Idle);
}

#[test]
fn yesterdays_count_does_not_carry_over() {
    let clock = ManualClock::new(NOON);
    let yesterday = clock.today().pred_opt().unwrap();
    let mut store = one_minute_store();
    let record = DailyRecord {
        date: yesterday,
        count: 7,
    };
    store
        .set(SESSION_DATA_KEY, &serde_json::to_string(&record).unwrap())
        .unwrap();

    let mut ctl = SessionController::open(store, &clock, SilentAlerts);
    assert_eq!(ctl.state().completed_focus_count, 0);

    run_to_completion(&mut ctl);
    let raw = ctl.store().get(SESSION_DATA_KEY).unwrap().unwrap();
    let saved: DailyRecord = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        saved,
        DailyRecord {
            date: clock.today(),
            count: 1
        }
    );
}

#[test]
fn todays_count_survives_a_relaunch() {
    let clock = ManualClock::new(NOON);
    let mut ctl = SessionController::open(one_minute_store(), &clock, SilentAlerts);
    run_to_completion(&mut ctl);
    let store = ctl.store().clone();

    let relaunched = SessionController::open(store, &clock, SilentAlerts);
    assert_eq!(relaunched.state().completed_focus_count, 1);
    assert_eq!(relaunched.state().session_type, SessionType::Focus);
    assert_eq!(relaunched.state().settings.focus_minutes, 1);
}

#[test]
fn hidden_session_that_ran_out_completes_on_return() {
    let clock = ManualClock::new(NOON);
    let mut ctl = SessionController::open(one_minute_store(), &clock, SilentAlerts);
    ctl.start();
    for _ in 0..45 {
        ctl.tick();
    }
    assert_eq!(ctl.state().time_left_secs, 15);

    ctl.snapshot_for_background();
    clock.advance_secs(15);
    ctl.restore_from_background();

    assert_eq!(ctl.state().session_type, SessionType::ShortBreak);
    assert_eq!(ctl.state().run_state, RunState::Idle);
    assert_eq!(ctl.state().completed_focus_count, 1);
    assert!(!ctl.driver_active());
}

#[test]
fn paused_session_is_not_advanced_while_hidden() {
    let clock = ManualClock::new(NOON);
    let mut ctl = SessionController::open(MemoryStore::new(), &clock, SilentAlerts);
    ctl.start();
    ctl.tick();
    ctl.pause();

    ctl.snapshot_for_background();
    clock.advance_secs(600);
    ctl.restore_from_background();

    assert_eq!(ctl.state().run_state, RunState::Paused);
    assert_eq!(ctl.state().time_left_secs, 1499);
    assert!(!ctl.driver_active());
}

// Drives the controller through the runtime without a TTY: a key press
// starts the countdown and the runner's driver ticks it to completion.
#[test]
fn headless_runner_completes_a_session() {
    let clock = ManualClock::new(NOON);
    let mut ctl = SessionController::open(one_minute_store(), &clock, SilentAlerts);

    let (tx, rx) = mpsc::channel();
    let mut runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(1)),
    )
    .with_frame_interval(Duration::from_millis(1));

    tx.send(TimerEvent::Key(KeyEvent::new(
        KeyCode::Char(' '),
        KeyModifiers::NONE,
    )))
    .unwrap();

    let mut ticks = 0u32;
    for _ in 0..10_000u32 {
        let effects = match runner.step() {
            TimerEvent::Tick => {
                ticks += 1;
                ctl.tick()
            }
            TimerEvent::Key(_) => ctl.toggle(),
            _ => Vec::new(),
        };
        runner.apply(&effects);
        if ctl.state().session_type == SessionType::ShortBreak {
            break;
        }
    }

    assert_eq!(ctl.state().session_type, SessionType::ShortBreak);
    assert_eq!(ticks, 60);
    assert!(!runner.is_armed(), "completion stops the driver");
    assert!(!ctl.driver_active());
}
