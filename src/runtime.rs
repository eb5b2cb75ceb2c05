use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent};

use crate::timer::Effect;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum TimerEvent {
    Key(KeyEvent),
    Resize,
    FocusGained,
    FocusLost,
    /// The 1 Hz countdown driver fired.
    Tick,
    /// Nothing happened within a frame; redraw animations.
    Frame,
}

/// Source of terminal events (keyboard, resize, focus)
pub trait TimerEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<TimerEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let ev = match event::read() {
                Ok(CtEvent::Key(key)) => TimerEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => TimerEvent::Resize,
                Ok(CtEvent::FocusGained) => TimerEvent::FocusGained,
                Ok(CtEvent::FocusLost) => TimerEvent::FocusLost,
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(ev).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn one_hertz() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<TimerEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<TimerEvent>) -> Self {
        Self { rx }
    }
}

impl TimerEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event at a time.
///
/// It also owns the countdown driver: a single optional deadline. Arming
/// replaces the deadline, so at most one driver exists at any time.
pub struct Runner<E: TimerEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    frame_interval: Duration,
    next_tick: Option<Instant>,
}

impl<E: TimerEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
            frame_interval: Duration::from_millis(100),
            next_tick: None,
        }
    }

    pub fn with_frame_interval(mut self, frame_interval: Duration) -> Self {
        self.frame_interval = frame_interval;
        self
    }

    pub fn arm(&mut self) {
        self.next_tick = Some(Instant::now() + self.ticker.interval());
    }

    pub fn disarm(&mut self) {
        self.next_tick = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Applies the driver effects of a transition; other effects are ignored.
    pub fn apply(&mut self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::StartDriver => self.arm(),
                Effect::StopDriver => self.disarm(),
                _ => {}
            }
        }
    }

    /// Blocks until the next event, driver tick, or frame boundary.
    pub fn step(&mut self) -> TimerEvent {
        if let Some(tick) = self.take_due_tick() {
            return tick;
        }

        let timeout = match self.next_tick {
            Some(deadline) => deadline
                .saturating_duration_since(Instant::now())
                .min(self.frame_interval),
            None => self.frame_interval,
        };

        match self.event_source.recv_timeout(timeout) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => self.take_due_tick().unwrap_or(TimerEvent::Frame),
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(timeout);
                self.take_due_tick().unwrap_or(TimerEvent::Frame)
            }
        }
    }

    fn take_due_tick(&mut self) -> Option<TimerEvent> {
        let deadline = self.next_tick?;
        if Instant::now() < deadline {
            return None;
        }
        self.next_tick = Some(deadline + self.ticker.interval());
        Some(TimerEvent::Tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn runner(rx: Receiver<TimerEvent>, tick_ms: u64) -> Runner<TestEventSource, FixedTicker> {
        Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(tick_ms)),
        )
        .with_frame_interval(Duration::from_millis(1))
    }

    #[test]
    fn unarmed_runner_only_yields_frames() {
        let (_tx, rx) = mpsc::channel();
        let mut runner = runner(rx, 1);
        for _ in 0..5 {
            assert!(matches!(runner.step(), TimerEvent::Frame));
        }
    }

    #[test]
    fn armed_runner_ticks_after_interval() {
        let (_tx, rx) = mpsc::channel();
        let mut runner = runner(rx, 5);
        runner.arm();
        let ticked = (0..200).any(|_| matches!(runner.step(), TimerEvent::Tick));
        assert!(ticked, "expected a tick once the deadline passed");
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(TimerEvent::Resize).unwrap();
        let mut runner = runner(rx, 10);

        match runner.step() {
            TimerEvent::Resize => {}
            other => panic!("expected Resize event, got {other:?}"),
        }
    }

    #[test]
    fn driver_effects_arm_and_disarm() {
        let (_tx, rx) = mpsc::channel();
        let mut runner = runner(rx, 1000);
        runner.apply(&[Effect::StartDriver]);
        assert!(runner.is_armed());
        runner.apply(&[Effect::StartDriver, Effect::StartDriver]);
        assert!(runner.is_armed());
        runner.apply(&[Effect::PlaySound, Effect::StopDriver]);
        assert!(!runner.is_armed());
    }
}
