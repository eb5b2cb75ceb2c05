pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableFocusChange, EnableFocusChange, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
    },
    tty::IsTty,
};
use poromodo::{
    app_dirs::AppDirs,
    clock::{Clock, SystemClock},
    controller::SessionController,
    notification::{Alerts, DesktopAlerts, SilentAlerts},
    runtime::{CrosstermEventSource, FixedTicker, Runner, TimerEvent, TimerEventSource, Ticker},
    session::SessionType,
    settings::Settings,
    store::{KeyValueStore, StateStore},
    timer::{Cue, Effect},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const PULSE_CUE: Duration = Duration::from_millis(2000);
const SHAKE_CUE: Duration = Duration::from_millis(500);

/// pomodoro focus timer with daily session tracking
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A pomodoro focus timer: focus sessions alternate with short breaks, every fourth break is a long one, and today's completed sessions are remembered between runs."
)]
pub struct Cli {
    /// focus session length in minutes (saved for future runs)
    #[clap(short = 'f', long, value_parser = clap::value_parser!(u32).range(1..))]
    focus: Option<u32>,

    /// short break length in minutes (saved for future runs)
    #[clap(short = 's', long, value_parser = clap::value_parser!(u32).range(1..))]
    short_break: Option<u32>,

    /// long break length in minutes (saved for future runs)
    #[clap(short = 'l', long, value_parser = clap::value_parser!(u32).range(1..))]
    long_break: Option<u32>,

    /// turn off the end-of-session bell
    #[clap(long)]
    no_sound: bool,

    /// turn off desktop notifications
    #[clap(long)]
    no_notifications: bool,

    /// state database to use instead of ~/.local/state/poromodo/state.db
    #[clap(long)]
    state_db: Option<PathBuf>,

    /// print today's progress and the current settings, then exit
    #[clap(long)]
    status: bool,
}

impl Cli {
    /// Settings with the command-line overrides applied, if any were given.
    fn overrides(&self, current: Settings) -> Option<Settings> {
        let mut next = current;
        if let Some(minutes) = self.focus {
            next.focus_minutes = minutes;
        }
        if let Some(minutes) = self.short_break {
            next.short_break_minutes = minutes;
        }
        if let Some(minutes) = self.long_break {
            next.long_break_minutes = minutes;
        }
        if self.no_sound {
            next.sound_enabled = false;
        }
        if self.no_notifications {
            next.notifications_enabled = false;
        }
        (next != current).then_some(next)
    }

    fn db_path(&self) -> PathBuf {
        self.state_db
            .clone()
            .or_else(AppDirs::db_path)
            .unwrap_or_else(|| PathBuf::from("poromodo_state.db"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Timer,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Duration(SessionType),
    Sound,
    Notifications,
}

impl SettingsField {
    pub const ALL: [SettingsField; 5] = [
        SettingsField::Duration(SessionType::Focus),
        SettingsField::Duration(SessionType::ShortBreak),
        SettingsField::Duration(SessionType::LongBreak),
        SettingsField::Sound,
        SettingsField::Notifications,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SettingsField::Duration(SessionType::Focus) => "Focus (min)",
            SettingsField::Duration(SessionType::ShortBreak) => "Short break (min)",
            SettingsField::Duration(SessionType::LongBreak) => "Long break (min)",
            SettingsField::Sound => "Sound",
            SettingsField::Notifications => "Notifications",
        }
    }
}

/// Settings screen cursor plus the text being typed into a duration field
#[derive(Debug, Default)]
pub struct SettingsForm {
    pub selected: usize,
    pub editing: Option<String>,
}

impl SettingsForm {
    pub fn field(&self) -> SettingsField {
        SettingsField::ALL[self.selected]
    }
}

pub struct App<S, C, A> {
    pub controller: SessionController<S, C, A>,
    pub screen: Screen,
    pub form: SettingsForm,
    pub pulse_until: Option<Instant>,
    pub shake_until: Option<Instant>,
    pub status: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum KeyOutcome {
    Continue(Vec<Effect>),
    Quit,
}

impl<S: KeyValueStore, C: Clock, A: Alerts> App<S, C, A> {
    pub fn new(controller: SessionController<S, C, A>) -> Self {
        Self {
            controller,
            screen: Screen::Timer,
            form: SettingsForm::default(),
            pulse_until: None,
            shake_until: None,
            status: None,
        }
    }

    /// Arms the transient cues named in `effects`.
    pub fn apply_cues(&mut self, effects: &[Effect], now: Instant) {
        for effect in effects {
            match effect {
                Effect::Cue(Cue::Pulse) => self.pulse_until = Some(now + PULSE_CUE),
                Effect::Cue(Cue::Shake) => self.shake_until = Some(now + SHAKE_CUE),
                _ => {}
            }
        }
    }

    pub fn pulsing(&self, now: Instant) -> bool {
        self.pulse_until.is_some_and(|until| now < until)
    }

    pub fn shaking(&self, now: Instant) -> bool {
        self.shake_until.is_some_and(|until| now < until)
    }

    pub fn on_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return KeyOutcome::Quit;
        }
        match self.screen {
            Screen::Timer => self.on_timer_key(key),
            Screen::Settings => self.on_settings_key(key),
        }
    }

    fn on_timer_key(&mut self, key: KeyEvent) -> KeyOutcome {
        let effects = match key.code {
            KeyCode::Char(' ') | KeyCode::Enter => self.controller.toggle(),
            KeyCode::Char('r') | KeyCode::Char('R') => self.controller.reset(),
            KeyCode::Char('s') => {
                self.screen = Screen::Settings;
                self.status = None;
                Vec::new()
            }
            KeyCode::Char('q') | KeyCode::Esc => return KeyOutcome::Quit,
            _ => Vec::new(),
        };
        KeyOutcome::Continue(effects)
    }

    fn on_settings_key(&mut self, key: KeyEvent) -> KeyOutcome {
        // An open text field swallows everything, including the timer shortcuts.
        if let Some(buffer) = self.form.editing.as_mut() {
            return match key.code {
                KeyCode::Char(c) if c.is_ascii_digit() && buffer.len() < 4 => {
                    buffer.push(c);
                    KeyOutcome::Continue(Vec::new())
                }
                KeyCode::Backspace => {
                    buffer.pop();
                    KeyOutcome::Continue(Vec::new())
                }
                KeyCode::Esc => {
                    self.form.editing = None;
                    KeyOutcome::Continue(Vec::new())
                }
                KeyCode::Enter => {
                    let typed = self.form.editing.take().unwrap_or_default();
                    KeyOutcome::Continue(self.commit_duration(&typed))
                }
                _ => KeyOutcome::Continue(Vec::new()),
            };
        }

        let effects = match key.code {
            KeyCode::Up => {
                self.form.selected = self.form.selected.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Down => {
                self.form.selected = (self.form.selected + 1).min(SettingsField::ALL.len() - 1);
                Vec::new()
            }
            KeyCode::Left => self.adjust_duration(-1),
            KeyCode::Right => self.adjust_duration(1),
            KeyCode::Enter | KeyCode::Char(' ') => match self.form.field() {
                SettingsField::Duration(_) => {
                    self.form.editing = Some(String::new());
                    Vec::new()
                }
                SettingsField::Sound => {
                    let mut next = self.controller.state().settings;
                    next.sound_enabled = !next.sound_enabled;
                    self.submit(next)
                }
                SettingsField::Notifications => {
                    let mut next = self.controller.state().settings;
                    next.notifications_enabled = !next.notifications_enabled;
                    self.submit(next)
                }
            },
            KeyCode::Esc | KeyCode::Char('s') | KeyCode::Char('b') => {
                self.screen = Screen::Timer;
                Vec::new()
            }
            KeyCode::Char('q') => return KeyOutcome::Quit,
            _ => Vec::new(),
        };
        KeyOutcome::Continue(effects)
    }

    fn adjust_duration(&mut self, delta: i64) -> Vec<Effect> {
        let SettingsField::Duration(session_type) = self.form.field() else {
            return Vec::new();
        };
        let mut next = self.controller.state().settings;
        let minutes = next.minutes_mut(session_type);
        *minutes = (i64::from(*minutes) + delta).clamp(1, i64::from(u32::MAX)) as u32;
        self.submit(next)
    }

    fn commit_duration(&mut self, typed: &str) -> Vec<Effect> {
        let SettingsField::Duration(session_type) = self.form.field() else {
            return Vec::new();
        };
        let Ok(minutes) = typed.parse::<u32>() else {
            self.status = Some("enter a whole number of minutes".to_string());
            return Vec::new();
        };
        let mut next = self.controller.state().settings;
        *next.minutes_mut(session_type) = minutes;
        self.submit(next)
    }

    fn submit(&mut self, settings: Settings) -> Vec<Effect> {
        match self.controller.update_settings(settings) {
            Ok(effects) => {
                self.status = None;
                effects
            }
            Err(e) => {
                warn!(error = %e, "settings rejected");
                self.status = Some(e.to_string());
                Vec::new()
            }
        }
    }
}

fn init_logging() -> Option<WorkerGuard> {
    let dir = AppDirs::log_dir()?;
    std::fs::create_dir_all(&dir).ok()?;
    let appender = tracing_appender::rolling::never(dir, "poromodo.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_env("POROMODO_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    Some(guard)
}

fn print_status<S: KeyValueStore, C: Clock, A: Alerts>(controller: &SessionController<S, C, A>) {
    let state = controller.state();
    let on_off = |flag: bool| if flag { "on" } else { "off" };
    println!(
        "{} focus sessions today",
        state.completed_focus_count
    );
    println!(
        "focus {}m | short break {}m | long break {}m | sound {} | notifications {}",
        state.settings.focus_minutes,
        state.settings.short_break_minutes,
        state.settings.long_break_minutes,
        on_off(state.settings.sound_enabled),
        on_off(state.settings.notifications_enabled),
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let _log_guard = init_logging();

    let store = StateStore::open_or_memory(cli.db_path());

    if cli.status {
        if !store.is_persistent() {
            eprintln!("state database unavailable, changes will not be saved");
        }
        let mut controller = SessionController::open(store, SystemClock, SilentAlerts);
        if let Some(settings) = cli.overrides(controller.state().settings) {
            controller.update_settings(settings)?;
        }
        print_status(&controller);
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut controller = SessionController::open(store, SystemClock, DesktopAlerts);
    if let Some(settings) = cli.overrides(controller.state().settings) {
        controller.update_settings(settings)?;
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(controller);
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::one_hertz());
    let result = start_tui(&mut terminal, &mut app, runner);
    app.controller.shutdown();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B, S, C, A, E, T>(
    terminal: &mut Terminal<B>,
    app: &mut App<S, C, A>,
    mut runner: Runner<E, T>,
) -> Result<(), Box<dyn Error>>
where
    B: Backend,
    S: KeyValueStore,
    C: Clock,
    A: Alerts,
    E: TimerEventSource,
    T: Ticker,
{
    // Pick up a session that was running when the last run exited.
    let resumed = app.controller.restore_from_background();
    runner.apply(&resumed);
    app.apply_cues(&resumed, Instant::now());
    info!(running = app.controller.state().is_running(), "tui started");

    let mut title = String::new();
    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        let next_title = ui::window_title(app.controller.state());
        if next_title != title {
            execute!(io::stdout(), SetTitle(&next_title))?;
            title = next_title;
        }

        let effects = match runner.step() {
            TimerEvent::Tick => app.controller.tick(),
            TimerEvent::FocusLost => app.controller.snapshot_for_background(),
            TimerEvent::FocusGained => app.controller.restore_from_background(),
            TimerEvent::Resize | TimerEvent::Frame => Vec::new(),
            TimerEvent::Key(key) => match app.on_key(key) {
                KeyOutcome::Continue(effects) => effects,
                KeyOutcome::Quit => break,
            },
        };
        runner.apply(&effects);
        app.apply_cues(&effects, Instant::now());
    }

    Ok(())
}
