use std::time::Instant;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Widget},
};

use poromodo::{
    clock::Clock,
    notification::Alerts,
    session::{RunState, TimerState},
    store::KeyValueStore,
};

use crate::{App, Screen, SettingsField};

const HORIZONTAL_MARGIN: u16 = 5;

/// Terminal title, mirroring the countdown in the tab/window name.
pub fn window_title(state: &TimerState) -> String {
    format!(
        "{} - {} | POROMODO",
        state.clock_face(),
        state.session_type.label()
    )
}

pub fn start_label(state: &TimerState) -> &'static str {
    match state.run_state {
        RunState::Running => "Pause",
        RunState::Paused => "Resume",
        RunState::Idle => "Start",
    }
}

fn accent(state: &TimerState) -> Color {
    if state.break_mode {
        Color::Green
    } else {
        Color::Red
    }
}

impl<S: KeyValueStore, C: Clock, A: Alerts> Widget for &App<S, C, A> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.screen {
            Screen::Timer => render_timer(self, area, buf),
            Screen::Settings => render_settings(self, area, buf),
        }
    }
}

fn render_timer<S: KeyValueStore, C: Clock, A: Alerts>(
    app: &App<S, C, A>,
    area: Rect,
    buf: &mut Buffer,
) {
    let state = app.controller.state();
    let now = Instant::now();
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let accent_style = Style::default().patch(bold_style).fg(accent(state));
    let dim_style = Style::default().add_modifier(Modifier::DIM);

    let content_height = 9;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(area.height.saturating_sub(content_height) / 2),
            Constraint::Length(1), // session type
            Constraint::Length(1), // padding
            Constraint::Length(1), // clock
            Constraint::Length(1), // padding
            Constraint::Length(1), // progress
            Constraint::Length(1), // counters
            Constraint::Length(1), // padding
            Constraint::Length(1), // controls
            Constraint::Length(1), // status
            Constraint::Min(0),
        ])
        .split(area);

    Paragraph::new(Span::styled(state.session_type.label(), accent_style))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    let mut clock_style = bold_style;
    if app.pulsing(now) {
        clock_style = clock_style.fg(accent(state)).add_modifier(Modifier::REVERSED);
    }
    let mut face = state.clock_face();
    if app.shaking(now) {
        clock_style = clock_style.fg(Color::Yellow);
        // Alternate a one-cell offset every 50ms while the cue lasts.
        let jitter = app
            .shake_until
            .map(|until| until.saturating_duration_since(now).as_millis() / 50 % 2)
            .unwrap_or(0);
        if jitter == 1 {
            face.insert(0, ' ');
        } else {
            face.push(' ');
        }
    }
    Paragraph::new(Span::styled(face, clock_style))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    Gauge::default()
        .gauge_style(Style::default().fg(accent(state)))
        .ratio(state.progress().clamp(0.0, 1.0))
        .label("")
        .render(chunks[5], buf);

    Paragraph::new(Line::from(vec![
        Span::styled(format!("Session {}", state.session_number), bold_style),
        Span::raw("   "),
        Span::styled(
            format!("🍅 {} today", state.completed_focus_count),
            bold_style,
        ),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[6], buf);

    let controls = format!(
        "(space) {}  (r) Reset  (s) Settings  (q) Quit",
        start_label(state)
    );
    Paragraph::new(Span::styled(controls, dim_style.add_modifier(Modifier::ITALIC)))
        .alignment(Alignment::Center)
        .render(chunks[8], buf);

    if let Some(status) = &app.status {
        Paragraph::new(Span::styled(status.as_str(), Style::default().fg(Color::Yellow)))
            .alignment(Alignment::Center)
            .render(chunks[9], buf);
    }
}

fn render_settings<S: KeyValueStore, C: Clock, A: Alerts>(
    app: &App<S, C, A>,
    area: Rect,
    buf: &mut Buffer,
) {
    let settings = app.controller.state().settings;
    let on_off = |flag: bool| (if flag { "ON" } else { "OFF" }).to_string();

    let rows: Vec<Line> = SettingsField::ALL
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let selected = idx == app.form.selected;
            let value = match (field, selected, &app.form.editing) {
                (SettingsField::Duration(_), true, Some(typed)) => format!("{typed}_"),
                (SettingsField::Duration(session_type), _, _) => {
                    settings.minutes_for(*session_type).to_string()
                }
                (SettingsField::Sound, _, _) => on_off(settings.sound_enabled),
                (SettingsField::Notifications, _, _) => on_off(settings.notifications_enabled),
            };
            let style = if selected {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(format!("{:<20}", field.label()), style),
                Span::styled(value, style),
            ])
        })
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(SettingsField::ALL.len() as u16 + 2),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    Paragraph::new(rows)
        .block(Block::default().borders(Borders::ALL).title("Settings"))
        .render(chunks[0], buf);

    if let Some(status) = &app.status {
        Paragraph::new(Span::styled(status.as_str(), Style::default().fg(Color::Yellow)))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
    }

    Paragraph::new("↑/↓ select | ←/→ ±1 min | (enter) edit/toggle | (esc) back")
        .block(Block::default().borders(Borders::ALL))
        .style(
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        )
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
}
