//! Widgets for the vignette scene.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use vignette::{ambience::Chord, narration::Utterance, SessionState};

/// What the status bar shows for one frame.
pub struct Status<'a> {
    pub state: SessionState,
    pub chord: Option<&'static Chord>,
    pub voice: Option<&'a str>,
    pub sample_rate: Option<f32>,
}

pub fn render_title(frame: &mut Frame, area: Rect) {
    let title = Paragraph::new(Line::from(vec![Span::styled(
        "vignette · रात की खामोशी",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, area);
}

/// The narration caption, or a prompt before anything was dispatched.
pub fn render_caption(
    frame: &mut Frame,
    area: Rect,
    caption: Option<&Utterance>,
    state: SessionState,
) {
    let block = Block::default().title(" Narration ").borders(Borders::ALL);

    let text = match (caption, state) {
        (Some(utterance), _) => Line::from(Span::styled(
            utterance.text.clone(),
            Style::default().fg(Color::White),
        )),
        (None, SessionState::Idle) => Line::from(Span::styled(
            "Press Enter to begin.",
            Style::default().fg(Color::DarkGray),
        )),
        (None, _) => Line::from(Span::styled("…", Style::default().fg(Color::DarkGray))),
    };

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

pub fn render_status(frame: &mut Frame, area: Rect, status: &Status<'_>) {
    let block = Block::default().title(" Pad ").borders(Borders::ALL);

    let state_color = match status.state {
        SessionState::Idle => Color::Yellow,
        SessionState::Playing => Color::Green,
        SessionState::TornDown => Color::Red,
    };
    let chord = status.chord.map_or("—", |c| c.name);
    let voice = status.voice.unwrap_or("host default");

    let mut spans = vec![
        Span::styled(format!(" {}  ", status.state), Style::default().fg(state_color)),
        Span::styled(format!("Chord: {chord}  "), Style::default().fg(Color::Cyan)),
        Span::styled(format!("Voice: {voice}  "), Style::default().fg(Color::White)),
    ];
    if let Some(sample_rate) = status.sample_rate {
        spans.push(Span::styled(
            format!("{:.1}kHz", sample_rate / 1000.0),
            Style::default().fg(Color::DarkGray),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

/// Master level, scaled so the pad's full loudness fills the bar.
pub fn render_meter(frame: &mut Frame, area: Rect, peak: f32, full_scale: f32) {
    let ratio = if full_scale > 0.0 {
        (peak / full_scale).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let gauge = Gauge::default()
        .block(Block::default().title(" Level ").borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio(f64::from(ratio))
        .label(format!("{peak:.3}"));
    frame.render_widget(gauge, area);
}

pub fn render_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(" [Enter/Space] Begin  [Q/Esc] Leave")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, area);
}
