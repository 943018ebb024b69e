//! Scene event loop.

use std::{
    sync::mpsc::Receiver,
    time::{Duration, Instant},
};

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    DefaultTerminal, Frame,
};
use tracing::info;

use vignette::{
    host::{
        output::{CpalBackend, LevelMeter},
        ticker::ThreadTicker,
        TimerHandle,
    },
    PlaybackSession, SessionConfig,
};

use crate::{
    captions::{caption_voices, CaptionBoard, CaptionHost},
    ui::{self, Status},
};

type Session = PlaybackSession<CpalBackend, CaptionHost, ThreadTicker>;

pub struct Scene {
    session: Session,
    ticks: Receiver<TimerHandle>,
    captions: CaptionBoard,
    meter: LevelMeter,
    /// Set once the user leaves; the loop keeps drawing until then.
    leaving_at: Option<Instant>,
}

impl Scene {
    pub fn new(config: SessionConfig) -> Self {
        let audio = CpalBackend::new();
        let meter = audio.meter();
        let (speech, captions) = CaptionHost::new();
        let (ticker, ticks) = ThreadTicker::new();

        Self {
            session: PlaybackSession::new(config, audio, speech, ticker),
            ticks,
            captions,
            meter,
            leaving_at: None,
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        loop {
            terminal.draw(|frame| self.render(frame))?;

            if !self.captions.is_populated() {
                self.captions.populate(caption_voices());
            }

            while let Ok(handle) = self.ticks.try_recv() {
                self.session.on_tick(handle);
            }

            if let Some(deadline) = self.leaving_at {
                if Instant::now() >= deadline {
                    return Ok(());
                }
            }

            // Handle keyboard input (non-blocking, ~60fps)
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Enter | KeyCode::Char(' ') => self.session.start(),
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.leave(),
            _ => {}
        }
    }

    /// Tear down and give the fade its grace period before exiting.
    fn leave(&mut self) {
        if self.leaving_at.is_some() {
            return;
        }
        self.session.teardown();
        let grace = Duration::from_secs_f32(self.session.config().pad.stop_grace_secs);
        info!(?grace, "leaving scene");
        self.leaving_at = Some(Instant::now() + grace);
    }

    fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Min(6),    // Caption
                Constraint::Length(3), // Status
                Constraint::Length(3), // Level
                Constraint::Length(1), // Help bar
            ])
            .split(frame.area());

        let caption = self.captions.caption();
        let voice = self.session.selected_voice();
        let status = Status {
            state: self.session.state(),
            chord: self.session.current_chord(),
            voice: voice.as_ref().map(|v| v.name.as_str()),
            sample_rate: self.session.context_mut().map(|ctx| ctx.sample_rate()),
        };
        let full_scale = self.session.config().pad.target_gain;

        ui::render_title(frame, chunks[0]);
        ui::render_caption(frame, chunks[1], caption.as_ref(), status.state);
        ui::render_status(frame, chunks[2], &status);
        ui::render_meter(frame, chunks[3], self.meter.peak(), full_scale);
        ui::render_help(frame, chunks[4]);
    }
}
