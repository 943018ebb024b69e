//! Playback lifecycle.
//!
//! ```text
//!   Idle ──start──→ Playing ──teardown──→ TornDown
//!     └──────────────teardown──────────────┘
//! ```
//!
//! A session starts narration and the ambient pad on the first trigger and
//! releases both on teardown. Every capability failure is logged and
//! absorbed; nothing here returns an error to the caller.

use std::fmt;

use tracing::{info, warn};

use crate::{
    ambience::{chord_at, Ambience, Chord},
    config::SessionConfig,
    error::{AudioError, Error},
    host::{AudioBackend, SpeechHost, Ticker, TimerHandle},
    narration::{NarrationController, Utterance, VoiceDescriptor, VoiceSelector},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Playing,
    TornDown,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Idle => "idle",
            SessionState::Playing => "playing",
            SessionState::TornDown => "torn down",
        };
        f.write_str(label)
    }
}

pub struct PlaybackSession<A: AudioBackend, S: SpeechHost, T: Ticker> {
    config: SessionConfig,
    state: SessionState,
    audio: A,
    speech: S,
    ticker: T,
    selector: VoiceSelector,
    narration: NarrationController,
    ambience: Option<Ambience<A::Context>>,
    // Kept after teardown so the fade and scheduled stops can still render.
    retired: Option<A::Context>,
}

impl<A: AudioBackend, S: SpeechHost, T: Ticker> PlaybackSession<A, S, T> {
    /// Create an idle session and start tracking the speech host's voices.
    pub fn new(config: SessionConfig, audio: A, mut speech: S, ticker: T) -> Self {
        let mut selector = VoiceSelector::new(config.narration.voice_lang_prefix.clone());
        selector.attach(&mut speech);
        let narration = NarrationController::new(config.narration.clone());

        Self {
            config,
            state: SessionState::Idle,
            audio,
            speech,
            ticker,
            selector,
            narration,
            ambience: None,
            retired: None,
        }
    }

    /// The user trigger. Only the first call from `Idle` does anything.
    pub fn start(&mut self) {
        if self.state != SessionState::Idle {
            info!(state = %self.state, "start ignored");
            return;
        }
        self.state = SessionState::Playing;
        info!("session playing");

        // Narration first: audio acquisition may be slow.
        let voice = self.selector.current();
        if let Err(err) = self.narration.dispatch(&mut self.speech, voice) {
            warn!(%err, "narration dispatch failed");
        }

        match Ambience::acquire(&mut self.audio, &mut self.ticker, &self.config.pad) {
            Ok(ambience) => self.ambience = Some(ambience),
            Err(Error::Audio(AudioError::Unavailable)) => {
                warn!("no audio output; continuing with narration only");
            }
            Err(err) => warn!(%err, "ambience failed to start; continuing with narration only"),
        }
    }

    /// Deliver a tick from the ticker. Ticks for a released or unknown
    /// interval are ignored.
    pub fn on_tick(&mut self, handle: TimerHandle) -> Option<usize> {
        if self.state != SessionState::Playing {
            return None;
        }
        let pad = &self.config.pad;
        self.ambience.as_mut()?.on_tick(handle, pad)
    }

    /// Scene exit. Safe from any state; runs at most once.
    pub fn teardown(&mut self) {
        let previous = self.state;
        if previous == SessionState::TornDown {
            return;
        }
        self.state = SessionState::TornDown;

        if previous == SessionState::Playing {
            self.narration.cancel(&mut self.speech);
        }
        self.selector.detach(&mut self.speech);

        if let Some(ambience) = self.ambience.take() {
            self.retired = Some(ambience.release(&mut self.ticker, &self.config.pad));
        }
        info!(from = %previous, "session torn down");
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Chord the pad is on, while it is running.
    pub fn current_chord(&self) -> Option<&'static Chord> {
        self.ambience
            .as_ref()
            .map(|ambience| chord_at(ambience.scheduler().current_index()))
    }

    /// The running pad, while the session is playing with audio.
    pub fn ambience(&self) -> Option<&Ambience<A::Context>> {
        self.ambience.as_ref()
    }

    /// The running interval, if any.
    pub fn timer(&self) -> Option<TimerHandle> {
        self.ambience
            .as_ref()
            .map(|ambience| ambience.scheduler().timer())
    }

    /// The audio context, live or retired.
    pub fn context_mut(&mut self) -> Option<&mut A::Context> {
        match self.ambience.as_mut() {
            Some(ambience) => Some(ambience.context_mut()),
            None => self.retired.as_mut(),
        }
    }

    /// Voice the next narration dispatch would use.
    pub fn selected_voice(&self) -> Option<VoiceDescriptor> {
        self.selector.current()
    }

    pub fn narration(&self) -> Option<&Utterance> {
        self.narration.live()
    }
}

impl<A: AudioBackend, S: SpeechHost, T: Ticker> Drop for PlaybackSession<A, S, T> {
    fn drop(&mut self) {
        self.teardown();
    }
}
