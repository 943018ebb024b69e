//! Speech host that shows narration as on-screen captions.
//!
//! The terminal has no speech engine, so "speaking" puts the utterance on a
//! caption board the UI draws every frame. The voice directory starts empty
//! and is filled once the UI is up, the same way a browser announces its
//! voices some time after page load.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use vignette::{
    error::SpeechError,
    host::{SpeechHost, SubscriptionId, VoiceListener},
    narration::{Utterance, VoiceDescriptor},
};

#[derive(Default)]
struct Board {
    voices: Vec<VoiceDescriptor>,
    listeners: Vec<(SubscriptionId, VoiceListener)>,
    next_subscription: u64,
    caption: Option<Utterance>,
}

fn lock(board: &Arc<Mutex<Board>>) -> MutexGuard<'_, Board> {
    board.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct CaptionHost {
    board: Arc<Mutex<Board>>,
}

/// UI-side view of the captions.
#[derive(Clone)]
pub struct CaptionBoard {
    board: Arc<Mutex<Board>>,
}

impl CaptionHost {
    pub fn new() -> (Self, CaptionBoard) {
        let board = Arc::new(Mutex::new(Board::default()));
        (
            Self {
                board: Arc::clone(&board),
            },
            CaptionBoard { board },
        )
    }
}

impl SpeechHost for CaptionHost {
    fn voices(&self) -> Vec<VoiceDescriptor> {
        lock(&self.board).voices.clone()
    }

    fn subscribe(&mut self, listener: VoiceListener) -> SubscriptionId {
        let mut board = lock(&self.board);
        let id = SubscriptionId(board.next_subscription);
        board.next_subscription += 1;
        board.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        lock(&self.board).listeners.retain(|(sub, _)| *sub != id);
    }

    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError> {
        lock(&self.board).caption = Some(utterance);
        Ok(())
    }

    fn cancel(&mut self) {
        lock(&self.board).caption = None;
    }
}

impl CaptionBoard {
    /// Fill the voice directory and tell every subscriber.
    pub fn populate(&self, voices: Vec<VoiceDescriptor>) {
        let mut board = lock(&self.board);
        board.voices = voices;
        let Board {
            voices, listeners, ..
        } = &mut *board;
        for (_, listener) in listeners.iter_mut() {
            listener(voices);
        }
    }

    pub fn is_populated(&self) -> bool {
        !lock(&self.board).voices.is_empty()
    }

    pub fn caption(&self) -> Option<Utterance> {
        lock(&self.board).caption.clone()
    }
}

/// Caption styles offered as voices.
pub fn caption_voices() -> Vec<VoiceDescriptor> {
    vec![
        VoiceDescriptor::new("en-US", "Caption Plain"),
        VoiceDescriptor::new("hi-IN", "Caption Hindi Female"),
        VoiceDescriptor::new("hi-IN", "Caption Hindi Male"),
    ]
}
