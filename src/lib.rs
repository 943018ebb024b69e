pub mod ambience; // Chord pad graph and cadence
pub mod config;
pub mod dsp;
pub mod error;
pub mod host; // Capability traits and their implementations
pub mod narration;
pub mod session; // Idle → Playing → TornDown lifecycle

pub use config::SessionConfig;
pub use error::{AudioError, Error, SpeechError, TimerError};
pub use session::{PlaybackSession, SessionState};

pub const MAX_BLOCK_SIZE: usize = 2048;
