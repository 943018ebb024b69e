//! Error types for host capabilities.
//!
//! None of these escape a [`PlaybackSession`](crate::session::PlaybackSession):
//! the session logs them and degrades. They exist so host implementations can
//! report what went wrong and so the session can tell the cases apart.

use thiserror::Error;

use crate::host::{NodeId, Param};

/// Failures from the audio output capability.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The host has no audio output at all.
    #[error("no audio output device available")]
    Unavailable,

    /// The context exists but refused to start producing sound.
    #[error("audio context could not be resumed: {0}")]
    Resume(String),

    /// `stop` was requested on an oscillator that already has a stop time.
    #[error("oscillator {0} has already been stopped")]
    AlreadyStopped(NodeId),

    /// The node id does not name a node of the expected kind.
    #[error("unknown audio node {0}")]
    UnknownNode(NodeId),

    /// The node exists but has no such automatable parameter.
    #[error("audio node {node} has no {param:?} parameter")]
    ParamMismatch { node: NodeId, param: Param },

    /// The control queue to the audio thread is full.
    #[error("audio command queue is full")]
    QueueFull,

    /// The output stream could not be built.
    #[error("audio stream error: {0}")]
    Stream(String),
}

/// Failures from the speech capability.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("utterance rejected: {0}")]
    Rejected(String),
}

/// Failures from the repeating-timer capability.
#[derive(Debug, Error)]
pub enum TimerError {
    #[error("interval could not be scheduled: {0}")]
    Schedule(String),
}

/// Any capability failure.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Speech(#[from] SpeechError),

    #[error(transparent)]
    Timer(#[from] TimerError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
