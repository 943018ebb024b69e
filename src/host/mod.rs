//! Host capabilities the playback engine is written against.
//!
//! The engine never reaches for a global audio device, timer or speech engine.
//! Each one is a trait here and is handed to the
//! [`PlaybackSession`](crate::session::PlaybackSession) at construction, so
//! the same lifecycle runs against cpal, a thread ticker and a caption display
//! in the terminal binary, or against the recording hosts in tests.
//!
//! ```text
//!   AudioBackend::acquire ──→ AudioContext ──→ Renderer (offline or in the cpal callback)
//!   Ticker::set_interval  ──→ TimerHandle  ──→ host event loop ──→ PlaybackSession::on_tick
//!   SpeechHost            ──→ voices / subscribe / speak / cancel
//! ```

use std::{fmt, time::Duration};

#[cfg(feature = "rtrb")]
pub mod output;
pub mod recording;
pub mod render;
pub mod ticker;

use crate::{
    dsp::Waveform,
    error::{AudioError, SpeechError, TimerError},
    narration::{Utterance, VoiceDescriptor},
};

/// Identifies a node inside one audio context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a connection lands: another node's input or the system output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Node(NodeId),
    Output,
}

impl From<NodeId> for Destination {
    fn from(id: NodeId) -> Self {
        Destination::Node(id)
    }
}

/// Automatable parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    /// Gain node level.
    Gain,
    /// Oscillator frequency in Hz.
    Frequency,
}

/// One control operation on an audio context.
///
/// Contexts that render on another thread ship these through a ring buffer;
/// the recording host keeps them as its log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    CreateOscillator {
        id: NodeId,
        waveform: Waveform,
        frequency: f32,
    },
    CreateGain {
        id: NodeId,
        value: f32,
    },
    CreateLowpass {
        id: NodeId,
        cutoff_hz: f32,
        q: f32,
    },
    Connect {
        from: NodeId,
        to: Destination,
    },
    Start {
        id: NodeId,
        at: f64,
    },
    Stop {
        id: NodeId,
        at: f64,
    },
    SetTarget {
        id: NodeId,
        param: Param,
        target: f32,
        at: f64,
        time_constant: f32,
    },
    CancelScheduled {
        id: NodeId,
        param: Param,
        from: f64,
    },
}

/// Source of audio contexts.
pub trait AudioBackend {
    type Context: AudioContext;

    /// Open a context. `AudioError::Unavailable` means the host has no audio
    /// output and the caller should carry on without ambience.
    fn acquire(&mut self) -> Result<Self::Context, AudioError>;
}

/// A live audio processing graph, modelled on a browser audio context.
pub trait AudioContext {
    /// Seconds since the context was created, on the audio clock.
    fn current_time(&self) -> f64;

    /// Unlock output. Contexts may start suspended until this is called.
    fn resume(&mut self) -> Result<(), AudioError>;

    fn create_oscillator(&mut self, waveform: Waveform, frequency: f32)
        -> Result<NodeId, AudioError>;

    fn create_gain(&mut self, value: f32) -> Result<NodeId, AudioError>;

    fn create_lowpass(&mut self, cutoff_hz: f32, q: f32) -> Result<NodeId, AudioError>;

    fn connect(&mut self, from: NodeId, to: Destination) -> Result<(), AudioError>;

    fn start(&mut self, oscillator: NodeId, at: f64) -> Result<(), AudioError>;

    /// Schedule an oscillator to stop. Fails with `AlreadyStopped` if a stop
    /// was already requested.
    fn stop(&mut self, oscillator: NodeId, at: f64) -> Result<(), AudioError>;

    fn set_target_at_time(
        &mut self,
        node: NodeId,
        param: Param,
        target: f32,
        at: f64,
        time_constant: f32,
    ) -> Result<(), AudioError>;

    fn cancel_scheduled_values(
        &mut self,
        node: NodeId,
        param: Param,
        from: f64,
    ) -> Result<(), AudioError>;
}

/// Handle of one repeating interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

/// Repeating-timer capability.
///
/// The ticker only schedules; the host's event loop delivers each tick by
/// calling [`PlaybackSession::on_tick`](crate::session::PlaybackSession::on_tick)
/// on the controlling thread.
pub trait Ticker {
    fn set_interval(&mut self, period: Duration) -> Result<TimerHandle, TimerError>;

    fn clear_interval(&mut self, handle: TimerHandle);
}

/// Handle of one voice-directory subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Callback run with the full voice directory each time it changes.
pub type VoiceListener = Box<dyn FnMut(&[VoiceDescriptor]) + Send>;

/// Speech capability. Shared with the rest of the host, so the engine always
/// cancels before it speaks.
pub trait SpeechHost {
    /// Voices known right now. May be empty until the directory loads.
    fn voices(&self) -> Vec<VoiceDescriptor>;

    fn subscribe(&mut self, listener: VoiceListener) -> SubscriptionId;

    fn unsubscribe(&mut self, id: SubscriptionId);

    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError>;

    /// Drop every pending and in-progress utterance.
    fn cancel(&mut self);
}
