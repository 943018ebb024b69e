//! Spoken narration: picking a voice and dispatching the utterance.

pub mod controller;
pub mod voice;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use controller::NarrationController;
pub use voice::{select_voice, VoiceSelector};

/// A narration voice as listed by the host. Owned by the host directory;
/// the engine only reads and clones it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceDescriptor {
    /// BCP 47 language tag, e.g. `hi-IN`.
    pub lang: String,
    /// Display name, e.g. `Microsoft Madhur - Hindi (India)`.
    pub name: String,
}

impl VoiceDescriptor {
    pub fn new(lang: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            name: name.into(),
        }
    }
}

/// One complete speech request.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
    /// `None` lets the host pick its default voice for `lang`.
    pub voice: Option<VoiceDescriptor>,
}
