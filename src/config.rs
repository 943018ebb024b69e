//! Session configuration.
//!
//! `Default` reproduces the shipped vignette: a three-voice pad under a soft
//! low-pass, a 9 second chord cadence and a slowed, lowered Hindi narration.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::Waveform;

/// Hindi narration spoken over the pad.
pub const NARRATION_TEXT: &str = "\
    तेरी मेहनत रात की खामोशी को लहजा देती है। \
    लोगों की फुसफुसाहट बस धुंध है—धक्के मत खाना। \
    ध्यान तेरे काम पर है। \
    एक हल्की साँस ले, और रोशनी को अपने अंदर आने दे। \
    कल सुबह जब शहर जागेगा, तेरी कोशिश उनके सवालों का जवाब बन चुकी होगी।";

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionConfig {
    pub pad: PadConfig,
    pub narration: NarrationConfig,
}

/// Shape of the synthesized chord pad.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PadConfig {
    /// Timbre of each voice; voice `i` plays chord tone `i`.
    pub waveforms: [Waveform; 3],
    /// Fixed per-voice gain before the shared filter.
    pub voice_gains: [f32; 3],
    /// Frequency the oscillators are created at, before the first glide.
    pub initial_frequency_hz: f32,
    pub filter_cutoff_hz: f32,
    pub filter_q: f32,
    /// Master loudness once faded in.
    pub target_gain: f32,
    /// Time constant of the master fade-in, in seconds.
    pub fade_in_secs: f32,
    /// Time constant of each chord glide, in seconds.
    pub glide_secs: f32,
    pub chord_period: Duration,
    /// Time constant of the teardown fade, in seconds.
    pub fade_out_secs: f32,
    /// Delay between teardown and the oscillators stopping, in seconds.
    pub stop_grace_secs: f32,
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            waveforms: [Waveform::Sine, Waveform::Triangle, Waveform::Sine],
            voice_gains: [0.18, 0.10, 0.08],
            initial_frequency_hz: 440.0,
            filter_cutoff_hz: 1_800.0,
            filter_q: 0.9,
            target_gain: 0.14,
            fade_in_secs: 3.2,
            glide_secs: 1.6,
            chord_period: Duration::from_millis(9_000),
            fade_out_secs: 0.8,
            stop_grace_secs: 1.2,
        }
    }
}

/// What is spoken and how the voice is chosen.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationConfig {
    pub text: String,
    /// Language tag put on the utterance.
    pub lang: String,
    /// Prefix a voice's language tag must carry to count as the target language.
    pub voice_lang_prefix: String,
    /// Speaking rate relative to the host default.
    pub rate: f32,
    /// Pitch relative to the host default.
    pub pitch: f32,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            text: NARRATION_TEXT.to_string(),
            lang: "hi-IN".to_string(),
            voice_lang_prefix: "hi".to_string(),
            rate: 0.9,
            pitch: 0.85,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_vignette() {
        let config = SessionConfig::default();

        assert_eq!(config.pad.voice_gains, [0.18, 0.10, 0.08]);
        assert_eq!(
            config.pad.waveforms,
            [Waveform::Sine, Waveform::Triangle, Waveform::Sine]
        );
        assert_eq!(config.pad.chord_period, Duration::from_secs(9));
        assert_eq!(config.narration.lang, "hi-IN");
        assert!(config.narration.text.starts_with("तेरी मेहनत"));
    }
}
