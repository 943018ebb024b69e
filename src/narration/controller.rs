//! Dispatches the narration utterance.

use tracing::info;

use crate::{
    config::NarrationConfig,
    error::SpeechError,
    host::SpeechHost,
    narration::{Utterance, VoiceDescriptor},
};

/// Builds and speaks the narration, keeping at most one utterance live.
///
/// Speech is fire-and-forget: completion is never tracked, so the live
/// handle only clears on [`cancel`](Self::cancel).
pub struct NarrationController {
    config: NarrationConfig,
    live: Option<Utterance>,
}

impl NarrationController {
    pub fn new(config: NarrationConfig) -> Self {
        Self { config, live: None }
    }

    pub fn utterance(&self, voice: Option<VoiceDescriptor>) -> Utterance {
        Utterance {
            text: self.config.text.clone(),
            lang: self.config.lang.clone(),
            rate: self.config.rate,
            pitch: self.config.pitch,
            voice,
        }
    }

    /// Cancel whatever the host is saying, then speak the narration.
    pub fn dispatch<S: SpeechHost>(
        &mut self,
        speech: &mut S,
        voice: Option<VoiceDescriptor>,
    ) -> Result<(), SpeechError> {
        speech.cancel();
        self.live = None;

        let utterance = self.utterance(voice);
        info!(
            lang = %utterance.lang,
            voice = utterance.voice.as_ref().map(|v| v.name.as_str()),
            "dispatching narration"
        );
        speech.speak(utterance.clone())?;
        self.live = Some(utterance);
        Ok(())
    }

    pub fn cancel<S: SpeechHost>(&mut self, speech: &mut S) {
        speech.cancel();
        self.live = None;
    }

    pub fn live(&self) -> Option<&Utterance> {
        self.live.as_ref()
    }
}
