//! Narration voice selection.
//!
//! Priority, first match wins:
//!
//! 1. a voice in the target language whose name marks it as male
//! 2. the first voice in the target language
//! 3. the first voice whose language tag merely contains the prefix
//! 4. nothing, and the host speaks with its default voice
//!
//! "Target language" means the tag starts with the configured prefix (`hi`),
//! compared case-insensitively. The male check is only applied inside the
//! target-language set. Names are matched on whole words, so "Female" is not
//! a male voice.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use regex::Regex;
use tracing::debug;

use crate::{
    host::{SpeechHost, SubscriptionId},
    narration::VoiceDescriptor,
};

const MALE_PATTERN: &str = r"(?i)\b(?:male|man)\b|पुरुष";

fn male_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(MALE_PATTERN).expect("male voice pattern is valid"))
}

/// Pick the best voice for `lang_prefix` from `voices`.
pub fn select_voice<'a>(
    voices: &'a [VoiceDescriptor],
    lang_prefix: &str,
) -> Option<&'a VoiceDescriptor> {
    let prefix = lang_prefix.to_lowercase();
    let in_language = |v: &&VoiceDescriptor| v.lang.to_lowercase().starts_with(&prefix);

    voices
        .iter()
        .filter(in_language)
        .find(|v| male_pattern().is_match(&v.name))
        .or_else(|| voices.iter().find(in_language))
        .or_else(|| {
            voices
                .iter()
                .find(|v| v.lang.to_lowercase().contains(&prefix))
        })
}

type Preference = Arc<Mutex<Option<VoiceDescriptor>>>;

fn lock(preference: &Preference) -> MutexGuard<'_, Option<VoiceDescriptor>> {
    preference.lock().unwrap_or_else(PoisonError::into_inner)
}

fn reselect(preference: &Preference, voices: &[VoiceDescriptor], lang_prefix: &str) {
    // An empty directory is "not loaded yet", not "no voices".
    if voices.is_empty() {
        return;
    }
    let selected = select_voice(voices, lang_prefix).cloned();
    debug!(
        voices = voices.len(),
        selected = selected.as_ref().map(|v| v.name.as_str()),
        "narration voice selected"
    );
    *lock(preference) = selected;
}

/// Keeps the preferred narration voice current as the host's directory
/// loads or changes. Selection only affects the next dispatch.
pub struct VoiceSelector {
    lang_prefix: String,
    preference: Preference,
    subscription: Option<SubscriptionId>,
}

impl VoiceSelector {
    pub fn new(lang_prefix: impl Into<String>) -> Self {
        Self {
            lang_prefix: lang_prefix.into(),
            preference: Arc::new(Mutex::new(None)),
            subscription: None,
        }
    }

    /// Select from the voices known now and subscribe to later changes.
    pub fn attach<S: SpeechHost>(&mut self, speech: &mut S) {
        if self.subscription.is_some() {
            return;
        }
        reselect(&self.preference, &speech.voices(), &self.lang_prefix);

        let preference = Arc::clone(&self.preference);
        let lang_prefix = self.lang_prefix.clone();
        let id = speech.subscribe(Box::new(move |voices| {
            reselect(&preference, voices, &lang_prefix);
        }));
        self.subscription = Some(id);
    }

    /// Stop listening for directory changes.
    pub fn detach<S: SpeechHost>(&mut self, speech: &mut S) {
        if let Some(id) = self.subscription.take() {
            speech.unsubscribe(id);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn current(&self) -> Option<VoiceDescriptor> {
        lock(&self.preference).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::recording::RecordingSpeech;

    fn voice(lang: &str, name: &str) -> VoiceDescriptor {
        VoiceDescriptor::new(lang, name)
    }

    fn selected_name(voices: &[VoiceDescriptor]) -> Option<&str> {
        select_voice(voices, "hi").map(|v| v.name.as_str())
    }

    #[test]
    fn male_hindi_voice_wins() {
        let voices = [
            voice("en-US", "Zira"),
            voice("hi-IN", "Hindi Female"),
            voice("hi-IN", "Hindi Male"),
        ];
        assert_eq!(selected_name(&voices), Some("Hindi Male"));
    }

    #[test]
    fn first_hindi_voice_without_male_match() {
        let voices = [voice("en-US", "Zira"), voice("hi-IN", "Hindi Female")];
        assert_eq!(selected_name(&voices), Some("Hindi Female"));
    }

    #[test]
    fn devanagari_and_man_tokens_count_as_male() {
        let voices = [voice("hi-IN", "Lekha"), voice("HI-in", "आवाज़ पुरुष")];
        assert_eq!(selected_name(&voices), Some("आवाज़ पुरुष"));

        let voices = [voice("hi-IN", "Lekha"), voice("hi-IN", "Old MAN voice")];
        assert_eq!(selected_name(&voices), Some("Old MAN voice"));
    }

    #[test]
    fn male_match_outside_target_language_is_ignored() {
        let voices = [voice("en-GB", "Daniel Male"), voice("hi-IN", "Lekha")];
        assert_eq!(selected_name(&voices), Some("Lekha"));
    }

    #[test]
    fn loose_fallback_matches_substring() {
        let voices = [voice("en-US", "Zira"), voice("x-chi", "Chirp")];
        assert_eq!(selected_name(&voices), Some("Chirp"));
    }

    #[test]
    fn nothing_suitable_selects_nothing() {
        assert_eq!(selected_name(&[voice("en-US", "Zira")]), None);
        assert_eq!(selected_name(&[]), None);
    }

    #[test]
    fn selector_follows_directory_changes() {
        let (mut speech, probe) = RecordingSpeech::new();
        let mut selector = VoiceSelector::new("hi");
        selector.attach(&mut speech);
        assert_eq!(selector.current(), None);

        probe.announce(vec![voice("hi-IN", "Hindi Female")]);
        assert_eq!(selector.current().map(|v| v.name), Some("Hindi Female".into()));

        probe.announce(vec![voice("hi-IN", "Hindi Female"), voice("hi-IN", "Hindi Male")]);
        assert_eq!(selector.current().map(|v| v.name), Some("Hindi Male".into()));

        // an empty notification keeps the last good choice
        probe.announce(Vec::new());
        assert_eq!(selector.current().map(|v| v.name), Some("Hindi Male".into()));
    }

    #[test]
    fn detach_unsubscribes() {
        let (mut speech, probe) = RecordingSpeech::new();
        let mut selector = VoiceSelector::new("hi");
        selector.attach(&mut speech);
        selector.attach(&mut speech);
        assert_eq!(probe.listener_count(), 1);

        selector.detach(&mut speech);
        assert!(!selector.is_attached());
        assert_eq!(probe.listener_count(), 0);

        probe.announce(vec![voice("hi-IN", "Hindi Male")]);
        assert_eq!(selector.current(), None);
    }
}
