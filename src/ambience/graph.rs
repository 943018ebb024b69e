//! Synthesis graph for the chord pad.
//!
//! ```text
//!   osc 0 (sine)     ──→ gain 0.18 ─┐
//!   osc 1 (triangle) ──→ gain 0.10 ─┼──→ low-pass 1800 Hz ──→ master (0) ──→ output
//!   osc 2 (sine)     ──→ gain 0.08 ─┘
//! ```
//!
//! Oscillators start as soon as the graph is built; the master gain holds
//! them at silence until a fade-in is scheduled.

use tracing::error;

use crate::{
    ambience::chords::Chord,
    config::PadConfig,
    error::AudioError,
    host::{AudioContext, Destination, NodeId, Param},
};

/// One oscillator and its fixed-weight gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthVoice {
    pub oscillator: NodeId,
    pub gain: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisGraph {
    master: NodeId,
    filter: NodeId,
    voices: [SynthVoice; 3],
}

impl SynthesisGraph {
    pub fn build<C: AudioContext>(ctx: &mut C, pad: &PadConfig) -> Result<Self, AudioError> {
        let master = ctx.create_gain(0.0)?;
        ctx.connect(master, Destination::Output)?;

        let filter = ctx.create_lowpass(pad.filter_cutoff_hz, pad.filter_q)?;
        ctx.connect(filter, master.into())?;

        let now = ctx.current_time();
        let mut voices = [SynthVoice {
            oscillator: master,
            gain: master,
        }; 3];
        for (slot, (&waveform, &weight)) in voices
            .iter_mut()
            .zip(pad.waveforms.iter().zip(&pad.voice_gains))
        {
            let oscillator = ctx.create_oscillator(waveform, pad.initial_frequency_hz)?;
            let gain = ctx.create_gain(weight)?;
            ctx.connect(oscillator, gain.into())?;
            ctx.connect(gain, filter.into())?;
            ctx.start(oscillator, now)?;
            *slot = SynthVoice { oscillator, gain };
        }

        Ok(Self {
            master,
            filter,
            voices,
        })
    }

    pub fn master(&self) -> NodeId {
        self.master
    }

    pub fn filter(&self) -> NodeId {
        self.filter
    }

    pub fn voices(&self) -> &[SynthVoice; 3] {
        &self.voices
    }

    /// Glide every voice toward its tone in `chord`, replacing any glide
    /// still in flight.
    pub fn retune<C: AudioContext>(
        &self,
        ctx: &mut C,
        chord: &Chord,
        time_constant: f32,
    ) -> Result<(), AudioError> {
        let now = ctx.current_time();
        for (voice, target) in self.voices.iter().zip(chord.tones()) {
            ctx.cancel_scheduled_values(voice.oscillator, Param::Frequency, now)?;
            ctx.set_target_at_time(voice.oscillator, Param::Frequency, target, now, time_constant)?;
        }
        Ok(())
    }

    /// Approach `target` on the master gain.
    pub fn ramp_master<C: AudioContext>(
        &self,
        ctx: &mut C,
        target: f32,
        time_constant: f32,
    ) -> Result<(), AudioError> {
        let now = ctx.current_time();
        ctx.set_target_at_time(self.master, Param::Gain, target, now, time_constant)
    }

    /// Fade to silence and schedule every oscillator to stop.
    ///
    /// Each stop is attempted on its own; a failure is logged and the
    /// remaining voices still get their stop. Returns how many stops failed.
    pub fn release<C: AudioContext>(self, ctx: &mut C, pad: &PadConfig) -> usize {
        let now = ctx.current_time();
        if let Err(err) = ctx.cancel_scheduled_values(self.master, Param::Gain, now) {
            error!(%err, "failed to cancel master gain ramps");
        }
        let fade_out = pad.fade_out_secs;
        if let Err(err) = ctx.set_target_at_time(self.master, Param::Gain, 0.0, now, fade_out) {
            error!(%err, "failed to schedule master fade-out");
        }

        let stop_at = now + f64::from(pad.stop_grace_secs);
        let mut failures = 0;
        for (index, voice) in self.voices.iter().enumerate() {
            if let Err(err) = ctx.stop(voice.oscillator, stop_at) {
                error!(voice = index, %err, "failed to stop oscillator");
                failures += 1;
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ambience::chords::chord_at, host::render::Renderer};

    const SAMPLE_RATE: f32 = 48_000.0;

    fn render_seconds(renderer: &mut Renderer, seconds: f32) -> Vec<f32> {
        let mut out = vec![0.0f32; (seconds * SAMPLE_RATE) as usize];
        renderer.render_block(&mut out);
        out
    }

    #[test]
    fn builds_silent_graph_with_running_oscillators() {
        let mut renderer = Renderer::new(SAMPLE_RATE);
        let graph = SynthesisGraph::build(&mut renderer, &PadConfig::default()).unwrap();

        // master, filter, then an oscillator and gain per voice
        assert_eq!(renderer.node_count(), 8);
        assert_eq!(renderer.param_value(graph.master(), Param::Gain), Some(0.0));

        let out = render_seconds(&mut renderer, 0.1);
        assert!(out.iter().all(|&s| s == 0.0));
        assert!(graph
            .voices()
            .iter()
            .all(|v| renderer.is_sounding(v.oscillator)));
    }

    #[test]
    fn voice_gains_follow_config() {
        let mut renderer = Renderer::new(SAMPLE_RATE);
        let graph = SynthesisGraph::build(&mut renderer, &PadConfig::default()).unwrap();

        let gains: Vec<f32> = graph
            .voices()
            .iter()
            .filter_map(|v| renderer.param_value(v.gain, Param::Gain))
            .collect();
        assert_eq!(gains, vec![0.18, 0.10, 0.08]);
    }

    #[test]
    fn audible_once_master_ramps() {
        let mut renderer = Renderer::new(SAMPLE_RATE);
        let graph = SynthesisGraph::build(&mut renderer, &PadConfig::default()).unwrap();
        graph.ramp_master(&mut renderer, 0.14, 0.05).unwrap();

        let out = render_seconds(&mut renderer, 0.5);
        let peak = out.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        assert!(peak > 0.01 && peak < 0.14, "peak {peak}");
    }

    #[test]
    fn retune_glides_to_chord_tones() {
        let mut renderer = Renderer::new(SAMPLE_RATE);
        let graph = SynthesisGraph::build(&mut renderer, &PadConfig::default()).unwrap();
        let chord = chord_at(1);
        graph.retune(&mut renderer, chord, 0.05).unwrap();

        render_seconds(&mut renderer, 0.02);
        let gliding = renderer
            .param_value(graph.voices()[0].oscillator, Param::Frequency)
            .unwrap();
        assert!(gliding < 440.0 && gliding > chord.root);

        render_seconds(&mut renderer, 1.0);
        for (voice, tone) in graph.voices().iter().zip(chord.tones()) {
            let hz = renderer.param_value(voice.oscillator, Param::Frequency).unwrap();
            assert!((hz - tone).abs() < 0.01, "expected {tone}, got {hz}");
        }
    }

    #[test]
    fn release_stops_every_voice_after_grace() {
        let mut renderer = Renderer::new(SAMPLE_RATE);
        let pad = PadConfig::default();
        let graph = SynthesisGraph::build(&mut renderer, &pad).unwrap();
        let voices = *graph.voices();

        assert_eq!(graph.release(&mut renderer, &pad), 0);
        render_seconds(&mut renderer, 1.0);
        assert!(voices.iter().all(|v| renderer.is_sounding(v.oscillator)));

        render_seconds(&mut renderer, 0.3);
        assert!(voices.iter().all(|v| !renderer.is_sounding(v.oscillator)));
    }

    #[test]
    fn release_keeps_going_past_a_failed_stop() {
        let mut renderer = Renderer::new(SAMPLE_RATE);
        let pad = PadConfig::default();
        let graph = SynthesisGraph::build(&mut renderer, &pad).unwrap();
        let voices = *graph.voices();
        renderer.stop(voices[1].oscillator, 0.0).unwrap();

        assert_eq!(graph.release(&mut renderer, &pad), 1);
        render_seconds(&mut renderer, 1.3);
        assert!(!renderer.is_sounding(voices[0].oscillator));
        assert!(!renderer.is_sounding(voices[2].oscillator));
    }
}
