//! Chord cadence for the pad.
//!
//! Activation glides to chord 0 and starts the master fade-in, then arms a
//! repeating interval. Each tick glides to the next chord in the table:
//! indices run 1, 2, 3, 0, 1, … so after `n` ticks the pad sits on chord
//! `n mod 4`.

use tracing::debug;

use crate::{
    ambience::{
        chords::{chord_at, CHORDS},
        graph::SynthesisGraph,
    },
    config::PadConfig,
    error::{AudioError, Error},
    host::{AudioContext, Ticker, TimerHandle},
};

#[derive(Debug)]
pub struct ChordScheduler {
    timer: TimerHandle,
    next_index: usize,
    ticks: u64,
}

impl ChordScheduler {
    /// Apply chord 0, begin the fade-in and arm the interval.
    pub fn start<C: AudioContext, T: Ticker>(
        ctx: &mut C,
        graph: &SynthesisGraph,
        ticker: &mut T,
        pad: &PadConfig,
    ) -> Result<Self, Error> {
        graph.retune(ctx, chord_at(0), pad.glide_secs)?;
        graph.ramp_master(ctx, pad.target_gain, pad.fade_in_secs)?;
        let timer = ticker.set_interval(pad.chord_period)?;

        debug!(chord = chord_at(0).name, ?timer, "chord cadence armed");
        Ok(Self {
            timer,
            next_index: 1,
            ticks: 0,
        })
    }

    pub fn timer(&self) -> TimerHandle {
        self.timer
    }

    /// Index of the chord currently sounding (or gliding in).
    pub fn current_index(&self) -> usize {
        (self.next_index + CHORDS.len() - 1) % CHORDS.len()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Glide to the next chord. Returns the index applied.
    pub fn tick<C: AudioContext>(
        &mut self,
        ctx: &mut C,
        graph: &SynthesisGraph,
        pad: &PadConfig,
    ) -> Result<usize, AudioError> {
        let index = self.next_index;
        let chord = chord_at(index);
        graph.retune(ctx, chord, pad.glide_secs)?;

        self.next_index = (index + 1) % CHORDS.len();
        self.ticks += 1;
        debug!(index, chord = chord.name, "chord change");
        Ok(index)
    }

    /// Clear the interval. Consumes the scheduler so it happens once.
    pub fn stop<T: Ticker>(self, ticker: &mut T) {
        ticker.clear_interval(self.timer);
        debug!(timer = ?self.timer, ticks = self.ticks, "chord cadence cleared");
    }
}
