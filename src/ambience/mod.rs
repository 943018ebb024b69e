//! The ambient chord pad: graph, chord table and cadence.
//!
//! [`Ambience`] owns the audio context together with the graph and scheduler
//! built on it. The three are acquired together and released together, so a
//! graph never exists without its timer or the other way round.

pub mod chords;
pub mod graph;
pub mod scheduler;

pub use chords::{chord_at, Chord, CHORDS};
pub use graph::{SynthVoice, SynthesisGraph};
pub use scheduler::ChordScheduler;

use tracing::{debug, info, warn};

use crate::{
    config::PadConfig,
    error::Error,
    host::{AudioBackend, AudioContext, Ticker, TimerHandle},
};

pub struct Ambience<C: AudioContext> {
    context: C,
    graph: SynthesisGraph,
    scheduler: ChordScheduler,
}

impl<C: AudioContext> Ambience<C> {
    /// Open a context, build the pad on it and start the chord cadence.
    ///
    /// If the cadence cannot be armed the freshly built graph is released
    /// before the error is returned.
    pub fn acquire<B, T>(backend: &mut B, ticker: &mut T, pad: &PadConfig) -> Result<Self, Error>
    where
        B: AudioBackend<Context = C>,
        T: Ticker,
    {
        let mut context = backend.acquire()?;
        context.resume()?;

        let graph = SynthesisGraph::build(&mut context, pad)?;
        let scheduler = match ChordScheduler::start(&mut context, &graph, ticker, pad) {
            Ok(scheduler) => scheduler,
            Err(err) => {
                graph.release(&mut context, pad);
                return Err(err);
            }
        };

        info!(timer = ?scheduler.timer(), "ambience started");
        Ok(Self {
            context,
            graph,
            scheduler,
        })
    }

    /// Advance the cadence if `handle` is this pad's interval.
    ///
    /// Returns the chord index applied, or `None` for a foreign handle or a
    /// failed retune.
    pub fn on_tick(&mut self, handle: TimerHandle, pad: &PadConfig) -> Option<usize> {
        if handle != self.scheduler.timer() {
            debug!(?handle, "ignoring tick from another interval");
            return None;
        }
        match self.scheduler.tick(&mut self.context, &self.graph, pad) {
            Ok(index) => Some(index),
            Err(err) => {
                warn!(%err, "chord change failed");
                None
            }
        }
    }

    /// Fade out, schedule the stops and clear the cadence.
    ///
    /// The context is handed back so the caller can keep it alive while the
    /// fade plays out.
    pub fn release<T: Ticker>(self, ticker: &mut T, pad: &PadConfig) -> C {
        let Self {
            mut context,
            graph,
            scheduler,
        } = self;

        let failures = graph.release(&mut context, pad);
        scheduler.stop(ticker);
        info!(failed_stops = failures, "ambience released");
        context
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn graph(&self) -> &SynthesisGraph {
        &self.graph
    }

    pub fn scheduler(&self) -> &ChordScheduler {
        &self.scheduler
    }
}
