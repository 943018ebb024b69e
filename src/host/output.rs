//! Live audio output through cpal.
//!
//! The control thread never touches the renderer. It allocates node ids
//! locally, checks each request, and pushes [`Command`]s into an `rtrb` ring
//! buffer; the output callback drains the buffer at the top of every block and
//! then renders. The callback also publishes the frame count (the context's
//! clock), the block peak for meters, and a count of commands the renderer
//! refused, which the control thread reports on its next send.

use std::{
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc,
    },
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Producer, RingBuffer};
use tracing::{debug, error, info, warn};

use crate::{
    dsp::Waveform,
    error::AudioError,
    host::{render::Renderer, AudioBackend, AudioContext, Command, Destination, NodeId, Param},
    MAX_BLOCK_SIZE,
};

const COMMAND_CAPACITY: usize = 256;

/// Peak of the most recent output block, shared with the audio thread.
#[derive(Debug, Clone, Default)]
pub struct LevelMeter(Arc<AtomicU32>);

impl LevelMeter {
    pub fn peak(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, peak: f32) {
        self.0.store(peak.to_bits(), Ordering::Relaxed);
    }
}

/// Opens the default output device.
#[derive(Default)]
pub struct CpalBackend {
    meter: LevelMeter,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Meter fed by every context this backend opens.
    pub fn meter(&self) -> LevelMeter {
        self.meter.clone()
    }
}

impl AudioBackend for CpalBackend {
    type Context = CpalContext;

    fn acquire(&mut self) -> Result<CpalContext, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::Unavailable)?;
        let config = device
            .default_output_config()
            .map_err(|err| AudioError::Stream(err.to_string()))?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        info!(sample_rate, channels, "opened audio output");

        let (producer, mut consumer) = RingBuffer::<Command>::new(COMMAND_CAPACITY);
        let frames = Arc::new(AtomicU64::new(0));
        let frames_clock = Arc::clone(&frames);
        let rejected = Arc::new(AtomicU64::new(0));
        let rejected_counter = Arc::clone(&rejected);
        let meter = self.meter.clone();
        let mut renderer = Renderer::new(sample_rate);
        let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _| {
                    while let Ok(command) = consumer.pop() {
                        if renderer.apply(command).is_err() {
                            rejected_counter.fetch_add(1, Ordering::Relaxed);
                        }
                    }

                    let total_frames = data.len() / channels;
                    let mut frames_written = 0;
                    let mut peak = 0.0f32;

                    while frames_written < total_frames {
                        let frames_to_render =
                            (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                        let block = &mut render_buf[..frames_to_render];
                        renderer.render_block(block);

                        // Copy to output (mono to all channels)
                        let out_off = frames_written * channels;
                        for (i, &s) in block.iter().enumerate() {
                            peak = peak.max(s.abs());
                            for ch in 0..channels {
                                data[out_off + i * channels + ch] = s;
                            }
                        }
                        frames_written += frames_to_render;
                    }

                    frames_clock.fetch_add(total_frames as u64, Ordering::Relaxed);
                    meter.store(peak);
                },
                |err| error!(%err, "audio stream error"),
                None,
            )
            .map_err(|err| AudioError::Stream(err.to_string()))?;

        // Held until resume(), like a suspended browser context.
        if let Err(err) = stream.pause() {
            debug!(%err, "output stream cannot pause; it will run from creation");
        }

        Ok(CpalContext {
            stream,
            commands: producer,
            frames,
            sample_rate,
            nodes: NodeTable::default(),
            rejected,
            rejected_seen: 0,
        })
    }
}

pub struct CpalContext {
    stream: cpal::Stream,
    commands: Producer<Command>,
    frames: Arc<AtomicU64>,
    sample_rate: f32,
    nodes: NodeTable,
    rejected: Arc<AtomicU64>,
    rejected_seen: u64,
}

impl CpalContext {
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn send(&mut self, command: Command) -> Result<(), AudioError> {
        let rejected = self.rejected.load(Ordering::Relaxed);
        if rejected > self.rejected_seen {
            warn!(
                count = rejected - self.rejected_seen,
                "audio thread rejected commands"
            );
            self.rejected_seen = rejected;
        }
        self.commands
            .push(command)
            .map_err(|_| AudioError::QueueFull)
    }

    fn create(
        &mut self,
        kind: NodeKind,
        make: impl FnOnce(NodeId) -> Command,
    ) -> Result<NodeId, AudioError> {
        let id = self.nodes.next_id();
        self.send(make(id))?;
        self.nodes.insert(kind);
        Ok(id)
    }
}

/// What the control thread knows about a node it created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Oscillator { stopped: bool },
    Gain,
    Lowpass,
}

/// Control-side mirror of the renderer's node list.
#[derive(Debug, Default)]
struct NodeTable {
    kinds: Vec<NodeKind>,
}

impl NodeTable {
    fn next_id(&self) -> NodeId {
        NodeId(self.kinds.len())
    }

    fn insert(&mut self, kind: NodeKind) {
        self.kinds.push(kind);
    }

    fn kind(&self, id: NodeId) -> Result<NodeKind, AudioError> {
        self.kinds
            .get(id.0)
            .copied()
            .ok_or(AudioError::UnknownNode(id))
    }

    fn oscillator(&self, id: NodeId) -> Result<bool, AudioError> {
        match self.kind(id)? {
            NodeKind::Oscillator { stopped } => Ok(stopped),
            _ => Err(AudioError::UnknownNode(id)),
        }
    }

    fn check_stop(&self, id: NodeId) -> Result<(), AudioError> {
        if self.oscillator(id)? {
            return Err(AudioError::AlreadyStopped(id));
        }
        Ok(())
    }

    fn mark_stopped(&mut self, id: NodeId) {
        if let Some(NodeKind::Oscillator { stopped }) = self.kinds.get_mut(id.0) {
            *stopped = true;
        }
    }

    fn check_param(&self, id: NodeId, param: Param) -> Result<(), AudioError> {
        match (self.kind(id)?, param) {
            (NodeKind::Oscillator { .. }, Param::Frequency) | (NodeKind::Gain, Param::Gain) => {
                Ok(())
            }
            _ => Err(AudioError::ParamMismatch { node: id, param }),
        }
    }
}

impl AudioContext for CpalContext {
    fn current_time(&self) -> f64 {
        self.frames.load(Ordering::Relaxed) as f64 / self.sample_rate as f64
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        self.stream
            .play()
            .map_err(|err| AudioError::Resume(err.to_string()))
    }

    fn create_oscillator(
        &mut self,
        waveform: Waveform,
        frequency: f32,
    ) -> Result<NodeId, AudioError> {
        self.create(NodeKind::Oscillator { stopped: false }, |id| {
            Command::CreateOscillator {
                id,
                waveform,
                frequency,
            }
        })
    }

    fn create_gain(&mut self, value: f32) -> Result<NodeId, AudioError> {
        self.create(NodeKind::Gain, |id| Command::CreateGain { id, value })
    }

    fn create_lowpass(&mut self, cutoff_hz: f32, q: f32) -> Result<NodeId, AudioError> {
        self.create(NodeKind::Lowpass, |id| Command::CreateLowpass {
            id,
            cutoff_hz,
            q,
        })
    }

    fn connect(&mut self, from: NodeId, to: Destination) -> Result<(), AudioError> {
        self.nodes.kind(from)?;
        if let Destination::Node(target) = to {
            self.nodes.kind(target)?;
        }
        self.send(Command::Connect { from, to })
    }

    fn start(&mut self, oscillator: NodeId, at: f64) -> Result<(), AudioError> {
        self.nodes.oscillator(oscillator)?;
        self.send(Command::Start { id: oscillator, at })
    }

    fn stop(&mut self, oscillator: NodeId, at: f64) -> Result<(), AudioError> {
        self.nodes.check_stop(oscillator)?;
        self.send(Command::Stop { id: oscillator, at })?;
        self.nodes.mark_stopped(oscillator);
        Ok(())
    }

    fn set_target_at_time(
        &mut self,
        node: NodeId,
        param: Param,
        target: f32,
        at: f64,
        time_constant: f32,
    ) -> Result<(), AudioError> {
        self.nodes.check_param(node, param)?;
        self.send(Command::SetTarget {
            id: node,
            param,
            target,
            at,
            time_constant,
        })
    }

    fn cancel_scheduled_values(
        &mut self,
        node: NodeId,
        param: Param,
        from: f64,
    ) -> Result<(), AudioError> {
        self.nodes.check_param(node, param)?;
        self.send(Command::CancelScheduled {
            id: node,
            param,
            from,
        })
    }
}
