//! Block renderer for node graphs built through [`AudioContext`].
//!
//! The renderer is both an offline context (tests, benches) and the engine
//! that runs inside the cpal output callback, where it is fed [`Command`]s
//! from the control thread.

use crate::{
    dsp::{filter::SVFilter, oscillator::Oscillator, AudioParam, Waveform},
    error::AudioError,
    host::{AudioBackend, AudioContext, Command, Destination, NodeId, Param},
};

/*
Graph Evaluation
================

Nodes are evaluated one sample at a time in topological order, so a node
always sees this sample's output of everything feeding it:

    osc ──→ gain ─┐
    osc ──→ gain ─┼──→ lowpass ──→ master ──→ Output
    osc ──→ gain ─┘

Each node keeps its output for the current sample in `signal`; a node's input
is the sum of the signals of the nodes connected into it. Nodes caught in a
cycle never get an order slot and stay silent.

The order is rebuilt lazily after a create or connect. Rebuilding happens on
the render thread, so it only works in scratch space sized when nodes are
created and never allocates.
*/

const INITIAL_NODE_CAPACITY: usize = 16;

enum NodeKind {
    Oscillator {
        osc: Oscillator,
        frequency: AudioParam,
        start_at: Option<f64>,
        stop_at: Option<f64>,
    },
    Gain {
        gain: AudioParam,
    },
    Lowpass {
        filter: SVFilter,
    },
}

struct RenderNode {
    kind: NodeKind,
    inputs: Vec<usize>,
}

pub struct Renderer {
    sample_rate: f32,
    frame: u64,
    nodes: Vec<RenderNode>,
    outputs: Vec<usize>,
    order: Vec<usize>,
    signal: Vec<f32>,
    dirty: bool,
    // Scratch for rebuild_order, one slot per node.
    unresolved: Vec<usize>,
    ready: Vec<usize>,
    ordered: Vec<bool>,
}

impl Renderer {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            frame: 0,
            nodes: Vec::with_capacity(INITIAL_NODE_CAPACITY),
            outputs: Vec::with_capacity(INITIAL_NODE_CAPACITY),
            order: Vec::with_capacity(INITIAL_NODE_CAPACITY),
            signal: Vec::with_capacity(INITIAL_NODE_CAPACITY),
            dirty: false,
            unresolved: Vec::with_capacity(INITIAL_NODE_CAPACITY),
            ready: Vec::with_capacity(INITIAL_NODE_CAPACITY),
            ordered: Vec::with_capacity(INITIAL_NODE_CAPACITY),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Apply one control command. Node ids are assigned in creation order, so
    /// a create command must carry the next free id.
    pub fn apply(&mut self, command: Command) -> Result<(), AudioError> {
        match command {
            Command::CreateOscillator {
                id,
                waveform,
                frequency,
            } => self.push_node(
                id,
                NodeKind::Oscillator {
                    osc: Oscillator::new(waveform),
                    frequency: AudioParam::new(frequency),
                    start_at: None,
                    stop_at: None,
                },
            ),
            Command::CreateGain { id, value } => self.push_node(
                id,
                NodeKind::Gain {
                    gain: AudioParam::new(value),
                },
            ),
            Command::CreateLowpass { id, cutoff_hz, q } => self.push_node(
                id,
                NodeKind::Lowpass {
                    filter: SVFilter::lowpass(cutoff_hz, q),
                },
            ),
            Command::Connect { from, to } => {
                self.node(from)?;
                match to {
                    Destination::Output => self.outputs.push(from.0),
                    Destination::Node(target) => {
                        self.node_mut(target)?.inputs.push(from.0);
                    }
                }
                self.dirty = true;
                Ok(())
            }
            Command::Start { id, at } => match &mut self.node_mut(id)?.kind {
                NodeKind::Oscillator { start_at, .. } => {
                    *start_at = Some(at);
                    Ok(())
                }
                _ => Err(AudioError::UnknownNode(id)),
            },
            Command::Stop { id, at } => match &mut self.node_mut(id)?.kind {
                NodeKind::Oscillator { stop_at, .. } => {
                    if stop_at.is_some() {
                        return Err(AudioError::AlreadyStopped(id));
                    }
                    *stop_at = Some(at);
                    Ok(())
                }
                _ => Err(AudioError::UnknownNode(id)),
            },
            Command::SetTarget {
                id,
                param,
                target,
                at,
                time_constant,
            } => {
                self.param_mut(id, param)?
                    .set_target_at_time(target, at, time_constant);
                Ok(())
            }
            Command::CancelScheduled { id, param, from } => {
                self.param_mut(id, param)?.cancel_scheduled_values(from);
                Ok(())
            }
        }
    }

    /// Current value of an automatable parameter.
    pub fn param_value(&self, id: NodeId, param: Param) -> Option<f32> {
        match (&self.nodes.get(id.0)?.kind, param) {
            (NodeKind::Oscillator { frequency, .. }, Param::Frequency) => Some(frequency.value()),
            (NodeKind::Gain { gain }, Param::Gain) => Some(gain.value()),
            _ => None,
        }
    }

    /// Whether an oscillator produces signal at the current time.
    pub fn is_sounding(&self, id: NodeId) -> bool {
        let now = self.current_time();
        match self.nodes.get(id.0).map(|n| &n.kind) {
            Some(NodeKind::Oscillator {
                start_at, stop_at, ..
            }) => Self::gate(*start_at, *stop_at, now),
            _ => false,
        }
    }

    /// Render mono samples into `out`, advancing the clock.
    pub fn render_block(&mut self, out: &mut [f32]) {
        if self.dirty {
            self.rebuild_order();
        }

        let sample_rate = self.sample_rate;

        for sample in out.iter_mut() {
            let now = self.frame as f64 / sample_rate as f64;

            for k in 0..self.order.len() {
                let index = self.order[k];
                let input: f32 = self.nodes[index]
                    .inputs
                    .iter()
                    .map(|&j| self.signal[j])
                    .sum();

                let value = match &mut self.nodes[index].kind {
                    NodeKind::Oscillator {
                        osc,
                        frequency,
                        start_at,
                        stop_at,
                    } => {
                        let hz = frequency.advance(now);
                        if Self::gate(*start_at, *stop_at, now) {
                            osc.next_sample(hz, sample_rate)
                        } else {
                            0.0
                        }
                    }
                    NodeKind::Gain { gain } => input * gain.advance(now),
                    NodeKind::Lowpass { filter } => filter.next_sample(input, sample_rate),
                };
                self.signal[index] = value;
            }

            *sample = self.outputs.iter().map(|&o| self.signal[o]).sum();
            self.frame += 1;
        }
    }

    #[inline]
    fn gate(start_at: Option<f64>, stop_at: Option<f64>, now: f64) -> bool {
        start_at.is_some_and(|s| now >= s) && stop_at.map_or(true, |s| now < s)
    }

    fn push_node(&mut self, id: NodeId, kind: NodeKind) -> Result<(), AudioError> {
        if id.0 != self.nodes.len() {
            return Err(AudioError::UnknownNode(id));
        }
        self.nodes.push(RenderNode {
            kind,
            inputs: Vec::new(),
        });
        self.signal.push(0.0);
        self.unresolved.push(0);
        self.ordered.push(false);
        let count = self.nodes.len();
        self.ready.reserve(count.saturating_sub(self.ready.len()));
        self.order.reserve(count.saturating_sub(self.order.len()));
        self.dirty = true;
        Ok(())
    }

    fn node(&self, id: NodeId) -> Result<&RenderNode, AudioError> {
        self.nodes.get(id.0).ok_or(AudioError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut RenderNode, AudioError> {
        self.nodes.get_mut(id.0).ok_or(AudioError::UnknownNode(id))
    }

    fn param_mut(&mut self, id: NodeId, param: Param) -> Result<&mut AudioParam, AudioError> {
        match (&mut self.node_mut(id)?.kind, param) {
            (NodeKind::Oscillator { frequency, .. }, Param::Frequency) => Ok(frequency),
            (NodeKind::Gain { gain }, Param::Gain) => Ok(gain),
            _ => Err(AudioError::ParamMismatch { node: id, param }),
        }
    }

    fn rebuild_order(&mut self) {
        for (unresolved, node) in self.unresolved.iter_mut().zip(&self.nodes) {
            *unresolved = node.inputs.len();
        }
        self.ordered.fill(false);
        self.order.clear();
        self.ready.clear();
        self.ready
            .extend((0..self.nodes.len()).filter(|&i| self.unresolved[i] == 0));

        while let Some(index) = self.ready.pop() {
            self.order.push(index);
            self.ordered[index] = true;
            for (dependent, node) in self.nodes.iter().enumerate() {
                for &input in &node.inputs {
                    if input == index {
                        self.unresolved[dependent] -= 1;
                        if self.unresolved[dependent] == 0 {
                            self.ready.push(dependent);
                        }
                    }
                }
            }
        }

        for (signal, &ordered) in self.signal.iter_mut().zip(&self.ordered) {
            if !ordered {
                *signal = 0.0;
            }
        }
        self.dirty = false;
    }
}

impl AudioContext for Renderer {
    fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn create_oscillator(
        &mut self,
        waveform: Waveform,
        frequency: f32,
    ) -> Result<NodeId, AudioError> {
        let id = NodeId(self.nodes.len());
        self.apply(Command::CreateOscillator {
            id,
            waveform,
            frequency,
        })?;
        Ok(id)
    }

    fn create_gain(&mut self, value: f32) -> Result<NodeId, AudioError> {
        let id = NodeId(self.nodes.len());
        self.apply(Command::CreateGain { id, value })?;
        Ok(id)
    }

    fn create_lowpass(&mut self, cutoff_hz: f32, q: f32) -> Result<NodeId, AudioError> {
        let id = NodeId(self.nodes.len());
        self.apply(Command::CreateLowpass { id, cutoff_hz, q })?;
        Ok(id)
    }

    fn connect(&mut self, from: NodeId, to: Destination) -> Result<(), AudioError> {
        self.apply(Command::Connect { from, to })
    }

    fn start(&mut self, oscillator: NodeId, at: f64) -> Result<(), AudioError> {
        self.apply(Command::Start { id: oscillator, at })
    }

    fn stop(&mut self, oscillator: NodeId, at: f64) -> Result<(), AudioError> {
        self.apply(Command::Stop { id: oscillator, at })
    }

    fn set_target_at_time(
        &mut self,
        node: NodeId,
        param: Param,
        target: f32,
        at: f64,
        time_constant: f32,
    ) -> Result<(), AudioError> {
        self.apply(Command::SetTarget {
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
        self.apply(Command::CancelScheduled {
            id: node,
            param,
            from,
        })
    }
}

/// Hands out fresh [`Renderer`]s; for running a session without a device.
#[derive(Debug, Clone, Copy)]
pub struct OfflineBackend {
    pub sample_rate: f32,
}

impl OfflineBackend {
    pub fn new(sample_rate: f32) -> Self {
        Self { sample_rate }
    }
}

impl AudioBackend for OfflineBackend {
    type Context = Renderer;

    fn acquire(&mut self) -> Result<Renderer, AudioError> {
        Ok(Renderer::new(self.sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn peak(buffer: &[f32]) -> f32 {
        buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    #[test]
    fn renders_silence_with_empty_graph() {
        let mut renderer = Renderer::new(SAMPLE_RATE);
        let mut out = vec![1.0f32; 256];
        renderer.render_block(&mut out);

        assert!(out.iter().all(|&s| s == 0.0));
        assert!((renderer.current_time() - 256.0 / 48_000.0).abs() < 1e-9);
    }

    #[test]
    fn oscillator_through_gain_reaches_output() {
        let mut renderer = Renderer::new(SAMPLE_RATE);
        let osc = renderer.create_oscillator(Waveform::Sine, 440.0).unwrap();
        let gain = renderer.create_gain(0.5).unwrap();
        renderer.connect(osc, gain.into()).unwrap();
        renderer.connect(gain, Destination::Output).unwrap();
        renderer.start(osc, 0.0).unwrap();

        let mut out = vec![0.0f32; 480];
        renderer.render_block(&mut out);

        let level = peak(&out);
        assert!((level - 0.5).abs() < 0.01, "expected ~0.5, got {level}");
    }

    #[test]
    fn evaluation_order_ignores_creation_order() {
        // Master is created before the oscillator that feeds it.
        let mut renderer = Renderer::new(SAMPLE_RATE);
        let master = renderer.create_gain(1.0).unwrap();
        renderer.connect(master, Destination::Output).unwrap();
        let osc = renderer.create_oscillator(Waveform::Square, 100.0).unwrap();
        renderer.connect(osc, master.into()).unwrap();
        renderer.start(osc, 0.0).unwrap();

        let mut out = vec![0.0f32; 4];
        renderer.render_block(&mut out);
        assert_eq!(out[0], 1.0);
    }

    #[test]
    fn unstarted_oscillator_is_silent() {
        let mut renderer = Renderer::new(SAMPLE_RATE);
        let osc = renderer.create_oscillator(Waveform::Sine, 440.0).unwrap();
        renderer.connect(osc, Destination::Output).unwrap();

        let mut out = vec![0.0f32; 256];
        renderer.render_block(&mut out);
        assert_eq!(peak(&out), 0.0);
        assert!(!renderer.is_sounding(osc));
    }

    #[test]
    fn stop_takes_effect_at_its_time_and_only_once() {
        let mut renderer = Renderer::new(SAMPLE_RATE);
        let osc = renderer.create_oscillator(Waveform::Square, 100.0).unwrap();
        renderer.connect(osc, Destination::Output).unwrap();
        renderer.start(osc, 0.0).unwrap();
        renderer.stop(osc, 0.01).unwrap();

        assert!(matches!(
            renderer.stop(osc, 0.02),
            Err(AudioError::AlreadyStopped(id)) if id == osc
        ));

        let mut out = vec![0.0f32; 960];
        renderer.render_block(&mut out);
        assert!(peak(&out[..480]) > 0.9);
        assert_eq!(peak(&out[480..]), 0.0);
        assert!(!renderer.is_sounding(osc));
    }

    #[test]
    fn frequency_automation_glides() {
        let mut renderer = Renderer::new(SAMPLE_RATE);
        let osc = renderer.create_oscillator(Waveform::Sine, 440.0).unwrap();
        renderer.start(osc, 0.0).unwrap();
        renderer
            .set_target_at_time(osc, Param::Frequency, 220.0, 0.0, 0.1)
            .unwrap();

        let mut out = vec![0.0f32; 4_800];
        renderer.render_block(&mut out);
        let mid = renderer.param_value(osc, Param::Frequency).unwrap();
        assert!(mid < 440.0 && mid > 220.0);

        let mut out = vec![0.0f32; 48_000];
        renderer.render_block(&mut out);
        let settled = renderer.param_value(osc, Param::Frequency).unwrap();
        assert!((settled - 220.0).abs() < 0.01);
    }

    #[test]
    fn wrong_param_kind_is_rejected() {
        let mut renderer = Renderer::new(SAMPLE_RATE);
        let gain = renderer.create_gain(0.0).unwrap();
        assert!(matches!(
            renderer.set_target_at_time(gain, Param::Frequency, 1.0, 0.0, 0.1),
            Err(AudioError::ParamMismatch { param: Param::Frequency, .. })
        ));
        assert!(renderer.start(gain, 0.0).is_err());
        assert!(renderer.connect(NodeId(9), gain.into()).is_err());
    }

    #[test]
    fn cycles_render_silence() {
        let mut renderer = Renderer::new(SAMPLE_RATE);
        let a = renderer.create_gain(1.0).unwrap();
        let b = renderer.create_gain(1.0).unwrap();
        renderer.connect(a, b.into()).unwrap();
        renderer.connect(b, a.into()).unwrap();
        renderer.connect(b, Destination::Output).unwrap();

        let mut out = vec![0.0f32; 64];
        renderer.render_block(&mut out);
        assert_eq!(peak(&out), 0.0);
    }
}
