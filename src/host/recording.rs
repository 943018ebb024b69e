//! In-memory hosts that record what the engine asks of them.
//!
//! Each constructor returns the host together with a probe sharing its log,
//! so a test can hand the host to a session and still inspect or steer it.
//! Probes are cheap to clone.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crate::{
    dsp::Waveform,
    error::{AudioError, SpeechError, TimerError},
    host::{
        AudioBackend, AudioContext, Command, Destination, NodeId, Param, SpeechHost,
        SubscriptionId, Ticker, TimerHandle, VoiceListener,
    },
    narration::{Utterance, VoiceDescriptor},
};

fn lock<T>(shared: &Arc<Mutex<T>>) -> MutexGuard<'_, T> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct AudioLog {
    unavailable: bool,
    acquisitions: usize,
    time: f64,
    next_id: usize,
    commands: Vec<Command>,
    oscillators: Vec<NodeId>,
    stop_requests: Vec<NodeId>,
    stopped: HashSet<NodeId>,
    failing_stops: HashSet<usize>,
}

/// Audio backend that records every command instead of rendering.
pub struct RecordingAudio {
    log: Arc<Mutex<AudioLog>>,
}

/// Context handed out by [`RecordingAudio`].
pub struct RecordingContext {
    log: Arc<Mutex<AudioLog>>,
}

#[derive(Clone)]
pub struct AudioProbe {
    log: Arc<Mutex<AudioLog>>,
}

impl RecordingAudio {
    pub fn new() -> (Self, AudioProbe) {
        let log = Arc::new(Mutex::new(AudioLog::default()));
        (
            Self {
                log: Arc::clone(&log),
            },
            AudioProbe { log },
        )
    }

    /// A host with no audio output: every acquire fails.
    pub fn unavailable() -> (Self, AudioProbe) {
        let (audio, probe) = Self::new();
        lock(&audio.log).unavailable = true;
        (audio, probe)
    }
}

impl AudioBackend for RecordingAudio {
    type Context = RecordingContext;

    fn acquire(&mut self) -> Result<RecordingContext, AudioError> {
        let mut log = lock(&self.log);
        log.acquisitions += 1;
        if log.unavailable {
            return Err(AudioError::Unavailable);
        }
        Ok(RecordingContext {
            log: Arc::clone(&self.log),
        })
    }
}

impl RecordingContext {
    fn create(&self, make: impl FnOnce(NodeId) -> Command) -> NodeId {
        let mut log = lock(&self.log);
        let id = NodeId(log.next_id);
        log.next_id += 1;
        let command = make(id);
        if matches!(command, Command::CreateOscillator { .. }) {
            log.oscillators.push(id);
        }
        log.commands.push(command);
        id
    }

    fn record(&self, command: Command) -> Result<(), AudioError> {
        lock(&self.log).commands.push(command);
        Ok(())
    }
}

impl AudioContext for RecordingContext {
    fn current_time(&self) -> f64 {
        lock(&self.log).time
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn create_oscillator(
        &mut self,
        waveform: Waveform,
        frequency: f32,
    ) -> Result<NodeId, AudioError> {
        Ok(self.create(|id| Command::CreateOscillator {
            id,
            waveform,
            frequency,
        }))
    }

    fn create_gain(&mut self, value: f32) -> Result<NodeId, AudioError> {
        Ok(self.create(|id| Command::CreateGain { id, value }))
    }

    fn create_lowpass(&mut self, cutoff_hz: f32, q: f32) -> Result<NodeId, AudioError> {
        Ok(self.create(|id| Command::CreateLowpass { id, cutoff_hz, q }))
    }

    fn connect(&mut self, from: NodeId, to: Destination) -> Result<(), AudioError> {
        self.record(Command::Connect { from, to })
    }

    fn start(&mut self, oscillator: NodeId, at: f64) -> Result<(), AudioError> {
        self.record(Command::Start { id: oscillator, at })
    }

    fn stop(&mut self, oscillator: NodeId, at: f64) -> Result<(), AudioError> {
        let mut log = lock(&self.log);
        log.stop_requests.push(oscillator);

        let ordinal = log.oscillators.iter().position(|&id| id == oscillator);
        let injected = ordinal.is_some_and(|o| log.failing_stops.contains(&o));
        if injected || !log.stopped.insert(oscillator) {
            return Err(AudioError::AlreadyStopped(oscillator));
        }
        log.commands.push(Command::Stop { id: oscillator, at });
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
        self.record(Command::SetTarget {
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
        self.record(Command::CancelScheduled {
            id: node,
            param,
            from,
        })
    }
}

impl AudioProbe {
    pub fn acquisitions(&self) -> usize {
        lock(&self.log).acquisitions
    }

    pub fn commands(&self) -> Vec<Command> {
        lock(&self.log).commands.clone()
    }

    /// Oscillators in creation order.
    pub fn oscillators(&self) -> Vec<NodeId> {
        lock(&self.log).oscillators.clone()
    }

    /// Every stop requested, including the ones that failed.
    pub fn stop_requests(&self) -> Vec<NodeId> {
        lock(&self.log).stop_requests.clone()
    }

    /// Oscillators with a stop scheduled.
    pub fn stopped(&self) -> Vec<NodeId> {
        let log = lock(&self.log);
        log.oscillators
            .iter()
            .copied()
            .filter(|id| log.stopped.contains(id))
            .collect()
    }

    /// Make `stop` fail for the oscillator created `ordinal`-th (from 0).
    pub fn fail_stop(&self, ordinal: usize) {
        lock(&self.log).failing_stops.insert(ordinal);
    }

    /// Move the context clock forward.
    pub fn advance(&self, seconds: f64) {
        lock(&self.log).time += seconds;
    }
}

/// One call on [`RecordingSpeech`].
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEvent {
    Cancel,
    Speak(Utterance),
}

#[derive(Default)]
struct SpeechLog {
    voices: Vec<VoiceDescriptor>,
    listeners: Vec<(SubscriptionId, VoiceListener)>,
    next_subscription: u64,
    events: Vec<SpeechEvent>,
    reject: bool,
}

/// Speech host that records cancels and utterances.
pub struct RecordingSpeech {
    log: Arc<Mutex<SpeechLog>>,
}

#[derive(Clone)]
pub struct SpeechProbe {
    log: Arc<Mutex<SpeechLog>>,
}

impl RecordingSpeech {
    /// A host whose voice directory has not loaded yet.
    pub fn new() -> (Self, SpeechProbe) {
        Self::with_voices(Vec::new())
    }

    pub fn with_voices(voices: Vec<VoiceDescriptor>) -> (Self, SpeechProbe) {
        let log = Arc::new(Mutex::new(SpeechLog {
            voices,
            ..SpeechLog::default()
        }));
        (
            Self {
                log: Arc::clone(&log),
            },
            SpeechProbe { log },
        )
    }
}

impl SpeechHost for RecordingSpeech {
    fn voices(&self) -> Vec<VoiceDescriptor> {
        lock(&self.log).voices.clone()
    }

    fn subscribe(&mut self, listener: VoiceListener) -> SubscriptionId {
        let mut log = lock(&self.log);
        let id = SubscriptionId(log.next_subscription);
        log.next_subscription += 1;
        log.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        lock(&self.log).listeners.retain(|(sub, _)| *sub != id);
    }

    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError> {
        let mut log = lock(&self.log);
        if log.reject {
            return Err(SpeechError::Rejected("speech disabled".into()));
        }
        log.events.push(SpeechEvent::Speak(utterance));
        Ok(())
    }

    fn cancel(&mut self) {
        lock(&self.log).events.push(SpeechEvent::Cancel);
    }
}

impl SpeechProbe {
    /// Replace the voice directory and notify every subscriber.
    pub fn announce(&self, voices: Vec<VoiceDescriptor>) {
        let mut log = lock(&self.log);
        log.voices = voices;
        let SpeechLog {
            voices, listeners, ..
        } = &mut *log;
        for (_, listener) in listeners.iter_mut() {
            listener(voices);
        }
    }

    pub fn events(&self) -> Vec<SpeechEvent> {
        lock(&self.log).events.clone()
    }

    pub fn spoken(&self) -> Vec<Utterance> {
        lock(&self.log)
            .events
            .iter()
            .filter_map(|e| match e {
                SpeechEvent::Speak(u) => Some(u.clone()),
                SpeechEvent::Cancel => None,
            })
            .collect()
    }

    pub fn cancels(&self) -> usize {
        lock(&self.log)
            .events
            .iter()
            .filter(|e| matches!(e, SpeechEvent::Cancel))
            .count()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.log).listeners.len()
    }

    /// Make every following `speak` fail.
    pub fn reject_speech(&self, reject: bool) {
        lock(&self.log).reject = reject;
    }
}

#[derive(Default)]
struct TickerLog {
    next: u64,
    armed: Vec<(TimerHandle, Duration)>,
    cleared: Vec<TimerHandle>,
    failing: bool,
}

/// Ticker that never fires on its own; tests deliver ticks by hand.
pub struct ManualTicker {
    log: Arc<Mutex<TickerLog>>,
}

#[derive(Clone)]
pub struct TickerProbe {
    log: Arc<Mutex<TickerLog>>,
}

impl ManualTicker {
    pub fn new() -> (Self, TickerProbe) {
        let log = Arc::new(Mutex::new(TickerLog::default()));
        (
            Self {
                log: Arc::clone(&log),
            },
            TickerProbe { log },
        )
    }
}

impl Ticker for ManualTicker {
    fn set_interval(&mut self, period: Duration) -> Result<TimerHandle, TimerError> {
        let mut log = lock(&self.log);
        if log.failing {
            return Err(TimerError::Schedule("timers disabled".into()));
        }
        let handle = TimerHandle(log.next);
        log.next += 1;
        log.armed.push((handle, period));
        Ok(handle)
    }

    fn clear_interval(&mut self, handle: TimerHandle) {
        lock(&self.log).cleared.push(handle);
    }
}

impl TickerProbe {
    /// Every interval ever armed, with its period.
    pub fn armed(&self) -> Vec<(TimerHandle, Duration)> {
        lock(&self.log).armed.clone()
    }

    pub fn cleared(&self) -> Vec<TimerHandle> {
        lock(&self.log).cleared.clone()
    }

    /// Intervals armed and not yet cleared.
    pub fn active(&self) -> Vec<TimerHandle> {
        let log = lock(&self.log);
        log.armed
            .iter()
            .map(|(handle, _)| *handle)
            .filter(|handle| !log.cleared.contains(handle))
            .collect()
    }

    /// Make every following `set_interval` fail.
    pub fn fail_intervals(&self, failing: bool) {
        lock(&self.log).failing = failing;
    }
}
