//! Thread-backed repeating timer.
//!
//! Each interval runs on its own thread and posts its [`TimerHandle`] to a
//! channel the host event loop drains. Clearing an interval drops its cancel
//! sender, which wakes the thread out of `recv_timeout` so it exits at once
//! instead of after its next period.

use std::{
    collections::HashMap,
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    thread,
    time::Duration,
};

use tracing::{trace, warn};

use crate::{
    error::TimerError,
    host::{Ticker, TimerHandle},
};

pub struct ThreadTicker {
    ticks: Sender<TimerHandle>,
    next: u64,
    running: HashMap<TimerHandle, Sender<()>>,
}

impl ThreadTicker {
    /// Create a ticker and the receiving end its ticks arrive on.
    pub fn new() -> (Self, Receiver<TimerHandle>) {
        let (ticks, rx) = mpsc::channel();
        (
            Self {
                ticks,
                next: 0,
                running: HashMap::new(),
            },
            rx,
        )
    }

    pub fn active(&self) -> usize {
        self.running.len()
    }
}

impl Ticker for ThreadTicker {
    fn set_interval(&mut self, period: Duration) -> Result<TimerHandle, TimerError> {
        let handle = TimerHandle(self.next);
        self.next += 1;

        let (cancel, cancelled) = mpsc::channel::<()>();
        let ticks = self.ticks.clone();
        thread::Builder::new()
            .name(format!("vignette-interval-{}", handle.0))
            .spawn(move || loop {
                match cancelled.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => {
                        trace!(?handle, "interval fired");
                        if ticks.send(handle).is_err() {
                            break;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|err| TimerError::Schedule(err.to_string()))?;

        self.running.insert(handle, cancel);
        Ok(handle)
    }

    fn clear_interval(&mut self, handle: TimerHandle) {
        if self.running.remove(&handle).is_none() {
            warn!(?handle, "cleared an interval that was not running");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_fires_repeatedly_until_cleared() {
        let (mut ticker, rx) = ThreadTicker::new();
        let handle = ticker.set_interval(Duration::from_millis(5)).unwrap();

        for _ in 0..3 {
            let fired = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            assert_eq!(fired, handle);
        }

        ticker.clear_interval(handle);
        assert_eq!(ticker.active(), 0);

        // drain anything already in flight, then expect silence
        while rx.recv_timeout(Duration::from_millis(20)).is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn handles_are_distinct() {
        let (mut ticker, _rx) = ThreadTicker::new();
        let a = ticker.set_interval(Duration::from_secs(60)).unwrap();
        let b = ticker.set_interval(Duration::from_secs(60)).unwrap();
        assert_ne!(a, b);
        assert_eq!(ticker.active(), 2);
    }
}
