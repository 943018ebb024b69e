//! Automatable control values.

/*
Smoothed Approach
=================

`set_target_at_time(target, start, τ)` schedules an exponential approach:

    v(t) = target + (v₀ - target) · e^(-(t - t₀) / τ)

where t₀ is when the event takes over and v₀ the value at that moment. The
curve is evaluated in closed form, in f64, every sample. A per-sample f32
one-pole step drops below f32 resolution at audio rates and stalls a few
cents short of the target.

The curve moves toward the target monotonically and never overshoots. After
about 5τ it is within 1% of the target. This is the anti-click policy for
every gain and frequency change in the pad: nothing ever jumps.

Events are kept sorted by start time. Once an event's start time passes it
replaces whichever event was running; the approach then continues from the
value reached so far.

`cancel_scheduled_values(from)` discards pending events starting at or after
`from` and stops the running approach, holding the value where it is.
*/

const MAX_PENDING: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
struct TargetEvent {
    target: f32,
    start: f64,
    time_constant: f32,
}

/// A target event that has taken over, anchored where it began.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Approach {
    event: TargetEvent,
    from_value: f64,
    from_time: f64,
}

impl Approach {
    fn value_at(&self, now: f64) -> f64 {
        let target = f64::from(self.event.target);
        let elapsed = (now - self.from_time).max(0.0);
        let decay = (-elapsed / f64::from(self.event.time_constant)).exp();
        target + (self.from_value - target) * decay
    }
}

#[derive(Debug, Clone)]
pub struct AudioParam {
    value: f32,
    active: Option<Approach>,
    pending: Vec<TargetEvent>,
}

impl AudioParam {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            active: None,
            pending: Vec::with_capacity(MAX_PENDING),
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn set_target_at_time(&mut self, target: f32, start: f64, time_constant: f32) {
        let event = TargetEvent {
            target,
            start,
            time_constant,
        };
        let index = self.pending.partition_point(|e| e.start <= start);
        self.pending.insert(index, event);
    }

    pub fn cancel_scheduled_values(&mut self, from: f64) {
        self.pending.retain(|e| e.start < from);
        self.active = None;
    }

    /// Value for the sample at time `now`.
    #[inline]
    pub fn advance(&mut self, now: f64) -> f32 {
        while self.pending.first().is_some_and(|e| e.start <= now) {
            let event = self.pending.remove(0);
            self.active = Some(Approach {
                event,
                from_value: f64::from(self.value),
                from_time: now,
            });
        }

        if let Some(approach) = self.active {
            if approach.event.time_constant <= 0.0 {
                self.value = approach.event.target;
                self.active = None;
            } else {
                self.value = approach.value_at(now) as f32;
            }
        }

        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn run_at(param: &mut AudioParam, sample_rate: f32, from: f64, seconds: f64) -> Vec<f32> {
        let dt = 1.0 / f64::from(sample_rate);
        let frames = (seconds * f64::from(sample_rate)) as usize;
        (0..frames)
            .map(|i| param.advance(from + i as f64 * dt))
            .collect()
    }

    fn run(param: &mut AudioParam, from: f64, seconds: f64) -> Vec<f32> {
        run_at(param, SAMPLE_RATE, from, seconds)
    }

    #[test]
    fn approach_is_monotonic_and_bounded() {
        let mut param = AudioParam::new(0.0);
        param.set_target_at_time(0.14, 0.0, 3.2);

        let trace = run(&mut param, 0.0, 20.0);
        assert!(trace.windows(2).all(|w| w[1] >= w[0]));
        assert!(trace.iter().all(|&v| v <= 0.14));
        assert!(trace.last().copied().unwrap_or_default() > 0.13);
    }

    #[test]
    fn one_time_constant_covers_most_of_the_distance() {
        let mut param = AudioParam::new(440.0);
        param.set_target_at_time(220.0, 0.0, 1.6);

        let trace = run(&mut param, 0.0, 1.6);
        let reached = trace.last().copied().unwrap_or_default();
        let expected = 220.0 + 220.0 * (-1.0f32).exp();
        assert!(
            (reached - expected).abs() < 1.0,
            "expected ~{expected}, got {reached}"
        );
    }

    #[test]
    fn event_waits_for_its_start_time() {
        let mut param = AudioParam::new(1.0);
        param.set_target_at_time(0.0, 1.0, 0.1);

        let before = run(&mut param, 0.0, 0.5);
        assert!(before.iter().all(|&v| v == 1.0));

        let after = run(&mut param, 1.0, 1.0);
        assert!(after.last().copied().unwrap_or(1.0) < 0.01);
    }

    #[test]
    fn cancel_holds_current_value() {
        let mut param = AudioParam::new(0.0);
        param.set_target_at_time(1.0, 0.0, 0.5);
        let trace = run(&mut param, 0.0, 0.5);
        let held = trace.last().copied().unwrap_or_default();

        param.cancel_scheduled_values(0.5);
        let after = run(&mut param, 0.5, 1.0);
        assert!(after.iter().all(|&v| v == held));
    }

    #[test]
    fn newer_target_supersedes_running_one() {
        let mut param = AudioParam::new(0.14);
        param.set_target_at_time(0.5, 0.0, 0.2);
        run(&mut param, 0.0, 0.1);

        param.set_target_at_time(0.0, 0.1, 0.2);
        let trace = run(&mut param, 0.1, 3.0);
        assert!(trace.windows(2).all(|w| w[1] <= w[0]));
        assert!(trace.last().copied().unwrap_or(1.0) < 0.001);
    }

    #[test]
    fn zero_time_constant_jumps() {
        let mut param = AudioParam::new(3.0);
        param.set_target_at_time(7.0, 0.0, 0.0);
        assert_eq!(param.advance(0.0), 7.0);
        assert_eq!(param.advance(0.001), 7.0);
    }

    #[test]
    fn slow_glide_settles_on_the_target_at_audio_rate() {
        let mut param = AudioParam::new(440.0);
        param.set_target_at_time(261.63, 0.0, 1.6);

        let trace = run_at(&mut param, 48_000.0, 0.0, 9.0);
        assert!(trace.windows(2).all(|w| w[1] <= w[0]));

        // 9 s is 5.625 τ; the curve leaves 178.37 · e^-5.625 ≈ 0.64 Hz
        let reached = trace.last().copied().unwrap_or_default();
        let expected = 261.63 + 178.37 * (-9.0f32 / 1.6).exp();
        assert!(
            (reached - expected).abs() < 0.01,
            "expected ~{expected}, got {reached}"
        );

        let settled = run_at(&mut param, 48_000.0, 9.0, 21.0);
        let last = settled.last().copied().unwrap_or_default();
        assert!((last - 261.63).abs() < 0.001, "stalled at {last}");
    }
}
