use std::f32::consts::PI;

/*
State-Variable Low-Pass
=======================

Topology-preserving (TPT) state-variable filter. Only the low-pass output is
kept: the pad runs every voice through one shared low-pass to round off the
triangle's upper harmonics.

  cutoff_hz   where the roll-off begins (12 dB/octave above it)
  q           resonance; 0.707 is flat, higher values peak at the cutoff

The damping term is k = 1 / q. Cutoff is clamped below Nyquist so the
prewarp `tan` never blows up.
*/

pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    pub cutoff_hz: f32,
    pub q: f32,
}

impl SVFilter {
    pub fn lowpass(cutoff_hz: f32, q: f32) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            cutoff_hz,
            q,
        }
    }

    #[inline]
    fn coefficients(&self, sample_rate: f32) -> (f32, f32) {
        let cutoff = self.cutoff_hz.clamp(10.0, sample_rate * 0.49);
        let g = (PI * cutoff / sample_rate).tan();
        let k = 1.0 / self.q.max(0.05);
        (g, k)
    }

    #[inline]
    fn tick(&mut self, sample: f32, g: f32, k: f32) -> f32 {
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;
        v2
    }

    pub fn next_sample(&mut self, sample: f32, sample_rate: f32) -> f32 {
        let (g, k) = self.coefficients(sample_rate);
        self.tick(sample, g, k)
    }

    pub fn render(&mut self, buffer: &mut [f32], sample_rate: f32) {
        let (g, k) = self.coefficients(sample_rate);
        for sample in buffer.iter_mut() {
            *sample = self.tick(*sample, g, k);
        }
    }
}
