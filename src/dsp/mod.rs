//! Low-level DSP primitives used by the host renderer.
//!
//! These components are allocation-free on the render path, so they can sit
//! directly inside render nodes. They stay focused on the signal math; the
//! renderer in [`crate::host::render`] wires them into a graph.

/// State-variable low-pass filter.
pub mod filter;
/// Oscillator waveforms.
pub mod oscillator;
/// Automatable values with exponential target ramps.
pub mod param;

pub use oscillator::Waveform;
pub use param::AudioParam;
