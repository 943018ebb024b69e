//! Real-world scenario benchmarks.
//!
//! These render the full pad graph the way the output callback does.

mod pad;

pub use pad::bench_pad;
