//! Observation sources.
//!
//! Defines the `ObservationSource` trait and the built-in Gaussian
//! mean-shift simulator used to drive the monitor in simulation runs.

pub mod simulated;

use anyhow::Result;
use async_trait::async_trait;

/// Abstraction over streams of scalar observations.
///
/// One value per call; `Ok(None)` signals that the stream is exhausted
/// and the monitor should stop. Implementations own their cursor and RNG
/// state, so producing a value takes `&mut self`.
#[async_trait]
pub trait ObservationSource: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Produce the next observation, or `Ok(None)` at end of stream.
    async fn next_observation(&mut self) -> Result<Option<f64>>;
}
