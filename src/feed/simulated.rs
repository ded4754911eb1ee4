//! Gaussian mean-shift simulator.
//!
//! Draws observations from N(mu0, sigma^2) before the configured change
//! point and from N(mu1, sigma^2) from the change point onward. The feed
//! is infinite; a change point of `None` keeps it in the pre-change
//! regime forever, which is what false-alarm evaluation runs need.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use super::ObservationSource;
use crate::types::{ModelParameters, Regime};

/// Simulated observation stream with a single mean shift.
pub struct GaussianShiftFeed {
    pre: Normal<f64>,
    post: Normal<f64>,
    change_point: Option<u64>,
    /// Index of the next observation to produce
    cursor: u64,
    rng: StdRng,
}

impl GaussianShiftFeed {
    /// Create a feed seeded from entropy.
    pub fn new(model: ModelParameters, change_point: Option<u64>) -> Result<Self> {
        Self::build(model, change_point, StdRng::from_entropy())
    }

    /// Create with a specific seed for reproducible simulations.
    pub fn with_seed(
        model: ModelParameters,
        change_point: Option<u64>,
        seed: u64,
    ) -> Result<Self> {
        Self::build(model, change_point, StdRng::seed_from_u64(seed))
    }

    fn build(model: ModelParameters, change_point: Option<u64>, rng: StdRng) -> Result<Self> {
        let pre = Normal::new(model.mu0, model.sigma)
            .context("invalid pre-change distribution")?;
        let post = Normal::new(model.mu1, model.sigma)
            .context("invalid post-change distribution")?;
        Ok(Self {
            pre,
            post,
            change_point,
            cursor: 0,
            rng,
        })
    }

    /// Regime the next observation will be drawn from.
    pub fn regime(&self) -> Regime {
        Regime::at(self.cursor, self.change_point)
    }

    /// Index of the next observation to produce.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Draw the next observation and advance the cursor.
    pub fn next_value(&mut self) -> f64 {
        let value = match self.regime() {
            Regime::PreChange => self.pre.sample(&mut self.rng),
            Regime::PostChange => self.post.sample(&mut self.rng),
        };
        self.cursor += 1;
        value
    }
}

#[async_trait]
impl ObservationSource for GaussianShiftFeed {
    fn name(&self) -> &str {
        "gaussian-shift"
    }

    async fn next_observation(&mut self) -> Result<Option<f64>> {
        Ok(Some(self.next_value()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_feed(change_point: Option<u64>, seed: u64) -> GaussianShiftFeed {
        GaussianShiftFeed::with_seed(ModelParameters::default(), change_point, seed).unwrap()
    }

    #[test]
    fn test_deterministic_with_seed() {
        let mut a = make_feed(Some(50), 42);
        let mut b = make_feed(Some(50), 42);
        for _ in 0..200 {
            assert_eq!(a.next_value(), b.next_value());
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut a = make_feed(None, 1);
        let mut b = make_feed(None, 2);
        let xs: Vec<f64> = (0..20).map(|_| a.next_value()).collect();
        let ys: Vec<f64> = (0..20).map(|_| b.next_value()).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn test_regime_switches_at_change_point() {
        let mut feed = make_feed(Some(10), 7);
        for t in 0..10 {
            assert_eq!(feed.regime(), Regime::PreChange, "t={t}");
            feed.next_value();
        }
        assert_eq!(feed.cursor(), 10);
        assert_eq!(feed.regime(), Regime::PostChange);
    }

    #[test]
    fn test_no_change_point_stays_pre_change() {
        let mut feed = make_feed(None, 7);
        for _ in 0..500 {
            feed.next_value();
        }
        assert_eq!(feed.regime(), Regime::PreChange);
    }

    #[test]
    fn test_pre_change_sample_mean() {
        let mut feed = make_feed(None, 11);
        let n = 5000;
        let sum: f64 = (0..n).map(|_| feed.next_value()).sum();
        let mean = sum / n as f64;
        // mu0 = 0, sigma = 1: sample mean lands well inside ±0.1
        assert!(mean.abs() < 0.1, "pre-change mean drifted to {mean}");
    }

    #[test]
    fn test_post_change_sample_mean() {
        let mut feed = make_feed(Some(0), 11);
        let n = 5000;
        let sum: f64 = (0..n).map(|_| feed.next_value()).sum();
        let mean = sum / n as f64;
        assert!(
            (mean - 2.0).abs() < 0.1,
            "post-change mean drifted to {mean}"
        );
    }

    #[tokio::test]
    async fn test_source_never_exhausts() {
        let mut feed = make_feed(Some(5), 3);
        assert_eq!(feed.name(), "gaussian-shift");
        for _ in 0..20 {
            let obs = feed.next_observation().await.unwrap();
            assert!(obs.is_some());
        }
    }
}
