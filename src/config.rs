//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The model, threshold, and prior sections mirror the detector's
//! construction parameters; the feed and evaluation sections drive the
//! simulated source and the optional startup threshold check.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::types::{ModelParameters, PriorParameters};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub model: ModelConfig,
    pub detection: DetectionConfig,
    pub priors: PriorsConfig,
    pub feed: FeedConfig,
    pub evaluation: EvaluationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    pub name: String,
    pub tick_interval_ms: u64,
}

impl MonitorConfig {
    /// Tick cadence as a `Duration`.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub mu0: f64,
    pub mu1: f64,
    pub sigma: f64,
}

impl ModelConfig {
    pub fn parameters(&self) -> ModelParameters {
        ModelParameters {
            mu0: self.mu0,
            mu1: self.mu1,
            sigma: self.sigma,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    pub threshold: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PriorsConfig {
    pub alpha: f64,
    pub rho: f64,
    pub pi: f64,
}

impl PriorsConfig {
    pub fn parameters(&self) -> PriorParameters {
        PriorParameters {
            alpha: self.alpha,
            rho: self.rho,
            pi: self.pi,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// Tick index at which the simulated stream shifts means.
    /// Omit for a stream that never changes.
    #[serde(default)]
    pub change_point: Option<u64>,
    /// Fixed RNG seed for reproducible runs. Omit for entropy seeding.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EvaluationConfig {
    /// Run the run-length evaluation at startup before monitoring.
    pub enabled: bool,
    pub trials: usize,
    pub horizon: u64,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }
}
