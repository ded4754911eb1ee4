//! Shared types for the TRIPWIRE monitor.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that detector, feed, monitor,
//! and evaluation modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Model parameters
// ---------------------------------------------------------------------------

/// Parameters of the two hypothesised observation distributions.
///
/// Observations are modelled as normal with a shared standard deviation:
/// N(mu0, sigma^2) before the change, N(mu1, sigma^2) after it. The
/// parameters are fixed for the lifetime of a detector instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Pre-change mean
    pub mu0: f64,
    /// Post-change mean
    pub mu1: f64,
    /// Shared standard deviation (must be > 0)
    pub sigma: f64,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            mu0: 0.0,  // pre-change mean
            mu1: 2.0,  // post-change mean
            sigma: 1.0, // shared std deviation
        }
    }
}

impl fmt::Display for ModelParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N({:.3}, {:.3}²) → N({:.3}, {:.3}²)",
            self.mu0, self.sigma, self.mu1, self.sigma,
        )
    }
}

impl ModelParameters {
    /// The midpoint between the two means. An observation exactly here
    /// carries no evidence either way (likelihood ratio = 1).
    pub fn midpoint(&self) -> f64 {
        (self.mu0 + self.mu1) / 2.0
    }

    /// Mean shift expressed in standard deviations. Larger values make
    /// the change easier to detect.
    pub fn separation(&self) -> f64 {
        (self.mu1 - self.mu0).abs() / self.sigma
    }

    /// Validate the parameters: everything finite, sigma strictly positive.
    pub fn validate(&self) -> Result<(), DetectorError> {
        if !self.mu0.is_finite() || !self.mu1.is_finite() {
            return Err(DetectorError::InvalidConfiguration(format!(
                "means must be finite (mu0={}, mu1={})",
                self.mu0, self.mu1
            )));
        }
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(DetectorError::InvalidConfiguration(format!(
                "sigma must be finite and > 0 (got {})",
                self.sigma
            )));
        }
        Ok(())
    }
}

/// Prior parameters carried alongside the model.
///
/// These are accepted in configuration and exposed to callers, but the
/// statistic recursion does not consume them: the reported posterior is
/// the normalisation R/(1+R), not a Bayesian posterior under these priors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriorParameters {
    /// Geometric prior parameter
    pub alpha: f64,
    /// Conditional change probability
    pub rho: f64,
    /// Initial change probability
    pub pi: f64,
}

impl Default for PriorParameters {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            rho: 0.1,
            pi: 0.1,
        }
    }
}

impl fmt::Display for PriorParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "α={:.3} ρ={:.3} π={:.3}",
            self.alpha, self.rho, self.pi,
        )
    }
}

// ---------------------------------------------------------------------------
// Regime
// ---------------------------------------------------------------------------

/// Which generating distribution a simulated stream is drawing from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regime {
    PreChange,
    PostChange,
}

impl Regime {
    /// The regime in force at time index `t` for a stream whose change
    /// point is `change_point` (None = the stream never changes).
    pub fn at(t: u64, change_point: Option<u64>) -> Self {
        match change_point {
            Some(cp) if t >= cp => Regime::PostChange,
            _ => Regime::PreChange,
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::PreChange => write!(f, "pre-change"),
            Regime::PostChange => write!(f, "post-change"),
        }
    }
}

// ---------------------------------------------------------------------------
// History & events
// ---------------------------------------------------------------------------

/// One appended row of detector history.
///
/// On an alarm step `statistic` holds the crossing value (the statistic
/// before the post-alarm reset), so history preserves the full trajectory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Zero-based observation index
    pub time: u64,
    pub observation: f64,
    pub statistic: f64,
    pub posterior: f64,
    pub detected: bool,
}

impl fmt::Display for HistoryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={} x={:+.4} R={:.4} post={:.4}{}",
            self.time,
            self.observation,
            self.statistic,
            self.posterior,
            if self.detected { " ALARM" } else { "" },
        )
    }
}

/// A threshold crossing raised by the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmEvent {
    /// Zero-based observation index at which the crossing occurred
    pub time: u64,
    /// The observation that triggered the crossing
    pub observation: f64,
    /// Crossing value of the statistic (pre-reset)
    pub statistic: f64,
    pub posterior: f64,
    pub raised_at: DateTime<Utc>,
}

impl fmt::Display for AlarmEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ALARM t={} x={:+.4} R={:.2} post={:.4}",
            self.time, self.observation, self.statistic, self.posterior,
        )
    }
}

/// Summary of a single monitor tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickReport {
    /// Zero-based observation index of this tick
    pub time: u64,
    pub observation: f64,
    /// Statistic after this tick (0.0 immediately after an alarm)
    pub statistic: f64,
    pub posterior: f64,
    pub detected: bool,
    /// Cumulative alarms raised so far, including this tick's
    pub alarm_count: u64,
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tick t={}: x={:+.4} R={:.4} post={:.4} alarms={}{}",
            self.time,
            self.observation,
            self.statistic,
            self.posterior,
            self.alarm_count,
            if self.detected { " [ALARM]" } else { "" },
        )
    }
}

// ---------------------------------------------------------------------------
// Monitor state
// ---------------------------------------------------------------------------

/// Run-level counters owned by the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorState {
    pub ticks: u64,
    pub alarms: u64,
    pub start_time: DateTime<Utc>,
    pub last_alarm_at: Option<DateTime<Utc>>,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ticks={} | alarms={} | alarm_rate={:.4} | uptime={}s",
            self.ticks,
            self.alarms,
            self.alarm_rate(),
            self.uptime().num_seconds(),
        )
    }
}

impl MonitorState {
    pub fn new() -> Self {
        Self {
            ticks: 0,
            alarms: 0,
            start_time: Utc::now(),
            last_alarm_at: None,
        }
    }

    /// Record one alarm: bumps the counter and stamps the time.
    pub fn record_alarm(&mut self) {
        self.alarms += 1;
        self.last_alarm_at = Some(Utc::now());
    }

    /// Alarms per tick. Returns 0.0 before the first tick.
    pub fn alarm_rate(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.alarms as f64 / self.ticks as f64
        }
    }

    /// Uptime duration since monitor start.
    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.start_time
    }
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Minimal restart state of a detector: the model, the threshold, and the
/// two values that evolve (statistic and observation count). History and
/// alarm bookkeeping are deliberately not part of it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectorSnapshot {
    pub mu0: f64,
    pub mu1: f64,
    pub sigma: f64,
    pub threshold: f64,
    pub statistic: f64,
    pub observation_count: u64,
}

impl fmt::Display for DetectorSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R={:.4} after {} observations (A={:.1})",
            self.statistic, self.observation_count, self.threshold,
        )
    }
}

impl DetectorSnapshot {
    /// The model parameters embedded in this snapshot.
    pub fn model(&self) -> ModelParameters {
        ModelParameters {
            mu0: self.mu0,
            mu1: self.mu1,
            sigma: self.sigma,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for TRIPWIRE.
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid observation at t={time}: {value} is not finite")]
    InvalidObservation { time: u64, value: f64 },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
