//! Shiryaev-Roberts sequential change-point detection.
//!
//! Maintains the running statistic `R_t = (1 + R_{t-1}) * lr(x_t)` over a
//! stream of scalar observations and raises a detection whenever `R_t`
//! crosses the configured threshold, resetting the statistic to zero
//! afterwards (the classical SR restart).
//!
//! The prior parameters (alpha, rho, pi) are carried in configuration and
//! exposed via [`ChangeDetector::priors`], but the recursion does not
//! consume them: the reported posterior is the normalisation `R/(1+R)`,
//! a bounded evidence indicator rather than a Bayesian posterior.

use tracing::{debug, warn};

use crate::types::{
    DetectorError, DetectorSnapshot, HistoryRecord, ModelParameters, PriorParameters,
};

// ---------------------------------------------------------------------------
// Likelihood ratio
// ---------------------------------------------------------------------------

/// Clamp for the likelihood-ratio exponent. exp(±700) sits just inside
/// f64 range, so the ratio saturates instead of overflowing to infinity.
const EXPONENT_LIMIT: f64 = 700.0;

/// Likelihood ratio of one observation under the post-change model
/// N(mu1, sigma^2) versus the pre-change model N(mu0, sigma^2).
///
/// The Gaussian normalisation constants cancel, leaving a single
/// exponential in the two squared residuals:
/// `lr = exp( (-(x-mu1)^2 + (x-mu0)^2) / (2*sigma^2) )`.
pub fn likelihood_ratio(x: f64, model: &ModelParameters) -> f64 {
    let d1 = x - model.mu1;
    let d0 = x - model.mu0;
    let exponent = (-d1 * d1 + d0 * d0) / (2.0 * model.sigma * model.sigma);
    exponent.clamp(-EXPONENT_LIMIT, EXPONENT_LIMIT).exp()
}

// ---------------------------------------------------------------------------
// Change detector
// ---------------------------------------------------------------------------

/// Outcome of a single observation update.
#[derive(Debug, Clone, Copy)]
pub struct DetectionUpdate {
    /// Zero-based index of the observation that produced this update
    pub time: u64,
    /// Statistic carried into the next update (0.0 immediately after a
    /// detection)
    pub statistic: f64,
    /// Statistic the recursion produced for this observation, before any
    /// post-detection reset. Equals `statistic` when no detection fired;
    /// on a detection it is the crossing value.
    pub pre_reset: f64,
    /// Normalised evidence `R/(1+R)` of the pre-reset statistic
    pub posterior: f64,
    pub detected: bool,
}

/// Online Shiryaev-Roberts detector over a scalar observation stream.
///
/// One instance per monitored channel. State is owned exclusively by the
/// caller; `update` must not be invoked concurrently.
pub struct ChangeDetector {
    model: ModelParameters,
    priors: PriorParameters,
    threshold: f64,
    statistic: f64,
    observation_count: u64,
    detection_count: u64,
    history: Vec<HistoryRecord>,
}

impl ChangeDetector {
    /// Build a detector with validated parameters.
    ///
    /// Fails with `InvalidConfiguration` if sigma <= 0, the threshold is
    /// not strictly positive, or any parameter is non-finite.
    pub fn new(
        model: ModelParameters,
        priors: PriorParameters,
        threshold: f64,
    ) -> Result<Self, DetectorError> {
        model.validate()?;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(DetectorError::InvalidConfiguration(format!(
                "threshold must be finite and > 0 (got {threshold})"
            )));
        }
        Ok(Self {
            model,
            priors,
            threshold,
            statistic: 0.0,
            observation_count: 0,
            detection_count: 0,
            history: Vec::new(),
        })
    }

    /// Feed one observation through the recursion.
    ///
    /// Non-finite observations are rejected with `InvalidObservation`
    /// before any state changes; every finite observation succeeds. On a
    /// detection the statistic resets to zero, the history row keeps the
    /// crossing value, and the cumulative detection count is bumped.
    pub fn update(&mut self, observation: f64) -> Result<DetectionUpdate, DetectorError> {
        if !observation.is_finite() {
            return Err(DetectorError::InvalidObservation {
                time: self.observation_count,
                value: observation,
            });
        }

        let time = self.observation_count;
        let lr = likelihood_ratio(observation, &self.model);

        // R_t = (1 + R_{t-1}) * lr, saturating instead of overflowing
        let updated = ((1.0 + self.statistic) * lr).min(f64::MAX);
        let posterior = updated / (1.0 + updated);
        let detected = updated >= self.threshold;

        self.history.push(HistoryRecord {
            time,
            observation,
            statistic: updated,
            posterior,
            detected,
        });
        self.observation_count += 1;

        if detected {
            self.detection_count += 1;
            self.statistic = 0.0;
            warn!(
                time,
                crossing = format!("{updated:.4}"),
                threshold = self.threshold,
                "Change detected — statistic reset"
            );
        } else {
            self.statistic = updated;
        }

        debug!(
            time,
            observation = format!("{observation:.4}"),
            lr = format!("{lr:.6}"),
            statistic = format!("{:.6}", self.statistic),
            "Observation processed"
        );

        Ok(DetectionUpdate {
            time,
            statistic: self.statistic,
            pre_reset: updated,
            posterior,
            detected,
        })
    }

    // -- Read accessors --

    pub fn model(&self) -> &ModelParameters {
        &self.model
    }

    pub fn priors(&self) -> &PriorParameters {
        &self.priors
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Current statistic (zero immediately after a detection).
    pub fn statistic(&self) -> f64 {
        self.statistic
    }

    /// Normalised evidence `R/(1+R)` of the current statistic.
    pub fn posterior(&self) -> f64 {
        self.statistic / (1.0 + self.statistic)
    }

    /// Observations processed over the detector's lifetime.
    pub fn observation_count(&self) -> u64 {
        self.observation_count
    }

    /// Detections raised over the detector's lifetime.
    pub fn detection_count(&self) -> u64 {
        self.detection_count
    }

    /// Full per-observation trajectory, oldest first.
    pub fn history(&self) -> &[HistoryRecord] {
        &self.history
    }

    // -- Persistence --

    /// Capture the minimal restart state.
    pub fn snapshot(&self) -> DetectorSnapshot {
        DetectorSnapshot {
            mu0: self.model.mu0,
            mu1: self.model.mu1,
            sigma: self.model.sigma,
            threshold: self.threshold,
            statistic: self.statistic,
            observation_count: self.observation_count,
        }
    }

    /// Rebuild a detector from a snapshot.
    ///
    /// History and the detection count start empty; the recursion itself
    /// continues exactly where the snapshot left off.
    pub fn restore(
        snapshot: &DetectorSnapshot,
        priors: PriorParameters,
    ) -> Result<Self, DetectorError> {
        if !snapshot.statistic.is_finite() || snapshot.statistic < 0.0 {
            return Err(DetectorError::InvalidConfiguration(format!(
                "snapshot statistic must be finite and >= 0 (got {})",
                snapshot.statistic
            )));
        }
        let mut detector = Self::new(snapshot.model(), priors, snapshot.threshold)?;
        detector.statistic = snapshot.statistic;
        detector.observation_count = snapshot.observation_count;
        Ok(detector)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
