//! Monitor — the tick loop component.
//!
//! Owns one detector and one observation source, advances them one tick
//! at a time, and converts detector updates into per-tick reports and
//! alarm events. The binary's interval loop calls `step` once per tick;
//! tests drive it directly.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::detector::ChangeDetector;
use crate::feed::ObservationSource;
use crate::types::{AlarmEvent, MonitorState, TickReport};

/// Drives one detector over one observation source.
///
/// Instantiate once per monitored channel; call `step` once per tick.
pub struct Monitor {
    detector: ChangeDetector,
    source: Box<dyn ObservationSource>,
    state: MonitorState,
    alarms: Vec<AlarmEvent>,
}

impl Monitor {
    pub fn new(detector: ChangeDetector, source: Box<dyn ObservationSource>) -> Self {
        Self {
            detector,
            source,
            state: MonitorState::new(),
            alarms: Vec::new(),
        }
    }

    /// Advance one tick: pull an observation, update the detector, and
    /// report.
    ///
    /// Returns `Ok(None)` when the source is exhausted. A non-finite
    /// observation surfaces as an error without touching detector state,
    /// so the caller may keep ticking.
    pub async fn step(&mut self) -> Result<Option<TickReport>> {
        let observation = self
            .source
            .next_observation()
            .await
            .with_context(|| format!("observation source '{}' failed", self.source.name()))?;
        let Some(observation) = observation else {
            info!(source = self.source.name(), "Observation source exhausted");
            return Ok(None);
        };

        let update = self.detector.update(observation)?;
        self.state.ticks += 1;

        if update.detected {
            let alarm = AlarmEvent {
                time: update.time,
                observation,
                statistic: update.pre_reset,
                posterior: update.posterior,
                raised_at: Utc::now(),
            };
            warn!(
                time = alarm.time,
                crossing = format!("{:.4}", alarm.statistic),
                threshold = self.detector.threshold(),
                total_alarms = self.state.alarms + 1,
                "Alarm raised"
            );
            self.state.record_alarm();
            self.alarms.push(alarm);
        }

        Ok(Some(TickReport {
            time: update.time,
            observation,
            statistic: update.statistic,
            posterior: update.posterior,
            detected: update.detected,
            alarm_count: self.detector.detection_count(),
        }))
    }

    /// The detector being driven (for snapshots and history access).
    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    /// Run-level counters.
    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Alarms raised so far, oldest first.
    pub fn alarms(&self) -> &[AlarmEvent] {
        &self.alarms
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
