//! End-to-end simulation harness.
//!
//! Runs seeded Gaussian streams through the full monitor loop to check
//! detection timing, restart behaviour, and reproducibility.

use tripwire::detector::ChangeDetector;
use tripwire::evaluation::{EvaluationConfig, RunLengthEvaluator};
use tripwire::feed::simulated::GaussianShiftFeed;
use tripwire::monitor::Monitor;
use tripwire::types::{ModelParameters, PriorParameters};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_detector(threshold: f64) -> ChangeDetector {
    ChangeDetector::new(
        ModelParameters::default(),
        PriorParameters::default(),
        threshold,
    )
    .unwrap()
}

fn make_monitor(threshold: f64, change_point: Option<u64>, seed: u64) -> Monitor {
    let feed = GaussianShiftFeed::with_seed(ModelParameters::default(), change_point, seed).unwrap();
    Monitor::new(make_detector(threshold), Box::new(feed))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_shift_detected_shortly_after_change_point() {
    // A high threshold keeps the 200 pre-change ticks quiet; after the
    // shift the statistic climbs by roughly e^2 per observation, so the
    // crossing lands within a few dozen ticks of the change point.
    let mut monitor = make_monitor(1e6, Some(200), 7);

    for _ in 0..300 {
        let report = monitor.step().await.unwrap();
        assert!(report.is_some(), "simulated feed must never exhaust");
    }

    assert!(!monitor.alarms().is_empty());
    for alarm in monitor.alarms() {
        assert!(alarm.time >= 200, "false alarm at t={}", alarm.time);
        assert!(alarm.statistic >= 1e6);
    }
    let first = monitor.alarms()[0].time;
    assert!(first < 260, "detection too slow: first alarm at t={first}");
    assert_eq!(monitor.state().ticks, 300);
}

#[tokio::test]
async fn test_quiet_stream_without_change_point() {
    let mut monitor = make_monitor(1e6, None, 11);

    for _ in 0..400 {
        monitor.step().await.unwrap();
    }

    assert!(monitor.alarms().is_empty());
    assert_eq!(monitor.state().alarms, 0);
    assert_eq!(monitor.detector().observation_count(), 400);
    let statistic = monitor.detector().statistic();
    assert!(statistic.is_finite() && statistic >= 0.0);
}

#[tokio::test]
async fn test_seeded_runs_are_reproducible_through_monitor() {
    let mut a = make_monitor(30.0, Some(50), 42);
    let mut b = make_monitor(30.0, Some(50), 42);

    for _ in 0..120 {
        let ra = a.step().await.unwrap().unwrap();
        let rb = b.step().await.unwrap().unwrap();
        assert_eq!(ra.time, rb.time);
        assert_eq!(ra.observation.to_bits(), rb.observation.to_bits());
        assert_eq!(ra.statistic.to_bits(), rb.statistic.to_bits());
        assert_eq!(ra.detected, rb.detected);
    }
    assert_eq!(a.alarms().len(), b.alarms().len());
}

#[tokio::test]
async fn test_snapshot_restart_resumes_counting() {
    let path = format!("tripwire_test_sim_restart_{}.json", std::process::id());

    let mut monitor = make_monitor(1e6, Some(1_000), 3);
    for _ in 0..150 {
        monitor.step().await.unwrap();
    }

    let snapshot = monitor.detector().snapshot();
    tripwire::storage::save_snapshot(&snapshot, Some(&path)).unwrap();

    let loaded = tripwire::storage::load_snapshot(Some(&path))
        .unwrap()
        .expect("snapshot file should exist");
    assert_eq!(loaded.observation_count, 150);
    assert_eq!(loaded.statistic.to_bits(), snapshot.statistic.to_bits());

    let mut restored = ChangeDetector::restore(&loaded, PriorParameters::default()).unwrap();
    assert_eq!(restored.observation_count(), 150);
    assert_eq!(restored.detection_count(), 0);
    assert_eq!(
        restored.statistic().to_bits(),
        monitor.detector().statistic().to_bits()
    );

    // The clock picks up where the snapshot left off
    let update = restored.update(0.5).unwrap();
    assert_eq!(update.time, 150);

    tripwire::storage::delete_snapshot(Some(&path)).unwrap();
}

#[tokio::test]
async fn test_run_length_report_coheres_with_monitor_scale() {
    let evaluator = RunLengthEvaluator::new(EvaluationConfig {
        model: ModelParameters::default(),
        threshold: 30.0,
        trials: 24,
        horizon: 400,
        change_point: 40,
        base_seed: 3,
    });
    let report = evaluator.run().unwrap();

    assert_eq!(report.trials, 24);
    // Well-separated means and a long horizon catch every injected shift
    assert_eq!(report.miss_rate, 0.0);
    let delay = report.mean_detection_delay.expect("no trial missed");
    assert!(delay < 20.0, "delay {delay} too large for separation 2.0");
    assert!(report.arl0_estimate.is_some());
    assert_eq!(report.censored_trials + (report.false_alarm_rate * 24.0).round() as usize, 24);
}
