//! TRIPWIRE — Online Shiryaev-Roberts Change-Point Monitor
//!
//! Entry point. Loads configuration, initialises structured logging,
//! restores the detector snapshot from disk (or starts fresh), and runs
//! the tick loop with graceful shutdown.

use anyhow::Result;
use tracing::{error, info, warn};

use tripwire::config;
use tripwire::detector::ChangeDetector;
use tripwire::evaluation::{EvaluationConfig, RunLengthEvaluator, ThresholdDiagnosis};
use tripwire::feed::simulated::GaussianShiftFeed;
use tripwire::monitor::Monitor;
use tripwire::storage;
use tripwire::types::TickReport;

const BANNER: &str = r#"
 _____ ____  ___ ____ __        _____ ____  _____
|_   _|  _ \|_ _|  _ \\ \      / /_ _|  _ \| ____|
  | | | |_) || || |_) |\ \ /\ / / | || |_) |  _|
  | | |  _ < | ||  __/  \ V  V /  | ||  _ <| |___
  |_| |_| \_\___|_|      \_/\_/  |___|_| \_\_____|

  Threshold-Rule Instrumented Process Watcher for Inline Regime Evaluation
  v0.1.0 — Sequential Monitor
"#;

/// Ticks between periodic summary log lines.
const SUMMARY_EVERY: u64 = 100;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = config::AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");

    let model = cfg.model.parameters();
    let priors = cfg.priors.parameters();
    info!(
        monitor_name = %cfg.monitor.name,
        tick_interval_ms = cfg.monitor.tick_interval_ms,
        model = %model,
        separation = format!("{:.2}", model.separation()),
        threshold = cfg.detection.threshold,
        priors = %priors,
        "TRIPWIRE starting up"
    );

    // -- Optional startup threshold check ---------------------------------

    if cfg.evaluation.enabled {
        let evaluator = RunLengthEvaluator::new(EvaluationConfig {
            model,
            threshold: cfg.detection.threshold,
            trials: cfg.evaluation.trials,
            horizon: cfg.evaluation.horizon,
            change_point: cfg.feed.change_point.unwrap_or(100),
            base_seed: cfg.feed.seed.unwrap_or(1),
        });
        let report = evaluator.run()?;
        if report.diagnosis == ThresholdDiagnosis::TooSensitive {
            warn!(report = %report, "Estimated ARL0 falls short of the threshold — review configuration");
        }
    }

    // -- Restore or create detector ---------------------------------------

    let detector = match storage::load_snapshot(None)? {
        Some(snapshot) => {
            if snapshot.threshold != cfg.detection.threshold
                || snapshot.mu0 != model.mu0
                || snapshot.mu1 != model.mu1
                || snapshot.sigma != model.sigma
            {
                warn!(
                    snapshot = %snapshot,
                    "Saved snapshot parameters differ from configuration — using snapshot"
                );
            }
            info!(snapshot = %snapshot, "Resumed from saved snapshot");
            ChangeDetector::restore(&snapshot, priors)?
        }
        None => {
            info!("Fresh start");
            ChangeDetector::new(model, priors, cfg.detection.threshold)?
        }
    };

    // -- Observation source ------------------------------------------------

    let feed = match cfg.feed.seed {
        Some(seed) => {
            info!(seed, change_point = ?cfg.feed.change_point, "Simulated feed (seeded)");
            GaussianShiftFeed::with_seed(model, cfg.feed.change_point, seed)?
        }
        None => {
            info!(change_point = ?cfg.feed.change_point, "Simulated feed (entropy)");
            GaussianShiftFeed::new(model, cfg.feed.change_point)?
        }
    };

    let mut monitor = Monitor::new(detector, Box::new(feed));

    // -- Main loop ---------------------------------------------------------

    let mut interval = tokio::time::interval(cfg.monitor.tick_interval());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_ms = cfg.monitor.tick_interval_ms,
        "Entering monitoring loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match monitor.step().await {
                    Ok(Some(report)) => {
                        log_tick_report(&report);
                        if report.detected {
                            // Persist across restarts as soon as an alarm fires
                            if let Err(e) = storage::save_snapshot(&monitor.detector().snapshot(), None) {
                                error!(error = %e, "Failed to save snapshot");
                            }
                        }
                        if (report.time + 1) % SUMMARY_EVERY == 0 {
                            info!(
                                state = %monitor.state(),
                                statistic = format!("{:.4}", monitor.detector().statistic()),
                                posterior = format!("{:.4}", monitor.detector().posterior()),
                                "Monitor summary"
                            );
                        }
                    }
                    Ok(None) => {
                        info!("Observation stream ended.");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "Tick failed — continuing to next");
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    // Save final snapshot
    storage::save_snapshot(&monitor.detector().snapshot(), None)?;
    info!(
        state = %monitor.state(),
        statistic = format!("{:.4}", monitor.detector().statistic()),
        detections = monitor.detector().detection_count(),
        "TRIPWIRE shut down cleanly."
    );

    Ok(())
}

/// Log a per-tick summary (alarm crossings are logged by the monitor).
fn log_tick_report(report: &TickReport) {
    tracing::debug!(
        t = report.time,
        observation = format!("{:+.4}", report.observation),
        statistic = format!("{:.4}", report.statistic),
        posterior = format!("{:.4}", report.posterior),
        alarms = report.alarm_count,
        "Tick complete"
    );
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tripwire=info"));

    let json_logging = std::env::var("TRIPWIRE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
