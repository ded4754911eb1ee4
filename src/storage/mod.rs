//! Persistence layer.
//!
//! Saves and loads the detector's minimal restart state to/from a JSON
//! file. The snapshot holds only what the recursion needs to continue
//! (model, threshold, statistic, observation count); history and alarm
//! bookkeeping start fresh on restore.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::types::DetectorSnapshot;

/// Default snapshot file path.
const DEFAULT_SNAPSHOT_FILE: &str = "tripwire_snapshot.json";

/// Save a detector snapshot to a JSON file.
pub fn save_snapshot(snapshot: &DetectorSnapshot, path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_SNAPSHOT_FILE);
    let json = serde_json::to_string_pretty(snapshot)
        .context("Failed to serialise detector snapshot")?;

    std::fs::write(path, &json)
        .context(format!("Failed to write snapshot to {path}"))?;

    debug!(path, statistic = snapshot.statistic, "Snapshot saved");
    Ok(())
}

/// Load a detector snapshot from a JSON file.
/// Returns None if the file doesn't exist (fresh start).
pub fn load_snapshot(path: Option<&str>) -> Result<Option<DetectorSnapshot>> {
    let path = path.unwrap_or(DEFAULT_SNAPSHOT_FILE);

    if !Path::new(path).exists() {
        info!(path, "No saved snapshot found, starting fresh");
        return Ok(None);
    }

    let json = std::fs::read_to_string(path)
        .context(format!("Failed to read snapshot from {path}"))?;

    let snapshot: DetectorSnapshot = serde_json::from_str(&json)
        .context(format!("Failed to parse snapshot from {path}"))?;

    info!(
        path,
        statistic = snapshot.statistic,
        observations = snapshot.observation_count,
        "Snapshot loaded from disk"
    );

    Ok(Some(snapshot))
}

/// Delete the snapshot file (for testing or reset).
pub fn delete_snapshot(path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_SNAPSHOT_FILE);
    if Path::new(path).exists() {
        std::fs::remove_file(path)
            .context(format!("Failed to delete snapshot file {path}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(tag: &str) -> String {
        let mut p: PathBuf = std::env::temp_dir();
        p.push(format!("tripwire_test_{tag}_{}.json", std::process::id()));
        p.to_string_lossy().to_string()
    }

    fn make_snapshot() -> DetectorSnapshot {
        DetectorSnapshot {
            mu0: 0.0,
            mu1: 2.0,
            sigma: 1.0,
            threshold: 100.0,
            statistic: 4.25,
            observation_count: 17,
        }
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("save_load");
        save_snapshot(&make_snapshot(), Some(&path)).unwrap();

        let loaded = load_snapshot(Some(&path)).unwrap();
        assert!(loaded.is_some());
        let loaded = loaded.unwrap();
        assert_eq!(loaded.statistic, 4.25);
        assert_eq!(loaded.observation_count, 17);
        assert_eq!(loaded.threshold, 100.0);

        delete_snapshot(Some(&path)).unwrap();
    }

    #[test]
    fn test_load_nonexistent() {
        let path = "/tmp/tripwire_nonexistent_snapshot_12345.json";
        let loaded = load_snapshot(Some(path)).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_preserves_model() {
        let path = temp_path("preserve_model");
        let snapshot = DetectorSnapshot {
            mu0: -0.5,
            mu1: 1.5,
            sigma: 0.75,
            threshold: 42.0,
            statistic: 0.0,
            observation_count: 0,
        };
        save_snapshot(&snapshot, Some(&path)).unwrap();
        let loaded = load_snapshot(Some(&path)).unwrap().unwrap();

        assert_eq!(loaded.mu0, -0.5);
        assert_eq!(loaded.mu1, 1.5);
        assert_eq!(loaded.sigma, 0.75);
        assert_eq!(loaded.threshold, 42.0);

        delete_snapshot(Some(&path)).unwrap();
    }

    #[test]
    fn test_delete_snapshot() {
        let path = temp_path("delete");
        save_snapshot(&make_snapshot(), Some(&path)).unwrap();
        assert!(Path::new(&path).exists());

        delete_snapshot(Some(&path)).unwrap();
        assert!(!Path::new(&path).exists());
    }

    #[test]
    fn test_delete_nonexistent_ok() {
        let result = delete_snapshot(Some("/tmp/tripwire_does_not_exist_xyz.json"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_corrupt_file_errors() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "not json at all").unwrap();
        assert!(load_snapshot(Some(&path)).is_err());
        delete_snapshot(Some(&path)).unwrap();
    }
}
