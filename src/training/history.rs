//! Per-fold training history persisted as JSON.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::training::metrics::EpochMetrics;

/// One epoch's record in a fold's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Epoch number, 1-based.
    pub epoch: usize,
    /// Wall-clock start, seconds since the Unix epoch.
    pub begin: f64,
    /// Epoch duration in seconds.
    pub duration: f64,
    /// Training partition metrics.
    pub training: EpochMetrics,
    /// Validation partition metrics.
    pub validation: EpochMetrics,
    /// Present and true when this epoch triggered a checkpoint save.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved: Option<bool>,
    /// Test metrics, appended to the final record after the test pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<EpochMetrics>,
}

/// Write a fold's history.
pub fn write_history(path: &Path, history: &[HistoryRecord]) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer(file, history)?;
    Ok(())
}

/// Read a fold's history back.
pub fn read_history(path: &Path) -> Result<Vec<HistoryRecord>> {
    let file = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(file)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn metrics(loss: f64) -> EpochMetrics {
        EpochMetrics {
            loss,
            kld: 0.1,
            reconstruction_loss: 0.2,
            accuracy: 0.9,
            error: 1.5,
            swap_success_rate: None,
            samples: 8,
        }
    }

    #[test]
    fn test_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history_1.json");

        let record = HistoryRecord {
            epoch: 1,
            begin: 1000.0,
            duration: 2.5,
            training: metrics(0.5),
            validation: EpochMetrics {
                swap_success_rate: Some(0.75),
                ..metrics(0.6)
            },
            saved: Some(true),
            test: None,
        };
        write_history(&path, &[record]).unwrap();

        let loaded = read_history(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].epoch, 1);
        assert_eq!(loaded[0].saved, Some(true));
        assert_eq!(loaded[0].validation.swap_success_rate, Some(0.75));
    }

    #[test]
    fn test_optional_fields_omitted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history_2.json");

        let record = HistoryRecord {
            epoch: 3,
            begin: 0.0,
            duration: 1.0,
            training: metrics(0.5),
            validation: metrics(0.6),
            saved: None,
            test: None,
        };
        write_history(&path, &[record]).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("\"saved\""));
        assert!(!raw.contains("\"test\""));
        assert!(!raw.contains("swap_success_rate"));
    }
}
