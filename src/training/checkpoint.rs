//! Per-fold checkpoint persistence.
//!
//! A checkpoint is three files under the checkpoint directory: the model
//! record (`checkpoint_<fold>`), the optimizer record (`optimizer_<fold>`),
//! and a JSON metadata sidecar (`checkpoint_<fold>.json`).

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::optim::Optimizer;
use burn::record::{CompactRecorder, Recorder};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::nn::ConditionalVae;

/// Losses at the moment a checkpoint was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Fold number, 1-based.
    pub fold: usize,
    /// Epoch that triggered the save.
    pub epoch: usize,
    /// Training loss at that epoch.
    pub train_loss: f64,
    /// Validation loss at that epoch.
    pub val_loss: f64,
}

fn model_path(dir: &Path, fold: usize) -> PathBuf {
    dir.join(format!("checkpoint_{fold}"))
}

fn optimizer_path(dir: &Path, fold: usize) -> PathBuf {
    dir.join(format!("optimizer_{fold}"))
}

fn metadata_path(dir: &Path, fold: usize) -> PathBuf {
    dir.join(format!("checkpoint_{fold}.json"))
}

/// Persist model, optimizer, and metadata for one fold, overwriting any
/// earlier save of the same fold.
pub fn save_checkpoint<B, O>(
    dir: &Path,
    model: &ConditionalVae<B>,
    optimizer: &O,
    metadata: &CheckpointMetadata,
) -> Result<()>
where
    B: AutodiffBackend,
    O: Optimizer<ConditionalVae<B>, B>,
{
    let recorder = CompactRecorder::new();
    model
        .clone()
        .save_file(model_path(dir, metadata.fold), &recorder)?;
    recorder.record(optimizer.to_record(), optimizer_path(dir, metadata.fold))?;

    let file = BufWriter::new(File::create(metadata_path(dir, metadata.fold))?);
    serde_json::to_writer(file, metadata)?;
    Ok(())
}

/// Load a fold's model record into a freshly initialized model.
pub fn load_model<B: AutodiffBackend>(
    dir: &Path,
    fold: usize,
    model: ConditionalVae<B>,
    device: &B::Device,
) -> Result<ConditionalVae<B>> {
    Ok(model.load_file(model_path(dir, fold), &CompactRecorder::new(), device)?)
}

/// Read a fold's checkpoint metadata.
pub fn load_metadata(dir: &Path, fold: usize) -> Result<CheckpointMetadata> {
    let file = BufReader::new(File::open(metadata_path(dir, fold))?);
    Ok(serde_json::from_reader(file)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConditionalVaeConfig, LossConfig};
    use crate::graph::{DenseMatrix, MeshTopology};
    use burn::backend::{Autodiff, NdArray};
    use burn::optim::AdamConfig;
    use tempfile::TempDir;

    type TestBackend = Autodiff<NdArray>;

    fn ring_topology(n: usize) -> MeshTopology {
        let mut values = vec![0.0f32; n * n];
        for i in 0..n {
            values[i * n + (i + 1) % n] = 1.0;
            values[((i + 1) % n) * n + i] = 1.0;
        }
        MeshTopology::single_level(DenseMatrix::new(n, n, values).unwrap(), Vec::new())
    }

    #[test]
    fn test_save_and_reload() {
        let device = Default::default();
        let topology = ring_topology(4);
        let config = ConditionalVaeConfig::new(vec![8])
            .with_latent_dim(3)
            .with_feature_dim(6)
            .with_loss(LossConfig::new());

        let model = config.init::<TestBackend>(&topology, &device).unwrap();
        let optimizer = AdamConfig::new().init::<TestBackend, ConditionalVae<TestBackend>>();

        let dir = TempDir::new().unwrap();
        let metadata = CheckpointMetadata {
            fold: 2,
            epoch: 7,
            train_loss: 0.4,
            val_loss: 0.5,
        };
        save_checkpoint(dir.path(), &model, &optimizer, &metadata).unwrap();

        let fresh = config.init::<TestBackend>(&topology, &device).unwrap();
        assert!(load_model(dir.path(), 2, fresh, &device).is_ok());

        let loaded = load_metadata(dir.path(), 2).unwrap();
        assert_eq!(loaded.fold, 2);
        assert_eq!(loaded.epoch, 7);
    }
}
