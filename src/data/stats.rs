//! Normalization statistics.
//!
//! Per-vertex mean and standard deviation, computed from the training
//! partition only and reused unchanged for validation and test. Evaluation
//! cannot denormalize reconstructions without them, so a missing file is
//! fatal.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::MeshSample;
use crate::error::{DimorphError, Result};

/// Floor applied to standard deviations to keep standardization finite.
const STD_FLOOR: f32 = 1e-8;

/// Per-vertex per-coordinate normalization statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormStats {
    /// Mean vertex positions, one entry per vertex.
    pub mean: Vec<[f32; 3]>,
    /// Standard deviations, one entry per vertex, floored away from zero.
    pub std: Vec<[f32; 3]>,
}

impl NormStats {
    /// Compute statistics over the pose-normalized vertices of `samples`.
    pub fn from_samples(samples: &[&MeshSample]) -> Result<Self> {
        let first = samples.first().ok_or(DimorphError::EmptyLoader)?;
        let vertex_count = first.vertices.len();
        for sample in samples {
            if sample.vertices.len() != vertex_count {
                return Err(DimorphError::ShapeMismatch {
                    expected: vec![vertex_count, 3],
                    got: vec![sample.vertices.len(), 3],
                });
            }
        }

        let count = samples.len() as f32;
        let mut mean = vec![[0.0f32; 3]; vertex_count];
        for sample in samples {
            for (m, v) in mean.iter_mut().zip(sample.vertices.iter()) {
                for k in 0..3 {
                    m[k] += v[k] / count;
                }
            }
        }

        let mut var = vec![[0.0f32; 3]; vertex_count];
        for sample in samples {
            for ((s, v), m) in var.iter_mut().zip(sample.vertices.iter()).zip(mean.iter()) {
                for k in 0..3 {
                    let d = v[k] - m[k];
                    s[k] += d * d / count;
                }
            }
        }
        let std = var
            .iter()
            .map(|s| [s[0].sqrt().max(STD_FLOOR), s[1].sqrt().max(STD_FLOOR), s[2].sqrt().max(STD_FLOOR)])
            .collect();

        Ok(Self { mean, std })
    }

    /// Number of vertices the statistics cover.
    pub fn vertex_count(&self) -> usize {
        self.mean.len()
    }

    /// Standardize one vertex.
    pub fn standardize(&self, index: usize, vertex: [f32; 3]) -> [f32; 3] {
        let m = self.mean[index];
        let s = self.std[index];
        [
            (vertex[0] - m[0]) / s[0],
            (vertex[1] - m[1]) / s[1],
            (vertex[2] - m[2]) / s[2],
        ]
    }

    /// Upload as broadcastable `[1, N, 3]` mean/std tensors.
    pub fn to_tensors<B: Backend>(&self, device: &B::Device) -> (Tensor<B, 3>, Tensor<B, 3>) {
        let n = self.vertex_count();
        let mean: Vec<f32> = self.mean.iter().flatten().copied().collect();
        let std: Vec<f32> = self.std.iter().flatten().copied().collect();
        (
            Tensor::from_data(TensorData::new(mean, [1, n, 3]), device),
            Tensor::from_data(TensorData::new(std, [1, n, 3]), device),
        )
    }

    /// Persist as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        serde_json::to_writer(file, self)?;
        Ok(())
    }

    /// Load from JSON; a missing file is a distinct fatal error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DimorphError::MissingStats {
                path: path.to_path_buf(),
            });
        }
        let file = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(file)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::pose::RigidAlignment;
    use tempfile::TempDir;

    fn sample(vertices: Vec<[f32; 3]>, label: u8) -> MeshSample {
        MeshSample::new(
            format!("s{label}"),
            vertices.clone(),
            vertices,
            label,
            RigidAlignment::identity(),
        )
        .unwrap()
    }

    #[test]
    fn test_mean_and_std() {
        let a = sample(vec![[0.0, 0.0, 0.0], [2.0, 2.0, 2.0]], 0);
        let b = sample(vec![[2.0, 2.0, 2.0], [2.0, 2.0, 2.0]], 1);
        let stats = NormStats::from_samples(&[&a, &b]).unwrap();

        assert_eq!(stats.mean[0], [1.0, 1.0, 1.0]);
        assert_eq!(stats.mean[1], [2.0, 2.0, 2.0]);
        // First vertex: values 0 and 2, population std 1.
        assert!((stats.std[0][0] - 1.0).abs() < 1e-6);
        // Second vertex is constant; std must be floored, not zero.
        assert!(stats.std[1][0] > 0.0);
    }

    #[test]
    fn test_standardize() {
        let a = sample(vec![[0.0, 0.0, 0.0]], 0);
        let b = sample(vec![[2.0, 0.0, 0.0]], 1);
        let stats = NormStats::from_samples(&[&a, &b]).unwrap();
        let z = stats.standardize(0, [2.0, 0.0, 0.0]);
        assert!((z[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("norm_1.json");
        let a = sample(vec![[0.0, 1.0, 2.0]], 0);
        let stats = NormStats::from_samples(&[&a]).unwrap();
        stats.save(&path).unwrap();

        let loaded = NormStats::load(&path).unwrap();
        assert_eq!(loaded.mean, stats.mean);
        assert_eq!(loaded.std, stats.std);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = NormStats::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, DimorphError::MissingStats { .. }));
    }

    #[test]
    fn test_empty_samples_rejected() {
        assert!(matches!(
            NormStats::from_samples(&[]),
            Err(DimorphError::EmptyLoader)
        ));
    }
}
