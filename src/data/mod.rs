//! Mesh samples and batching.

pub mod pose;
pub mod stats;

use burn::prelude::*;

use crate::error::{DimorphError, Result};
use pose::RigidAlignment;
use stats::NormStats;

/// One subject's mesh with its binary attribute label.
#[derive(Debug, Clone)]
pub struct MeshSample {
    /// Subject identifier, used for exported file names.
    pub name: String,
    /// Pose-normalized vertex positions, network input space before
    /// standardization.
    pub vertices: Vec<[f32; 3]>,
    /// Ground-truth vertex positions in physical coordinates.
    pub ground_truth: Vec<[f32; 3]>,
    /// Binary attribute label, 0 or 1.
    pub label: u8,
    /// Alignment that maps normalized vertices back to physical space.
    pub alignment: RigidAlignment,
}

impl MeshSample {
    /// Create a sample, checking label range and vertex count agreement.
    pub fn new(
        name: String,
        vertices: Vec<[f32; 3]>,
        ground_truth: Vec<[f32; 3]>,
        label: u8,
        alignment: RigidAlignment,
    ) -> Result<Self> {
        if label > 1 {
            return Err(DimorphError::InvalidData(format!(
                "label must be 0 or 1, got {label} for {name}"
            )));
        }
        if vertices.len() != ground_truth.len() {
            return Err(DimorphError::ShapeMismatch {
                expected: vec![vertices.len(), 3],
                got: vec![ground_truth.len(), 3],
            });
        }
        Ok(Self {
            name,
            vertices,
            ground_truth,
            label,
            alignment,
        })
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}

/// A batch of meshes uploaded to the device.
#[derive(Debug, Clone)]
pub struct MeshBatch<B: Backend> {
    /// Standardized input vertices, `[B, N, 3]`.
    pub input: Tensor<B, 3>,
    /// Standardized reconstruction targets, `[B, N, 3]`.
    pub target: Tensor<B, 3>,
    /// Physical-space ground truth, `[B, N, 3]`.
    pub ground_truth: Tensor<B, 3>,
    /// Attribute labels, `[B]`.
    pub labels: Tensor<B, 1, Int>,
    /// Host-side copy of the labels.
    pub label_values: Vec<i64>,
    /// Subject names in batch order.
    pub names: Vec<String>,
    /// Rotation matrices, `[B, 3, 3]`.
    pub rotations: Tensor<B, 3>,
    /// Translations, `[B, 1, 3]`.
    pub translations: Tensor<B, 3>,
    /// Uniform scales, `[B, 1, 1]`.
    pub scales: Tensor<B, 3>,
    /// Number of samples in the batch.
    pub len: usize,
}

/// Assembles [`MeshBatch`]es from samples, standardizing with fixed
/// statistics.
#[derive(Debug, Clone)]
pub struct MeshBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> MeshBatcher<B> {
    /// Create a batcher targeting the given device.
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Standardize and upload a batch.
    ///
    /// Input and target are both the standardized vertices; the ground truth
    /// stays in physical coordinates for error measurement.
    pub fn batch(&self, samples: &[&MeshSample], stats: &NormStats) -> Result<MeshBatch<B>> {
        let first = samples.first().ok_or(DimorphError::EmptyLoader)?;
        let n = first.vertex_count();
        if stats.vertex_count() != n {
            return Err(DimorphError::ShapeMismatch {
                expected: vec![stats.vertex_count(), 3],
                got: vec![n, 3],
            });
        }

        let len = samples.len();
        let mut standardized = Vec::with_capacity(len * n * 3);
        let mut ground_truth = Vec::with_capacity(len * n * 3);
        let mut labels = Vec::with_capacity(len);
        let mut names = Vec::with_capacity(len);
        let mut rotations = Vec::with_capacity(len * 9);
        let mut translations = Vec::with_capacity(len * 3);
        let mut scales = Vec::with_capacity(len);

        for sample in samples {
            if sample.vertex_count() != n {
                return Err(DimorphError::ShapeMismatch {
                    expected: vec![n, 3],
                    got: vec![sample.vertex_count(), 3],
                });
            }
            for (i, vertex) in sample.vertices.iter().enumerate() {
                standardized.extend_from_slice(&stats.standardize(i, *vertex));
            }
            for vertex in &sample.ground_truth {
                ground_truth.extend_from_slice(vertex);
            }
            labels.push(sample.label as i64);
            names.push(sample.name.clone());
            for row in &sample.alignment.rotation {
                rotations.extend_from_slice(row);
            }
            translations.extend_from_slice(&sample.alignment.translation);
            scales.push(sample.alignment.scale);
        }

        let input = Tensor::from_data(
            TensorData::new(standardized, [len, n, 3]),
            &self.device,
        );
        Ok(MeshBatch {
            target: input.clone(),
            input,
            ground_truth: Tensor::from_data(
                TensorData::new(ground_truth, [len, n, 3]),
                &self.device,
            ),
            labels: Tensor::from_data(TensorData::new(labels.clone(), [len]), &self.device),
            label_values: labels,
            names,
            rotations: Tensor::from_data(TensorData::new(rotations, [len, 3, 3]), &self.device),
            translations: Tensor::from_data(
                TensorData::new(translations, [len, 1, 3]),
                &self.device,
            ),
            scales: Tensor::from_data(TensorData::new(scales, [len, 1, 1]), &self.device),
            len,
        })
    }
}
