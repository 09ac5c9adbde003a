//! Rigid-alignment bookkeeping.
//!
//! Samples arrive pose-normalized; the alignment triple recorded per sample
//! maps the network's output back to physical space. The inverse is always
//! applied in the order scale, rotation, translation.

use burn::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-sample rigid alignment recorded by the pose normalizer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RigidAlignment {
    /// Rotation matrix, applied as a right factor (row vectors).
    pub rotation: [[f32; 3]; 3],
    /// Translation added after rotation.
    pub translation: [f32; 3],
    /// Uniform scale applied before rotation.
    pub scale: f32,
}

impl RigidAlignment {
    /// The identity alignment.
    pub fn identity() -> Self {
        Self {
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0; 3],
            scale: 1.0,
        }
    }

    /// Map one normalized vertex back to physical space.
    pub fn to_physical(&self, vertex: [f32; 3]) -> [f32; 3] {
        let scaled = [
            vertex[0] * self.scale,
            vertex[1] * self.scale,
            vertex[2] * self.scale,
        ];
        let mut out = [0.0f32; 3];
        for (i, value) in out.iter_mut().enumerate() {
            *value = scaled[0] * self.rotation[0][i]
                + scaled[1] * self.rotation[1][i]
                + scaled[2] * self.rotation[2][i]
                + self.translation[i];
        }
        out
    }
}

/// Undo statistics normalization and pose alignment for a batch.
///
/// `reconstruction` is the network output `[B, N, 3]` in standardized space;
/// `mean`/`std` are the broadcastable statistics tensors `[1, N, 3]`;
/// `scales` is `[B, 1, 1]`, `rotations` `[B, 3, 3]`, `translations`
/// `[B, 1, 3]`. Returns vertices in physical coordinates.
pub fn denormalize_batch<B: Backend>(
    reconstruction: Tensor<B, 3>,
    mean: Tensor<B, 3>,
    std: Tensor<B, 3>,
    scales: Tensor<B, 3>,
    rotations: Tensor<B, 3>,
    translations: Tensor<B, 3>,
) -> Tensor<B, 3> {
    let metric = reconstruction * std + mean;
    (metric * scales).matmul(rotations) + translations
}

/// Per-sample mean vertex distance between two physical-space meshes.
///
/// Returns a `[B]` tensor of per-mesh averages of per-vertex Euclidean
/// distances.
pub fn per_sample_vertex_error<B: Backend>(
    prediction: Tensor<B, 3>,
    target: Tensor<B, 3>,
) -> Tensor<B, 1> {
    let [batch, _, _] = prediction.dims();
    let diff = prediction - target;
    let distances = (diff.clone() * diff).sum_dim(2).sqrt();
    distances.mean_dim(1).reshape([batch])
}
