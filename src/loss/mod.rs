//! Loss terms for the conditional VAE.

use burn::prelude::*;
use serde::{Deserialize, Serialize};

/// Which distance the reconstruction term uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconstructionKind {
    /// Mean absolute error.
    L1,
    /// Mean squared error.
    L2,
}

/// Reconstruction loss between predicted and target vertices, `[B, N, 3]`.
///
/// Returns the batch-mean scalar.
pub fn reconstruction_loss<B: Backend>(
    kind: ReconstructionKind,
    prediction: Tensor<B, 3>,
    target: Tensor<B, 3>,
) -> Tensor<B, 1> {
    let diff = prediction - target;
    match kind {
        ReconstructionKind::L1 => diff.abs().mean(),
        ReconstructionKind::L2 => diff.powf_scalar(2.0).mean(),
    }
}

/// Closed-form KL divergence of a diagonal Gaussian against the unit prior.
///
/// `mean` and `log_var` are `[B, latent]`; the per-sample divergences are
/// summed over the latent dimension and averaged over the batch.
pub fn kl_divergence<B: Backend>(mean: Tensor<B, 2>, log_var: Tensor<B, 2>) -> Tensor<B, 1> {
    let per_sample = log_var.clone().add_scalar(1.0) - mean.clone() * mean - log_var.exp();
    per_sample.sum_dim(1).mean().mul_scalar(-0.5)
}
