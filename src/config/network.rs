//! Network configuration.

use burn::config::Config;
use burn::prelude::*;

use crate::config::LossConfig;
use crate::error::{DimorphError, Result as DimorphResult};
use crate::graph::MeshTopology;
use crate::nn::ConditionalVae;

/// Configuration for the conditional mesh VAE.
///
/// `init` is the per-fold factory: cross-validation builds a fresh model
/// from this config at the start of every fold.
#[derive(Config, Debug)]
pub struct ConditionalVaeConfig {
    /// Latent space dimension.
    #[config(default = 8)]
    pub latent_dim: usize,
    /// Encoder feature dimension, input to the classifier and latent heads.
    #[config(default = 64)]
    pub feature_dim: usize,
    /// Graph-convolution channel widths, one per topology level.
    pub channels: Vec<usize>,
    /// Hidden widths of the latent classifier.
    #[config(default = "vec![]")]
    pub classifier_hidden: Vec<usize>,
    /// Loss term weights and reconstruction distance.
    #[config(default = "LossConfig::new()")]
    pub loss: LossConfig,
}

impl ConditionalVaeConfig {
    /// Validate against a topology and build a freshly initialized model.
    pub fn init<B: Backend>(
        &self,
        topology: &MeshTopology,
        device: &B::Device,
    ) -> DimorphResult<ConditionalVae<B>> {
        topology.validate()?;
        if self.channels.len() != topology.levels() {
            return Err(DimorphError::InvalidConfig {
                message: format!(
                    "expected {} channel widths for {} topology levels, got {}",
                    topology.levels(),
                    topology.levels(),
                    self.channels.len()
                ),
            });
        }
        if self.latent_dim == 0 || self.feature_dim == 0 {
            return Err(DimorphError::InvalidConfig {
                message: "latent_dim and feature_dim must be positive".into(),
            });
        }
        if self.channels.iter().any(|&c| c == 0) {
            return Err(DimorphError::InvalidConfig {
                message: "channel widths must be positive".into(),
            });
        }
        self.loss.validate().map_err(|message| DimorphError::InvalidConfig { message })?;

        Ok(ConditionalVae::new(
            topology,
            &self.channels,
            self.feature_dim,
            self.latent_dim,
            &self.classifier_hidden,
            &self.loss,
            device,
        ))
    }
}
