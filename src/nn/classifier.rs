//! Latent-space attribute classifier.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

/// Small MLP that predicts the binary attribute from encoder features.
#[derive(Module, Debug)]
pub struct LatentClassifier<B: Backend> {
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
    activation: Relu,
}

impl<B: Backend> LatentClassifier<B> {
    /// Build a classifier from `feature_dim` through `hidden_dims` to two
    /// logits.
    pub fn new(feature_dim: usize, hidden_dims: &[usize], device: &B::Device) -> Self {
        let mut hidden = Vec::with_capacity(hidden_dims.len());
        let mut in_dim = feature_dim;
        for &out_dim in hidden_dims {
            hidden.push(LinearConfig::new(in_dim, out_dim).init(device));
            in_dim = out_dim;
        }
        let output = LinearConfig::new(in_dim, 2).init(device);

        Self {
            hidden,
            output,
            activation: Relu::new(),
        }
    }

    /// Forward pass, `[batch, feature_dim]` to `[batch, 2]` logits.
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = features;
        for layer in &self.hidden {
            x = self.activation.forward(layer.forward(x));
        }
        self.output.forward(x)
    }
}
