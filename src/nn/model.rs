//! The conditional mesh VAE.
//!
//! The encoder produces an attribute-free feature vector; the classifier
//! predicts the attribute from it; the latent heads see the feature
//! concatenated with a one-hot attribute, and the decoder sees the latent
//! mean concatenated with a one-hot attribute. Training conditions on the
//! ground-truth attribute, evaluation on the classifier's prediction.
//! Reconstructions always decode from the latent mean.

use burn::module::{Ignored, Module};
use burn::nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig};
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;

use crate::config::LossConfig;
use crate::graph::MeshTopology;
use crate::loss::{kl_divergence, reconstruction_loss, ReconstructionKind};
use crate::nn::classifier::LatentClassifier;
use crate::nn::decoder::MeshDecoder;
use crate::nn::encoder::MeshEncoder;

/// Diagonal Gaussian over the latent space.
#[derive(Debug, Clone)]
pub struct LatentDistribution<B: Backend> {
    /// Mean, `[batch, latent_dim]`.
    pub mean: Tensor<B, 2>,
    /// Log variance, `[batch, latent_dim]`.
    pub log_var: Tensor<B, 2>,
}

impl<B: Backend> LatentDistribution<B> {
    /// Draw a stochastic latent sample via the reparameterization trick.
    ///
    /// Reconstruction always decodes from the mean, so output quality never
    /// depends on sampling noise; this sample is for generative use.
    pub fn reparameterize(&self) -> Tensor<B, 2> {
        let noise = self
            .mean
            .random_like(burn::tensor::Distribution::Normal(0.0, 1.0));
        self.mean.clone() + noise * self.log_var.clone().mul_scalar(0.5).exp()
    }
}

/// Outputs of a training forward pass.
#[derive(Debug, Clone)]
pub struct TrainingForward<B: Backend> {
    /// Composite loss, scalar.
    pub loss: Tensor<B, 1>,
    /// KL term, scalar.
    pub kld: Tensor<B, 1>,
    /// Reconstruction term, scalar.
    pub reconstruction_loss: Tensor<B, 1>,
    /// Reconstruction in standardized space, `[batch, vertices, 3]`.
    pub reconstruction: Tensor<B, 3>,
    /// Classifier logits, `[batch, 2]`.
    pub logits: Tensor<B, 2>,
}

/// Outputs of an evaluation forward pass.
#[derive(Debug, Clone)]
pub struct EvaluationForward<B: Backend> {
    /// Composite loss, scalar.
    pub loss: Tensor<B, 1>,
    /// KL term, scalar.
    pub kld: Tensor<B, 1>,
    /// Reconstruction term, scalar.
    pub reconstruction_loss: Tensor<B, 1>,
    /// Reconstruction in standardized space, `[batch, vertices, 3]`.
    pub reconstruction: Tensor<B, 3>,
    /// Classifier logits, `[batch, 2]`.
    pub logits: Tensor<B, 2>,
    /// Latent mean used for decoding, `[batch, latent_dim]`.
    pub latent_mean: Tensor<B, 2>,
}

/// Conditional graph-convolutional VAE with a latent attribute classifier.
#[derive(Module, Debug)]
pub struct ConditionalVae<B: Backend> {
    encoder: MeshEncoder<B>,
    classifier: LatentClassifier<B>,
    z_mean: Linear<B>,
    z_log_var: Linear<B>,
    decoder: MeshDecoder<B>,
    cross_entropy: CrossEntropyLoss<B>,
    reconstruction_kind: Ignored<ReconstructionKind>,
    reconstruction_weight: f64,
    kl_weight: f64,
}

impl<B: Backend> ConditionalVae<B> {
    /// Build the full model over `topology`.
    pub fn new(
        topology: &MeshTopology,
        channels: &[usize],
        feature_dim: usize,
        latent_dim: usize,
        classifier_hidden: &[usize],
        loss: &LossConfig,
        device: &B::Device,
    ) -> Self {
        Self {
            encoder: MeshEncoder::new(topology, channels, feature_dim, device),
            classifier: LatentClassifier::new(feature_dim, classifier_hidden, device),
            z_mean: LinearConfig::new(feature_dim + 2, latent_dim).init(device),
            z_log_var: LinearConfig::new(feature_dim + 2, latent_dim).init(device),
            decoder: MeshDecoder::new(topology, channels, latent_dim + 2, device),
            cross_entropy: CrossEntropyLossConfig::new().init(device),
            reconstruction_kind: Ignored(loss.reconstruction),
            reconstruction_weight: loss.reconstruction_weight,
            kl_weight: loss.kl_weight,
        }
    }

    /// Encode vertices into the attribute-free feature vector.
    pub fn encode(&self, vertices: Tensor<B, 3>) -> Tensor<B, 2> {
        self.encoder.forward(vertices)
    }

    /// Classifier logits for a feature vector.
    pub fn classify(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        self.classifier.forward(features)
    }

    /// Latent distribution conditioned on a one-hot attribute.
    pub fn latent(
        &self,
        attribute: Tensor<B, 2>,
        features: Tensor<B, 2>,
    ) -> LatentDistribution<B> {
        let conditioned = Tensor::cat(vec![attribute, features], 1);
        LatentDistribution {
            mean: self.z_mean.forward(conditioned.clone()),
            log_var: self.z_log_var.forward(conditioned),
        }
    }

    /// Decode a latent mean under a one-hot attribute.
    pub fn sample(&self, attribute: Tensor<B, 2>, latent: Tensor<B, 2>) -> Tensor<B, 3> {
        self.decoder.forward(Tensor::cat(vec![attribute, latent], 1))
    }

    fn composite_loss(
        &self,
        logits: Tensor<B, 2>,
        labels: Tensor<B, 1, Int>,
        reconstruction: Tensor<B, 3>,
        target: Tensor<B, 3>,
        latent: &LatentDistribution<B>,
    ) -> (Tensor<B, 1>, Tensor<B, 1>, Tensor<B, 1>) {
        let ce = self.cross_entropy.forward(logits, labels);
        let rec = reconstruction_loss(self.reconstruction_kind.0, reconstruction, target);
        let kld = kl_divergence(latent.mean.clone(), latent.log_var.clone());
        let loss = ce
            + rec.clone().mul_scalar(self.reconstruction_weight)
            + kld.clone().mul_scalar(self.kl_weight);
        (loss, kld, rec)
    }

    /// Training forward pass, conditioned on the ground-truth attribute.
    pub fn forward_training(
        &self,
        input: Tensor<B, 3>,
        target: Tensor<B, 3>,
        labels: Tensor<B, 1, Int>,
        attribute: Tensor<B, 2>,
    ) -> TrainingForward<B> {
        let features = self.encode(input);
        let logits = self.classify(features.clone());
        let latent = self.latent(attribute.clone(), features);
        let reconstruction = self.sample(attribute, latent.mean.clone());

        let (loss, kld, reconstruction_loss) = self.composite_loss(
            logits.clone(),
            labels,
            reconstruction.clone(),
            target,
            &latent,
        );

        TrainingForward {
            loss,
            kld,
            reconstruction_loss,
            reconstruction,
            logits,
        }
    }

    /// Evaluation forward pass, conditioned on the classifier's prediction.
    pub fn forward_evaluation(
        &self,
        input: Tensor<B, 3>,
        target: Tensor<B, 3>,
        labels: Tensor<B, 1, Int>,
    ) -> EvaluationForward<B> {
        let features = self.encode(input);
        let logits = self.classify(features.clone());
        let predicted = one_hot_from_logits(logits.clone());
        let latent = self.latent(predicted.clone(), features);
        let reconstruction = self.sample(predicted, latent.mean.clone());

        let (loss, kld, reconstruction_loss) = self.composite_loss(
            logits.clone(),
            labels,
            reconstruction.clone(),
            target,
            &latent,
        );

        EvaluationForward {
            loss,
            kld,
            reconstruction_loss,
            reconstruction,
            logits,
            latent_mean: latent.mean,
        }
    }
}

/// One-hot encode binary labels as a `[batch, 2]` float tensor.
pub fn attribute_one_hot<B: Backend>(labels: &[i64], device: &B::Device) -> Tensor<B, 2> {
    let mut values = Vec::with_capacity(labels.len() * 2);
    for &label in labels {
        if label == 0 {
            values.extend_from_slice(&[1.0f32, 0.0]);
        } else {
            values.extend_from_slice(&[0.0f32, 1.0]);
        }
    }
    Tensor::from_data(TensorData::new(values, [labels.len(), 2]), device)
}

/// The opposite one-hot attribute.
pub fn complement<B: Backend>(one_hot: Tensor<B, 2>) -> Tensor<B, 2> {
    one_hot.ones_like() - one_hot
}

/// One-hot encoding of the argmax class of two-way logits.
fn one_hot_from_logits<B: Backend>(logits: Tensor<B, 2>) -> Tensor<B, 2> {
    let predicted = logits.argmax(1).float();
    Tensor::cat(vec![predicted.ones_like() - predicted.clone(), predicted], 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DenseMatrix;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn ring_topology(n: usize) -> MeshTopology {
        let mut values = vec![0.0f32; n * n];
        for i in 0..n {
            values[i * n + (i + 1) % n] = 1.0;
            values[((i + 1) % n) * n + i] = 1.0;
        }
        MeshTopology::single_level(DenseMatrix::new(n, n, values).unwrap(), Vec::new())
    }

    fn tiny_model(device: &<TestBackend as Backend>::Device) -> ConditionalVae<TestBackend> {
        ConditionalVae::new(
            &ring_topology(4),
            &[8],
            6,
            3,
            &[4],
            &LossConfig::new(),
            device,
        )
    }

    #[test]
    fn test_one_hot_and_complement() {
        let device = Default::default();
        let one_hot = attribute_one_hot::<TestBackend>(&[0, 1], &device);
        let flat: Vec<f32> = one_hot.clone().into_data().to_vec().unwrap();
        assert_eq!(flat, vec![1.0, 0.0, 0.0, 1.0]);

        let flipped: Vec<f32> = complement(one_hot).into_data().to_vec().unwrap();
        assert_eq!(flipped, vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_reparameterize_collapses_to_mean() {
        let device = Default::default();
        let mean = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.5f32, -0.5, 2.0, 0.0], [2, 2]),
            &device,
        );
        // Vanishing variance makes the sample deterministic.
        let log_var = Tensor::full([2, 2], -60.0, &device);
        let dist = LatentDistribution {
            mean: mean.clone(),
            log_var,
        };

        let sample: Vec<f32> = dist.reparameterize().into_data().to_vec().unwrap();
        let expected: Vec<f32> = mean.into_data().to_vec().unwrap();
        for (s, e) in sample.iter().zip(&expected) {
            assert!((s - e).abs() < 1e-5);
        }
    }

    #[test]
    fn test_training_forward_shapes() {
        let device = Default::default();
        let model = tiny_model(&device);

        let input = Tensor::zeros([2, 4, 3], &device);
        let labels = Tensor::from_data(TensorData::new(vec![0i64, 1], [2]), &device);
        let attribute = attribute_one_hot(&[0, 1], &device);

        let out = model.forward_training(input.clone(), input, labels, attribute);
        assert_eq!(out.reconstruction.dims(), [2, 4, 3]);
        assert_eq!(out.logits.dims(), [2, 2]);
        assert_eq!(out.loss.dims(), [1]);
    }

    #[test]
    fn test_evaluation_forward_shapes() {
        let device = Default::default();
        let model = tiny_model(&device);

        let input = Tensor::zeros([3, 4, 3], &device);
        let labels = Tensor::from_data(TensorData::new(vec![0i64, 1, 0], [3]), &device);

        let out = model.forward_evaluation(input.clone(), input, labels);
        assert_eq!(out.reconstruction.dims(), [3, 4, 3]);
        assert_eq!(out.latent_mean.dims(), [3, 3]);
    }

    #[test]
    fn test_swap_decoding_differs_from_reconstruction() {
        let device = Default::default();
        let model = tiny_model(&device);

        let input = Tensor::random(
            [2, 4, 3],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let labels = Tensor::from_data(TensorData::new(vec![0i64, 1], [2]), &device);
        let out = model.forward_evaluation(input.clone(), input, labels);

        let swapped = model.sample(
            complement(attribute_one_hot(&[0, 1], &device)),
            out.latent_mean,
        );
        assert_eq!(swapped.dims(), out.reconstruction.dims());
    }
}
