//! Training and cross-validation configuration.

use burn::config::Config;
use serde::{Deserialize, Serialize};

use crate::loss::ReconstructionKind;

/// Loss term weights.
#[derive(Config, Debug)]
pub struct LossConfig {
    /// Weight of the reconstruction term.
    #[config(default = 1.0)]
    pub reconstruction_weight: f64,
    /// Weight of the KL term.
    #[config(default = 0.001)]
    pub kl_weight: f64,
    /// Distance used by the reconstruction term.
    #[config(default = "ReconstructionKind::L1")]
    pub reconstruction: ReconstructionKind,
}

impl LossConfig {
    /// Check weight sanity.
    pub fn validate(&self) -> Result<(), String> {
        if !self.reconstruction_weight.is_finite() || self.reconstruction_weight < 0.0 {
            return Err(format!(
                "reconstruction_weight must be finite and non-negative, got {}",
                self.reconstruction_weight
            ));
        }
        if !self.kl_weight.is_finite() || self.kl_weight < 0.0 {
            return Err(format!(
                "kl_weight must be finite and non-negative, got {}",
                self.kl_weight
            ));
        }
        Ok(())
    }
}

/// Which epoch outcome triggers a checkpoint save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavePolicy {
    /// Save when validation loss matches or improves on the best so far.
    BestLoss,
    /// Save when the attribute-swap success rate matches or improves.
    BestSwapRate,
    /// Save only once, after the final epoch.
    Last,
}

/// Optimizer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    /// Adam with default hyperparameters.
    Adam,
    /// Plain SGD.
    Sgd,
}

/// One step of the learning-rate schedule.
///
/// Once the epoch number exceeds `epoch`, the rate becomes `rate`. Steps are
/// applied in order, so the last crossed threshold wins.
#[derive(Config, Debug, PartialEq)]
pub struct LrStep {
    /// Epoch threshold, exclusive.
    pub epoch: usize,
    /// Learning rate used past the threshold.
    pub rate: f64,
}

/// Configuration of one cross-validation run.
#[derive(Config, Debug)]
pub struct CrossValConfig {
    /// Directory receiving checkpoints, statistics, and histories.
    pub checkpoint_dir: String,
    /// Number of folds.
    #[config(default = 5)]
    pub folds: usize,
    /// Number of repetitions of the whole k-fold split.
    #[config(default = 1)]
    pub repeats: usize,
    /// Fraction of each fold's training partition held out for validation.
    #[config(default = 0.1)]
    pub validation_size: f64,
    /// Seed for splitting and shuffling.
    #[config(default = 42)]
    pub seed: u64,
    /// Epochs per fold.
    #[config(default = 300)]
    pub epochs: usize,
    /// Batch size.
    #[config(default = 16)]
    pub batch_size: usize,
    /// Initial learning rate.
    #[config(default = 1e-3)]
    pub learning_rate: f64,
    /// Learning-rate schedule, applied on top of `learning_rate`.
    #[config(default = "vec![]")]
    pub lr_schedule: Vec<LrStep>,
    /// Checkpoint save policy.
    #[config(default = "SavePolicy::BestLoss")]
    pub save_policy: SavePolicy,
    /// Optimizer.
    #[config(default = "OptimizerKind::Adam")]
    pub optimizer: OptimizerKind,
    /// Whether to evaluate the held-out test partition after training.
    #[config(default = false)]
    pub evaluate_test: bool,
    /// Whether to export swapped reconstructions as OBJ during the test pass.
    #[config(default = false)]
    pub export_meshes: bool,
}

impl CrossValConfig {
    /// Check configuration sanity.
    pub fn validate(&self) -> Result<(), String> {
        if self.folds < 2 {
            return Err(format!("folds must be at least 2, got {}", self.folds));
        }
        if self.repeats == 0 {
            return Err("repeats must be positive".into());
        }
        if !(0.0..1.0).contains(&self.validation_size) || self.validation_size <= 0.0 {
            return Err(format!(
                "validation_size must be in (0, 1), got {}",
                self.validation_size
            ));
        }
        if self.epochs == 0 {
            return Err("epochs must be positive".into());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be positive".into());
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }
        for step in &self.lr_schedule {
            if !step.rate.is_finite() || step.rate <= 0.0 {
                return Err(format!(
                    "scheduled learning rate must be positive, got {}",
                    step.rate
                ));
            }
        }
        Ok(())
    }

    /// Learning rate in effect at `epoch` (1-based).
    pub fn learning_rate_for(&self, epoch: usize) -> f64 {
        let mut rate = self.learning_rate;
        for step in &self.lr_schedule {
            if epoch > step.epoch {
                rate = step.rate;
            }
        }
        rate
    }
}
