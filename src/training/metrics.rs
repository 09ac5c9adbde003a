//! Sample-weighted metric aggregation.
//!
//! All epoch metrics are averaged over samples, never over batches, so a
//! short trailing batch carries proportionally less weight.

use serde::{Deserialize, Serialize};

use crate::error::{DimorphError, Result};

/// Accumulates per-batch contributions across one epoch.
#[derive(Debug, Clone, Default)]
pub struct MetricAccumulator {
    samples: usize,
    loss_sum: f64,
    kld_sum: f64,
    reconstruction_sum: f64,
    error_sum: f64,
    correct: usize,
    swap_total: usize,
    swap_success: usize,
}

impl MetricAccumulator {
    /// New, empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one batch's mean loss terms, weighted by its sample count.
    pub fn record_batch(&mut self, batch_size: usize, loss: f64, kld: f64, reconstruction: f64) {
        let weight = batch_size as f64;
        self.samples += batch_size;
        self.loss_sum += loss * weight;
        self.kld_sum += kld * weight;
        self.reconstruction_sum += reconstruction * weight;
    }

    /// Record per-sample physical-space vertex errors.
    pub fn record_errors(&mut self, errors: &[f32]) {
        self.error_sum += errors.iter().map(|&e| e as f64).sum::<f64>();
    }

    /// Record the number of correctly classified samples in a batch.
    pub fn record_correct(&mut self, correct: usize) {
        self.correct += correct;
    }

    /// Record attribute-swap outcomes.
    ///
    /// A swap succeeds when the reclassified label equals the expected
    /// (opposite of ground truth) label.
    pub fn record_swaps(&mut self, expected: &[i64], reclassified: &[i64]) {
        self.swap_total += expected.len();
        self.swap_success += expected
            .iter()
            .zip(reclassified)
            .filter(|(e, r)| e == r)
            .count();
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: &MetricAccumulator) {
        self.samples += other.samples;
        self.loss_sum += other.loss_sum;
        self.kld_sum += other.kld_sum;
        self.reconstruction_sum += other.reconstruction_sum;
        self.error_sum += other.error_sum;
        self.correct += other.correct;
        self.swap_total += other.swap_total;
        self.swap_success += other.swap_success;
    }

    /// Finish the epoch. Fails when no samples were recorded.
    pub fn finalize(&self) -> Result<EpochMetrics> {
        if self.samples == 0 {
            return Err(DimorphError::EmptyLoader);
        }
        let n = self.samples as f64;
        let swap_success_rate = if self.swap_total > 0 {
            Some(self.swap_success as f64 / self.swap_total as f64)
        } else {
            None
        };
        Ok(EpochMetrics {
            loss: self.loss_sum / n,
            kld: self.kld_sum / n,
            reconstruction_loss: self.reconstruction_sum / n,
            accuracy: self.correct as f64 / n,
            error: self.error_sum / n,
            swap_success_rate,
            samples: self.samples,
        })
    }
}

/// Sample-averaged metrics of one epoch over one partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Composite loss.
    pub loss: f64,
    /// KL term.
    pub kld: f64,
    /// Reconstruction term.
    pub reconstruction_loss: f64,
    /// Classifier accuracy.
    pub accuracy: f64,
    /// Mean physical-space vertex error.
    pub error: f64,
    /// Attribute-swap success rate, present only when swaps were evaluated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap_success_rate: Option<f64>,
    /// Number of samples aggregated.
    pub samples: usize,
}
