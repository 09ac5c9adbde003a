//! Repeated stratified cross-validation controller.

use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, Optimizer, SgdConfig};
use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{ConditionalVaeConfig, CrossValConfig, OptimizerKind, SavePolicy};
use crate::data::stats::NormStats;
use crate::data::MeshSample;
use crate::error::{DimorphError, Result};
use crate::export::SwapExport;
use crate::graph::MeshTopology;
use crate::nn::ConditionalVae;
use crate::training::checkpoint::{self, CheckpointMetadata};
use crate::training::epoch::{evaluate_epoch, train_epoch};
use crate::training::history::{write_history, HistoryRecord};
use crate::training::metrics::EpochMetrics;
use crate::training::policy::BestTracker;
use crate::training::split::{shuffle_split, stratified_k_fold};

/// Result of one completed fold.
#[derive(Debug)]
pub struct FoldReport {
    /// Fold number, 1-based across repeats.
    pub fold: usize,
    /// Best criterion value the save policy observed.
    pub best: Option<f64>,
    /// Epoch-by-epoch history as persisted to disk.
    pub history: Vec<HistoryRecord>,
    /// Test metrics, when the test pass ran.
    pub test: Option<EpochMetrics>,
}

/// Runs repeated stratified k-fold cross-validation.
///
/// Each fold trains a freshly initialized model on its own train/validation
/// split, checkpoints per the save policy, and optionally evaluates the
/// held-out test partition with the best checkpoint restored.
pub struct CrossValidator {
    crossval: CrossValConfig,
    model: ConditionalVaeConfig,
}

struct FoldPartitions<'a> {
    train: Vec<&'a MeshSample>,
    validation: Vec<&'a MeshSample>,
    test: Vec<&'a MeshSample>,
}

impl CrossValidator {
    /// Validate both configurations and build the controller.
    pub fn new(crossval: CrossValConfig, model: ConditionalVaeConfig) -> Result<Self> {
        crossval
            .validate()
            .map_err(|message| DimorphError::InvalidConfig { message })?;
        model
            .loss
            .validate()
            .map_err(|message| DimorphError::InvalidConfig { message })?;
        Ok(Self { crossval, model })
    }

    /// Run the full cross-validation over `samples`.
    ///
    /// Persistence failures are logged and skip only the affected fold; any
    /// other error aborts the run.
    pub fn run<B: AutodiffBackend>(
        &self,
        samples: &[MeshSample],
        topology: &MeshTopology,
        device: &B::Device,
    ) -> Result<Vec<FoldReport>> {
        topology.validate()?;
        let checkpoint_dir = PathBuf::from(&self.crossval.checkpoint_dir);
        std::fs::create_dir_all(&checkpoint_dir)?;

        let labels: Vec<u8> = samples.iter().map(|s| s.label).collect();
        let mut reports = Vec::new();
        let mut fold = 0usize;

        for repeat in 0..self.crossval.repeats {
            let splits = stratified_k_fold(
                &labels,
                self.crossval.folds,
                self.crossval.seed.wrapping_add(repeat as u64),
            )?;

            for split in splits {
                fold += 1;
                let fold_seed = self.crossval.seed ^ fold as u64;
                let (train_idx, valid_idx) =
                    shuffle_split(&split.train, self.crossval.validation_size, fold_seed)?;

                let partitions = FoldPartitions {
                    train: train_idx.iter().map(|&i| &samples[i]).collect(),
                    validation: valid_idx.iter().map(|&i| &samples[i]).collect(),
                    test: split.test.iter().map(|&i| &samples[i]).collect(),
                };

                match self.run_fold::<B>(fold, &checkpoint_dir, topology, &partitions, device) {
                    Ok(report) => reports.push(report),
                    Err(err) if err.is_persistence() => {
                        log::error!("fold {fold}: persistence failed, skipping fold: {err}");
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        Ok(reports)
    }

    fn run_fold<B: AutodiffBackend>(
        &self,
        fold: usize,
        checkpoint_dir: &Path,
        topology: &MeshTopology,
        partitions: &FoldPartitions<'_>,
        device: &B::Device,
    ) -> Result<FoldReport> {
        let stats = NormStats::from_samples(&partitions.train)?;
        stats.save(&checkpoint_dir.join(format!("norm_{fold}.json")))?;

        log::info!(
            "fold {fold}: {} train, {} validation, {} test samples",
            partitions.train.len(),
            partitions.validation.len(),
            partitions.test.len()
        );

        match self.crossval.optimizer {
            OptimizerKind::Adam => {
                let optimizer = AdamConfig::new().init::<B, ConditionalVae<B>>();
                self.train_fold(fold, checkpoint_dir, topology, partitions, &stats, optimizer, device)
            }
            OptimizerKind::Sgd => {
                let optimizer = SgdConfig::new().init::<B, ConditionalVae<B>>();
                self.train_fold(fold, checkpoint_dir, topology, partitions, &stats, optimizer, device)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn train_fold<B, O>(
        &self,
        fold: usize,
        checkpoint_dir: &Path,
        topology: &MeshTopology,
        partitions: &FoldPartitions<'_>,
        stats: &NormStats,
        mut optimizer: O,
        device: &B::Device,
    ) -> Result<FoldReport>
    where
        B: AutodiffBackend,
        O: Optimizer<ConditionalVae<B>, B>,
    {
        let mut model = self.model.init::<B>(topology, device)?;
        let mut tracker = BestTracker::new(self.crossval.save_policy);
        let mut rng = StdRng::seed_from_u64(self.crossval.seed ^ fold as u64);
        let mut history = Vec::with_capacity(self.crossval.epochs);

        for epoch in 1..=self.crossval.epochs {
            let begin = unix_seconds();
            let started = Instant::now();
            let learning_rate = self.crossval.learning_rate_for(epoch);

            let (stepped, training) = train_epoch(
                model,
                &mut optimizer,
                learning_rate,
                &partitions.train,
                stats,
                self.crossval.batch_size,
                &mut rng,
                device,
            )?;
            model = stepped;

            let validation = evaluate_epoch(
                &model.valid(),
                &partitions.validation,
                stats,
                self.crossval.batch_size,
                device,
                None,
            )?;

            let criterion = match self.crossval.save_policy {
                SavePolicy::BestSwapRate => validation.swap_success_rate.unwrap_or(f64::NAN),
                _ => validation.loss,
            };
            let saved = tracker.observe(criterion);
            if saved {
                let metadata = CheckpointMetadata {
                    fold,
                    epoch,
                    train_loss: training.loss,
                    val_loss: validation.loss,
                };
                checkpoint::save_checkpoint(checkpoint_dir, &model, &optimizer, &metadata)?;
            }

            log::info!(
                "fold {fold} epoch {epoch}: train loss {:.6} (kld {:.6}, rec {:.6}, acc {:.3}) \
                 valid loss {:.6} (acc {:.3}, swap {:.3}){}",
                training.loss,
                training.kld,
                training.reconstruction_loss,
                training.accuracy,
                validation.loss,
                validation.accuracy,
                validation.swap_success_rate.unwrap_or(f64::NAN),
                if saved { " [saved]" } else { "" }
            );

            history.push(HistoryRecord {
                epoch,
                begin,
                duration: started.elapsed().as_secs_f64(),
                training,
                validation,
                saved: saved.then_some(true),
                test: None,
            });
        }

        if self.crossval.save_policy == SavePolicy::Last {
            let last = history
                .last()
                .ok_or(DimorphError::EmptyLoader)?;
            let metadata = CheckpointMetadata {
                fold,
                epoch: last.epoch,
                train_loss: last.training.loss,
                val_loss: last.validation.loss,
            };
            checkpoint::save_checkpoint(checkpoint_dir, &model, &optimizer, &metadata)?;
        }

        let mut test = None;
        if self.crossval.evaluate_test {
            let restored = checkpoint::load_model(
                checkpoint_dir,
                fold,
                self.model.init::<B>(topology, device)?,
                device,
            )?;

            let exporter = if self.crossval.export_meshes {
                Some(SwapExport::new(checkpoint_dir, fold, topology.faces.clone())?)
            } else {
                None
            };

            let metrics = evaluate_epoch(
                &restored.valid(),
                &partitions.test,
                stats,
                self.crossval.batch_size,
                device,
                exporter.as_ref(),
            )?;
            log::info!(
                "fold {fold} test: loss {:.6}, acc {:.3}, swap {:.3}",
                metrics.loss,
                metrics.accuracy,
                metrics.swap_success_rate.unwrap_or(f64::NAN)
            );
            if let Some(last) = history.last_mut() {
                last.test = Some(metrics.clone());
            }
            test = Some(metrics);
        }

        write_history(
            &checkpoint_dir.join(format!("history_{fold}.json")),
            &history,
        )?;

        Ok(FoldReport {
            fold,
            best: tracker.best(),
            history,
            test,
        })
    }
}

fn unix_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
