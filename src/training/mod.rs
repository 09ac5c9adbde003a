//! Training loops, metrics, and the cross-validation controller.

pub mod checkpoint;
pub mod crossval;
pub mod epoch;
pub mod history;
pub mod metrics;
pub mod policy;
pub mod split;

pub use checkpoint::CheckpointMetadata;
pub use crossval::{CrossValidator, FoldReport};
pub use epoch::{evaluate_epoch, train_epoch};
pub use history::HistoryRecord;
pub use metrics::{EpochMetrics, MetricAccumulator};
pub use policy::BestTracker;
pub use split::{shuffle_split, stratified_k_fold, FoldSplit};
