//! # dimorph
//!
//! Conditional mesh VAE with attribute disentanglement, built on Burn.
//!
//! A graph-convolutional variational autoencoder reconstructs registered 3D
//! anatomical meshes while a latent classifier disentangles a binary
//! attribute. Decoding is conditioned on a one-hot attribute, so the same
//! latent code can be re-decoded under the opposite attribute; how often the
//! swapped mesh is reclassified as the opposite class is the disentanglement
//! metric. A repeated stratified k-fold controller trains one model per fold
//! and persists checkpoints, normalization statistics, and histories.
//!
//! ## Quick Start
//!
//! ```ignore
//! use dimorph::config::{ConditionalVaeConfig, CrossValConfig};
//! use dimorph::training::CrossValidator;
//! use burn::backend::{Autodiff, NdArray};
//!
//! type MyBackend = Autodiff<NdArray>;
//!
//! let model = ConditionalVaeConfig::new(vec![16, 32]).with_latent_dim(8);
//! let crossval = CrossValConfig::new("checkpoints".into())
//!     .with_epochs(300)
//!     .with_evaluate_test(true);
//!
//! let device = Default::default();
//! let validator = CrossValidator::new(crossval, model)?;
//! let reports = validator.run::<MyBackend>(&samples, &topology, &device)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod graph;
pub mod loss;
pub mod nn;
pub mod training;

// Re-export key types for convenience
pub use config::{ConditionalVaeConfig, CrossValConfig, LossConfig};
pub use error::{DimorphError, Result};
pub use graph::{DenseMatrix, MeshTopology};
pub use nn::ConditionalVae;
pub use training::{CrossValidator, FoldReport};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{
        ConditionalVaeConfig, CrossValConfig, LossConfig, LrStep, OptimizerKind, SavePolicy,
    };
    pub use crate::data::pose::RigidAlignment;
    pub use crate::data::stats::NormStats;
    pub use crate::data::{MeshBatch, MeshBatcher, MeshSample};
    pub use crate::error::{DimorphError, Result};
    pub use crate::export::{save_obj, SwapExport};
    pub use crate::graph::{normalized_adjacency, DenseMatrix, MeshTopology};
    pub use crate::loss::ReconstructionKind;
    pub use crate::nn::{
        attribute_one_hot, complement, ConditionalVae, LatentClassifier, MeshDecoder, MeshEncoder,
    };
    pub use crate::training::{
        evaluate_epoch, stratified_k_fold, train_epoch, BestTracker, CheckpointMetadata,
        CrossValidator, EpochMetrics, FoldReport, HistoryRecord, MetricAccumulator,
    };
}
