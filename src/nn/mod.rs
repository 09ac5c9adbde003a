//! Network modules.

pub mod classifier;
pub mod conv;
pub mod decoder;
pub mod encoder;
pub mod model;

pub use classifier::LatentClassifier;
pub use conv::{GraphConv, GraphPool};
pub use decoder::MeshDecoder;
pub use encoder::MeshEncoder;
pub use model::{
    attribute_one_hot, complement, ConditionalVae, EvaluationForward, LatentDistribution,
    TrainingForward,
};
