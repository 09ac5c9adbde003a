//! Configuration types.

mod network;
mod training;

pub use network::ConditionalVaeConfig;
pub use training::{CrossValConfig, LossConfig, LrStep, OptimizerKind, SavePolicy};
