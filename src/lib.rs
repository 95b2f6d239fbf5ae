pub mod blocks;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod data;
pub mod discriminator;
pub mod error;
pub mod export;
pub mod generator;
pub mod logging;
pub mod model;
pub mod options;
pub mod report;
pub mod training;

pub use crate::config::{Architecture, Direction, ModelConfig, OutputFormat, ReconReference, RunConfig};
pub use crate::discriminator::Discriminator;
pub use crate::error::{PairganError, Result};
pub use crate::generator::Generator;

/// CPU tensor backend used for test and export runs.
pub type EvalBackend = burn::backend::NdArray<f32>;
/// Differentiable backend used for training.
pub type TrainBackend = burn::backend::Autodiff<EvalBackend>;
