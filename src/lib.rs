//! # WGAN for Fingerprint Images
//!
//! This crate provides a Wasserstein GAN with weight clipping that learns to
//! synthesize greyscale fingerprint images.
//!
//! ## Modules
//!
//! - `data`: Image loading, normalization and batch sampling
//! - `model`: WGAN architecture (Generator and Critic)
//! - `training`: Training loop, Wasserstein loss and weight clipping
//! - `utils`: Configuration and checkpoint sinks

pub mod data;
pub mod error;
pub mod model;
pub mod training;
pub mod utils;

pub use data::{generate_fake_samples, generate_latent_points, generate_real_samples, Batch, ImageDataset};
pub use error::{Result, WganError};
pub use model::{Composite, Critic, Generator, OptimizerKind, Wgan};
pub use training::{wasserstein_loss, LossHistory, Trainer, TrainingConfig, TrainingReport, WeightClipper};
pub use utils::{CheckpointDir, CheckpointSink, Config, LossCurveSink};
