//! Training module for the WGAN
//!
//! This module provides:
//! - Adversarial training loop with asymmetric Critic/Generator cadence
//! - Wasserstein loss and sign labels
//! - Weight clipping for the Critic
//! - Loss history bookkeeping

mod constraint;
mod history;
mod losses;
mod trainer;

pub use constraint::WeightClipper;
pub use history::{LossHistory, StepLosses};
pub use losses::{labels, wasserstein_loss, FAKE_LABEL, REAL_LABEL};
pub use trainer::{
    is_checkpoint_step, SinkFailure, Trainer, TrainingConfig, TrainingPlan, TrainingReport,
};
