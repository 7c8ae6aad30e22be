//! Utility module with helper functions
//!
//! This module provides:
//! - Configuration handling
//! - Checkpoint and loss-curve sinks

mod checkpoint;
mod config;

pub use checkpoint::{
    find_latest_checkpoint, list_checkpoints, load_checkpoint, load_checkpoint_meta, CheckpointDir,
    CheckpointMeta, CheckpointSink, LossCurveSink,
};
pub use config::{ensure_config_exists, Config, DataConfig, ModelConfig, TrainingConfigFile};
