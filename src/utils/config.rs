//! Configuration management
//!
//! Provides unified configuration for data loading, network sizes and
//! the training schedule.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::model::{OptimizerKind, Wgan};
use crate::training::TrainingConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data configuration
    pub data: DataConfig,
    /// Model configuration
    pub model: ModelConfig,
    /// Training configuration
    pub training: TrainingConfigFile,
}

/// Data-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory of fingerprint images
    pub image_dir: String,
    /// Images are resized to this height
    pub image_height: u32,
    /// Images are resized to this width
    pub image_width: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            image_dir: "data/fingerprints".to_string(),
            image_height: 80,
            image_width: 80,
        }
    }
}

/// Model-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Latent dimension size
    pub latent_dim: i64,
    /// Filters per Critic convolution
    pub critic_filters: i64,
    /// Filters per Generator upsampling stage
    pub generator_filters: i64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            latent_dim: 200,
            critic_filters: 64,
            generator_filters: 128,
        }
    }
}

/// Training-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfigFile {
    pub n_epochs: usize,
    pub n_batch: usize,
    /// Critic updates per Generator update
    pub n_critic: usize,
    pub clip_value: f64,
    pub learning_rate: f64,
    pub optimizer: OptimizerKind,
    /// Images rendered into each checkpoint's sample grid
    pub n_samples: i64,
    /// Checkpoint directory
    pub checkpoint_dir: String,
    /// Device: "cpu" or "cuda"
    pub device: String,
}

impl Default for TrainingConfigFile {
    fn default() -> Self {
        Self {
            n_epochs: 30,
            n_batch: 64,
            n_critic: 10,
            clip_value: 0.005,
            learning_rate: 5e-5,
            optimizer: OptimizerKind::RmsProp,
            n_samples: 25,
            checkpoint_dir: "checkpoints".to_string(),
            device: "cpu".to_string(),
        }
    }
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from TOML or JSON depending on the file extension
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if is_toml(path.as_ref()) {
            Self::from_toml(path)
        } else {
            Self::from_json(path)
        }
    }

    /// Save as TOML or JSON depending on the file extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        if is_toml(path.as_ref()) {
            self.save_toml(path)
        } else {
            self.save_json(path)
        }
    }

    /// Get device from configuration
    pub fn get_device(&self) -> tch::Device {
        match self.training.device.to_lowercase().as_str() {
            "cuda" | "gpu" => {
                if tch::Cuda::is_available() {
                    tch::Device::Cuda(0)
                } else {
                    tracing::warn!("CUDA requested but not available, falling back to CPU");
                    tch::Device::Cpu
                }
            }
            _ => tch::Device::Cpu,
        }
    }

    /// Training loop settings
    pub fn to_training_config(&self) -> TrainingConfig {
        let t = &self.training;
        TrainingConfig {
            n_epochs: t.n_epochs,
            n_batch: t.n_batch,
            n_critic: t.n_critic,
            clip_value: t.clip_value,
            learning_rate: t.learning_rate,
            optimizer: t.optimizer,
            n_samples: t.n_samples,
            show_progress: true,
        }
    }

    /// Build freshly initialized networks on the configured device
    pub fn build_model(&self) -> Wgan {
        Wgan::with_filters(
            self.data.image_height as i64,
            self.data.image_width as i64,
            self.model.latent_dim,
            self.model.critic_filters,
            self.model.generator_filters,
            self.get_device(),
        )
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.data.image_height == 0 || self.data.image_width == 0 {
            anyhow::bail!("Image dimensions must be > 0");
        }
        if self.model.latent_dim <= 0 {
            anyhow::bail!("Latent dimension must be > 0");
        }
        if self.model.critic_filters <= 0 || self.model.generator_filters <= 0 {
            anyhow::bail!("Filter counts must be > 0");
        }
        self.to_training_config().validate()?;
        Ok(())
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|e| e == "toml").unwrap_or(false)
}

/// Create default configuration file if it doesn't exist
pub fn ensure_config_exists<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref();
    if path.exists() {
        Config::load(path)
    } else {
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }
}
