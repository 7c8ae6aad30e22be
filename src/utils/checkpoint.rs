//! Checkpoint and loss-curve sinks
//!
//! The trainer hands sample images, Generator snapshots and the final loss
//! history to these traits. `CheckpointDir` persists them on disk:
//!
//! ```text
//! <root>/checkpoint_step_000010/generator.pt
//! <root>/checkpoint_step_000010/samples.png
//! <root>/checkpoint_step_000010/meta.json
//! <root>/loss_history.csv
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tch::{Device, Tensor};

use crate::data::to_gray_grid;
use crate::model::Wgan;
use crate::training::{LossHistory, StepLosses};
use crate::Result;

const CHECKPOINT_PREFIX: &str = "checkpoint_step_";

/// Receives periodic snapshots during training
pub trait CheckpointSink {
    /// Sample images of shape (n, height, width, 1) generated at `step`
    fn save_samples(&mut self, step: usize, samples: &Tensor) -> Result<()>;

    /// Snapshot of the Generator's parameters at `step`, with the losses of that step
    fn save_generator(&mut self, step: usize, model: &Wgan, losses: Option<StepLosses>) -> Result<()>;
}

/// Receives the loss history when training completes
pub trait LossCurveSink {
    fn save_losses(&mut self, history: &LossHistory) -> Result<()>;
}

/// Checkpoint metadata, enough to rebuild the Generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Completed training steps
    pub step: usize,
    pub latent_dim: i64,
    pub image_height: i64,
    pub image_width: i64,
    pub generator_filters: i64,
    pub critic_filters: i64,
    /// Losses of the step that triggered the checkpoint
    pub losses: Option<StepLosses>,
    /// Timestamp of checkpoint
    pub timestamp: String,
}

impl CheckpointMeta {
    /// Describe the model as it is at `step`
    pub fn from_model(step: usize, model: &Wgan, losses: Option<StepLosses>) -> Self {
        let [image_height, image_width, _] = model.image_shape();
        Self {
            step,
            latent_dim: model.latent_dim(),
            image_height,
            image_width,
            generator_filters: model.generator.config().filters,
            critic_filters: model.critic.config().filters,
            losses,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Filesystem sink writing one directory per checkpoint
#[derive(Debug, Clone)]
pub struct CheckpointDir {
    root: PathBuf,
}

impl CheckpointDir {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for the checkpoint taken at `step`
    pub fn step_dir(&self, step: usize) -> PathBuf {
        self.root.join(format!("{}{:06}", CHECKPOINT_PREFIX, step))
    }

    /// Path of the loss history CSV
    pub fn loss_history_path(&self) -> PathBuf {
        self.root.join("loss_history.csv")
    }

    fn ensure_step_dir(&self, step: usize) -> Result<PathBuf> {
        let dir = self.step_dir(step);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

impl CheckpointSink for CheckpointDir {
    fn save_samples(&mut self, step: usize, samples: &Tensor) -> Result<()> {
        let path = self.ensure_step_dir(step)?.join("samples.png");
        to_gray_grid(samples)?.save(&path)?;
        tracing::info!("Saved samples to {}", path.display());
        Ok(())
    }

    fn save_generator(&mut self, step: usize, model: &Wgan, losses: Option<StepLosses>) -> Result<()> {
        let dir = self.ensure_step_dir(step)?;
        model.save_generator(dir.join("generator.pt"))?;

        // meta.json marks the checkpoint complete, so it goes last
        let meta = CheckpointMeta::from_model(step, model, losses);
        std::fs::write(dir.join("meta.json"), serde_json::to_string_pretty(&meta)?)?;

        tracing::info!("Saved checkpoint to {}", dir.display());
        Ok(())
    }
}

impl LossCurveSink for CheckpointDir {
    fn save_losses(&mut self, history: &LossHistory) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.loss_history_path();
        history.save_csv(&path)?;
        tracing::info!("Saved loss history ({} steps) to {}", history.len(), path.display());
        Ok(())
    }
}

/// Load checkpoint metadata
pub fn load_checkpoint_meta<P: AsRef<Path>>(checkpoint_dir: P) -> Result<CheckpointMeta> {
    let content = std::fs::read_to_string(checkpoint_dir.as_ref().join("meta.json"))?;
    let meta: CheckpointMeta = serde_json::from_str(&content)?;
    Ok(meta)
}

/// Rebuild a model from a checkpoint directory and load its Generator weights
///
/// The Critic is freshly initialized; checkpoints only carry the Generator.
pub fn load_checkpoint<P: AsRef<Path>>(checkpoint_dir: P, device: Device) -> Result<(CheckpointMeta, Wgan)> {
    let checkpoint_dir = checkpoint_dir.as_ref();
    let meta = load_checkpoint_meta(checkpoint_dir)?;

    let mut model = Wgan::with_filters(
        meta.image_height,
        meta.image_width,
        meta.latent_dim,
        meta.critic_filters,
        meta.generator_filters,
        device,
    );
    model.load_generator(checkpoint_dir.join("generator.pt"))?;

    tracing::info!("Loaded checkpoint from {} (step {})", checkpoint_dir.display(), meta.step);
    Ok((meta, model))
}

/// Checkpoint directories holding both `meta.json` and `generator.pt`
fn checkpoint_dirs(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| n.starts_with(CHECKPOINT_PREFIX))
                .unwrap_or(false)
        })
        .map(|e| e.path())
        .filter(|p| p.join("meta.json").is_file() && p.join("generator.pt").is_file())
        .collect()
}

/// Find the latest complete checkpoint in a directory
pub fn find_latest_checkpoint<P: AsRef<Path>>(dir: P) -> Option<PathBuf> {
    // Zero-padded step numbers sort lexicographically
    checkpoint_dirs(dir.as_ref()).into_iter().max()
}

/// List all checkpoints in a directory, ordered by step
pub fn list_checkpoints<P: AsRef<Path>>(dir: P) -> Vec<(PathBuf, CheckpointMeta)> {
    let mut checkpoints: Vec<_> = checkpoint_dirs(dir.as_ref())
        .into_iter()
        .filter_map(|path| load_checkpoint_meta(&path).ok().map(|meta| (path, meta)))
        .collect();
    checkpoints.sort_by_key(|(_, meta)| meta.step);
    checkpoints
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_wgan() -> Wgan {
        Wgan::with_filters(8, 8, 6, 4, 4, Device::Cpu)
    }

    #[test]
    fn test_checkpoint_meta_serialization() {
        let meta = CheckpointMeta {
            step: 10,
            latent_dim: 200,
            image_height: 80,
            image_width: 80,
            generator_filters: 128,
            critic_filters: 64,
            losses: Some(StepLosses {
                critic_real: -0.01,
                critic_fake: 0.02,
                generator: -0.03,
            }),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        };

        let json = serde_json::to_string(&meta).unwrap();
        let loaded: CheckpointMeta = serde_json::from_str(&json).unwrap();

        assert_eq!(meta, loaded);
    }

    #[test]
    fn test_checkpoint_dir_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = CheckpointDir::new(tmp.path());
        let model = small_wgan();

        sink.save_samples(10, &model.generate(4)).unwrap();
        let losses = StepLosses {
            critic_real: -0.5,
            critic_fake: 0.25,
            generator: -0.125,
        };
        sink.save_generator(10, &model, Some(losses)).unwrap();

        let dir = sink.step_dir(10);
        assert!(dir.join("samples.png").exists());
        assert!(dir.join("generator.pt").exists());

        let (meta, restored) = load_checkpoint(&dir, Device::Cpu).unwrap();
        assert_eq!(meta.step, 10);
        assert_eq!(meta.latent_dim, 6);
        assert_eq!(meta.losses, Some(losses));

        let latent = model.sample_latent(2);
        let a = model.generator.generate(&latent);
        let b = restored.generator.generate(&latent);
        assert!(a.allclose(&b, 1e-6, 1e-6, false));
    }

    #[test]
    fn test_find_and_list_checkpoints() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = CheckpointDir::new(tmp.path());
        let model = small_wgan();

        assert!(find_latest_checkpoint(tmp.path()).is_none());

        for step in [20, 10, 30] {
            sink.save_generator(step, &model, None).unwrap();
        }

        assert_eq!(find_latest_checkpoint(tmp.path()), Some(sink.step_dir(30)));
        let steps: Vec<usize> = list_checkpoints(tmp.path()).iter().map(|(_, m)| m.step).collect();
        assert_eq!(steps, vec![10, 20, 30]);
    }

    #[test]
    fn test_latest_checkpoint_skips_incomplete_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = CheckpointDir::new(tmp.path());
        let model = small_wgan();

        sink.save_samples(20, &model.generate(4)).unwrap();
        sink.save_generator(20, &model, None).unwrap();

        // A later checkpoint whose generator snapshot never landed
        sink.save_samples(30, &model.generate(4)).unwrap();
        assert!(sink.step_dir(30).join("samples.png").exists());

        assert_eq!(find_latest_checkpoint(tmp.path()), Some(sink.step_dir(20)));
        let steps: Vec<usize> = list_checkpoints(tmp.path()).iter().map(|(_, m)| m.step).collect();
        assert_eq!(steps, vec![20]);

        let (meta, _) = load_checkpoint(find_latest_checkpoint(tmp.path()).unwrap(), Device::Cpu).unwrap();
        assert_eq!(meta.step, 20);
    }

    #[test]
    fn test_save_losses() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = CheckpointDir::new(tmp.path().join("run"));

        let mut history = LossHistory::new();
        history.record(StepLosses {
            critic_real: -0.1,
            critic_fake: 0.2,
            generator: -0.3,
        });
        sink.save_losses(&history).unwrap();

        let loaded = LossHistory::load_csv(sink.loss_history_path()).unwrap();
        assert_eq!(loaded, history);
    }
}
