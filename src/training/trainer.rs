//! Adversarial training loop for the WGAN
//!
//! Each step runs `n_critic` Critic sub-steps (one real and one fake
//! half-batch each, clipping after every update) followed by a single
//! Generator update through the composite model.

use indicatif::{ProgressBar, ProgressStyle};
use tch::{nn, Tensor};
use tracing::{debug, info, warn};

use super::constraint::WeightClipper;
use super::history::{LossHistory, StepLosses};
use super::losses::wasserstein_loss;
use crate::data::{generate_fake_samples, generate_real_samples, latent_batch, Batch, ImageDataset};
use crate::model::{OptimizerKind, Wgan};
use crate::utils::{CheckpointSink, LossCurveSink};
use crate::{Result, WganError};

/// Training configuration
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub n_epochs: usize,
    /// Batch size; Critic updates use half-batches
    pub n_batch: usize,
    /// Critic updates per Generator update
    pub n_critic: usize,
    /// Critic weights are clipped into [-clip_value, clip_value]
    pub clip_value: f64,
    /// Learning rate for both optimizers
    pub learning_rate: f64,
    /// Optimizer family for both networks
    pub optimizer: OptimizerKind,
    /// Images generated at each checkpoint
    pub n_samples: i64,
    /// Draw a progress bar over the step budget
    pub show_progress: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_epochs: 30,
            n_batch: 64,
            n_critic: 10,
            clip_value: 0.005,
            learning_rate: 5e-5,
            optimizer: OptimizerKind::RmsProp,
            n_samples: 25,
            show_progress: true,
        }
    }
}

impl TrainingConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.n_epochs == 0 {
            return Err(WganError::InvalidConfig("n_epochs must be > 0".to_string()));
        }
        if self.n_batch < 2 {
            return Err(WganError::InvalidConfig(
                "n_batch must be >= 2 so half-batches are non-empty".to_string(),
            ));
        }
        if self.n_critic == 0 {
            return Err(WganError::InvalidConfig("n_critic must be > 0".to_string()));
        }
        if !(self.clip_value.is_finite() && self.clip_value > 0.0) {
            return Err(WganError::InvalidConfig(format!(
                "clip_value must be a positive number, got {}",
                self.clip_value
            )));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(WganError::InvalidConfig(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if self.n_samples <= 0 {
            return Err(WganError::InvalidConfig("n_samples must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Step budget derived from the configuration and dataset size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingPlan {
    /// floor(N / n_batch)
    pub steps_per_epoch: usize,
    /// steps_per_epoch * n_epochs
    pub total_steps: usize,
    /// n_batch / 2
    pub half_batch: i64,
}

impl TrainingPlan {
    /// Derive the plan, failing when the dataset cannot fill a batch
    pub fn new(config: &TrainingConfig, dataset_len: usize) -> Result<Self> {
        config.validate()?;
        if dataset_len < config.n_batch {
            return Err(WganError::DatasetTooSmall {
                len: dataset_len,
                batch: config.n_batch,
            });
        }
        if dataset_len % config.n_batch != 0 {
            warn!(
                "Dataset size {} is not a multiple of batch size {}; epochs will not align with the data",
                dataset_len, config.n_batch
            );
        }

        let steps_per_epoch = dataset_len / config.n_batch;
        Ok(Self {
            steps_per_epoch,
            total_steps: steps_per_epoch * config.n_epochs,
            half_batch: (config.n_batch / 2) as i64,
        })
    }
}

/// Whether `step` (count of completed steps) closes an epoch
pub fn is_checkpoint_step(step: usize, steps_per_epoch: usize) -> bool {
    steps_per_epoch > 0 && step > 0 && step % steps_per_epoch == 0
}

/// A sink call that failed without stopping training
#[derive(Debug, Clone)]
pub struct SinkFailure {
    /// Step at which the sink was called
    pub step: usize,
    /// Error message
    pub error: String,
}

/// Outcome of a training run
#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    /// Steps completed in this run
    pub steps: usize,
    /// Loss history including this run
    pub history: LossHistory,
    /// Steps at which a checkpoint was triggered
    pub checkpoints: Vec<usize>,
    /// Checkpoint or loss-curve failures, logged and skipped
    pub sink_failures: Vec<SinkFailure>,
}

/// WGAN Trainer
///
/// Owns the model, both optimizers, the step counter and the loss history.
pub struct Trainer {
    config: TrainingConfig,
    model: Wgan,
    critic_opt: nn::Optimizer,
    gen_opt: nn::Optimizer,
    clipper: WeightClipper,
    step: usize,
    history: LossHistory,
}

impl Trainer {
    /// Create a new trainer, validating the configuration and building both optimizers
    pub fn new(model: Wgan, config: TrainingConfig) -> Result<Self> {
        config.validate()?;

        let critic_opt = model.critic_optimizer(config.optimizer, config.learning_rate)?;
        let gen_opt = model.generator_optimizer(config.optimizer, config.learning_rate)?;
        let clipper = WeightClipper::new(config.clip_value);

        Ok(Self {
            config,
            model,
            critic_opt,
            gen_opt,
            clipper,
            step: 0,
            history: LossHistory::new(),
        })
    }

    /// Check the dataset against the model and derive the step budget
    pub fn plan(&self, dataset: &ImageDataset) -> Result<TrainingPlan> {
        dataset.check_shape(self.model.image_shape())?;
        TrainingPlan::new(&self.config, dataset.len())
    }

    /// One Critic optimizer update on a labelled image batch, followed by clipping
    ///
    /// Returns the loss of the forward pass preceding the update.
    pub fn critic_update(&mut self, batch: &Batch) -> Result<f64> {
        let images = batch.samples.to_device(self.model.device);
        let labels = batch.labels.to_device(self.model.device);

        let scores = self.model.critic.forward_t(&images, true);
        let loss = wasserstein_loss(&labels, &scores);

        self.critic_opt.zero_grad();
        loss.backward();
        self.critic_opt.step();
        self.model.clip_critic(&self.clipper);

        Ok(loss.f_double_value(&[])?)
    }

    /// One Generator optimizer update through the composite model
    ///
    /// Only the Generator's optimizer steps; Critic gradients computed here
    /// are discarded by the next Critic `zero_grad`.
    pub fn generator_update(&mut self, batch: &Batch) -> Result<f64> {
        let latent = batch.samples.to_device(self.model.device);
        let labels = batch.labels.to_device(self.model.device);

        let scores = self.model.composite().forward_t(&latent, true);
        let loss = wasserstein_loss(&labels, &scores);

        self.gen_opt.zero_grad();
        loss.backward();
        self.gen_opt.step();

        Ok(loss.f_double_value(&[])?)
    }

    /// Run one training step and append its losses to the history
    pub fn train_step(&mut self, dataset: &ImageDataset, plan: &TrainingPlan) -> Result<StepLosses> {
        let mut real_losses = Vec::with_capacity(self.config.n_critic);
        let mut fake_losses = Vec::with_capacity(self.config.n_critic);

        for _ in 0..self.config.n_critic {
            let real = generate_real_samples(dataset, plan.half_batch);
            real_losses.push(self.critic_update(&real)?);

            let fake = generate_fake_samples(&self.model, plan.half_batch);
            fake_losses.push(self.critic_update(&fake)?);
        }

        let latent = latent_batch(
            self.model.latent_dim(),
            self.config.n_batch as i64,
            self.model.device,
        );
        let generator = self.generator_update(&latent)?;

        let losses = StepLosses {
            critic_real: mean(&real_losses),
            critic_fake: mean(&fake_losses),
            generator,
        };

        self.history.record(losses);
        self.step += 1;

        debug!(
            ">{}, c1={:.3}, c2={:.3} g={:.3}",
            self.step, losses.critic_real, losses.critic_fake, losses.generator
        );

        Ok(losses)
    }

    /// Train for the full step budget
    ///
    /// Checkpoints fire at every epoch boundary. Sink failures are logged and
    /// collected in the report; backend failures abort the run.
    pub fn train(
        &mut self,
        dataset: &ImageDataset,
        checkpoints: &mut dyn CheckpointSink,
        curves: &mut dyn LossCurveSink,
    ) -> Result<TrainingReport> {
        let plan = self.plan(dataset)?;
        let start_step = self.step;

        info!(
            "Starting training: {} epochs, {} steps per epoch, {} steps total",
            self.config.n_epochs, plan.steps_per_epoch, plan.total_steps
        );
        info!(
            "Half batch {}, {} critic updates per generator update, clip value {}",
            plan.half_batch, self.config.n_critic, self.config.clip_value
        );

        let pb = if self.config.show_progress {
            let pb = ProgressBar::new(plan.total_steps as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("##-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut report = TrainingReport::default();

        for _ in 0..plan.total_steps {
            self.train_step(dataset, &plan)?;

            let avg = self.history.moving_average(plan.steps_per_epoch);
            pb.set_message(format!(
                "C_real: {:.4}, C_fake: {:.4}, G: {:.4}",
                avg.critic_real, avg.critic_fake, avg.generator
            ));
            pb.inc(1);

            let step = self.step;
            if is_checkpoint_step(step - start_step, plan.steps_per_epoch) {
                info!(
                    "Epoch {}/{}: C_real={:.4}, C_fake={:.4}, G={:.4}",
                    (step - start_step) / plan.steps_per_epoch,
                    self.config.n_epochs,
                    avg.critic_real,
                    avg.critic_fake,
                    avg.generator
                );

                report.checkpoints.push(step);
                self.checkpoint(checkpoints, &mut report.sink_failures);
            }
        }

        pb.finish_with_message("done");

        if let Err(e) = curves.save_losses(&self.history) {
            warn!("Failed to save loss history: {}", e);
            report.sink_failures.push(SinkFailure {
                step: self.step,
                error: e.to_string(),
            });
        }

        report.steps = self.step - start_step;
        report.history = self.history.clone();
        Ok(report)
    }

    /// Externalize sample images and a Generator snapshot for the current step
    ///
    /// Both sink calls are always made; each failure is logged and recorded.
    fn checkpoint(&self, sink: &mut dyn CheckpointSink, failures: &mut Vec<SinkFailure>) {
        let step = self.step;
        let samples: Tensor = self.model.generate(self.config.n_samples);

        if let Err(e) = sink.save_samples(step, &samples) {
            warn!("Failed to save samples at step {}: {}", step, e);
            failures.push(SinkFailure {
                step,
                error: e.to_string(),
            });
        }
        if let Err(e) = sink.save_generator(step, &self.model, self.history.latest()) {
            warn!("Failed to save generator at step {}: {}", step, e);
            failures.push(SinkFailure {
                step,
                error: e.to_string(),
            });
        }
    }

    /// Completed training steps
    pub fn step(&self) -> usize {
        self.step
    }

    /// Loss history so far
    pub fn history(&self) -> &LossHistory {
        &self.history
    }

    /// Get the model
    pub fn model(&self) -> &Wgan {
        &self.model
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    fn small_config() -> TrainingConfig {
        TrainingConfig {
            n_epochs: 1,
            n_batch: 4,
            n_critic: 2,
            n_samples: 4,
            show_progress: false,
            ..Default::default()
        }
    }

    fn dataset(n: i64) -> ImageDataset {
        let images = Tensor::rand([n, 8, 8, 1], (Kind::Float, Device::Cpu)) * 2.0 - 1.0;
        ImageDataset::from_tensor(images).unwrap()
    }

    fn small_trainer(config: TrainingConfig) -> Trainer {
        let model = Wgan::with_filters(8, 8, 6, 4, 4, Device::Cpu);
        Trainer::new(model, config).unwrap()
    }

    #[test]
    fn test_training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.n_epochs, 30);
        assert_eq!(config.n_batch, 64);
        assert_eq!(config.n_critic, 10);
        assert_eq!(config.clip_value, 0.005);
        assert_eq!(config.learning_rate, 5e-5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let bad = [
            TrainingConfig { n_batch: 1, ..Default::default() },
            TrainingConfig { n_critic: 0, ..Default::default() },
            TrainingConfig { n_epochs: 0, ..Default::default() },
            TrainingConfig { clip_value: 0.0, ..Default::default() },
            TrainingConfig { learning_rate: f64::NAN, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(WganError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_plan_arithmetic() {
        let config = TrainingConfig {
            n_epochs: 3,
            n_batch: 10,
            ..Default::default()
        };
        let plan = TrainingPlan::new(&config, 105).unwrap();

        assert_eq!(plan.steps_per_epoch, 10);
        assert_eq!(plan.total_steps, 30);
        assert_eq!(plan.half_batch, 5);
    }

    #[test]
    fn test_plan_rejects_small_dataset() {
        let config = TrainingConfig::default();
        assert!(matches!(
            TrainingPlan::new(&config, 10),
            Err(WganError::DatasetTooSmall { len: 10, batch: 64 })
        ));
    }

    #[test]
    fn test_plan_rejects_shape_mismatch() {
        let trainer = small_trainer(small_config());
        let images = Tensor::zeros([16, 12, 12, 1], (Kind::Float, Device::Cpu));
        let data = ImageDataset::from_tensor(images).unwrap();

        assert!(matches!(trainer.plan(&data), Err(WganError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_is_checkpoint_step() {
        assert!(!is_checkpoint_step(0, 10));
        assert!(!is_checkpoint_step(9, 10));
        assert!(is_checkpoint_step(10, 10));
        assert!(is_checkpoint_step(20, 10));
        assert!(!is_checkpoint_step(5, 0));
    }

    #[test]
    fn test_first_critic_update_clips_initial_weights() {
        let data = dataset(16);
        let mut trainer = small_trainer(small_config());
        let clipper = WeightClipper::new(0.005);

        // N(0, 0.02) initialization lies outside the bound until the first update
        assert!(!clipper.is_satisfied(&trainer.model().critic.constrained_parameters()));

        let batch = generate_real_samples(&data, 2);
        trainer.critic_update(&batch).unwrap();
        assert!(clipper.is_satisfied(&trainer.model().critic.constrained_parameters()));
    }

    #[test]
    fn test_train_step_records_losses_and_keeps_clip() {
        let data = dataset(16);
        let mut trainer = small_trainer(small_config());
        let plan = trainer.plan(&data).unwrap();
        let clipper = WeightClipper::new(0.005);

        for t in 1..=3 {
            let losses = trainer.train_step(&data, &plan).unwrap();
            assert!(losses.generator.is_finite());
            assert_eq!(trainer.step(), t);
            assert_eq!(trainer.history().len(), t);
            assert!(clipper.is_satisfied(&trainer.model().critic.constrained_parameters()));
        }
    }

    #[test]
    fn test_critic_update_changes_only_critic() {
        let data = dataset(16);
        let mut trainer = small_trainer(TrainingConfig {
            learning_rate: 1e-2,
            ..small_config()
        });

        let gen_before: Vec<Tensor> = trainer
            .model()
            .gen_vs
            .trainable_variables()
            .iter()
            .map(|t| t.detach().copy())
            .collect();

        let batch = generate_real_samples(&data, 2);
        trainer.critic_update(&batch).unwrap();

        for (old, new) in gen_before.iter().zip(trainer.model().gen_vs.trainable_variables()) {
            assert!(old.equal(&new));
        }
    }

    #[test]
    fn test_generator_update_changes_only_generator() {
        let mut trainer = small_trainer(TrainingConfig {
            learning_rate: 1e-2,
            ..small_config()
        });

        let critic_before: Vec<Tensor> = trainer
            .model()
            .critic
            .constrained_parameters()
            .iter()
            .map(|t| t.detach().copy())
            .collect();
        let gen_before: Vec<Tensor> = trainer
            .model()
            .gen_vs
            .trainable_variables()
            .iter()
            .map(|t| t.detach().copy())
            .collect();

        let batch = latent_batch(6, 4, Device::Cpu);
        trainer.generator_update(&batch).unwrap();

        for (old, new) in critic_before
            .iter()
            .zip(trainer.model().critic.constrained_parameters())
        {
            assert!(old.equal(&new));
        }
        let changed = gen_before
            .iter()
            .zip(trainer.model().gen_vs.trainable_variables())
            .any(|(old, new)| !old.equal(&new));
        assert!(changed);
    }
}
