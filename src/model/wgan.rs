//! WGAN wrapper combining Generator and Critic
//!
//! Each network owns its own `VarStore`, so an optimizer built from one store
//! can never step the other network's parameters.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tch::{nn, nn::OptimizerConfig, nn::VarStore, Device, Kind, Tensor};

use super::critic::{Critic, CriticConfig};
use super::generator::{Generator, GeneratorConfig};
use crate::training::WeightClipper;
use crate::Result;

/// Optimizer family used for both networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// RMSProp with rho = 0.9, the canonical WGAN choice
    RmsProp,
    /// Adam with beta1 = 0.5
    Adam,
}

impl Default for OptimizerKind {
    fn default() -> Self {
        OptimizerKind::RmsProp
    }
}

/// Complete WGAN model
pub struct Wgan {
    /// Generator network
    pub generator: Generator,
    /// Critic network
    pub critic: Critic,
    /// Variable store for generator
    pub gen_vs: VarStore,
    /// Variable store for critic
    pub critic_vs: VarStore,
    /// Device (CPU/GPU)
    pub device: Device,
}

/// Generator followed by Critic, used only to compute Generator gradients
///
/// Borrows both networks; the Critic's parameters are read, never stepped,
/// because only the Generator's optimizer is applied to this view's loss.
pub struct Composite<'a> {
    generator: &'a Generator,
    critic: &'a Critic,
}

impl<'a> Composite<'a> {
    /// Score freshly generated images for a latent batch
    ///
    /// # Arguments
    ///
    /// * `latent` - Tensor of shape (batch_size, latent_dim)
    /// * `train` - Training mode for both networks' batch norm
    ///
    /// # Returns
    ///
    /// Critic scores of shape (batch_size, 1)
    pub fn forward_t(&self, latent: &Tensor, train: bool) -> Tensor {
        let images = self.generator.forward_t(latent, train);
        self.critic.forward_t(&images, train)
    }
}

impl Wgan {
    /// Create a new WGAN model
    ///
    /// # Arguments
    ///
    /// * `gen_config` - Generator configuration
    /// * `critic_config` - Critic configuration
    /// * `device` - Device to create model on
    pub fn new(gen_config: GeneratorConfig, critic_config: CriticConfig, device: Device) -> Self {
        let gen_vs = VarStore::new(device);
        let critic_vs = VarStore::new(device);

        let generator = Generator::new(&gen_vs.root(), gen_config);
        let critic = Critic::new(&critic_vs.root(), critic_config);

        Self {
            generator,
            critic,
            gen_vs,
            critic_vs,
            device,
        }
    }

    /// Create a WGAN with default filter counts for the given image and latent sizes
    pub fn with_defaults(image_height: i64, image_width: i64, latent_dim: i64, device: Device) -> Self {
        Self::with_filters(image_height, image_width, latent_dim, 64, 128, device)
    }

    /// Create a WGAN with explicit filter counts
    pub fn with_filters(
        image_height: i64,
        image_width: i64,
        latent_dim: i64,
        critic_filters: i64,
        generator_filters: i64,
        device: Device,
    ) -> Self {
        let gen_config = GeneratorConfig {
            latent_dim,
            image_height,
            image_width,
            filters: generator_filters,
        };

        let critic_config = CriticConfig {
            image_height,
            image_width,
            filters: critic_filters,
        };

        Self::new(gen_config, critic_config, device)
    }

    /// Generate synthetic images in inference mode
    ///
    /// # Returns
    ///
    /// Tensor of shape (num_samples, image_height, image_width, 1)
    pub fn generate(&self, num_samples: i64) -> Tensor {
        self.generator.generate_random(num_samples, self.device)
    }

    /// Generator-then-Critic view for the Generator update
    pub fn composite(&self) -> Composite<'_> {
        Composite {
            generator: &self.generator,
            critic: &self.critic,
        }
    }

    /// Optimizer over the Critic's variables only
    pub fn critic_optimizer(&self, kind: OptimizerKind, lr: f64) -> Result<nn::Optimizer> {
        build_optimizer(&self.critic_vs, kind, lr)
    }

    /// Optimizer over the Generator's variables only
    pub fn generator_optimizer(&self, kind: OptimizerKind, lr: f64) -> Result<nn::Optimizer> {
        build_optimizer(&self.gen_vs, kind, lr)
    }

    /// Clamp every Critic kernel and bias into the clipper's interval
    pub fn clip_critic(&self, clipper: &WeightClipper) {
        clipper.apply(&self.critic.constrained_parameters());
    }

    /// Save a snapshot of the Generator's parameters
    pub fn save_generator<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.gen_vs.save(path)?;
        Ok(())
    }

    /// Load Generator parameters saved by [`Wgan::save_generator`]
    pub fn load_generator<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.gen_vs.load(path)?;
        Ok(())
    }

    /// Get latent dimension
    pub fn latent_dim(&self) -> i64 {
        self.generator.config().latent_dim
    }

    /// Image shape (height, width, channels) both networks agree on
    pub fn image_shape(&self) -> [i64; 3] {
        let config = self.generator.config();
        [config.image_height, config.image_width, 1]
    }

    /// Fresh standard-normal latent vectors on the model's device
    pub fn sample_latent(&self, num_samples: i64) -> Tensor {
        Tensor::randn([num_samples, self.latent_dim()], (Kind::Float, self.device))
    }
}

fn build_optimizer(vs: &VarStore, kind: OptimizerKind, lr: f64) -> Result<nn::Optimizer> {
    let optimizer = match kind {
        OptimizerKind::RmsProp => nn::RmsProp {
            alpha: 0.9,
            eps: 1e-7,
            ..Default::default()
        }
        .build(vs, lr)?,
        OptimizerKind::Adam => nn::Adam {
            beta1: 0.5,
            beta2: 0.999,
            ..Default::default()
        }
        .build(vs, lr)?,
    };
    Ok(optimizer)
}
