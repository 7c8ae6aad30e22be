//! Critic network for the WGAN
//!
//! The Critic scores images with an unbounded real value. Training raises
//! scores on real images and lowers them on generated ones.
//! Architecture uses strided 2D convolutions to downsample the image.

use tch::{nn, nn::Module, nn::ModuleT, Tensor};

use super::layers::{
    downsampled, gaussian_init, leaky_relu, SameConv2d, NUM_STAGES, STAGE_KERNEL, STAGE_STRIDE,
};

/// Critic network configuration
#[derive(Debug, Clone)]
pub struct CriticConfig {
    /// Height of input images
    pub image_height: i64,
    /// Width of input images
    pub image_width: i64,
    /// Filters in every downsampling stage
    pub filters: i64,
}

impl Default for CriticConfig {
    fn default() -> Self {
        Self {
            image_height: 80,
            image_width: 80,
            filters: 64,
        }
    }
}

/// Critic network
///
/// Architecture:
/// 1. Four Conv2d(k=4, s=2, same) stages, each with BatchNorm and LeakyReLU(0.2)
/// 2. Flatten and a Dense layer to a single score (no output activation)
#[derive(Debug)]
pub struct Critic {
    config: CriticConfig,
    stages: Vec<(SameConv2d, nn::BatchNorm)>,
    /// Final scoring layer
    fc: nn::Linear,
}

impl Critic {
    /// Create a new Critic network
    pub fn new(vs: &nn::Path, config: CriticConfig) -> Self {
        let mut stages = Vec::with_capacity(NUM_STAGES);
        let mut in_channels = 1;
        for i in 0..NUM_STAGES {
            let conv = SameConv2d::new(
                &(vs / format!("conv{}", i + 1)),
                in_channels,
                config.filters,
                STAGE_KERNEL,
                STAGE_STRIDE,
            );
            let bn = nn::batch_norm2d(vs / format!("bn{}", i + 1), config.filters, Default::default());
            stages.push((conv, bn));
            in_channels = config.filters;
        }

        let out_h = downsampled(config.image_height, NUM_STAGES);
        let out_w = downsampled(config.image_width, NUM_STAGES);
        let flat_size = config.filters * out_h * out_w;

        let fc_config = nn::LinearConfig {
            ws_init: gaussian_init(),
            bs_init: Some(nn::Init::Const(0.0)),
            bias: true,
        };
        let fc = nn::linear(vs / "fc", flat_size, 1, fc_config);

        Self { config, stages, fc }
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `images` - Tensor of shape (batch_size, height, width, 1)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, 1) with unbounded scores
    pub fn forward_t(&self, images: &Tensor, train: bool) -> Tensor {
        // (batch, h, w, 1) -> (batch, 1, h, w) for Conv2D
        let mut x = images.permute([0, 3, 1, 2]);

        for (conv, bn) in &self.stages {
            x = conv.forward(&x);
            x = bn.forward_t(&x, train);
            x = leaky_relu(&x);
        }

        let batch_size = x.size()[0];
        let x = x.view([batch_size, -1]);

        self.fc.forward(&x)
    }

    /// Convolution and dense kernels and biases, sharing storage with the network
    ///
    /// Batch norm scale/shift and running statistics are not included.
    pub fn constrained_parameters(&self) -> Vec<Tensor> {
        let mut params: Vec<Tensor> = self
            .stages
            .iter()
            .flat_map(|(conv, _)| conv.parameters())
            .collect();
        params.push(self.fc.ws.shallow_clone());
        if let Some(bs) = &self.fc.bs {
            params.push(bs.shallow_clone());
        }
        params
    }

    /// Get configuration
    pub fn config(&self) -> &CriticConfig {
        &self.config
    }
}

impl ModuleT for Critic {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Critic::forward_t(self, xs, train)
    }
}
