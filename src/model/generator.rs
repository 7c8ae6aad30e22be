//! Generator network for the WGAN
//!
//! The Generator transforms latent noise vectors into synthetic greyscale images.
//! Architecture uses transposed 2D convolutions to upsample from a small feature map.

use tch::{nn, nn::Module, nn::ModuleT, Device, Kind, Tensor};

use super::layers::{gaussian_init, leaky_relu, NUM_STAGES, STAGE_KERNEL, STAGE_STRIDE};

/// Generator network configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Size of the latent noise vector
    pub latent_dim: i64,
    /// Height of output images
    pub image_height: i64,
    /// Width of output images
    pub image_width: i64,
    /// Filters in the projected feature map and every upsampling stage
    pub filters: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            latent_dim: 200,
            image_height: 80,
            image_width: 80,
            filters: 128,
        }
    }
}

impl GeneratorConfig {
    /// Spatial size of the projected feature map, e.g. 5x5 for 80x80 images
    pub fn initial_size(&self) -> (i64, i64) {
        let scale = 1i64 << NUM_STAGES;
        (
            (self.image_height + scale - 1) / scale,
            (self.image_width + scale - 1) / scale,
        )
    }
}

/// Generator network
///
/// Architecture:
/// 1. Dense layer from latent space to a (filters, h/16, w/16) feature map
/// 2. Four ConvTranspose2d(k=4, s=2) stages with BatchNorm and LeakyReLU(0.2)
/// 3. Final Conv2d(k=5, same) to one channel with Tanh activation
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    /// Initial dense projection
    fc: nn::Linear,
    stages: Vec<(nn::ConvTranspose2D, nn::BatchNorm)>,
    /// Output convolution
    out: nn::Conv2D,
}

impl Generator {
    /// Create a new Generator network
    pub fn new(vs: &nn::Path, config: GeneratorConfig) -> Self {
        let filters = config.filters;
        let (init_h, init_w) = config.initial_size();

        let fc_config = nn::LinearConfig {
            ws_init: gaussian_init(),
            bs_init: Some(nn::Init::Const(0.0)),
            bias: true,
        };
        let fc = nn::linear(vs / "fc", config.latent_dim, filters * init_h * init_w, fc_config);

        // k=4, s=2, p=1 doubles the spatial size exactly
        let up_config = nn::ConvTransposeConfig {
            stride: STAGE_STRIDE,
            padding: 1,
            ws_init: gaussian_init(),
            bs_init: nn::Init::Const(0.0),
            ..Default::default()
        };

        let stages = (0..NUM_STAGES)
            .map(|i| {
                let conv = nn::conv_transpose2d(
                    vs / format!("conv{}", i + 1),
                    filters,
                    filters,
                    STAGE_KERNEL,
                    up_config,
                );
                let bn = nn::batch_norm2d(vs / format!("bn{}", i + 1), filters, Default::default());
                (conv, bn)
            })
            .collect();

        let out_config = nn::ConvConfig {
            padding: 2,
            ws_init: gaussian_init(),
            bs_init: nn::Init::Const(0.0),
            ..Default::default()
        };
        let out = nn::conv2d(vs / "out", filters, 1, 5, out_config);

        Self {
            config,
            fc,
            stages,
            out,
        }
    }

    /// Generate synthetic images from noise
    ///
    /// # Arguments
    ///
    /// * `noise` - Tensor of shape (batch_size, latent_dim)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, image_height, image_width, 1) in [-1, 1]
    pub fn forward_t(&self, noise: &Tensor, train: bool) -> Tensor {
        let batch_size = noise.size()[0];
        let (init_h, init_w) = self.config.initial_size();

        // Project and reshape: (batch, latent) -> (batch, filters, h, w)
        let mut x = self
            .fc
            .forward(noise)
            .view([batch_size, self.config.filters, init_h, init_w]);

        for (conv, bn) in &self.stages {
            x = conv.forward(&x);
            x = bn.forward_t(&x, train);
            x = leaky_relu(&x);
        }

        let x = self.out.forward(&x).tanh();

        // Crop when the upsampled map overshoots the target size
        let size = x.size();
        let x = if size[2] != self.config.image_height || size[3] != self.config.image_width {
            x.narrow(2, 0, self.config.image_height)
                .narrow(3, 0, self.config.image_width)
        } else {
            x
        };

        // (batch, 1, h, w) -> (batch, h, w, 1)
        x.permute([0, 2, 3, 1])
    }

    /// Generate images (inference mode, no gradient tracking)
    pub fn generate(&self, noise: &Tensor) -> Tensor {
        tch::no_grad(|| self.forward_t(noise, false))
    }

    /// Generate images from fresh standard-normal noise
    pub fn generate_random(&self, num_samples: i64, device: Device) -> Tensor {
        let noise = Tensor::randn([num_samples, self.config.latent_dim], (Kind::Float, device));
        self.generate(&noise)
    }

    /// Get configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

impl ModuleT for Generator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Generator::forward_t(self, xs, train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::nn::VarStore;

    #[test]
    fn test_generator_output_shape() {
        let vs = VarStore::new(Device::Cpu);
        let config = GeneratorConfig {
            latent_dim: 20,
            image_height: 80,
            image_width: 80,
            filters: 8,
        };
        assert_eq!(config.initial_size(), (5, 5));
        let gen = Generator::new(&vs.root(), config);

        let noise = Tensor::randn([4, 20], (Kind::Float, Device::Cpu));
        let output = gen.forward_t(&noise, true);

        assert_eq!(output.size(), vec![4, 80, 80, 1]);
    }

    #[test]
    fn test_generator_crops_to_target() {
        let vs = VarStore::new(Device::Cpu);
        let config = GeneratorConfig {
            latent_dim: 10,
            image_height: 8,
            image_width: 12,
            filters: 4,
        };
        assert_eq!(config.initial_size(), (1, 1));
        let gen = Generator::new(&vs.root(), config);

        let output = gen.generate_random(3, Device::Cpu);
        assert_eq!(output.size(), vec![3, 8, 12, 1]);
    }

    #[test]
    fn test_generator_output_range() {
        let vs = VarStore::new(Device::Cpu);
        let config = GeneratorConfig {
            latent_dim: 10,
            image_height: 16,
            image_width: 16,
            filters: 4,
        };
        let gen = Generator::new(&vs.root(), config);

        // Large latents drive the tanh toward saturation
        let noise = Tensor::randn([6, 10], (Kind::Float, Device::Cpu)) * 100.0;
        let output = gen.forward_t(&noise, true);

        let min_val = output.min().double_value(&[]);
        let max_val = output.max().double_value(&[]);
        assert!(min_val >= -1.0 && max_val <= 1.0);
    }
}
