//! Shared building blocks for the Critic and Generator
//!
//! Both networks use channels-last tensors at their boundaries and libtorch's
//! NCHW layout internally. Convolutions follow the "same" padding rule
//! `out = ceil(in / stride)`, padding asymmetrically when needed.

use tch::{nn, nn::Module, Tensor};

/// Negative slope of every leaky rectifier in both networks
pub const LEAKY_SLOPE: f64 = 0.2;

/// Standard deviation of the zero-mean Gaussian weight initializer
pub const INIT_STDEV: f64 = 0.02;

/// Kernel size of every strided (transposed) convolution
pub const STAGE_KERNEL: i64 = 4;

/// Stride of every down/upsampling stage
pub const STAGE_STRIDE: i64 = 2;

/// Number of down/upsampling stages in each network
pub const NUM_STAGES: usize = 4;

/// Leaky ReLU with slope [`LEAKY_SLOPE`]
pub fn leaky_relu(x: &Tensor) -> Tensor {
    x.maximum(&(x * LEAKY_SLOPE))
}

/// Weight initializer N(0, 0.02)
pub fn gaussian_init() -> nn::Init {
    nn::Init::Randn {
        mean: 0.0,
        stdev: INIT_STDEV,
    }
}

/// Output size of a "same"-padded convolution
pub fn same_output(size: i64, stride: i64) -> i64 {
    (size + stride - 1) / stride
}

/// Spatial size after `stages` "same"-padded stride-2 convolutions
pub fn downsampled(size: i64, stages: usize) -> i64 {
    (0..stages).fold(size, |s, _| same_output(s, STAGE_STRIDE))
}

/// (before, after) padding that makes a convolution "same"
pub fn same_padding(size: i64, kernel: i64, stride: i64) -> (i64, i64) {
    let out = same_output(size, stride);
    let total = ((out - 1) * stride + kernel - size).max(0);
    (total / 2, total - total / 2)
}

/// Conv2d with "same" padding computed from the input size
#[derive(Debug)]
pub struct SameConv2d {
    conv: nn::Conv2D,
    kernel: i64,
    stride: i64,
}

impl SameConv2d {
    pub fn new(vs: &nn::Path, in_channels: i64, out_channels: i64, kernel: i64, stride: i64) -> Self {
        let config = nn::ConvConfig {
            stride,
            padding: 0,
            ws_init: gaussian_init(),
            bs_init: nn::Init::Const(0.0),
            ..Default::default()
        };
        let conv = nn::conv2d(vs, in_channels, out_channels, kernel, config);

        Self { conv, kernel, stride }
    }

    /// Kernel and bias tensors (shallow clones sharing storage)
    pub fn parameters(&self) -> Vec<Tensor> {
        let mut params = vec![self.conv.ws.shallow_clone()];
        if let Some(bs) = &self.conv.bs {
            params.push(bs.shallow_clone());
        }
        params
    }
}

impl Module for SameConv2d {
    fn forward(&self, xs: &Tensor) -> Tensor {
        let size = xs.size();
        let (top, bottom) = same_padding(size[2], self.kernel, self.stride);
        let (left, right) = same_padding(size[3], self.kernel, self.stride);

        if top + bottom + left + right == 0 {
            self.conv.forward(xs)
        } else {
            self.conv.forward(&xs.constant_pad_nd([left, right, top, bottom]))
        }
    }
}
