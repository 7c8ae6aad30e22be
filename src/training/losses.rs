//! Wasserstein loss for WGAN training
//!
//! Labels are sign multipliers, not probabilities: -1 marks real images and
//! +1 marks generated ones. The loss is unbounded in both directions.

use tch::{Kind, Tensor};

/// Label for real images
pub const REAL_LABEL: f64 = -1.0;

/// Label for generated images
pub const FAKE_LABEL: f64 = 1.0;

/// Wasserstein loss: mean(y_true * y_pred)
///
/// With labels -1 for real and +1 for fake, minimizing this raises the
/// Critic's scores on real images and lowers them on generated ones. The
/// Generator is trained with all labels -1, which raises the Critic's scores
/// on its samples toward the real side.
///
/// # Arguments
///
/// * `y_true` - Sign labels in {-1, +1}, shape (batch_size, 1)
/// * `y_pred` - Critic scores, shape (batch_size, 1)
///
/// # Returns
///
/// Scalar loss tensor
pub fn wasserstein_loss(y_true: &Tensor, y_pred: &Tensor) -> Tensor {
    (y_true * y_pred).mean(Kind::Float)
}

/// Labels tensor of shape (n, 1) filled with `label`
pub fn labels(n: i64, label: f64, device: tch::Device) -> Tensor {
    Tensor::full([n, 1], label, (Kind::Float, device))
}
