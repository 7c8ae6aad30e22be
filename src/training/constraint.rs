//! Weight clipping for the Critic's Lipschitz constraint

use tch::Tensor;

/// Clamps parameter tensors elementwise into [-clip_value, clip_value]
#[derive(Debug, Clone, Copy)]
pub struct WeightClipper {
    clip_value: f64,
}

impl WeightClipper {
    /// Create a clipper for the symmetric interval [-clip_value, clip_value]
    pub fn new(clip_value: f64) -> Self {
        Self {
            clip_value: clip_value.abs(),
        }
    }

    pub fn clip_value(&self) -> f64 {
        self.clip_value
    }

    /// Clipped copy of `w`: max(min(w, c), -c)
    pub fn clip(&self, w: &Tensor) -> Tensor {
        w.clamp(-self.clip_value, self.clip_value)
    }

    /// Clip parameters in place
    ///
    /// Parameters are leaf tensors tracked by autograd, so the write happens
    /// under `no_grad`. Compliant values are left unchanged.
    pub fn apply(&self, params: &[Tensor]) {
        tch::no_grad(|| {
            for param in params {
                let mut param = param.shallow_clone();
                let _ = param.clamp_(-self.clip_value, self.clip_value);
            }
        });
    }

    /// Whether every value of every tensor lies within the interval
    pub fn is_satisfied(&self, params: &[Tensor]) -> bool {
        params.iter().all(|p| {
            p.numel() == 0 || p.abs().max().double_value(&[]) <= self.clip_value + f32::EPSILON as f64
        })
    }
}
