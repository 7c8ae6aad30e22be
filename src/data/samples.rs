//! Labelled batches for Critic and Generator updates
//!
//! Real images are labelled -1, generated images +1, and latent batches for
//! the Generator update are labelled -1 so the Generator chases "real" scores.

use rand::Rng;
use tch::{Device, Kind, Tensor};

use super::dataset::ImageDataset;
use crate::model::{Generator, Wgan};
use crate::training::{labels, FAKE_LABEL, REAL_LABEL};

/// Inputs paired with sign labels of shape (n, 1)
#[derive(Debug)]
pub struct Batch {
    /// Images (n, height, width, 1) or latent vectors (n, latent_dim)
    pub samples: Tensor,
    /// Labels in {-1, +1}
    pub labels: Tensor,
}

/// Draw `n` indices uniformly from [0, len), with replacement
pub fn sample_indices(len: usize, n: i64) -> Vec<i64> {
    let mut rng = rand::thread_rng();
    (0..n).map(|_| rng.gen_range(0..len) as i64).collect()
}

/// Random real images from the dataset, labelled -1
pub fn generate_real_samples(dataset: &ImageDataset, n: i64) -> Batch {
    let indices = sample_indices(dataset.len(), n);
    let samples = dataset.select(&indices);
    let labels = labels(n, REAL_LABEL, samples.device());

    Batch { samples, labels }
}

/// Standard-normal latent vectors of shape (n, latent_dim)
pub fn generate_latent_points(latent_dim: i64, n: i64, device: Device) -> Tensor {
    Tensor::randn([n, latent_dim], (Kind::Float, device))
}

/// Latent vectors labelled -1, input to the Generator update
pub fn latent_batch(latent_dim: i64, n: i64, device: Device) -> Batch {
    Batch {
        samples: generate_latent_points(latent_dim, n, device),
        labels: labels(n, REAL_LABEL, device),
    }
}

/// Images generated from the given latent vectors, labelled +1
///
/// The Generator runs in inference mode without gradient tracking.
pub fn fake_samples_from_latent(generator: &Generator, latent: &Tensor) -> Batch {
    let samples = generator.generate(latent);
    let labels = labels(latent.size()[0], FAKE_LABEL, latent.device());

    Batch { samples, labels }
}

/// `n` freshly generated images, labelled +1
pub fn generate_fake_samples(model: &Wgan, n: i64) -> Batch {
    let latent = generate_latent_points(model.latent_dim(), n, model.device);
    fake_samples_from_latent(&model.generator, &latent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(n: i64) -> ImageDataset {
        let images = Tensor::rand([n, 8, 8, 1], (Kind::Float, Device::Cpu)) * 2.0 - 1.0;
        ImageDataset::from_tensor(images).unwrap()
    }

    fn all_equal(t: &Tensor, value: f64) -> bool {
        (t - value).abs().max().double_value(&[]) == 0.0
    }

    #[test]
    fn test_sample_indices_in_range() {
        let indices = sample_indices(7, 500);
        assert_eq!(indices.len(), 500);
        assert!(indices.iter().all(|&i| (0..7).contains(&i)));
        // With 500 draws over 7 slots every slot appears
        for i in 0..7 {
            assert!(indices.contains(&i));
        }
    }

    #[test]
    fn test_real_samples_come_from_dataset() {
        let data = dataset(20);
        let batch = generate_real_samples(&data, 12);

        assert_eq!(batch.samples.size(), vec![12, 8, 8, 1]);
        assert_eq!(batch.labels.size(), vec![12, 1]);
        assert!(all_equal(&batch.labels, REAL_LABEL));

        // Every sampled image matches some dataset row exactly
        let flat_data = data.images().view([20, -1]);
        for i in 0..batch.samples.size()[0] {
            let row = batch.samples.get(i).view([1, -1]);
            let distances = (&flat_data - &row).abs().sum_dim_intlist([1].as_slice(), false, Kind::Float);
            assert_eq!(distances.min().double_value(&[]), 0.0);
        }
    }

    #[test]
    fn test_latent_batch() {
        let batch = latent_batch(10, 6, Device::Cpu);
        assert_eq!(batch.samples.size(), vec![6, 10]);
        assert!(all_equal(&batch.labels, REAL_LABEL));
    }

    #[test]
    fn test_fake_samples_match_generator_output() {
        let model = Wgan::with_filters(8, 8, 10, 4, 4, Device::Cpu);
        let latent = generate_latent_points(10, 5, Device::Cpu);

        let batch = fake_samples_from_latent(&model.generator, &latent);
        assert!(all_equal(&batch.labels, FAKE_LABEL));

        let expected = model.generator.generate(&latent);
        assert!(batch.samples.allclose(&expected, 1e-6, 1e-6, false));
        assert!(!batch.samples.requires_grad());
    }

    #[test]
    fn test_generate_fake_samples() {
        let model = Wgan::with_filters(8, 8, 10, 4, 4, Device::Cpu);
        let batch = generate_fake_samples(&model, 7);

        assert_eq!(batch.samples.size(), vec![7, 8, 8, 1]);
        assert_eq!(batch.labels.size(), vec![7, 1]);
        assert!(all_equal(&batch.labels, FAKE_LABEL));
        assert!(batch.samples.abs().max().double_value(&[]) <= 1.0);
    }
}
