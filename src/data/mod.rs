//! Data module for loading images and drawing labelled batches
//!
//! This module provides:
//! - In-memory dataset of normalized greyscale images
//! - Pixel normalization and sample-grid rendering
//! - Real, fake and latent batch generators

mod dataset;
mod preprocessing;
mod samples;

pub use dataset::ImageDataset;
pub use preprocessing::{denormalize_pixel, grid_columns, normalize_pixel, to_gray_grid};
pub use samples::{
    fake_samples_from_latent, generate_fake_samples, generate_latent_points, generate_real_samples,
    latent_batch, sample_indices, Batch,
};
