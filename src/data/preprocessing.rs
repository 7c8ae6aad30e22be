//! Pixel preprocessing for GAN training
//!
//! This module provides functions for:
//! - Normalizing 8-bit greyscale pixels to [-1, 1] (required for a tanh generator)
//! - Mapping generated values back to 8-bit pixels
//! - Tiling a batch of images into a single greyscale grid

use image::GrayImage;
use tch::{Kind, Tensor};

use crate::{Result, WganError};

/// Normalize an 8-bit pixel to [-1, 1]
///
/// Formula: x_norm = (x - 127.5) / 127.5
pub fn normalize_pixel(pixel: u8) -> f32 {
    (pixel as f32 - 127.5) / 127.5
}

/// Map a value in [-1, 1] back to an 8-bit pixel, clamping out-of-range input
///
/// Formula: x = (x_norm + 1) * 127.5
pub fn denormalize_pixel(value: f32) -> u8 {
    ((value.clamp(-1.0, 1.0) + 1.0) * 127.5).round() as u8
}

/// Number of grid columns for `n` tiles: ceil(sqrt(n))
pub fn grid_columns(n: usize) -> usize {
    let mut cols = (n as f64).sqrt() as usize;
    while cols * cols < n {
        cols += 1;
    }
    cols.max(1)
}

/// Tile a batch of images into one greyscale image
///
/// # Arguments
///
/// * `images` - Tensor of shape (n, height, width, 1) with values in [-1, 1]
///
/// # Returns
///
/// Grid of ceil(sqrt(n)) columns, unused cells left black
pub fn to_gray_grid(images: &Tensor) -> Result<GrayImage> {
    let size = images.size();
    if size.len() != 4 || size[3] != 1 {
        return Err(WganError::ShapeMismatch {
            expected: vec![-1, -1, -1, 1],
            found: size,
        });
    }

    let (n, h, w) = (size[0] as usize, size[1] as usize, size[2] as usize);
    let cols = grid_columns(n);
    let rows = (n + cols - 1) / cols.max(1);

    let values = Vec::<f32>::try_from(
        &images
            .to_device(tch::Device::Cpu)
            .to_kind(Kind::Float)
            .flatten(0, -1),
    )?;

    let mut grid = GrayImage::new((cols * w) as u32, (rows.max(1) * h) as u32);
    for i in 0..n {
        let (row, col) = (i / cols, i % cols);
        for y in 0..h {
            for x in 0..w {
                let value = values[i * h * w + y * w + x];
                grid.put_pixel(
                    (col * w + x) as u32,
                    (row * h + y) as u32,
                    image::Luma([denormalize_pixel(value)]),
                );
            }
        }
    }

    Ok(grid)
}
