//! In-memory image dataset
//!
//! Holds N greyscale images as one tensor of shape (N, height, width, 1) with
//! values in [-1, 1]. The dataset is read-only once built.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use ndarray::Array4;
use tch::{Device, Kind, Tensor};
use tracing::{debug, info};

use super::preprocessing::normalize_pixel;
use crate::{Result, WganError};

/// Dataset of normalized greyscale images
#[derive(Debug)]
pub struct ImageDataset {
    images: Tensor,
}

impl ImageDataset {
    /// Wrap an image tensor of shape (N, height, width, 1)
    pub fn from_tensor(images: Tensor) -> Result<Self> {
        let size = images.size();
        if size.len() != 4 || size[3] != 1 {
            return Err(WganError::ShapeMismatch {
                expected: vec![-1, -1, -1, 1],
                found: size,
            });
        }
        if size[0] == 0 {
            return Err(WganError::EmptyDataset("image tensor has no rows".to_string()));
        }

        Ok(Self {
            images: images.to_kind(Kind::Float),
        })
    }

    /// Load every decodable image in `dir`, sorted by file name
    ///
    /// Each image is converted to greyscale, resized to `height` x `width`,
    /// and normalized to [-1, 1].
    pub fn load_dir<P: AsRef<Path>>(dir: P, height: u32, width: u32) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && image::ImageFormat::from_path(p).is_ok())
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(WganError::EmptyDataset(format!(
                "no images found in {}",
                dir.display()
            )));
        }

        let (h, w) = (height as usize, width as usize);
        let mut data = Array4::<f32>::zeros((paths.len(), h, w, 1));

        for (i, path) in paths.iter().enumerate() {
            let gray = image::open(path)?.to_luma8();
            let resized = if gray.dimensions() == (width, height) {
                gray
            } else {
                image::imageops::resize(&gray, width, height, FilterType::Triangle)
            };

            for (x, y, pixel) in resized.enumerate_pixels() {
                data[[i, y as usize, x as usize, 0]] = normalize_pixel(pixel[0]);
            }
            debug!("Loaded {}", path.display());
        }

        info!("Loaded {} images of {}x{} from {}", paths.len(), height, width, dir.display());
        Self::from_tensor(Tensor::try_from(data)?)
    }

    /// Number of images
    pub fn len(&self) -> usize {
        self.images.size()[0] as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-image shape (height, width, channels)
    pub fn image_shape(&self) -> [i64; 3] {
        let size = self.images.size();
        [size[1], size[2], size[3]]
    }

    /// All images, shape (N, height, width, 1)
    pub fn images(&self) -> &Tensor {
        &self.images
    }

    /// Gather images by index
    pub fn select(&self, indices: &[i64]) -> Tensor {
        let index = Tensor::from_slice(indices).to_device(self.images.device());
        self.images.index_select(0, &index)
    }

    /// Fail unless images match the shape the networks expect
    pub fn check_shape(&self, expected: [i64; 3]) -> Result<()> {
        let found = self.image_shape();
        if found != expected {
            return Err(WganError::ShapeMismatch {
                expected: expected.to_vec(),
                found: found.to_vec(),
            });
        }
        Ok(())
    }

    /// Move images to `device`
    pub fn to_device(self, device: Device) -> Self {
        Self {
            images: self.images.to_device(device),
        }
    }
}
