//! Model module containing the WGAN architecture components
//!
//! This module provides:
//! - Critic network scoring images with an unbounded real value
//! - Generator network mapping latent noise to greyscale images
//! - WGAN wrapper owning both networks and their variable stores

mod critic;
mod generator;
pub mod layers;
mod wgan;

pub use critic::{Critic, CriticConfig};
pub use generator::{Generator, GeneratorConfig};
pub use wgan::{Composite, OptimizerKind, Wgan};
