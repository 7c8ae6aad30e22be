//! WGAN for Fingerprint Image Generation
//!
//! Main entry point providing CLI interface for:
//! - Training the WGAN on a directory of fingerprint images
//! - Generating synthetic fingerprints from a checkpoint
//! - Writing a default configuration file

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use wgan_fingerprints::{
    data::{to_gray_grid, ImageDataset},
    training::Trainer,
    utils::{ensure_config_exists, find_latest_checkpoint, load_checkpoint, CheckpointDir, Config},
};

/// Wasserstein GAN for Synthetic Fingerprints
#[derive(Parser)]
#[command(name = "wgan_fingerprints")]
#[command(version = "0.1.0")]
#[command(about = "Generate synthetic greyscale fingerprint images using a weight-clipped WGAN")]
struct Cli {
    /// Path to configuration file (.json or .toml)
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Verbosity level
    #[arg(short, long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the WGAN
    Train {
        /// Directory of training images (overrides the config)
        #[arg(short, long)]
        data: Option<String>,

        /// Number of epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Batch size
        #[arg(short, long)]
        batch: Option<usize>,

        /// Critic updates per Generator update
        #[arg(long)]
        critic_steps: Option<usize>,

        /// Checkpoint directory (overrides the config)
        #[arg(long)]
        checkpoint_dir: Option<String>,
    },

    /// Generate synthetic fingerprints
    Generate {
        /// Checkpoint directory, or a directory of checkpoints to take the latest from
        #[arg(short, long)]
        model: String,

        /// Number of images to generate
        #[arg(short, long, default_value = "25", value_parser = clap::value_parser!(i64).range(1..))]
        num_samples: i64,

        /// Output PNG path for the sample grid
        #[arg(short, long, default_value = "generated.png")]
        output: String,
    },

    /// Initialize default configuration file
    Init {
        /// Output configuration file path; an existing file is left unchanged
        #[arg(short, long, default_value = "config.json")]
        output: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Train {
            data,
            epochs,
            batch,
            critic_steps,
            checkpoint_dir,
        } => {
            let mut config = load_config(&cli.config)?;
            if let Some(data) = data {
                config.data.image_dir = data;
            }
            if let Some(epochs) = epochs {
                config.training.n_epochs = epochs;
            }
            if let Some(batch) = batch {
                config.training.n_batch = batch;
            }
            if let Some(k) = critic_steps {
                config.training.n_critic = k;
            }
            if let Some(dir) = checkpoint_dir {
                config.training.checkpoint_dir = dir;
            }
            train_model(&config)?;
        }
        Commands::Generate {
            model,
            num_samples,
            output,
        } => {
            let config = load_config(&cli.config)?;
            generate_samples(&config, &model, num_samples, &output)?;
        }
        Commands::Init { output } => {
            init_config(&output)?;
        }
    }

    Ok(())
}

fn load_config(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        Config::load(path).with_context(|| format!("Failed to read config {}", path))
    } else {
        info!("Config file not found, using defaults");
        Ok(Config::default())
    }
}

/// Train the WGAN
fn train_model(config: &Config) -> Result<()> {
    config.validate()?;

    let device = config.get_device();
    info!("Using device: {:?}", device);

    info!("Loading images from {}", config.data.image_dir);
    let dataset = ImageDataset::load_dir(
        &config.data.image_dir,
        config.data.image_height,
        config.data.image_width,
    )?
    .to_device(device);
    info!("Loaded {} images", dataset.len());

    let model = config.build_model();
    let mut trainer = Trainer::new(model, config.to_training_config())?;

    let mut sink = CheckpointDir::new(&config.training.checkpoint_dir);
    let mut curves = sink.clone();
    let report = match trainer.train(&dataset, &mut sink, &mut curves) {
        Ok(report) => report,
        Err(e) if e.is_setup_error() => {
            anyhow::bail!("Cannot start training on {}: {}", config.data.image_dir, e)
        }
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("Training stopped after {} steps", trainer.step())))
        }
    };

    if let Some(last) = report.history.latest() {
        info!(
            "Training complete after {} steps. Final C_real: {:.4}, C_fake: {:.4}, G: {:.4}",
            report.steps, last.critic_real, last.critic_fake, last.generator
        );
    }
    for failure in &report.sink_failures {
        tracing::warn!("Step {}: {}", failure.step, failure.error);
    }

    Ok(())
}

/// Generate synthetic fingerprints from a checkpoint
fn generate_samples(config: &Config, model_path: &str, num_samples: i64, output_path: &str) -> Result<()> {
    let device = config.get_device();

    let model_dir = PathBuf::from(model_path);
    let checkpoint = if model_dir.join("meta.json").exists() {
        model_dir
    } else {
        find_latest_checkpoint(&model_dir)
            .with_context(|| format!("No checkpoint found in {}", model_dir.display()))?
    };

    let (meta, model) = load_checkpoint(&checkpoint, device)?;
    info!("Loaded Generator from {} (step {})", checkpoint.display(), meta.step);

    info!("Generating {} synthetic fingerprints", num_samples);
    let samples = model.generate(num_samples);

    if let Some(parent) = Path::new(output_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    to_gray_grid(&samples)?.save(output_path)?;
    info!("Saved synthetic samples to {}", output_path);

    Ok(())
}

/// Initialize default configuration file
fn init_config(output_path: &str) -> Result<()> {
    if Path::new(output_path).exists() {
        info!("Configuration already exists at {}, leaving it unchanged", output_path);
    }
    let config = ensure_config_exists(output_path)?;
    config.validate()?;
    info!("Configuration ready at {}", output_path);
    Ok(())
}
