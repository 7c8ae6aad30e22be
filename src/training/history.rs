//! Loss history for monitoring WGAN progress
//!
//! One entry per completed training step in each of three parallel sequences.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// The three losses recorded for one training step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepLosses {
    /// Critic loss on real half-batches, averaged over the sub-steps
    pub critic_real: f64,
    /// Critic loss on fake half-batches, averaged over the sub-steps
    pub critic_fake: f64,
    /// Generator loss through the composite model
    pub generator: f64,
}

/// Append-only loss history
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossHistory {
    /// Critic losses on real samples per step
    pub critic_real: Vec<f64>,
    /// Critic losses on fake samples per step
    pub critic_fake: Vec<f64>,
    /// Generator losses per step
    pub generator: Vec<f64>,
}

impl LossHistory {
    /// Create new empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one step's losses
    pub fn record(&mut self, losses: StepLosses) {
        self.critic_real.push(losses.critic_real);
        self.critic_fake.push(losses.critic_fake);
        self.generator.push(losses.generator);
    }

    /// Number of recorded steps
    pub fn len(&self) -> usize {
        self.generator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generator.is_empty()
    }

    /// Losses of the most recent step
    pub fn latest(&self) -> Option<StepLosses> {
        let i = self.len().checked_sub(1)?;
        Some(StepLosses {
            critic_real: self.critic_real[i],
            critic_fake: self.critic_fake[i],
            generator: self.generator[i],
        })
    }

    /// Moving average of the last `window` steps for each sequence
    pub fn moving_average(&self, window: usize) -> StepLosses {
        StepLosses {
            critic_real: moving_average(&self.critic_real, window),
            critic_fake: moving_average(&self.critic_fake, window),
            generator: moving_average(&self.generator, window),
        }
    }

    /// Save history to CSV file
    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record(["step", "critic_real", "critic_fake", "generator"])?;

        for i in 0..self.len() {
            writer.write_record([
                (i + 1).to_string(),
                self.critic_real[i].to_string(),
                self.critic_fake[i].to_string(),
                self.generator[i].to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Load history from CSV file
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut history = Self::new();

        for result in reader.deserialize() {
            let (_, critic_real, critic_fake, generator): (usize, f64, f64, f64) = result?;
            history.record(StepLosses {
                critic_real,
                critic_fake,
                generator,
            });
        }

        Ok(history)
    }
}

/// Calculate moving average of last `window` values
fn moving_average(values: &[f64], window: usize) -> f64 {
    if values.is_empty() || window == 0 {
        return 0.0;
    }

    let n = window.min(values.len());
    let sum: f64 = values.iter().rev().take(n).sum();
    sum / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn losses(c1: f64, c2: f64, g: f64) -> StepLosses {
        StepLosses {
            critic_real: c1,
            critic_fake: c2,
            generator: g,
        }
    }

    #[test]
    fn test_record_keeps_sequences_parallel() {
        let mut history = LossHistory::new();
        assert!(history.latest().is_none());

        history.record(losses(-0.5, 0.4, -0.3));
        history.record(losses(-0.7, 0.6, -0.5));

        assert_eq!(history.len(), 2);
        assert_eq!(history.critic_real.len(), 2);
        assert_eq!(history.critic_fake.len(), 2);
        assert_eq!(history.latest(), Some(losses(-0.7, 0.6, -0.5)));
    }

    #[test]
    fn test_moving_average() {
        let mut history = LossHistory::new();
        for g in [1.0, 2.0, 3.0, 4.0] {
            history.record(losses(0.0, 0.0, g));
        }

        assert_eq!(history.moving_average(2).generator, 3.5);
        assert_eq!(history.moving_average(10).generator, 2.5);
        assert_eq!(LossHistory::new().moving_average(3).generator, 0.0);
    }

    #[test]
    fn test_csv_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loss_history.csv");

        let mut history = LossHistory::new();
        history.record(losses(-0.25, 0.125, -0.5));
        history.record(losses(-1.5, 2.0, 0.75));
        history.save_csv(&path).unwrap();

        let loaded = LossHistory::load_csv(&path).unwrap();
        assert_eq!(loaded, history);
    }
}
