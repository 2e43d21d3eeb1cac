//! Training configuration loaded from JSON.
use crate::datasets::DatasetWindow;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Hyperparameters and dataset windows of a training run.
///
/// Every field is optional in the JSON file; missing ones take the
/// [`Default`] values.
///
/// ```json
/// {
///   "layers": [784, 100, 10],
///   "epochs": 30,
///   "batch_size": 10,
///   "eta": 0.5,
///   "alpha": 5.0,
///   "threads": 4,
///   "train_window": { "skip": 0, "count": 50000 },
///   "test_window": { "skip": 0, "count": 10000 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Node count of every layer, input first.
    pub layers: Vec<usize>,
    pub epochs: usize,
    pub batch_size: usize,
    /// Learning rate.
    pub eta: f64,
    /// L2 weight decay.
    pub alpha: f64,
    /// Gradient workers; 1 keeps training on the calling thread.
    pub threads: usize,
    /// Seed for parameter initialization; `None` draws from the thread RNG.
    pub seed: Option<u64>,
    pub train_window: DatasetWindow,
    pub test_window: DatasetWindow,
    /// Evaluate the training cost after every epoch.
    pub track_loss: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            layers: vec![784, 30, 10],
            epochs: 30,
            batch_size: 10,
            eta: 0.5,
            alpha: 5.0,
            threads: 1,
            seed: None,
            train_window: DatasetWindow::first(60_000),
            test_window: DatasetWindow::first(10_000),
            track_loss: true,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.layers.len() < 2 {
            return Err(anyhow!("layers must list at least an input and an output layer"));
        }
        if self.layers.contains(&0) {
            return Err(anyhow!("every layer needs at least one node"));
        }
        if self.epochs == 0 {
            return Err(anyhow!("epochs must be > 0"));
        }
        if self.batch_size == 0 {
            return Err(anyhow!("batch_size must be > 0"));
        }
        if !(self.eta.is_finite() && self.eta > 0.0) {
            return Err(anyhow!("eta must be finite and > 0"));
        }
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(anyhow!("alpha must be finite and non-negative"));
        }
        if self.threads == 0 {
            return Err(anyhow!("threads must be > 0"));
        }
        Ok(())
    }
}

/// Reads and validates a configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TrainingConfig> {
    let path = path.as_ref();
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let config: TrainingConfig = serde_json::from_str(&contents)
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
