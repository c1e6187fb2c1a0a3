//! Detector configuration
//!
//! Every knob has a default, so an empty JSON object is a valid config file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::algo::ForestParams;
use crate::error::ConfigError;
use crate::trainer::TrainParams;

/// Construction-time settings for [`crate::Detector`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Rolling window capacity
    pub buffer_size: usize,
    /// Window occupancy required before the first fit
    pub min_train: usize,
    /// Retrain when the ingestion count is a multiple of this
    pub retrain_every: u64,
    /// Expected outlier fraction handed to the forest
    pub contamination: f64,
    /// Quantile of training scores used as the threshold
    pub threshold_q: f64,
    /// Seed for every fit
    pub random_state: u64,
    /// Trees per forest
    pub n_estimators: usize,
    /// Per-tree subsample cap
    pub max_samples: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1500,
            min_train: 120,
            retrain_every: 60,
            contamination: 0.01,
            threshold_q: 0.99,
            random_state: 42,
            n_estimators: 200,
            max_samples: 256,
        }
    }
}

impl DetectorConfig {
    /// Read and validate a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::invalid("buffer_size", "must be at least 1"));
        }
        if self.min_train == 0 {
            return Err(ConfigError::invalid("min_train", "must be at least 1"));
        }
        if self.min_train > self.buffer_size {
            return Err(ConfigError::invalid(
                "min_train",
                format!(
                    "{} exceeds buffer_size {}, the detector would never warm up",
                    self.min_train, self.buffer_size
                ),
            ));
        }
        if self.retrain_every == 0 {
            return Err(ConfigError::invalid("retrain_every", "must be at least 1"));
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(ConfigError::invalid(
                "contamination",
                format!("{} is outside (0, 0.5]", self.contamination),
            ));
        }
        if !(0.0..=1.0).contains(&self.threshold_q) {
            return Err(ConfigError::invalid(
                "threshold_q",
                format!("{} is outside [0, 1]", self.threshold_q),
            ));
        }
        if self.n_estimators == 0 {
            return Err(ConfigError::invalid("n_estimators", "must be at least 1"));
        }
        if self.max_samples == 0 {
            return Err(ConfigError::invalid("max_samples", "must be at least 1"));
        }
        Ok(())
    }

    /// Forest parameters derived from this config
    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_estimators: self.n_estimators,
            max_samples: self.max_samples,
            contamination: self.contamination,
            seed: self.random_state,
        }
    }

    pub fn train_params(&self) -> TrainParams {
        TrainParams {
            forest: self.forest_params(),
            threshold_q: self.threshold_q,
        }
    }
}
