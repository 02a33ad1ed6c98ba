/// Service configuration module
///
/// Loads the service settings from an optional JSON file, then applies
/// `SOUND_DETECTOR_*` environment overrides on top.

use crate::detector::{DetectorConfig, DetectorError};
use crate::pipeline::DEFAULT_CLIP_QUEUE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

pub const ENV_THRESHOLD: &str = "SOUND_DETECTOR_THRESHOLD";
pub const ENV_MIN_SAMPLES: &str = "SOUND_DETECTOR_MIN_SAMPLES";
pub const ENV_END_SAMPLES: &str = "SOUND_DETECTOR_END_SAMPLES";
pub const ENV_PRE_ROLL_SIZE: &str = "SOUND_DETECTOR_PRE_ROLL_SIZE";
pub const ENV_OUTPUT_DIR: &str = "SOUND_DETECTOR_OUTPUT_DIR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error(transparent)]
    Detector(#[from] DetectorError),
}

/// Settings for the sound detector service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub detector: DetectorConfig,

    /// Directory the clip files are written to
    pub output_dir: PathBuf,

    /// File name prefix of written clips
    pub file_prefix: String,

    /// Samples handed to the pipeline per chunk
    pub chunk_size: usize,

    /// Finished clips buffered between detector and sink
    pub clip_queue_size: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            output_dir: PathBuf::from("clips"),
            file_prefix: "sound".to_string(),
            chunk_size: 512,
            clip_queue_size: DEFAULT_CLIP_QUEUE,
        }
    }
}

impl ServiceConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Apply overrides looked up by environment variable name
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_THRESHOLD) {
            self.detector.threshold = parse_value(ENV_THRESHOLD, &value)?;
        }

        if let Some(value) = lookup(ENV_MIN_SAMPLES) {
            self.detector.min_samples = parse_value(ENV_MIN_SAMPLES, &value)?;
        }

        if let Some(value) = lookup(ENV_END_SAMPLES) {
            self.detector.end_samples = parse_value(ENV_END_SAMPLES, &value)?;
        }

        if let Some(value) = lookup(ENV_PRE_ROLL_SIZE) {
            self.detector.pre_roll_size = parse_value(ENV_PRE_ROLL_SIZE, &value)?;
        }

        if let Some(value) = lookup(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(value);
        }

        debug!("Effective configuration: {:?}", self);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detector.validate()?;

        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "chunk_size".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
