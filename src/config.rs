//! Tracking session parameters
//!
//! A `SessionConfig` is built either from a JSON document with every key present or
//! from discrete command line flags, validated once, and then handed to session creation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Flat tuning parameters for a tracking session.
///
/// No `#[serde(default)]` here: a JSON config must spell out every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Track more than one face per frame
    pub multi_face: bool,
    /// Near limit of the detection range (sensor units)
    pub min_detection_distance: f32,
    /// Far limit of the detection range (sensor units)
    pub max_detection_distance: f32,
    /// Seconds between full face finder passes (0 = every frame)
    pub face_finder_interval: f32,
    /// Offset applied to the detector score threshold
    pub acf_calibration: f32,
    pub regressor_crop_scale: f32,
    pub min_track_hits: u32,
    pub max_track_misses: u32,
    pub min_face_separation: f32,
    /// Trade latency for throughput inside the engine
    pub optimized_pipeline: bool,
    /// Draw landmark annotations on result canvases
    pub annotation: bool,
}

pub const DEFAULT_REGRESSOR_CROP_SCALE: f32 = 1.1;
pub const DEFAULT_MIN_TRACK_HITS: u32 = 3;
pub const DEFAULT_MAX_TRACK_MISSES: u32 = 2;
pub const DEFAULT_MIN_FACE_SEPARATION: f32 = 1.0;
pub const DEFAULT_FACE_FINDER_INTERVAL: f32 = 0.0;
pub const DEFAULT_ACF_CALIBRATION: f32 = 0.001;

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            multi_face: false,
            min_detection_distance: 0.0,
            max_detection_distance: 1.0,
            face_finder_interval: DEFAULT_FACE_FINDER_INTERVAL,
            acf_calibration: DEFAULT_ACF_CALIBRATION,
            regressor_crop_scale: DEFAULT_REGRESSOR_CROP_SCALE,
            min_track_hits: DEFAULT_MIN_TRACK_HITS,
            max_track_misses: DEFAULT_MAX_TRACK_MISSES,
            min_face_separation: DEFAULT_MIN_FACE_SEPARATION,
            optimized_pipeline: true,
            annotation: true,
        }
    }
}

impl SessionConfig {
    /// Load and validate a JSON session config
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig =
            serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Write this config as JSON (boilerplate export)
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|source| ConfigError::WriteFile {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_detection_distance.is_finite() || !self.max_detection_distance.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "detection_distance".to_string(),
                message: "Detection distances must be finite".to_string(),
            });
        }

        if self.min_detection_distance > self.max_detection_distance {
            return Err(ConfigError::InvalidValue {
                field: "min_detection_distance".to_string(),
                message: format!(
                    "min distance {} exceeds max distance {}",
                    self.min_detection_distance, self.max_detection_distance
                ),
            });
        }

        if self.regressor_crop_scale < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "regressor_crop_scale".to_string(),
                message: "Crop scale must not be negative".to_string(),
            });
        }

        if self.face_finder_interval < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "face_finder_interval".to_string(),
                message: "Interval must not be negative".to_string(),
            });
        }

        Ok(())
    }

    pub fn contains_distance(&self, z: f32) -> bool {
        (self.min_detection_distance..=self.max_detection_distance).contains(&z)
    }
}

/// Discrete session flags as given on the command line
#[derive(Debug, Clone, Default)]
pub struct SessionFlags {
    pub focal_length: Option<f32>,
    pub min_distance: Option<f32>,
    pub max_distance: Option<f32>,
    pub multi_face: bool,
    pub interval: Option<f32>,
    pub calibration: Option<f32>,
    pub scale: Option<f32>,
    pub min_track_hits: Option<u32>,
    pub max_track_misses: Option<u32>,
    pub separation: Option<f32>,
    pub simple: bool,
    pub annotation: bool,
}

impl SessionFlags {
    /// Build a validated config. Focal length, min and max distance are mandatory.
    pub fn into_config(self) -> Result<SessionConfig, ConfigError> {
        if self.focal_length.is_none() {
            return Err(ConfigError::MissingField("focal-length".to_string()));
        }
        let min = self
            .min_distance
            .ok_or_else(|| ConfigError::MissingField("min".to_string()))?;
        let max = self
            .max_distance
            .ok_or_else(|| ConfigError::MissingField("max".to_string()))?;

        let config = SessionConfig {
            multi_face: self.multi_face,
            min_detection_distance: min,
            max_detection_distance: max,
            face_finder_interval: self.interval.unwrap_or(DEFAULT_FACE_FINDER_INTERVAL),
            acf_calibration: self.calibration.unwrap_or(DEFAULT_ACF_CALIBRATION),
            regressor_crop_scale: self.scale.unwrap_or(DEFAULT_REGRESSOR_CROP_SCALE),
            min_track_hits: self.min_track_hits.unwrap_or(DEFAULT_MIN_TRACK_HITS),
            max_track_misses: self.max_track_misses.unwrap_or(DEFAULT_MAX_TRACK_MISSES),
            min_face_separation: self.separation.unwrap_or(DEFAULT_MIN_FACE_SEPARATION),
            optimized_pipeline: !self.simple,
            annotation: self.annotation,
        };
        config.validate()?;
        Ok(config)
    }
}
