//! Model resources for the tracking engine
//!
//! The resource configuration is a JSON object mapping logical model names to file
//! names. Relative file names are resolved against the directory holding the
//! configuration, never the working directory. All four models are opened up front
//! and stay open for the bundle's lifetime because the engine streams from them lazily.

use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::Span;

use crate::error::ResourceError;

pub const FACE_DETECTOR_KEY: &str = "face_detector";
pub const EYE_REGRESSOR_KEY: &str = "eye_model_regressor";
pub const FACE_REGRESSOR_KEY: &str = "face_landmark_regressor";
pub const FACE_MODEL_KEY: &str = "face_detector_mean";

pub const RESOURCE_KEYS: [&str; 4] = [
    FACE_DETECTOR_KEY,
    EYE_REGRESSOR_KEY,
    FACE_REGRESSOR_KEY,
    FACE_MODEL_KEY,
];

/// One opened model file
#[derive(Debug)]
pub struct ResourceHandle {
    key: &'static str,
    path: PathBuf,
    reader: BufReader<File>,
}

impl ResourceHandle {
    fn open(key: &'static str, path: PathBuf) -> Result<Self, ResourceError> {
        let file = File::open(&path).map_err(|source| ResourceError::OpenResource {
            key,
            path: path.clone(),
            source,
        })?;
        tracing::debug!(key, path = %path.display(), "opened resource");
        Ok(Self {
            key,
            path,
            reader: BufReader::new(file),
        })
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.reader.get_ref().metadata().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        tracing::debug!(key = self.key, "closing resource");
    }
}

/// Exclusively owned set of opened model streams
#[derive(Debug)]
pub struct ResourceBundle {
    pub detector: ResourceHandle,
    pub eye_regressor: ResourceHandle,
    pub face_regressor: ResourceHandle,
    pub face_model: ResourceHandle,
    span: Span,
}

impl ResourceBundle {
    /// Open every model named in the configuration at `path`.
    ///
    /// Either all four handles open or none escape: handles opened before a failure are
    /// dropped (and closed) on the error path.
    pub fn load<P: AsRef<Path>>(path: P, logger: &str) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        let span = tracing::info_span!("resources", logger);
        let _enter = span.enter();

        let contents = std::fs::read_to_string(path).map_err(|source| ResourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let json: Value = serde_json::from_str(&contents).map_err(|e| ResourceError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let map = json.as_object().ok_or_else(|| ResourceError::Parse {
            path: path.to_path_buf(),
            message: "expected a JSON object".to_string(),
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));

        let resolve = |key: &'static str| -> Result<ResourceHandle, ResourceError> {
            let entry = map.get(key).ok_or(ResourceError::MissingKey { key })?;
            let name = entry.as_str().ok_or(ResourceError::InvalidEntry { key })?;
            ResourceHandle::open(key, base.join(name))
        };

        let detector = resolve(FACE_DETECTOR_KEY)?;
        let eye_regressor = resolve(EYE_REGRESSOR_KEY)?;
        let face_regressor = resolve(FACE_REGRESSOR_KEY)?;
        let face_model = resolve(FACE_MODEL_KEY)?;

        tracing::info!("Loaded {} model resources from {}", RESOURCE_KEYS.len(), path.display());
        drop(_enter);

        Ok(Self {
            detector,
            eye_regressor,
            face_regressor,
            face_model,
            span,
        })
    }

    pub fn handles(&self) -> [&ResourceHandle; 4] {
        [
            &self.detector,
            &self.eye_regressor,
            &self.face_regressor,
            &self.face_model,
        ]
    }

    /// Logging handle this bundle was created with
    pub fn span(&self) -> &Span {
        &self.span
    }
}
