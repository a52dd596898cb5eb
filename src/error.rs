//! Error types for the face tracking harness

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Size;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Callback error: {0}")]
    Callback(#[from] CallbackError),

    #[error("Video source error: {0}")]
    Source(#[from] SourceError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Session parameter errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid capture volume '{0}', expected x,y,z,radius,cooldown")]
    CaptureVolume(String),
}

/// Model resource errors. Every variant names the key or path at fault.
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Unable to open resource configuration {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unable to parse resource configuration {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Resource configuration is missing key '{key}'")]
    MissingKey { key: &'static str },

    #[error("Resource entry '{key}' must be a file name string")]
    InvalidEntry { key: &'static str },

    #[error("Failed to open resource '{key}' at {path}: {source}")]
    OpenResource {
        key: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Tracking engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to create tracking session: {0}")]
    Creation(String),

    #[error("Unsupported frame format: {0}")]
    UnsupportedFormat(String),

    #[error("Frame buffer is {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}

/// Per-frame errors, recoverable by the frame loop
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Frame dimensions must be consistent: expected {expected}, got {actual}")]
    DimensionMismatch { expected: Size, actual: Size },
}

/// Callback failures for a single frame
#[derive(Error, Debug)]
pub enum CallbackError {
    #[error("Cannot allocate a {width}x{height} image")]
    InvalidImageSpec { width: u32, height: u32 },
}

/// Video source errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Unable to read image list {path}: {source}")]
    ImageList {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No readable frames in {0}")]
    Empty(String),

    #[error("Camera error: {0}")]
    Camera(String),
}

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, TrackerError>;
