//! rusty-facetrack - capture-triggering harness for a face tracking engine
//!
//! Loads model resources, configures a tracking session, pushes video frames through it
//! and reacts to results through the allocate / trigger / result callback protocol.

pub mod callbacks;
#[cfg(feature = "camera")]
pub mod camera;
pub mod capture;
pub mod config;
pub mod draw;
pub mod engine;
pub mod error;
pub mod frame_loop;
pub mod frame_writer;
pub mod preview;
pub mod resources;
pub mod sensor;
pub mod simulated;
pub mod source;
pub mod types;

pub use config::SessionConfig;
pub use error::{Result, TrackerError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
