//! Seam between the harness and the tracking engine
//!
//! The engine is an external collaborator. A session is created once from a sensor
//! model, the opened model resources and a validated config; callbacks are registered on
//! it and frames are then submitted one at a time. `process` invokes every registered
//! callback synchronously (allocate, trigger, result) before it returns.

use crate::callbacks::TrackerCallbacks;
use crate::config::SessionConfig;
use crate::error::EngineError;
use crate::resources::ResourceBundle;
use crate::sensor::SensorModel;
use crate::types::{TextureFormat, VideoFrame};

pub trait TrackingEngine {
    fn name(&self) -> String;

    fn create_session(
        &self,
        sensor: SensorModel,
        resources: ResourceBundle,
        config: &SessionConfig,
    ) -> Result<Box<dyn TrackerSession>, EngineError>;
}

pub trait TrackerSession {
    /// Layout frames must be submitted in
    fn texture_format(&self) -> TextureFormat;

    fn add_callbacks(&mut self, callbacks: Box<dyn TrackerCallbacks>);

    /// Track one frame. All callbacks for this frame complete before this returns.
    fn process(&mut self, frame: &VideoFrame) -> Result<(), EngineError>;
}
