//! Capture trigger policy
//!
//! Decides, per processed frame, whether to ask the engine for the expanded data bundle
//! (full image, texture, eye crops). A capture fires when a face sits inside the
//! configured volume and the cooldown since the previous capture has elapsed.

use std::str::FromStr;

use crate::error::ConfigError;
use crate::types::{CaptureRequest, FaceModel, Point3D};

/// Spherical region in camera space plus the minimum time between captures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureVolume {
    pub center: Point3D,
    pub radius: f32,
    /// Seconds
    pub cooldown: f64,
}

impl CaptureVolume {
    pub fn new(center: Point3D, radius: f32, cooldown: f64) -> Self {
        Self { center, radius, cooldown }
    }

    pub fn contains(&self, point: &Point3D) -> bool {
        self.center.distance(point) <= self.radius
    }
}

/// Parses `x,y,z,radius,cooldown`
impl FromStr for CaptureVolume {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ConfigError::CaptureVolume(s.to_string()))?;

        let [x, y, z, radius, cooldown] = values[..] else {
            return Err(ConfigError::CaptureVolume(s.to_string()));
        };
        if radius < 0.0 || cooldown < 0.0 {
            return Err(ConfigError::CaptureVolume(s.to_string()));
        }

        Ok(Self::new(
            Point3D::new(x as f32, y as f32, z as f32),
            radius as f32,
            cooldown,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No capture within the cooldown window
    Armed,
    /// Fired recently; further captures suppressed
    Cooling,
}

#[derive(Debug, Clone, Default)]
pub struct CaptureGate {
    volume: Option<CaptureVolume>,
    last_fired: Option<f64>,
}

impl CaptureGate {
    pub fn new(volume: Option<CaptureVolume>) -> Self {
        Self {
            volume,
            last_fired: None,
        }
    }

    /// A gate that never requests extra data
    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn volume(&self) -> Option<&CaptureVolume> {
        self.volume.as_ref()
    }

    pub fn last_fired(&self) -> Option<f64> {
        self.last_fired
    }

    pub fn state(&self, now: f64) -> GateState {
        match (self.volume, self.last_fired) {
            (Some(volume), Some(last)) if now - last <= volume.cooldown => GateState::Cooling,
            _ => GateState::Armed,
        }
    }

    /// Decide the capture request for one frame. Only a firing mutates the gate.
    pub fn evaluate(&mut self, faces: &[FaceModel], timestamp: f64) -> CaptureRequest {
        let Some(volume) = self.volume else {
            return CaptureRequest::none();
        };

        let in_volume = faces
            .iter()
            .filter_map(|face| face.position.as_ref())
            .any(|position| volume.contains(position));
        if !in_volume {
            return CaptureRequest::none();
        }

        if let Some(last) = self.last_fired {
            if timestamp - last <= volume.cooldown {
                return CaptureRequest::none();
            }
        }

        self.last_fired = Some(timestamp);
        CaptureRequest::full()
    }
}
