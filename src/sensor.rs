//! Camera sensor description handed to the tracking engine

use crate::types::{Point2D, Size};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsic {
    pub principal_point: Point2D,
    pub focal_length: f32,
    pub size: Size,
}

impl Intrinsic {
    /// Principal point at the image center
    pub fn centered(size: Size, focal_length: f32) -> Self {
        Self {
            principal_point: Point2D::new(size.width as f32 / 2.0, size.height as f32 / 2.0),
            focal_length,
            size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extrinsic {
    pub rotation: [[f32; 3]; 3],
}

impl Default for Extrinsic {
    fn default() -> Self {
        Self {
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorModel {
    pub intrinsic: Intrinsic,
    pub extrinsic: Extrinsic,
}

impl SensorModel {
    pub fn new(intrinsic: Intrinsic, extrinsic: Extrinsic) -> Self {
        Self { intrinsic, extrinsic }
    }

    /// Identity pose, centered principal point. A focal length of zero falls back to the
    /// frame width.
    pub fn for_frame(size: Size, focal_length: Option<f32>) -> Self {
        let fx = match focal_length {
            Some(fx) if fx > 0.0 => fx,
            _ => size.width as f32,
        };
        Self::new(Intrinsic::centered(size, fx), Extrinsic::default())
    }

    /// Pinhole projection of a camera-space point, `None` behind the camera
    pub fn project(&self, x: f32, y: f32, z: f32) -> Option<Point2D> {
        if z <= 0.0 {
            return None;
        }
        let f = self.intrinsic.focal_length;
        let p = self.intrinsic.principal_point;
        Some(Point2D::new(p.x + f * x / z, p.y + f * y / z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focal_length_guess() {
        let sensor = SensorModel::for_frame(Size::new(640, 480), None);
        assert_eq!(sensor.intrinsic.focal_length, 640.0);
        assert_eq!(sensor.intrinsic.principal_point, Point2D::new(320.0, 240.0));

        let sensor = SensorModel::for_frame(Size::new(640, 480), Some(500.0));
        assert_eq!(sensor.intrinsic.focal_length, 500.0);
    }

    #[test]
    fn test_project_center() {
        let sensor = SensorModel::for_frame(Size::new(640, 480), Some(500.0));
        assert_eq!(sensor.project(0.0, 0.0, 1.0), Some(Point2D::new(320.0, 240.0)));
        assert_eq!(sensor.project(0.1, 0.0, 1.0), Some(Point2D::new(370.0, 240.0)));
        assert!(sensor.project(0.0, 0.0, 0.0).is_none());
    }
}
