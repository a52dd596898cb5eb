//! Simulated tracking engine
//!
//! Stands in for the native engine: it honours the session config, the callback order
//! and capture requests, but the faces it reports are synthetic (one face centered in
//! front of the camera) or scripted per frame.

use image::imageops;
use tracing::Span;

use crate::callbacks::TrackerCallbacks;
use crate::config::SessionConfig;
use crate::engine::{TrackerSession, TrackingEngine};
use crate::error::EngineError;
use crate::resources::ResourceBundle;
use crate::sensor::SensorModel;
use crate::types::{
    CaptureRequest, Ellipse, EyeModel, FaceModel, Image4b, ImageSpec, Point2D, Point3D,
    TextureFormat, TrackResult, VideoFrame,
};

/// Physical face width used to size synthetic faces
const FACE_WIDTH_METERS: f32 = 0.15;

#[derive(Debug, Clone)]
pub enum FaceScript {
    /// One face on the optical axis, halfway through the detection range
    Centered,
    /// Faces for frame `i` are `frames[i]`; frames past the end have none
    Scripted(Vec<Vec<FaceModel>>),
}

pub struct SimulatedEngine {
    script: FaceScript,
    format: TextureFormat,
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self {
            script: FaceScript::Centered,
            format: TextureFormat::native(),
        }
    }

    pub fn scripted(frames: Vec<Vec<FaceModel>>) -> Self {
        Self {
            script: FaceScript::Scripted(frames),
            format: TextureFormat::native(),
        }
    }

    pub fn with_texture_format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }
}

impl TrackingEngine for SimulatedEngine {
    fn name(&self) -> String {
        "Simulated (synthetic faces)".to_string()
    }

    fn create_session(
        &self,
        sensor: SensorModel,
        resources: ResourceBundle,
        config: &SessionConfig,
    ) -> Result<Box<dyn TrackerSession>, EngineError> {
        let span = tracing::info_span!(parent: resources.span(), "session");
        let _enter = span.enter();

        if sensor.intrinsic.size.area() == 0 {
            return Err(EngineError::Creation(format!(
                "invalid sensor size {}",
                sensor.intrinsic.size
            )));
        }
        if sensor.intrinsic.focal_length <= 0.0 {
            return Err(EngineError::Creation("focal length must be positive".to_string()));
        }
        config
            .validate()
            .map_err(|e| EngineError::Creation(e.to_string()))?;

        for handle in resources.handles() {
            if handle.is_empty() {
                return Err(EngineError::Creation(format!(
                    "model resource '{}' at {} is empty",
                    handle.key(),
                    handle.path().display()
                )));
            }
            tracing::debug!("{}: {} bytes", handle.key(), handle.len());
        }

        tracing::info!(
            "Session created: {} frames, fx={}, range=[{}, {}], multi_face={}, optimized={}",
            sensor.intrinsic.size,
            sensor.intrinsic.focal_length,
            config.min_detection_distance,
            config.max_detection_distance,
            config.multi_face,
            config.optimized_pipeline
        );
        drop(_enter);

        Ok(Box::new(SimulatedSession {
            span,
            sensor,
            config: config.clone(),
            _resources: resources,
            script: self.script.clone(),
            format: self.format,
            callbacks: Vec::new(),
            frame_index: 0,
            next_texture: 1,
        }))
    }
}

pub struct SimulatedSession {
    span: Span,
    sensor: SensorModel,
    config: SessionConfig,
    // Held open for the lifetime of the session
    _resources: ResourceBundle,
    script: FaceScript,
    format: TextureFormat,
    callbacks: Vec<Box<dyn TrackerCallbacks>>,
    frame_index: usize,
    next_texture: u32,
}

impl SimulatedSession {
    fn detect(&self) -> Vec<FaceModel> {
        let mut faces = match &self.script {
            FaceScript::Centered => synthesize_face(&self.sensor, &self.config)
                .into_iter()
                .collect(),
            FaceScript::Scripted(frames) => frames.get(self.frame_index).cloned().unwrap_or_default(),
        };

        faces.retain(|face| match face.position {
            Some(p) => self.config.contains_distance(p.z),
            None => true,
        });
        if !self.config.multi_face {
            faces.truncate(1);
        }
        faces
    }

    /// Stage the frame into a harness-owned buffer. `None` drops this frame's capture.
    fn stage(&mut self, frame: &VideoFrame) -> Option<Image4b> {
        let spec = ImageSpec {
            width: frame.size.width,
            height: frame.size.height,
            format: self.format,
        };
        let callbacks = self.callbacks.first_mut()?;
        match callbacks.allocate(&spec) {
            Ok(mut buffer) => {
                if buffer.dimensions() != (spec.width, spec.height) {
                    tracing::warn!(
                        "allocator returned {:?}, expected {}x{}",
                        buffer.dimensions(),
                        spec.width,
                        spec.height
                    );
                    return None;
                }
                buffer.copy_from_slice(&frame.pixels);
                Some(buffer)
            }
            Err(e) => {
                tracing::warn!("allocation failed, capture dropped: {}", e);
                None
            }
        }
    }

    fn eye_crops(image: &Image4b, faces: &[FaceModel]) -> Vec<Image4b> {
        let (w, h) = image.dimensions();
        faces
            .iter()
            .flat_map(|face| face.eyes.iter())
            .filter_map(|eye| eye.roi())
            .filter_map(|roi| {
                let pad = roi.height.max(roi.width * 0.25);
                let x0 = (roi.x - pad).max(0.0) as u32;
                let y0 = (roi.y - pad).max(0.0) as u32;
                let x1 = ((roi.x + roi.width + pad).ceil() as u32).min(w);
                let y1 = ((roi.y + roi.height + pad).ceil() as u32).min(h);
                (x1 > x0 && y1 > y0)
                    .then(|| imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image())
            })
            .collect()
    }
}

impl TrackerSession for SimulatedSession {
    fn texture_format(&self) -> TextureFormat {
        self.format
    }

    fn add_callbacks(&mut self, callbacks: Box<dyn TrackerCallbacks>) {
        self.callbacks.push(callbacks);
    }

    fn process(&mut self, frame: &VideoFrame) -> Result<(), EngineError> {
        let span = self.span.clone();
        let _enter = span.enter();

        if frame.format != self.format.pixel_format() {
            return Err(EngineError::UnsupportedFormat(format!(
                "expected {:?}, got {:?}",
                self.format.pixel_format(),
                frame.format
            )));
        }
        if frame.pixels.len() != frame.expected_len() {
            return Err(EngineError::BufferSize {
                expected: frame.expected_len(),
                actual: frame.pixels.len(),
            });
        }

        let faces = self.detect();

        // allocate -> trigger -> result
        let staged = self.stage(frame);

        let request = self
            .callbacks
            .iter_mut()
            .fold(CaptureRequest::none(), |acc, cb| {
                acc.merge(cb.trigger(&faces, frame.timestamp))
            });

        let mut result = TrackResult::new(faces, self.format, frame.timestamp);
        if !request.is_empty() {
            if let Some(image) = staged {
                if request.get_eyes {
                    result.eye_crops = Self::eye_crops(&image, &result.faces);
                }
                if request.get_image || request.get_frame {
                    result.image = Some(image);
                }
            }
            if request.get_texture {
                result.texture = Some(self.next_texture);
                self.next_texture += 1;
            }
        }

        for cb in self.callbacks.iter_mut() {
            cb.result(std::slice::from_ref(&result));
        }

        self.frame_index += 1;
        Ok(())
    }
}

/// Plausible face geometry for a face at the midpoint of the detection range
pub fn synthesize_face(sensor: &SensorModel, config: &SessionConfig) -> Option<FaceModel> {
    let z = (config.min_detection_distance + config.max_detection_distance) / 2.0;
    let center = sensor.project(0.0, 0.0, z)?;

    let size = sensor.intrinsic.size;
    let limit = 0.8 * size.width.min(size.height) as f32;
    let w = (sensor.intrinsic.focal_length * FACE_WIDTH_METERS / z).min(limit);

    let left = Point2D::new(center.x - 0.2 * w, center.y - 0.1 * w);
    let right = Point2D::new(center.x + 0.2 * w, center.y - 0.1 * w);
    let landmarks = vec![
        left,
        right,
        Point2D::new(center.x, center.y + 0.05 * w),
        Point2D::new(center.x - 0.15 * w, center.y + 0.25 * w),
        Point2D::new(center.x + 0.15 * w, center.y + 0.25 * w),
    ];

    Some(FaceModel {
        landmarks,
        eyes: vec![synthesize_eye(left, 0.18 * w), synthesize_eye(right, 0.18 * w)],
        position: Some(Point3D::new(0.0, 0.0, z)),
    })
}

fn synthesize_eye(center: Point2D, width: f32) -> EyeModel {
    let height = width * 0.4;
    let eyelids = (0..8)
        .map(|i| {
            let t = i as f32 / 8.0 * std::f32::consts::TAU;
            Point2D::new(center.x + width / 2.0 * t.cos(), center.y + height / 2.0 * t.sin())
        })
        .collect();
    let crease = (1..4)
        .map(|i| {
            let t = i as f32 / 4.0 * std::f32::consts::PI;
            Point2D::new(center.x - width / 2.0 * t.cos(), center.y - height * t.sin())
        })
        .collect();

    EyeModel {
        iris: Ellipse::new(center, width * 0.45, width * 0.45, 0.0),
        pupil: Ellipse::new(center, width * 0.18, width * 0.18, 0.0),
        eyelids,
        crease,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureGate, CaptureVolume};
    use crate::error::CallbackError;
    use crate::types::{PixelFormat, Size};
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn load_resources(dir: &TempDir) -> ResourceBundle {
        let manifest = dir.path().join("models.json");
        for name in ["detector.cpb", "eye.cpb", "face.cpb", "mean.json"] {
            fs::write(dir.path().join(name), b"model").unwrap();
        }
        fs::write(
            &manifest,
            r#"{"face_detector": "detector.cpb", "eye_model_regressor": "eye.cpb",
                "face_landmark_regressor": "face.cpb", "face_detector_mean": "mean.json"}"#,
        )
        .unwrap();
        ResourceBundle::load(&manifest, "simulated").unwrap()
    }

    fn face_at(z: f32) -> FaceModel {
        FaceModel {
            landmarks: vec![Point2D::new(8.0, 8.0)],
            eyes: Vec::new(),
            position: Some(Point3D::new(0.0, 0.0, z)),
        }
    }

    #[derive(Default)]
    struct Log {
        triggered: Vec<usize>,
        requests: Vec<CaptureRequest>,
        /// (image delivered, texture id, face count)
        results: Vec<(bool, Option<u32>, usize)>,
        images: Vec<Image4b>,
    }

    struct Recording {
        fail_allocation: bool,
        gate: CaptureGate,
        log: Rc<RefCell<Log>>,
    }

    impl Recording {
        fn new(gate: CaptureGate) -> (Self, Rc<RefCell<Log>>) {
            let log = Rc::new(RefCell::new(Log::default()));
            let callbacks = Self {
                fail_allocation: false,
                gate,
                log: Rc::clone(&log),
            };
            (callbacks, log)
        }
    }

    impl TrackerCallbacks for Recording {
        fn allocate(&mut self, spec: &ImageSpec) -> Result<Image4b, CallbackError> {
            if self.fail_allocation {
                return Err(CallbackError::InvalidImageSpec {
                    width: spec.width,
                    height: spec.height,
                });
            }
            Ok(Image4b::new(spec.width, spec.height))
        }

        fn trigger(&mut self, faces: &[FaceModel], timestamp: f64) -> CaptureRequest {
            let request = self.gate.evaluate(faces, timestamp);
            let mut log = self.log.borrow_mut();
            log.triggered.push(faces.len());
            log.requests.push(request);
            request
        }

        fn result(&mut self, results: &[TrackResult]) {
            let mut log = self.log.borrow_mut();
            for r in results {
                log.results.push((r.image.is_some(), r.texture, r.faces.len()));
                if let Some(image) = &r.image {
                    log.images.push(image.clone());
                }
            }
        }
    }

    /// Fires on every frame with a face near z = 0.5
    fn eager_gate() -> CaptureGate {
        CaptureGate::new(Some(CaptureVolume::new(Point3D::new(0.0, 0.0, 0.5), 10.0, 0.0)))
    }

    fn frame(size: Size, format: TextureFormat, t: f64) -> VideoFrame {
        let pixel_format = format.pixel_format();
        let len = size.area() as usize * pixel_format.channels();
        let pixels = (0..len).map(|i| (i % 251) as u8).collect();
        VideoFrame::new(size, pixels, pixel_format, t)
    }

    fn range(min: f32, max: f32, multi_face: bool) -> SessionConfig {
        SessionConfig {
            min_detection_distance: min,
            max_detection_distance: max,
            multi_face,
            ..Default::default()
        }
    }

    #[test]
    fn test_failed_allocation_still_delivers_result() {
        let dir = TempDir::new().unwrap();
        let size = Size::new(32, 24);
        let engine = SimulatedEngine::new();
        let mut session = engine
            .create_session(
                SensorModel::for_frame(size, None),
                load_resources(&dir),
                &range(0.4, 0.6, false),
            )
            .unwrap();

        let (mut callbacks, log) = Recording::new(eager_gate());
        callbacks.fail_allocation = true;
        session.add_callbacks(Box::new(callbacks));

        let format = session.texture_format();
        session.process(&frame(size, format, 0.0)).unwrap();
        session.process(&frame(size, format, 1.0)).unwrap();

        let log = log.borrow();
        assert_eq!(log.requests, vec![CaptureRequest::full(); 2]);
        // Pixels are dropped, the rest of the result still arrives
        assert_eq!(log.results, vec![(false, Some(1), 1), (false, Some(2), 1)]);
    }

    #[test]
    fn test_faces_outside_range_are_dropped() {
        let dir = TempDir::new().unwrap();
        let size = Size::new(32, 24);
        let script = vec![vec![face_at(0.2), face_at(0.5), face_at(0.9)]];
        let mut session = SimulatedEngine::scripted(script)
            .create_session(
                SensorModel::for_frame(size, None),
                load_resources(&dir),
                &range(0.4, 0.6, true),
            )
            .unwrap();

        let (callbacks, log) = Recording::new(CaptureGate::disabled());
        session.add_callbacks(Box::new(callbacks));
        let format = session.texture_format();
        session.process(&frame(size, format, 0.0)).unwrap();

        assert_eq!(log.borrow().triggered, vec![1]);
    }

    #[test]
    fn test_single_face_unless_multi_face() {
        let size = Size::new(32, 24);
        let script = vec![vec![face_at(0.45), face_at(0.5), face_at(0.55)]];

        for (multi_face, expected) in [(false, 1), (true, 3)] {
            let dir = TempDir::new().unwrap();
            let mut session = SimulatedEngine::scripted(script.clone())
                .create_session(
                    SensorModel::for_frame(size, None),
                    load_resources(&dir),
                    &range(0.4, 0.6, multi_face),
                )
                .unwrap();
            let (callbacks, log) = Recording::new(CaptureGate::disabled());
            session.add_callbacks(Box::new(callbacks));
            let format = session.texture_format();
            session.process(&frame(size, format, 0.0)).unwrap();

            assert_eq!(log.borrow().triggered, vec![expected]);
            assert_eq!(log.borrow().results[0].2, expected);
        }
    }

    #[test]
    fn test_script_end_yields_no_faces() {
        let dir = TempDir::new().unwrap();
        let size = Size::new(32, 24);
        let mut session = SimulatedEngine::scripted(vec![vec![face_at(0.5)]])
            .create_session(
                SensorModel::for_frame(size, None),
                load_resources(&dir),
                &range(0.4, 0.6, false),
            )
            .unwrap();

        let (callbacks, log) = Recording::new(eager_gate());
        session.add_callbacks(Box::new(callbacks));
        let format = session.texture_format();
        for t in 0..3 {
            session.process(&frame(size, format, t as f64)).unwrap();
        }

        let log = log.borrow();
        assert_eq!(log.triggered, vec![1, 0, 0]);
        assert!(!log.requests[0].is_empty());
        assert!(log.requests[1].is_empty() && log.requests[2].is_empty());
    }

    #[test]
    fn test_rgba_texture_path() {
        let dir = TempDir::new().unwrap();
        let size = Size::new(16, 12);
        let mut session = SimulatedEngine::new()
            .with_texture_format(TextureFormat::Rgba)
            .create_session(
                SensorModel::for_frame(size, None),
                load_resources(&dir),
                &range(0.4, 0.6, false),
            )
            .unwrap();
        assert_eq!(session.texture_format(), TextureFormat::Rgba);

        let (callbacks, log) = Recording::new(eager_gate());
        session.add_callbacks(Box::new(callbacks));

        let input = frame(size, TextureFormat::Rgba, 0.0);
        session.process(&input).unwrap();
        let log = log.borrow();
        assert_eq!(log.images.len(), 1);
        assert_eq!(log.images[0].as_raw(), &input.pixels);

        // Frames in the other layout are refused
        drop(log);
        let bgra = VideoFrame::new(size, vec![0; size.area() as usize * 4], PixelFormat::Bgra8, 1.0);
        assert!(matches!(session.process(&bgra), Err(EngineError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_synthetic_face_is_centered() {
        let sensor = SensorModel::for_frame(Size::new(640, 480), Some(600.0));
        let config = SessionConfig {
            min_detection_distance: 0.4,
            max_detection_distance: 0.6,
            ..Default::default()
        };
        let face = synthesize_face(&sensor, &config).unwrap();
        let position = face.position.unwrap();
        assert!((position.z - 0.5).abs() < 1e-6);
        assert_eq!(face.landmarks.len(), 5);
        assert_eq!(face.eyes.len(), 2);
        // Nose sits below the principal point
        assert_eq!(face.landmarks[2].x, 320.0);
        assert!(face.landmarks[2].y > 240.0);
    }

    #[test]
    fn test_no_face_behind_camera() {
        let sensor = SensorModel::for_frame(Size::new(64, 48), None);
        let config = SessionConfig {
            min_detection_distance: 0.0,
            max_detection_distance: 0.0,
            ..Default::default()
        };
        assert!(synthesize_face(&sensor, &config).is_none());
    }
}
