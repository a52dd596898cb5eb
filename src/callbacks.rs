//! Callback protocol between the tracking engine and the harness
//!
//! For every submitted frame the engine calls, in order, `allocate` to stage the frame
//! pixels, `trigger` to decide what to retrieve and `result` with the finalized data.
//! All three run on the caller's thread while the engine waits, so none of them may block.

use std::cell::RefCell;
use std::rc::Rc;
use tracing::Span;

use crate::capture::CaptureGate;
use crate::draw;
use crate::error::CallbackError;
use crate::frame_writer::FrameWriter;
use crate::preview::PreviewSink;
use crate::types::{CaptureRequest, FaceModel, Image4b, ImageSpec, Size, TextureFormat, TrackResult};

pub trait TrackerCallbacks {
    /// Supply a backing buffer for the engine to fill
    fn allocate(&mut self, spec: &ImageSpec) -> Result<Image4b, CallbackError>;

    /// Decide which extra data to retrieve for the current frame
    fn trigger(&mut self, faces: &[FaceModel], timestamp: f64) -> CaptureRequest;

    /// Receive the finalized results. The slice is only valid for this call.
    fn result(&mut self, results: &[TrackResult]);
}

/// Lets the caller keep a handle on callbacks after handing them to a session
impl<T: TrackerCallbacks> TrackerCallbacks for Rc<RefCell<T>> {
    fn allocate(&mut self, spec: &ImageSpec) -> Result<Image4b, CallbackError> {
        self.borrow_mut().allocate(spec)
    }

    fn trigger(&mut self, faces: &[FaceModel], timestamp: f64) -> CaptureRequest {
        self.borrow_mut().trigger(faces, timestamp)
    }

    fn result(&mut self, results: &[TrackResult]) {
        self.borrow_mut().result(results)
    }
}

/// Counters kept by the controller, mostly for logs and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub allocations: usize,
    pub triggers: usize,
    pub captures: usize,
    pub results: usize,
    pub saved: usize,
    pub failures: usize,
}

/// Harness side of the protocol: capture gating, annotation, persistence and preview
pub struct CaptureController {
    span: Span,
    gate: CaptureGate,
    writer: Option<FrameWriter>,
    preview: Option<Rc<RefCell<PreviewSink>>>,
    size_hint: Size,
    format: TextureFormat,
    annotate: bool,
    stats: ControllerStats,
}

impl CaptureController {
    pub fn new(logger: Span, gate: CaptureGate) -> Self {
        Self {
            span: logger,
            gate,
            writer: None,
            preview: None,
            size_hint: Size::default(),
            format: TextureFormat::native(),
            annotate: true,
            stats: ControllerStats::default(),
        }
    }

    pub fn with_writer(mut self, writer: FrameWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn with_preview(mut self, preview: Rc<RefCell<PreviewSink>>) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn with_annotation(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// Session frame size and texture layout; blank canvases use this size
    pub fn set_size_hint(&mut self, size: Size, format: TextureFormat) {
        self.size_hint = size;
        self.format = format;
    }

    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    pub fn gate(&self) -> &CaptureGate {
        &self.gate
    }

    fn canvas_for(&self, result: &TrackResult) -> Image4b {
        match &result.image {
            // Use the actual image as a canvas if it was requested ...
            Some(image) if image.width() > 0 && image.height() > 0 => image.clone(),
            // ... otherwise draw on an empty one
            _ => Image4b::from_pixel(
                self.size_hint.width,
                self.size_hint.height,
                image::Rgba([0, 0, 0, 255]),
            ),
        }
    }
}

impl TrackerCallbacks for CaptureController {
    fn allocate(&mut self, spec: &ImageSpec) -> Result<Image4b, CallbackError> {
        let _enter = self.span.enter();
        tracing::debug!("allocator: {} {}", spec.width, spec.height);

        if spec.width == 0 || spec.height == 0 {
            self.stats.failures += 1;
            return Err(CallbackError::InvalidImageSpec {
                width: spec.width,
                height: spec.height,
            });
        }
        self.stats.allocations += 1;
        Ok(Image4b::new(spec.width, spec.height))
    }

    fn trigger(&mut self, faces: &[FaceModel], timestamp: f64) -> CaptureRequest {
        let _enter = self.span.enter();
        self.stats.triggers += 1;

        let request = self.gate.evaluate(faces, timestamp);
        if !request.is_empty() {
            self.stats.captures += 1;
            tracing::info!("trigger: capture requested at {:.3}s ({} faces)", timestamp, faces.len());
        } else {
            tracing::trace!("trigger: {} faces at {:.3}s", faces.len(), timestamp);
        }
        request
    }

    fn result(&mut self, results: &[TrackResult]) {
        let _enter = self.span.enter();
        self.stats.results += 1;

        let Some(result) = results.first() else {
            tracing::warn!("callback: received empty result set");
            return;
        };
        tracing::debug!(
            "callback: {} faces, image: {}, eye crops: {}",
            result.faces.len(),
            result.image.is_some(),
            result.eye_crops.len()
        );

        let mut canvas = self.canvas_for(result);
        if canvas.width() == 0 || canvas.height() == 0 {
            tracing::warn!("callback: no canvas size available, skipping frame");
            self.stats.failures += 1;
            return;
        }

        if self.annotate {
            for face in &result.faces {
                draw::draw_face(&mut canvas, face);
            }
        }

        if let Some(writer) = self.writer.as_mut() {
            match writer.write(&canvas, self.format) {
                Ok(path) => {
                    self.stats.saved += 1;
                    tracing::debug!("callback: wrote {}", path.display());
                }
                Err(e) => {
                    self.stats.failures += 1;
                    tracing::error!("callback: failed to write frame: {}", e);
                }
            }
        }

        if let Some(preview) = &self.preview {
            match preview.try_borrow_mut() {
                Ok(mut sink) => {
                    if let Err(e) = sink.present(&canvas) {
                        self.stats.failures += 1;
                        tracing::error!("callback: preview update failed: {}", e);
                    }
                }
                Err(_) => tracing::warn!("callback: preview busy, frame not shown"),
            }
        }
    }
}
