//! Drives frames from a video source through a tracking session

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::engine::TrackerSession;
use crate::error::{FrameError, SourceError};
use crate::preview::PreviewSink;
use crate::source::VideoSource;
use crate::types::Size;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopStats {
    pub frames: usize,
    pub mismatches: usize,
    pub engine_errors: usize,
    pub elapsed: Duration,
}

impl LoopStats {
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }
}

#[derive(Default)]
pub struct FrameLoop {
    preview: Option<Rc<RefCell<PreviewSink>>>,
    size: Option<Size>,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preview(mut self, preview: Rc<RefCell<PreviewSink>>) -> Self {
        self.preview = Some(preview);
        self
    }

    /// Size established by the first frame
    pub fn frame_size(&self) -> Option<Size> {
        self.size
    }

    /// Run until the source is exhausted or the preview window closes.
    ///
    /// Frames are submitted one at a time; every callback for a frame has returned before
    /// the next one is pulled.
    pub fn run(
        &mut self,
        source: &mut dyn VideoSource,
        session: &mut dyn TrackerSession,
    ) -> Result<LoopStats, SourceError> {
        let format = session.texture_format();
        let start = Instant::now();
        let mut stats = LoopStats::default();

        loop {
            if let Some(preview) = &self.preview {
                if !preview.borrow().is_open() {
                    tracing::info!("Preview closed, stopping");
                    break;
                }
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(
                        "Video source failed after {} frames ({:.2}s): {}",
                        stats.frames,
                        start.elapsed().as_secs_f64(),
                        e
                    );
                    return Err(e);
                }
            };

            match self.size {
                None => self.size = Some(frame.size),
                Some(expected) if expected != frame.size => {
                    let err = FrameError::DimensionMismatch {
                        expected,
                        actual: frame.size,
                    };
                    tracing::error!("{}", err);
                    stats.mismatches += 1;
                }
                Some(_) => {}
            }

            let frame = frame.normalized(format);

            if let Some(preview) = &self.preview {
                preview.borrow_mut().refresh_geometry();
            }

            if let Err(e) = session.process(&frame) {
                tracing::error!("Tracking failed for frame {}: {}", stats.frames, e);
                stats.engine_errors += 1;
            }

            stats.frames += 1;
            stats.elapsed = start.elapsed();
            tracing::debug!("frame {}: {:.2} fps", stats.frames, stats.fps());
        }

        stats.elapsed = start.elapsed();
        tracing::info!(
            "Processed {} frames in {:.2}s ({:.2} fps)",
            stats.frames,
            stats.elapsed.as_secs_f64(),
            stats.fps()
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::TrackerCallbacks;
    use crate::error::EngineError;
    use crate::preview::tests::FakeSurface;
    use crate::types::{PixelFormat, TextureFormat, VideoFrame};
    use std::collections::VecDeque;

    struct QueueSource {
        frames: VecDeque<VideoFrame>,
        fail_at_end: bool,
    }

    impl QueueSource {
        fn sizes(sizes: &[(u32, u32)]) -> Self {
            let frames = sizes
                .iter()
                .enumerate()
                .map(|(i, &(w, h))| {
                    VideoFrame::new(
                        Size::new(w, h),
                        vec![0; (w * h * 3) as usize],
                        PixelFormat::Rgb8,
                        i as f64,
                    )
                })
                .collect();
            Self {
                frames,
                fail_at_end: false,
            }
        }
    }

    impl VideoSource for QueueSource {
        fn next_frame(&mut self) -> Result<Option<VideoFrame>, SourceError> {
            match self.frames.pop_front() {
                Some(frame) => Ok(Some(frame)),
                None if self.fail_at_end => Err(SourceError::Camera("unplugged".to_string())),
                None => Ok(None),
            }
        }

        fn frame_size(&self) -> Option<Size> {
            self.frames.front().map(|f| f.size)
        }

        fn name(&self) -> String {
            "queue".to_string()
        }
    }

    #[derive(Default)]
    struct RecordingSession {
        submitted: Vec<(Size, PixelFormat)>,
        fail: bool,
    }

    impl TrackerSession for RecordingSession {
        fn texture_format(&self) -> TextureFormat {
            TextureFormat::Bgra
        }

        fn add_callbacks(&mut self, _callbacks: Box<dyn TrackerCallbacks>) {}

        fn process(&mut self, frame: &VideoFrame) -> Result<(), EngineError> {
            self.submitted.push((frame.size, frame.format));
            if self.fail {
                return Err(EngineError::UnsupportedFormat("test".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_dimension_mismatch_still_submitted() {
        let mut source = QueueSource::sizes(&[(640, 480), (800, 600)]);
        let mut session = RecordingSession::default();

        let stats = FrameLoop::new().run(&mut source, &mut session).unwrap();
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.mismatches, 1);
        assert_eq!(session.submitted.len(), 2);
        assert_eq!(session.submitted[1].0, Size::new(800, 600));
    }

    #[test]
    fn test_frames_normalized_to_session_format() {
        let mut source = QueueSource::sizes(&[(4, 4)]);
        let mut session = RecordingSession::default();
        FrameLoop::new().run(&mut source, &mut session).unwrap();
        assert_eq!(session.submitted[0].1, PixelFormat::Bgra8);
    }

    #[test]
    fn test_engine_errors_do_not_stop_loop() {
        let mut source = QueueSource::sizes(&[(4, 4), (4, 4), (4, 4)]);
        let mut session = RecordingSession {
            fail: true,
            ..Default::default()
        };
        let stats = FrameLoop::new().run(&mut source, &mut session).unwrap();
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.engine_errors, 3);
    }

    #[test]
    fn test_source_error_is_returned() {
        let mut source = QueueSource::sizes(&[(4, 4)]);
        source.fail_at_end = true;
        let mut session = RecordingSession::default();
        assert!(FrameLoop::new().run(&mut source, &mut session).is_err());
        assert_eq!(session.submitted.len(), 1);
    }

    #[test]
    fn test_preview_geometry_and_close() {
        let (surface, _) = FakeSurface::new(8, 8);
        let sink = Rc::new(RefCell::new(PreviewSink::new(Box::new(surface))));
        sink.borrow_mut().initialize(Size::new(4, 4), TextureFormat::Bgra);

        let mut source = QueueSource::sizes(&[(4, 4), (4, 4)]);
        let mut session = RecordingSession::default();
        let mut frame_loop = FrameLoop::new().with_preview(Rc::clone(&sink));
        let stats = frame_loop.run(&mut source, &mut session).unwrap();
        assert_eq!(stats.frames, 2);
        assert_eq!(sink.borrow().geometry().scale_x, 2.0);
        assert_eq!(frame_loop.frame_size(), Some(Size::new(4, 4)));
    }

    #[test]
    fn test_closed_preview_stops_loop() {
        let (mut surface, _) = FakeSurface::new(8, 8);
        surface.open = false;
        let sink = Rc::new(RefCell::new(PreviewSink::new(Box::new(surface))));

        let mut source = QueueSource::sizes(&[(4, 4)]);
        let mut session = RecordingSession::default();
        let stats = FrameLoop::new()
            .with_preview(sink)
            .run(&mut source, &mut session)
            .unwrap();
        assert_eq!(stats.frames, 0);
        assert!(session.submitted.is_empty());
    }
}
