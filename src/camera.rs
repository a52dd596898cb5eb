use anyhow::{anyhow, Context, Result};
use colored::*;
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType},
    Camera,
};
use std::time::Instant;

use crate::error::SourceError;
use crate::source::VideoSource;
use crate::types::{Size, VideoFrame};

/// Live frames from a numbered capture device
pub struct CameraSource {
    camera: Camera,
    started: Instant,
}

impl CameraSource {
    pub fn new(index: u32) -> Result<Self> {
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .context("Failed to create camera instance")?;

        camera
            .open_stream()
            .map_err(|e| anyhow!(e))
            .context("Failed to open camera stream")?;

        tracing::info!("{}", format!("Opened camera: {}", camera.info().human_name()).green());
        tracing::info!("Format: {}", camera.camera_format());

        Ok(Self {
            camera,
            started: Instant::now(),
        })
    }
}

impl VideoSource for CameraSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, SourceError> {
        let frame = self
            .camera
            .frame()
            .map_err(|e| SourceError::Camera(format!("Failed to get frame: {}", e)))?;
        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| SourceError::Camera(format!("Failed to decode frame: {}", e)))?;
        let timestamp = self.started.elapsed().as_secs_f64();
        Ok(Some(VideoFrame::from_rgb(decoded, timestamp)))
    }

    fn frame_size(&self) -> Option<Size> {
        let resolution = self.camera.resolution();
        Some(Size::new(resolution.width(), resolution.height()))
    }

    fn name(&self) -> String {
        self.camera.info().human_name()
    }
}

/// Print the capture devices nokhwa can see
pub fn list_cameras() -> Result<()> {
    let cameras = nokhwa::query(ApiBackend::Auto)?;
    println!("{}", "Available Cameras:".bold());
    println!("{:<5} | {:<30} | {:<10}", "Index", "Name", "Misc");
    println!("{}", "-".repeat(60));
    for cam in cameras {
        println!("{:<5} | {:<30} | {:?}", cam.index(), cam.human_name(), cam.misc());
    }
    Ok(())
}
