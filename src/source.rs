//! Video sources feeding the frame loop

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::SourceError;
use crate::types::{Size, VideoFrame};

pub trait VideoSource {
    /// Next frame, `None` at end of stream
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, SourceError>;

    /// Size of the frames this source produces, if known before the first frame
    fn frame_size(&self) -> Option<Size>;

    fn name(&self) -> String;
}

/// A single image or a `.txt` list of image paths, one per line
pub struct ImageListSource {
    paths: Vec<PathBuf>,
    next: usize,
    size: Option<Size>,
    started: Instant,
}

impl ImageListSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        let size = paths
            .iter()
            .find_map(|p| image::image_dimensions(p).ok())
            .map(|(w, h)| Size::new(w, h));
        Self {
            paths,
            next: 0,
            size,
            started: Instant::now(),
        }
    }

    pub fn open<P: AsRef<Path>>(input: P) -> Result<Self, SourceError> {
        let input = input.as_ref();
        let is_list = input
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));

        let paths = if is_list {
            let contents = fs::read_to_string(input).map_err(|source| SourceError::ImageList {
                path: input.to_path_buf(),
                source,
            })?;
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(PathBuf::from)
                .collect()
        } else {
            vec![input.to_path_buf()]
        };

        let source = Self::new(paths);
        if source.size.is_none() {
            return Err(SourceError::Empty(input.display().to_string()));
        }
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl VideoSource for ImageListSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, SourceError> {
        while let Some(path) = self.paths.get(self.next) {
            self.next += 1;
            match image::open(path) {
                Ok(img) => {
                    tracing::info!("Frame: {}", path.display());
                    let timestamp = self.started.elapsed().as_secs_f64();
                    return Ok(Some(VideoFrame::from_rgb(img.to_rgb8(), timestamp)));
                }
                Err(e) => tracing::error!("Unable to read image {}: {}", path.display(), e),
            }
        }
        Ok(None)
    }

    fn frame_size(&self) -> Option<Size> {
        self.size
    }

    fn name(&self) -> String {
        match self.paths.len() {
            1 => self.paths[0].display().to_string(),
            n => format!("image list ({} files)", n),
        }
    }
}

/// Pick a source for `--input`: a device number opens a camera, anything else is read as
/// an image or image list.
pub fn open_source(input: &str) -> anyhow::Result<Box<dyn VideoSource>> {
    if let Ok(index) = input.parse::<u32>() {
        return open_camera(index);
    }
    Ok(Box::new(ImageListSource::open(input)?))
}

#[cfg(feature = "camera")]
fn open_camera(index: u32) -> anyhow::Result<Box<dyn VideoSource>> {
    Ok(Box::new(crate::camera::CameraSource::new(index)?))
}

#[cfg(not(feature = "camera"))]
fn open_camera(index: u32) -> anyhow::Result<Box<dyn VideoSource>> {
    Err(SourceError::Camera(format!(
        "camera {} requested but this build has no camera support (enable the 'camera' feature)",
        index
    ))
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_image(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(w, h, Rgb([10, 20, 30])).save(&path).unwrap();
        path
    }

    #[test]
    fn test_single_image() {
        let dir = TempDir::new().unwrap();
        let path = write_image(dir.path(), "face.png", 8, 6);

        let mut source = ImageListSource::open(&path).unwrap();
        assert_eq!(source.frame_size(), Some(Size::new(8, 6)));
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.size, Size::new(8, 6));
        assert_eq!(frame.pixels.len(), 8 * 6 * 3);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_list_skips_blank_and_unreadable() {
        let dir = TempDir::new().unwrap();
        let a = write_image(dir.path(), "a.png", 4, 4);
        let b = write_image(dir.path(), "b.png", 4, 4);
        let list = dir.path().join("frames.txt");
        let missing = dir.path().join("missing.png");
        fs::write(
            &list,
            format!("{}\n\n{}\n{}\n", a.display(), missing.display(), b.display()),
        )
        .unwrap();

        let mut source = ImageListSource::open(&list).unwrap();
        assert_eq!(source.len(), 3);
        let mut frames = 0;
        while let Some(frame) = source.next_frame().unwrap() {
            assert_eq!(frame.size, Size::new(4, 4));
            frames += 1;
        }
        assert_eq!(frames, 2);
    }

    #[test]
    fn test_unreadable_input_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ImageListSource::open(dir.path().join("nothing.png")),
            Err(SourceError::Empty(_))
        ));
        assert!(matches!(
            ImageListSource::open(dir.path().join("nothing.txt")),
            Err(SourceError::ImageList { .. })
        ));
    }
}
