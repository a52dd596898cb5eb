use std::fmt;

use image::{ImageBuffer, Rgb, Rgba};
use serde::{Deserialize, Serialize};

/// 4-channel image storage. The channel order is given by the accompanying `TextureFormat`.
pub type Image4b = ImageBuffer<Rgba<u8>, Vec<u8>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Represents a single 3D point in camera space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3D {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Point3D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

/// Rotated ellipse, angle in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ellipse {
    pub center: Point2D,
    pub width: f32,
    pub height: f32,
    pub angle: f32,
}

impl Ellipse {
    pub fn new(center: Point2D, width: f32, height: f32, angle: f32) -> Self {
        Self { center, width, height, angle }
    }
}

/// Per-eye geometry reported by the engine
#[derive(Debug, Clone, Default)]
pub struct EyeModel {
    pub iris: Ellipse,
    pub pupil: Ellipse,
    pub eyelids: Vec<Point2D>,
    pub crease: Vec<Point2D>,
}

impl EyeModel {
    /// Bounding box of the eyelid contour, used for eye crops
    pub fn roi(&self) -> Option<Rect> {
        let first = self.eyelids.first()?;
        let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
        for p in &self.eyelids[1..] {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }
}

/// A detected face: landmarks, eyes, and the estimated position in camera space
#[derive(Debug, Clone, Default)]
pub struct FaceModel {
    pub landmarks: Vec<Point2D>,
    pub eyes: Vec<EyeModel>,
    pub position: Option<Point3D>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
    Bgra8,
}

impl PixelFormat {
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
        }
    }
}

/// Native texture layout of the platform the engine runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba,
    Bgra,
}

impl TextureFormat {
    pub fn native() -> Self {
        if cfg!(target_os = "android") {
            TextureFormat::Rgba
        } else {
            TextureFormat::Bgra
        }
    }

    pub fn pixel_format(&self) -> PixelFormat {
        match self {
            TextureFormat::Rgba => PixelFormat::Rgba8,
            TextureFormat::Bgra => PixelFormat::Bgra8,
        }
    }

    /// Channel indices of red, green, blue and alpha
    pub fn rgba_indices(&self) -> [usize; 4] {
        match self {
            TextureFormat::Rgba => [0, 1, 2, 3],
            TextureFormat::Bgra => [2, 1, 0, 3],
        }
    }
}

/// One frame handed to the tracking engine
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub size: Size,
    pub pixels: Vec<u8>,
    pub format: PixelFormat,
    /// Tightly packed rows (no pitch padding)
    pub packed: bool,
    /// Seconds since the session started
    pub timestamp: f64,
}

impl VideoFrame {
    pub fn new(size: Size, pixels: Vec<u8>, format: PixelFormat, timestamp: f64) -> Self {
        Self {
            size,
            pixels,
            format,
            packed: true,
            timestamp,
        }
    }

    pub fn from_rgb(image: ImageBuffer<Rgb<u8>, Vec<u8>>, timestamp: f64) -> Self {
        let size = Size::new(image.width(), image.height());
        Self::new(size, image.into_raw(), PixelFormat::Rgb8, timestamp)
    }

    pub fn expected_len(&self) -> usize {
        self.size.area() as usize * self.format.channels()
    }

    /// Convert to the 4-channel layout of `target`. 3-channel frames gain an opaque alpha.
    pub fn normalized(self, target: TextureFormat) -> Self {
        let wanted = target.pixel_format();
        if self.format == wanted {
            return self;
        }
        let [ri, gi, bi, ai] = target.rgba_indices();
        let pixel_count = self.size.area() as usize;
        let mut out = vec![0u8; pixel_count * 4];
        let channels = self.format.channels();
        for (src, dst) in self.pixels.chunks_exact(channels).zip(out.chunks_exact_mut(4)) {
            let (r, g, b, a) = match self.format {
                PixelFormat::Rgb8 => (src[0], src[1], src[2], 255),
                PixelFormat::Rgba8 => (src[0], src[1], src[2], src[3]),
                PixelFormat::Bgra8 => (src[2], src[1], src[0], src[3]),
            };
            dst[ri] = r;
            dst[gi] = g;
            dst[bi] = b;
            dst[ai] = a;
        }
        Self {
            size: self.size,
            pixels: out,
            format: wanted,
            packed: true,
            timestamp: self.timestamp,
        }
    }
}

/// Image the engine asks the harness to allocate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSpec {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Extra data the harness wants for the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureRequest {
    /// Number of recent frames to retrieve
    pub frames: u32,
    /// Frames delivered in user memory
    pub get_image: bool,
    /// Frames delivered as texture ids
    pub get_texture: bool,
    /// Full frame images rather than face crops
    pub get_frame: bool,
    /// Per-eye crops
    pub get_eyes: bool,
}

impl CaptureRequest {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn full() -> Self {
        Self {
            frames: 1,
            get_image: true,
            get_texture: true,
            get_frame: true,
            get_eyes: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    pub fn wants_pixels(&self) -> bool {
        !self.is_empty() && (self.get_image || self.get_frame || self.get_eyes)
    }

    pub fn merge(self, other: CaptureRequest) -> Self {
        Self {
            frames: self.frames.max(other.frames),
            get_image: self.get_image || other.get_image,
            get_texture: self.get_texture || other.get_texture,
            get_frame: self.get_frame || other.get_frame,
            get_eyes: self.get_eyes || other.get_eyes,
        }
    }
}

/// Finalized per-frame output. Only borrowed for the duration of the result callback.
#[derive(Debug, Clone)]
pub struct TrackResult {
    pub faces: Vec<FaceModel>,
    pub image: Option<Image4b>,
    pub format: TextureFormat,
    pub texture: Option<u32>,
    pub eye_crops: Vec<Image4b>,
    pub timestamp: f64,
}

impl TrackResult {
    pub fn new(faces: Vec<FaceModel>, format: TextureFormat, timestamp: f64) -> Self {
        Self {
            faces,
            image: None,
            format,
            texture: None,
            eye_crops: Vec::new(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rgb_to_bgra() {
        let frame = VideoFrame::new(Size::new(1, 1), vec![10, 20, 30], PixelFormat::Rgb8, 0.0);
        let out = frame.normalized(TextureFormat::Bgra);
        assert_eq!(out.format, PixelFormat::Bgra8);
        assert_eq!(out.pixels, vec![30, 20, 10, 255]);
    }

    #[test]
    fn test_normalize_rgb_to_rgba() {
        let frame = VideoFrame::new(Size::new(2, 1), vec![1, 2, 3, 4, 5, 6], PixelFormat::Rgb8, 0.0);
        let out = frame.normalized(TextureFormat::Rgba);
        assert_eq!(out.pixels, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn test_normalize_swaps_four_channel() {
        let frame = VideoFrame::new(Size::new(1, 1), vec![1, 2, 3, 4], PixelFormat::Rgba8, 0.0);
        let out = frame.normalized(TextureFormat::Bgra);
        assert_eq!(out.pixels, vec![3, 2, 1, 4]);
    }

    #[test]
    fn test_request_merge() {
        let merged = CaptureRequest::none().merge(CaptureRequest::full());
        assert_eq!(merged, CaptureRequest::full());
        assert!(CaptureRequest::none().is_empty());
        assert!(!CaptureRequest::none().wants_pixels());
    }

    #[test]
    fn test_eye_roi() {
        let eye = EyeModel {
            eyelids: vec![Point2D::new(10.0, 5.0), Point2D::new(20.0, 8.0), Point2D::new(15.0, 2.0)],
            ..Default::default()
        };
        let roi = eye.roi().unwrap();
        assert_eq!(roi, Rect::new(10.0, 2.0, 10.0, 6.0));
        assert!(EyeModel::default().roi().is_none());
    }
}
