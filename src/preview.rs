use anyhow::Result;

use crate::types::{Image4b, Size, TextureFormat};

/// Window the preview is shown in
pub trait DisplaySurface {
    /// Current drawable size in pixels
    fn size(&self) -> (usize, usize);
    fn is_open(&self) -> bool;
    /// `buffer` is 0RGB, row-major, `width * height` long
    fn show(&mut self, buffer: &[u32], width: usize, height: usize) -> Result<()>;
}

/// Placement of frame coordinates inside the surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewGeometry {
    pub translate_x: f32,
    pub translate_y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Default for PreviewGeometry {
    fn default() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

pub struct PreviewSink {
    surface: Box<dyn DisplaySurface>,
    geometry: PreviewGeometry,
    frame_size: Size,
    format: TextureFormat,
    buffer: Vec<u32>,
}

impl PreviewSink {
    pub fn new(surface: Box<dyn DisplaySurface>) -> Self {
        Self {
            surface,
            geometry: PreviewGeometry::default(),
            frame_size: Size::default(),
            format: TextureFormat::native(),
            buffer: Vec::new(),
        }
    }

    pub fn initialize(&mut self, size_hint: Size, format: TextureFormat) {
        self.frame_size = size_hint;
        self.format = format;
        tracing::debug!("Preview initialized for {} frames ({:?})", size_hint, format);
        self.refresh_geometry();
    }

    pub fn geometry(&self) -> PreviewGeometry {
        self.geometry
    }

    pub fn update_geometry(&mut self, translate_x: f32, translate_y: f32, scale_x: f32, scale_y: f32) {
        self.geometry = PreviewGeometry {
            translate_x,
            translate_y,
            scale_x,
            scale_y,
        };
    }

    /// Fit the frame into the current surface size, preserving aspect ratio and centering it
    pub fn refresh_geometry(&mut self) {
        let (w, h) = self.surface.size();
        if self.frame_size.area() == 0 || w == 0 || h == 0 {
            return;
        }
        let sx = w as f32 / self.frame_size.width as f32;
        let sy = h as f32 / self.frame_size.height as f32;
        let scale = sx.min(sy);
        let tx = (w as f32 - self.frame_size.width as f32 * scale) / 2.0;
        let ty = (h as f32 - self.frame_size.height as f32 * scale) / 2.0;
        self.update_geometry(tx, ty, scale, scale);
    }

    pub fn is_open(&self) -> bool {
        self.surface.is_open()
    }

    /// Show a canvas stored in the sink's texture format
    pub fn present(&mut self, canvas: &Image4b) -> Result<()> {
        let (width, height) = self.surface.size();
        if self.buffer.len() != width * height {
            self.buffer.resize(width * height, 0);
        }
        self.buffer.fill(0);

        let g = self.geometry;
        if g.scale_x <= 0.0 || g.scale_y <= 0.0 {
            return self.surface.show(&self.buffer, width, height);
        }

        let [ri, gi, bi, _] = self.format.rgba_indices();
        for y in 0..height {
            let sy = ((y as f32 - g.translate_y) / g.scale_y).floor();
            if sy < 0.0 || sy as u32 >= canvas.height() {
                continue;
            }
            for x in 0..width {
                let sx = ((x as f32 - g.translate_x) / g.scale_x).floor();
                if sx < 0.0 || sx as u32 >= canvas.width() {
                    continue;
                }
                let p = canvas.get_pixel(sx as u32, sy as u32).0;
                let (r, gr, b) = (p[ri] as u32, p[gi] as u32, p[bi] as u32);
                self.buffer[y * width + x] = (r << 16) | (gr << 8) | b;
            }
        }

        self.surface.show(&self.buffer, width, height)
    }
}

#[cfg(feature = "preview")]
pub use window::MinifbSurface;

#[cfg(feature = "preview")]
mod window {
    use super::DisplaySurface;
    use anyhow::Result;

    pub struct MinifbSurface {
        window: minifb::Window,
    }

    impl MinifbSurface {
        pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
            let mut window = minifb::Window::new(
                title,
                width,
                height,
                minifb::WindowOptions {
                    resize: true,
                    ..minifb::WindowOptions::default()
                },
            )
            .map_err(|e| anyhow::anyhow!("Failed to create window: {}", e))?;

            window.set_target_fps(60);

            Ok(Self { window })
        }
    }

    impl DisplaySurface for MinifbSurface {
        fn size(&self) -> (usize, usize) {
            self.window.get_size()
        }

        fn is_open(&self) -> bool {
            self.window.is_open() && !self.window.is_key_down(minifb::Key::Escape)
        }

        fn show(&mut self, buffer: &[u32], width: usize, height: usize) -> Result<()> {
            self.window
                .update_with_buffer(buffer, width, height)
                .map_err(|e| anyhow::anyhow!("Window update failed: {}", e))
        }
    }
}
