use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::{Image4b, TextureFormat};

/// Writes canvases as `frame_0000.png`, `frame_0001.png`, ... under an output directory
pub struct FrameWriter {
    dir: PathBuf,
    counter: usize,
}

impl FrameWriter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir, counter: 0 })
    }

    pub fn count(&self) -> usize {
        self.counter
    }

    pub fn next_path(&self) -> PathBuf {
        self.dir.join(format!("frame_{:04}.png", self.counter))
    }

    /// The counter advances even when the write fails, so numbering stays monotonic
    pub fn write(&mut self, canvas: &Image4b, format: TextureFormat) -> Result<PathBuf> {
        let path = self.next_path();
        self.counter += 1;

        match format {
            TextureFormat::Rgba => canvas.save(&path)?,
            TextureFormat::Bgra => to_rgba(canvas, format).save(&path)?,
        }
        Ok(path)
    }
}

/// Reorder channels of a canvas stored in `format` into RGBA
pub fn to_rgba(canvas: &Image4b, format: TextureFormat) -> Image4b {
    let [ri, gi, bi, ai] = format.rgba_indices();
    let mut out = canvas.clone();
    for pixel in out.pixels_mut() {
        let p = pixel.0;
        pixel.0 = [p[ri], p[gi], p[bi], p[ai]];
    }
    out
}
