use crate::types::*;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

/// An RGBA8 bitmap, row-major, straight alpha
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub rgba_data: Vec<u8>,
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba_data.len())
            .finish()
    }
}

impl Raster {
    /// A raster filled with one color
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            width,
            height,
            rgba_data: rgba.repeat(pixels),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Encode as PNG, e.g. for writing thumbnails to disk
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let image = RgbaImage::from_raw(self.width, self.height, self.rgba_data.clone())
            .ok_or_else(|| {
                AnnotateError::Config(format!(
                    "Raster buffer does not match {}x{}",
                    self.width, self.height
                ))
            })?;
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(png)
    }

    /// Whether any pixel is not fully transparent
    pub fn has_visible_pixels(&self) -> bool {
        self.rgba_data.chunks_exact(4).any(|px| px[3] != 0)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.rgba_data.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Undo a clockwise display rotation, giving the raster in page space
    pub fn unrotated(&self, rotation: Rotation) -> Raster {
        if rotation == Rotation::NONE {
            return self.clone();
        }

        let (width, height) = if rotation.is_sideways() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        };
        let mut rgba_data = vec![0u8; self.rgba_data.len()];

        for y in 0..height {
            for x in 0..width {
                let (sx, sy) = match rotation.degrees() {
                    90 => (height - 1 - y, x),
                    180 => (width - 1 - x, height - 1 - y),
                    _ => (y, width - 1 - x),
                };
                let src = (sy as usize * self.width as usize + sx as usize) * 4;
                let dst = (y as usize * width as usize + x as usize) * 4;
                rgba_data[dst..dst + 4].copy_from_slice(&self.rgba_data[src..src + 4]);
            }
        }

        Raster {
            width,
            height,
            rgba_data,
        }
    }
}

/// Pixel size of a page of `width_pt` x `height_pt` points rendered at `scale`,
/// after applying `rotation`
pub fn scaled_size(width_pt: f32, height_pt: f32, scale: f32, rotation: Rotation) -> (u32, u32) {
    let w = (width_pt * scale).round().max(1.0) as u32;
    let h = (height_pt * scale).round().max(1.0) as u32;
    if rotation.is_sideways() { (h, w) } else { (w, h) }
}
