use kurbo::Rect;

use crate::foundation::core::Canvas;
use crate::foundation::error::{AvError, AvResult};
use crate::render::blend::over_straight;

/// A rendered layer or output frame as RGBA8 pixels.
///
/// Pixels are sRGB with **straight** (non-premultiplied) alpha, tightly packed, row-major. This is
/// the byte layout the transcoder receives with `-pix_fmt rgba`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, `width * height * 4` long.
    pub data: Vec<u8>,
}

impl FrameRGBA {
    /// Fully transparent frame.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 4],
        }
    }

    /// Frame filled with a single straight-alpha colour.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap raw bytes, validating the length.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> AvResult<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(AvError::validation(format!(
                "rgba buffer has {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Convert from an `image` crate buffer.
    pub fn from_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }

    /// Convert into an `image` crate buffer.
    pub fn into_image(self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data)
    }

    /// Return `true` when the frame matches `canvas` exactly.
    pub fn matches(&self, canvas: Canvas) -> bool {
        self.width == canvas.width
            && self.height == canvas.height
            && self.data.len() == canvas.frame_bytes()
    }

    /// Read one pixel. Out-of-range coordinates return transparent black.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0, 0];
        }
        let i = self.index(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Overwrite one pixel. Out-of-range coordinates are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.index(x, y);
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    /// Overwrite every pixel whose centre lies inside `rect` (clipped to the frame).
    ///
    /// `rect` may have its corners in any order.
    pub fn fill_rect(&mut self, rect: Rect, rgba: [u8; 4]) {
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        for y in y0..y1 {
            let row = self.index(x0, y);
            for px in self.data[row..row + (x1 - x0) as usize * 4].chunks_exact_mut(4) {
                px.copy_from_slice(&rgba);
            }
        }
    }

    /// Alpha-composite `src` over this frame with its top-left corner at `(dx, dy)`.
    ///
    /// Parts of `src` falling outside this frame are dropped.
    pub fn draw_over(&mut self, src: &FrameRGBA, dx: i64, dy: i64) {
        for sy in 0..src.height {
            let ty = i64::from(sy) + dy;
            if ty < 0 || ty >= i64::from(self.height) {
                continue;
            }
            for sx in 0..src.width {
                let tx = i64::from(sx) + dx;
                if tx < 0 || tx >= i64::from(self.width) {
                    continue;
                }
                let s = src.pixel(sx, sy);
                if s[3] == 0 {
                    continue;
                }
                let (tx, ty) = (tx as u32, ty as u32);
                let d = self.pixel(tx, ty);
                self.put_pixel(tx, ty, over_straight(d, s));
            }
        }
    }

    /// Mirror the frame top-to-bottom.
    pub fn flipped_vertical(&self) -> Self {
        let row_len = self.width as usize * 4;
        let mut data = Vec::with_capacity(self.data.len());
        for row in self.data.chunks_exact(row_len.max(1)).rev() {
            data.extend_from_slice(row);
        }
        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    fn clip(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        let r = rect.abs();
        let x0 = r.x0.round().clamp(0.0, f64::from(self.width)) as u32;
        let x1 = r.x1.round().clamp(0.0, f64::from(self.width)) as u32;
        let y0 = r.y0.round().clamp(0.0, f64::from(self.height)) as u32;
        let y1 = r.y1.round().clamp(0.0, f64::from(self.height)) as u32;
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
