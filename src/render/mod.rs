//! Frame rendering
//!
//! Two renderers share the octree and the coverage masks. The cubemap
//! renderer projects the scene onto six per-face quadtrees and reads the
//! screen back through the cube projection; the screen renderer paints one
//! screen-space mask directly through an integer frustum recursion. Both
//! deliver pixels through [`PixelSink`].

pub mod cubemap;
mod face;
pub mod screen;

pub use cubemap::CubemapRenderer;
pub use screen::ScreenRenderer;

use serde::Serialize;

use crate::core::types::Result;

/// Smallest `k` with `2^k >= v`; coverage masks are sized with this
pub(crate) fn ceil_log2(v: u32) -> u32 {
    debug_assert!(v > 0);
    if v <= 1 {
        0
    } else {
        32 - (v - 1).leading_zeros()
    }
}

/// Destination for rendered pixels. Colors are `0xAARRGGBB`; a renderer
/// calls this at most once per screen pixel per frame.
pub trait PixelSink {
    fn put_pixel(&mut self, x: u32, y: u32, color: u32);
}

/// Owned pixel buffer, row-major `0xAARRGGBB`
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw pixels, row-major
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Read one pixel
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Fill the whole buffer with one color
    pub fn fill(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    /// Convert to an RGBA image for encoding
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let mut out = image::RgbaImage::new(self.width, self.height);
        for (i, pixel) in out.pixels_mut().enumerate() {
            let c = self.pixels[i];
            *pixel = image::Rgba([
                ((c >> 16) & 0xff) as u8,
                ((c >> 8) & 0xff) as u8,
                (c & 0xff) as u8,
                ((c >> 24) & 0xff) as u8,
            ]);
        }
        out
    }

    /// Encode the buffer as PNG
    pub fn save_png(&self, path: &std::path::Path) -> Result<()> {
        self.to_rgba_image().save(path).map_err(Into::into)
    }
}

impl PixelSink for Framebuffer {
    #[inline]
    fn put_pixel(&mut self, x: u32, y: u32, color: u32) {
        self.pixels[(y * self.width + x) as usize] = color;
    }
}

/// Per-frame timings and traversal counters
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct RenderStats {
    /// Whole frame
    pub total_ms: f64,
    /// Mask preparation
    pub prepare_ms: f64,
    /// Hierarchy traversal
    pub query_ms: f64,
    /// Pixel sink transfer
    pub transfer_ms: f64,
    /// Traversal calls
    pub visits: u64,
    /// Octree child descents
    pub oct_visits: u64,
    /// Mask child descents
    pub quad_visits: u64,
}

impl RenderStats {
    /// Emit the one-line frame trace
    pub fn log(&self) {
        log::info!(
            "{:7.2} | prepare:{:5.2} query:{:7.2} transfer:{:5.2} | count:{:9} oct:{:9} quad:{:9}",
            self.total_ms,
            self.prepare_ms,
            self.query_ms,
            self.transfer_ms,
            self.visits,
            self.oct_visits,
            self.quad_visits,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceil_log2() {
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(100), 7);
        assert_eq!(ceil_log2(128), 7);
        assert_eq!(ceil_log2(129), 8);
    }

    #[test]
    fn test_framebuffer_roundtrip() {
        let mut fb = Framebuffer::new(4, 3);
        fb.put_pixel(2, 1, 0xff336699);
        assert_eq!(fb.pixel(2, 1), 0xff336699);
        assert_eq!(fb.pixel(0, 0), 0);

        let img = fb.to_rgba_image();
        assert_eq!(img.get_pixel(2, 1).0, [0x33, 0x66, 0x99, 0xff]);
    }
}
