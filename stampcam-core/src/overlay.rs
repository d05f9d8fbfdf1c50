//! Text overlay on decoded frames
//!
//! A captured JPEG is decoded into an [`RgbMatrix`], the caption is drawn
//! straight into the pixels with `embedded-graphics`, and the matrix is
//! handed back to the camera's JPEG encoder.
//!
//! The caption is centred with a fixed 14 pixel advance per character and
//! its top edge sits a fixed margin above the bottom of the frame.

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_graphics::mono_font::ascii::FONT_10X20;
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};

/// Bytes per pixel in the matrix
pub const BYTES_PER_PIXEL: usize = 3;

/// Caption font: 10x20 glyphs spaced to a 14 pixel advance
pub const OVERLAY_FONT: MonoFont<'static> = MonoFont {
    character_spacing: 4,
    ..FONT_10X20
};

/// Colour as `0x00RRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OverlayColor(pub u32);

impl OverlayColor {
    pub const BLACK: Self = Self(0x0000_0000);
    pub const WHITE: Self = Self(0x00FF_FFFF);

    /// Convert to an `embedded-graphics` colour, ignoring the top byte
    pub fn to_rgb888(self) -> Rgb888 {
        let [_, r, g, b] = self.0.to_be_bytes();
        Rgb888::new(r, g, b)
    }
}

/// Decoded 24-bit frame, row-major, BGR byte order
///
/// The byte order matches what the camera's RGB888 converter produces.
pub struct RgbMatrix {
    width: u16,
    height: u16,
    pixels: Vec<u8>,
}

impl RgbMatrix {
    /// Allocate a zeroed matrix
    pub fn new(width: u16, height: u16) -> Self {
        #[cfg(test)]
        tracking::allocated();

        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Raw pixel bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Raw pixel bytes for the converter to fill
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Colour of the pixel at (`x`, `y`), if inside the frame
    pub fn pixel(&self, x: u16, y: u16) -> Option<Rgb888> {
        let idx = self.index(Point::new(x as i32, y as i32))?;
        let bgr = &self.pixels[idx..idx + BYTES_PER_PIXEL];
        Some(Rgb888::new(bgr[2], bgr[1], bgr[0]))
    }

    /// Fill the whole frame with one colour
    pub fn fill(&mut self, color: Rgb888) {
        for px in self.pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&[color.b(), color.g(), color.r()]);
        }
    }

    fn index(&self, point: Point) -> Option<usize> {
        let x = usize::try_from(point.x).ok()?;
        let y = usize::try_from(point.y).ok()?;
        if x >= self.width as usize || y >= self.height as usize {
            return None;
        }
        Some((y * self.width as usize + x) * BYTES_PER_PIXEL)
    }
}

#[cfg(test)]
impl Drop for RgbMatrix {
    fn drop(&mut self) {
        tracking::released();
    }
}

impl OriginDimensions for RgbMatrix {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

impl DrawTarget for RgbMatrix {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            // Glyphs may hang off any edge
            if let Some(idx) = self.index(point) {
                self.pixels[idx] = color.b();
                self.pixels[idx + 1] = color.g();
                self.pixels[idx + 2] = color.r();
            }
        }
        Ok(())
    }
}

/// Top-left corner of a caption of `len` characters
///
/// `x = (width - len * glyph_width) / 2`, `y = height - margin`. Signed
/// arithmetic: a caption wider than the frame starts left of the frame
/// and is clipped on both sides.
pub fn text_origin(width: u16, height: u16, len: usize, glyph_width: u32, margin: u32) -> Point {
    let text_width = (len as i64).saturating_mul(glyph_width as i64);
    let x = (width as i64 - text_width) / 2;
    let y = height as i64 - margin as i64;
    Point::new(
        x.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
        y.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
    )
}

/// Draw `text` into the matrix at the caption position
pub fn stamp(matrix: &mut RgbMatrix, text: &str, color: OverlayColor, glyph_width: u32, margin: u32) {
    let origin = text_origin(
        matrix.width(),
        matrix.height(),
        text.chars().count(),
        glyph_width,
        margin,
    );
    let style = MonoTextStyle::new(&OVERLAY_FONT, color.to_rgb888());

    trace!("Overlay at ({}, {}): {}", origin.x, origin.y, text);

    // Drawing into RAM cannot fail
    let _ = Text::with_baseline(text, origin, style, Baseline::Top).draw(matrix);
}

/// Live matrix accounting for leak tests
#[cfg(test)]
pub(crate) mod tracking {
    use core::cell::Cell;

    std::thread_local! {
        static ALLOCATED: Cell<usize> = const { Cell::new(0) };
        static RELEASED: Cell<usize> = const { Cell::new(0) };
    }

    pub fn allocated() {
        ALLOCATED.with(|c| c.set(c.get() + 1));
    }

    pub fn released() {
        RELEASED.with(|c| c.set(c.get() + 1));
    }

    /// (allocated, released) on this thread since the last reset
    pub fn counts() -> (usize, usize) {
        (ALLOCATED.with(Cell::get), RELEASED.with(Cell::get))
    }

    pub fn reset() {
        ALLOCATED.with(|c| c.set(0));
        RELEASED.with(|c| c.set(0));
    }
}
