//! Pixel-addressed display surface.
//!
//! The blit pipeline only needs single-pixel writes and reads, bracketed
//! by a batch so the transport can keep the panel selected across a whole
//! image. [`crate::drivers::ili948x::Ili948x`] implements it for the SPI
//! TFTs; tests implement it over a plain map.

pub mod color;

use embedded_graphics_core::geometry::Point;
use embedded_graphics_core::pixelcolor::Rgb565;
use embedded_graphics_core::primitives::{PointsIter, Rectangle};

pub trait PixelSurface {
    /// Open a write batch. Every call is paired with one `end_batch`.
    fn begin_batch(&mut self);

    fn end_batch(&mut self);

    /// Out-of-range coordinates are ignored.
    fn write_pixel(&mut self, at: Point, color: Rgb565);

    /// Current pixel value; surfaces without readback return black.
    fn read_pixel(&mut self, at: Point) -> Rgb565;

    fn fill_rect(&mut self, area: &Rectangle, color: Rgb565) {
        for p in area.points() {
            self.write_pixel(p, color);
        }
    }
}
