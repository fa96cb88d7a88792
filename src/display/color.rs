// RGB888 <-> RGB565 conversion and alpha blending.

use embedded_graphics_core::pixelcolor::raw::{RawData, RawU16};
use embedded_graphics_core::pixelcolor::{Rgb565, RgbColor};

// ((r >> 3) << 11) | ((g >> 2) << 5) | (b >> 3)
#[inline]
pub const fn pack(r: u8, g: u8, b: u8) -> Rgb565 {
    Rgb565::new(r >> 3, g >> 2, b >> 3)
}

#[inline]
pub fn raw(c: Rgb565) -> u16 {
    RawU16::from(c).into_inner()
}

// low bits come back as zero
#[inline]
pub fn unpack(c: Rgb565) -> [u8; 3] {
    [c.r() << 3, c.g() << 2, c.b() << 3]
}

// (s * a + b * (255 - a)) / 255 per channel
pub fn blend(src: [u8; 3], bg: [u8; 3], alpha: u8) -> [u8; 3] {
    let a = alpha as u16;
    let mix = |s: u8, b: u8| ((s as u16 * a + b as u16 * (255 - a)) / 255) as u8;
    [mix(src[0], bg[0]), mix(src[1], bg[1]), mix(src[2], bg[2])]
}
