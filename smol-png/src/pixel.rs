// Scanline sample -> RGBA8.
// 16-bit channels keep the high byte; sub-byte greyscale is rescaled to 0-255.

use crate::header::{
    COLOR_GREY_ALPHA, COLOR_GREYSCALE, COLOR_PALETTE, COLOR_RGB, COLOR_RGBA, PngHeader,
};

// PLTE entries (RGB) plus per-entry alpha from tRNS
pub struct Palette {
    rgb: [u8; 768],
    alpha: [u8; 256],
    len: usize,
}

impl Palette {
    pub const fn new() -> Self {
        Self {
            rgb: [0; 768],
            alpha: [255; 256],
            len: 0,
        }
    }

    pub fn set_rgb(&mut self, plte: &[u8]) {
        let n = plte.len().min(768);
        self.rgb[..n].copy_from_slice(&plte[..n]);
        self.len = n / 3;
    }

    pub fn set_alpha(&mut self, trns: &[u8]) {
        let n = trns.len().min(256);
        self.alpha[..n].copy_from_slice(&trns[..n]);
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // out-of-range indices decode as opaque black
    #[inline]
    fn rgba(&self, idx: u8) -> [u8; 4] {
        let i = idx as usize;
        if i >= self.len {
            return [0, 0, 0, 255];
        }
        [self.rgb[i * 3], self.rgb[i * 3 + 1], self.rgb[i * 3 + 2], self.alpha[i]]
    }
}

// tRNS colour key for greyscale / truecolour images, in sample units
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorKey {
    None,
    Grey(u16),
    Rgb(u16, u16, u16),
}

impl ColorKey {
    pub fn from_trns(color_type: u8, trns: &[u8]) -> Self {
        match (color_type, trns.len()) {
            (COLOR_GREYSCALE, 2) => ColorKey::Grey(be_u16(trns, 0)),
            (COLOR_RGB, 6) => ColorKey::Rgb(be_u16(trns, 0), be_u16(trns, 2), be_u16(trns, 4)),
            _ => ColorKey::None,
        }
    }
}

#[inline]
fn be_u16(d: &[u8], o: usize) -> u16 {
    u16::from_be_bytes([d[o], d[o + 1]])
}

// sample pixel `x` of an unfiltered scanline
pub fn sample(row: &[u8], x: usize, hdr: &PngHeader, pal: &Palette, key: ColorKey) -> [u8; 4] {
    match (hdr.color_type, hdr.bit_depth) {
        (COLOR_GREYSCALE, 16) => {
            let v = be_u16(row, x * 2);
            grey(row[x * 2], key == ColorKey::Grey(v))
        }
        (COLOR_GREYSCALE, 8) => grey(row[x], key == ColorKey::Grey(row[x] as u16)),
        (COLOR_GREYSCALE, bd) => {
            let raw = unpack_sub_byte(row, x, bd);
            let max = (1u16 << bd) - 1;
            grey((raw as u16 * 255 / max) as u8, key == ColorKey::Grey(raw as u16))
        }

        (COLOR_RGB, 8) => {
            let (r, g, b) = (row[x * 3], row[x * 3 + 1], row[x * 3 + 2]);
            let clear = key == ColorKey::Rgb(r as u16, g as u16, b as u16);
            [r, g, b, if clear { 0 } else { 255 }]
        }
        (COLOR_RGB, 16) => {
            let o = x * 6;
            let clear = key == ColorKey::Rgb(be_u16(row, o), be_u16(row, o + 2), be_u16(row, o + 4));
            [row[o], row[o + 2], row[o + 4], if clear { 0 } else { 255 }]
        }

        (COLOR_PALETTE, 8) => pal.rgba(row[x]),
        (COLOR_PALETTE, bd) => pal.rgba(unpack_sub_byte(row, x, bd)),

        (COLOR_GREY_ALPHA, 8) => {
            let v = row[x * 2];
            [v, v, v, row[x * 2 + 1]]
        }
        (COLOR_GREY_ALPHA, 16) => {
            let v = row[x * 4];
            [v, v, v, row[x * 4 + 2]]
        }

        (COLOR_RGBA, 8) => {
            let o = x * 4;
            [row[o], row[o + 1], row[o + 2], row[o + 3]]
        }
        (COLOR_RGBA, 16) => {
            let o = x * 8;
            [row[o], row[o + 2], row[o + 4], row[o + 6]]
        }

        // header validation rules out every other combination
        _ => [0, 0, 0, 255],
    }
}

#[inline]
fn grey(v: u8, clear: bool) -> [u8; 4] {
    [v, v, v, if clear { 0 } else { 255 }]
}

// unpack a 1/2/4-bit sample, MSB-first
#[inline]
fn unpack_sub_byte(row: &[u8], x: usize, bit_depth: u8) -> u8 {
    let bpp = bit_depth as usize;
    let ppb = 8 / bpp;
    let byte_idx = x / ppb;
    let bit_offset = (ppb - 1 - x % ppb) * bpp;
    let mask = (1u8 << bpp) - 1;
    (row[byte_idx] >> bit_offset) & mask
}
