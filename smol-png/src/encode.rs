// Minimal PNG writer for fixtures: filter 0 scanlines, optional Adam7,
// IDAT optionally split across several chunks. Not size-optimised.

use alloc::vec;
use alloc::vec::Vec;

use crate::header::{ADAM7, PngHeader};
use crate::stream::PNG_SIG;

pub struct Encoder {
    header: PngHeader,
    extra: Vec<([u8; 4], Vec<u8>)>,
    idat_parts: usize,
}

impl Encoder {
    pub fn new(width: u32, height: u32, bit_depth: u8, color_type: u8) -> Self {
        Self {
            header: PngHeader {
                width,
                height,
                bit_depth,
                color_type,
                interlaced: false,
            },
            extra: Vec::new(),
            idat_parts: 1,
        }
    }

    // Adam7 output; only whole-byte pixel formats are supported here
    pub fn interlaced(mut self) -> Self {
        self.header.interlaced = true;
        self
    }

    // ancillary/PLTE chunk written between IHDR and the first IDAT
    pub fn chunk(mut self, ctype: &[u8; 4], data: &[u8]) -> Self {
        self.extra.push((*ctype, data.to_vec()));
        self
    }

    pub fn idat_parts(mut self, parts: usize) -> Self {
        self.idat_parts = parts.max(1);
        self
    }

    // `pixels` holds packed rows of `row_bytes(width)` each, no filter bytes
    pub fn finish(self, pixels: &[u8]) -> Vec<u8> {
        let hdr = self.header;
        let stride = hdr.row_bytes(hdr.width);
        assert_eq!(pixels.len(), stride * hdr.height as usize);

        let mut raw = Vec::new();
        if hdr.interlaced {
            let bpp = hdr.bits_per_pixel() / 8;
            assert!(bpp > 0, "interlaced fixtures need whole-byte pixels");
            for &(x0, y0, dx, dy, _, _) in ADAM7.iter() {
                let mut y = y0;
                while y < hdr.height {
                    let mut row = vec![0u8];
                    let mut x = x0;
                    while x < hdr.width {
                        let o = y as usize * stride + x as usize * bpp;
                        row.extend_from_slice(&pixels[o..o + bpp]);
                        x += dx;
                    }
                    if row.len() > 1 {
                        raw.extend_from_slice(&row);
                    }
                    y += dy;
                }
            }
        } else {
            for row in pixels.chunks(stride) {
                raw.push(0);
                raw.extend_from_slice(row);
            }
        }

        let zlib = miniz_oxide::deflate::compress_to_vec_zlib(&raw, 6);

        let mut out = Vec::new();
        out.extend_from_slice(&PNG_SIG);

        let mut ihdr = [0u8; 13];
        ihdr[0..4].copy_from_slice(&hdr.width.to_be_bytes());
        ihdr[4..8].copy_from_slice(&hdr.height.to_be_bytes());
        ihdr[8] = hdr.bit_depth;
        ihdr[9] = hdr.color_type;
        ihdr[12] = hdr.interlaced as u8;
        write_chunk(&mut out, b"IHDR", &ihdr);

        for (ctype, data) in &self.extra {
            write_chunk(&mut out, ctype, data);
        }

        let part = zlib.len().div_ceil(self.idat_parts).max(1);
        for piece in zlib.chunks(part) {
            write_chunk(&mut out, b"IDAT", piece);
        }
        write_chunk(&mut out, b"IEND", &[]);
        out
    }
}

// 8-bit RGBA image from a pixel list, row-major
pub fn rgba8(width: u32, height: u32, pixels: &[[u8; 4]]) -> Vec<u8> {
    let flat: Vec<u8> = pixels.iter().flatten().copied().collect();
    Encoder::new(width, height, 8, crate::header::COLOR_RGBA).finish(&flat)
}

pub fn write_chunk(out: &mut Vec<u8>, ctype: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(ctype);
    out.extend_from_slice(data);
    let mut crc = crc32_update(0xFFFF_FFFF, ctype);
    crc = crc32_update(crc, data);
    out.extend_from_slice(&(!crc).to_be_bytes());
}

fn crc32_update(mut crc: u32, data: &[u8]) -> u32 {
    for &b in data {
        crc ^= b as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
        }
    }
    crc
}
