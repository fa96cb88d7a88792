// IHDR parsing and scanline geometry.

pub const COLOR_GREYSCALE: u8 = 0;
pub const COLOR_RGB: u8 = 2;
pub const COLOR_PALETTE: u8 = 3;
pub const COLOR_GREY_ALPHA: u8 = 4;
pub const COLOR_RGBA: u8 = 6;

// widest image we allocate row buffers for (RGBA16: 32KB per row pair)
pub const MAX_WIDTH: u32 = 2048;

pub const IHDR_LEN: usize = 13;

// largest width or height a PNG may declare (2^31 - 1)
pub const MAX_DIMENSION: u32 = 0x7FFF_FFFF;

// Adam7 passes: (x0, y0, dx, dy, block_w, block_h)
pub const ADAM7: [(u32, u32, u32, u32, u32, u32); 7] = [
    (0, 0, 8, 8, 8, 8),
    (4, 0, 8, 8, 4, 8),
    (0, 4, 4, 8, 4, 4),
    (2, 0, 4, 4, 2, 4),
    (0, 2, 2, 4, 2, 2),
    (1, 0, 2, 2, 1, 2),
    (0, 1, 1, 2, 1, 1),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PngHeader {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: u8,
    pub interlaced: bool,
}

impl PngHeader {
    pub fn parse(raw: &[u8]) -> Result<Self, &'static str> {
        if raw.len() != IHDR_LEN {
            return Err("png: invalid IHDR");
        }

        let header = PngHeader {
            width: be_u32(raw, 0),
            height: be_u32(raw, 4),
            bit_depth: raw[8],
            color_type: raw[9],
            interlaced: match raw[12] {
                0 => false,
                1 => true,
                _ => return Err("png: unknown interlace method"),
            },
        };

        if header.width == 0 || header.height == 0 {
            return Err("png: zero dimensions");
        }
        if header.width > MAX_DIMENSION || header.height > MAX_DIMENSION {
            return Err("png: dimensions out of range");
        }
        if header.width > MAX_WIDTH {
            return Err("png: image too wide");
        }
        // compression and filter method: only method 0 is defined
        if raw[10] != 0 || raw[11] != 0 {
            return Err("png: unknown compression or filter method");
        }

        match (header.color_type, header.bit_depth) {
            (COLOR_GREYSCALE, 1 | 2 | 4 | 8 | 16) => {}
            (COLOR_RGB, 8 | 16) => {}
            (COLOR_PALETTE, 1 | 2 | 4 | 8) => {}
            (COLOR_GREY_ALPHA, 8 | 16) => {}
            (COLOR_RGBA, 8 | 16) => {}
            _ => return Err("png: unsupported colour type / bit depth"),
        }

        Ok(header)
    }

    pub fn channels(&self) -> usize {
        match self.color_type {
            COLOR_RGB => 3,
            COLOR_GREY_ALPHA => 2,
            COLOR_RGBA => 4,
            _ => 1,
        }
    }

    pub fn bits_per_pixel(&self) -> usize {
        self.channels() * self.bit_depth as usize
    }

    // filter stride for Sub/Average/Paeth; 1 for sub-byte depths
    pub fn bytes_per_pixel(&self) -> usize {
        (self.bits_per_pixel() / 8).max(1)
    }

    // unfiltered row length in bytes for a row `width` pixels wide
    pub fn row_bytes(&self, width: u32) -> usize {
        (width as usize * self.bits_per_pixel()).div_ceil(8)
    }

    pub fn pass_count(&self) -> usize {
        if self.interlaced { ADAM7.len() } else { 1 }
    }

    // (x0, y0, dx, dy, block_w, block_h) for one pass
    pub fn pass(&self, idx: usize) -> (u32, u32, u32, u32, u32, u32) {
        if self.interlaced {
            ADAM7[idx]
        } else {
            (0, 0, 1, 1, 1, 1)
        }
    }

    // reduced image size of one pass; either side may be zero
    pub fn pass_size(&self, idx: usize) -> (u32, u32) {
        let (x0, y0, dx, dy, _, _) = self.pass(idx);
        let w = if self.width > x0 { (self.width - x0).div_ceil(dx) } else { 0 };
        let h = if self.height > y0 { (self.height - y0).div_ceil(dy) } else { 0 };
        (w, h)
    }
}

// big-endian u32 (PNG uses network byte order)
#[inline]
pub fn be_u32(d: &[u8], o: usize) -> u32 {
    u32::from_be_bytes([d[o], d[o + 1], d[o + 2], d[o + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ihdr(w: u32, h: u32, depth: u8, color: u8, interlace: u8) -> [u8; 13] {
        let mut raw = [0u8; 13];
        raw[0..4].copy_from_slice(&w.to_be_bytes());
        raw[4..8].copy_from_slice(&h.to_be_bytes());
        raw[8] = depth;
        raw[9] = color;
        raw[12] = interlace;
        raw
    }

    #[test]
    fn parses_rgba8() {
        let h = PngHeader::parse(&ihdr(3, 2, 8, COLOR_RGBA, 0)).unwrap();
        assert_eq!((h.width, h.height), (3, 2));
        assert_eq!(h.bytes_per_pixel(), 4);
        assert_eq!(h.row_bytes(3), 12);
        assert!(!h.interlaced);
    }

    #[test]
    fn sub_byte_rows_round_up() {
        let h = PngHeader::parse(&ihdr(10, 1, 1, COLOR_GREYSCALE, 0)).unwrap();
        assert_eq!(h.row_bytes(10), 2);
        assert_eq!(h.bytes_per_pixel(), 1);
    }

    #[test]
    fn rejects_bad_combinations() {
        assert!(PngHeader::parse(&ihdr(1, 1, 4, COLOR_RGB, 0)).is_err());
        assert!(PngHeader::parse(&ihdr(1, 1, 16, COLOR_PALETTE, 0)).is_err());
        assert!(PngHeader::parse(&ihdr(0, 1, 8, COLOR_RGB, 0)).is_err());
        assert!(PngHeader::parse(&ihdr(1, 1, 8, COLOR_RGB, 2)).is_err());
        assert!(PngHeader::parse(&ihdr(MAX_WIDTH + 1, 1, 8, COLOR_RGB, 0)).is_err());
    }

    #[test]
    fn rejects_dimensions_past_2_31() {
        let tall = ihdr(4, 0xFFFF_FFF0, 8, COLOR_RGBA, 0);
        assert_eq!(PngHeader::parse(&tall), Err("png: dimensions out of range"));

        let h = PngHeader::parse(&ihdr(4, MAX_DIMENSION, 8, COLOR_RGBA, 0)).unwrap();
        assert_eq!(h.height, MAX_DIMENSION);
    }

    #[test]
    fn adam7_pass_sizes_cover_image() {
        let h = PngHeader::parse(&ihdr(5, 3, 8, COLOR_RGB, 1)).unwrap();
        let total: u32 = (0..h.pass_count())
            .map(|p| {
                let (w, h) = h.pass_size(p);
                w * h
            })
            .sum();
        assert_eq!(total, 15);
        // pass 2 starts at x=4, so a 5-wide image has one column in it
        assert_eq!(h.pass_size(1), (1, 1));
        // pass 3 starts at y=4, beyond a 3-row image
        assert_eq!(h.pass_size(2).1, 0);
    }
}
