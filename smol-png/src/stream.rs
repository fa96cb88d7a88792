// Push-fed PNG decoder.
//
// The caller hands over whatever bytes it has; feed() consumes as much as
// it can and reports the count. Bytes it could not use yet (a partial
// chunk header, a PLTE split across reads) stay with the caller, who
// presents them again in front of the next read. IHDR, PLTE and tRNS are
// consumed only whole, so at most MAX_LEFTOVER bytes are ever left behind;
// IDAT and unknown chunks stream through in any slice size.
//
// Decoded pixels are pushed into a PngSink one at a time while feed() runs.
// Peak RAM: ~11KB inflate state + 32KB window + two scanlines.

use alloc::boxed::Box;
use alloc::vec::Vec;

use log::{info, warn};
use miniz_oxide::inflate::TINFLStatus;
use miniz_oxide::inflate::core::{DecompressorOxide, decompress, inflate_flags};

use crate::filter::unfilter_row;
use crate::header::{COLOR_PALETTE, IHDR_LEN, PngHeader, be_u32};
use crate::pixel::{ColorKey, Palette, sample};

pub const PNG_SIG: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

const CHUNK_IHDR: [u8; 4] = *b"IHDR";
const CHUNK_PLTE: [u8; 4] = *b"PLTE";
const CHUNK_TRNS: [u8; 4] = *b"tRNS";
const CHUNK_IDAT: [u8; 4] = *b"IDAT";
const CHUNK_IEND: [u8; 4] = *b"IEND";

const CHUNK_HDR_LEN: usize = 8;
const CRC_LEN: usize = 4;
const PLTE_MAX: usize = 768;
const TRNS_MAX: usize = 256;

// miniz_oxide LZ dictionary size; must be a power of two >= 32768
const DICT_SIZE: usize = 32_768;

/// Most bytes `feed` can hand back unconsumed: one short of a full PLTE.
/// A caller's feed buffer must be larger than this.
pub const MAX_LEFTOVER: usize = PLTE_MAX - 1;

/// Receiver for decode events, called synchronously from inside `feed`.
pub trait PngSink {
    /// Header parsed. Informational.
    fn on_init(&mut self, _width: u32, _height: u32) {}

    /// One decoded pixel at (x, y). `w`/`h` is the area it stands for:
    /// 1x1 for normal images, the Adam7 block size for interlaced passes.
    fn on_draw(&mut self, x: u32, y: u32, w: u32, h: u32, rgba: [u8; 4]);
}

/// Incremental decoder interface. Returns how many leading bytes of `data`
/// were consumed; an `Err` means the stream is unusable.
pub trait StreamingDecoder {
    fn feed<S: PngSink>(&mut self, data: &[u8], sink: &mut S) -> Result<usize, &'static str>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Chunk {
    Ihdr,
    Plte,
    Trns,
    Idat,
    Iend,
    Skip,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Signature,
    ChunkHeader,
    ChunkData { kind: Chunk, left: usize },
    Crc,
    Done,
}

// scanline accumulator; sized for a full-width row, reused for every pass
struct Rows {
    header: PngHeader,
    cur: Vec<u8>, // filter byte + scanline
    prev: Vec<u8>,
    pos: usize,
    len: usize, // 1 + row bytes of the current pass
    pass: usize,
    pass_w: u32,
    pass_h: u32,
    y: u32, // row within the pass
    done: bool,
}

impl Rows {
    fn new(header: PngHeader) -> Result<Self, &'static str> {
        let row_bytes = header.row_bytes(header.width);
        let mut rows = Rows {
            header,
            cur: zeroed(1 + row_bytes, "png: OOM for scanline")?,
            prev: zeroed(row_bytes, "png: OOM for scanline")?,
            pos: 0,
            len: 0,
            pass: 0,
            pass_w: 0,
            pass_h: 0,
            y: 0,
            done: false,
        };
        rows.start_pass(0);
        Ok(rows)
    }

    // advance to the first non-empty pass at or after `idx`
    fn start_pass(&mut self, mut idx: usize) {
        while idx < self.header.pass_count() {
            let (w, h) = self.header.pass_size(idx);
            if w > 0 && h > 0 {
                self.pass = idx;
                self.pass_w = w;
                self.pass_h = h;
                self.y = 0;
                self.pos = 0;
                self.len = 1 + self.header.row_bytes(w);
                self.prev.fill(0);
                return;
            }
            idx += 1;
        }
        self.done = true;
    }

    fn push<S: PngSink>(
        &mut self,
        mut data: &[u8],
        pal: &Palette,
        key: ColorKey,
        sink: &mut S,
    ) -> Result<(), &'static str> {
        while !data.is_empty() && !self.done {
            let n = (self.len - self.pos).min(data.len());
            self.cur[self.pos..self.pos + n].copy_from_slice(&data[..n]);
            self.pos += n;
            data = &data[n..];

            if self.pos == self.len {
                self.finish_row(pal, key, sink)?;
            }
        }
        Ok(())
    }

    fn finish_row<S: PngSink>(
        &mut self,
        pal: &Palette,
        key: ColorKey,
        sink: &mut S,
    ) -> Result<(), &'static str> {
        let hdr = self.header;
        let rb = self.len - 1;
        let filter = self.cur[0];
        let line = &mut self.cur[1..self.len];
        unfilter_row(filter, line, &self.prev[..rb], hdr.bytes_per_pixel())?;

        let (x0, y0, dx, dy, bw, bh) = hdr.pass(self.pass);
        let py = y0 + self.y * dy;
        let h = bh.min(hdr.height - py);
        for i in 0..self.pass_w {
            let px = x0 + i * dx;
            let rgba = sample(line, i as usize, &hdr, pal, key);
            sink.on_draw(px, py, bw.min(hdr.width - px), h, rgba);
        }

        self.prev[..rb].copy_from_slice(line);
        self.pos = 0;
        self.y += 1;
        if self.y == self.pass_h {
            self.start_pass(self.pass + 1);
        }
        Ok(())
    }
}

pub struct PngDecoder {
    state: State,
    header: Option<PngHeader>,
    palette: Palette,
    key: ColorKey,
    rows: Option<Rows>,
    inflater: Box<DecompressorOxide>,
    dict: Vec<u8>,
    dict_pos: usize,
    zlib_done: bool,
    seen_iend: bool,
}

impl PngDecoder {
    /// Allocate inflate state and window. Fails only on OOM.
    pub fn new() -> Result<Self, &'static str> {
        // ~11KB; allocated directly on the heap to keep it off the stack
        let layout = core::alloc::Layout::new::<DecompressorOxide>();
        let ptr = unsafe { alloc::alloc::alloc_zeroed(layout) };
        if ptr.is_null() {
            return Err("png: OOM for decompressor");
        }
        let mut inflater = unsafe { Box::from_raw(ptr as *mut DecompressorOxide) };
        inflater.init();

        Ok(Self {
            state: State::Signature,
            header: None,
            palette: Palette::new(),
            key: ColorKey::None,
            rows: None,
            inflater,
            dict: zeroed(DICT_SIZE, "png: OOM for inflate window")?,
            dict_pos: 0,
            zlib_done: false,
            seen_iend: false,
        })
    }

    /// IEND and its CRC have been consumed.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    pub fn feed<S: PngSink>(&mut self, data: &[u8], sink: &mut S) -> Result<usize, &'static str> {
        let mut pos = 0usize;

        loop {
            let rest = &data[pos..];
            match self.state {
                State::Done => {
                    // trailing garbage after IEND is swallowed
                    pos = data.len();
                    break;
                }
                State::Signature => {
                    if rest.len() < PNG_SIG.len() {
                        break;
                    }
                    if rest[..PNG_SIG.len()] != PNG_SIG {
                        return Err("png: invalid signature");
                    }
                    pos += PNG_SIG.len();
                    self.state = State::ChunkHeader;
                }
                State::ChunkHeader => {
                    if rest.len() < CHUNK_HDR_LEN {
                        break;
                    }
                    let len = be_u32(rest, 0);
                    if len > 0x7FFF_FFFF {
                        return Err("png: chunk length out of range");
                    }
                    let ctype = [rest[4], rest[5], rest[6], rest[7]];
                    let kind = self.begin_chunk(len as usize, ctype)?;
                    pos += CHUNK_HDR_LEN;
                    self.state = State::ChunkData {
                        kind,
                        left: len as usize,
                    };
                }
                State::ChunkData { kind, left } => match kind {
                    Chunk::Ihdr | Chunk::Plte | Chunk::Trns => {
                        if rest.len() < left {
                            break;
                        }
                        self.whole_chunk(kind, &rest[..left], sink)?;
                        pos += left;
                        self.state = State::Crc;
                    }
                    Chunk::Idat | Chunk::Iend | Chunk::Skip => {
                        if left == 0 {
                            self.state = State::Crc;
                            continue;
                        }
                        if rest.is_empty() {
                            break;
                        }
                        let n = rest.len().min(left);
                        if kind == Chunk::Idat {
                            self.inflate(&rest[..n], sink)?;
                        }
                        pos += n;
                        self.state = State::ChunkData {
                            kind,
                            left: left - n,
                        };
                    }
                },
                State::Crc => {
                    // CRCs are not verified
                    if rest.len() < CRC_LEN {
                        break;
                    }
                    pos += CRC_LEN;
                    self.state = if self.seen_iend {
                        self.finish();
                        State::Done
                    } else {
                        State::ChunkHeader
                    };
                }
            }
        }

        Ok(pos)
    }

    fn begin_chunk(&mut self, len: usize, ctype: [u8; 4]) -> Result<Chunk, &'static str> {
        if self.header.is_none() {
            if ctype != CHUNK_IHDR || len != IHDR_LEN {
                return Err("png: missing or invalid IHDR");
            }
            return Ok(Chunk::Ihdr);
        }

        let kind = match ctype {
            CHUNK_IHDR => return Err("png: duplicate IHDR"),
            CHUNK_PLTE => {
                if len == 0 || len > PLTE_MAX || len % 3 != 0 {
                    return Err("png: invalid PLTE");
                }
                Chunk::Plte
            }
            CHUNK_TRNS if len <= TRNS_MAX => Chunk::Trns,
            CHUNK_IDAT => {
                let is_palette = self.header.map(|h| h.color_type) == Some(COLOR_PALETTE);
                if is_palette && self.palette.is_empty() {
                    return Err("png: palette image without PLTE");
                }
                Chunk::Idat
            }
            CHUNK_IEND => {
                self.seen_iend = true;
                Chunk::Iend
            }
            _ => Chunk::Skip,
        };
        Ok(kind)
    }

    fn whole_chunk<S: PngSink>(
        &mut self,
        kind: Chunk,
        data: &[u8],
        sink: &mut S,
    ) -> Result<(), &'static str> {
        match kind {
            Chunk::Ihdr => {
                let header = PngHeader::parse(data)?;
                self.rows = Some(Rows::new(header)?);
                self.header = Some(header);
                info!(
                    "png: {}x{} depth {} colour {}{}",
                    header.width,
                    header.height,
                    header.bit_depth,
                    header.color_type,
                    if header.interlaced { " (Adam7)" } else { "" }
                );
                sink.on_init(header.width, header.height);
            }
            Chunk::Plte => self.palette.set_rgb(data),
            Chunk::Trns => match self.header {
                Some(h) if h.color_type == COLOR_PALETTE => self.palette.set_alpha(data),
                Some(h) => self.key = ColorKey::from_trns(h.color_type, data),
                None => {}
            },
            _ => {}
        }
        Ok(())
    }

    fn inflate<S: PngSink>(&mut self, mut input: &[u8], sink: &mut S) -> Result<(), &'static str> {
        if self.zlib_done {
            // bytes after the zlib stream end (padding); ignore
            return Ok(());
        }
        let Some(rows) = self.rows.as_mut() else {
            return Err("png: IDAT before IHDR");
        };

        let flags = inflate_flags::TINFL_FLAG_PARSE_ZLIB_HEADER
            | inflate_flags::TINFL_FLAG_HAS_MORE_INPUT;

        loop {
            let write_pos = self.dict_pos & (DICT_SIZE - 1);
            let (status, consumed, produced) =
                decompress(&mut *self.inflater, input, &mut self.dict, write_pos, flags);
            input = &input[consumed..];

            // feed decompressed bytes into the scanline accumulator
            let first = produced.min(DICT_SIZE - write_pos);
            rows.push(&self.dict[write_pos..write_pos + first], &self.palette, self.key, sink)?;
            if produced > first {
                rows.push(&self.dict[..produced - first], &self.palette, self.key, sink)?;
            }
            self.dict_pos += produced;

            match status {
                TINFLStatus::Done => {
                    self.zlib_done = true;
                    return Ok(());
                }
                TINFLStatus::NeedsMoreInput => return Ok(()),
                TINFLStatus::HasMoreOutput => {
                    // window full; circular buffer recycles automatically
                    if consumed == 0 && produced == 0 {
                        return Err("png: decompression stalled");
                    }
                }
                _ => return Err("png: IDAT decompression error"),
            }
        }
    }

    fn finish(&mut self) {
        let complete = self.rows.as_ref().is_some_and(|r| r.done);
        if !complete {
            warn!("png: IEND before all scanlines were decoded");
        }
    }
}

impl StreamingDecoder for PngDecoder {
    fn feed<S: PngSink>(&mut self, data: &[u8], sink: &mut S) -> Result<usize, &'static str> {
        PngDecoder::feed(self, data, sink)
    }
}

fn zeroed(len: usize, oom: &'static str) -> Result<Vec<u8>, &'static str> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| oom)?;
    v.resize(len, 0);
    Ok(v)
}
