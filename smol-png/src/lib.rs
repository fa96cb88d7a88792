// smol-png: minimal no_std PNG decoder fed in arbitrary slices.
// header: IHDR parsing, colour type / bit depth rules, Adam7 pass geometry
// filter: scanline reconstruction (None/Sub/Up/Average/Paeth)
// pixel:  scanline sample -> RGBA8, palette and tRNS handling
// stream: chunk state machine + streaming inflate, emits PngSink events
// encode: tiny PNG writer for fixtures (feature "encoder")

#![no_std]

extern crate alloc;

mod filter;
pub mod header;
mod pixel;
pub mod stream;

#[cfg(any(test, feature = "encoder"))]
pub mod encode;

pub use header::PngHeader;
pub use stream::{MAX_LEFTOVER, PngDecoder, PngSink, StreamingDecoder};
