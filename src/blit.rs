//! PNG file to display blitting.
//!
//! A file is streamed through a fixed buffer ([`Feeder`]) into a
//! [`StreamingDecoder`]; every decoded pixel goes through an
//! [`AlphaPolicy`] and lands on a [`PixelSurface`] at an origin offset.
//!
//! The decoder may consume less than it is fed. Unconsumed bytes are moved
//! to the front of the buffer and the next read appends after them, so no
//! byte is dropped or read twice. Once the file is open, the file, the
//! decoder and the display batch are released on every exit path.

use core::fmt;

use embedded_graphics_core::geometry::{Point, Size};
use embedded_graphics_core::pixelcolor::Rgb565;
use embedded_graphics_core::primitives::Rectangle;
use log::{debug, info, warn};
use smol_png::{MAX_LEFTOVER, PngDecoder, PngSink, StreamingDecoder};

use crate::display::{PixelSurface, color};
use crate::drivers::storage::FileSource;

pub const FEED_BUF_SIZE: usize = 1024;

// alpha strictly above this is drawn by the threshold policy
pub const ALPHA_CUTOFF: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlitError {
    /// File missing or unreadable, or no memory for the decoder.
    ResourceUnavailable(&'static str),
    /// The decoder rejected the stream. Pixels already drawn stay.
    StreamCorrupt(&'static str),
}

impl fmt::Display for BlitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlitError::ResourceUnavailable(why) => write!(f, "resource unavailable: {}", why),
            BlitError::StreamCorrupt(why) => write!(f, "corrupt stream: {}", why),
        }
    }
}

/// Byte accounting for one run of the feed loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    pub bytes_read: usize,
    pub bytes_consumed: usize,
    /// Bytes the decoder never took (trailing garbage, truncated chunk).
    pub leftover: usize,
    pub feeds: u32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlitStats {
    pub feed: FeedStats,
    /// Zero until the image header has been decoded.
    pub width: u32,
    pub height: u32,
    pub pixels_written: u32,
}

/// Decides what a decoded RGBA sample does to the surface.
pub trait AlphaPolicy {
    /// Called once with the image rectangle in screen coordinates.
    fn on_init<S: PixelSurface>(&mut self, _surface: &mut S, _area: Rectangle) {}

    /// Returns whether a pixel was written.
    fn plot<S: PixelSurface>(&mut self, surface: &mut S, at: Point, rgba: [u8; 4]) -> bool;
}

/// Hard cutoff: alpha > 128 is drawn opaque, anything else is skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct Threshold;

impl AlphaPolicy for Threshold {
    fn plot<S: PixelSurface>(&mut self, surface: &mut S, at: Point, rgba: [u8; 4]) -> bool {
        let [r, g, b, a] = rgba;
        if a <= ALPHA_CUTOFF {
            return false;
        }
        surface.write_pixel(at, color::pack(r, g, b));
        true
    }
}

/// Mixes partially transparent pixels with what is on screen. Needs a
/// surface that can read pixels back.
#[derive(Debug, Default, Clone, Copy)]
pub struct Blend;

impl AlphaPolicy for Blend {
    fn plot<S: PixelSurface>(&mut self, surface: &mut S, at: Point, rgba: [u8; 4]) -> bool {
        let [r, g, b, a] = rgba;
        match a {
            0 => false,
            255 => {
                surface.write_pixel(at, color::pack(r, g, b));
                true
            }
            _ => {
                let bg = color::unpack(surface.read_pixel(at));
                let [r, g, b] = color::blend([r, g, b], bg, a);
                surface.write_pixel(at, color::pack(r, g, b));
                true
            }
        }
    }
}

/// Fills the image rectangle with a solid color once the size is known,
/// then draws like [`Threshold`].
#[derive(Debug, Clone, Copy)]
pub struct Backdrop(pub Rgb565);

impl AlphaPolicy for Backdrop {
    fn on_init<S: PixelSurface>(&mut self, surface: &mut S, area: Rectangle) {
        surface.fill_rect(&area, self.0);
    }

    fn plot<S: PixelSurface>(&mut self, surface: &mut S, at: Point, rgba: [u8; 4]) -> bool {
        Threshold.plot(surface, at, rgba)
    }
}

// decoder callbacks -> surface
struct Plotter<'a, S, P> {
    surface: &'a mut S,
    origin: Point,
    policy: P,
    size: Size,
    written: u32,
}

impl<S: PixelSurface, P: AlphaPolicy> PngSink for Plotter<'_, S, P> {
    fn on_init(&mut self, width: u32, height: u32) {
        info!(
            "blit: {}x{} image at ({}, {})",
            width, height, self.origin.x, self.origin.y
        );
        self.size = Size::new(width, height);
        // cut off whatever lies past i32::MAX so the far corner stays representable
        let area = Rectangle::new(
            self.origin,
            Size::new(room(self.origin.x, width), room(self.origin.y, height)),
        );
        self.policy.on_init(&mut *self.surface, area);
    }

    // interlaced passes report a block size; only the pixel itself is drawn
    fn on_draw(&mut self, x: u32, y: u32, _w: u32, _h: u32, rgba: [u8; 4]) {
        // off-screen positions saturate and are left to the surface to clip
        let at = Point::new(
            self.origin.x.saturating_add(x as i32),
            self.origin.y.saturating_add(y as i32),
        );
        if self.policy.plot(&mut *self.surface, at, rgba) {
            self.written += 1;
        }
    }
}

fn room(start: i32, len: u32) -> u32 {
    let max = (i32::MAX as i64 - start as i64) as u32;
    len.min(max)
}

/// Fixed-size sliding window over the file. `N` must exceed the most the
/// decoder can leave unconsumed, or a full buffer could stall the loop.
pub struct Feeder<const N: usize> {
    buf: [u8; N],
    chunk: usize,
}

impl<const N: usize> Feeder<N> {
    const FITS: () = assert!(
        N > MAX_LEFTOVER,
        "feed buffer must be larger than smol_png::MAX_LEFTOVER"
    );

    pub const fn new() -> Self {
        let () = Self::FITS;
        Self { buf: [0; N], chunk: N }
    }

    /// Cap every file read at `chunk` bytes (clamped to 1..=N).
    pub const fn with_chunk(chunk: usize) -> Self {
        let mut feeder = Self::new();
        feeder.chunk = if chunk == 0 {
            1
        } else if chunk > N {
            N
        } else {
            chunk
        };
        feeder
    }

    pub fn run<F, D, K>(
        &mut self,
        fs: &mut F,
        file: &mut F::File,
        decoder: &mut D,
        sink: &mut K,
    ) -> Result<FeedStats, BlitError>
    where
        F: FileSource,
        D: StreamingDecoder,
        K: PngSink,
    {
        let mut stats = FeedStats::default();
        let mut remain = 0usize;

        loop {
            let want = self.chunk.min(N - remain);
            if want == 0 {
                warn!("blit: decoder stalled with {} bytes buffered", remain);
                return Err(BlitError::StreamCorrupt("decoder stalled on a full buffer"));
            }

            let got = fs.read(file, &mut self.buf[remain..remain + want]).map_err(|e| {
                warn!("blit: read failed: {:?}", e);
                BlitError::ResourceUnavailable("file read failed")
            })?;
            if got == 0 {
                break;
            }
            stats.bytes_read += got;

            let avail = remain + got;
            let fed = decoder.feed(&self.buf[..avail], sink).map_err(|e| {
                warn!("blit: decode aborted after {} bytes: {}", stats.bytes_consumed, e);
                BlitError::StreamCorrupt(e)
            })?;
            if fed > avail {
                warn!("blit: decoder claimed {} of {} bytes", fed, avail);
                return Err(BlitError::StreamCorrupt("decoder consumed more than it was fed"));
            }
            stats.feeds += 1;
            stats.bytes_consumed += fed;

            remain = avail - fed;
            if remain > 0 {
                self.buf.copy_within(fed..avail, 0);
            }
            debug!("blit: read {} fed {} consumed {} remain {}", got, avail, fed, remain);
        }

        stats.leftover = remain;
        Ok(stats)
    }
}

impl<const N: usize> Default for Feeder<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode `path` onto `surface` with its top-left corner at `origin`.
///
/// `make_decoder` runs after the file is open; if it fails the file is
/// closed and no batch is started.
pub fn blit_png<F, S, D, P, const N: usize>(
    fs: &mut F,
    surface: &mut S,
    path: &str,
    origin: Point,
    policy: P,
    feeder: &mut Feeder<N>,
    make_decoder: impl FnOnce() -> Result<D, &'static str>,
) -> Result<BlitStats, BlitError>
where
    F: FileSource,
    S: PixelSurface,
    D: StreamingDecoder,
    P: AlphaPolicy,
{
    let mut file = fs.open(path).map_err(|e| {
        warn!("blit: cannot open {}: {:?}", path, e);
        BlitError::ResourceUnavailable("file open failed")
    })?;

    let mut decoder = match make_decoder() {
        Ok(d) => d,
        Err(e) => {
            warn!("blit: no decoder for {}: {}", path, e);
            fs.close(file);
            return Err(BlitError::ResourceUnavailable(e));
        }
    };

    surface.begin_batch();
    let mut plotter = Plotter {
        surface: &mut *surface,
        origin,
        policy,
        size: Size::zero(),
        written: 0,
    };
    let fed = feeder.run(fs, &mut file, &mut decoder, &mut plotter);
    let (size, written) = (plotter.size, plotter.written);
    surface.end_batch();

    drop(decoder);
    fs.close(file);

    let feed = fed?;
    if feed.leftover > 0 {
        debug!("blit: {} trailing bytes not consumed", feed.leftover);
    }
    Ok(BlitStats {
        feed,
        width: size.width,
        height: size.height,
        pixels_written: written,
    })
}

/// Threshold policy with the default buffer and decoder.
pub fn draw_png<F, S>(fs: &mut F, surface: &mut S, path: &str, x: i32, y: i32) -> Result<BlitStats, BlitError>
where
    F: FileSource,
    S: PixelSurface,
{
    let mut feeder = Feeder::<FEED_BUF_SIZE>::new();
    blit_png(fs, surface, path, Point::new(x, y), Threshold, &mut feeder, PngDecoder::new)
}

/// Alpha blending against the current screen contents.
pub fn draw_png_blended<F, S>(
    fs: &mut F,
    surface: &mut S,
    path: &str,
    x: i32,
    y: i32,
) -> Result<BlitStats, BlitError>
where
    F: FileSource,
    S: PixelSurface,
{
    let mut feeder = Feeder::<FEED_BUF_SIZE>::new();
    blit_png(fs, surface, path, Point::new(x, y), Blend, &mut feeder, PngDecoder::new)
}

/// Solid `bg` under the image, then threshold drawing.
pub fn draw_png_on_background<F, S>(
    fs: &mut F,
    surface: &mut S,
    path: &str,
    x: i32,
    y: i32,
    bg: Rgb565,
) -> Result<BlitStats, BlitError>
where
    F: FileSource,
    S: PixelSurface,
{
    let mut feeder = Feeder::<FEED_BUF_SIZE>::new();
    blit_png(fs, surface, path, Point::new(x, y), Backdrop(bg), &mut feeder, PngDecoder::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::rc::Rc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};
    use embedded_graphics_core::pixelcolor::RgbColor;
    use smol_png::encode::rgba8;

    const RED: [u8; 4] = [255, 0, 0, 255];

    // in-memory files with open/close/read accounting
    struct MemFs<'a> {
        files: &'a [(&'a str, &'a [u8])],
        max_read: usize,
        fail_read_at: Option<u32>,
        opens: u32,
        closes: u32,
        reads: u32,
    }

    struct MemFile<'a> {
        data: &'a [u8],
        pos: usize,
    }

    impl<'a> MemFs<'a> {
        fn new(files: &'a [(&'a str, &'a [u8])], max_read: usize) -> Self {
            Self {
                files,
                max_read,
                fail_read_at: None,
                opens: 0,
                closes: 0,
                reads: 0,
            }
        }
    }

    impl<'a> FileSource for MemFs<'a> {
        type File = MemFile<'a>;
        type Error = &'static str;

        fn open(&mut self, path: &str) -> Result<MemFile<'a>, &'static str> {
            let data = self
                .files
                .iter()
                .find(|(p, _)| *p == path)
                .map(|(_, d)| *d)
                .ok_or("not found")?;
            self.opens += 1;
            Ok(MemFile { data, pos: 0 })
        }

        fn read(&mut self, file: &mut MemFile<'a>, buf: &mut [u8]) -> Result<usize, &'static str> {
            if self.fail_read_at == Some(self.reads) {
                return Err("card removed");
            }
            self.reads += 1;
            let n = buf.len().min(self.max_read).min(file.data.len() - file.pos);
            buf[..n].copy_from_slice(&file.data[file.pos..file.pos + n]);
            file.pos += n;
            Ok(n)
        }

        fn close(&mut self, _file: MemFile<'a>) {
            self.closes += 1;
        }
    }

    #[derive(Default)]
    struct Screen {
        pixels: BTreeMap<(i32, i32), Rgb565>,
        writes: Vec<(Point, Rgb565)>,
        reads: Vec<Point>,
        begins: u32,
        ends: u32,
        in_batch: bool,
        outside_batch: u32,
    }

    impl PixelSurface for Screen {
        fn begin_batch(&mut self) {
            self.begins += 1;
            self.in_batch = true;
        }

        fn end_batch(&mut self) {
            self.ends += 1;
            self.in_batch = false;
        }

        fn write_pixel(&mut self, at: Point, c: Rgb565) {
            if !self.in_batch {
                self.outside_batch += 1;
            }
            self.writes.push((at, c));
            self.pixels.insert((at.x, at.y), c);
        }

        fn read_pixel(&mut self, at: Point) -> Rgb565 {
            self.reads.push(at);
            self.pixels.get(&(at.x, at.y)).copied().unwrap_or(Rgb565::BLACK)
        }
    }

    // decoder stand-in: records every feed and consumes per script
    struct Scripted {
        script: Vec<Result<usize, &'static str>>,
        hold_back: usize,
        draw_on_first_feed: bool,
        seen: Rc<RefCell<Vec<Vec<u8>>>>,
        drops: Rc<Cell<u32>>,
    }

    impl Scripted {
        fn new(script: Vec<Result<usize, &'static str>>) -> Self {
            Self {
                script,
                hold_back: 0,
                draw_on_first_feed: false,
                seen: Rc::new(RefCell::new(Vec::new())),
                drops: Rc::new(Cell::new(0)),
            }
        }
    }

    impl StreamingDecoder for Scripted {
        fn feed<K: PngSink>(&mut self, data: &[u8], sink: &mut K) -> Result<usize, &'static str> {
            let first = self.seen.borrow().is_empty();
            self.seen.borrow_mut().push(data.to_vec());
            if first && self.draw_on_first_feed {
                sink.on_init(1, 1);
                sink.on_draw(0, 0, 1, 1, [255, 255, 255, 255]);
            }
            if self.script.is_empty() {
                Ok(data.len().saturating_sub(self.hold_back))
            } else {
                self.script.remove(0)
            }
        }
    }

    impl Drop for Scripted {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    #[test]
    fn red_square_lands_at_origin() {
        let png = rgba8(2, 2, &[RED; 4]);
        let files = [("/red.png", png.as_slice())];
        let mut fs = MemFs::new(&files, 7);
        let mut screen = Screen::default();

        let stats = draw_png(&mut fs, &mut screen, "/red.png", 10, 20).unwrap();

        let red = color::pack(255, 0, 0);
        assert_eq!(
            screen.writes,
            vec![
                (Point::new(10, 20), red),
                (Point::new(11, 20), red),
                (Point::new(10, 21), red),
                (Point::new(11, 21), red),
            ]
        );
        assert_eq!((stats.width, stats.height, stats.pixels_written), (2, 2, 4));
        assert_eq!((screen.begins, screen.ends, screen.outside_batch), (1, 1, 0));
        assert_eq!((fs.opens, fs.closes), (1, 1));
        assert_eq!(stats.feed.bytes_read, png.len());
        assert_eq!(stats.feed.leftover, 0);
    }

    #[test]
    fn threshold_is_strictly_above_128() {
        let png = rgba8(3, 1, &[[1, 2, 3, 128], [40, 50, 60, 129], [7, 8, 9, 0]]);
        let files = [("a.png", png.as_slice())];
        let mut fs = MemFs::new(&files, usize::MAX);
        let mut screen = Screen::default();

        draw_png(&mut fs, &mut screen, "a.png", 0, 0).unwrap();

        assert_eq!(screen.writes, vec![(Point::new(1, 0), color::pack(40, 50, 60))]);
        assert!(screen.reads.is_empty());
    }

    #[test]
    fn blend_reads_only_partial_alpha() {
        let png = rgba8(3, 1, &[[255, 0, 0, 0], RED, [255, 0, 0, 127]]);
        let files = [("b.png", png.as_slice())];
        let mut fs = MemFs::new(&files, usize::MAX);
        let mut screen = Screen::default();
        screen.pixels.insert((0, 0), Rgb565::GREEN);
        screen.pixels.insert((1, 0), Rgb565::GREEN);
        screen.pixels.insert((2, 0), color::pack(0, 0, 255));

        let stats = draw_png_blended(&mut fs, &mut screen, "b.png", 0, 0).unwrap();

        assert_eq!(screen.reads, vec![Point::new(2, 0)]);
        assert_eq!(
            screen.writes,
            vec![
                (Point::new(1, 0), color::pack(255, 0, 0)),
                (Point::new(2, 0), color::pack(127, 0, 124)),
            ]
        );
        assert_eq!(screen.pixels[&(0, 0)], Rgb565::GREEN);
        assert_eq!(stats.pixels_written, 2);
    }

    #[test]
    fn backdrop_fills_then_thresholds() {
        let png = rgba8(2, 1, &[[0, 0, 0, 0], RED]);
        let files = [("c.png", png.as_slice())];
        let mut fs = MemFs::new(&files, usize::MAX);
        let mut screen = Screen::default();

        draw_png_on_background(&mut fs, &mut screen, "c.png", 5, 5, Rgb565::BLUE).unwrap();

        assert_eq!(
            screen.writes,
            vec![
                (Point::new(5, 5), Rgb565::BLUE),
                (Point::new(6, 5), Rgb565::BLUE),
                (Point::new(6, 5), color::pack(255, 0, 0)),
            ]
        );
        assert_eq!(screen.outside_batch, 0);
    }

    #[test]
    fn missing_file_touches_nothing() {
        let mut fs = MemFs::new(&[], 64);
        let mut screen = Screen::default();
        let made = Cell::new(false);

        let err = blit_png(
            &mut fs,
            &mut screen,
            "/nope.png",
            Point::zero(),
            Threshold,
            &mut Feeder::<FEED_BUF_SIZE>::new(),
            || {
                made.set(true);
                PngDecoder::new()
            },
        )
        .unwrap_err();

        assert!(matches!(err, BlitError::ResourceUnavailable(_)));
        assert!(!made.get());
        assert_eq!((screen.begins, screen.ends), (0, 0));
        assert_eq!(fs.closes, 0);
    }

    #[test]
    fn decoder_allocation_failure_closes_file() {
        let png = rgba8(1, 1, &[RED]);
        let files = [("d.png", png.as_slice())];
        let mut fs = MemFs::new(&files, 64);
        let mut screen = Screen::default();

        let err = blit_png(
            &mut fs,
            &mut screen,
            "d.png",
            Point::zero(),
            Threshold,
            &mut Feeder::<FEED_BUF_SIZE>::new(),
            || Err::<PngDecoder, _>("png: out of memory"),
        )
        .unwrap_err();

        assert_eq!(err, BlitError::ResourceUnavailable("png: out of memory"));
        assert_eq!((fs.opens, fs.closes, fs.reads), (1, 1, 0));
        assert_eq!(screen.begins, 0);
        assert!(screen.writes.is_empty());
    }

    #[test]
    fn corrupt_stream_keeps_drawn_pixels_and_releases_everything() {
        let data = [0u8; 40];
        let files = [("e.png", &data[..])];
        let mut fs = MemFs::new(&files, 16);
        let mut screen = Screen::default();

        let mut dec = Scripted::new(vec![Ok(16), Err("png: inflate failed")]);
        dec.draw_on_first_feed = true;
        let drops = dec.drops.clone();

        let err = blit_png(
            &mut fs,
            &mut screen,
            "e.png",
            Point::new(3, 4),
            Threshold,
            &mut Feeder::<FEED_BUF_SIZE>::new(),
            move || Ok(dec),
        )
        .unwrap_err();

        assert_eq!(err, BlitError::StreamCorrupt("png: inflate failed"));
        assert_eq!(screen.writes, vec![(Point::new(3, 4), Rgb565::WHITE)]);
        assert_eq!((screen.begins, screen.ends), (1, 1));
        assert_eq!(fs.closes, 1);
        assert_eq!(drops.get(), 1);
        // no further reads after the failed feed
        assert_eq!(fs.reads, 2);
    }

    #[test]
    fn unconsumed_tail_is_fed_again_before_new_bytes() {
        let data: Vec<u8> = (0..10).collect();
        let files = [("f", data.as_slice())];
        let mut fs = MemFs::new(&files, 5);
        let mut screen = Screen::default();

        let dec = Scripted::new(vec![Ok(3)]);
        let seen = dec.seen.clone();

        let stats = blit_png(
            &mut fs,
            &mut screen,
            "f",
            Point::zero(),
            Threshold,
            &mut Feeder::<FEED_BUF_SIZE>::new(),
            move || Ok(dec),
        )
        .unwrap();

        let seen = seen.borrow();
        assert_eq!(seen[0], vec![0, 1, 2, 3, 4]);
        assert_eq!(seen[1], vec![3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(seen.len(), 2);
        assert_eq!(stats.feed.bytes_read, 10);
        assert_eq!(stats.feed.bytes_consumed, 10);
        assert_eq!(stats.feed.feeds, 2);
    }

    #[test]
    fn every_byte_is_read_once() {
        let data: Vec<u8> = (0..37).collect();
        let files = [("g", data.as_slice())];
        let mut fs = MemFs::new(&files, 8);
        let mut screen = Screen::default();

        let mut dec = Scripted::new(Vec::new());
        dec.hold_back = 2;
        let seen = dec.seen.clone();

        let stats = blit_png(
            &mut fs,
            &mut screen,
            "g",
            Point::zero(),
            Threshold,
            &mut Feeder::<FEED_BUF_SIZE>::new(),
            move || Ok(dec),
        )
        .unwrap();

        let f = stats.feed;
        assert_eq!(f.bytes_read, 37);
        assert_eq!(f.bytes_read, f.bytes_consumed + f.leftover);
        assert_eq!(f.leftover, 2);

        // consumed prefixes concatenate back to the file
        let seen = seen.borrow();
        let mut stream = Vec::new();
        for chunk in seen.iter() {
            stream.extend_from_slice(&chunk[..chunk.len() - 2]);
        }
        stream.extend_from_slice(&seen.last().unwrap()[seen.last().unwrap().len() - 2..]);
        assert_eq!(stream, data);
    }

    #[test]
    fn chunk_size_does_not_change_the_picture() {
        let mut pixels = Vec::new();
        for i in 0..(13 * 7) {
            let v = (i * 37 % 256) as u8;
            pixels.push([v, 255 - v, v / 2, if i % 5 == 0 { 0 } else { 255 }]);
        }
        let png = rgba8(13, 7, &pixels);
        let files = [("h.png", png.as_slice())];

        let draw = |chunk: usize| {
            let mut fs = MemFs::new(&files, usize::MAX);
            let mut screen = Screen::default();
            let mut feeder = Feeder::<FEED_BUF_SIZE>::with_chunk(chunk);
            let stats = blit_png(
                &mut fs,
                &mut screen,
                "h.png",
                Point::new(-3, 2),
                Threshold,
                &mut feeder,
                PngDecoder::new,
            )
            .unwrap();
            assert_eq!(stats.feed.bytes_read, png.len());
            screen.writes
        };

        let whole = draw(FEED_BUF_SIZE);
        assert_eq!(whole.len(), pixels.iter().filter(|p| p[3] == 255).count());
        for chunk in [1, 2, 17, 100] {
            assert_eq!(draw(chunk), whole, "chunk {}", chunk);
        }
    }

    #[test]
    fn decoder_that_never_consumes_is_reported() {
        let data = vec![0u8; 4096];
        let files = [("i", data.as_slice())];
        let mut fs = MemFs::new(&files, usize::MAX);
        let mut screen = Screen::default();

        let mut dec = Scripted::new(Vec::new());
        dec.hold_back = usize::MAX;

        let err = blit_png(
            &mut fs,
            &mut screen,
            "i",
            Point::zero(),
            Threshold,
            &mut Feeder::<{ MAX_LEFTOVER + 1 }>::new(),
            move || Ok(dec),
        )
        .unwrap_err();

        assert!(matches!(err, BlitError::StreamCorrupt(_)));
        assert_eq!(fs.closes, 1);
        assert_eq!(screen.ends, 1);
    }

    #[test]
    fn read_error_mid_stream_releases_everything() {
        let png = rgba8(4, 4, &[RED; 16]);
        let files = [("j.png", png.as_slice())];
        let mut fs = MemFs::new(&files, 10);
        fs.fail_read_at = Some(2);
        let mut screen = Screen::default();

        let err = draw_png(&mut fs, &mut screen, "j.png", 0, 0).unwrap_err();

        assert!(matches!(err, BlitError::ResourceUnavailable(_)));
        assert_eq!((screen.begins, screen.ends), (1, 1));
        assert_eq!(fs.closes, 1);
    }

    #[test]
    fn overclaiming_decoder_is_corrupt() {
        let data = [1u8; 8];
        let files = [("k", &data[..])];
        let mut fs = MemFs::new(&files, usize::MAX);
        let mut screen = Screen::default();

        let err = blit_png(
            &mut fs,
            &mut screen,
            "k",
            Point::zero(),
            Threshold,
            &mut Feeder::<FEED_BUF_SIZE>::new(),
            || Ok(Scripted::new(vec![Ok(9)])),
        )
        .unwrap_err();

        assert!(matches!(err, BlitError::StreamCorrupt(_)));
    }

    #[test]
    fn oversized_header_is_corrupt_not_a_crash() {
        let mut png = smol_png::stream::PNG_SIG.to_vec();
        let mut ihdr = Vec::new();
        ihdr.extend_from_slice(&4u32.to_be_bytes());
        ihdr.extend_from_slice(&0xFFFF_FFF0u32.to_be_bytes());
        ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);
        smol_png::encode::write_chunk(&mut png, b"IHDR", &ihdr);
        let files = [("x.png", png.as_slice())];
        let mut fs = MemFs::new(&files, usize::MAX);
        let mut screen = Screen::default();

        let err = draw_png_on_background(&mut fs, &mut screen, "x.png", 40, 80, Rgb565::BLUE)
            .unwrap_err();

        assert_eq!(err, BlitError::StreamCorrupt("png: dimensions out of range"));
        assert!(screen.writes.is_empty());
        assert_eq!((screen.begins, screen.ends), (1, 1));
        assert_eq!(fs.closes, 1);
    }

    #[test]
    fn origin_near_i32_max_saturates() {
        let png = rgba8(2, 1, &[RED; 2]);
        let files = [("a.png", png.as_slice())];
        let red = color::pack(255, 0, 0);

        let mut fs = MemFs::new(&files, usize::MAX);
        let mut screen = Screen::default();
        let stats = draw_png(&mut fs, &mut screen, "a.png", i32::MAX, 0).unwrap();
        assert_eq!(stats.pixels_written, 2);
        assert!(screen.writes.iter().all(|(at, _)| *at == Point::new(i32::MAX, 0)));

        // backdrop only covers the column that fits
        let mut fs = MemFs::new(&files, usize::MAX);
        let mut screen = Screen::default();
        draw_png_on_background(&mut fs, &mut screen, "a.png", i32::MAX - 1, 0, Rgb565::BLUE)
            .unwrap();
        assert_eq!(
            screen.writes,
            vec![
                (Point::new(i32::MAX - 1, 0), Rgb565::BLUE),
                (Point::new(i32::MAX - 1, 0), red),
                (Point::new(i32::MAX, 0), red),
            ]
        );
    }
}
