// Read-only file access for the image pipeline.
// FileSource is the seam between the blitter and whatever holds the bytes:
// the SD card (sdcard.rs) or image tables compiled into flash (FlashFs).

use core::fmt::Debug;

pub trait FileSource {
    type File;
    type Error: Debug;

    fn open(&mut self, path: &str) -> Result<Self::File, Self::Error>;

    // 0 = end of file
    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> Result<usize, Self::Error>;

    fn close(&mut self, file: Self::File);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashError {
    NotFound,
}

#[derive(Clone, Copy)]
pub struct FlashFile<'a> {
    pub path: &'a str,
    pub data: &'a [u8],
}

impl<'a> FlashFile<'a> {
    pub const fn new(path: &'a str, data: &'a [u8]) -> Self {
        Self { path, data }
    }
}

pub struct FlashCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

// Files baked into the firmware image, e.g. via include_bytes!.
pub struct FlashFs<'a> {
    files: &'a [FlashFile<'a>],
}

impl<'a> FlashFs<'a> {
    pub const fn new(files: &'a [FlashFile<'a>]) -> Self {
        Self { files }
    }
}

fn strip_root(path: &str) -> &str {
    path.trim_start_matches('/')
}

impl<'a> FileSource for FlashFs<'a> {
    type File = FlashCursor<'a>;
    type Error = FlashError;

    fn open(&mut self, path: &str) -> Result<FlashCursor<'a>, FlashError> {
        let want = strip_root(path);
        self.files
            .iter()
            .find(|f| strip_root(f.path) == want)
            .map(|f| FlashCursor { data: f.data, pos: 0 })
            .ok_or(FlashError::NotFound)
    }

    fn read(&mut self, file: &mut FlashCursor<'a>, buf: &mut [u8]) -> Result<usize, FlashError> {
        let rest = &file.data[file.pos..];
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        file.pos += n;
        Ok(n)
    }

    fn close(&mut self, _file: FlashCursor<'a>) {}
}
