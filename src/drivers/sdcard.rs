// SD card over SPI with FAT volume manager
// No RTC on board; timestamps are fixed to 2025-01-01.
//
// Files are opened through raw handles so an open file can be carried
// across calls. A path like "/img/sun.png" walks 8.3 directories from
// the root of the first volume.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use embedded_sdmmc::{
    Error, Mode, RawDirectory, RawFile, RawVolume, SdCard, SdCardError, TimeSource, Timestamp,
    VolumeIdx, VolumeManager,
};
use log::{info, warn};

use super::storage::FileSource;

#[derive(Default, Clone, Copy)]
pub struct DummyTimeSource;

impl TimeSource for DummyTimeSource {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 55,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

pub type SdError = Error<SdCardError>;

pub struct SdStorage<SPI, DL>
where
    SPI: SpiDevice,
    DL: DelayNs,
{
    pub volume_mgr: VolumeManager<SdCard<SPI, DL>, DummyTimeSource>,
}

// handles of one open file, released in reverse order
pub struct SdFile {
    volume: RawVolume,
    dir: RawDirectory,
    file: RawFile,
}

impl<SPI, DL> SdStorage<SPI, DL>
where
    SPI: SpiDevice,
    DL: DelayNs,
{
    pub fn new(spi: SPI, delay: DL) -> Self {
        let sdcard = SdCard::new(spi, delay);

        match sdcard.num_bytes() {
            Ok(bytes) => info!("SD card: {} bytes ({} MB)", bytes, bytes / 1024 / 1024),
            Err(e) => info!("SD card probe failed: {:?}", e),
        }

        let volume_mgr = VolumeManager::new(sdcard, DummyTimeSource);
        Self { volume_mgr }
    }

    /// Run `f` on the SPI device, e.g. to raise the clock after the
    /// card has been initialised at 400 kHz.
    pub fn reclock<F: FnOnce(&mut SPI)>(&self, f: F) {
        // device() must hand back the manager's time source type
        self.volume_mgr.device(|sd| {
            sd.spi(f);
            DummyTimeSource
        });
    }

    // walk to the file's directory and open it; on error nothing stays open
    fn open_in(&self, volume: RawVolume, path: &str) -> Result<(RawDirectory, RawFile), SdError> {
        let mut parts = path.split('/').filter(|p| !p.is_empty()).peekable();
        let mut dir = self.volume_mgr.open_root_dir(volume)?;

        loop {
            let Some(name) = parts.next() else {
                let _ = self.volume_mgr.close_dir(dir);
                return Err(Error::NotFound);
            };

            if parts.peek().is_none() {
                return match self.volume_mgr.open_file_in_dir(dir, name, Mode::ReadOnly) {
                    Ok(file) => Ok((dir, file)),
                    Err(e) => {
                        let _ = self.volume_mgr.close_dir(dir);
                        Err(e)
                    }
                };
            }

            let child = self.volume_mgr.open_dir(dir, name);
            let _ = self.volume_mgr.close_dir(dir);
            dir = child?;
        }
    }
}

impl<SPI, DL> FileSource for SdStorage<SPI, DL>
where
    SPI: SpiDevice,
    DL: DelayNs,
{
    type File = SdFile;
    type Error = SdError;

    fn open(&mut self, path: &str) -> Result<SdFile, SdError> {
        let volume = self.volume_mgr.open_raw_volume(VolumeIdx(0))?;
        match self.open_in(volume, path) {
            Ok((dir, file)) => Ok(SdFile { volume, dir, file }),
            Err(e) => {
                let _ = self.volume_mgr.close_volume(volume);
                Err(e)
            }
        }
    }

    fn read(&mut self, file: &mut SdFile, buf: &mut [u8]) -> Result<usize, SdError> {
        self.volume_mgr.read(file.file, buf)
    }

    fn close(&mut self, file: SdFile) {
        if let Err(e) = self.volume_mgr.close_file(file.file) {
            warn!("SD: close file failed: {:?}", e);
        }
        let _ = self.volume_mgr.close_dir(file.dir);
        let _ = self.volume_mgr.close_volume(file.volume);
    }
}
