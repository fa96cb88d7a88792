//! Board setups
//!
//! Maps each supported board's TFT wiring to a named [`DisplaySetup`].
//! All pin numbers, SPI clocks and loaded fonts live here; the firmware
//! picks one setup (by cargo feature) and never needs its own GPIO table.
//!
//! Setups are plain constant data. [`DisplaySetup::check`] validates one
//! against the ESP32's GPIO rules before any pin is touched.

pub mod esp32_3248s035;
pub mod osoyoo_rpi35;

use core::fmt;

use crate::fonts::FontSet;

// GPIO 34..=39 on the ESP32 have no output driver
const INPUT_ONLY: core::ops::RangeInclusive<u8> = 34..=39;
const MAX_GPIO: u8 = 39;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Controller {
    /// ILI9488, 18-bit pixels over SPI
    Ili9488,
    /// ILI9486 behind a RPi-style 16-bit shift register
    Ili9486Rpi,
}

impl Controller {
    pub fn name(self) -> &'static str {
        match self {
            Controller::Ili9488 => "ILI9488",
            Controller::Ili9486Rpi => "ILI9486 (RPi)",
        }
    }

    // the RPi shift register has no read path back to the panel
    pub fn can_read_gram(self) -> bool {
        matches!(self, Controller::Ili9488)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiPort {
    Hspi,
    Vspi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TftPins {
    pub miso: Option<u8>,
    pub mosi: u8,
    pub sclk: u8,
    pub cs: u8,
    pub dc: u8,
    /// None: RST tied to the board reset line
    pub rst: Option<u8>,
    pub bl: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchSetup {
    pub cs: u8,
    pub irq: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySetup {
    pub id: u16,
    pub info: &'static str,
    pub controller: Controller,
    pub port: SpiPort,
    pub pins: TftPins,
    pub backlight_on: Level,
    pub touch: Option<TouchSetup>,
    pub fonts: FontSet,
    pub spi_freq_hz: u32,
    pub spi_read_freq_hz: u32,
    pub spi_touch_freq_hz: u32,
    /// Bus is shared (touch, SD) and must be claimed per transaction.
    pub transactions: bool,
}

pub const ALL: [&DisplaySetup; 2] = [&esp32_3248s035::SETUP, &osoyoo_rpi35::SETUP];

pub fn by_id(id: u16) -> Option<&'static DisplaySetup> {
    ALL.iter().copied().find(|s| s.id == id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupError {
    NoSuchPin(u8),
    DuplicatePin(u8),
    InputOnlyPin(u8),
    ZeroClock,
    ReadClockTooFast,
    TouchWithoutMiso,
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::NoSuchPin(p) => write!(f, "GPIO{} does not exist", p),
            SetupError::DuplicatePin(p) => write!(f, "GPIO{} assigned twice", p),
            SetupError::InputOnlyPin(p) => write!(f, "GPIO{} is input-only", p),
            SetupError::ZeroClock => f.write_str("SPI write clock is zero"),
            SetupError::ReadClockTooFast => f.write_str("SPI read clock exceeds write clock"),
            SetupError::TouchWithoutMiso => f.write_str("touch controller needs MISO"),
        }
    }
}

impl DisplaySetup {
    // pins the MCU drives
    fn outputs(&self) -> [Option<u8>; 7] {
        let p = &self.pins;
        [
            Some(p.mosi),
            Some(p.sclk),
            Some(p.cs),
            Some(p.dc),
            p.rst,
            p.bl,
            self.touch.map(|t| t.cs),
        ]
    }

    fn inputs(&self) -> [Option<u8>; 2] {
        [self.pins.miso, self.touch.and_then(|t| t.irq)]
    }

    pub fn check(&self) -> Result<(), SetupError> {
        let mut seen: u64 = 0;
        for pin in self.outputs().into_iter().chain(self.inputs()).flatten() {
            if pin > MAX_GPIO {
                return Err(SetupError::NoSuchPin(pin));
            }
            if seen & (1 << pin) != 0 {
                return Err(SetupError::DuplicatePin(pin));
            }
            seen |= 1 << pin;
        }

        if let Some(pin) = self.outputs().into_iter().flatten().find(|p| INPUT_ONLY.contains(p)) {
            return Err(SetupError::InputOnlyPin(pin));
        }
        if self.spi_freq_hz == 0 || self.spi_touch_freq_hz == 0 {
            return Err(SetupError::ZeroClock);
        }
        if self.spi_read_freq_hz > self.spi_freq_hz {
            return Err(SetupError::ReadClockTooFast);
        }
        if self.touch.is_some() && self.pins.miso.is_none() {
            return Err(SetupError::TouchWithoutMiso);
        }
        Ok(())
    }

    // alpha blending needs to read pixels back from the panel
    pub fn supports_readback(&self) -> bool {
        self.controller.can_read_gram() && self.pins.miso.is_some()
    }
}
