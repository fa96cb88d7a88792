//! OSOYOO 3.5" RPi display wired to an ESP32 devkit
//!
//! GPIO |     Function    |      Notes
//! -----+-----------------+----------------------------------
//!  2   | TFT DC          | Data/Command select
//!  4   | TFT RST         | Reset (active low)
//! 15   | TFT CS          |
//! 18   | VSPI SCLK       |
//! 19   | VSPI MISO       | Wired, but the shift register can't read GRAM
//! 23   | VSPI MOSI       |
//!
//! The panel's backlight is always on and its touch controller is unused.

use super::{Controller, DisplaySetup, Level, SpiPort, TftPins};
use crate::fonts::{FontId, FontSet};

pub const TFT_MISO: u8 = 19;
pub const TFT_MOSI: u8 = 23;
pub const TFT_SCLK: u8 = 18;
pub const TFT_CS: u8 = 15;
pub const TFT_DC: u8 = 2;
pub const TFT_RST: u8 = 4;

pub const SETUP: DisplaySetup = DisplaySetup {
    id: 667,
    info: "OSOYOO 3.5in RPi ILI9486 320x480, 16-bit shift register",
    controller: Controller::Ili9486Rpi,
    port: SpiPort::Vspi,
    pins: TftPins {
        miso: Some(TFT_MISO),
        mosi: TFT_MOSI,
        sclk: TFT_SCLK,
        cs: TFT_CS,
        dc: TFT_DC,
        rst: Some(TFT_RST),
        bl: None,
    },
    backlight_on: Level::High,
    touch: None,
    fonts: FontSet::NONE
        .with(FontId::Glcd)
        .with(FontId::Font2)
        .with(FontId::Font4)
        .with(FontId::Font6)
        .with(FontId::Font7)
        .with(FontId::Font8)
        .with_free_fonts()
        .with_smooth(),
    spi_freq_hz: 27_000_000,
    spi_read_freq_hz: 20_000_000,
    spi_touch_freq_hz: 2_500_000,
    transactions: false,
};
