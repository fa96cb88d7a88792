//! ESP32-3248S035R ("Cheap Yellow Display" 3.5")
//!
//! GPIO |     Function    |      Notes
//! -----+-----------------+----------------------------------
//!  2   | TFT DC          | Data/Command select
//! 12   | HSPI MISO       | Panel readback
//! 13   | HSPI MOSI       |
//! 14   | HSPI SCLK       |
//! 15   | TFT CS          |
//! 27   | TFT BL          | Backlight, active high
//! 33   | Touch CS        | XPT2046 on the same HSPI bus
//! 36   | Touch IRQ       | Input-only pin
//!  -   | TFT RST         | Tied to the EN line
//!
//! The SD slot sits on VSPI (SCK 18, MOSI 23, MISO 19, CS 5).

use super::{Controller, DisplaySetup, Level, SpiPort, TftPins, TouchSetup};
use crate::fonts::{FontId, FontSet};

pub const TFT_MISO: u8 = 12;
pub const TFT_MOSI: u8 = 13;
pub const TFT_SCLK: u8 = 14;
pub const TFT_CS: u8 = 15;
pub const TFT_DC: u8 = 2;
pub const TFT_BL: u8 = 27;

pub const TOUCH_CS: u8 = 33;
pub const TOUCH_IRQ: u8 = 36;

// ----- SD card (VSPI) -----
pub const SD_SCK: u8 = 18;
pub const SD_MOSI: u8 = 23;
pub const SD_MISO: u8 = 19;
pub const SD_CS: u8 = 5;

pub const SETUP: DisplaySetup = DisplaySetup {
    id: 666,
    info: "ESP32_3248S035R_ST7796_XPT2046",
    controller: Controller::Ili9488,
    port: SpiPort::Hspi,
    pins: TftPins {
        miso: Some(TFT_MISO),
        mosi: TFT_MOSI,
        sclk: TFT_SCLK,
        cs: TFT_CS,
        dc: TFT_DC,
        rst: None,
        bl: Some(TFT_BL),
    },
    backlight_on: Level::High,
    touch: Some(TouchSetup {
        cs: TOUCH_CS,
        irq: Some(TOUCH_IRQ),
    }),
    fonts: FontSet::NONE
        .with(FontId::Glcd)
        .with(FontId::Font2)
        .with(FontId::Font4)
        .with(FontId::Font6)
        .with(FontId::Font7)
        .with(FontId::Font8)
        .with_free_fonts()
        .with_smooth(),
    spi_freq_hz: 40_000_000,
    spi_read_freq_hz: 20_000_000,
    spi_touch_freq_hz: 2_500_000,
    transactions: true,
};
