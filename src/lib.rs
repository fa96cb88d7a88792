// TFT board setups and PNG blitting for ESP32 SPI displays

#![no_std]

extern crate alloc;

pub mod blit;
pub mod board;
pub mod display;
pub mod drivers;
pub mod fonts;
