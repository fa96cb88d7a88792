// tft-weather firmware entry point
//
// Boot: logger -> clocks -> heap -> board wiring -> panel init.
// Then a static weather screen: labels through the font table and PNG
// icons streamed from flash (and from the SD card where the board has one).
// Boards without GRAM readback get a solid backdrop instead of blending.

#![no_std]
#![no_main]

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use log::{info, warn};

use tft_weather::blit::{self, BlitError, BlitStats};
use tft_weather::display::color;
use tft_weather::drivers::ili948x::Rotation;
use tft_weather::drivers::storage::{FlashFile, FlashFs};
use tft_weather::fonts::{self, FontId};

mod board;

esp_bootloader_esp_idf::esp_app_desc!();

// inflate state + 32 KiB window + two scanlines, with room to spare
const HEAP_SIZE: usize = 96 * 1024;

static ICONS: [FlashFile<'static>; 2] = [
    FlashFile::new("/sun.png", include_bytes!("../assets/sun.png")),
    FlashFile::new("/cloud.png", include_bytes!("../assets/cloud.png")),
];

const SKY: Rgb565 = color::pack(0x20, 0x40, 0x80);

#[esp_hal::main]
fn main() -> ! {
    esp_println::logger::init_logger_from_env();
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);
    esp_alloc::heap_allocator!(size: HEAP_SIZE);

    let setup = board::SETUP;
    info!("board {}: {} ({})", setup.id, setup.info, setup.controller.name());
    if let Err(e) = setup.check() {
        panic!("board setup rejected: {}", e);
    }
    info!("fonts: {} bytes of glyph tables", setup.fonts.flash_bytes());

    let mut hw = board::init(peripherals);
    let mut delay = Delay::new();

    hw.tft.init(&mut delay);
    hw.tft.set_rotation(Rotation::Deg0);
    let _ = hw.tft.clear(SKY);
    hw.backlight_on();

    let _ = fonts::draw_label(
        &mut hw.tft,
        &setup.fonts,
        FontId::Font4,
        "Weather",
        Point::new(10, 10),
        Rgb565::WHITE,
    );
    let _ = fonts::draw_label(
        &mut hw.tft,
        &setup.fonts,
        FontId::Font2,
        "today",
        Point::new(10, 14 + FontId::Font4.height() as i32),
        Rgb565::WHITE,
    );
    let _ = fonts::draw_label(
        &mut hw.tft,
        &setup.fonts,
        FontId::Font7,
        "12:45",
        Point::new(10, 400),
        Rgb565::YELLOW,
    );

    let mut flash = FlashFs::new(&ICONS);
    report("/sun.png", blit::draw_png(&mut flash, &mut hw.tft, "/sun.png", 20, 60));

    let cloud = if setup.supports_readback() {
        blit::draw_png_blended(&mut flash, &mut hw.tft, "/cloud.png", 40, 80)
    } else {
        blit::draw_png_on_background(&mut flash, &mut hw.tft, "/cloud.png", 40, 80, SKY)
    };
    report("/cloud.png", cloud);

    #[cfg(feature = "esp32-3248s035")]
    report(
        "/ICONS/RAIN.PNG",
        blit::draw_png(&mut hw.sd, &mut hw.tft, "/ICONS/RAIN.PNG", 180, 60),
    );

    loop {
        delay.delay_millis(1000);
    }
}

fn report(path: &str, result: Result<BlitStats, BlitError>) {
    match result {
        Ok(s) => info!(
            "{}: {}x{}, {} px from {} bytes",
            path, s.width, s.height, s.pixels_written, s.feed.bytes_read
        ),
        Err(e) => warn!("{}: {}", path, e),
    }
}
