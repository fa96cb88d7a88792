// Typed GPIO wiring for the board selected by cargo feature.
// GPIO numbers here must match tft_weather::board::<variant>; main()
// validates SETUP before calling init().

use esp_hal::{
    Blocking,
    gpio::{Level, Output, OutputConfig},
    peripherals::Peripherals,
    spi,
    time::Rate,
};
use tft_weather::board::{self, DisplaySetup};
use tft_weather::drivers::ili948x::Ili948x;

#[cfg(feature = "esp32-3248s035")]
use embedded_hal_bus::spi::ExclusiveDevice;
#[cfg(feature = "esp32-3248s035")]
use esp_hal::delay::Delay;
#[cfg(feature = "esp32-3248s035")]
use log::warn;
#[cfg(feature = "esp32-3248s035")]
use tft_weather::drivers::sdcard::SdStorage;

#[cfg(all(feature = "esp32-3248s035", feature = "osoyoo-rpi35"))]
compile_error!("enable exactly one board feature");

#[cfg(not(any(feature = "esp32-3248s035", feature = "osoyoo-rpi35")))]
compile_error!("enable one board feature: esp32-3248s035 or osoyoo-rpi35");

#[cfg(feature = "esp32-3248s035")]
pub const SETUP: &DisplaySetup = &board::esp32_3248s035::SETUP;

#[cfg(feature = "osoyoo-rpi35")]
pub const SETUP: &DisplaySetup = &board::osoyoo_rpi35::SETUP;

pub type Bus = spi::master::Spi<'static, Blocking>;
pub type Tft = Ili948x<Bus, Output<'static>, Output<'static>, Output<'static>>;

#[cfg(feature = "esp32-3248s035")]
pub type Sd = SdStorage<ExclusiveDevice<Bus, Output<'static>, Delay>, Delay>;

// SD cards must be brought up at <= 400 kHz
#[cfg(feature = "esp32-3248s035")]
const SD_INIT_KHZ: u32 = 400;

// data rate once the card has left SPI init mode
#[cfg(feature = "esp32-3248s035")]
const SD_DATA_MHZ: u32 = 20;

/// Complete board hardware, ready for use.
pub struct Hw {
    pub tft: Tft,
    backlight: Option<Output<'static>>,
    // XPT2046 kept deselected so it stays off the shared bus
    #[cfg(feature = "esp32-3248s035")]
    _touch_cs: Output<'static>,
    #[cfg(feature = "esp32-3248s035")]
    pub sd: Sd,
}

impl Hw {
    pub fn backlight_on(&mut self) {
        if let Some(bl) = self.backlight.as_mut() {
            bl.set_level(level(SETUP.backlight_on));
        }
    }
}

fn level(l: board::Level) -> Level {
    match l {
        board::Level::High => Level::High,
        board::Level::Low => Level::Low,
    }
}

#[cfg(feature = "esp32-3248s035")]
fn off(l: board::Level) -> Level {
    match l {
        board::Level::High => Level::Low,
        board::Level::Low => Level::High,
    }
}

fn tft_config() -> spi::master::Config {
    spi::master::Config::default().with_frequency(Rate::from_hz(SETUP.spi_freq_hz))
}

// HSPI (SPI2): TFT + touch.  VSPI (SPI3): SD slot.
#[cfg(feature = "esp32-3248s035")]
pub fn init(p: Peripherals) -> Hw {
    let cs = Output::new(p.GPIO15, Level::High, OutputConfig::default());
    let dc = Output::new(p.GPIO2, Level::High, OutputConfig::default());
    let bl = Output::new(p.GPIO27, off(SETUP.backlight_on), OutputConfig::default());
    let touch_cs = Output::new(p.GPIO33, Level::High, OutputConfig::default());

    let tft_bus = spi::master::Spi::new(p.SPI2, tft_config())
        .unwrap()
        .with_sck(p.GPIO14)
        .with_mosi(p.GPIO13)
        .with_miso(p.GPIO12);
    let tft = Ili948x::new(tft_bus, cs, dc, None, SETUP.controller);

    let sd_cfg = spi::master::Config::default().with_frequency(Rate::from_khz(SD_INIT_KHZ));
    let sd_bus = spi::master::Spi::new(p.SPI3, sd_cfg)
        .unwrap()
        .with_sck(p.GPIO18)
        .with_mosi(p.GPIO23)
        .with_miso(p.GPIO19);
    let sd_cs = Output::new(p.GPIO5, Level::High, OutputConfig::default());
    let sd_dev = ExclusiveDevice::new(sd_bus, sd_cs, Delay::new()).unwrap();
    let sd = SdStorage::new(sd_dev, Delay::new());
    let sd_fast = spi::master::Config::default().with_frequency(Rate::from_mhz(SD_DATA_MHZ));
    sd.reclock(|dev| {
        if let Err(e) = dev.bus_mut().apply_config(&sd_fast) {
            warn!("SD: reclock to {} MHz failed: {:?}", SD_DATA_MHZ, e);
        }
    });

    Hw {
        tft,
        backlight: Some(bl),
        _touch_cs: touch_cs,
        sd,
    }
}

// VSPI (SPI3): TFT only. Backlight is hard-wired on.
#[cfg(feature = "osoyoo-rpi35")]
pub fn init(p: Peripherals) -> Hw {
    let cs = Output::new(p.GPIO15, Level::High, OutputConfig::default());
    let dc = Output::new(p.GPIO2, Level::High, OutputConfig::default());
    let rst = Output::new(p.GPIO4, Level::High, OutputConfig::default());

    let tft_bus = spi::master::Spi::new(p.SPI3, tft_config())
        .unwrap()
        .with_sck(p.GPIO18)
        .with_mosi(p.GPIO23)
        .with_miso(p.GPIO19);
    let tft = Ili948x::new(tft_bus, cs, dc, Some(rst), SETUP.controller);

    Hw {
        tft,
        backlight: None,
    }
}
