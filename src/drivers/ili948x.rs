// ILI9488 / ILI9486 SPI TFT driver (board-independent)
// 320x480 native portrait. The bus is a raw SpiBus with CS driven here, so
// a batch can hold the panel selected across thousands of pixel writes.
//
// ILI9488 over SPI only accepts 18-bit pixels (3 bytes, top bits used).
// The RPi-style ILI9486 boards put a 16-bit shift register in front of
// the controller: every command and parameter goes out as a 16-bit word
// and pixels are plain RGB565, but nothing can be read back.

use embedded_graphics_core::draw_target::DrawTarget;
use embedded_graphics_core::geometry::{Dimensions, OriginDimensions, Point, Size};
use embedded_graphics_core::pixelcolor::{Rgb565, RgbColor};
use embedded_graphics_core::primitives::Rectangle;
use embedded_graphics_core::Pixel;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use crate::board::Controller;
use crate::display::{PixelSurface, color};

pub const WIDTH: u16 = 320;
pub const HEIGHT: u16 = 480;

// pixels per SPI write when streaming a solid fill
const FILL_RUN: usize = 32;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    fn madctl(self) -> u8 {
        use madctl::*;
        match self {
            Rotation::Deg0 => MX | BGR,
            Rotation::Deg90 => MV | BGR,
            Rotation::Deg180 => MY | BGR,
            Rotation::Deg270 => MX | MY | MV | BGR,
        }
    }

    fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

#[allow(dead_code)]
mod cmd {
    pub const SW_RESET: u8 = 0x01;
    pub const SLEEP_OUT: u8 = 0x11;
    pub const INVERT_OFF: u8 = 0x20;
    pub const DISPLAY_ON: u8 = 0x29;
    pub const COLUMN_ADDR: u8 = 0x2A;
    pub const PAGE_ADDR: u8 = 0x2B;
    pub const MEMORY_WRITE: u8 = 0x2C;
    pub const MEMORY_READ: u8 = 0x2E;
    pub const MADCTL: u8 = 0x36;
    pub const PIXEL_FORMAT: u8 = 0x3A;
    pub const INTERFACE_MODE: u8 = 0xB0;
    pub const FRAME_RATE: u8 = 0xB1;
    pub const INVERSION_CTRL: u8 = 0xB4;
    pub const FUNCTION_CTRL: u8 = 0xB6;
    pub const ENTRY_MODE: u8 = 0xB7;
    pub const POWER_CTRL_1: u8 = 0xC0;
    pub const POWER_CTRL_2: u8 = 0xC1;
    pub const POWER_CTRL_3: u8 = 0xC2;
    pub const VCOM_CTRL: u8 = 0xC5;
    pub const GAMMA_POS: u8 = 0xE0;
    pub const GAMMA_NEG: u8 = 0xE1;
    pub const ADJUST_CTRL_3: u8 = 0xF7;
}

mod madctl {
    pub const MY: u8 = 0x80;
    pub const MX: u8 = 0x40;
    pub const MV: u8 = 0x20;
    pub const BGR: u8 = 0x08;
}

// (command, parameters, delay after in ms)
type InitStep = (u8, &'static [u8], u32);

const ILI9488_INIT: &[InitStep] = &[
    (
        cmd::GAMMA_POS,
        &[0x00, 0x03, 0x09, 0x08, 0x16, 0x0A, 0x3F, 0x78, 0x4C, 0x09, 0x0A, 0x08, 0x16, 0x1A, 0x0F],
        0,
    ),
    (
        cmd::GAMMA_NEG,
        &[0x00, 0x16, 0x19, 0x03, 0x0F, 0x05, 0x32, 0x45, 0x46, 0x04, 0x0E, 0x0D, 0x35, 0x37, 0x0F],
        0,
    ),
    (cmd::POWER_CTRL_1, &[0x17, 0x15], 0),
    (cmd::POWER_CTRL_2, &[0x41], 0),
    (cmd::VCOM_CTRL, &[0x00, 0x12, 0x80], 0),
    (cmd::MADCTL, &[0x48], 0),
    // 18 bits per pixel
    (cmd::PIXEL_FORMAT, &[0x66], 0),
    (cmd::INTERFACE_MODE, &[0x00], 0),
    (cmd::FRAME_RATE, &[0xA0], 0),
    (cmd::INVERSION_CTRL, &[0x02], 0),
    (cmd::FUNCTION_CTRL, &[0x02, 0x02, 0x3B], 0),
    (cmd::ENTRY_MODE, &[0xC6], 0),
    (cmd::ADJUST_CTRL_3, &[0xA9, 0x51, 0x2C, 0x82], 0),
    (cmd::SLEEP_OUT, &[], 120),
    (cmd::DISPLAY_ON, &[], 25),
];

const ILI9486_RPI_INIT: &[InitStep] = &[
    (cmd::SW_RESET, &[], 120),
    (cmd::SLEEP_OUT, &[], 120),
    // 16 bits per pixel
    (cmd::PIXEL_FORMAT, &[0x55], 0),
    (cmd::POWER_CTRL_3, &[0x44], 0),
    (cmd::VCOM_CTRL, &[0x00, 0x00, 0x00, 0x00], 0),
    (
        cmd::GAMMA_POS,
        &[0x0F, 0x1F, 0x1C, 0x0C, 0x0F, 0x08, 0x48, 0x98, 0x37, 0x0A, 0x13, 0x04, 0x11, 0x0D, 0x00],
        0,
    ),
    (
        cmd::GAMMA_NEG,
        &[0x0F, 0x32, 0x2E, 0x0B, 0x0D, 0x05, 0x47, 0x75, 0x37, 0x06, 0x10, 0x03, 0x24, 0x20, 0x00],
        0,
    ),
    (cmd::INVERT_OFF, &[], 0),
    (cmd::MADCTL, &[0x48], 0),
    (cmd::DISPLAY_ON, &[], 150),
];

pub struct Ili948x<SPI, CS, DC, RST> {
    spi: SPI,
    cs: CS,
    dc: DC,
    rst: Option<RST>,
    controller: Controller,
    rotation: Rotation,
    in_batch: bool,
}

impl<SPI, CS, DC, RST> Ili948x<SPI, CS, DC, RST>
where
    SPI: SpiBus,
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
{
    pub fn new(spi: SPI, mut cs: CS, dc: DC, rst: Option<RST>, controller: Controller) -> Self {
        let _ = cs.set_high();
        Self {
            spi,
            cs,
            dc,
            rst,
            controller,
            rotation: Rotation::Deg0,
            in_batch: false,
        }
    }

    // hardware reset when RST is wired, software reset otherwise
    pub fn reset<D: DelayNs>(&mut self, delay: &mut D) {
        match self.rst.as_mut() {
            Some(rst) => {
                let _ = rst.set_high();
                delay.delay_ms(5);
                let _ = rst.set_low();
                delay.delay_ms(20);
                let _ = rst.set_high();
                delay.delay_ms(150);
            }
            None => {
                self.select();
                self.command(cmd::SW_RESET, &[]);
                self.deselect();
                delay.delay_ms(150);
            }
        }
    }

    pub fn init<D: DelayNs>(&mut self, delay: &mut D) {
        self.reset(delay);

        let table = match self.controller {
            Controller::Ili9488 => ILI9488_INIT,
            Controller::Ili9486Rpi => ILI9486_RPI_INIT,
        };

        self.select();
        for &(c, params, wait_ms) in table {
            self.command(c, params);
            if wait_ms > 0 {
                delay.delay_ms(wait_ms);
            }
        }
        self.command(cmd::MADCTL, &[self.rotation.madctl()]);
        self.deselect();
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
        self.select();
        self.command(cmd::MADCTL, &[rotation.madctl()]);
        self.deselect();
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    fn select(&mut self) {
        if !self.in_batch {
            let _ = self.cs.set_low();
        }
    }

    fn deselect(&mut self) {
        if !self.in_batch {
            let _ = self.spi.flush();
            let _ = self.cs.set_high();
        }
    }

    fn command(&mut self, c: u8, params: &[u8]) {
        let _ = self.dc.set_low();
        self.send(&[c]);
        let _ = self.dc.set_high();
        if !params.is_empty() {
            self.send(params);
        }
    }

    // command/parameter bytes; the RPi shift register wants 16-bit words
    fn send(&mut self, bytes: &[u8]) {
        match self.controller {
            Controller::Ili9488 => {
                let _ = self.spi.write(bytes);
            }
            Controller::Ili9486Rpi => {
                for &b in bytes {
                    let _ = self.spi.write(&[0x00, b]);
                }
            }
        }
    }

    fn set_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) {
        let [xs_hi, xs_lo] = x0.to_be_bytes();
        let [xe_hi, xe_lo] = x1.to_be_bytes();
        let [ys_hi, ys_lo] = y0.to_be_bytes();
        let [ye_hi, ye_lo] = y1.to_be_bytes();
        self.command(cmd::COLUMN_ADDR, &[xs_hi, xs_lo, xe_hi, xe_lo]);
        self.command(cmd::PAGE_ADDR, &[ys_hi, ys_lo, ye_hi, ye_lo]);
    }

    // one pixel in the controller's wire format; returns bytes used
    fn encode(&self, c: Rgb565, out: &mut [u8]) -> usize {
        match self.controller {
            Controller::Ili9488 => {
                let [r, g, b] = color::unpack(c);
                out[0] = r;
                out[1] = g;
                out[2] = b;
                3
            }
            Controller::Ili9486Rpi => {
                let [hi, lo] = color::raw(c).to_be_bytes();
                out[0] = hi;
                out[1] = lo;
                2
            }
        }
    }

    fn stream_color(&mut self, c: Rgb565, mut count: u32) {
        let mut px = [0u8; 3];
        let n = self.encode(c, &mut px);
        let mut run = [0u8; 3 * FILL_RUN];
        for chunk in run.chunks_exact_mut(n).take(FILL_RUN) {
            chunk.copy_from_slice(&px[..n]);
        }

        while count > 0 {
            let k = count.min(FILL_RUN as u32);
            let _ = self.spi.write(&run[..k as usize * n]);
            count -= k;
        }
    }

    fn in_bounds(&self, at: Point) -> bool {
        let size = self.size();
        at.x >= 0 && at.y >= 0 && (at.x as u32) < size.width && (at.y as u32) < size.height
    }
}

impl<SPI, CS, DC, RST> OriginDimensions for Ili948x<SPI, CS, DC, RST> {
    fn size(&self) -> Size {
        if self.rotation.swaps_axes() {
            Size::new(HEIGHT as u32, WIDTH as u32)
        } else {
            Size::new(WIDTH as u32, HEIGHT as u32)
        }
    }
}

impl<SPI, CS, DC, RST> PixelSurface for Ili948x<SPI, CS, DC, RST>
where
    SPI: SpiBus,
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
{
    fn begin_batch(&mut self) {
        if !self.in_batch {
            let _ = self.cs.set_low();
            self.in_batch = true;
        }
    }

    fn end_batch(&mut self) {
        if self.in_batch {
            self.in_batch = false;
            self.deselect();
        }
    }

    fn write_pixel(&mut self, at: Point, c: Rgb565) {
        if !self.in_bounds(at) {
            return;
        }
        let (x, y) = (at.x as u16, at.y as u16);
        let mut px = [0u8; 3];
        let n = self.encode(c, &mut px);

        self.select();
        self.set_window(x, y, x, y);
        self.command(cmd::MEMORY_WRITE, &[]);
        let _ = self.spi.write(&px[..n]);
        self.deselect();
    }

    fn read_pixel(&mut self, at: Point) -> Rgb565 {
        if !self.controller.can_read_gram() || !self.in_bounds(at) {
            return Rgb565::BLACK;
        }
        let (x, y) = (at.x as u16, at.y as u16);

        self.select();
        self.set_window(x, y, x, y);
        self.command(cmd::MEMORY_READ, &[]);
        // dummy byte, then R, G, B in the top bits
        let mut buf = [0u8; 4];
        let _ = self.spi.read(&mut buf);
        self.deselect();

        color::pack(buf[1], buf[2], buf[3])
    }

    fn fill_rect(&mut self, area: &Rectangle, c: Rgb565) {
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else {
            return;
        };

        self.select();
        self.set_window(
            area.top_left.x as u16,
            area.top_left.y as u16,
            bottom_right.x as u16,
            bottom_right.y as u16,
        );
        self.command(cmd::MEMORY_WRITE, &[]);
        self.stream_color(c, area.size.width * area.size.height);
        self.deselect();
    }
}

impl<SPI, CS, DC, RST> DrawTarget for Ili948x<SPI, CS, DC, RST>
where
    SPI: SpiBus,
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
{
    type Color = Rgb565;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let opened = !self.in_batch;
        self.begin_batch();
        for Pixel(at, c) in pixels {
            self.write_pixel(at, c);
        }
        if opened {
            self.end_batch();
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, c: Self::Color) -> Result<(), Self::Error> {
        self.fill_rect(area, c);
        Ok(())
    }
}
