// Font selection for the TFT setups.
// Fonts keep the classic numbering (1 = GLCD, 2, 4, 6, 7, 8) and map onto
// the embedded-graphics monospace fonts at the closest cell height.
// 6/7/8 are numeric-only: anything outside their charset renders blank.

use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_8X13, FONT_10X20};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FontId {
    Glcd = 1,
    Font2 = 2,
    Font4 = 4,
    Font6 = 6,
    Font7 = 7,
    Font8 = 8,
}

impl FontId {
    pub const ALL: [FontId; 6] = [
        FontId::Glcd,
        FontId::Font2,
        FontId::Font4,
        FontId::Font6,
        FontId::Font7,
        FontId::Font8,
    ];

    // nominal glyph height in pixels
    pub fn height(self) -> u16 {
        match self {
            FontId::Glcd => 8,
            FontId::Font2 => 16,
            FontId::Font4 => 26,
            FontId::Font6 => 48,
            FontId::Font7 => 48,
            FontId::Font8 => 75,
        }
    }

    // flash cost of the original bitmap tables
    pub fn flash_bytes(self) -> u32 {
        match self {
            FontId::Glcd => 1820,
            FontId::Font2 => 3534,
            FontId::Font4 => 5848,
            FontId::Font6 => 2666,
            FontId::Font7 => 2438,
            FontId::Font8 => 3256,
        }
    }

    // restricted charset; None = printable ASCII
    pub fn charset(self) -> Option<&'static str> {
        match self {
            FontId::Font6 => Some("1234567890:-.apm"),
            FontId::Font7 => Some("1234567890:."),
            FontId::Font8 => Some("1234567890:-."),
            _ => None,
        }
    }

    const fn bit(self) -> u16 {
        1 << (self as u8)
    }
}

// nearest embedded-graphics font for a TFT font
pub fn mono_font(id: FontId) -> &'static MonoFont<'static> {
    match id {
        FontId::Glcd => &FONT_6X10,
        FontId::Font2 => &FONT_8X13,
        _ => &FONT_10X20,
    }
}

/// Fonts compiled into a setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontSet {
    bits: u16,
    pub free_fonts: bool,
    pub smooth: bool,
}

impl FontSet {
    pub const NONE: Self = Self {
        bits: 0,
        free_fonts: false,
        smooth: false,
    };

    pub const fn with(mut self, id: FontId) -> Self {
        self.bits |= id.bit();
        self
    }

    pub const fn with_free_fonts(mut self) -> Self {
        self.free_fonts = true;
        self
    }

    pub const fn with_smooth(mut self) -> Self {
        self.smooth = true;
        self
    }

    pub const fn contains(&self, id: FontId) -> bool {
        self.bits & id.bit() != 0
    }

    // requested font if loaded, otherwise GLCD
    pub fn resolve(&self, id: FontId) -> FontId {
        if self.contains(id) { id } else { FontId::Glcd }
    }

    pub fn flash_bytes(&self) -> u32 {
        FontId::ALL
            .iter()
            .filter(|id| self.contains(**id))
            .map(|id| id.flash_bytes())
            .sum()
    }
}

/// Draw `text` with its top-left corner at `at`. Returns the position
/// after the last character.
pub fn draw_label<D>(
    target: &mut D,
    fonts: &FontSet,
    id: FontId,
    text: &str,
    at: Point,
    color: Rgb565,
) -> Result<Point, D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let id = fonts.resolve(id);
    let font = mono_font(id);
    let style = MonoTextStyle::new(font, color);

    let Some(charset) = id.charset() else {
        return Text::with_baseline(text, at, style, Baseline::Top).draw(target);
    };

    let advance = (font.character_size.width + font.character_spacing) as i32;
    let mut pos = at;
    let mut utf8 = [0u8; 4];
    for ch in text.chars() {
        if charset.contains(ch) {
            Text::with_baseline(ch.encode_utf8(&mut utf8), pos, style, Baseline::Top).draw(target)?;
        }
        pos.x += advance;
    }
    Ok(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    struct Counter {
        pixels: usize,
    }

    impl DrawTarget for Counter {
        type Color = Rgb565;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            self.pixels += pixels.into_iter().count();
            Ok(())
        }
    }

    impl OriginDimensions for Counter {
        fn size(&self) -> Size {
            Size::new(320, 480)
        }
    }

    #[test]
    fn missing_fonts_fall_back_to_glcd() {
        let set = FontSet::NONE.with(FontId::Glcd).with(FontId::Font4);
        assert_eq!(set.resolve(FontId::Font4), FontId::Font4);
        assert_eq!(set.resolve(FontId::Font7), FontId::Glcd);
        assert!(!set.contains(FontId::Font2));
    }

    #[test]
    fn flash_cost_sums_loaded_fonts() {
        let set = FontSet::NONE.with(FontId::Glcd).with(FontId::Font2);
        assert_eq!(set.flash_bytes(), 1820 + 3534);
    }

    #[test]
    fn numeric_font_skips_letters_but_advances() {
        let set = FontSet::NONE.with(FontId::Font7);
        let mut target = Counter { pixels: 0 };
        let end = draw_label(&mut target, &set, FontId::Font7, "ab", Point::new(5, 0), Rgb565::WHITE)
            .unwrap();
        assert_eq!(target.pixels, 0);
        assert_eq!(end.x, 5 + 2 * 10);

        draw_label(&mut target, &set, FontId::Font7, "12", Point::zero(), Rgb565::WHITE).unwrap();
        assert!(target.pixels > 0);
    }

    #[test]
    fn ascii_font_draws_text() {
        let set = FontSet::NONE.with(FontId::Glcd);
        let mut target = Counter { pixels: 0 };
        let end = draw_label(&mut target, &set, FontId::Glcd, "Hi", Point::zero(), Rgb565::RED)
            .unwrap();
        assert!(target.pixels > 0);
        assert_eq!(end.x, 12);
    }
}
