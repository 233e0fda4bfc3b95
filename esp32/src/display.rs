use core::fmt::Debug;

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use embedded_hal::i2c::I2c;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

use roomsense_common::cycle::{BoxError, StatusScreen};
use roomsense_common::Reading;

/// The 128x64 monochrome OLED at the default 0x3C bus address.
/// Text only, full redraw on every call.
pub struct Oled<I> {
    display: Ssd1306<I2CInterface<I>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>,
}

impl<I: I2c> Oled<I> {
    pub fn new(i2c: I) -> Self {
        let interface = I2CDisplayInterface::new(i2c);
        let display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        Self { display }
    }

    fn text_style(&self) -> MonoTextStyle<'static, BinaryColor> {
        MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(BinaryColor::On)
            .build()
    }
}

fn screen_err(e: impl Debug) -> BoxError {
    format!("display: {:?}", e).into()
}

impl<I: I2c> StatusScreen for Oled<I> {
    fn init(&mut self) -> Result<(), BoxError> {
        self.display.init().map_err(screen_err)?;
        self.display.clear(BinaryColor::Off).map_err(screen_err)?;
        self.display.flush().map_err(screen_err)
    }

    fn show_status(&mut self, lines: &[String]) -> Result<(), BoxError> {
        let style = self.text_style();
        self.display.clear(BinaryColor::Off).map_err(screen_err)?;
        for (i, line) in lines.iter().enumerate() {
            Text::with_baseline(line, Point::new(0, i as i32 * 10), style, Baseline::Top)
                .draw(&mut self.display)
                .map_err(screen_err)?;
        }
        self.display.flush().map_err(screen_err)
    }

    fn show_reading(&mut self, reading: &Reading) -> Result<(), BoxError> {
        let style = self.text_style();
        self.display.clear(BinaryColor::Off).map_err(screen_err)?;
        Text::new(
            &format!("Temp: {:.2} C", reading.temperature_c),
            Point::new(0, 10),
            style,
        )
        .draw(&mut self.display)
        .map_err(screen_err)?;
        Text::new(
            &format!("Hum:  {:.2} %", reading.humidity_pct),
            Point::new(0, 20),
            style,
        )
        .draw(&mut self.display)
        .map_err(screen_err)?;
        self.display.flush().map_err(screen_err)
    }
}
