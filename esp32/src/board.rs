use std::time::Duration;

use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyOutputPin, Output, PinDriver};
use log::warn;

use roomsense_common::cycle::Board;

/// Onboard LED plus blocking delays. The LED pulse brackets the boot
/// phase and marks liveness once per cycle.
pub struct NodeBoard<'d> {
    led: PinDriver<'d, AnyOutputPin, Output>,
}

impl<'d> NodeBoard<'d> {
    pub fn new(led_pin: AnyOutputPin) -> anyhow::Result<Self> {
        Ok(Self {
            led: PinDriver::output(led_pin)?,
        })
    }
}

impl Board for NodeBoard<'_> {
    fn set_indicator(&mut self, on: bool) {
        let result = if on {
            self.led.set_high()
        } else {
            self.led.set_low()
        };
        if let Err(e) = result {
            warn!("indicator LED: {}", e);
        }
    }

    fn sleep(&mut self, duration: Duration) {
        FreeRtos::delay_ms(duration.as_millis() as u32);
    }
}
