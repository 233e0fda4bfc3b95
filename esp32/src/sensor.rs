use embedded_hal::i2c::I2c;
use esp_idf_svc::hal::delay::FreeRtos;
use log::info;

use roomsense_common::cycle::{BoxError, EnvironmentSensor};
use roomsense_common::Reading;

use crate::aht20::Aht20;

/// The node's environmental sensor: an AHT20 on the shared bus.
pub struct RoomSensor<I> {
    driver: Aht20<I, FreeRtos>,
}

impl<I: I2c> RoomSensor<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            driver: Aht20::new(i2c, FreeRtos),
        }
    }
}

impl<I: I2c> EnvironmentSensor for RoomSensor<I> {
    fn init(&mut self) -> Result<(), BoxError> {
        self.driver
            .init()
            .map_err(|e| -> BoxError { format!("AHT20 not found: {:?}", e).into() })?;
        info!("Found AHT20");
        Ok(())
    }

    fn sample(&mut self) -> Result<Reading, BoxError> {
        let measurement = self
            .driver
            .measure()
            .map_err(|e| -> BoxError { format!("AHT20 measurement failed: {:?}", e).into() })?;
        Ok(Reading {
            temperature_c: measurement.temperature_c,
            humidity_pct: measurement.humidity_pct,
        })
    }
}
