//! Minimal AHT20 driver: initialize/calibrate once, then trigger a
//! measurement and read back temperature and relative humidity.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

pub const ADDRESS: u8 = 0x38;

const CMD_STATUS: [u8; 1] = [0x71];
const CMD_INIT: [u8; 3] = [0xBE, 0x08, 0x00];
const CMD_TRIGGER: [u8; 3] = [0xAC, 0x33, 0x00];

const STATUS_BUSY: u8 = 0x80;
const STATUS_CALIBRATED: u8 = 0x08;

// Datasheet timings.
const POWER_ON_DELAY_MS: u32 = 40;
const CALIBRATION_DELAY_MS: u32 = 10;
const MEASUREMENT_DELAY_MS: u32 = 80;
const BUSY_POLL_DELAY_MS: u32 = 10;
const BUSY_POLL_LIMIT: usize = 10;

#[derive(Debug)]
pub enum Aht20Error<E> {
    I2c(E),
    /// The sensor never cleared its busy flag after a measurement was
    /// triggered.
    Busy,
}

#[derive(Clone, Copy, Debug)]
pub struct Measurement {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

pub struct Aht20<I, D> {
    i2c: I,
    delay: D,
}

impl<I: I2c, D: DelayNs> Aht20<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self { i2c, delay }
    }

    /// Checks the calibration status and issues the one-time
    /// initialization command if the sensor comes up uncalibrated.
    pub fn init(&mut self) -> Result<(), Aht20Error<I::Error>> {
        self.delay.delay_ms(POWER_ON_DELAY_MS);

        let mut status = [0u8; 1];
        self.i2c
            .write_read(ADDRESS, &CMD_STATUS, &mut status)
            .map_err(Aht20Error::I2c)?;

        if status[0] & STATUS_CALIBRATED == 0 {
            self.i2c.write(ADDRESS, &CMD_INIT).map_err(Aht20Error::I2c)?;
            self.delay.delay_ms(CALIBRATION_DELAY_MS);
        }
        Ok(())
    }

    /// Triggers one measurement and blocks for the duration of the
    /// hardware transaction.
    pub fn measure(&mut self) -> Result<Measurement, Aht20Error<I::Error>> {
        self.i2c
            .write(ADDRESS, &CMD_TRIGGER)
            .map_err(Aht20Error::I2c)?;
        self.delay.delay_ms(MEASUREMENT_DELAY_MS);

        let mut buf = [0u8; 7];
        for _ in 0..BUSY_POLL_LIMIT {
            self.i2c.read(ADDRESS, &mut buf).map_err(Aht20Error::I2c)?;
            if buf[0] & STATUS_BUSY == 0 {
                return Ok(decode(&buf));
            }
            self.delay.delay_ms(BUSY_POLL_DELAY_MS);
        }
        Err(Aht20Error::Busy)
    }
}

/// Unpacks the two 20-bit raw values following the status byte:
/// humidity first, then temperature, sharing the middle byte.
fn decode(buf: &[u8; 7]) -> Measurement {
    let raw_humidity =
        ((buf[1] as u32) << 12) | ((buf[2] as u32) << 4) | ((buf[3] as u32) >> 4);
    let raw_temperature =
        (((buf[3] & 0x0F) as u32) << 16) | ((buf[4] as u32) << 8) | buf[5] as u32;

    Measurement {
        humidity_pct: raw_humidity as f32 / 1_048_576.0 * 100.0,
        temperature_c: raw_temperature as f32 / 1_048_576.0 * 200.0 - 50.0,
    }
}
