use std::cell::RefCell;

use embedded_hal_bus::i2c::RefCellDevice;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::i2c::I2cDriver;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::info;

use roomsense_common::Cycle;

mod aht20;
mod board;
mod config;
mod display;
mod influx;
mod sensor;
mod sntp;
mod wifi;

fn main() -> anyhow::Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let board = board::NodeBoard::new(peripherals.pins.gpio2.downgrade_output())?;

    // Shared bus for the display and the sensor, accessed strictly
    // sequentially within this one thread.
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &esp_idf_svc::hal::i2c::config::Config::new().baudrate(400_000.Hz()),
    )?;
    info!("I2C setup completed");
    let bus = RefCell::new(i2c);

    let station = wifi::Station::new(peripherals.modem, sys_loop, nvs)?;
    let screen = display::Oled::new(RefCellDevice::new(&bus));
    let sensor = sensor::RoomSensor::new(RefCellDevice::new(&bus));
    let sink = influx::InfluxDbClient::new(
        config::INFLUXDB_URL,
        config::INFLUXDB_ORG,
        config::INFLUXDB_BUCKET,
        config::INFLUXDB_TOKEN,
    )?;
    let time = sntp::TimeSyncer::new(config::TZ_INFO, config::TIMESERVER1, config::TIMESERVER2)?;

    let cycle = Cycle::boot(station, screen, sensor, sink, time, board)
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    cycle.run()
}
