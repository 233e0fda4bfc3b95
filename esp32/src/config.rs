//! Compile-time configuration. Secrets come from the build environment
//! (set them in the shell or a `.env` sourced before `cargo build`);
//! everything else is a plain constant. There is no runtime
//! configuration surface.

pub const WIFI_SSID: &str = env!("WIFI_SSID");
pub const WIFI_PASSWORD: &str = env!("WIFI_PASS");

pub const INFLUXDB_URL: &str = env!("INFLUXDB_URL");
pub const INFLUXDB_ORG: &str = env!("INFLUXDB_ORG");
pub const INFLUXDB_BUCKET: &str = env!("INFLUXDB_BUCKET");
pub const INFLUXDB_TOKEN: &str = env!("INFLUXDB_TOKEN");

/// POSIX TZ rule applied before starting SNTP.
pub const TZ_INFO: &str = "CET-1CEST,M3.5.0,M10.5.0/3";
pub const TIMESERVER1: &str = "pool.ntp.org";
pub const TIMESERVER2: &str = "time.nis.gov";
