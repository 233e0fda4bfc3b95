use serde::{Deserialize, Serialize};

/// One environmental sample: temperature in degrees Celsius and
/// relative humidity in percent. Produced once per cycle and consumed
/// by the display and the telemetry publisher; never persisted.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Reading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}
