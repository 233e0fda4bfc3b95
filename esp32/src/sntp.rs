use std::ffi::CString;

use esp_idf_svc::sys;
use log::info;

use roomsense_common::cycle::TimeSync;

/// One-shot clock alignment: applies the POSIX TZ rule and starts the
/// SNTP service against the two configured servers. Fire-and-forget;
/// the caller never checks the outcome, and the service keeps polling
/// in the background for the process lifetime.
pub struct TimeSyncer {
    tz_value: CString,
    primary: CString,
    secondary: CString,
}

impl TimeSyncer {
    pub fn new(
        tz_info: &str,
        primary: &str,
        secondary: &str,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            tz_value: CString::new(tz_info)?,
            primary: CString::new(primary)?,
            secondary: CString::new(secondary)?,
        })
    }
}

impl TimeSync for TimeSyncer {
    fn sync(&mut self) {
        // SNTP keeps the server name pointers; the CStrings live as
        // long as the cycle owning this syncer.
        unsafe {
            let tz_key = CString::new("TZ").expect("static key");
            sys::setenv(tz_key.as_ptr().cast(), self.tz_value.as_ptr().cast(), 1);
            sys::tzset();

            sys::esp_sntp_setoperatingmode(sys::esp_sntp_operatingmode_t_ESP_SNTP_OPMODE_POLL);
            sys::esp_sntp_setservername(0, self.primary.as_ptr().cast());
            sys::esp_sntp_setservername(1, self.secondary.as_ptr().cast());
            sys::esp_sntp_init();
        }
        info!("SNTP started");
    }
}
