use embedded_svc::http::client::Client as HttpClient;
use embedded_svc::http::Method;
use embedded_svc::io::Write;
use embedded_svc::utils::io;
use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection};
use log::info;

use roomsense_common::cycle::{BoxError, TelemetrySink};
use roomsense_common::point::percent_encode;
use roomsense_common::Point;

/// InfluxDB v2 write client over the esp-idf HTTP stack, with TLS
/// validated against the platform certificate bundle. One point per
/// request, line protocol, no local buffering.
pub struct InfluxDbClient {
    client: HttpClient<EspHttpConnection>,
    server_url: &'static str,
    write_url: String,
    auth: String,
}

impl InfluxDbClient {
    pub fn new(
        url: &'static str,
        org: &str,
        bucket: &str,
        token: &str,
    ) -> anyhow::Result<Self> {
        let connection = EspHttpConnection::new(&HttpConfiguration {
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        })?;

        let write_url = format!(
            "{}/api/v2/write?org={}&bucket={}",
            url,
            percent_encode(org),
            percent_encode(bucket)
        );

        Ok(Self {
            client: HttpClient::wrap(connection),
            server_url: url,
            write_url,
            auth: format!("Token {}", token),
        })
    }
}

fn http_err(e: impl core::fmt::Display) -> BoxError {
    format!("http: {}", e).into()
}

impl TelemetrySink for InfluxDbClient {
    fn validate(&mut self) -> Result<(), BoxError> {
        let url = format!("{}/ping", self.server_url);
        let request = self.client.request(Method::Get, &url, &[]).map_err(http_err)?;
        let response = request.submit().map_err(http_err)?;

        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(format!("InfluxDB connection failed: HTTP {}", status).into());
        }
        info!("Connected to InfluxDB: {}", self.server_url);
        Ok(())
    }

    fn publish(&mut self, point: &Point) -> Result<(), BoxError> {
        let body = point.to_line_protocol();
        let content_length = body.len().to_string();
        let headers = [
            ("Authorization", self.auth.as_str()),
            ("Content-Type", "text/plain; charset=utf-8"),
            ("Content-Length", content_length.as_str()),
        ];

        let mut request = self
            .client
            .request(Method::Post, &self.write_url, &headers)
            .map_err(http_err)?;
        request.write_all(body.as_bytes()).map_err(http_err)?;
        request.flush().map_err(http_err)?;
        let mut response = request.submit().map_err(http_err)?;

        let status = response.status();
        if !(200..300).contains(&status) {
            // The server explains rejected writes in the body.
            let mut buf = [0u8; 256];
            let bytes_read = io::try_read_full(&mut response, &mut buf)
                .map_err(|e| e.0)
                .unwrap_or(0);
            let detail = core::str::from_utf8(&buf[..bytes_read]).unwrap_or("");
            return Err(format!("HTTP {}: {}", status, detail).into());
        }
        Ok(())
    }
}
