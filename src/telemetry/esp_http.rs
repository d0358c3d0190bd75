//! ESP-IDF HTTP client transport.
//!
//! Each request opens a fresh connection. The response body is read while
//! the request is still open, so [`HttpTransport::response_body`] only hands
//! back what `post` already collected.

use super::{HttpTransport, TransportError};
use embedded_svc::http::client::Client;
use embedded_svc::io::{Read, Write};
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use log::debug;
use std::time::Duration;
use zeroize::Zeroizing;

/// Response bytes kept for logging.
const MAX_RESPONSE_LEN: usize = 1024;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocking HTTP(S) client built on `EspHttpConnection`.
#[derive(Default)]
pub struct EspHttpTransport {
    uri: Option<String>,
    headers: Vec<(String, Zeroizing<String>)>,
    response: Option<String>,
}

impl EspHttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HttpTransport for EspHttpTransport {
    fn begin(&mut self, uri: &str) -> Result<(), TransportError> {
        if !(uri.starts_with("http://") || uri.starts_with("https://")) {
            return Err(TransportError::InvalidUri(uri.to_string()));
        }
        self.uri = Some(uri.to_string());
        Ok(())
    }

    fn add_header(&mut self, name: &str, value: &str) {
        self.headers
            .push((name.to_string(), Zeroizing::new(value.to_string())));
    }

    fn post(&mut self, body: &[u8]) -> Result<u16, TransportError> {
        let uri = self
            .uri
            .as_deref()
            .ok_or_else(|| TransportError::InvalidUri(String::new()))?;

        let config = Configuration {
            timeout: Some(REQUEST_TIMEOUT),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let connection =
            EspHttpConnection::new(&config).map_err(|e| TransportError::Platform(e.to_string()))?;
        let mut client = Client::wrap(connection);

        let content_length = body.len().to_string();
        let mut headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        headers.push(("Content-Length", content_length.as_str()));

        let (status, collected) = {
            let mut request = client
                .post(uri, &headers)
                .map_err(|_| TransportError::ConnectionRefused)?;
            request
                .write_all(body)
                .map_err(|_| TransportError::SendPayloadFailed)?;
            request.flush().map_err(|_| TransportError::SendPayloadFailed)?;

            let mut response = request.submit().map_err(|_| TransportError::ReadTimeout)?;
            let status = response.status();

            let mut collected = Vec::new();
            let mut chunk = [0u8; 256];
            while collected.len() < MAX_RESPONSE_LEN {
                match response.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => collected.extend_from_slice(&chunk[..n]),
                    Err(e) => {
                        debug!("Response read stopped: {:?}", e);
                        break;
                    }
                }
            }
            collected.truncate(MAX_RESPONSE_LEN);
            (status, collected)
        };

        drop(headers);
        self.response = Some(String::from_utf8_lossy(&collected).into_owned());
        Ok(status)
    }

    fn response_body(&mut self) -> Result<String, TransportError> {
        self.response.take().ok_or(TransportError::ConnectionLost)
    }

    fn end(&mut self) {
        self.uri = None;
        self.headers.clear();
        self.response = None;
    }
}
