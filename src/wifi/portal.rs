//! Captive configuration portal.
//!
//! Serves a small credential form while the device runs its own access
//! point. Uses `tiny_http`, which works on both host and ESP32 (via
//! `std::net`).
//!
//! # Routes
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | GET | `/` | credential form |
//! | POST | `/wifi` | `200` and stop serving on valid credentials, `400` otherwise |
//! | GET | anything else | `302` to `/` (OS captive-portal probes) |
//! | other | any | `405` |

use crate::config::WifiConfig;
use log::{info, warn};
use serde::Deserialize;
use std::fmt;
use std::io::Read;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tiny_http::{Header, Method, Request, Response, Server};

/// Port the portal listens on by default.
pub const DEFAULT_PORTAL_PORT: u16 = 80;

/// Largest accepted form body.
const MAX_BODY_LEN: u64 = 512;

/// How long one `recv` waits before re-checking the deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

const FORM_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta name="viewport" content="width=device-width,initial-scale=1"><title>Sensor setup</title></head>
<body>
<h1>Sensor WiFi setup</h1>
<form id="f">
<label>Network <input name="ssid" maxlength="32" required></label><br>
<label>Password <input name="password" type="password" maxlength="64"></label><br>
<button>Save</button>
</form>
<p id="r"></p>
<script>
document.getElementById('f').onsubmit = async (e) => {
  e.preventDefault();
  const d = new FormData(e.target);
  const res = await fetch('/wifi', {method: 'POST', headers: {'Content-Type': 'application/json'},
    body: JSON.stringify({ssid: d.get('ssid'), password: d.get('password')})});
  document.getElementById('r').textContent = await res.text();
};
</script>
</body>
</html>
"#;

#[derive(Deserialize)]
struct CredentialsForm {
    ssid: String,
    #[serde(default)]
    password: String,
}

/// HTTP server collecting WiFi credentials.
pub struct CaptivePortal {
    server: Server,
}

impl CaptivePortal {
    /// Bind the portal to `addr` (e.g. `"0.0.0.0:80"`).
    pub fn bind(addr: &str) -> Result<Self, PortalError> {
        let server = Server::http(addr).map_err(|e| PortalError::Bind(e.to_string()))?;
        info!("Configuration portal listening on http://{}/", addr);
        Ok(Self { server })
    }

    /// Address the portal actually bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve requests until valid credentials arrive or `timeout` elapses.
    ///
    /// Returns `Ok(None)` on timeout.
    pub fn serve(&self, timeout: Option<Duration>) -> Result<Option<WifiConfig>, PortalError> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!("Configuration portal timed out");
                return Ok(None);
            }

            match self.server.recv_timeout(POLL_INTERVAL) {
                Ok(Some(request)) => {
                    if let Some(config) = handle_request(request) {
                        info!("Received credentials for '{}'", config.ssid);
                        return Ok(Some(config));
                    }
                }
                Ok(None) => {}
                Err(e) => return Err(PortalError::Io(e)),
            }
        }
    }
}

/// Answer one request, returning credentials if it carried valid ones.
fn handle_request(mut request: Request) -> Option<WifiConfig> {
    let method = request.method().clone();
    let path = request.url().split('?').next().unwrap_or("").to_string();

    let (response, config) = match (method, path.as_str()) {
        (Method::Get, "/") => (html_response(FORM_PAGE), None),
        (Method::Post, "/wifi") => match read_credentials(&mut request) {
            Ok(config) => (
                text_response(200, "Saved. The sensor is connecting to your network."),
                Some(config),
            ),
            Err(message) => (text_response(400, &message), None),
        },
        (Method::Get, _) => (redirect_response(), None),
        _ => (method_not_allowed_response(), None),
    };

    if let Err(e) = request.respond(response) {
        warn!("Failed to send portal response: {}", e);
    }
    config
}

fn read_credentials(request: &mut Request) -> Result<WifiConfig, String> {
    let mut body = Vec::new();
    request
        .as_reader()
        .take(MAX_BODY_LEN)
        .read_to_end(&mut body)
        .map_err(|e| format!("failed to read body: {}", e))?;

    let form: CredentialsForm =
        serde_json::from_slice(&body).map_err(|e| format!("invalid request: {}", e))?;
    WifiConfig::new(form.ssid, form.password).map_err(|e| e.to_string())
}

type PortalResponse = Response<std::io::Cursor<Vec<u8>>>;

fn text_response(status: u16, text: &str) -> PortalResponse {
    Response::from_string(text).with_status_code(status)
}

fn html_response(html: &str) -> PortalResponse {
    let response = Response::from_string(html);
    match Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..]) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

fn redirect_response() -> PortalResponse {
    let response = Response::from_string("").with_status_code(302);
    match Header::from_bytes(&b"Location"[..], &b"/"[..]) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

fn method_not_allowed_response() -> PortalResponse {
    let response = text_response(405, "Method Not Allowed");
    match Header::from_bytes(&b"Allow"[..], &b"GET, POST"[..]) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

/// Errors from the portal server.
#[derive(Debug)]
pub enum PortalError {
    /// Could not bind the listening socket.
    Bind(String),
    /// Receiving a request failed.
    Io(std::io::Error),
}

impl fmt::Display for PortalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind(msg) => write!(f, "failed to bind portal: {}", msg),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for PortalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}
