/// Keys forwarded from the environment (or `.env`) into the firmware build.
const CONFIG_KEYS: &[&str] = &[
    "PROVISIONING",
    "WIFI_SSID",
    "WIFI_PASSWORD",
    "PORTAL_SSID",
    "PORTAL_PASSWORD",
    "PORTAL_TIMEOUT_SECS",
    "API_URI",
    "API_TOKEN",
    "PAYLOAD_FORMAT",
    "REPORT_INTERVAL_SECS",
    "STATUS_PALETTE",
    "CONNECT_RETRY_MS",
    "CONNECT_MAX_ATTEMPTS",
    "STARTUP_DELAY_MS",
];

fn main() {
    load_env_config();

    // Only run ESP-IDF build system when targeting ESP32 (Xtensa architecture)
    // Build scripts run on the host, so we check the TARGET env var
    if let Ok(target) = std::env::var("TARGET") {
        if target.contains("xtensa") {
            embuild::espidf::sysenv::output();
        }
    }
}

/// Load firmware configuration from a `.env` file.
///
/// Environment variables take priority over `.env` values. Only keys that are
/// set (and non-empty) are forwarded, so `option_env!` sees `None` otherwise.
fn load_env_config() {
    use std::env;
    use std::path::Path;

    println!("cargo:rerun-if-changed=.env");
    for key in CONFIG_KEYS {
        println!("cargo:rerun-if-env-changed={}", key);
    }

    if Path::new(".env").exists() {
        match dotenvy::dotenv() {
            Ok(_) => println!("cargo:warning=Loaded .env file"),
            Err(e) => println!("cargo:warning=Failed to load .env file: {}", e),
        }
    }

    for key in CONFIG_KEYS {
        let value = env::var(key).unwrap_or_default().trim().to_string();
        if !value.is_empty() {
            println!("cargo:rustc-env={}={}", key, value);
        }
    }

    if env::var("API_URI").map(|v| v.trim().is_empty()).unwrap_or(true) {
        println!("cargo:warning=API_URI is empty - firmware will halt at boot");
    }
}
