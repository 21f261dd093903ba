//! WiFi station-mode bring-up.
//!
//! The controller needs the network only as a carrier for the broker
//! session, so this adapter does one thing: join the configured AP at boot,
//! retrying a few times.  Link loss later on surfaces as bus transport
//! errors and is handled by the sync layer's reconnect pacing.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::BlockingWifi`.
//! - **all other targets**: credential validation only (host tests).

use core::fmt;

#[cfg(target_os = "espidf")]
use log::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WifiError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl std::error::Error for WifiError {}

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

impl WifiCredentials {
    /// Validate and copy credentials into fixed-size buffers.
    pub fn new(ssid: &str, password: &str) -> Result<Self, WifiError> {
        if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
            return Err(WifiError::InvalidSsid);
        }
        if !password.is_empty() && !(8..=64).contains(&password.len()) {
            return Err(WifiError::InvalidPassword);
        }
        let mut creds = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        creds
            .ssid
            .push_str(ssid)
            .map_err(|()| WifiError::InvalidSsid)?;
        creds
            .password
            .push_str(password)
            .map_err(|()| WifiError::InvalidPassword)?;
        Ok(creds)
    }

    /// Credentials baked in at build time (`LIGHTSYNC_WIFI_SSID` /
    /// `LIGHTSYNC_WIFI_PASSWORD`).
    pub fn from_build_env() -> Result<Self, WifiError> {
        let ssid = option_env!("LIGHTSYNC_WIFI_SSID").ok_or(WifiError::NoCredentials)?;
        Self::new(ssid, option_env!("LIGHTSYNC_WIFI_PASSWORD").unwrap_or(""))
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

// ───────────────────────────────────────────────────────────────
// Station bring-up (ESP-IDF)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn bring_up(
    modem: esp_idf_svc::hal::modem::Modem,
    sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
    nvs: esp_idf_svc::nvs::EspDefaultNvsPartition,
    creds: &WifiCredentials,
    attempts: u32,
) -> Result<esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>, WifiError> {
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

    let esp_wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs)).map_err(|e| {
        warn!("WiFi: driver init failed: {}", e);
        WifiError::ConnectionFailed
    })?;
    let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop).map_err(|e| {
        warn!("WiFi: event wrap failed: {}", e);
        WifiError::ConnectionFailed
    })?;

    let auth_method = if creds.is_open() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: creds.ssid.clone(),
        password: creds.password.clone(),
        auth_method,
        ..Default::default()
    }))
    .map_err(|_| WifiError::ConnectionFailed)?;
    wifi.start().map_err(|_| WifiError::ConnectionFailed)?;

    for attempt in 1..=attempts {
        info!("WiFi: connecting to '{}' (attempt {}/{})", creds.ssid, attempt, attempts);
        match wifi.connect().and_then(|()| wifi.wait_netif_up()) {
            Ok(()) => {
                if let Ok(ip) = wifi.wifi().sta_netif().get_ip_info() {
                    info!("WiFi: connected, ip={}", ip.ip);
                }
                return Ok(wifi);
            }
            Err(e) => {
                warn!("WiFi: attempt {} failed: {}", attempt, e);
                let _ = wifi.disconnect();
            }
        }
    }
    Err(WifiError::ConnectionFailed)
}
