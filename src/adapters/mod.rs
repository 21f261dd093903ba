//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements   | Connects to                   |
//! |-------------|--------------|-------------------------------|
//! | `mqtt`      | BusTransport | ESP-IDF MQTT client           |
//! | `log_sink`  | EventSink    | Serial log output             |
//! | `nvs`       | ConfigPort   | NVS / in-memory store         |
//! | `time`      | Clock        | ESP32 system timer            |
//! | `device_id` | -            | Factory MAC (eFuse)           |
//! | `wifi`      | -            | ESP-IDF WiFi STA (boot only)  |

pub mod device_id;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod time;
pub mod wifi;
