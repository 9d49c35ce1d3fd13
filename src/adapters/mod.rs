//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements         | Connects to                     |
//! |------------|--------------------|---------------------------------|
//! | `flash`    | FlashSink          | Inactive OTA app partition      |
//! | `http`     | HttpClient         | ESP-IDF HTTP(S) client          |
//! | `log_sink` | EventSink          | Serial log output / closures    |
//! | `nvs`      | NvmRegion          | NVS blob / in-memory region     |
//! | `restart`  | RestartPort        | Chip reset                      |
//! | `time`     | DelayNs, clock     | ESP32 system timer, FreeRTOS    |
//! | `wifi`     | ReadinessPort      | ESP-IDF WiFi STA                |
//!
//! Every adapter carries a host simulation backend behind
//! `#[cfg(not(target_os = "espidf"))]`.

pub mod flash;
pub mod http;
pub mod log_sink;
pub mod nvs;
pub mod restart;
pub mod time;
pub(crate) mod utils;
pub mod wifi;
