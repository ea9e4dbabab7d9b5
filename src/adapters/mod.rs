//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements    | Connects to                        |
//! |-------------|---------------|------------------------------------|
//! | `rs485`     | RdmTransport  | Any `RdmUart` + DE pin             |
//! | `esp_uart`  | RdmUart       | ESP-IDF UART driver (250 kbaud)    |
//! | `sim_bus`   | RdmTransport  | Virtual responders (host / tests)  |
//! | `time`      | Clock         | ESP32 system timer / `Instant`     |
//! | `log_sink`  | EventSink     | Serial log output                  |
//! | `nvs`       | ConfigPort    | NVS / in-memory store              |
//! | `device_id` | (none)        | Factory MAC → controller UID       |

pub mod device_id;
#[cfg(target_os = "espidf")]
pub mod esp_uart;
pub mod log_sink;
pub mod nvs;
pub mod rs485;
pub mod sim_bus;
pub mod time;
