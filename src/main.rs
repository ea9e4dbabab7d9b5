//! RDM discovery node: firmware entry point.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                    │
//! │                                                           │
//! │  Rs485Transport   SystemClock   LogEventSink   NvsAdapter │
//! │  (RdmTransport)   (Clock)       (EventSink)    (Config)   │
//! │                                                           │
//! │  ─────────────── Port Trait Boundary ──────────────────   │
//! │                                                           │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │  RdmService · DiscoveryEngine · TOD (pure logic)    │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Wiring (UART1, MAX485-class transceiver):
//! TX = GPIO17, RX = GPIO18, DE/!RE = GPIO21.
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyIOPin, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{UartDriver, config as uart_cfg};
use esp_idf_hal::units::Hertz;

use rdm_discovery::adapters::device_id;
use rdm_discovery::adapters::esp_uart::{EspRdmUart, RDM_BAUD};
use rdm_discovery::adapters::log_sink::LogEventSink;
use rdm_discovery::adapters::nvs::NvsAdapter;
use rdm_discovery::adapters::rs485::Rs485Transport;
use rdm_discovery::adapters::time::SystemClock;
use rdm_discovery::app::commands::{RdmCommand, RdmReply};
use rdm_discovery::app::ports::ConfigPort;
use rdm_discovery::app::service::RdmService;
use rdm_discovery::config::DiscoveryConfig;
use rdm_discovery::drivers::watchdog::{WATCHDOG_TIMEOUT_MS, Watchdog};

/// Presence re-check of known devices.
const REFRESH_INTERVAL_SECS: u64 = 30;
/// Full rediscovery, catches newly connected devices.
const FULL_INTERVAL_SECS: u64 = 300;
const PORT: u8 = 0;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("RDM discovery node v{}", env!("CARGO_PKG_VERSION"));

    let watchdog = Watchdog::new(WATCHDOG_TIMEOUT_MS);

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = NvsAdapter::new(PORT)?;
    let mut config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            DiscoveryConfig::default()
        }
    };
    config.port = PORT;
    if let Err(e) = config.validate() {
        warn!("Stored config invalid ({}), using defaults", e);
        config = DiscoveryConfig {
            port: PORT,
            ..DiscoveryConfig::default()
        };
    }

    // ── 3. Controller identity ────────────────────────────────
    let controller_uid = config
        .controller_uid
        .unwrap_or_else(|| device_id::controller_uid(&device_id::read_mac()));
    info!("Controller UID: {}", controller_uid);

    // ── 4. RS-485 port ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let uart_config = uart_cfg::Config::new()
        .baudrate(Hertz(RDM_BAUD))
        .stop_bits(uart_cfg::StopBits::STOP2);
    let uart = UartDriver::new(
        peripherals.uart1,
        peripherals.pins.gpio17,
        peripherals.pins.gpio18,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &uart_config,
    )?;
    let mut driver_enable = PinDriver::output(peripherals.pins.gpio21)?;
    driver_enable.set_low()?;

    let transport = Rs485Transport::new(EspRdmUart::new(uart), driver_enable);

    // ── 5. Service ────────────────────────────────────────────
    let mut sink = LogEventSink::new();
    let mut rdm = RdmService::new(transport, SystemClock::new(), controller_uid, config);
    if let Some(reply) = rdm.start(&mut sink) {
        info!("Startup discovery: {:?}", reply);
    }
    watchdog.feed();

    // ── 6. Maintenance loop ───────────────────────────────────
    let mut seconds: u64 = 0;
    loop {
        FreeRtos::delay_ms(1000);
        watchdog.feed();
        seconds += 1;

        let cmd = if seconds % FULL_INTERVAL_SECS == 0 {
            RdmCommand::FullDiscovery
        } else if seconds % REFRESH_INTERVAL_SECS == 0 {
            RdmCommand::Incremental
        } else {
            continue;
        };

        match rdm.handle_command(cmd, &mut sink) {
            RdmReply::Disabled => {}
            RdmReply::TodUpdated { devices, complete } => {
                info!("TOD: {} device(s){}", devices, if complete { "" } else { " (partial)" });
            }
            RdmReply::Presence { uid, present } => info!("{}: present={}", uid, present),
        }
        watchdog.feed();
    }
}
