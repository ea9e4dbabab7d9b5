//! [`RdmUart`] for the ESP-IDF UART driver.
//!
//! The UART runs at 250 kbaud 8N2.  BREAK is produced by inverting the TX
//! line for 176 µs; the reply is polled from the RX ring buffer until the
//! first byte arrives or the timeout expires, then until the line has been
//! idle for [`IDLE_GAP_US`].

use core::time::Duration;

use esp_idf_hal::delay::NON_BLOCK;
use esp_idf_hal::uart::UartDriver;
use esp_idf_svc::sys::{
    EspError, esp_rom_delay_us, esp_timer_get_time, uart_set_line_inverse,
    uart_signal_inv_t_UART_SIGNAL_INV_DISABLE, uart_signal_inv_t_UART_SIGNAL_TXD_INV,
};

use super::rs485::RdmUart;

/// DMX / RDM line rate.
pub const RDM_BAUD: u32 = 250_000;

const BREAK_US: u32 = 176;
const MAB_US: u32 = 12;
/// Two character times at 250 kbaud.
const IDLE_GAP_US: i64 = 88;
const POLL_US: u32 = 10;

/// How long to wait for `write_all` to drain (FreeRTOS ticks).
const TX_DONE_TICKS: u32 = 10;

pub struct EspRdmUart<'d> {
    driver: UartDriver<'d>,
}

impl<'d> EspRdmUart<'d> {
    pub fn new(driver: UartDriver<'d>) -> Self {
        Self { driver }
    }
}

fn now_us() -> i64 {
    unsafe { esp_timer_get_time() }
}

impl RdmUart for EspRdmUart<'_> {
    type Error = EspError;

    fn clear_rx(&mut self) -> Result<(), EspError> {
        self.driver.clear_rx()
    }

    fn send_break(&mut self) -> Result<(), EspError> {
        let port = self.driver.port();
        // SAFETY: the port is owned by `self.driver` and no transmission is
        // in flight; write_all always waits for TX done.
        unsafe {
            EspError::convert(uart_set_line_inverse(
                port,
                uart_signal_inv_t_UART_SIGNAL_TXD_INV,
            ))?;
            esp_rom_delay_us(BREAK_US);
            EspError::convert(uart_set_line_inverse(
                port,
                uart_signal_inv_t_UART_SIGNAL_INV_DISABLE,
            ))?;
            esp_rom_delay_us(MAB_US);
        }
        Ok(())
    }

    fn write_all(&mut self, mut bytes: &[u8]) -> Result<(), EspError> {
        while !bytes.is_empty() {
            let n = self.driver.write(bytes)?;
            bytes = &bytes[n..];
        }
        self.driver.wait_tx_done(TX_DONE_TICKS)
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, EspError> {
        let deadline = now_us() + i64::try_from(timeout.as_micros()).unwrap_or(i64::MAX);
        let mut len = 0;
        let mut last_rx = 0;

        while len < buf.len() {
            let n = self.driver.read(&mut buf[len..], NON_BLOCK)?;
            let now = now_us();
            if n > 0 {
                len += n;
                last_rx = now;
            } else if len > 0 && now - last_rx >= IDLE_GAP_US {
                break;
            } else if len == 0 && now >= deadline {
                break;
            }
            unsafe { esp_rom_delay_us(POLL_US) };
        }
        Ok(len)
    }
}
