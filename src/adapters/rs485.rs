//! Half-duplex RS-485 transport.
//!
//! Implements [`RdmTransport`] on top of any UART that can generate a DMX
//! BREAK ([`RdmUart`]) and an `embedded-hal` output pin that drives the
//! transceiver's driver-enable (DE / !RE) line.
//!
//! ```text
//!   DE high ─▶ BREAK + MAB ─▶ frame ─▶ wait TX done ─▶ DE low ─▶ read
//! ```
//!
//! Hardware faults never reach the engine: they are logged, counted, and
//! reported as "no reply".

use core::fmt::Debug;
use core::time::Duration;

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::RdmTransport;
use crate::error::TransportError;

/// Large enough for any discovery reply, even a garbled one.
pub const RX_BUFFER_SIZE: usize = 64;

/// Minimum UART capabilities for RDM.
pub trait RdmUart {
    type Error: Debug;

    /// Drop any bytes already sitting in the receive FIFO.
    fn clear_rx(&mut self) -> Result<(), Self::Error>;

    /// BREAK (>= 176 µs low) followed by mark-after-break (>= 12 µs high).
    fn send_break(&mut self) -> Result<(), Self::Error>;

    /// Queue `bytes` and block until the last stop bit has left the wire.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Collect a reply into `buf`.
    ///
    /// Returns 0 when nothing arrived within `timeout`; otherwise reads
    /// until the line goes idle or `buf` is full.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, Self::Error>;
}

pub struct Rs485Transport<U, P> {
    uart: U,
    driver_enable: P,
    rx: [u8; RX_BUFFER_SIZE],
    faults: u32,
}

impl<U: RdmUart, P: OutputPin> Rs485Transport<U, P> {
    pub fn new(uart: U, driver_enable: P) -> Self {
        Self {
            uart,
            driver_enable,
            rx: [0; RX_BUFFER_SIZE],
            faults: 0,
        }
    }

    /// Hardware faults seen since construction.
    pub fn faults(&self) -> u32 {
        self.faults
    }

    pub fn release(self) -> (U, P) {
        (self.uart, self.driver_enable)
    }

    fn transmit(&mut self, request: &[u8]) -> Result<(), TransportError> {
        self.uart.clear_rx().map_err(|_| TransportError::Read)?;
        self.driver_enable
            .set_high()
            .map_err(|_| TransportError::DirectionPin)?;
        self.uart.send_break().map_err(|_| TransportError::Break)?;
        self.uart
            .write_all(request)
            .map_err(|_| TransportError::Write)?;
        self.driver_enable
            .set_low()
            .map_err(|_| TransportError::DirectionPin)
    }

    fn fault(&mut self, e: TransportError) {
        self.faults = self.faults.saturating_add(1);
        warn!("RS485: {} (fault #{})", e, self.faults);
    }
}

impl<U: RdmUart, P: OutputPin> RdmTransport for Rs485Transport<U, P> {
    fn send_and_wait(&mut self, request: &[u8], timeout: Duration) -> Option<&[u8]> {
        if let Err(e) = self.transmit(request) {
            // Never leave the bus driven after a failed send.
            let _ = self.driver_enable.set_low();
            self.fault(e);
            return None;
        }

        match self.uart.read(&mut self.rx, timeout) {
            Ok(0) => None,
            Ok(n) => Some(&self.rx[..n.min(RX_BUFFER_SIZE)]),
            Err(e) => {
                warn!("RS485: read error {:?}", e);
                self.fault(TransportError::Read);
                None
            }
        }
    }
}
