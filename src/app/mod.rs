//! Application core: discovery orchestration behind port traits.
//!
//! The [`service::RdmService`] wraps a per-port discovery engine and the
//! last published table of devices.  All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without a real RS-485 bus.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
