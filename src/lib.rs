//! RDM discovery firmware library.
//!
//! Exposes the discovery core and its adapters for integration testing
//! and for the firmware binary.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod discovery;
pub mod drivers;
pub mod error;
pub mod rdm;

pub use error::{Error, Result};
