//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock or simulated buses.  All tests run on the host (x86_64)
//! with no real hardware required.

mod discovery_tests;
mod mock_bus;
mod service_tests;
