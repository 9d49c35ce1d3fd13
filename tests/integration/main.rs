//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that drives the service end to end
//! through the crate's host simulation adapters. All tests run on the host
//! with no hardware or network required.

mod mocks;
mod scheduler_tests;
mod update_cycle_tests;
