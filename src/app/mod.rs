//! Application core: update orchestration, zero direct I/O.
//!
//! The poll cycle (resolve manifest, compare versions, stream and commit
//! the image) lives in [`service`]. All interaction with the network,
//! flash and NVM happens through the **port traits** in [`ports`], keeping
//! this layer testable without a device.

pub mod events;
pub mod ports;
pub mod service;
