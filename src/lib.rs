//! OTA firmware update resolver.
//!
//! Polls an authenticated HTTP manifest, compares the advertised version
//! with the one recorded in NVM, streams newer images into the inactive
//! flash partition and restarts into them.
//!
//! The update core (`app`, `manifest`, `ota`, `scheduler`, `version`,
//! `version_store`) is platform-independent. ESP-IDF code lives in
//! `adapters` behind `#[cfg(target_os = "espidf")]`, with host simulation
//! backends for everything else.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod manifest;
pub mod ota;
pub mod scheduler;
pub mod version;
pub mod version_store;

pub use app::service::{CycleOutcome, OtaService};
pub use error::{Error, Result};
pub use manifest::VersionInfo;
pub use version::{SemVer, is_update_required};
