//! Fuzz target: loading the persisted version record
//!
//! Uses the input as the raw 64-byte region image and checks:
//! - No panics on arbitrary region contents
//! - The loaded version is empty or passes the format check
//! - An empty or rejected record leaves the region zeroed
//!
//! cargo fuzz run fuzz_version_store_load

#![no_main]

use libfuzzer_sys::fuzz_target;
use otaresolver::adapters::log_sink::LineSink;
use otaresolver::adapters::nvs::NvsRegion;
use otaresolver::version::is_valid_version_format;
use otaresolver::version_store::{VERSION_REGION_SIZE, VersionStore};

fuzz_target!(|data: &[u8]| {
    let mut region = [0u8; VERSION_REGION_SIZE];
    let n = data.len().min(VERSION_REGION_SIZE);
    region[..n].copy_from_slice(&data[..n]);

    let mut sink = LineSink::new(|_: &str| {});
    let mut store = VersionStore::new(NvsRegion::with_image(region));
    let current = store.load(&mut sink).to_owned();

    assert!(current.is_empty() || is_valid_version_format(&current));
    if current.is_empty() {
        assert!(store.nvm().image().iter().all(|&b| b == 0));
    }
});
