//! Fuzz target: manifest body parsing
//!
//! Feeds arbitrary bytes to `parse_manifest` and checks:
//! - No panics on arbitrary bodies
//! - A complete result always carries both fields
//!
//! cargo fuzz run fuzz_manifest_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use otaresolver::manifest::parse_manifest;

fuzz_target!(|data: &[u8]| {
    if let Ok(info) = parse_manifest(data) {
        if info.is_complete() {
            assert!(!info.version.is_empty());
            assert!(!info.url.is_empty());
        }
    }
});
