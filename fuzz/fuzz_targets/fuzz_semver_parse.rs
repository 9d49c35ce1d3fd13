//! Fuzz target: version parsing and the update decision
//!
//! Splits the input at the first `|` into a current and a candidate
//! version and checks:
//! - No panics on arbitrary text
//! - A successful parse renders back to the same triple
//! - An update is never required in both directions
//!
//! cargo fuzz run fuzz_semver_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use otaresolver::version::{SemVer, is_update_required};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let (current, candidate) = text.split_once('|').unwrap_or((text, ""));

    if let Ok(v) = SemVer::parse(current) {
        assert_eq!(SemVer::parse(&v.to_string()), Ok(v));
    }

    if !current.is_empty() && !candidate.is_empty() {
        assert!(
            !(is_update_required(current, candidate) && is_update_required(candidate, current)),
            "{current} and {candidate} both supersede each other"
        );
    }
});
