//! Persisted firmware version.
//!
//! Layout: a 64-byte NVM region holding a NUL-terminated ASCII version
//! string at offset 0, nothing else. The in-memory copy is loaded once at
//! startup and replaced only after a successful commit.

use heapless::String;

use crate::app::events::OtaEvent;
use crate::app::ports::{EventSink, NvmRegion};
use crate::version::is_valid_version_format;

/// Region capacity in bytes, terminator included.
pub const VERSION_REGION_SIZE: usize = 64;
/// Offset of the version string within the region.
pub const VERSION_ADDR: usize = 0;
/// Longest version that fits alongside its terminator.
pub const VERSION_MAX_LEN: usize = VERSION_REGION_SIZE - 1;

pub struct VersionStore<N> {
    nvm: N,
    current: String<VERSION_MAX_LEN>,
}

impl<N: NvmRegion> VersionStore<N> {
    /// Wrap the region. Does not touch NVM; call [`load`](Self::load).
    pub fn new(nvm: N) -> Self {
        Self {
            nvm,
            current: String::new(),
        }
    }

    /// The in-memory version (empty if none is recorded).
    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn nvm(&self) -> &N {
        &self.nvm
    }

    /// Read the persisted version into memory.
    ///
    /// Malformed content resets the region to zeros and yields an empty
    /// version. If the region cannot be opened the in-memory value is kept.
    pub fn load(&mut self, events: &mut impl EventSink) -> &str {
        let mut image = [0u8; VERSION_REGION_SIZE];
        if let Err(e) = self.nvm.read(VERSION_ADDR, &mut image) {
            events.emit(&OtaEvent::StorageFailed(e));
            return &self.current;
        }

        let len = image[..VERSION_MAX_LEN]
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(VERSION_MAX_LEN);

        self.current.clear();
        match core::str::from_utf8(&image[..len]) {
            Ok(s) if is_valid_version_format(s) => {
                // len <= VERSION_MAX_LEN, so this always fits.
                let _ = self.current.push_str(s);
                events.emit(&OtaEvent::VersionLoaded(&self.current));
            }
            // An empty string fails the format check too, but a region that
            // is already all zero needs no rewrite.
            Ok("") => {
                events.emit(&OtaEvent::VersionMissing);
                if image.iter().any(|&b| b != 0) {
                    self.reset_region(events);
                }
            }
            _ => {
                events.emit(&OtaEvent::VersionCorrupted);
                self.reset_region(events);
            }
        }
        &self.current
    }

    /// Persist `version`, truncated to [`VERSION_MAX_LEN`] bytes at a
    /// character boundary. Returns whether the commit succeeded; on failure
    /// the in-memory version is unchanged.
    pub fn save(&mut self, version: &str, events: &mut impl EventSink) -> bool {
        let stored = truncate_to_fit(version);

        let mut image = [0u8; VERSION_REGION_SIZE];
        image[..stored.len()].copy_from_slice(stored.as_bytes());
        // Terminator is already zero; include it in the write.
        if let Err(e) = self.nvm.write(VERSION_ADDR, &image[..=stored.len()]) {
            events.emit(&OtaEvent::StorageFailed(e));
            return false;
        }

        self.current.clear();
        let _ = self.current.push_str(stored);
        events.emit(&OtaEvent::VersionSaved(&self.current));
        true
    }

    fn reset_region(&mut self, events: &mut impl EventSink) {
        match self.nvm.write(VERSION_ADDR, &[0u8; VERSION_REGION_SIZE]) {
            Ok(()) => events.emit(&OtaEvent::RegionReset),
            Err(e) => events.emit(&OtaEvent::StorageFailed(e)),
        }
    }
}

fn truncate_to_fit(version: &str) -> &str {
    if version.len() <= VERSION_MAX_LEN {
        return version;
    }
    let mut end = VERSION_MAX_LEN;
    while !version.is_char_boundary(end) {
        end -= 1;
    }
    &version[..end]
}
