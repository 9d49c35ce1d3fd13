//! Flash update-partition adapter.
//!
//! Implements [`FlashSink`] for the inactive OTA partition.
//!
//! - **`target_os = "espidf"`**: `esp_ota::OtaUpdate`; finalize verifies the
//!   image and marks the partition bootable.
//! - **all other targets**: captures the image in memory. Failures can be
//!   injected at begin, on a given chunk, or at finalize.

use log::{info, warn};

use crate::app::ports::FlashSink;
use crate::error::WriteError;

pub struct OtaFlashSink {
    #[cfg(target_os = "espidf")]
    ota_update: Option<esp_ota::OtaUpdate>,
    finished: bool,
    #[cfg(not(target_os = "espidf"))]
    sim: SimFlash,
}

/// In-memory partition and failure switches for the host backend.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
struct SimFlash {
    image: Vec<u8>,
    open: bool,
    chunks: usize,
    aborts: usize,
    expected: Option<u64>,
    fail_begin: bool,
    short_write_on_chunk: Option<usize>,
    fail_finalize: bool,
    leave_unfinished: bool,
}

impl OtaFlashSink {
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "espidf")]
            ota_update: None,
            finished: false,
            #[cfg(not(target_os = "espidf"))]
            sim: SimFlash::default(),
        }
    }
}

impl Default for OtaFlashSink {
    fn default() -> Self {
        Self::new()
    }
}

// ── Simulation controls ──────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl OtaFlashSink {
    /// Bytes accepted since the last `begin`.
    pub fn image(&self) -> &[u8] {
        &self.sim.image
    }

    /// Size hint passed to the last `begin`.
    pub fn expected_size(&self) -> Option<u64> {
        self.sim.expected
    }

    pub fn chunks_written(&self) -> usize {
        self.sim.chunks
    }

    pub fn aborts(&self) -> usize {
        self.sim.aborts
    }

    pub fn fail_begin(&mut self, fail: bool) {
        self.sim.fail_begin = fail;
    }

    /// Accept only half of chunk `n` (0-based) of the next download.
    pub fn short_write_on_chunk(&mut self, n: Option<usize>) {
        self.sim.short_write_on_chunk = n;
    }

    pub fn fail_finalize(&mut self, fail: bool) {
        self.sim.fail_finalize = fail;
    }

    /// Let finalize succeed but report the image as not bootable.
    pub fn leave_unfinished(&mut self, unfinished: bool) {
        self.sim.leave_unfinished = unfinished;
    }
}

impl FlashSink for OtaFlashSink {
    #[cfg(target_os = "espidf")]
    fn begin(&mut self, expected_size: Option<u64>) -> Result<(), WriteError> {
        self.finished = false;
        let update = esp_ota::OtaUpdate::begin().map_err(|e| {
            warn!("esp-ota begin failed: {:?}", e);
            WriteError::BeginFailed
        })?;
        self.ota_update = Some(update);
        info!("flash: update partition opened (expected {:?} bytes)", expected_size);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn write(&mut self, data: &[u8]) -> usize {
        let Some(update) = self.ota_update.as_mut() else {
            return 0;
        };
        match update.write(data) {
            Ok(()) => data.len(),
            Err(e) => {
                warn!("esp-ota write failed: {:?}", e);
                0
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn abort(&mut self) {
        // esp-ota aborts the session when OtaUpdate is dropped.
        if self.ota_update.take().is_some() {
            warn!("flash: update aborted");
        }
    }

    #[cfg(target_os = "espidf")]
    fn finalize(&mut self) -> Result<(), WriteError> {
        let update = self.ota_update.take().ok_or(WriteError::FinalizeFailed)?;
        let mut completed = update.finalize().map_err(|e| {
            warn!("esp-ota finalize failed: {:?}", e);
            WriteError::FinalizeFailed
        })?;
        completed.set_as_boot_partition().map_err(|e| {
            warn!("esp-ota set_as_boot_partition failed: {:?}", e);
            WriteError::FinalizeFailed
        })?;
        self.finished = true;
        info!("flash: image verified, boot partition switched");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn begin(&mut self, expected_size: Option<u64>) -> Result<(), WriteError> {
        self.finished = false;
        if self.sim.fail_begin {
            return Err(WriteError::BeginFailed);
        }
        self.sim.image.clear();
        self.sim.chunks = 0;
        self.sim.expected = expected_size;
        self.sim.open = true;
        info!("flash(sim): update partition opened (expected {:?} bytes)", expected_size);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, data: &[u8]) -> usize {
        if !self.sim.open {
            return 0;
        }
        let accepted = if self.sim.short_write_on_chunk == Some(self.sim.chunks) {
            data.len() / 2
        } else {
            data.len()
        };
        self.sim.image.extend_from_slice(&data[..accepted]);
        self.sim.chunks += 1;
        accepted
    }

    #[cfg(not(target_os = "espidf"))]
    fn abort(&mut self) {
        if self.sim.open {
            self.sim.open = false;
            self.sim.aborts += 1;
            warn!("flash(sim): update aborted after {} bytes", self.sim.image.len());
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn finalize(&mut self) -> Result<(), WriteError> {
        // A rejected or unbootable image keeps the session open for abort().
        if !self.sim.open || self.sim.fail_finalize {
            return Err(WriteError::FinalizeFailed);
        }
        self.finished = !self.sim.leave_unfinished;
        self.sim.open = !self.finished;
        info!("flash(sim): image finalized ({} bytes)", self.sim.image.len());
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}
