//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`NvmRegion`] as a fixed 64-byte region.
//!
//! - **`target_os = "espidf"`**: the region is a single blob (`ota`/`version`)
//!   in the default NVS partition. Reads of a missing blob return zeros;
//!   every write is a read-modify-write of the whole blob followed by
//!   `nvs_commit()`, which is atomic.
//! - **all other targets**: an in-memory image with failure injection for
//!   host tests and the simulation binary.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::NvmRegion;
use crate::error::StorageError;
use crate::version_store::VERSION_REGION_SIZE;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const NAMESPACE: &core::ffi::CStr = c"ota";
#[cfg(target_os = "espidf")]
const KEY: &core::ffi::CStr = c"version";

pub struct NvsRegion {
    #[cfg(not(target_os = "espidf"))]
    image: [u8; VERSION_REGION_SIZE],
    #[cfg(not(target_os = "espidf"))]
    fail_open: bool,
    #[cfg(not(target_os = "espidf"))]
    fail_commit: bool,
    #[cfg(not(target_os = "espidf"))]
    commits: usize,
}

fn check_bounds(offset: usize, len: usize) -> Result<(), StorageError> {
    match offset.checked_add(len) {
        Some(end) if end <= VERSION_REGION_SIZE => Ok(()),
        _ => Err(StorageError::OutOfBounds),
    }
}

impl NvsRegion {
    /// Initialise NVS flash and open the region.
    ///
    /// On first boot or after a partition format change the NVS partition
    /// is erased and re-initialised.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Result<Self, StorageError> {
        // SAFETY: called from the main task before any concurrent NVS access.
        let ret = unsafe { nvs_flash_init() };
        if ret == ESP_ERR_NVS_NO_FREE_PAGES as esp_err_t
            || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as esp_err_t
        {
            warn!("NVS: erasing and re-initialising flash partition");
            esp!(unsafe { nvs_flash_erase() }).map_err(|_| StorageError::OpenFailed)?;
            esp!(unsafe { nvs_flash_init() }).map_err(|_| StorageError::OpenFailed)?;
        } else {
            esp!(ret).map_err(|_| StorageError::OpenFailed)?;
        }
        info!("NvsRegion: ESP-IDF NVS initialised");
        Ok(Self {})
    }

    /// A blank (all-zero) in-memory region.
    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self, StorageError> {
        info!("NvsRegion: simulation backend");
        Ok(Self::with_image([0u8; VERSION_REGION_SIZE]))
    }

    /// Open the `ota` namespace, run `f` with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, EspError>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, EspError>,
    {
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut handle: nvs_handle_t = 0;
        esp!(unsafe { nvs_open(NAMESPACE.as_ptr(), mode, &mut handle) })?;
        let result = f(handle);
        unsafe { nvs_close(handle) };
        result
    }
}

#[cfg(target_os = "espidf")]
fn is_not_found(e: &EspError) -> bool {
    e.code() == ESP_ERR_NVS_NOT_FOUND as esp_err_t
}

/// Read the blob into `image`; a missing blob leaves it zeroed.
#[cfg(target_os = "espidf")]
fn read_blob(handle: nvs_handle_t, image: &mut [u8; VERSION_REGION_SIZE]) -> Result<(), EspError> {
    let mut size = VERSION_REGION_SIZE;
    match esp!(unsafe { nvs_get_blob(handle, KEY.as_ptr(), image.as_mut_ptr().cast(), &mut size) }) {
        Err(e) if is_not_found(&e) => Ok(()),
        other => other,
    }
}

// ── Simulation controls ──────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl NvsRegion {
    pub fn with_image(image: [u8; VERSION_REGION_SIZE]) -> Self {
        Self {
            image,
            fail_open: false,
            fail_commit: false,
            commits: 0,
        }
    }

    pub fn image(&self) -> &[u8; VERSION_REGION_SIZE] {
        &self.image
    }

    /// Number of successful commits.
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Make every subsequent access fail to open the region.
    pub fn set_fail_open(&mut self, fail: bool) {
        self.fail_open = fail;
    }

    /// Make every subsequent write fail at commit, leaving content intact.
    pub fn set_fail_commit(&mut self, fail: bool) {
        self.fail_commit = fail;
    }
}

impl NvmRegion for NvsRegion {
    #[cfg(target_os = "espidf")]
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        check_bounds(offset, buf.len())?;
        let mut image = [0u8; VERSION_REGION_SIZE];
        match Self::with_nvs_handle(false, |handle| read_blob(handle, &mut image)) {
            Ok(()) => {}
            // Namespace never written: blank region.
            Err(e) if is_not_found(&e) => {}
            Err(e) => {
                warn!("NvsRegion: read failed ({e})");
                return Err(StorageError::OpenFailed);
            }
        }
        buf.copy_from_slice(&image[offset..offset + buf.len()]);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        check_bounds(offset, data.len())?;
        let mut opened = false;
        Self::with_nvs_handle(true, |handle| {
            opened = true;
            let mut image = [0u8; VERSION_REGION_SIZE];
            read_blob(handle, &mut image)?;
            image[offset..offset + data.len()].copy_from_slice(data);
            esp!(unsafe {
                nvs_set_blob(handle, KEY.as_ptr(), image.as_ptr().cast(), VERSION_REGION_SIZE)
            })?;
            esp!(unsafe { nvs_commit(handle) })
        })
        .map_err(|e| {
            warn!("NvsRegion: write failed ({e})");
            if opened {
                StorageError::CommitFailed
            } else {
                StorageError::OpenFailed
            }
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        check_bounds(offset, buf.len())?;
        if self.fail_open {
            return Err(StorageError::OpenFailed);
        }
        buf.copy_from_slice(&self.image[offset..offset + buf.len()]);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        check_bounds(offset, data.len())?;
        if self.fail_open {
            return Err(StorageError::OpenFailed);
        }
        if self.fail_commit {
            return Err(StorageError::CommitFailed);
        }
        self.image[offset..offset + data.len()].copy_from_slice(data);
        self.commits += 1;
        Ok(())
    }
}
