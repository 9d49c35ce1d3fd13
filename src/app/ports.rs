//! Port traits: the hexagonal boundary between the update core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ OtaService (domain)
//! ```
//!
//! Driven adapters (HTTP client, flash partition, NVM, restart, logging)
//! implement these traits. The [`OtaService`](super::service::OtaService)
//! consumes them via generics, so the update core never touches the
//! network stack or flash directly.

use core::fmt;

use crate::error::{StorageError, TransportError, WriteError};

use super::events::OtaEvent;

// ───────────────────────────────────────────────────────────────
// HTTP port (driven adapter: domain → network)
// ───────────────────────────────────────────────────────────────

/// Response head plus the body stream of a single GET.
pub struct HttpResponse<B> {
    pub status: u16,
    /// Declared `Content-Length`; `None` when the server did not send one
    /// (chunked or close-delimited body).
    pub content_length: Option<u64>,
    pub body: B,
}

impl<B> HttpResponse<B> {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Body of an HTTP response, consumed incrementally.
pub trait ByteStream {
    /// Bytes that can be read right now without waiting on the network.
    fn available(&mut self) -> usize;

    /// Read into `buf`. May block until at least one byte arrives; returns
    /// `Ok(0)` once the body is exhausted.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Whether the connection is still live or has unread bytes.
    fn is_connected(&mut self) -> bool;
}

/// Issues authenticated GET requests. Each call opens its own connection;
/// dropping the returned body closes it.
pub trait HttpClient {
    type Body: ByteStream;

    fn get(
        &mut self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse<Self::Body>, TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Flash port (driven adapter: domain → update partition)
// ───────────────────────────────────────────────────────────────

/// Receives firmware bytes and commits them to the inactive partition.
pub trait FlashSink {
    /// Prepare the partition. `expected_size` is `None` for unknown-length
    /// downloads.
    fn begin(&mut self, expected_size: Option<u64>) -> Result<(), WriteError>;

    /// Write one chunk. Returns how many bytes were accepted; anything less
    /// than `data.len()` is a failure.
    fn write(&mut self, data: &[u8]) -> usize;

    /// Discard the partially written image.
    fn abort(&mut self);

    /// Verify the image and mark it bootable.
    fn finalize(&mut self) -> Result<(), WriteError>;

    /// Whether the last finalize produced a complete, bootable image.
    fn is_finished(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// NVM port (driven adapter: domain ↔ non-volatile region)
// ───────────────────────────────────────────────────────────────

/// A fixed-capacity byte region that survives power loss.
///
/// Implementations must reject any access crossing the region boundary
/// with [`StorageError::OutOfBounds`]. Writes are committed before
/// returning; a failed commit leaves the previous content in place.
pub trait NvmRegion {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Restart port
// ───────────────────────────────────────────────────────────────

/// Reboots the device. On hardware this does not return.
pub trait RestartPort {
    fn restart(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// Every component reports through this port; adapters decide where the
/// lines go (serial log, test recorder, ...).
pub trait EventSink {
    fn emit(&mut self, event: &OtaEvent<'_>);
}

impl<E: EventSink + ?Sized> EventSink for &mut E {
    fn emit(&mut self, event: &OtaEvent<'_>) {
        (**self).emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Readiness port (bring-up collaborator)
// ───────────────────────────────────────────────────────────────

/// Bring-up failures that the core cannot recover from. The binary owns
/// the policy for these (typically a restart).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringUpError {
    /// No usable network link after all attempts.
    LinkUnavailable,
    /// Bring-up was asked to run without the data it needs.
    NotConfigured,
}

impl fmt::Display for BringUpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkUnavailable => write!(f, "network link unavailable"),
            Self::NotConfigured => write!(f, "bring-up not configured"),
        }
    }
}

impl core::error::Error for BringUpError {}

/// Makes the device ready for a poll: link up, console available, etc.
/// Cheap when already ready; may block while (re)connecting.
pub trait ReadinessPort {
    fn ensure_ready(&mut self) -> Result<(), BringUpError>;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate
// ───────────────────────────────────────────────────────────────

/// Callback the [`PollScheduler`](crate::scheduler::PollScheduler) invokes
/// when the poll interval elapses. Keeps the scheduler free of any
/// knowledge about HTTP or flash.
pub trait PollDelegate {
    type Outcome;

    fn on_poll_due(&mut self, now_ms: u32) -> Self::Outcome;
}

// ───────────────────────────────────────────────────────────────
// Port bundle
// ───────────────────────────────────────────────────────────────

/// Everything the service needs from the platform, handed over at
/// construction.
pub struct OtaPorts<H, F, N, D, R, E> {
    pub http: H,
    pub flash: F,
    pub nvm: N,
    /// Pause provider for the download loop.
    pub delay: D,
    pub restart: R,
    pub events: E,
}
