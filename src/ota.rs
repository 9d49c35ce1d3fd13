//! Streaming firmware download into the flash update partition.
//!
//! Flow: Requesting → (Downloading ⇄ Writing) × N → Finalizing → Applied | Failed
//!
//! One attempt per call, no retries within an attempt. Every failure
//! leaves the running firmware and the persisted version untouched; the
//! next poll cycle starts again from `Idle`.

use embedded_hal::delay::DelayNs;

use crate::app::events::OtaEvent;
use crate::app::ports::{ByteStream, EventSink, FlashSink, HttpClient, NvmRegion, RestartPort};
use crate::error::{Error, TransportError, WriteError};
use crate::manifest::VersionInfo;
use crate::version_store::VersionStore;

/// Bytes moved from the HTTP stream to flash per step.
pub const UPDATE_CHUNK_SIZE: usize = 1024;
/// Pause while the stream has nothing buffered.
pub const YIELD_PAUSE_MS: u32 = 1;

// ── State machine ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Requesting,
    Downloading {
        downloaded: u64,
        expected: Option<u64>,
    },
    Writing {
        downloaded: u64,
        expected: Option<u64>,
    },
    Finalizing,
    /// Image committed and version persisted; a restart has been requested.
    Applied,
    Failed,
}

// ── Engine ────────────────────────────────────────────────────

/// Downloads a firmware image chunk by chunk into a [`FlashSink`].
///
/// Owns the sink and a reusable chunk buffer so a cycle allocates nothing
/// beyond the HTTP adapter's own needs.
pub struct UpdateEngine<F, D> {
    state: UpdateState,
    sink: F,
    delay: D,
    sink_active: bool,
    chunk: [u8; UPDATE_CHUNK_SIZE],
}

impl<F: FlashSink, D: DelayNs> UpdateEngine<F, D> {
    pub fn new(sink: F, delay: D) -> Self {
        Self {
            state: UpdateState::Idle,
            sink,
            delay,
            sink_active: false,
            chunk: [0u8; UPDATE_CHUNK_SIZE],
        }
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    pub fn sink(&self) -> &F {
        &self.sink
    }

    /// Install `info` and restart into it.
    ///
    /// On success the candidate version is persisted through `store` and
    /// `restart` is invoked; the returned byte count is only observable on
    /// targets where restart returns (simulation, tests).
    pub fn apply<H, N, R, E>(
        &mut self,
        info: &VersionInfo,
        authorization: &str,
        http: &mut H,
        store: &mut VersionStore<N>,
        restart: &mut R,
        events: &mut E,
    ) -> Result<u64, Error>
    where
        H: HttpClient,
        N: NvmRegion,
        R: RestartPort,
        E: EventSink,
    {
        self.state = UpdateState::Requesting;
        self.sink_active = false;

        let downloaded = match self.stream_to_sink(info, authorization, http, events) {
            Ok(n) => n,
            Err(e) => return Err(self.fail(e, events)),
        };

        // Session stays active until the sink reports a bootable image.
        self.state = UpdateState::Finalizing;
        if let Err(e) = self.sink.finalize() {
            return Err(self.fail(e.into(), events));
        }
        if !self.sink.is_finished() {
            return Err(self.fail(WriteError::Incomplete.into(), events));
        }
        self.sink_active = false;

        // A failed save is reported by the store; the new image is already
        // bootable, so the restart goes ahead regardless.
        store.save(&info.version, events);
        self.state = UpdateState::Applied;
        events.emit(&OtaEvent::UpdateApplied {
            version: &info.version,
        });
        events.emit(&OtaEvent::Restarting);
        restart.restart();
        Ok(downloaded)
    }

    fn stream_to_sink<H: HttpClient, E: EventSink>(
        &mut self,
        info: &VersionInfo,
        authorization: &str,
        http: &mut H,
        events: &mut E,
    ) -> Result<u64, Error> {
        let headers = [("Authorization", authorization)];
        let mut response = http.get(&info.url, &headers)?;
        if response.status != 200 {
            return Err(TransportError::Status(response.status).into());
        }

        let expected = response.content_length;
        events.emit(&OtaEvent::DownloadStarted {
            url: &info.url,
            content_length: expected,
        });

        self.sink.begin(expected)?;
        self.sink_active = true;

        let body = &mut response.body;
        let mut downloaded: u64 = 0;
        self.state = UpdateState::Downloading {
            downloaded,
            expected,
        };

        while body.is_connected() && expected.is_none_or(|len| downloaded < len) {
            let available = body.available();
            if available == 0 {
                self.delay.delay_ms(YIELD_PAUSE_MS);
                continue;
            }

            let remaining = expected.map_or(usize::MAX, |len| {
                usize::try_from(len - downloaded).unwrap_or(usize::MAX)
            });
            let want = available.min(UPDATE_CHUNK_SIZE).min(remaining);
            let n = body.read(&mut self.chunk[..want])?;
            if n == 0 {
                continue;
            }
            downloaded += n as u64;

            self.state = UpdateState::Writing {
                downloaded,
                expected,
            };
            let written = self.sink.write(&self.chunk[..n]);
            if written != n {
                return Err(WriteError::ShortWrite {
                    written,
                    requested: n,
                }
                .into());
            }
            self.state = UpdateState::Downloading {
                downloaded,
                expected,
            };
        }

        events.emit(&OtaEvent::DownloadFinished {
            url: &info.url,
            downloaded,
            content_length: expected,
        });

        match expected {
            Some(len) if downloaded < len => Err(TransportError::ConnectionDropped {
                received: downloaded,
                expected: len,
            }
            .into()),
            _ => Ok(downloaded),
        }
    }

    fn fail(&mut self, error: Error, events: &mut impl EventSink) -> Error {
        if self.sink_active {
            self.sink.abort();
            self.sink_active = false;
        }
        self.state = UpdateState::Failed;
        events.emit(&OtaEvent::UpdateFailed(error));
        error
    }
}

// ── Tests ─────────────────────────────────────────────────────
