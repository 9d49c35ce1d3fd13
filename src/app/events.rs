//! Outbound events.
//!
//! Components report progress and failures through the
//! [`EventSink`](super::ports::EventSink) port. Events borrow their string
//! payloads, so emitting one never allocates. `Display` renders the log
//! line; adapters add their own prefix.

use core::fmt;

use log::Level;

use crate::error::{Error, StorageError};
use crate::version::UpdateDecision;

/// Structured events emitted by the update core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaEvent<'a> {
    /// A valid version was read from NVM at startup.
    VersionLoaded(&'a str),
    /// The region holds no version (first boot).
    VersionMissing,
    /// The region held malformed data and was reinitialized.
    VersionCorrupted,
    /// The region was rewritten to zeros.
    RegionReset,
    /// A new version was committed to NVM.
    VersionSaved(&'a str),
    /// Opening or committing the region failed; the operation was skipped.
    StorageFailed(StorageError),

    /// A poll cycle started.
    CheckStarted,
    /// The manifest endpoint answered.
    ManifestFetched { status: u16 },
    /// The manifest could not be fetched or parsed.
    ManifestUnavailable(Error),
    /// The manifest carried no usable version/url pair.
    CandidateMissing,
    /// A candidate was resolved.
    Candidate { current: &'a str, latest: &'a str },
    /// Outcome of comparing current and candidate versions.
    Decision(UpdateDecision),

    /// Firmware download started.
    DownloadStarted {
        url: &'a str,
        content_length: Option<u64>,
    },
    /// Download loop ended.
    DownloadFinished {
        url: &'a str,
        downloaded: u64,
        content_length: Option<u64>,
    },
    /// The attempt failed; running firmware and stored version untouched.
    UpdateFailed(Error),
    /// Image finalized and version persisted.
    UpdateApplied { version: &'a str },
    /// Restart requested.
    Restarting,
    /// The poll cycle finished without restarting.
    CycleComplete,
}

impl OtaEvent<'_> {
    /// Log level adapters should use for this event.
    pub fn level(&self) -> Level {
        match self {
            Self::VersionCorrupted
            | Self::StorageFailed(_)
            | Self::ManifestUnavailable(_)
            | Self::CandidateMissing => Level::Warn,
            Self::UpdateFailed(_) => Level::Error,
            Self::Decision(d) if !d.is_required() => match d {
                UpdateDecision::CurrentInvalid(_) | UpdateDecision::CandidateInvalid(_) => {
                    Level::Warn
                }
                _ => Level::Info,
            },
            Self::RegionReset | Self::CheckStarted | Self::ManifestFetched { .. } => Level::Debug,
            _ => Level::Info,
        }
    }
}

fn fmt_length(f: &mut fmt::Formatter<'_>, length: Option<u64>) -> fmt::Result {
    match length {
        Some(n) => write!(f, "{n}"),
        None => write!(f, "unknown"),
    }
}

impl fmt::Display for OtaEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VersionLoaded(v) => write!(f, "loaded version: {v}"),
            Self::VersionMissing => write!(f, "version not found in nvm"),
            Self::VersionCorrupted => write!(f, "version format is not valid, reinitializing"),
            Self::RegionReset => write!(f, "version region initialized"),
            Self::VersionSaved(v) => write!(f, "version saved: {v}"),
            Self::StorageFailed(e) => write!(f, "version storage error: {e}"),
            Self::CheckStarted => write!(f, "checking for update"),
            Self::ManifestFetched { status } => write!(f, "http response code: {status}"),
            Self::ManifestUnavailable(e) => write!(f, "manifest unavailable: {e}"),
            Self::CandidateMissing => write!(f, "version info not found"),
            Self::Candidate { current, latest } => {
                write!(f, "latest version: {latest}, current version: ")?;
                if current.is_empty() {
                    write!(f, "<none>")
                } else {
                    write!(f, "{current}")
                }
            }
            Self::Decision(d) => write!(f, "{d}"),
            Self::DownloadStarted {
                url,
                content_length,
            } => {
                write!(f, "downloading from {url}, content length: ")?;
                fmt_length(f, *content_length)
            }
            Self::DownloadFinished {
                url,
                downloaded,
                content_length,
            } => {
                write!(f, "downloaded {downloaded} of ")?;
                fmt_length(f, *content_length)?;
                write!(f, " bytes from {url}")
            }
            Self::UpdateFailed(e) => write!(f, "update failed: {e}"),
            Self::UpdateApplied { version } => write!(f, "update to {version} completed"),
            Self::Restarting => write!(f, "restarting into new firmware"),
            Self::CycleComplete => write!(f, "tick executed"),
        }
    }
}
