//! Unified error types for the OTA resolver.
//!
//! A single `Error` enum that every component converts into, so the update
//! cycle handles failures uniformly. All variants are `Copy` so they can be
//! carried inside events and cycle outcomes without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the resolver funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The HTTP exchange failed or returned an unexpected status.
    Transport(TransportError),
    /// A version string or manifest body was malformed.
    Parse(ParseError),
    /// The flash sink rejected the image.
    Write(WriteError),
    /// The NVM region could not be opened or committed.
    Storage(StorageError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Parse(e) => write!(f, "parse: {e}"),
            Self::Write(e) => write!(f, "write: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be established or the request not sent.
    Connect,
    /// The server answered with a status the caller does not accept.
    Status(u16),
    /// Reading the response body failed.
    Read,
    /// The connection closed before the declared length arrived.
    ConnectionDropped { received: u64, expected: u64 },
    /// The response body exceeds the caller's buffer limit.
    BodyTooLarge { limit: usize },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connection failed"),
            Self::Status(code) => write!(f, "unexpected HTTP status {code}"),
            Self::Read => write!(f, "body read failed"),
            Self::ConnectionDropped { received, expected } => {
                write!(f, "connection dropped after {received} of {expected} bytes")
            }
            Self::BodyTooLarge { limit } => write!(f, "body exceeds {limit} bytes"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Input was empty.
    Empty,
    /// Input did not contain exactly three dot-separated components.
    ComponentCount,
    /// A component between separators was empty.
    EmptyComponent,
    /// A character other than an ASCII digit appeared in a component.
    InvalidCharacter,
    /// A component does not fit in `u32`.
    Overflow,
    /// The manifest body is not a JSON document.
    Manifest,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty version string"),
            Self::ComponentCount => write!(f, "expected major.minor.patch"),
            Self::EmptyComponent => write!(f, "empty version component"),
            Self::InvalidCharacter => write!(f, "non-digit in version component"),
            Self::Overflow => write!(f, "version component out of range"),
            Self::Manifest => write!(f, "manifest is not valid JSON"),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// Write errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteError {
    /// The sink refused to start an update of the declared size.
    BeginFailed,
    /// The sink accepted fewer bytes than offered.
    ShortWrite { written: usize, requested: usize },
    /// Image verification or boot-partition switch failed.
    FinalizeFailed,
    /// Finalize succeeded but the sink does not report a complete image.
    Incomplete,
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeginFailed => write!(f, "update initialization failed"),
            Self::ShortWrite { written, requested } => {
                write!(f, "block write accepted {written} of {requested} bytes")
            }
            Self::FinalizeFailed => write!(f, "update finalize failed"),
            Self::Incomplete => write!(f, "update not finished after finalize"),
        }
    }
}

impl From<WriteError> for Error {
    fn from(e: WriteError) -> Self {
        Self::Write(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The region could not be opened.
    OpenFailed,
    /// Staged bytes could not be committed.
    CommitFailed,
    /// Access would cross the region boundary.
    OutOfBounds,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenFailed => write!(f, "region open failed"),
            Self::CommitFailed => write!(f, "commit failed"),
            Self::OutOfBounds => write!(f, "access outside region"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
