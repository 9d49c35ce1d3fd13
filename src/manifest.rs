//! Remote manifest resolution.
//!
//! The manifest is a JSON object:
//!
//! ```json
//! { "latest_version": "1.4.0", "latest_version_url": "https://host/fw-1.4.0.bin" }
//! ```
//!
//! Missing or non-string fields degrade to empty strings; callers treat an
//! incomplete [`VersionInfo`] as "nothing to do".

use serde_json::Value;

use crate::app::events::OtaEvent;
use crate::app::ports::{ByteStream, EventSink, HttpClient};
use crate::error::{Error, ParseError, TransportError};

/// Upper bound on the manifest body; anything larger is rejected.
pub const MAX_MANIFEST_BYTES: usize = 4096;

/// A candidate firmware descriptor, owned by the caller for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: String,
    pub url: String,
}

impl VersionInfo {
    /// Both a version and a download URL are present.
    pub fn is_complete(&self) -> bool {
        !self.version.is_empty() && !self.url.is_empty()
    }
}

/// Extract `{latest_version, latest_version_url}` from a manifest body.
pub fn parse_manifest(body: &[u8]) -> Result<VersionInfo, ParseError> {
    let doc: Value = serde_json::from_slice(body).map_err(|_| ParseError::Manifest)?;
    let field = |name: &str| {
        doc.get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()
    };
    Ok(VersionInfo {
        version: field("latest_version"),
        url: field("latest_version_url"),
    })
}

/// Drain a body into memory, refusing more than `limit` bytes.
pub(crate) fn read_body(
    stream: &mut impl ByteStream,
    limit: usize,
) -> Result<Vec<u8>, TransportError> {
    let mut body = Vec::new();
    let mut chunk = [0u8; 256];
    loop {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Ok(body);
        }
        if body.len() + n > limit {
            return Err(TransportError::BodyTooLarge { limit });
        }
        body.extend_from_slice(&chunk[..n]);
    }
}

/// Fetches the manifest from a fixed endpoint with a fixed bearer token.
pub struct ManifestResolver {
    url: String,
    authorization: String,
}

impl ManifestResolver {
    /// `authorization` is the full header value (`Bearer <token>`).
    pub fn new(url: impl Into<String>, authorization: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            authorization: authorization.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One authenticated GET of the manifest, surfacing the failure reason.
    pub fn fetch(
        &self,
        http: &mut impl HttpClient,
        events: &mut impl EventSink,
    ) -> Result<VersionInfo, Error> {
        let headers = [("Authorization", self.authorization.as_str())];
        let mut response = http.get(&self.url, &headers)?;
        events.emit(&OtaEvent::ManifestFetched {
            status: response.status,
        });
        if !response.is_success() {
            return Err(TransportError::Status(response.status).into());
        }
        let body = read_body(&mut response.body, MAX_MANIFEST_BYTES)?;
        Ok(parse_manifest(&body)?)
    }

    /// Like [`fetch`](Self::fetch), but every failure collapses into an
    /// empty [`VersionInfo`] after being reported.
    pub fn resolve(&self, http: &mut impl HttpClient, events: &mut impl EventSink) -> VersionInfo {
        match self.fetch(http, events) {
            Ok(info) => info,
            Err(e) => {
                events.emit(&OtaEvent::ManifestUnavailable(e));
                VersionInfo::default()
            }
        }
    }
}
