//! HTTP client adapter.
//!
//! Implements [`HttpClient`] / [`ByteStream`] for plain GETs with custom
//! headers.
//!
//! - **`target_os = "espidf"`**: `EspHttpConnection` (TLS through the
//!   bundled CA store). The body is pulled through a small buffer, so
//!   `available()` blocks for at most one socket read.
//! - **all other targets**: an in-memory route table. Responses can omit
//!   `Content-Length`, close early, stall or fail mid-body, and every
//!   request is recorded for inspection.

use log::debug;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{ByteStream, HttpClient, HttpResponse};
use crate::error::TransportError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::http::Method;
#[cfg(target_os = "espidf")]
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};

/// Socket read granularity on the device.
#[cfg(target_os = "espidf")]
const BODY_BUFFER_SIZE: usize = 1024;
#[cfg(target_os = "espidf")]
const REQUEST_TIMEOUT_SECS: u64 = 30;

// ───────────────────────────────────────────────────────────────
// ESP-IDF backend
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct HttpAdapter;

#[cfg(target_os = "espidf")]
impl HttpAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "espidf")]
impl Default for HttpAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
impl HttpClient for HttpAdapter {
    type Body = HttpBody;

    fn get(
        &mut self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse<HttpBody>, TransportError> {
        let mut conn = EspHttpConnection::new(&Configuration {
            timeout: Some(core::time::Duration::from_secs(REQUEST_TIMEOUT_SECS)),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        })
        .map_err(|e| {
            warn!("http: client init failed ({e})");
            TransportError::Connect
        })?;

        conn.initiate_request(Method::Get, url, headers)
            .and_then(|()| conn.initiate_response())
            .map_err(|e| {
                warn!("http: GET {url} failed ({e})");
                TransportError::Connect
            })?;

        let status = conn.status();
        let chunked = conn
            .header("Transfer-Encoding")
            .is_some_and(|v| v.eq_ignore_ascii_case("chunked"));
        let content_length = if chunked {
            None
        } else {
            conn.header("Content-Length")
                .and_then(|v| v.trim().parse::<u64>().ok())
        };
        debug!("http: GET {url} -> {status} (length {content_length:?})");

        Ok(HttpResponse {
            status,
            content_length,
            body: HttpBody {
                conn,
                buf: [0u8; BODY_BUFFER_SIZE],
                start: 0,
                end: 0,
                eof: false,
                pending: None,
            },
        })
    }
}

/// Response body over an open `EspHttpConnection`; dropping it closes the
/// connection.
#[cfg(target_os = "espidf")]
pub struct HttpBody {
    conn: EspHttpConnection,
    buf: [u8; BODY_BUFFER_SIZE],
    start: usize,
    end: usize,
    eof: bool,
    pending: Option<TransportError>,
}

#[cfg(target_os = "espidf")]
impl HttpBody {
    fn fill(&mut self) {
        match self.conn.read(&mut self.buf) {
            Ok(0) => self.eof = true,
            Ok(n) => {
                self.start = 0;
                self.end = n;
            }
            Err(e) => {
                warn!("http: body read failed ({e})");
                self.eof = true;
                self.pending = Some(TransportError::Read);
            }
        }
    }
}

#[cfg(target_os = "espidf")]
impl ByteStream for HttpBody {
    fn available(&mut self) -> usize {
        if self.start == self.end && !self.eof {
            self.fill();
        }
        // A pending error counts as readable so the next read surfaces it.
        if self.pending.is_some() {
            return 1;
        }
        self.end - self.start
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if self.start == self.end {
            if let Some(e) = self.pending.take() {
                return Err(e);
            }
            if self.eof {
                return Ok(0);
            }
            self.fill();
            if let Some(e) = self.pending.take() {
                return Err(e);
            }
        }
        let n = buf.len().min(self.end - self.start);
        buf[..n].copy_from_slice(&self.buf[self.start..self.start + n]);
        self.start += n;
        Ok(n)
    }

    fn is_connected(&mut self) -> bool {
        !self.eof || self.start < self.end || self.pending.is_some()
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation backend
// ───────────────────────────────────────────────────────────────

/// A scripted response for one URL.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone)]
pub struct SimResponse {
    status: u16,
    body: Vec<u8>,
    content_length: Option<u64>,
    deliver: usize,
    segment: usize,
    stalls: usize,
    fail_read_at: Option<usize>,
}

#[cfg(not(target_os = "espidf"))]
impl SimResponse {
    /// `200` with the body and a matching `Content-Length`.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self {
            status,
            content_length: Some(body.len() as u64),
            deliver: body.len(),
            body,
            segment: 512,
            stalls: 0,
            fail_read_at: None,
        }
    }

    /// Close-delimited body: no `Content-Length`.
    #[must_use]
    pub fn without_length(mut self) -> Self {
        self.content_length = None;
        self
    }

    /// Keep the declared length but close after `n` bytes.
    #[must_use]
    pub fn closing_after(mut self, n: usize) -> Self {
        self.deliver = n.min(self.body.len());
        self
    }

    /// Bytes made available per poll.
    #[must_use]
    pub fn in_segments(mut self, segment: usize) -> Self {
        self.segment = segment.max(1);
        self
    }

    /// Report nothing available for the first `n` polls.
    #[must_use]
    pub fn stalling(mut self, n: usize) -> Self {
        self.stalls = n;
        self
    }

    /// Fail the read once `n` bytes have been delivered.
    #[must_use]
    pub fn failing_at(mut self, n: usize) -> Self {
        self.fail_read_at = Some(n);
        self
    }
}

/// A request seen by the simulated client.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimRequest {
    pub url: String,
    pub authorization: Option<String>,
}

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct HttpAdapter {
    routes: Vec<(String, SimResponse)>,
    requests: Vec<SimRequest>,
}

#[cfg(not(target_os = "espidf"))]
impl HttpAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `response` for `url`, replacing any previous route.
    pub fn route(&mut self, url: &str, response: SimResponse) -> &mut Self {
        self.routes.retain(|(u, _)| u != url);
        self.routes.push((url.to_owned(), response));
        self
    }

    /// Unknown URLs fail to connect.
    pub fn unroute(&mut self, url: &str) {
        self.routes.retain(|(u, _)| u != url);
    }

    pub fn requests(&self) -> &[SimRequest] {
        &self.requests
    }
}

#[cfg(not(target_os = "espidf"))]
impl HttpClient for HttpAdapter {
    type Body = SimBody;

    fn get(
        &mut self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse<SimBody>, TransportError> {
        let authorization = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("Authorization"))
            .map(|(_, v)| (*v).to_owned());
        self.requests.push(SimRequest {
            url: url.to_owned(),
            authorization,
        });

        let (_, r) = self
            .routes
            .iter()
            .find(|(u, _)| u == url)
            .ok_or(TransportError::Connect)?;
        debug!("http(sim): GET {url} -> {}", r.status);

        Ok(HttpResponse {
            status: r.status,
            content_length: r.content_length,
            body: SimBody {
                data: r.body[..r.deliver].to_vec(),
                pos: 0,
                segment: r.segment,
                stalls: r.stalls,
                fail_read_at: r.fail_read_at,
            },
        })
    }
}

#[cfg(not(target_os = "espidf"))]
pub struct SimBody {
    data: Vec<u8>,
    pos: usize,
    segment: usize,
    stalls: usize,
    fail_read_at: Option<usize>,
}

#[cfg(not(target_os = "espidf"))]
impl ByteStream for SimBody {
    fn available(&mut self) -> usize {
        if self.stalls > 0 {
            self.stalls -= 1;
            return 0;
        }
        (self.data.len() - self.pos).min(self.segment)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if self.fail_read_at.is_some_and(|at| self.pos >= at) {
            return Err(TransportError::Read);
        }
        let mut n = buf.len().min(self.data.len() - self.pos).min(self.segment);
        if let Some(at) = self.fail_read_at {
            n = n.min(at - self.pos);
        }
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn is_connected(&mut self) -> bool {
        self.pos < self.data.len()
    }
}
