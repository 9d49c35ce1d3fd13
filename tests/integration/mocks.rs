//! Mock ports and fixtures for integration tests.
//!
//! The network, flash, NVM and restart ports use the crate's own host
//! simulation backends; this module adds an event recorder, a counting
//! delay and builders for a ready-to-poll service.

use std::cell::Cell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use log::Level;
use otaresolver::adapters::flash::OtaFlashSink;
use otaresolver::adapters::http::{HttpAdapter, SimResponse};
use otaresolver::adapters::nvs::NvsRegion;
use otaresolver::adapters::restart::SystemRestart;
use otaresolver::app::events::OtaEvent;
use otaresolver::app::ports::{EventSink, OtaPorts};
use otaresolver::config::ResolverConfig;
use otaresolver::version_store::VERSION_REGION_SIZE;
use otaresolver::OtaService;

pub const MANIFEST_URL: &str = "http://updates.test/manifest.json";
pub const FIRMWARE_URL: &str = "http://updates.test/fw-1.1.0.bin";
pub const TOKEN: &str = "test-token";

// ── Event recorder ────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Recorder {
    pub lines: Vec<String>,
    pub levels: Vec<Level>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn saw(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }

    pub fn count(&self, needle: &str) -> usize {
        self.lines.iter().filter(|l| l.contains(needle)).count()
    }
}

impl EventSink for Recorder {
    fn emit(&mut self, event: &OtaEvent<'_>) {
        self.lines.push(event.to_string());
        self.levels.push(event.level());
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Never sleeps; counts millisecond pauses in a shared cell.
#[derive(Debug, Clone, Default)]
pub struct CountingDelay(pub Rc<Cell<u32>>);

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, _ns: u32) {
        self.0.set(self.0.get() + 1);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.set(self.0.get() + ms);
    }
}

// ── Service fixture ───────────────────────────────────────────

pub type TestService =
    OtaService<HttpAdapter, OtaFlashSink, NvsRegion, CountingDelay, SystemRestart, Recorder>;

pub fn resolver_config() -> ResolverConfig {
    ResolverConfig {
        manifest_url: MANIFEST_URL.into(),
        bearer_token: TOKEN.into(),
        check_interval_secs: 60,
    }
}

/// A region holding `version` (NUL-terminated) or blank for `""`.
pub fn region_with(version: &str) -> NvsRegion {
    let mut image = [0u8; VERSION_REGION_SIZE];
    image[..version.len()].copy_from_slice(version.as_bytes());
    NvsRegion::with_image(image)
}

pub fn manifest(version: &str, url: &str) -> SimResponse {
    SimResponse::ok(format!(
        r#"{{"latest_version":"{version}","latest_version_url":"{url}"}}"#
    ))
}

/// Deterministic, non-repeating-per-KiB image bytes.
pub fn firmware(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i ^ (i >> 8)) as u8).collect()
}

#[allow(dead_code)]
pub struct Fixture {
    pub service: TestService,
    pub pauses: Rc<Cell<u32>>,
    pub image: Vec<u8>,
}

/// Service at `current`, server advertising 1.1.0 with a `len`-byte image
/// served by `serve`.
pub fn fixture_with(
    current: &str,
    len: usize,
    flash: OtaFlashSink,
    serve: impl FnOnce(SimResponse) -> SimResponse,
) -> Fixture {
    let image = firmware(len);
    let mut http = HttpAdapter::new();
    http.route(MANIFEST_URL, manifest("1.1.0", FIRMWARE_URL));
    http.route(FIRMWARE_URL, serve(SimResponse::ok(image.clone())));
    build(current, http, flash, image)
}

#[allow(dead_code)]
pub fn fixture(current: &str, len: usize) -> Fixture {
    fixture_with(current, len, OtaFlashSink::new(), |r| r)
}

pub fn build(current: &str, http: HttpAdapter, flash: OtaFlashSink, image: Vec<u8>) -> Fixture {
    build_with_region(region_with(current), http, flash, image)
}

pub fn build_with_region(
    nvm: NvsRegion,
    http: HttpAdapter,
    flash: OtaFlashSink,
    image: Vec<u8>,
) -> Fixture {
    let pauses = Rc::new(Cell::new(0));
    let ports = OtaPorts {
        http,
        flash,
        nvm,
        delay: CountingDelay(Rc::clone(&pauses)),
        restart: SystemRestart::new(),
        events: Recorder::default(),
    };
    let mut service = OtaService::new(&resolver_config(), ports);
    service.begin();
    Fixture {
        service,
        pauses,
        image,
    }
}
