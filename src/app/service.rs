//! OTA service: the hexagonal core.
//!
//! [`OtaService`] owns the version store, manifest resolver, update engine
//! and poll scheduler. All I/O flows through the port bundle handed over at
//! construction, so the whole cycle runs against mock adapters in tests.
//!
//! ```text
//!  HttpClient ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │          OtaService           │
//!   NvmRegion ◀──▶│ Resolver · Comparator · Engine│ ──▶ FlashSink
//!                 │        PollScheduler          │ ──▶ RestartPort
//!                 └──────────────────────────────┘
//! ```

use embedded_hal::delay::DelayNs;

use crate::config::ResolverConfig;
use crate::error::Error;
use crate::manifest::ManifestResolver;
use crate::ota::{UpdateEngine, UpdateState};
use crate::scheduler::PollScheduler;
use crate::version::update_decision;
use crate::version_store::VersionStore;

use super::events::OtaEvent;
use super::ports::{EventSink, FlashSink, HttpClient, NvmRegion, OtaPorts, PollDelegate, RestartPort};

// ───────────────────────────────────────────────────────────────
// Cycle outcome
// ───────────────────────────────────────────────────────────────

/// Result of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The manifest was unavailable or incomplete.
    NoCandidate,
    /// A candidate exists but does not warrant an update.
    UpToDate,
    /// The image was installed and a restart requested.
    Applied { bytes: u64 },
    /// The update attempt failed; nothing changed on the device.
    Failed(Error),
}

// ───────────────────────────────────────────────────────────────
// Update cycle
// ───────────────────────────────────────────────────────────────

/// One check-and-maybe-update pass, invoked by the scheduler.
pub struct UpdateCycle<H, F, N, D, R, E> {
    http: H,
    resolver: ManifestResolver,
    authorization: String,
    engine: UpdateEngine<F, D>,
    store: VersionStore<N>,
    restart: R,
    events: E,
}

impl<H, F, N, D, R, E> UpdateCycle<H, F, N, D, R, E>
where
    H: HttpClient,
    F: FlashSink,
    N: NvmRegion,
    D: DelayNs,
    R: RestartPort,
    E: EventSink,
{
    /// resolve → compare → apply
    pub fn run(&mut self) -> CycleOutcome {
        self.events.emit(&OtaEvent::CheckStarted);

        let info = self.resolver.resolve(&mut self.http, &mut self.events);
        let outcome = if info.is_complete() {
            self.events.emit(&OtaEvent::Candidate {
                current: self.store.current(),
                latest: &info.version,
            });
            let decision = update_decision(self.store.current(), &info.version);
            self.events.emit(&OtaEvent::Decision(decision));

            if decision.is_required() {
                match self.engine.apply(
                    &info,
                    &self.authorization,
                    &mut self.http,
                    &mut self.store,
                    &mut self.restart,
                    &mut self.events,
                ) {
                    Ok(bytes) => CycleOutcome::Applied { bytes },
                    Err(e) => CycleOutcome::Failed(e),
                }
            } else {
                CycleOutcome::UpToDate
            }
        } else {
            self.events.emit(&OtaEvent::CandidateMissing);
            CycleOutcome::NoCandidate
        };

        if !matches!(outcome, CycleOutcome::Applied { .. }) {
            self.events.emit(&OtaEvent::CycleComplete);
        }
        outcome
    }
}

impl<H, F, N, D, R, E> PollDelegate for UpdateCycle<H, F, N, D, R, E>
where
    H: HttpClient,
    F: FlashSink,
    N: NvmRegion,
    D: DelayNs,
    R: RestartPort,
    E: EventSink,
{
    type Outcome = CycleOutcome;

    fn on_poll_due(&mut self, _now_ms: u32) -> CycleOutcome {
        self.run()
    }
}

// ───────────────────────────────────────────────────────────────
// OtaService
// ───────────────────────────────────────────────────────────────

pub struct OtaService<H, F, N, D, R, E> {
    cycle: UpdateCycle<H, F, N, D, R, E>,
    scheduler: PollScheduler,
}

impl<H, F, N, D, R, E> OtaService<H, F, N, D, R, E>
where
    H: HttpClient,
    F: FlashSink,
    N: NvmRegion,
    D: DelayNs,
    R: RestartPort,
    E: EventSink,
{
    /// Pure construction: no I/O until [`begin`](Self::begin).
    pub fn new(config: &ResolverConfig, ports: OtaPorts<H, F, N, D, R, E>) -> Self {
        let authorization = config.authorization();
        Self {
            cycle: UpdateCycle {
                http: ports.http,
                resolver: ManifestResolver::new(config.manifest_url.as_str(), authorization.as_str()),
                authorization,
                engine: UpdateEngine::new(ports.flash, ports.delay),
                store: VersionStore::new(ports.nvm),
                restart: ports.restart,
                events: ports.events,
            },
            scheduler: PollScheduler::new(config.check_interval_secs),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load the persisted version. Call once at startup.
    pub fn begin(&mut self) -> &str {
        self.cycle.store.load(&mut self.cycle.events)
    }

    pub fn set_check_interval_secs(&mut self, secs: u32) -> &mut Self {
        self.scheduler.set_interval_secs(secs);
        self
    }

    /// Run a cycle if the poll interval has elapsed at `now_ms`.
    pub fn tick(&mut self, now_ms: u32) -> Option<CycleOutcome> {
        self.scheduler.tick(now_ms, &mut self.cycle)
    }

    /// Run a cycle immediately; the schedule is left untouched.
    pub fn check_now(&mut self) -> CycleOutcome {
        self.cycle.run()
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn current_version(&self) -> &str {
        self.cycle.store.current()
    }

    pub fn update_state(&self) -> UpdateState {
        self.cycle.engine.state()
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    pub fn http(&self) -> &H {
        &self.cycle.http
    }

    pub fn http_mut(&mut self) -> &mut H {
        &mut self.cycle.http
    }

    pub fn flash(&self) -> &F {
        self.cycle.engine.sink()
    }

    pub fn nvm(&self) -> &N {
        self.cycle.store.nvm()
    }

    pub fn restart(&self) -> &R {
        &self.cycle.restart
    }

    pub fn events(&self) -> &E {
        &self.cycle.events
    }
}
