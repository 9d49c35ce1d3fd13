//! OTA resolver firmware: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HttpAdapter     OtaFlashSink   NvsRegion     SystemRestart    │
//! │  (HttpClient)    (FlashSink)    (NvmRegion)   (RestartPort)    │
//! │  WifiAdapter     LogEventSink   SystemDelay   MonotonicClock   │
//! │  (Readiness)     (EventSink)    (DelayNs)     (tick source)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │               OtaService (pure logic)                  │    │
//! │  │  VersionStore · ManifestResolver · UpdateEngine        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  PollScheduler (delegate-driven, wrapping ms counter)          │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! On the device, configuration is baked in at build time (see
//! `config.rs`). On the host the binary runs a self-contained simulation:
//! a scripted manifest server, an in-memory partition and a restart that
//! only gets recorded.
#![deny(unused_must_use)]

use anyhow::Result;
use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use otaresolver::adapters::flash::OtaFlashSink;
use otaresolver::adapters::http::HttpAdapter;
use otaresolver::adapters::log_sink::LogEventSink;
use otaresolver::adapters::nvs::NvsRegion;
use otaresolver::adapters::restart::SystemRestart;
use otaresolver::adapters::time::{MonotonicClock, SystemDelay};
use otaresolver::adapters::wifi::WifiAdapter;
use otaresolver::app::ports::{OtaPorts, ReadinessPort};
use otaresolver::config::DeviceConfig;
use otaresolver::{CycleOutcome, OtaService};

/// Main loop period.
const LOOP_PERIOD_MS: u32 = 1_000;
/// Pause before restarting after a fatal bring-up failure.
const BRING_UP_RESTART_DELAY_MS: u32 = 3_000;

fn banner() {
    info!("╔══════════════════════════════════════╗");
    info!("║  OTA resolver v{:<22}║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");
}

fn log_outcome(outcome: CycleOutcome) {
    match outcome {
        CycleOutcome::Failed(e) => warn!("cycle: update failed ({e})"),
        other => info!("cycle: {other:?}"),
    }
}

// ── Device ────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn main() -> Result<()> {
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    banner();

    let mut restart = SystemRestart::new();
    let mut delay = SystemDelay;

    // ── 2. Configuration ──────────────────────────────────────
    let config = match DeviceConfig::from_build_env() {
        Ok(c) => c,
        Err(e) => {
            error!("configuration rejected ({e}), restarting");
            delay.delay_ms(BRING_UP_RESTART_DELAY_MS);
            restart.restart_now();
        }
    };

    // ── 3. Network bring-up ───────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let esp_wifi = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs_partition))?;

    let mut wifi = WifiAdapter::new(&config.network);
    wifi.attach(BlockingWifi::wrap(esp_wifi, sysloop)?);
    if let Err(e) = wifi.ensure_ready() {
        error!("network bring-up failed ({e}), restarting");
        delay.delay_ms(BRING_UP_RESTART_DELAY_MS);
        restart.restart_now();
    }

    // ── 4. Service ────────────────────────────────────────────
    let ports = OtaPorts {
        http: HttpAdapter::new(),
        flash: OtaFlashSink::new(),
        nvm: NvsRegion::new().map_err(otaresolver::Error::from)?,
        delay,
        restart,
        events: LogEventSink::new(),
    };
    let mut service = OtaService::new(&config.resolver, ports);
    service.begin();
    info!(
        "checking {} every {} s",
        config.resolver.manifest_url, config.resolver.check_interval_secs
    );

    // ── 5. Poll loop ──────────────────────────────────────────
    let clock = MonotonicClock::new();
    loop {
        let now = clock.uptime_ms();
        if service.scheduler().is_due(now) {
            match wifi.ensure_ready() {
                Ok(()) => {
                    if let Some(outcome) = service.tick(now) {
                        log_outcome(outcome);
                    }
                }
                Err(e) => warn!("skipping update check: {e}"),
            }
        }
        esp_idf_hal::delay::FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
fn main() -> Result<()> {
    use otaresolver::adapters::http::SimResponse;
    use otaresolver::config::{NetworkConfig, ResolverConfig};
    use otaresolver::version_store::VERSION_REGION_SIZE;

    const MANIFEST_URL: &str = "http://updates.sim.local/manifest.json";
    const FIRMWARE_URL: &str = "http://updates.sim.local/fw-1.1.0.bin";
    const SIM_LOOP_PERIOD_MS: u32 = 250;
    const SIM_MAX_ITERATIONS: u32 = 40;

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    banner();

    let config = DeviceConfig {
        network: NetworkConfig {
            ssid: "SimNet".into(),
            password: "simulation".into(),
        },
        resolver: ResolverConfig {
            manifest_url: MANIFEST_URL.into(),
            bearer_token: "sim-token".into(),
            check_interval_secs: 2,
        },
    };
    config.validate()?;

    let mut delay = SystemDelay;
    let mut wifi = WifiAdapter::new(&config.network).with_retry(3, 100);
    wifi.sim_fail_next(1);
    if let Err(e) = wifi.ensure_ready() {
        error!("network bring-up failed ({e}), a device would restart now");
        delay.delay_ms(BRING_UP_RESTART_DELAY_MS);
        return Err(e.into());
    }

    // Scripted server: 1.1.0 is advertised, the image has no Content-Length
    // and arrives in uneven segments with a few stalls.
    let image: Vec<u8> = (0..96 * 1024u32).map(|i| (i.wrapping_mul(31) >> 3) as u8).collect();
    let mut http = HttpAdapter::new();
    http.route(
        MANIFEST_URL,
        SimResponse::ok(format!(
            r#"{{"latest_version":"1.1.0","latest_version_url":"{FIRMWARE_URL}"}}"#
        )),
    );
    http.route(
        FIRMWARE_URL,
        SimResponse::ok(image.clone())
            .without_length()
            .in_segments(700)
            .stalling(3),
    );

    let mut region = [0u8; VERSION_REGION_SIZE];
    region[..6].copy_from_slice(b"1.0.0\0");

    let ports = OtaPorts {
        http,
        flash: OtaFlashSink::new(),
        nvm: NvsRegion::with_image(region),
        delay,
        restart: SystemRestart::new(),
        events: LogEventSink::new(),
    };
    let mut service = OtaService::new(&config.resolver, ports);
    service.begin();

    let clock = MonotonicClock::new();
    for _ in 0..SIM_MAX_ITERATIONS {
        let now = clock.uptime_ms();
        if service.scheduler().is_due(now) {
            wifi.ensure_ready()?;
            if let Some(outcome) = service.tick(now) {
                log_outcome(outcome);
            }
        }
        if service.restart().requested() {
            break;
        }
        delay.delay_ms(SIM_LOOP_PERIOD_MS);
    }

    if !service.restart().requested() {
        warn!("simulation ended without an update");
        return Ok(());
    }
    if service.flash().image() != image.as_slice() {
        anyhow::bail!("flashed image does not match the served image");
    }

    // "Reboot": the persisted region survives, everything else is new.
    info!("── simulated restart ──");
    let mut http = HttpAdapter::new();
    http.route(
        MANIFEST_URL,
        SimResponse::ok(format!(
            r#"{{"latest_version":"1.1.0","latest_version_url":"{FIRMWARE_URL}"}}"#
        )),
    );
    let ports = OtaPorts {
        http,
        flash: OtaFlashSink::new(),
        nvm: NvsRegion::with_image(*service.nvm().image()),
        delay,
        restart: SystemRestart::new(),
        events: LogEventSink::new(),
    };
    let mut rebooted = OtaService::new(&config.resolver, ports);
    rebooted.begin();
    log_outcome(rebooted.check_now());
    Ok(())
}
