//! WiFi station-mode adapter.
//!
//! Implements [`ReadinessPort`]: a poll may only start once the station is
//! associated and has an IP. Each `ensure_ready()` call is cheap while the
//! link is up and reconnects when it has dropped.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `BlockingWifi<EspWifi>` handed over with
//!   [`WifiAdapter::attach`] once the modem peripheral is available.
//! - **all other targets**: simulation with scripted connect failures and
//!   link drops for host-side tests.
//!
//! ## Reconnection policy
//!
//! Up to `max_attempts` connects per call, waiting an exponential backoff
//! (starting at `initial_backoff_ms`, doubling, capped at 60 s) between
//! them. Exhausting the attempts yields [`BringUpError::LinkUnavailable`];
//! what happens next is the caller's decision.

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use crate::adapters::time::SystemDelay;
use crate::adapters::utils::is_printable_ascii;
use crate::app::ports::{BringUpError, ReadinessPort};
use crate::config::NetworkConfig;

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Failed,
}

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BACKOFF_MS: u32 = 2_000;
const MAX_BACKOFF_MS: u32 = 60_000;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn valid_ssid(ssid: &str) -> bool {
    !ssid.is_empty() && ssid.len() <= 32 && is_printable_ascii(ssid)
}

fn valid_password(password: &str) -> bool {
    password.is_empty() || (8..=64).contains(&password.len())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    max_attempts: u32,
    initial_backoff_ms: u32,
    delay: SystemDelay,
    #[cfg(target_os = "espidf")]
    wifi: Option<BlockingWifi<EspWifi<'static>>>,
    #[cfg(target_os = "espidf")]
    configured: bool,
    /// Simulation: counts platform_connect() calls.
    #[cfg(not(target_os = "espidf"))]
    sim_connect_counter: u32,
    /// Simulation: connects that fail before one succeeds.
    #[cfg(not(target_os = "espidf"))]
    sim_failures_left: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_link_up: bool,
}

impl WifiAdapter {
    /// Credentials are validated here; bad ones leave the adapter
    /// unconfigured and every `ensure_ready()` reports `NotConfigured`.
    pub fn new(network: &NetworkConfig) -> Self {
        let mut adapter = Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_BACKOFF_MS,
            delay: SystemDelay,
            #[cfg(target_os = "espidf")]
            wifi: None,
            #[cfg(target_os = "espidf")]
            configured: false,
            #[cfg(not(target_os = "espidf"))]
            sim_connect_counter: 0,
            #[cfg(not(target_os = "espidf"))]
            sim_failures_left: 0,
            #[cfg(not(target_os = "espidf"))]
            sim_link_up: false,
        };
        if valid_ssid(&network.ssid) && valid_password(&network.password) {
            // Lengths were checked above, so both pushes fit.
            let _ = adapter.ssid.push_str(&network.ssid);
            let _ = adapter.password.push_str(&network.password);
        } else {
            error!("WiFi: rejected credentials for SSID '{}'", network.ssid);
        }
        adapter
    }

    /// Attempts per `ensure_ready()` call and the first backoff pause.
    #[must_use]
    pub fn with_retry(mut self, max_attempts: u32, initial_backoff_ms: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.initial_backoff_ms = initial_backoff_ms;
        self
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn is_configured(&self) -> bool {
        !self.ssid.is_empty()
    }

    // ── Platform-specific ─────────────────────────────────────

    /// Hand over the station driver built from the modem peripheral.
    #[cfg(target_os = "espidf")]
    pub fn attach(&mut self, wifi: BlockingWifi<EspWifi<'static>>) {
        self.wifi = Some(wifi);
        self.configured = false;
    }

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), BringUpError> {
        let wifi = self.wifi.as_mut().ok_or(BringUpError::NotConfigured)?;

        if !self.configured {
            let cfg = Configuration::Client(ClientConfiguration {
                ssid: self.ssid.clone(),
                password: self.password.clone(),
                auth_method: if self.password.is_empty() {
                    AuthMethod::None
                } else {
                    AuthMethod::WPA2Personal
                },
                ..Default::default()
            });
            wifi.set_configuration(&cfg)
                .and_then(|()| wifi.start())
                .map_err(|e| {
                    error!("WiFi: driver setup failed ({e})");
                    BringUpError::LinkUnavailable
                })?;
            self.configured = true;
        }

        wifi.connect()
            .and_then(|()| wifi.wait_netif_up())
            .map_err(|e| {
                warn!("WiFi: connect failed ({e})");
                BringUpError::LinkUnavailable
            })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), BringUpError> {
        self.sim_connect_counter = self.sim_connect_counter.wrapping_add(1);
        if self.sim_failures_left > 0 {
            self.sim_failures_left -= 1;
            warn!("WiFi(sim): simulated connect failure (attempt {})", self.sim_connect_counter);
            return Err(BringUpError::LinkUnavailable);
        }
        self.sim_link_up = true;
        info!("WiFi(sim): connected to '{}' (attempt {})", self.ssid, self.sim_connect_counter);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi
            .as_ref()
            .is_some_and(|w| w.is_up().unwrap_or(false))
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim_link_up
    }
}

// ── Simulation controls ──────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    /// Fail the next `n` connects.
    pub fn sim_fail_next(&mut self, n: u32) {
        self.sim_failures_left = n;
    }

    /// Drop the link as if the AP went away.
    pub fn sim_drop_link(&mut self) {
        self.sim_link_up = false;
    }

    pub fn sim_connect_attempts(&self) -> u32 {
        self.sim_connect_counter
    }
}

// ───────────────────────────────────────────────────────────────
// ReadinessPort
// ───────────────────────────────────────────────────────────────

impl ReadinessPort for WifiAdapter {
    fn ensure_ready(&mut self) -> Result<(), BringUpError> {
        if !self.is_configured() {
            return Err(BringUpError::NotConfigured);
        }
        if self.platform_is_connected() {
            self.state = WifiState::Connected;
            return Ok(());
        }
        if self.state == WifiState::Connected {
            warn!("WiFi: connection lost, reconnecting");
        }

        info!("WiFi: connecting to '{}'", self.ssid);
        let mut backoff_ms = self.initial_backoff_ms;
        for attempt in 1..=self.max_attempts {
            self.state = if attempt == 1 {
                WifiState::Connecting
            } else {
                WifiState::Reconnecting { attempt }
            };
            match self.platform_connect() {
                Ok(()) => {
                    self.state = WifiState::Connected;
                    info!("WiFi: connected");
                    return Ok(());
                }
                Err(BringUpError::NotConfigured) => {
                    self.state = WifiState::Failed;
                    return Err(BringUpError::NotConfigured);
                }
                Err(_) if attempt < self.max_attempts => {
                    info!("WiFi: retry {} in {} ms", attempt + 1, backoff_ms);
                    self.delay.delay_ms(backoff_ms);
                    backoff_ms = backoff_ms.saturating_mul(2).min(MAX_BACKOFF_MS);
                }
                Err(_) => {}
            }
        }

        error!("WiFi: giving up after {} attempts", self.max_attempts);
        self.state = WifiState::Failed;
        Err(BringUpError::LinkUnavailable)
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
