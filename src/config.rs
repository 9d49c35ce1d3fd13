//! Device configuration.
//!
//! Credentials, the manifest endpoint and the poll interval are fixed at
//! construction. They come either from a JSON document or from
//! environment variables baked in at build time:
//!
//! | Variable                  | Field                          |
//! |---------------------------|--------------------------------|
//! | `OTA_WIFI_SSID`           | `network.ssid`                 |
//! | `OTA_WIFI_PASSWORD`       | `network.password`             |
//! | `OTA_MANIFEST_URL`        | `resolver.manifest_url`        |
//! | `OTA_BEARER_TOKEN`        | `resolver.bearer_token`        |
//! | `OTA_CHECK_INTERVAL_SECS` | `resolver.check_interval_secs` |

use serde::{Deserialize, Serialize};

use crate::adapters::utils::is_printable_ascii;
use crate::error::Error;
use crate::scheduler::DEFAULT_CHECK_INTERVAL_SECS;

/// Wi-Fi station credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub ssid: String,
    /// Empty for open networks.
    #[serde(default)]
    pub password: String,
}

impl NetworkConfig {
    /// SSID 1-32 printable bytes; password empty or 8-64 bytes.
    pub fn validate(&self) -> Result<(), Error> {
        if self.ssid.is_empty() || self.ssid.len() > 32 || !is_printable_ascii(&self.ssid) {
            return Err(Error::Config("ssid must be 1-32 printable ASCII bytes"));
        }
        if !self.password.is_empty() && !(8..=64).contains(&self.password.len()) {
            return Err(Error::Config("password must be empty or 8-64 bytes"));
        }
        Ok(())
    }
}

/// Manifest endpoint and polling cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub manifest_url: String,
    pub bearer_token: String,
    #[serde(default = "default_interval")]
    pub check_interval_secs: u32,
}

fn default_interval() -> u32 {
    DEFAULT_CHECK_INTERVAL_SECS
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            manifest_url: String::new(),
            bearer_token: String::new(),
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
        }
    }
}

impl ResolverConfig {
    /// Value for the `Authorization` header on every request.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.bearer_token)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let url = self.manifest_url.as_str();
        let rest = url
            .strip_prefix("http://")
            .or_else(|| url.strip_prefix("https://"))
            .ok_or(Error::Config("manifest url must be http:// or https://"))?;
        if rest.is_empty() {
            return Err(Error::Config("manifest url has no host"));
        }
        if !is_printable_ascii(&self.bearer_token) {
            return Err(Error::Config("bearer token must be printable ASCII"));
        }
        Ok(())
    }
}

/// Everything the firmware needs at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub network: NetworkConfig,
    pub resolver: ResolverConfig,
}

impl DeviceConfig {
    pub fn validate(&self) -> Result<(), Error> {
        self.network.validate()?;
        self.resolver.validate()
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed configuration"))?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration baked in by the build environment.
    pub fn from_build_env() -> Result<Self, Error> {
        let check_interval_secs = match option_env!("OTA_CHECK_INTERVAL_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| Error::Config("OTA_CHECK_INTERVAL_SECS is not a number"))?,
            None => DEFAULT_CHECK_INTERVAL_SECS,
        };
        let config = Self {
            network: NetworkConfig {
                ssid: option_env!("OTA_WIFI_SSID").unwrap_or_default().into(),
                password: option_env!("OTA_WIFI_PASSWORD").unwrap_or_default().into(),
            },
            resolver: ResolverConfig {
                manifest_url: option_env!("OTA_MANIFEST_URL").unwrap_or_default().into(),
                bearer_token: option_env!("OTA_BEARER_TOKEN").unwrap_or_default().into(),
                check_interval_secs,
            },
        };
        config.validate()?;
        Ok(config)
    }
}
