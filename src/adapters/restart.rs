//! System restart adapter.
//!
//! On ESP-IDF this resets the chip into the freshly selected boot
//! partition and never returns. The host backend only records the request
//! so the simulation and tests can observe it.

use log::info;

use crate::app::ports::RestartPort;

#[derive(Debug, Default)]
pub struct SystemRestart {
    #[cfg(not(target_os = "espidf"))]
    requests: u32,
}

impl SystemRestart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart after bring-up failed. Same reset path as an update.
    #[cfg(target_os = "espidf")]
    pub fn restart_now(&mut self) -> ! {
        info!("restart: resetting chip");
        esp_ota::restart();
    }
}

#[cfg(not(target_os = "espidf"))]
impl SystemRestart {
    /// Number of restarts requested so far.
    pub fn requests(&self) -> u32 {
        self.requests
    }

    pub fn requested(&self) -> bool {
        self.requests > 0
    }
}

impl RestartPort for SystemRestart {
    #[cfg(target_os = "espidf")]
    fn restart(&mut self) {
        self.restart_now();
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self) {
        self.requests += 1;
        info!("restart(sim): restart requested");
    }
}
