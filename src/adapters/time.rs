//! Time adapters.
//!
//! - [`MonotonicClock`]: milliseconds since boot as a wrapping `u32`, the
//!   counter the poll scheduler runs on.
//! - [`SystemDelay`]: `embedded_hal` delay for the download loop's
//!   cooperative pauses.
//!
//! On ESP-IDF these wrap `esp_timer_get_time()` and FreeRTOS delays (which
//! yield to other tasks, including the Wi-Fi stack). On the host they use
//! `std::time::Instant` and `std::thread::sleep`.

use embedded_hal::delay::DelayNs;

/// Milliseconds since boot; wraps after ~49.7 days.
pub struct MonotonicClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    #[cfg(target_os = "espidf")]
    pub fn uptime_ms(&self) -> u32 {
        let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() } as u64;
        (us / 1000) as u32
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

/// Blocking delay that yields the CPU.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDelay;

impl DelayNs for SystemDelay {
    #[cfg(target_os = "espidf")]
    fn delay_ns(&mut self, ns: u32) {
        esp_idf_hal::delay::FreeRtos::delay_us(ns.div_ceil(1000));
    }

    #[cfg(target_os = "espidf")]
    fn delay_ms(&mut self, ms: u32) {
        esp_idf_hal::delay::FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }
}
