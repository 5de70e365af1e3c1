use std::time::{Duration, Instant};

/// Time source threaded through the command processor, the façade's blocking
/// loops, and bootloader autobaud so tests can drive timeouts without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, dur: Duration);
}

/// Real clock: forwards to `std::time`/`std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, dur: Duration) {
        std::thread::sleep(dur);
    }
}

/// Deterministic test clock: `now()` starts at the instant the `FakeClock`
/// is created and advances only when `sleep` is called (no real waiting),
/// so timeout-dependent tests (command removal, `auto_connect` retries,
/// firmware-update polling) run instantly and reproducibly.
#[cfg(any(test, feature = "test-util"))]
pub struct FakeClock {
    origin: Instant,
    offset: std::sync::Mutex<Duration>,
}

#[cfg(any(test, feature = "test-util"))]
impl FakeClock {
    pub fn new() -> Self {
        Self { origin: Instant::now(), offset: std::sync::Mutex::new(Duration::ZERO) }
    }

    /// Advances the clock without blocking the calling thread.
    pub fn advance(&self, dur: Duration) {
        *self.offset.lock().unwrap() += dur;
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock().unwrap()
    }

    fn sleep(&self, dur: Duration) {
        self.advance(dur);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances_only_on_sleep() {
        let clock = FakeClock::new();
        let t0 = clock.now();
        clock.sleep(Duration::from_secs(5));
        assert_eq!(clock.now(), t0 + Duration::from_secs(5));
    }
}
