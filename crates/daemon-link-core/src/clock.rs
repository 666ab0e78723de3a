//! Injectable time source.

use std::time::{SystemTime, UNIX_EPOCH};

/// Time source for anything that computes or checks expiry.
///
/// Token stores and the auth layer take a `Clock` instead of reading
/// system time directly, so tests can pin the clock and observe expiry
/// without sleeping.
pub trait Clock: Send + Sync {
    /// Current time as Unix epoch seconds.
    fn now_unix(&self) -> i64;
}

/// Wall-clock implementation used outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock for deterministic expiry in tests.
#[derive(Debug, Default)]
pub struct FixedClock(std::sync::atomic::AtomicI64);

impl FixedClock {
    /// Create a clock pinned at the given Unix timestamp.
    #[must_use]
    pub fn at(now: i64) -> Self {
        Self(std::sync::atomic::AtomicI64::new(now))
    }

    /// Move the clock forward by `secs`.
    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_unix(&self) -> i64 {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::at(1_000);
        assert_eq!(clock.now_unix(), 1_000);
        clock.advance(30);
        assert_eq!(clock.now_unix(), 1_030);
    }

    #[test]
    fn system_clock_is_past_2020() {
        let now = SystemClock.now_unix();
        // 2020-01-01T00:00:00Z
        assert!(now > 1_577_836_800);
    }
}
