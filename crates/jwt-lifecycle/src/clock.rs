//! Time sources for claim generation and validation.
//!
//! Every temporal decision (issuing `iat`/`nbf`/`exp`, expiry and refresh
//! window checks, blacklist grace periods) reads the time from a [`Clock`], so
//! tests can pin or advance it with [`ManualClock`].

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use time::{Duration, OffsetDateTime};

/// A source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current time.
    fn now(&self) -> OffsetDateTime;

    /// Returns the current time as a unix timestamp in seconds.
    fn timestamp(&self) -> i64 {
        self.now().unix_timestamp()
    }
}

/// Wall clock time (UTC).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock that only moves when told to.
///
/// Resolution is one second, matching the resolution of JWT timestamps.
#[derive(Debug)]
pub struct ManualClock {
    timestamp: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at the given unix timestamp.
    #[must_use]
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp: AtomicI64::new(timestamp),
        }
    }

    /// Creates a clock frozen at the current wall clock time.
    #[must_use]
    pub fn starting_now() -> Self {
        Self::new(OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Moves the clock forward (or backward, for negative durations).
    pub fn advance(&self, by: Duration) {
        self.timestamp
            .fetch_add(by.whole_seconds(), Ordering::SeqCst);
    }

    /// Sets the clock to the given unix timestamp.
    pub fn set(&self, timestamp: i64) {
        self.timestamp.store(timestamp, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.timestamp())
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    fn timestamp(&self) -> i64 {
        self.timestamp.load(Ordering::SeqCst)
    }
}
