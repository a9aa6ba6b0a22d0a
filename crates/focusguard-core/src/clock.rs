//! Time sources.
//!
//! Countdowns run on the monotonic clock so wall-clock jumps never stretch
//! or shorten a phase. The wall clock is only consulted for the night
//! window, and may carry an offset measured against an external reference
//! (NTP or similar; fetching that offset is the host's job).

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Read-only, shareable clock.
pub trait TimeSource: Send + Sync {
    fn now_monotonic(&self) -> Instant;

    fn now_wall(&self) -> DateTime<Utc>;
}

/// Both clocks read at one instant. Every transition takes one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Now {
    pub monotonic: Instant,
    pub wall: DateTime<Utc>,
}

impl Now {
    pub fn read(source: &dyn TimeSource) -> Self {
        Self {
            monotonic: source.now_monotonic(),
            wall: source.now_wall(),
        }
    }

    /// Same instant shifted forward on both clocks.
    pub fn after(self, by: Duration) -> Self {
        Self {
            monotonic: self.monotonic + by,
            wall: self.wall + chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero()),
        }
    }
}

/// Host clock with an optional wall-clock correction.
#[derive(Debug, Default)]
pub struct SystemClock {
    offset_ms: AtomicI64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the correction (reference minus local), in seconds.
    pub fn set_offset(&self, offset_secs: f64) {
        let ms = (offset_secs * 1000.0).round() as i64;
        self.offset_ms.store(ms, Ordering::Relaxed);
        tracing::info!(offset_ms = ms, "wall clock offset updated");
    }

    pub fn offset(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.offset_ms.load(Ordering::Relaxed))
    }
}

impl TimeSource for SystemClock {
    fn now_monotonic(&self) -> Instant {
        Instant::now()
    }

    fn now_wall(&self) -> DateTime<Utc> {
        Utc::now() + self.offset()
    }
}

/// Deterministic clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    inner: Mutex<(Instant, DateTime<Utc>)>,
}

impl ManualClock {
    pub fn new(wall: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new((Instant::now(), wall)),
        }
    }

    /// Move both clocks forward.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.0 += by;
        guard.1 += chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }

    /// Jump the wall clock only, like a user editing the system time.
    pub fn set_wall(&self, wall: DateTime<Utc>) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.1 = wall;
    }
}

impl TimeSource for ManualClock {
    fn now_monotonic(&self) -> Instant {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).0
    }

    fn now_wall(&self) -> DateTime<Utc> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).1
    }
}
