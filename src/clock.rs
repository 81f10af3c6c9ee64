use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// Monotonic source of "now", measured from an arbitrary origin.
pub trait TimeSource {
    fn now(&self) -> Duration;
}

impl<T> TimeSource for Arc<T>
where
    T: TimeSource + ?Sized,
{
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Wall-clock time source backed by [`std::time::Instant`].
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTime {
    origin: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl TimeSource for MonotonicTime {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Time source that only moves when told to.
///
/// Clones share the same reading, so a host can keep one handle to advance
/// time while the driver samples another.
#[derive(Debug, Clone, Default)]
pub struct ManualTime {
    now: Arc<Mutex<Duration>>,
}

impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, step: Duration) {
        *self.now.lock() += step;
    }

    pub fn set(&self, now: Duration) {
        *self.now.lock() = now;
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

/// Timing handed to the frame callback on every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Seconds since the current run started.
    pub elapsed: f64,
    /// Seconds since the previous tick of the current run.
    pub delta: f64,
    /// Zero-based tick index within the current run.
    pub frame: u64,
}

/// Start and last-sample instants of a single driver run.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    start: Duration,
    last: Duration,
    frame: u64,
}

impl Clock {
    /// Starts a run at `now`.
    pub fn start(now: Duration) -> Self {
        Self {
            start: now,
            last: now,
            frame: 0,
        }
    }

    /// Samples `now` and advances the clock.
    ///
    /// A source stepping backwards yields a zero delta and leaves `last`
    /// untouched, so `last >= start` always holds.
    pub fn tick(&mut self, now: Duration) -> FrameTime {
        let now = now.max(self.last);
        let elapsed = now.saturating_sub(self.start);
        let delta = now.saturating_sub(self.last);
        self.last = now;
        let time = FrameTime {
            elapsed: elapsed.as_secs_f64(),
            delta: delta.as_secs_f64(),
            frame: self.frame,
        };
        self.frame = self.frame.wrapping_add(1);
        time
    }

    /// Seconds between the run start and the most recent sample.
    pub fn elapsed(&self) -> f64 {
        self.last.saturating_sub(self.start).as_secs_f64()
    }

    /// Number of ticks sampled in this run.
    pub fn frames(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_delta_matches_elapsed() {
        let mut clock = Clock::start(Duration::from_millis(500));
        let time = clock.tick(Duration::from_millis(516));
        assert!((time.elapsed - 0.016).abs() < 1e-9);
        assert!((time.delta - 0.016).abs() < 1e-9);
        assert_eq!(time.frame, 0);
    }

    #[test]
    fn backwards_source_never_goes_negative() {
        let mut clock = Clock::start(Duration::from_secs(2));
        clock.tick(Duration::from_secs(3));
        let time = clock.tick(Duration::from_secs(1));
        assert_eq!(time.delta, 0.0);
        assert!((time.elapsed - 1.0).abs() < 1e-9);
        assert_eq!(clock.frames(), 2);
    }

    #[test]
    fn manual_time_clones_share_reading() {
        let time = ManualTime::new();
        let other = time.clone();
        time.advance(Duration::from_millis(40));
        assert_eq!(other.now(), Duration::from_millis(40));
        other.set(Duration::from_secs(1));
        assert_eq!(time.now(), Duration::from_secs(1));
    }
}
