//! The frame driver: a minimal real-time scheduler for render loops.
//!
//! The driver owns a [`Clock`] and a running flag. Each time the host delivers
//! a frame through [`FrameDriver::on_frame`], the driver samples its time
//! source, invokes the frame callback with elapsed and delta seconds, and asks
//! the [`FrameScheduler`] for the next frame while the flag stays set.
//!
//! Restart semantics: calling [`FrameDriver::start`] while already running
//! restarts the run in place. The clock resets, the callback is replaced and
//! the frame request already outstanding serves the new run, so two loops
//! never interleave. Calling [`FrameDriver::stop`] on a stopped driver does
//! nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, trace, warn};

use crate::clock::{Clock, FrameTime, TimeSource};
use crate::error::DriverError;
use crate::scheduler::FrameScheduler;

/// Per-frame callback. Receives the host-owned context and the frame timing.
pub type FrameCallback<C> = Box<dyn FnMut(&mut C, FrameTime) -> anyhow::Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Stopped,
    Running,
}

/// Shared view of the driver's running flag.
///
/// Cloning is cheap; a callback can capture a handle to stop its own loop.
#[derive(Debug, Clone, Default)]
pub struct DriverHandle {
    running: Arc<AtomicBool>,
}

impl DriverHandle {
    /// Clears the running flag. Takes effect at the next scheduling boundary.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn set_running(&self) {
        self.running.store(true, Ordering::Release);
    }
}

/// Result of delivering one frame to the driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The callback ran with this timing.
    Ticked(FrameTime),
    /// The driver was stopped; the callback did not run.
    Idle,
}

impl TickOutcome {
    pub fn ticked(&self) -> bool {
        matches!(self, Self::Ticked(_))
    }

    pub fn time(&self) -> Option<FrameTime> {
        match self {
            Self::Ticked(time) => Some(*time),
            Self::Idle => None,
        }
    }
}

/// Invokes a frame callback at the host's refresh cadence until stopped.
pub struct FrameDriver<C> {
    scheduler: Box<dyn FrameScheduler>,
    time: Arc<dyn TimeSource>,
    handle: DriverHandle,
    clock: Option<Clock>,
    callback: Option<FrameCallback<C>>,
    frame_pending: bool,
}

impl<C> FrameDriver<C> {
    pub fn new<S, T>(scheduler: S, time: T) -> Self
    where
        S: FrameScheduler + 'static,
        T: TimeSource + 'static,
    {
        Self {
            scheduler: Box::new(scheduler),
            time: Arc::new(time),
            handle: DriverHandle::default(),
            clock: None,
            callback: None,
            frame_pending: false,
        }
    }

    /// Creates a driver sampling wall-clock time.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn with_scheduler<S>(scheduler: S) -> Self
    where
        S: FrameScheduler + 'static,
    {
        Self::new(scheduler, crate::clock::MonotonicTime::new())
    }

    /// Starts a new run and requests the first frame.
    ///
    /// The clock restarts at the current instant, so `elapsed` begins again
    /// at zero even when the driver was already running.
    pub fn start<F>(&mut self, callback: F) -> Result<(), DriverError>
    where
        F: FnMut(&mut C, FrameTime) -> anyhow::Result<()> + 'static,
    {
        if self.handle.is_running() {
            debug!("frame driver restarted while running; elapsed time resets");
        } else {
            debug!("frame driver started");
        }
        self.clock = Some(Clock::start(self.time.now()));
        self.callback = Some(Box::new(callback));
        self.handle.set_running();
        self.schedule()
    }

    /// Clears the running flag. The callback is not invoked again once the
    /// next frame boundary observes it. Idempotent.
    pub fn stop(&mut self) {
        if self.handle.is_running() {
            debug!("frame driver stop requested");
            self.handle.stop();
        } else {
            trace!("frame driver already stopped");
        }
    }

    /// Delivers the frame previously requested from the scheduler.
    ///
    /// Errors returned by the callback are not retried: the driver stops and
    /// the error is handed back to the host.
    pub fn on_frame(&mut self, ctx: &mut C) -> Result<TickOutcome, DriverError> {
        self.frame_pending = false;
        if !self.handle.is_running() {
            self.halt();
            return Ok(TickOutcome::Idle);
        }
        let (Some(mut clock), Some(mut callback)) = (self.clock, self.callback.take()) else {
            self.halt();
            return Ok(TickOutcome::Idle);
        };

        let time = clock.tick(self.time.now());
        self.clock = Some(clock);
        trace!(
            "frame {} elapsed={:.4}s delta={:.4}s",
            time.frame,
            time.elapsed,
            time.delta
        );

        if let Err(source) = callback(ctx, time) {
            warn!("frame callback failed on frame {}: {source:#}", time.frame);
            self.halt();
            return Err(DriverError::CallbackFailed {
                frame: time.frame,
                source,
            });
        }

        if self.handle.is_running() {
            self.callback = Some(callback);
            self.schedule()?;
        } else {
            debug!("frame driver stopped after {} frame(s)", time.frame + 1);
            self.halt();
        }
        Ok(TickOutcome::Ticked(time))
    }

    pub fn state(&self) -> DriverState {
        if self.handle.is_running() {
            DriverState::Running
        } else {
            DriverState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    /// True while a requested frame has not been delivered yet.
    pub fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    /// Handle sharing this driver's running flag.
    pub fn handle(&self) -> DriverHandle {
        self.handle.clone()
    }

    /// Seconds elapsed in the current run at the last tick, if running.
    pub fn elapsed(&self) -> Option<f64> {
        self.clock.map(|clock| clock.elapsed())
    }

    /// Ticks completed in the current run.
    pub fn frames(&self) -> u64 {
        self.clock.map(|clock| clock.frames()).unwrap_or(0)
    }

    fn schedule(&mut self) -> Result<(), DriverError> {
        if self.frame_pending {
            return Ok(());
        }
        if let Err(err) = self.scheduler.request_frame() {
            self.halt();
            return Err(DriverError::Schedule(err));
        }
        self.frame_pending = true;
        Ok(())
    }

    fn halt(&mut self) {
        self.handle.stop();
        self.clock = None;
        self.callback = None;
    }
}
