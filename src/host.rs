use std::time::Duration;

use log::{debug, info};

use crate::clock::ManualTime;
use crate::driver::FrameDriver;
use crate::error::DriverError;

const DEFAULT_INTERVAL: Duration = Duration::from_nanos(16_666_667);

/// What a headless run delivered.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunSummary {
    /// Ticks that invoked the callback.
    pub frames: u64,
    /// Elapsed seconds reported to the last callback.
    pub elapsed: f64,
}

/// How a [`HeadlessHost`] waits for the next refresh.
#[derive(Debug, Clone)]
pub enum Pacing {
    /// Advance a manual clock by one refresh interval per frame, no sleeping.
    Simulated(ManualTime),
    /// Sleep until each refresh deadline.
    RealTime,
}

/// Frame host without a display.
///
/// Delivers the frames a [`FrameDriver`] asks for at a fixed refresh rate.
#[derive(Debug, Clone)]
pub struct HeadlessHost {
    interval: Duration,
    pacing: Pacing,
    max_frames: Option<u64>,
}

impl HeadlessHost {
    /// Rates that are not positive, or too slow to express as a
    /// [`Duration`], fall back to 60 Hz.
    pub fn new(refresh_rate_hz: f64, pacing: Pacing) -> Self {
        let interval = Duration::try_from_secs_f64(1.0 / refresh_rate_hz)
            .ok()
            .filter(|interval| refresh_rate_hz > 0.0 && !interval.is_zero())
            .unwrap_or(DEFAULT_INTERVAL);
        Self {
            interval,
            pacing,
            max_frames: None,
        }
    }

    /// Stops the driver once this many callback invocations have happened.
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Pumps frames until the driver stops.
    pub fn run<C>(
        &self,
        driver: &mut FrameDriver<C>,
        ctx: &mut C,
    ) -> Result<RunSummary, DriverError> {
        let mut summary = RunSummary::default();
        let mut deadline = std::time::Instant::now();
        while driver.frame_pending() {
            if self.max_frames.is_some_and(|max| summary.frames >= max) && driver.is_running() {
                debug!("headless frame budget of {} reached", summary.frames);
                driver.stop();
            }
            match &self.pacing {
                Pacing::Simulated(time) => time.advance(self.interval),
                Pacing::RealTime => {
                    deadline += self.interval;
                    let now = std::time::Instant::now();
                    if deadline > now {
                        std::thread::sleep(deadline - now);
                    } else {
                        deadline = now;
                    }
                }
            }
            if let Some(time) = driver.on_frame(ctx)?.time() {
                summary.frames += 1;
                summary.elapsed = time.elapsed;
            }
        }
        info!("headless host delivered {} frame(s)", summary.frames);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FrameTime;
    use crate::scheduler::ManualScheduler;

    #[test]
    fn simulated_pacing_uses_the_refresh_interval() {
        let time = ManualTime::new();
        let host = HeadlessHost::new(50.0, Pacing::Simulated(time.clone())).with_max_frames(4);
        let mut driver: FrameDriver<Vec<FrameTime>> =
            FrameDriver::new(ManualScheduler::new(), time.clone());
        driver
            .start(|seen: &mut Vec<FrameTime>, t| {
                seen.push(t);
                Ok(())
            })
            .unwrap();
        let mut seen = Vec::new();
        let summary = host.run(&mut driver, &mut seen).unwrap();
        assert_eq!(summary.frames, 4);
        assert!((summary.elapsed - 0.08).abs() < 1e-9);
        assert_eq!(seen.len(), 4);
        for frame in &seen {
            assert!((frame.delta - 0.02).abs() < 1e-9);
        }
        assert!((seen[3].elapsed - 0.08).abs() < 1e-9);
        assert!(!driver.is_running());
    }

    #[test]
    fn run_returns_when_callback_stops_the_loop() {
        let time = ManualTime::new();
        let host = HeadlessHost::new(60.0, Pacing::Simulated(time.clone())).with_max_frames(100);
        let mut driver: FrameDriver<u32> = FrameDriver::new(ManualScheduler::new(), time);
        let handle = driver.handle();
        driver
            .start(move |count: &mut u32, _| {
                *count += 1;
                if *count == 5 {
                    handle.stop();
                }
                Ok(())
            })
            .unwrap();
        let mut count = 0;
        assert_eq!(host.run(&mut driver, &mut count).unwrap().frames, 5);
        assert_eq!(count, 5);
    }

    #[test]
    fn realtime_pacing_sleeps_between_frames() {
        let host = HeadlessHost::new(500.0, Pacing::RealTime).with_max_frames(3);
        let mut driver: FrameDriver<u32> = FrameDriver::with_scheduler(ManualScheduler::new());
        driver
            .start(|count: &mut u32, _| {
                *count += 1;
                Ok(())
            })
            .unwrap();
        let mut count = 0;
        let summary = host.run(&mut driver, &mut count).unwrap();
        assert_eq!(summary.frames, 3);
        assert_eq!(count, 3);
        assert!(summary.elapsed > 0.0);
        assert!(!driver.is_running());
    }

    #[test]
    fn unrepresentable_refresh_rates_fall_back_to_sixty_hertz() {
        for hz in [1e-20, f64::MIN_POSITIVE, f64::INFINITY, f64::NAN, -5.0] {
            assert_eq!(HeadlessHost::new(hz, Pacing::RealTime).interval(), DEFAULT_INTERVAL);
        }
    }

    #[test]
    fn invalid_refresh_rate_falls_back_to_sixty_hertz() {
        let host = HeadlessHost::new(0.0, Pacing::RealTime);
        assert_eq!(host.interval(), DEFAULT_INTERVAL);
    }

    #[test]
    fn idle_driver_returns_immediately() {
        let host = HeadlessHost::new(60.0, Pacing::RealTime);
        let mut driver: FrameDriver<()> =
            FrameDriver::new(ManualScheduler::new(), ManualTime::new());
        assert_eq!(host.run(&mut driver, &mut ()).unwrap(), RunSummary::default());
    }
}
