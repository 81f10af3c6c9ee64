use anyhow::Result;

/// Host primitive that delivers frames to a [`crate::FrameDriver`].
///
/// `request_frame` must arrange for the host to call
/// [`crate::FrameDriver::on_frame`] exactly once, asynchronously, near the next
/// display refresh. The driver never has more than one request outstanding.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> Result<()>;
}

impl<T> FrameScheduler for Box<T>
where
    T: FrameScheduler + ?Sized,
{
    fn request_frame(&mut self) -> Result<()> {
        (**self).request_frame()
    }
}

/// Scheduler for hosts that pump frames themselves.
///
/// It only counts requests; the host checks
/// [`crate::FrameDriver::frame_pending`] to know when to deliver a frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualScheduler {
    requests: u64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> Result<()> {
        self.requests += 1;
        Ok(())
    }
}
