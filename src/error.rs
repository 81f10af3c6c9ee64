use thiserror::Error;

/// Failures surfaced by [`crate::FrameDriver`].
#[derive(Debug, Error)]
pub enum DriverError {
    /// The frame callback returned an error. The driver has stopped.
    #[error("frame callback failed on frame {frame}")]
    CallbackFailed {
        frame: u64,
        #[source]
        source: anyhow::Error,
    },
    /// The host refused to schedule the next frame. The driver has stopped.
    #[error("failed to schedule the next frame")]
    Schedule(#[source] anyhow::Error),
}

/// Invalid vertex data handed to [`crate::geometry::BufferGeometry`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("position buffer is empty")]
    Empty,
    #[error("position buffer holds {len} floats, expected a multiple of 9 (three xyz vertices per triangle)")]
    NotTriangles { len: usize },
    #[error("index {index} is out of range for {vertices} vertices")]
    IndexOutOfRange { index: u32, vertices: usize },
}
