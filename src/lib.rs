//! A frame driver for real-time render loops, plus the scene model, lessons
//! and hosts built on top of it.
//!
//! [`FrameDriver`] repeatedly invokes a callback at the host's refresh
//! cadence, handing it elapsed and delta seconds, until stopped. Hosts plug
//! in through [`FrameScheduler`] and [`TimeSource`]: a headless host pumps
//! frames at a fixed rate, the native host uses window redraw requests, and
//! the wasm build uses `requestAnimationFrame`.

pub mod app;
pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod geometry;
#[cfg(not(target_arch = "wasm32"))]
pub mod host;
pub mod input;
pub mod lessons;
#[cfg(not(target_arch = "wasm32"))]
pub mod render;
pub mod scene;
pub mod scheduler;
pub mod tween;
pub mod viewport;
#[cfg(target_arch = "wasm32")]
pub mod web;
#[cfg(not(target_arch = "wasm32"))]
pub mod window;

#[cfg(not(target_arch = "wasm32"))]
pub use clock::MonotonicTime;
pub use clock::{Clock, FrameTime, ManualTime, TimeSource};
pub use config::RuntimeConfig;
pub use driver::{DriverHandle, DriverState, FrameCallback, FrameDriver, TickOutcome};
pub use error::{DriverError, GeometryError};
pub use geometry::BufferGeometry;
#[cfg(not(target_arch = "wasm32"))]
pub use host::{HeadlessHost, Pacing, RunSummary};
pub use input::{InputState, KeyCode, MouseButton, NamedKey};
pub use lessons::{Lesson, LessonContext, LessonSetup};
pub use scene::{PerspectiveCamera, Scene, SceneObject, Transform};
pub use scheduler::{FrameScheduler, ManualScheduler};
pub use tween::{Ease, Timeline, Tween};
pub use viewport::Viewport;
