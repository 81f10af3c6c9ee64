mod native;

pub use native::{RenderError, Renderer};
