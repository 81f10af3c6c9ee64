/// Device pixel ratios above this cost fill rate without a visible gain.
pub const DEFAULT_MAX_PIXEL_RATIO: f64 = 2.0;

/// Drawable area in logical pixels plus the display's pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f64,
    pub max_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            device_pixel_ratio: 1.0,
            max_pixel_ratio: DEFAULT_MAX_PIXEL_RATIO,
        }
    }

    pub fn with_device_pixel_ratio(mut self, ratio: f64) -> Self {
        self.device_pixel_ratio = ratio;
        self
    }

    pub fn with_max_pixel_ratio(mut self, ratio: f64) -> Self {
        self.max_pixel_ratio = ratio;
        self
    }

    /// Zero sizes are clamped to one pixel so the aspect ratio stays finite.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Pixel ratio used for rendering: the device ratio capped at the maximum.
    pub fn pixel_ratio(&self) -> f64 {
        let ratio = if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        };
        ratio.min(self.max_pixel_ratio.max(1.0))
    }

    /// Render target size in physical pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        let ratio = self.pixel_ratio();
        (
            ((self.width as f64 * ratio).round() as u32).max(1),
            ((self.height as f64 * ratio).round() as u32).max(1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_ratio_is_capped() {
        let viewport = Viewport::new(800, 600).with_device_pixel_ratio(3.0);
        assert_eq!(viewport.pixel_ratio(), 2.0);
        assert_eq!(viewport.physical_size(), (1600, 1200));
        let retina = viewport.with_device_pixel_ratio(1.5);
        assert_eq!(retina.physical_size(), (1200, 900));
    }

    #[test]
    fn zero_sized_window_keeps_finite_aspect() {
        let mut viewport = Viewport::new(800, 600);
        viewport.resize(1024, 0);
        assert_eq!(viewport.height, 1);
        assert!(viewport.aspect().is_finite());
    }
}
