//! Native windowed host: redraw requests are the frame scheduler.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use log::{error, info, warn};
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, KeyEvent, MouseButton as WinitMouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode as WinitKey, PhysicalKey};
use winit::window::{Fullscreen, Window, WindowId};

use crate::app::{print_final_state, start_animation, Loaded};
use crate::clock::{MonotonicTime, TimeSource};
use crate::config::RuntimeConfig;
use crate::driver::{FrameCallback, FrameDriver};
use crate::input::{KeyCode, MouseButton, NamedKey};
use crate::lessons::{Lesson, LessonContext};
use crate::render::{RenderError, Renderer};
use crate::scheduler::FrameScheduler;
use crate::viewport::Viewport;

/// Schedules frames by asking the window for a redraw.
pub struct WindowScheduler {
    window: Arc<Window>,
}

impl WindowScheduler {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window }
    }
}

impl FrameScheduler for WindowScheduler {
    fn request_frame(&mut self) -> Result<()> {
        self.window.request_redraw();
        Ok(())
    }
}

/// The display could not be opened. Callers may fall back to headless mode.
#[derive(Debug)]
pub struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

/// Opens a window and drives the loaded lesson until the window closes.
pub fn run(config: &RuntimeConfig, loaded: Loaded) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = WindowApp {
        title: format!("Frame Driver - {}", loaded.label),
        initial_size: LogicalSize::new(config.width, config.height),
        lesson: loaded.lesson,
        context: loaded.setup.context,
        pending_animation: loaded.setup.animation,
        surface: None,
        time: MonotonicTime::new(),
        last_error: None,
    };

    event_loop
        .run_app(&mut app)
        .context("window event loop terminated with error")?;

    if let Some(err) = app.last_error {
        return Err(err);
    }
    info!("window closed");
    print_final_state(&app.context.scene);
    Ok(())
}

struct WindowSurface {
    window: Arc<Window>,
    renderer: Renderer,
    driver: FrameDriver<LessonContext>,
}

struct WindowApp {
    title: String,
    initial_size: LogicalSize<u32>,
    lesson: Option<Lesson>,
    context: LessonContext,
    pending_animation: Option<FrameCallback<LessonContext>>,
    surface: Option<WindowSurface>,
    time: MonotonicTime,
    last_error: Option<anyhow::Error>,
}

impl WindowApp {
    fn open(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(self.initial_size);
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );
        self.context.viewport.device_pixel_ratio = window.scale_factor();
        let logical = window.inner_size().to_logical::<f64>(window.scale_factor());
        self.context
            .resize(logical.width.round() as u32, logical.height.round() as u32);
        let size = surface_size(&self.context.viewport);
        info!(
            "surface {}x{} at pixel ratio {:.1} (device {:.1})",
            size.width,
            size.height,
            self.context.viewport.pixel_ratio(),
            window.scale_factor()
        );

        let renderer = block_on(Renderer::new(Arc::clone(&window), size))
            .map_err(|err| WindowInitError::from_error("renderer", format!("{err:#}")))?;

        let mut driver = FrameDriver::with_scheduler(WindowScheduler::new(Arc::clone(&window)));
        start_animation(&mut driver, self.pending_animation.take())?;
        self.surface = Some(WindowSurface {
            window,
            renderer,
            driver,
        });
        Ok(())
    }

    fn process_event(&mut self, event: WindowEvent, event_loop: &ActiveEventLoop) -> Result<()> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(());
        };
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                let logical = size.to_logical::<f64>(surface.window.scale_factor());
                self.context
                    .resize(logical.width.round() as u32, logical.height.round() as u32);
                surface.renderer.resize(surface_size(&self.context.viewport));
                let viewport = &self.context.viewport;
                info!(
                    "viewport {}x{} at pixel ratio {:.1}",
                    viewport.width,
                    viewport.height,
                    viewport.pixel_ratio()
                );
                surface.window.request_redraw();
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.context.viewport.device_pixel_ratio = scale_factor;
                surface.renderer.resize(surface_size(&self.context.viewport));
                surface.window.request_redraw();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_keyboard(&event, event_loop)?;
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.handle_mouse_button(state, button);
            }
            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f32>(surface.window.scale_factor());
                let viewport = self.context.viewport;
                self.context
                    .input
                    .set_pointer_position(Vec2::new(logical.x, logical.y), &viewport);
            }
            WindowEvent::RedrawRequested => {
                if surface.driver.frame_pending() {
                    surface.driver.on_frame(&mut self.context)?;
                }
                match surface.renderer.render(&self.context.scene) {
                    Ok(()) => {}
                    Err(RenderError::Surface(
                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated,
                    )) => {
                        surface.renderer.resize(surface_size(&self.context.viewport));
                    }
                    Err(RenderError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                        return Err(anyhow!("GPU is out of memory"));
                    }
                    Err(RenderError::Surface(err)) => {
                        warn!("surface error {err}; retrying next frame");
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_keyboard(&mut self, event: &KeyEvent, event_loop: &ActiveEventLoop) -> Result<()> {
        let Some(key) = map_keycode(&event.physical_key) else {
            return Ok(());
        };
        if event.state == ElementState::Released {
            self.context.input.set_key_up(key);
            return Ok(());
        }
        self.context.input.set_key_down(key);
        if event.repeat {
            return Ok(());
        }
        match key {
            KeyCode::Named(NamedKey::Escape) => event_loop.exit(),
            KeyCode::Named(NamedKey::Space) => self.toggle_animation()?,
            _ => {}
        }
        Ok(())
    }

    fn toggle_animation(&mut self) -> Result<()> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(());
        };
        if surface.driver.is_running() {
            info!("animation paused");
            surface.driver.stop();
        } else {
            info!("animation restarted");
            let animation = self.lesson.and_then(Lesson::animation);
            start_animation(&mut surface.driver, animation)?;
        }
        Ok(())
    }

    fn handle_mouse_button(&mut self, state: ElementState, button: WinitMouseButton) {
        let button = map_mouse_button(button);
        match state {
            ElementState::Pressed => {
                let double = self
                    .context
                    .input
                    .set_mouse_button_down(button, self.time.now());
                if double && button == MouseButton::LEFT {
                    self.toggle_fullscreen();
                }
            }
            ElementState::Released => self.context.input.set_mouse_button_up(button),
        }
    }

    fn toggle_fullscreen(&self) {
        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        if surface.window.fullscreen().is_some() {
            surface.window.set_fullscreen(None);
        } else {
            surface
                .window
                .set_fullscreen(Some(Fullscreen::Borderless(None)));
        }
    }
}

impl ApplicationHandler for WindowApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surface.is_some() {
            return;
        }
        if let Err(err) = self.open(event_loop) {
            error!("failed to open window: {err:#}");
            self.last_error = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self
            .surface
            .as_ref()
            .is_none_or(|surface| surface.renderer.window_id() != window_id)
        {
            return;
        }
        if let Err(err) = self.process_event(event, event_loop) {
            self.last_error = Some(err);
            event_loop.exit();
        }
    }
}

/// Render target size for `viewport`: logical size times the capped pixel
/// ratio, so a 3x display with a cap of 2 renders at 2x.
fn surface_size(viewport: &Viewport) -> PhysicalSize<u32> {
    let (width, height) = viewport.physical_size();
    PhysicalSize::new(width, height)
}

fn map_mouse_button(button: WinitMouseButton) -> MouseButton {
    match button {
        WinitMouseButton::Left => MouseButton::LEFT,
        WinitMouseButton::Right => MouseButton::RIGHT,
        WinitMouseButton::Middle => MouseButton::MIDDLE,
        WinitMouseButton::Back => MouseButton::new(3),
        WinitMouseButton::Forward => MouseButton::new(4),
        WinitMouseButton::Other(value) => MouseButton::new(value.min(u8::MAX as u16) as u8),
    }
}

fn map_keycode(key: &PhysicalKey) -> Option<KeyCode> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    Some(match code {
        WinitKey::Space => KeyCode::Named(NamedKey::Space),
        WinitKey::Enter => KeyCode::Named(NamedKey::Enter),
        WinitKey::Tab => KeyCode::Named(NamedKey::Tab),
        WinitKey::ArrowLeft => KeyCode::Named(NamedKey::Left),
        WinitKey::ArrowRight => KeyCode::Named(NamedKey::Right),
        WinitKey::ArrowUp => KeyCode::Named(NamedKey::Up),
        WinitKey::ArrowDown => KeyCode::Named(NamedKey::Down),
        WinitKey::Escape => KeyCode::Named(NamedKey::Escape),
        WinitKey::Backspace => KeyCode::Named(NamedKey::Backspace),
        WinitKey::Digit0 => KeyCode::Digit(0),
        WinitKey::Digit1 => KeyCode::Digit(1),
        WinitKey::Digit2 => KeyCode::Digit(2),
        WinitKey::Digit3 => KeyCode::Digit(3),
        WinitKey::Digit4 => KeyCode::Digit(4),
        WinitKey::Digit5 => KeyCode::Digit(5),
        WinitKey::Digit6 => KeyCode::Digit(6),
        WinitKey::Digit7 => KeyCode::Digit(7),
        WinitKey::Digit8 => KeyCode::Digit(8),
        WinitKey::Digit9 => KeyCode::Digit(9),
        WinitKey::KeyA => KeyCode::Character('A'),
        WinitKey::KeyD => KeyCode::Character('D'),
        WinitKey::KeyF => KeyCode::Character('F'),
        WinitKey::KeyQ => KeyCode::Character('Q'),
        WinitKey::KeyR => KeyCode::Character('R'),
        WinitKey::KeyS => KeyCode::Character('S'),
        WinitKey::KeyW => KeyCode::Character('W'),
        WinitKey::F1 => KeyCode::Function(1),
        WinitKey::F2 => KeyCode::Function(2),
        WinitKey::F3 => KeyCode::Function(3),
        WinitKey::F4 => KeyCode::Function(4),
        WinitKey::F5 => KeyCode::Function(5),
        WinitKey::F6 => KeyCode::Function(6),
        WinitKey::F7 => KeyCode::Function(7),
        WinitKey::F8 => KeyCode::Function(8),
        WinitKey::F9 => KeyCode::Function(9),
        WinitKey::F10 => KeyCode::Function(10),
        WinitKey::F11 => KeyCode::Function(11),
        WinitKey::F12 => KeyCode::Function(12),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_control_keys() {
        assert_eq!(
            map_keycode(&PhysicalKey::Code(WinitKey::Space)),
            Some(KeyCode::Named(NamedKey::Space))
        );
        assert_eq!(
            map_keycode(&PhysicalKey::Code(WinitKey::Escape)),
            Some(KeyCode::Named(NamedKey::Escape))
        );
        assert_eq!(map_keycode(&PhysicalKey::Code(WinitKey::Digit7)), Some(KeyCode::Digit(7)));
        assert_eq!(map_keycode(&PhysicalKey::Code(WinitKey::NumLock)), None);
    }

    #[test]
    fn maps_mouse_buttons() {
        assert_eq!(map_mouse_button(WinitMouseButton::Left), MouseButton::LEFT);
        assert_eq!(map_mouse_button(WinitMouseButton::Other(900)).index(), u8::MAX);
    }

    #[test]
    fn surface_size_caps_the_device_pixel_ratio() {
        let viewport = Viewport::new(800, 600)
            .with_device_pixel_ratio(3.0)
            .with_max_pixel_ratio(2.0);
        assert_eq!(surface_size(&viewport), PhysicalSize::new(1600, 1200));

        let low_density = viewport.with_device_pixel_ratio(1.5);
        assert_eq!(surface_size(&low_density), PhysicalSize::new(1200, 900));

        let uncapped = viewport.with_max_pixel_ratio(4.0);
        assert_eq!(surface_size(&uncapped), PhysicalSize::new(2400, 1800));
    }

    #[test]
    fn init_errors_keep_stage_and_cause() {
        let err = WindowInitError::from_error("window", "no display");
        assert_eq!(err.to_string(), "failed to initialize window: no display");
        let panic: Box<dyn Any + Send> = Box::new("boom");
        assert!(WindowInitError::from_panic("event loop", panic)
            .to_string()
            .ends_with("boom"));
    }
}
