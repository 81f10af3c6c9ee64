//! Browser host: `requestAnimationFrame` schedules frames and
//! `performance.now()` is the time source.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::clock::{FrameTime, TimeSource};
use crate::driver::{DriverHandle, FrameDriver};
use crate::scheduler::FrameScheduler;

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
}

/// Monotonic milliseconds from `window.performance`.
pub struct PerformanceTime {
    performance: web_sys::Performance,
}

impl PerformanceTime {
    pub fn new() -> Result<Self> {
        let performance = web_sys::window()
            .and_then(|window| window.performance())
            .ok_or_else(|| anyhow!("window.performance is not available"))?;
        Ok(Self { performance })
    }
}

impl TimeSource for PerformanceTime {
    fn now(&self) -> Duration {
        Duration::from_secs_f64(self.performance.now().max(0.0) / 1000.0)
    }
}

type FrameClosure = Closure<dyn FnMut(f64)>;

/// Requests one animation frame per call, invoking a shared closure.
pub struct AnimationFrameScheduler {
    window: web_sys::Window,
    closure: Rc<RefCell<Option<FrameClosure>>>,
}

impl FrameScheduler for AnimationFrameScheduler {
    fn request_frame(&mut self) -> Result<()> {
        let slot = self.closure.borrow();
        let closure = slot
            .as_ref()
            .ok_or_else(|| anyhow!("animation frame callback is not installed"))?;
        self.window
            .request_animation_frame(closure.as_ref().unchecked_ref())
            .map_err(|err| anyhow!("requestAnimationFrame failed: {err:?}"))?;
        Ok(())
    }
}

/// Frame loop exported to JavaScript.
///
/// ```js
/// const loop = new WebFrameLoop();
/// loop.start((elapsed, delta) => { mesh.rotation.y = elapsed; renderer.render(scene, camera); });
/// loop.stop();
/// ```
///
/// Stop the loop before freeing it; a frame already requested would
/// otherwise call into a dropped closure.
#[wasm_bindgen]
pub struct WebFrameLoop {
    driver: Rc<RefCell<FrameDriver<()>>>,
    handle: DriverHandle,
}

#[wasm_bindgen]
impl WebFrameLoop {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WebFrameLoop, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("window not available"))?;
        let time = PerformanceTime::new().map_err(|err| JsValue::from_str(&err.to_string()))?;
        let slot = Rc::new(RefCell::new(None));
        let scheduler = AnimationFrameScheduler {
            window,
            closure: Rc::clone(&slot),
        };
        let driver = FrameDriver::new(scheduler, time);
        let handle = driver.handle();
        let driver = Rc::new(RefCell::new(driver));

        let weak = Rc::downgrade(&driver);
        let on_frame = Closure::wrap(Box::new(move |_timestamp: f64| {
            let Some(driver) = weak.upgrade() else {
                return;
            };
            let Ok(mut driver) = driver.try_borrow_mut() else {
                web_sys::console::error_1(&JsValue::from_str("frame delivered re-entrantly"));
                return;
            };
            if let Err(err) = driver.on_frame(&mut ()) {
                let err = anyhow::Error::from(err);
                web_sys::console::error_1(&JsValue::from_str(&format!("{err:#}")));
            }
        }) as Box<dyn FnMut(f64)>);
        *slot.borrow_mut() = Some(on_frame);

        Ok(Self { driver, handle })
    }

    /// Calls `callback(elapsed, delta)` once per display refresh until
    /// stopped. Calling it again restarts the clock at zero.
    pub fn start(&self, callback: js_sys::Function) -> Result<(), JsValue> {
        let mut driver = self
            .driver
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("start cannot be called from inside a frame"))?;
        driver
            .start(move |_: &mut (), time: FrameTime| {
                callback
                    .call2(
                        &JsValue::NULL,
                        &JsValue::from_f64(time.elapsed),
                        &JsValue::from_f64(time.delta),
                    )
                    .map(|_| ())
                    .map_err(|err| anyhow!("frame callback threw: {err:?}"))
            })
            .map_err(|err| JsValue::from_str(&format!("{:#}", anyhow::Error::from(err))))
    }

    /// Stops the loop after the current frame. Safe to call from inside the
    /// frame callback and when already stopped.
    pub fn stop(&self) {
        self.handle.stop();
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }
}
