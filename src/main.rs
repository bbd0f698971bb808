//! Ballpit entry point
//!
//! Handles platform-specific initialization and runs the frame loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod web_host {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::HtmlCanvasElement;

    use ballpit::diagnostics::DiagnosticsSink;
    use ballpit::platform::web::{IntervalHandle, TickTimer, WebBackend, load_module, now_ms};
    use ballpit::renderer::{CanvasSurface, Surface};
    use ballpit::{HostError, HostSettings, SimulationSession};

    /// Everything the frame loop touches
    struct Host {
        session: SimulationSession<WebBackend>,
        surface: CanvasSurface,
    }

    impl Host {
        /// Run one timer tick: steps first, then the frame
        fn frame(&mut self) -> Result<(), HostError> {
            let report = self.session.frame(now_ms(), &mut self.surface)?;
            if report.tick.dropped_steps > 0 {
                log::debug!(
                    "Frame {}: {} steps, {} dropped",
                    self.session.frames(),
                    report.tick.steps,
                    report.tick.dropped_steps
                );
            }
            Ok(())
        }
    }

    /// The running host and its timer, kept for the page lifetime
    struct Running {
        host: Rc<RefCell<Host>>,
        _timer: TickTimer,
    }

    thread_local! {
        static RUNNING: RefCell<Option<Running>> = const { RefCell::new(None) };
    }

    pub async fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        log::info!("Ballpit starting...");

        let settings = HostSettings::load();
        // Write back so the stored copy carries every field with its effective value
        settings.save();
        log::set_max_level(settings.log_level);

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");
        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .expect("no canvas")
            .dyn_into()?;

        let mut surface = CanvasSurface::from_canvas(&canvas)?;
        surface.clear(settings.style.background);

        let bridge = load_module(&settings.module_url, DiagnosticsSink)
            .await
            .map_err(|e| fatal(e.into()))?;
        let mut session = SimulationSession::new(bridge, &settings).map_err(fatal)?;
        session.start(now_ms()).map_err(fatal)?;
        session.render(&mut surface).map_err(fatal)?;

        let host = Rc::new(RefCell::new(Host { session, surface }));
        let interval: Rc<Cell<Option<IntervalHandle>>> = Rc::default();

        let timer = {
            let host = host.clone();
            let interval = interval.clone();
            TickTimer::start(settings.tick_interval_ms, move || {
                if let Err(e) = host.borrow_mut().frame() {
                    log::error!("Frame failed: {}", e);
                    if let Some(handle) = interval.get() {
                        handle.cancel();
                    }
                }
            })?
        };
        interval.set(Some(timer.handle()));

        RUNNING.with(|running| {
            running.replace(Some(Running {
                host,
                _timer: timer,
            }))
        });

        log::info!("Ballpit running ({} ms frames)", settings.tick_interval_ms);
        Ok(())
    }

    /// Cancel the frame timer and release the module
    pub fn stop() {
        if let Some(Running { host, _timer: timer }) = RUNNING.with(|r| r.borrow_mut().take()) {
            drop(timer);
            host.borrow_mut().session.stop();
            log::info!("Ballpit stopped");
        }
    }

    fn fatal(e: HostError) -> JsValue {
        log::error!("{}", e);
        JsValue::from_str(&e.to_string())
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() -> Result<(), JsValue> {
    web_host::run().await
}

/// Stop the simulation and cancel the frame timer
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn stop() {
    web_host::stop();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use ballpit::HostSettings;

    env_logger::init();
    log::info!("Ballpit (native) starting...");

    let settings = match std::env::args().nth(1) {
        Some(path) => match HostSettings::load_file(&path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path);
                settings
            }
            Err(e) => {
                log::error!("{}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => HostSettings::default(),
    };

    log::info!("Native mode has no module host - run with `trunk serve` for the web version");

    println!("\nRendering empty frame...");
    preview_empty_frame(&settings);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Draw the container with no bodies to a software surface
#[cfg(not(target_arch = "wasm32"))]
fn preview_empty_frame(settings: &ballpit::HostSettings) {
    use ballpit::bridge::{BodyPositionView, LayoutConstants};
    use ballpit::renderer::{RasterSurface, render_frame};
    use ballpit::sim::ContainerGeometry;

    let side = (settings.container_radius * 2.0 + 20.0).ceil() as u32;
    let mut surface = RasterSurface::new(side, side);
    render_frame(
        &mut surface,
        &BodyPositionView::empty(),
        LayoutConstants::default(),
        ContainerGeometry {
            radius: settings.container_radius,
        },
        &settings.style,
    );

    let outline = surface.count(settings.style.container_color);
    if outline == 0 {
        log::warn!("Container outline is not visible with the current style");
    }
    println!("✓ {}x{} frame, {} outline pixels", side, side, outline);
}
