//! Browser bindings for the simulation module
//!
//! The module runs in its own `WebAssembly.Instance`, so its memory is a JS
//! `ArrayBuffer` rather than part of our own linear memory. Reads copy just
//! the requested range out of a buffer fetched fresh for every read: when the
//! module grows its memory the old buffer is detached.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{ArrayBuffer, Function, Object, Reflect, Uint8Array, WebAssembly};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

use crate::bridge::layout::offset_from_export;
use crate::bridge::memory::checked_range;
use crate::bridge::{IMPORT_MODULE, LOG_IMPORT, LinearMemory, MemoryBridge, SimulationBackend};
use crate::diagnostics::DiagnosticsSink;
use crate::error::{FaultSite, LayoutError, ModuleLoadError, SimulationFault};

/// Milliseconds from the page's high resolution clock
pub fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

/// Best-effort message from a thrown JS value
fn js_error(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    if let Some(e) = value.dyn_ref::<js_sys::Error>() {
        return String::from(e.message());
    }
    format!("{:?}", value)
}

/// Fetch the compiled module
pub async fn fetch_module_bytes(url: &str) -> Result<Vec<u8>, ModuleLoadError> {
    let fetch_err = |reason: String| ModuleLoadError::Fetch {
        url: url.to_string(),
        reason,
    };

    let window = web_sys::window().ok_or_else(|| fetch_err("no window".to_string()))?;
    let response: Response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| fetch_err(js_error(&e)))?
        .dyn_into()
        .map_err(|e| fetch_err(js_error(&e)))?;

    if !response.ok() {
        return Err(fetch_err(format!("HTTP {}", response.status())));
    }

    let buffer = response.array_buffer().map_err(|e| fetch_err(js_error(&e)))?;
    let buffer = JsFuture::from(buffer)
        .await
        .map_err(|e| fetch_err(js_error(&e)))?;
    Ok(Uint8Array::new(&buffer).to_vec())
}

/// Fetch, instantiate and negotiate the layout of the module at `url`
pub async fn load_module(
    url: &str,
    sink: DiagnosticsSink,
) -> Result<MemoryBridge<WebBackend>, ModuleLoadError> {
    let bytes = fetch_module_bytes(url).await?;
    log::info!("Fetched {} ({} bytes)", url, bytes.len());
    let backend = WebBackend::instantiate(&bytes, sink).await?;
    MemoryBridge::new(backend)
}

/// The exported memory of a JS-side instance
#[derive(Clone)]
pub struct JsMemory {
    memory: WebAssembly::Memory,
}

impl JsMemory {
    pub fn new(memory: WebAssembly::Memory) -> Self {
        Self { memory }
    }

    fn buffer(&self) -> ArrayBuffer {
        self.memory.buffer().unchecked_into()
    }
}

impl LinearMemory for JsMemory {
    fn size(&self) -> usize {
        self.buffer().byte_length() as usize
    }

    fn read(&self, offset: usize, len: usize) -> Result<Cow<'_, [u8]>, LayoutError> {
        let buffer = self.buffer();
        let range = checked_range(offset, len, buffer.byte_length() as usize)?;
        let bytes = Uint8Array::new_with_byte_offset_and_length(&buffer, range.start as u32, len as u32);
        Ok(Cow::Owned(bytes.to_vec()))
    }
}

/// A module instantiated through the browser's `WebAssembly` API
pub struct WebBackend {
    memory: JsMemory,
    exports: Object,
    init_fn: Function,
    step_fn: Function,
    // Kept alive for as long as the instance may call it
    _log_import: Closure<dyn FnMut(u32, u32)>,
}

impl WebBackend {
    /// Compile and instantiate `bytes`, wiring `env.logWasm` to `sink`
    pub async fn instantiate(bytes: &[u8], sink: DiagnosticsSink) -> Result<Self, ModuleLoadError> {
        let shared: Rc<RefCell<Option<JsMemory>>> = Rc::default();

        let log_memory = shared.clone();
        let log_import = Closure::<dyn FnMut(u32, u32)>::new(move |offset: u32, length: u32| {
            match log_memory.borrow().as_ref() {
                Some(memory) => {
                    // Failures are already logged by the sink
                    let _ = sink.log(memory, offset, length);
                }
                None => log::warn!("Module logged before its memory was exported"),
            }
        });

        let instantiate_err = |e: JsValue| ModuleLoadError::Instantiate(js_error(&e));
        let env = Object::new();
        Reflect::set(&env, &JsValue::from_str(LOG_IMPORT), log_import.as_ref()).map_err(instantiate_err)?;
        let imports = Object::new();
        Reflect::set(&imports, &JsValue::from_str(IMPORT_MODULE), &env).map_err(instantiate_err)?;

        let source: JsValue = Uint8Array::from(bytes).into();
        let module: WebAssembly::Module = JsFuture::from(WebAssembly::compile(&source))
            .await
            .and_then(|m| m.dyn_into())
            .map_err(|e| ModuleLoadError::Compile(js_error(&e)))?;

        let instance: WebAssembly::Instance =
            JsFuture::from(WebAssembly::instantiate_module(&module, &imports))
                .await
                .and_then(|i| i.dyn_into())
                .map_err(instantiate_err)?;

        let exports = instance.exports();
        let memory: WebAssembly::Memory = export(&exports, "memory")?
            .dyn_into()
            .map_err(|_| ModuleLoadError::ExportKind {
                name: "memory",
                expected: "memory",
            })?;
        let init_fn = function_export(&exports, "init")?;
        let step_fn = function_export(&exports, "step")?;

        let memory = JsMemory::new(memory);
        shared.replace(Some(memory.clone()));
        log::info!("Module instantiated ({} bytes of memory)", memory.size());

        Ok(Self {
            memory,
            exports,
            init_fn,
            step_fn,
            _log_import: log_import,
        })
    }
}

fn export(exports: &Object, name: &'static str) -> Result<JsValue, ModuleLoadError> {
    match Reflect::get(exports, &JsValue::from_str(name)) {
        Ok(value) if !value.is_undefined() => Ok(value),
        _ => Err(ModuleLoadError::MissingExport(name)),
    }
}

fn function_export(exports: &Object, name: &'static str) -> Result<Function, ModuleLoadError> {
    export(exports, name)?
        .dyn_into()
        .map_err(|_| ModuleLoadError::ExportKind {
            name,
            expected: "function",
        })
}

impl SimulationBackend for WebBackend {
    type Memory = JsMemory;

    fn memory(&self) -> &JsMemory {
        &self.memory
    }

    fn layout_export(&self, name: &'static str) -> Result<u32, ModuleLoadError> {
        let value = export(&self.exports, name)?;
        // Exported globals arrive as `WebAssembly.Global` objects
        let value = match value.dyn_ref::<WebAssembly::Global>() {
            Some(global) => global.value(),
            None => value,
        };

        offset_from_export(name, value.as_f64())
    }

    fn init(&mut self, container_radius: f32, body_param: f32) -> Result<(), SimulationFault> {
        self.init_fn
            .call2(
                &JsValue::UNDEFINED,
                &JsValue::from_f64(f64::from(container_radius)),
                &JsValue::from_f64(f64::from(body_param)),
            )
            .map(|_| ())
            .map_err(|e| SimulationFault::new(FaultSite::Init, js_error(&e)))
    }

    fn step(&mut self, dt_seconds: f32) -> Result<(), SimulationFault> {
        self.step_fn
            .call1(&JsValue::UNDEFINED, &JsValue::from_f64(f64::from(dt_seconds)))
            .map(|_| ())
            .map_err(|e| SimulationFault::new(FaultSite::Step, js_error(&e)))
    }
}

/// Copyable reference to a running interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalHandle(i32);

impl IntervalHandle {
    /// Cancel the interval; cancelling twice is harmless
    pub fn cancel(self) {
        if let Some(window) = web_sys::window() {
            window.clear_interval_with_handle(self.0);
        }
    }
}

/// A `setInterval` timer that is cancelled when dropped
pub struct TickTimer {
    handle: IntervalHandle,
    _callback: Closure<dyn FnMut()>,
}

impl TickTimer {
    pub fn start(interval_ms: u32, callback: impl FnMut() + 'static) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let callback = Closure::<dyn FnMut()>::new(callback);
        let handle = window.set_interval_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            i32::try_from(interval_ms).unwrap_or(i32::MAX),
        )?;
        Ok(Self {
            handle: IntervalHandle(handle),
            _callback: callback,
        })
    }

    pub fn handle(&self) -> IntervalHandle {
        self.handle
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }
}

impl Drop for TickTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
