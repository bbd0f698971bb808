//! Memory bridge between the host and the simulation module
//!
//! The module is an opaque collaborator: the host only sees its linear memory,
//! three layout exports and the `init`/`step` functions. `SimulationBackend`
//! captures exactly that surface so the browser can bind it to
//! `WebAssembly` and tests can substitute an in-process fake.

pub mod layout;
pub mod memory;
pub mod view;

pub use layout::{LayoutConstants, ModuleLayout, POSITION_STRIDE};
pub use memory::LinearMemory;
pub use view::BodyPositionView;

use crate::error::{LayoutError, ModuleLoadError, SimulationFault};

/// Name of the host import the module calls to log a message
pub const LOG_IMPORT: &str = "logWasm";
/// Import namespace the log callback is registered under
pub const IMPORT_MODULE: &str = "env";

/// The module ABI as seen from the host
pub trait SimulationBackend {
    type Memory: LinearMemory + ?Sized;

    /// The module's linear memory as it is right now
    fn memory(&self) -> &Self::Memory;

    /// Value of a numeric layout export (a byte offset into memory)
    fn layout_export(&self, name: &'static str) -> Result<u32, ModuleLoadError>;

    /// One-time setup; must precede any `step`
    fn init(&mut self, container_radius: f32, body_param: f32) -> Result<(), SimulationFault>;

    /// Advance the simulation by exactly `dt_seconds`
    fn step(&mut self, dt_seconds: f32) -> Result<(), SimulationFault>;
}

/// Typed reads over a loaded module
#[derive(Debug)]
pub struct MemoryBridge<B> {
    backend: B,
    layout: ModuleLayout,
}

impl<B: SimulationBackend> MemoryBridge<B> {
    /// Negotiate the module layout
    pub fn new(backend: B) -> Result<Self, ModuleLoadError> {
        let layout = ModuleLayout::negotiate(&backend)?;
        log::debug!(
            "Module layout: ball_radius@{} num_balls@{} ball_positions@{}",
            layout.ball_radius,
            layout.num_balls,
            layout.ball_positions
        );
        Ok(Self { backend, layout })
    }

    pub fn layout(&self) -> ModuleLayout {
        self.layout
    }

    /// Read `ball_radius` and `num_balls` through a fresh view of memory
    pub fn read_layout(&self) -> Result<LayoutConstants, LayoutError> {
        self.layout.read_constants(self.backend.memory())
    }

    /// View of the first `num_balls` position pairs
    pub fn positions_view(&self, num_balls: u32) -> Result<BodyPositionView<'_>, LayoutError> {
        let len = ModuleLayout::positions_len(num_balls)?;
        let bytes = self
            .backend
            .memory()
            .read(self.layout.ball_positions as usize, len)?;
        Ok(BodyPositionView::new(bytes))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Release the bridge, handing back the backend
    pub fn into_backend(self) -> B {
        self.backend
    }
}
