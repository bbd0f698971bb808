//! Ballpit - host for a WebAssembly balls-in-a-circle simulation
//!
//! Core modules:
//! - `bridge`: Module ABI, layout negotiation and memory views
//! - `sim`: Fixed timestep driving (proxy, clock, session)
//! - `renderer`: Canvas / software raster drawing
//! - `diagnostics`: Module log forwarding
//! - `platform`: Browser bindings (fetch, `WebAssembly`, timers)
//! - `settings`: Host configuration

pub mod bridge;
pub mod diagnostics;
pub mod error;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use error::{HostError, ModuleLoadError, SimulationFault};
pub use settings::HostSettings;
pub use sim::{SessionPhase, SimulationSession};

use glam::Vec2;

/// Host configuration constants
pub mod consts {
    /// Where the compiled simulation module is served from
    pub const DEFAULT_MODULE_URL: &str = "zig-out/bin/module.wasm";
    /// Container radius handed to the module's `init`
    pub const CONTAINER_RADIUS: f32 = 200.0;
    /// Second `init` argument
    pub const BODY_PARAM: f32 = 20.0;
    /// Fixed simulation step in milliseconds
    pub const STEP_MS: f64 = 1.0;
    /// Frame timer period in milliseconds
    pub const TICK_INTERVAL_MS: u32 = 30;
}

/// Convert simulation coordinates (y up, origin at the bottom center) to
/// display coordinates (y down, origin at the top left)
#[inline]
pub fn sim_to_display(pos: Vec2, surface: Vec2) -> Vec2 {
    Vec2::new(pos.x + surface.x / 2.0, surface.y - pos.y)
}

/// Display-space center of a container resting on the bottom edge
#[inline]
pub fn container_center(surface: Vec2, radius: f32) -> Vec2 {
    Vec2::new(surface.x / 2.0, surface.y - radius)
}
