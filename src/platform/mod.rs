//! Platform abstraction layer
//!
//! Handles what the host needs from the browser:
//! - Fetching the compiled module
//! - Instantiating it through the JS `WebAssembly` API
//! - Wall clock and the periodic frame timer
//!
//! Native builds have no platform layer; they drive sessions directly.

#[cfg(target_arch = "wasm32")]
pub mod web;
