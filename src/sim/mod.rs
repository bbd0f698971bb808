//! Simulation driving
//!
//! The physics lives in the module; this side only decides *when* it runs:
//! - Fixed timestep only
//! - Steps complete before the frame that shows them is drawn
//! - Rendering is only reached through `SimulationSession::render`

pub mod clock;
pub mod proxy;
pub mod session;
#[cfg(test)]
pub(crate) mod testing;

pub use clock::{CatchUpPolicy, ClockState, FrameClock, TickReport};
pub use proxy::{ContainerGeometry, SimulationProxy};
pub use session::{FrameReport, SessionPhase, SimulationSession};
