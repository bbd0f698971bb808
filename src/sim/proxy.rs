//! Typed façade over the module's exported functions

use serde::{Deserialize, Serialize};

use crate::bridge::{BodyPositionView, LayoutConstants, MemoryBridge, SimulationBackend};
use crate::error::HostError;

/// The circular container the bodies live in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainerGeometry {
    pub radius: f32,
}

/// Calls into the module and exposes its body positions
#[derive(Debug)]
pub struct SimulationProxy<B> {
    bridge: MemoryBridge<B>,
    container: Option<ContainerGeometry>,
}

impl<B: SimulationBackend> SimulationProxy<B> {
    pub fn new(bridge: MemoryBridge<B>) -> Self {
        Self {
            bridge,
            container: None,
        }
    }

    /// Call the module's `init`. Only the first call is forwarded.
    pub fn init(
        &mut self,
        container_radius: f32,
        body_param: f32,
    ) -> Result<ContainerGeometry, HostError> {
        if self.container.is_some() {
            return Err(HostError::AlreadyInitialized);
        }

        self.bridge
            .backend_mut()
            .init(container_radius, body_param)?;

        let geometry = ContainerGeometry {
            radius: container_radius,
        };
        self.container = Some(geometry);
        log::info!(
            "Simulation initialized (container radius {}, body param {})",
            container_radius,
            body_param
        );
        Ok(geometry)
    }

    /// Advance the module by `dt_seconds`
    pub fn step(&mut self, dt_seconds: f32) -> Result<(), HostError> {
        if self.container.is_none() {
            return Err(HostError::NotInitialized);
        }
        self.bridge.backend_mut().step(dt_seconds)?;
        Ok(())
    }

    /// Freshly read layout constants and the matching position view
    pub fn current_positions(&self) -> Result<(LayoutConstants, BodyPositionView<'_>), HostError> {
        let constants = self.bridge.read_layout()?;
        let view = self.bridge.positions_view(constants.num_balls)?;
        Ok((constants, view))
    }

    pub fn container(&self) -> Option<ContainerGeometry> {
        self.container
    }

    pub fn is_initialized(&self) -> bool {
        self.container.is_some()
    }

    pub fn bridge(&self) -> &MemoryBridge<B> {
        &self.bridge
    }

    pub fn into_backend(self) -> B {
        self.bridge.into_backend()
    }
}
