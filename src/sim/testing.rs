//! In-process stand-in for the simulation module

use glam::Vec2;

use crate::bridge::layout::{BALL_POSITIONS_EXPORT, BALL_RADIUS_EXPORT, NUM_BALLS_EXPORT};
use crate::bridge::{ModuleLayout, SimulationBackend};
use crate::diagnostics::{DiagnosticsSink, LogMessage};
use crate::error::{FaultSite, ModuleLoadError, SimulationFault};

/// Fake module: bodies drift along +x at `SPEED` units per second.
///
/// Memory layout: radius at 0, count at 4, positions from 16. Log messages
/// are appended past the end of memory, growing it like a real allocator.
#[derive(Debug, Default)]
pub struct FakeBackend {
    memory: Vec<u8>,
    hidden: Vec<&'static str>,
    fail_at_step: Option<u64>,
    fail_init: bool,
    queued_log: Option<Vec<u8>>,
    pub init_calls: Vec<(f32, f32)>,
    pub step_calls: u64,
    pub simulated_seconds: f64,
    pub logs: Vec<LogMessage>,
}

impl FakeBackend {
    pub const LAYOUT: ModuleLayout = ModuleLayout {
        ball_radius: 0,
        num_balls: 4,
        ball_positions: 16,
    };
    pub const SPEED: f32 = 40.0;

    pub fn new(ball_radius: f32, positions: &[(f32, f32)]) -> Self {
        let mut backend = Self {
            memory: vec![0; Self::positions_end(positions.len())],
            ..Default::default()
        };
        backend.set_ball_radius(ball_radius);
        backend.write_positions(positions);
        backend
    }

    fn positions_end(count: usize) -> usize {
        Self::LAYOUT.ball_positions as usize + count * 8
    }

    pub fn set_ball_radius(&mut self, radius: f32) {
        let at = Self::LAYOUT.ball_radius as usize;
        self.memory[at..at + 4].copy_from_slice(&radius.to_le_bytes());
    }

    /// Overwrite the body count and positions (memory must be large enough)
    pub fn write_positions(&mut self, positions: &[(f32, f32)]) {
        let at = Self::LAYOUT.num_balls as usize;
        self.memory[at..at + 4].copy_from_slice(&(positions.len() as u32).to_le_bytes());

        let mut at = Self::LAYOUT.ball_positions as usize;
        for (x, y) in positions {
            self.memory[at..at + 4].copy_from_slice(&x.to_le_bytes());
            self.memory[at + 4..at + 8].copy_from_slice(&y.to_le_bytes());
            at += 8;
        }
    }

    /// Move memory to a new, larger allocation and rewrite the bodies
    pub fn grow_and_rewrite(&mut self, extra: usize, positions: &[(f32, f32)]) {
        let new_len = (self.memory.len() + extra).max(Self::positions_end(positions.len()));
        let mut grown = Vec::with_capacity(new_len);
        grown.extend_from_slice(&self.memory);
        grown.resize(new_len, 0);
        self.memory = grown;
        self.write_positions(positions);
    }

    pub fn hide_export(&mut self, name: &'static str) {
        self.hidden.push(name);
    }

    /// Trap on the step with this zero-based index
    pub fn fail_at_step(&mut self, index: u64) {
        self.fail_at_step = Some(index);
    }

    pub fn fail_init(&mut self) {
        self.fail_init = true;
    }

    /// Emit `bytes` through the log import during the next step
    pub fn queue_log(&mut self, bytes: &[u8]) {
        self.queued_log = Some(bytes.to_vec());
    }

    fn count(&self) -> usize {
        let at = Self::LAYOUT.num_balls as usize;
        u32::from_le_bytes([
            self.memory[at],
            self.memory[at + 1],
            self.memory[at + 2],
            self.memory[at + 3],
        ]) as usize
    }

    fn positions(&self) -> Vec<(f32, f32)> {
        let start = Self::LAYOUT.ball_positions as usize;
        self.memory[start..Self::positions_end(self.count())]
            .chunks_exact(8)
            .map(|c| {
                (
                    f32::from_le_bytes([c[0], c[1], c[2], c[3]]),
                    f32::from_le_bytes([c[4], c[5], c[6], c[7]]),
                )
            })
            .collect()
    }
}

impl SimulationBackend for FakeBackend {
    type Memory = Vec<u8>;

    fn memory(&self) -> &Vec<u8> {
        &self.memory
    }

    fn layout_export(&self, name: &'static str) -> Result<u32, ModuleLoadError> {
        if self.hidden.contains(&name) {
            return Err(ModuleLoadError::MissingExport(name));
        }
        match name {
            BALL_RADIUS_EXPORT => Ok(Self::LAYOUT.ball_radius),
            NUM_BALLS_EXPORT => Ok(Self::LAYOUT.num_balls),
            BALL_POSITIONS_EXPORT => Ok(Self::LAYOUT.ball_positions),
            _ => Err(ModuleLoadError::MissingExport(name)),
        }
    }

    fn init(&mut self, container_radius: f32, body_param: f32) -> Result<(), SimulationFault> {
        if self.fail_init {
            return Err(SimulationFault::new(FaultSite::Init, "unreachable"));
        }
        self.init_calls.push((container_radius, body_param));
        self.set_ball_radius(body_param);
        Ok(())
    }

    fn step(&mut self, dt_seconds: f32) -> Result<(), SimulationFault> {
        if self.fail_at_step == Some(self.step_calls) {
            return Err(SimulationFault::new(FaultSite::Step, "unreachable"));
        }
        self.step_calls += 1;
        self.simulated_seconds += f64::from(dt_seconds);

        let moved: Vec<(f32, f32)> = self
            .positions()
            .into_iter()
            .map(|(x, y)| {
                let p = Vec2::new(x, y) + Vec2::X * Self::SPEED * dt_seconds;
                (p.x, p.y)
            })
            .collect();
        self.write_positions(&moved);

        if let Some(bytes) = self.queued_log.take() {
            let offset = self.memory.len();
            self.memory.extend_from_slice(&bytes);
            if let Ok(message) = DiagnosticsSink.log(&self.memory, offset as u32, bytes.len() as u32) {
                self.logs.push(message);
            }
        }
        Ok(())
    }
}
