//! Module layout negotiation
//!
//! The module publishes the *locations* of its shared fields as plain numeric
//! exports: the value of `ball_radius` is the byte offset of the radius, not
//! the radius itself. The offsets are resolved once, then every read is
//! bounds-checked against the memory as it is at that moment.

use super::SimulationBackend;
use super::memory::{LinearMemory, read_f32_le, read_u32_le};
use crate::error::{LayoutError, ModuleLoadError};

/// Export holding the offset of the `f32` body radius
pub const BALL_RADIUS_EXPORT: &str = "ball_radius";
/// Export holding the offset of the `u32` body count
pub const NUM_BALLS_EXPORT: &str = "num_balls";
/// Export holding the offset of the first `(f32, f32)` position pair
pub const BALL_POSITIONS_EXPORT: &str = "ball_positions";

/// Bytes per body in the positions array (`x: f32`, `y: f32`)
pub const POSITION_STRIDE: usize = 8;

/// Byte offsets of the shared fields inside module memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleLayout {
    pub ball_radius: u32,
    pub num_balls: u32,
    pub ball_positions: u32,
}

impl ModuleLayout {
    /// Resolve the layout exports of a freshly instantiated module
    pub fn negotiate<B: SimulationBackend + ?Sized>(backend: &B) -> Result<Self, ModuleLoadError> {
        Ok(Self {
            ball_radius: backend.layout_export(BALL_RADIUS_EXPORT)?,
            num_balls: backend.layout_export(NUM_BALLS_EXPORT)?,
            ball_positions: backend.layout_export(BALL_POSITIONS_EXPORT)?,
        })
    }

    /// Read the scalar layout constants from `memory`
    pub fn read_constants<M: LinearMemory + ?Sized>(
        &self,
        memory: &M,
    ) -> Result<LayoutConstants, LayoutError> {
        Ok(LayoutConstants {
            ball_radius: read_f32_le(memory, self.ball_radius as usize)?,
            num_balls: read_u32_le(memory, self.num_balls as usize)?,
        })
    }

    /// Byte length of the positions array for `num_balls` bodies
    pub fn positions_len(num_balls: u32) -> Result<usize, LayoutError> {
        (num_balls as usize)
            .checked_mul(POSITION_STRIDE)
            .ok_or(LayoutError::CountOverflow(num_balls))
    }
}

/// Turn the numeric value of a layout export into a byte offset.
///
/// `value` is `None` when the export is not a number at all. Negative,
/// fractional, non-finite and out-of-range values are rejected as well.
pub fn offset_from_export(name: &'static str, value: Option<f64>) -> Result<u32, ModuleLoadError> {
    value
        .filter(|v| v.is_finite() && v.fract() == 0.0 && *v >= 0.0 && *v <= f64::from(u32::MAX))
        .map(|v| v as u32)
        .ok_or(ModuleLoadError::ExportKind {
            name,
            expected: "u32 offset",
        })
}

/// Scalars the renderer needs every frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutConstants {
    pub ball_radius: f32,
    pub num_balls: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(value: Option<f64>) -> bool {
        offset_from_export(NUM_BALLS_EXPORT, value)
            == Err(ModuleLoadError::ExportKind {
                name: NUM_BALLS_EXPORT,
                expected: "u32 offset",
            })
    }

    #[test]
    fn test_offset_from_export_accepts_whole_numbers() {
        assert_eq!(offset_from_export(BALL_RADIUS_EXPORT, Some(0.0)), Ok(0));
        assert_eq!(offset_from_export(BALL_RADIUS_EXPORT, Some(1048.0)), Ok(1048));
        assert_eq!(
            offset_from_export(BALL_POSITIONS_EXPORT, Some(f64::from(u32::MAX))),
            Ok(u32::MAX)
        );
    }

    #[test]
    fn test_offset_from_export_rejects_non_offsets() {
        assert!(rejected(None));
        assert!(rejected(Some(-4.0)));
        assert!(rejected(Some(16.5)));
        assert!(rejected(Some(f64::NAN)));
        assert!(rejected(Some(f64::INFINITY)));
        assert!(rejected(Some(f64::from(u32::MAX) + 1.0)));
    }

    #[test]
    fn test_positions_len() {
        assert_eq!(ModuleLayout::positions_len(0), Ok(0));
        assert_eq!(ModuleLayout::positions_len(3), Ok(24));
    }
}
