//! Body position view

use std::borrow::Cow;

use glam::Vec2;

use super::layout::POSITION_STRIDE;

/// Read-only view over the module's `(x, y)` position pairs.
///
/// The view borrows the backend it was read from, so it cannot be held across
/// `init` or `step`, either of which may reallocate module memory.
#[derive(Debug, Clone)]
pub struct BodyPositionView<'a> {
    bytes: Cow<'a, [u8]>,
}

impl<'a> BodyPositionView<'a> {
    /// Wrap raw little-endian position bytes (trailing partial pairs are ignored)
    pub fn new(bytes: Cow<'a, [u8]>) -> Self {
        Self { bytes }
    }

    /// A view with no bodies
    pub fn empty() -> Self {
        Self {
            bytes: Cow::Borrowed(&[]),
        }
    }

    /// Number of bodies in the view
    pub fn len(&self) -> usize {
        self.bytes.len() / POSITION_STRIDE
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the bytes are borrowed straight from module memory
    pub fn is_zero_copy(&self) -> bool {
        matches!(self.bytes, Cow::Borrowed(_))
    }

    /// Position of body `index` in simulation coordinates
    pub fn get(&self, index: usize) -> Option<Vec2> {
        let start = index.checked_mul(POSITION_STRIDE)?;
        let end = start.checked_add(POSITION_STRIDE)?;
        let pair = self.bytes.get(start..end)?;
        Some(decode_pair(pair))
    }

    /// Iterate over all positions in index order
    pub fn iter(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.bytes.chunks_exact(POSITION_STRIDE).map(decode_pair)
    }
}

fn decode_pair(pair: &[u8]) -> Vec2 {
    let x = f32::from_le_bytes([pair[0], pair[1], pair[2], pair[3]]);
    let y = f32::from_le_bytes([pair[4], pair[5], pair[6], pair[7]]);
    Vec2::new(x, y)
}
