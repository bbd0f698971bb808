//! 2D rendering
//!
//! Draws the container and every body onto a `Surface`. The browser draws to
//! a canvas 2D context; native builds and tests use a software raster.

pub mod raster;
#[cfg(target_arch = "wasm32")]
pub mod canvas;

pub use raster::RasterSurface;
#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasSurface;

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::bridge::{BodyPositionView, LayoutConstants};
use crate::sim::ContainerGeometry;
use crate::{container_center, sim_to_display};

/// RGBA8 color, laid out exactly like a raster pixel
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// CSS color string for canvas styles
    pub fn to_css(&self) -> String {
        if self.a == 255 {
            format!("rgb({}, {}, {})", self.r, self.g, self.b)
        } else {
            format!(
                "rgba({}, {}, {}, {:.3})",
                self.r,
                self.g,
                self.b,
                f32::from(self.a) / 255.0
            )
        }
    }
}

/// Colors and line widths used by `render_frame`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    pub background: Color,
    pub container_color: Color,
    pub container_line_width: f32,
    pub ball_fill: Color,
    pub ball_ring: Color,
    pub ball_ring_width: f32,
    /// Distance between the ball edge and the center line of its ring
    pub ball_ring_inset: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            background: Color::BLACK,
            container_color: Color::WHITE,
            container_line_width: 5.0,
            ball_fill: Color::RED,
            ball_ring: Color::WHITE,
            ball_ring_width: 5.0,
            ball_ring_inset: 2.5,
        }
    }
}

/// Something circles can be drawn on, y axis pointing down
pub trait Surface {
    /// Width and height in pixels
    fn size(&self) -> Vec2;

    /// Fill the whole surface
    fn clear(&mut self, color: Color);

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color);

    /// Stroke a circle outline centered on `radius`
    fn stroke_circle(&mut self, center: Vec2, radius: f32, line_width: f32, color: Color);
}

/// Draw one frame: background, container outline, then every body
pub fn render_frame<S: Surface + ?Sized>(
    surface: &mut S,
    positions: &BodyPositionView<'_>,
    layout: LayoutConstants,
    container: ContainerGeometry,
    style: &RenderStyle,
) {
    let size = surface.size();

    surface.clear(style.background);
    surface.stroke_circle(
        container_center(size, container.radius),
        container.radius,
        style.container_line_width,
        style.container_color,
    );

    let ring_radius = layout.ball_radius - style.ball_ring_inset;
    for pos in positions.iter().take(layout.num_balls as usize) {
        let center = sim_to_display(pos, size);
        surface.fill_circle(center, layout.ball_radius, style.ball_fill);
        if ring_radius > 0.0 {
            surface.stroke_circle(center, ring_radius, style.ball_ring_width, style.ball_ring);
        }
    }
}
