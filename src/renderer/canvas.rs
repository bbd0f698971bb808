//! Canvas 2D surface (browser only)

use std::f64::consts::TAU;

use glam::Vec2;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::{Color, Surface};

/// Draws through a `CanvasRenderingContext2d`
pub struct CanvasSurface {
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(ctx: CanvasRenderingContext2d) -> Self {
        Self { ctx }
    }

    /// Acquire the 2D context of `canvas`
    pub fn from_canvas(canvas: &HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self::new(ctx))
    }

    fn circle_path(&self, center: Vec2, radius: f32) -> bool {
        self.ctx.begin_path();
        match self
            .ctx
            .arc(f64::from(center.x), f64::from(center.y), f64::from(radius), 0.0, TAU)
        {
            Ok(()) => true,
            Err(e) => {
                log::warn!("arc({}, {:?}) failed: {:?}", radius, center, e);
                false
            }
        }
    }
}

impl Surface for CanvasSurface {
    fn size(&self) -> Vec2 {
        match self.ctx.canvas() {
            Some(canvas) => Vec2::new(canvas.width() as f32, canvas.height() as f32),
            None => Vec2::ZERO,
        }
    }

    fn clear(&mut self, color: Color) {
        let size = self.size();
        self.ctx.set_fill_style_str(&color.to_css());
        self.ctx
            .fill_rect(0.0, 0.0, f64::from(size.x), f64::from(size.y));
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        if radius <= 0.0 {
            return;
        }
        self.ctx.set_fill_style_str(&color.to_css());
        if self.circle_path(center, radius) {
            self.ctx.fill();
        }
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, line_width: f32, color: Color) {
        if radius <= 0.0 {
            return;
        }
        self.ctx.set_stroke_style_str(&color.to_css());
        self.ctx.set_line_width(f64::from(line_width));
        if self.circle_path(center, radius) {
            self.ctx.stroke();
        }
    }
}
