//! Software raster surface
//!
//! RGBA8 pixel buffer with pixel-center coverage tests. No anti-aliasing.

use glam::Vec2;

use super::{Color, Surface};

/// An in-memory RGBA8 image
#[derive(Debug, Clone)]
pub struct RasterSurface {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl RasterSurface {
    /// A transparent surface of `width` x `height` pixels
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::TRANSPARENT; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(self.index(x, y)).copied()
    }

    /// Raw RGBA bytes, row-major from the top-left corner
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Number of pixels exactly equal to `color`
    pub fn count(&self, color: Color) -> usize {
        self.pixels.iter().filter(|&&p| p == color).count()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Source-over blend of `color` into one pixel
    fn put(&mut self, x: u32, y: u32, color: Color) {
        let idx = self.index(x, y);
        let dst = &mut self.pixels[idx];
        if color.a == 255 {
            *dst = color;
            return;
        }

        let a = u32::from(color.a);
        let inv = 255 - a;
        let mix = |s: u8, d: u8| ((u32::from(s) * a + u32::from(d) * inv) / 255) as u8;
        *dst = Color {
            r: mix(color.r, dst.r),
            g: mix(color.g, dst.g),
            b: mix(color.b, dst.b),
            a: (a + u32::from(dst.a) * inv / 255) as u8,
        };
    }

    /// Paint every pixel whose center lies between `inner` and `outer`
    /// distance from `center`
    fn shade_band(&mut self, center: Vec2, inner: f32, outer: f32, color: Color) {
        if outer <= 0.0 || self.width == 0 || self.height == 0 {
            return;
        }

        let min_sq = inner.max(0.0).powi(2);
        let max_sq = outer * outer;
        let x0 = (center.x - outer).floor().max(0.0) as u32;
        let y0 = (center.y - outer).floor().max(0.0) as u32;
        let x1 = ((center.x + outer).ceil().max(0.0) as u32).min(self.width - 1);
        let y1 = ((center.y + outer).ceil().max(0.0) as u32).min(self.height - 1);

        for y in y0..=y1 {
            for x in x0..=x1 {
                let d_sq = (Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - center).length_squared();
                if d_sq >= min_sq && d_sq <= max_sq {
                    self.put(x, y, color);
                }
            }
        }
    }
}

impl Surface for RasterSurface {
    fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    fn clear(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.shade_band(center, 0.0, radius, color);
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, line_width: f32, color: Color) {
        let half = line_width / 2.0;
        self.shade_band(center, radius - half, radius + half, color);
    }
}
