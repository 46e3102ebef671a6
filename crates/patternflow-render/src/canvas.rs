//! CPU canvas surface shared between the editor and the renderers.
//!
//! The editor owns canvases and hands out shared references; widgets only
//! ever paint into them. Everything is rasterized with tiny-skia.

use std::sync::Arc;

use parking_lot::Mutex;
use patternflow_core::Rgba;
use tiny_skia::{Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

use crate::{RenderError, Result};

/// A paintable pixel surface.
pub struct Canvas {
    pixmap: Pixmap,
}

/// Editor-owned canvas handle; widgets reference, the editor owns.
pub type SharedCanvas = Arc<Mutex<Canvas>>;

/// Convenience constructor for a shared canvas
pub fn shared_canvas(width: u32, height: u32) -> Result<SharedCanvas> {
    Ok(Arc::new(Mutex::new(Canvas::new(width, height)?)))
}

impl Canvas {
    /// Create a canvas; zero dimensions are rejected
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap =
            Pixmap::new(width, height).ok_or(RenderError::InvalidCanvasSize(width, height))?;
        Ok(Self { pixmap })
    }

    /// Canvas width in pixels
    pub fn width(&self) -> f32 {
        self.pixmap.width() as f32
    }

    /// Canvas height in pixels
    pub fn height(&self) -> f32 {
        self.pixmap.height() as f32
    }

    /// Fill the whole surface with one color
    pub fn clear(&mut self, color: Rgba) {
        self.pixmap
            .fill(tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a));
    }

    /// Stroke one connected polyline
    pub fn stroke_polyline(&mut self, points: &[(f32, f32)], color: Rgba, width: f32) {
        if points.len() < 2 {
            return;
        }
        let mut pb = PathBuilder::new();
        pb.move_to(points[0].0, points[0].1);
        for &(x, y) in &points[1..] {
            pb.line_to(x, y);
        }
        let Some(path) = pb.finish() else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        paint.anti_alias = true;

        let stroke = Stroke {
            width,
            ..Default::default()
        };
        self.pixmap
            .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    /// Stroke a single line segment
    pub fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgba, width: f32) {
        self.stroke_polyline(&[from, to], color, width);
    }

    /// Fill an axis-aligned rectangle. Degenerate rectangles are ignored.
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        let Some(rect) = Rect::from_xywh(x, y, w, h) else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        paint.anti_alias = true;
        self.pixmap
            .fill_rect(rect, &paint, Transform::identity(), None);
    }

    /// Read back one pixel (premultiplied). Test support.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        self.pixmap
            .pixel(x, y)
            .map(|p| Rgba::new(p.red(), p.green(), p.blue(), p.alpha()))
    }

    /// Whether any pixel differs from `background`. Test support.
    pub fn has_paint_over(&self, background: Rgba) -> bool {
        let bg = tiny_skia::ColorU8::from_rgba(background.r, background.g, background.b, background.a)
            .premultiply();
        self.pixmap.pixels().iter().any(|&p| p != bg)
    }
}
