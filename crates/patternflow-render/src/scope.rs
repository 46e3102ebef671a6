//! Time-domain oscilloscope renderer.

use crate::manager::{FrameContext, Renderer};
use crate::widget::{ScopeOptions, VisualizationWidget};
use crate::{RenderError, Result};

/// Draws the analyser's most recent time-domain window as a polyline.
pub struct ScopeRenderer {
    options: ScopeOptions,
    samples: Vec<f32>,
    points: Vec<(f32, f32)>,
}

impl ScopeRenderer {
    /// Build a scope renderer with parsed options
    pub fn new(options: ScopeOptions) -> Self {
        Self {
            options,
            samples: Vec::new(),
            points: Vec::new(),
        }
    }
}

impl Renderer for ScopeRenderer {
    fn render(&mut self, widget: &VisualizationWidget, frame: &FrameContext<'_>) -> Result<()> {
        let analyser = frame.analyser.ok_or(RenderError::MissingAnalyser)?;

        self.samples.resize(analyser.fft_size(), 0.0);
        analyser.get_float_time_domain_data(&mut self.samples);

        let mut canvas = widget.canvas.lock();
        let width = canvas.width();
        let mid = canvas.height() / 2.0;

        canvas.clear(self.options.background);

        // One polyline vertex per sample, spread across the full width
        let step = width / (self.samples.len().max(2) - 1) as f32;
        self.points.clear();
        for (i, &s) in self.samples.iter().enumerate() {
            let x = i as f32 * step;
            let y = mid - s.clamp(-1.0, 1.0) * self.options.scale * mid;
            self.points.push((x, y));
        }
        canvas.stroke_polyline(&self.points, self.options.color, self.options.thickness);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::shared_canvas;
    use crate::widget::WidgetKind;
    use patternflow_audio::{Analyser, AnalyserConfig};
    use patternflow_core::Rgba;

    fn scope_widget() -> VisualizationWidget {
        VisualizationWidget {
            id: "scope-0-5".to_string(),
            kind: WidgetKind::Scope,
            canvas: shared_canvas(64, 64).unwrap(),
            options: serde_json::json!({}),
        }
    }

    fn analyser() -> Analyser {
        Analyser::new(AnalyserConfig {
            fft_size: 256,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_missing_analyser_is_an_error() {
        let widget = scope_widget();
        let frame = FrameContext {
            now: 0.0,
            analyser: None,
            clock: None,
        };
        let mut renderer = ScopeRenderer::new(ScopeOptions::default());
        assert!(matches!(
            renderer.render(&widget, &frame),
            Err(RenderError::MissingAnalyser)
        ));
    }

    #[test]
    fn test_silence_draws_flat_midline() {
        let widget = scope_widget();
        let analyser = analyser();
        let frame = FrameContext {
            now: 0.0,
            analyser: Some(&analyser),
            clock: None,
        };
        let mut renderer = ScopeRenderer::new(ScopeOptions::default());
        renderer.render(&widget, &frame).unwrap();

        let canvas = widget.canvas.lock();
        let opts = ScopeOptions::default();
        let mid = canvas.pixel(32, 32).unwrap();
        assert!(mid.g > 0, "trace crosses the vertical midpoint");
        assert_eq!(
            canvas.pixel(32, 8),
            Some(premultiplied(opts.background)),
            "nothing painted away from the midline"
        );
    }

    #[test]
    fn test_loud_signal_leaves_the_midline() {
        let widget = scope_widget();
        let analyser = analyser();
        analyser.push_block(&[0.9_f32; 256]);

        let frame = FrameContext {
            now: 0.0,
            analyser: Some(&analyser),
            clock: None,
        };
        let mut renderer = ScopeRenderer::new(ScopeOptions::default());
        renderer.render(&widget, &frame).unwrap();

        let canvas = widget.canvas.lock();
        // 0.9 * mid above center: y = 32 - 0.9*32 = 3.2
        let near_top = canvas.pixel(32, 3).unwrap();
        assert!(near_top.g > 0, "trace displaced toward the top");
    }

    fn premultiplied(c: Rgba) -> Rgba {
        let color = tiny_skia::ColorU8::from_rgba(c.r, c.g, c.b, c.a).premultiply();
        Rgba::new(color.red(), color.green(), color.blue(), color.alpha())
    }
}
