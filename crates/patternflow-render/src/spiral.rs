//! Spiral renderer: recent pattern events as arcs on a rotating spiral.
//!
//! Angles are measured in turns. An event's position on the spiral is its
//! time distance from "now", offset by `inset` so that the current moment
//! sits away from the degenerate center; the whole spiral additionally
//! rotates at `steady` turns per cycle so motion is visible even when the
//! pattern is sparse.

use std::f32::consts::TAU;

use patternflow_core::Rgba;

use crate::manager::{FrameContext, Renderer};
use crate::widget::{SpiralOptions, VisualizationWidget};
use crate::{RenderError, Result};

/// Arc sampling step, in turns
const SEGMENT: f64 = 1.0 / 64.0;

/// Minimum drawn arc, so zero-length events stay visible
const MIN_ARC: f64 = 0.005;

/// Draws pattern events as spiral arc segments.
pub struct SpiralRenderer {
    options: SpiralOptions,
    points: Vec<(f32, f32)>,
}

impl SpiralRenderer {
    /// Build a spiral renderer with parsed options
    pub fn new(options: SpiralOptions) -> Self {
        Self {
            options,
            points: Vec::new(),
        }
    }

    fn sample_arc(
        &mut self,
        theta_from: f64,
        theta_to: f64,
        rotation: f64,
        center: (f32, f32),
        spacing: f32,
    ) {
        self.points.clear();
        let mut theta = theta_from;
        while theta < theta_to {
            self.points.push(spiral_point(theta, rotation, center, spacing));
            theta += SEGMENT;
        }
        self.points.push(spiral_point(theta_to, rotation, center, spacing));
    }
}

/// Cartesian position for a spiral angle, both in turns
fn spiral_point(theta: f64, rotation: f64, center: (f32, f32), spacing: f32) -> (f32, f32) {
    let angle = ((theta + rotation) as f32) * TAU;
    let r = theta as f32 * spacing;
    (center.0 + r * angle.cos(), center.1 + r * angle.sin())
}

impl Renderer for SpiralRenderer {
    fn render(&mut self, widget: &VisualizationWidget, frame: &FrameContext<'_>) -> Result<()> {
        let clock = frame.clock.ok_or(RenderError::MissingPatternClock)?;
        let pattern = clock.pattern().ok_or(RenderError::NoPattern)?;
        let opts = self.options.clone();

        let now = clock.time();
        let rotation = opts.steady * now;
        let haps = pattern.query_arc(now - opts.lookback, now + opts.inset + 1.0);

        let mut canvas = widget.canvas.lock();
        canvas.clear(opts.background);

        let center = (canvas.width() / 2.0, canvas.height() / 2.0);
        // The playhead ring (theta = inset * stretch) plus one extra turn
        // must fit inside the canvas
        let half = canvas.width().min(canvas.height()) / 2.0;
        let spacing = half / ((opts.inset * opts.stretch) as f32 + 1.0).max(1.0);

        for hap in &haps {
            let theta_from = ((hap.begin - now + opts.inset) * opts.stretch).max(0.0);
            let theta_to = ((hap.end - now + opts.inset - opts.padding) * opts.stretch)
                .max(theta_from + MIN_ARC);

            let mut color = if hap.is_active(now) {
                hap.value.color.unwrap_or(opts.active)
            } else if opts.colorize_inactive {
                hap.value.color.unwrap_or(opts.inactive)
            } else {
                opts.inactive
            };

            if opts.fade {
                let age = (now - hap.end).max(0.0);
                let factor = (1.0 - age / opts.lookback).clamp(0.0, 1.0) as f32;
                if factor <= 0.0 {
                    continue;
                }
                color = color.with_alpha_factor(factor);
            }

            self.sample_arc(theta_from, theta_to, rotation, center, spacing);
            canvas.stroke_polyline(&self.points, color, opts.thickness);
        }

        // Playhead arc last, over everything
        let theta_now = opts.inset * opts.stretch;
        self.sample_arc(
            theta_now,
            theta_now + opts.playhead_length.max(MIN_ARC),
            rotation,
            center,
            spacing,
        );
        canvas.stroke_polyline(&self.points, opts.playhead_color, opts.thickness);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::shared_canvas;
    use crate::widget::WidgetKind;
    use patternflow_core::{Hap, PatternClock, PatternSource, StaticPattern};
    use std::sync::Arc;

    fn clock_with(haps: Vec<Hap>, now: f64) -> PatternClock {
        let pattern: Arc<dyn PatternSource> = Arc::new(StaticPattern::new(haps));
        PatternClock::new(
            Arc::new(move || Some(Arc::clone(&pattern))),
            Arc::new(move || now),
        )
    }

    fn spiral_widget() -> VisualizationWidget {
        VisualizationWidget {
            id: "spiral-0-5".to_string(),
            kind: WidgetKind::Spiral,
            canvas: shared_canvas(64, 64).unwrap(),
            options: serde_json::json!({}),
        }
    }

    #[test]
    fn test_playhead_always_painted() {
        let widget = spiral_widget();
        let clock = clock_with(vec![], 0.0);
        let frame = FrameContext {
            now: 0.0,
            analyser: None,
            clock: Some(&clock),
        };
        let mut renderer = SpiralRenderer::new(SpiralOptions::default());
        renderer.render(&widget, &frame).unwrap();
        assert!(
            widget
                .canvas
                .lock()
                .has_paint_over(SpiralOptions::default().background),
            "playhead marker paints even with no events"
        );
    }

    #[test]
    fn test_zero_and_negative_durations_are_tolerated() {
        let widget = spiral_widget();
        let clock = clock_with(
            vec![
                Hap::new(1.0, 1.0),
                Hap::new(1.5, 1.2), // inverted extent
                Hap::new(0.5, 1.5),
            ],
            1.0,
        );
        let frame = FrameContext {
            now: 0.0,
            analyser: None,
            clock: Some(&clock),
        };
        let mut renderer = SpiralRenderer::new(SpiralOptions::default());
        renderer.render(&widget, &frame).unwrap();
    }

    #[test]
    fn test_faded_out_events_are_skipped() {
        // An event older than the lookback window leaves no paint beyond
        // the playhead marker
        let old_only = {
            let widget = spiral_widget();
            let clock = clock_with(vec![Hap::new(-10.0, -9.0)], 0.0);
            let frame = FrameContext {
                now: 0.0,
                analyser: None,
                clock: Some(&clock),
            };
            let mut renderer = SpiralRenderer::new(SpiralOptions::default());
            renderer.render(&widget, &frame).unwrap();
            count_non_background(&widget)
        };

        let empty = {
            let widget = spiral_widget();
            let clock = clock_with(vec![], 0.0);
            let frame = FrameContext {
                now: 0.0,
                analyser: None,
                clock: Some(&clock),
            };
            let mut renderer = SpiralRenderer::new(SpiralOptions::default());
            renderer.render(&widget, &frame).unwrap();
            count_non_background(&widget)
        };

        assert_eq!(old_only, empty);
    }

    fn count_non_background(widget: &VisualizationWidget) -> usize {
        let canvas = widget.canvas.lock();
        let bg = SpiralOptions::default().background;
        let mut n = 0;
        for x in 0..64 {
            for y in 0..64 {
                if canvas.pixel(x, y) != Some(premultiplied(bg)) {
                    n += 1;
                }
            }
        }
        n
    }

    fn premultiplied(c: Rgba) -> Rgba {
        let color = tiny_skia::ColorU8::from_rgba(c.r, c.g, c.b, c.a).premultiply();
        Rgba::new(color.red(), color.green(), color.blue(), color.alpha())
    }
}
