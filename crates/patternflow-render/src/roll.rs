//! Piano-roll and punch-card renderers.
//!
//! Both are the same routine with the axes swapped: events from a window
//! of pattern time are laid out along the time axis, with note values
//! mapped onto lanes across the other axis.

use patternflow_core::Hap;

use crate::manager::{FrameContext, Renderer};
use crate::widget::{RollOptions, VisualizationWidget};
use crate::{RenderError, Result};

/// Lane assigned to events that carry no note value
const DEFAULT_NOTE: f64 = 60.0;

/// The pattern-time window covered by one frame.
///
/// `playhead` positions "now" as a fraction of the window: 0 puts it at
/// the leading edge, 1 at the trailing edge.
pub fn query_window(now: f64, cycles: f64, playhead: f64) -> (f64, f64) {
    (now - cycles * playhead, now + cycles * (1.0 - playhead))
}

/// Renders pattern events as time-laned rectangles.
pub struct RollRenderer {
    options: RollOptions,
    vertical: bool,
}

impl RollRenderer {
    /// Piano-roll: time flows left to right
    pub fn horizontal(options: RollOptions) -> Self {
        Self {
            options,
            vertical: false,
        }
    }

    /// Punch-card: time flows top to bottom
    pub fn vertical(options: RollOptions) -> Self {
        Self {
            options,
            vertical: true,
        }
    }

    fn note_of(hap: &Hap) -> f64 {
        hap.value.note.unwrap_or(DEFAULT_NOTE)
    }
}

impl Renderer for RollRenderer {
    fn render(&mut self, widget: &VisualizationWidget, frame: &FrameContext<'_>) -> Result<()> {
        let clock = frame.clock.ok_or(RenderError::MissingPatternClock)?;
        let pattern = clock.pattern().ok_or(RenderError::NoPattern)?;

        let now = clock.time();
        let (from, to) = query_window(now, self.options.cycles, self.options.playhead);
        let haps = pattern.query_arc(from, to);

        let mut canvas = widget.canvas.lock();
        canvas.clear(self.options.background);

        // Time axis length and lane axis length depend on orientation
        let (time_len, lane_len) = if self.vertical {
            (canvas.height(), canvas.width())
        } else {
            (canvas.width(), canvas.height())
        };
        // Guards against a zero-width window from degenerate options
        let span = (to - from).max(1e-6);
        let px_per_cycle = time_len / span as f32;

        // Lane range from the notes actually present this frame
        let mut min_note = f64::MAX;
        let mut max_note = f64::MIN;
        for hap in &haps {
            let note = Self::note_of(hap);
            min_note = min_note.min(note);
            max_note = max_note.max(note);
        }
        let lane_count = if haps.is_empty() {
            1.0
        } else {
            (max_note - min_note).floor() + 1.0
        };
        let lane_size = lane_len / lane_count as f32;

        for hap in &haps {
            // Malformed extents are clipped, never rejected
            let begin = hap.begin.max(from);
            let end = hap.end.min(to).max(begin);
            let t0 = (begin - from) as f32 * px_per_cycle;
            // Zero-length events still get one visible pixel
            let extent = ((end - begin) as f32 * px_per_cycle).max(1.0);

            let lane = Self::note_of(hap) - min_note;
            // Higher notes sit at the top unless flipped
            let lane_pos = if self.options.flip_values == self.vertical {
                lane as f32
            } else {
                lane_count as f32 - 1.0 - lane as f32
            };
            let l0 = lane_pos * lane_size;

            let color = if hap.is_active(now) {
                hap.value.color.unwrap_or(self.options.active)
            } else {
                self.options.inactive
            };

            if self.vertical {
                canvas.fill_rect(l0, t0, lane_size.max(1.0), extent, color);
            } else {
                canvas.fill_rect(t0, l0, extent, lane_size.max(1.0), color);
            }
        }

        // Playhead marker at "now"
        let t_now = (now - from) as f32 * px_per_cycle;
        if self.vertical {
            canvas.stroke_line((0.0, t_now), (lane_len, t_now), self.options.active, 1.0);
        } else {
            canvas.stroke_line((t_now, 0.0), (t_now, lane_len), self.options.active, 1.0);
        }

        Ok(())
    }
}
