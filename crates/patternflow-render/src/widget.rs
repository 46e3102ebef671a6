//! Visualization widget model and per-type options.

use serde::{Deserialize, Serialize};

use patternflow_core::Rgba;

use crate::canvas::SharedCanvas;

/// Stable widget identifier (derived from source position when available)
pub type WidgetId = String;

/// The visualization types a widget can take.
///
/// `Spectrum` is listed for completeness of the descriptor vocabulary but
/// is never rendered by this crate: the music engine paints its own
/// spectrum, and painting it here too would race over clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetKind {
    /// Time-domain oscilloscope fed by the spliced analyser
    Scope,
    /// Horizontal event roll over the pattern timeline
    PianoRoll,
    /// Vertical event roll (same routine, rotated)
    PunchCard,
    /// Rotating spiral of recent events
    Spiral,
    /// Engine-owned spectrum display (never painted here)
    Spectrum,
}

impl std::fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slug = match self {
            WidgetKind::Scope => "scope",
            WidgetKind::PianoRoll => "pianoroll",
            WidgetKind::PunchCard => "punchcard",
            WidgetKind::Spiral => "spiral",
            WidgetKind::Spectrum => "spectrum",
        };
        f.write_str(slug)
    }
}

/// A visualization instance: stable id, type, referenced canvas, raw
/// options (parsed into a typed struct when the renderer is built).
#[derive(Clone)]
pub struct VisualizationWidget {
    /// Stable id; identical ids across evaluations mean "same widget"
    pub id: WidgetId,
    /// Visualization type
    pub kind: WidgetKind,
    /// The editor-owned canvas this widget paints into
    pub canvas: SharedCanvas,
    /// Raw per-widget options
    pub options: serde_json::Value,
}

impl std::fmt::Debug for VisualizationWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisualizationWidget")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

fn default_scope_color() -> Rgba {
    Rgba::opaque(80, 255, 140)
}

fn default_background() -> Rgba {
    Rgba::opaque(12, 12, 16)
}

fn default_active() -> Rgba {
    Rgba::WHITE
}

fn default_inactive() -> Rgba {
    Rgba::opaque(110, 110, 120)
}

/// Oscilloscope options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScopeOptions {
    /// Vertical gain applied to the +-1 sample range
    pub scale: f32,
    /// Stroke width in pixels
    pub thickness: f32,
    /// Trace color
    pub color: Rgba,
    /// Background fill
    pub background: Rgba,
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            thickness: 2.0,
            color: default_scope_color(),
            background: default_background(),
        }
    }
}

/// Piano-roll / punch-card options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RollOptions {
    /// Width of the rendered window, in cycles
    pub cycles: f64,
    /// Fractional position of "now" within the window (0 = left edge)
    pub playhead: f64,
    /// Fill for events sounding at the playhead
    pub active: Rgba,
    /// Fill for all other events
    pub inactive: Rgba,
    /// Background fill
    pub background: Rgba,
    /// Invert the value axis
    pub flip_values: bool,
}

impl Default for RollOptions {
    fn default() -> Self {
        Self {
            cycles: 4.0,
            playhead: 0.5,
            active: default_active(),
            inactive: default_inactive(),
            background: default_background(),
            flip_values: false,
        }
    }
}

/// Spiral options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpiralOptions {
    /// Rotation speed: rotation angle (in turns) = steady * now
    pub steady: f64,
    /// Angle units per cycle of event time
    pub stretch: f64,
    /// Angular offset placing "now" away from the spiral center
    pub inset: f64,
    /// Angular gap trimmed from each event's tail
    pub padding: f64,
    /// Look-behind window in cycles
    pub lookback: f64,
    /// Fade opacity with event age
    pub fade: bool,
    /// Apply color hints to inactive events as well
    pub colorize_inactive: bool,
    /// Stroke width in pixels
    pub thickness: f32,
    /// Playhead marker length, in turns
    pub playhead_length: f64,
    /// Color for events sounding now (overridden by a color hint)
    pub active: Rgba,
    /// Color for other events
    pub inactive: Rgba,
    /// Playhead marker color
    pub playhead_color: Rgba,
    /// Background fill
    pub background: Rgba,
}

impl Default for SpiralOptions {
    fn default() -> Self {
        Self {
            steady: 1.0,
            stretch: 1.0,
            inset: 3.0,
            padding: 0.05,
            lookback: 4.0,
            fade: true,
            colorize_inactive: false,
            thickness: 2.0,
            playhead_length: 0.02,
            active: default_active(),
            inactive: default_inactive(),
            playhead_color: Rgba::WHITE,
            background: default_background(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_slugs() {
        assert_eq!(WidgetKind::PianoRoll.to_string(), "pianoroll");
        assert_eq!(WidgetKind::Scope.to_string(), "scope");
    }

    #[test]
    fn test_kind_serde_kebab_case() {
        let kind: WidgetKind = serde_json::from_str("\"punch-card\"").unwrap();
        assert_eq!(kind, WidgetKind::PunchCard);
    }

    #[test]
    fn test_options_default_from_empty_json() {
        let opts: RollOptions = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(opts.cycles, 4.0);
        assert_eq!(opts.playhead, 0.5);

        let opts: SpiralOptions = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(opts.fade);
        assert!(!opts.colorize_inactive);
    }

    #[test]
    fn test_options_partial_override() {
        let opts: RollOptions =
            serde_json::from_value(serde_json::json!({ "cycles": 8.0 })).unwrap();
        assert_eq!(opts.cycles, 8.0);
        assert_eq!(opts.playhead, 0.5, "unspecified fields keep defaults");
    }
}
