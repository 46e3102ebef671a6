//! Pattern events ("haps") as queried from the music engine.

use serde::{Deserialize, Serialize};

use crate::color::Rgba;

/// Payload carried by a pattern event.
///
/// Only the fields the visualizers care about are modeled; the engine may
/// attach more, which is ignored here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventValue {
    /// Pitch-like value, used for piano-roll lane placement
    #[serde(default)]
    pub note: Option<f64>,

    /// Human-readable label (sample name etc.)
    #[serde(default)]
    pub label: Option<String>,

    /// Optional per-event color hint
    #[serde(default)]
    pub color: Option<Rgba>,
}

/// One discrete pattern event: its time extent in cycles plus a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hap {
    /// Event start, in cycle time
    pub begin: f64,
    /// Event end, in cycle time
    pub end: f64,
    /// Event payload
    pub value: EventValue,
}

impl Hap {
    /// Create an event with an empty payload
    pub fn new(begin: f64, end: f64) -> Self {
        Self {
            begin,
            end,
            value: EventValue::default(),
        }
    }

    /// Create an event with a note payload
    pub fn with_note(begin: f64, end: f64, note: f64) -> Self {
        Self {
            begin,
            end,
            value: EventValue {
                note: Some(note),
                ..Default::default()
            },
        }
    }

    /// Event duration in cycles. May be zero or negative for malformed
    /// events; renderers must clip rather than reject.
    pub fn duration(&self) -> f64 {
        self.end - self.begin
    }

    /// Whether the event is sounding at `now` (begin inclusive, end exclusive)
    pub fn is_active(&self, now: f64) -> bool {
        self.begin <= now && now < self.end
    }

    /// Whether the event overlaps the half-open window `[begin, end)`
    pub fn intersects(&self, begin: f64, end: f64) -> bool {
        self.begin < end && self.end > begin
    }
}
