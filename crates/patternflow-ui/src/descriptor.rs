//! Widget descriptors emitted by code evaluation.

use serde::{Deserialize, Serialize};

use patternflow_render::WidgetKind;

use crate::{BindError, Result};

/// Character range in the source document that produced a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRange {
    /// Start offset, inclusive
    pub start: usize,
    /// End offset, exclusive
    pub end: usize,
}

/// Inline slider parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliderSpec {
    /// Current value
    pub value: f64,
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
    /// Step increment, free when absent
    #[serde(default)]
    pub step: Option<f64>,
}

impl SliderSpec {
    /// Reject inverted or non-finite bounds
    pub fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(BindError::InvalidSliderBounds(self.min, self.max));
        }
        Ok(())
    }
}

/// What kind of inline widget a descriptor asks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DescriptorKind {
    /// An inline value slider, handled entirely by the editor
    Slider(SliderSpec),
    /// A canvas-backed visualization
    Visual(WidgetKind),
}

/// One widget request from the evaluator.
///
/// Descriptors are shared as `Arc<WidgetDescriptor>`; for descriptors
/// without a source range, the Arc identity itself is what makes the
/// widget stable across updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetDescriptor {
    /// Requested widget
    pub kind: DescriptorKind,
    /// Where in the source this widget was written, when known
    #[serde(default)]
    pub range: Option<SourceRange>,
    /// Raw per-widget options, forwarded to the renderer
    #[serde(default)]
    pub options: serde_json::Value,
}

impl WidgetDescriptor {
    /// Shorthand for a visualization descriptor with a source range
    pub fn visual(kind: WidgetKind, start: usize, end: usize) -> Self {
        Self {
            kind: DescriptorKind::Visual(kind),
            range: Some(SourceRange { start, end }),
            options: serde_json::Value::Null,
        }
    }
}
