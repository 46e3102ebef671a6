//! PatternFlow UI - Editor Widget Binding
//!
//! Bridges the code evaluator and the editor surface: evaluation produces
//! widget descriptors, the editor materializes inline canvases, and the
//! binding hook reconciles the two across re-evaluations using stable
//! widget ids.

#![warn(missing_docs)]

use thiserror::Error;

pub mod binding;
pub mod descriptor;
pub mod editor;
pub mod ids;

pub use binding::{SharedVizManager, WidgetBindingHook};
pub use descriptor::{DescriptorKind, SliderSpec, SourceRange, WidgetDescriptor};
pub use editor::{EditorCanvas, EditorSurface};
pub use ids::IdentityIdTable;

/// Widget binding errors
#[derive(Error, Debug)]
pub enum BindError {
    /// Slider bounds are inverted or non-finite
    #[error("Invalid slider bounds: min {0}, max {1}")]
    InvalidSliderBounds(f64, f64),
}

/// Result type for binding operations
pub type Result<T> = std::result::Result<T, BindError>;
