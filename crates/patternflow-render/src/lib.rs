//! PatternFlow Render - Canvas Surfaces and the Visualization Loop
//!
//! Inline visualizations for the live-coding editor: a shared animation
//! loop renders every registered widget each display frame while playback
//! runs. Four renderers are provided (oscilloscope, piano-roll, punch-card,
//! spiral); spectrum widgets are owned by the music engine itself and are
//! deliberately never painted here.

#![warn(missing_docs)]

use thiserror::Error;

pub mod canvas;
pub mod manager;
pub mod roll;
pub mod scope;
pub mod spiral;
pub mod widget;

pub use canvas::{shared_canvas, Canvas, SharedCanvas};
pub use manager::{FrameContext, FrameScheduler, Renderer, VizManager};
pub use widget::{
    RollOptions, ScopeOptions, SpiralOptions, VisualizationWidget, WidgetId, WidgetKind,
};

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// Scope widgets need the spliced analyser
    #[error("No analyser available")]
    MissingAnalyser,

    /// Pattern-driven widgets need the pattern/clock getters
    #[error("No pattern clock available")]
    MissingPatternClock,

    /// The clock is wired but no pattern has been evaluated yet
    #[error("No pattern evaluated")]
    NoPattern,

    /// Canvas dimensions rejected by the rasterizer
    #[error("Invalid canvas size: {0}x{1}")]
    InvalidCanvasSize(u32, u32),
}

/// Result type for rendering operations
pub type Result<T> = std::result::Result<T, RenderError>;
