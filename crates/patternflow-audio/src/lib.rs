//! PatternFlow Audio - Graph Interception and Frequency Analysis
//!
//! The music engine renders audio through a small retained node graph and
//! connects its output to the context destination. This crate supplies:
//! - the graph model and its connection primitive
//! - the output redirector that transparently captures the first
//!   destination connection and splices an analysis bridge into the graph
//! - the FFT analyser and the bridge that folds its spectrum into a small
//!   normalized bin array for the visualizers

#![warn(missing_docs)]

use thiserror::Error;

pub mod analyser;
pub mod bridge;
pub mod graph;
pub mod redirector;

pub use analyser::{Analyser, AnalyserConfig};
pub use bridge::AnalysisBridge;
pub use graph::{AudioContext, NodeId};
pub use redirector::{BridgeHandle, OutputRedirector};

/// Audio system errors
#[derive(Error, Debug)]
pub enum AudioError {
    /// Node id is not part of this context
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Analyser configuration rejected
    #[error("Invalid analyser config: {0}")]
    InvalidConfig(String),
}

/// Result type for audio operations
pub type Result<T> = std::result::Result<T, AudioError>;
