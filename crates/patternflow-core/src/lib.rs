//! PatternFlow Core - Domain Model for the Pattern/Visual Pipeline
//!
//! This crate contains the shared domain model for PatternFlow, including:
//! - Pattern events (haps) and their query interface
//! - The pattern/transport-clock adapter fed by the music engine
//! - The process-wide playback flag
//! - Logging configuration

#![warn(missing_docs)]

use thiserror::Error;

pub mod color;
pub mod hap;
pub mod logging;
pub mod pattern;
pub mod playback;

pub use color::Rgba;
pub use hap::{EventValue, Hap};
pub use logging::LogConfig;
pub use pattern::{PatternClock, PatternGetter, PatternSource, StaticPattern, TimeGetter};

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// Color string could not be parsed
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// A time window was inverted or non-finite
    #[error("Invalid time window: [{0}, {1}]")]
    InvalidWindow(f64, f64),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
