//! Pattern and transport-clock accessors sourced from the music engine.
//!
//! The engine is an external collaborator: visualizers only ever see it
//! through a pair of injected getters, one for the currently evaluated
//! pattern and one for the current transport time. Both are queried fresh
//! every frame, so code re-evaluation swaps patterns without any
//! re-registration on this side.

use std::sync::Arc;

use crate::hap::Hap;

/// A queryable pattern (the music engine's evaluated program).
pub trait PatternSource: Send + Sync {
    /// Return all events overlapping the cycle-time window `[begin, end)`.
    fn query_arc(&self, begin: f64, end: f64) -> Vec<Hap>;
}

/// Getter for the current pattern, if any is evaluated.
pub type PatternGetter = Arc<dyn Fn() -> Option<Arc<dyn PatternSource>> + Send + Sync>;

/// Getter for the current transport time, in cycles.
pub type TimeGetter = Arc<dyn Fn() -> f64 + Send + Sync>;

/// Thin adapter pairing the engine's pattern accessor with its transport
/// clock. Cheap to clone; getters are shared.
#[derive(Clone)]
pub struct PatternClock {
    pattern: PatternGetter,
    time: TimeGetter,
}

impl PatternClock {
    /// Create an adapter from the two engine getters
    pub fn new(pattern: PatternGetter, time: TimeGetter) -> Self {
        Self { pattern, time }
    }

    /// Current pattern, or `None` when nothing is evaluated yet
    pub fn pattern(&self) -> Option<Arc<dyn PatternSource>> {
        (self.pattern)()
    }

    /// Current transport time in cycles
    pub fn time(&self) -> f64 {
        (self.time)()
    }
}

impl std::fmt::Debug for PatternClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternClock")
            .field("pattern", &self.pattern().is_some())
            .field("time", &self.time())
            .finish()
    }
}

/// Fixed list of events; the standard pattern stub for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct StaticPattern {
    haps: Vec<Hap>,
}

impl StaticPattern {
    /// Build a pattern from a fixed event list
    pub fn new(haps: Vec<Hap>) -> Self {
        Self { haps }
    }
}

impl PatternSource for StaticPattern {
    fn query_arc(&self, begin: f64, end: f64) -> Vec<Hap> {
        self.haps
            .iter()
            .filter(|h| h.intersects(begin, end))
            .cloned()
            .collect()
    }
}
