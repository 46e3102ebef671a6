//! Process-wide playback flag.
//!
//! The music engine reports start/stop transitions here; the visualization
//! manager additionally keeps its own `playing` flag so it can be driven
//! directly in tests. Engine glue is expected to forward transitions to
//! both.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

static PLAYING: AtomicBool = AtomicBool::new(false);

/// Record a playback state transition.
pub fn set_playing(playing: bool) {
    let was = PLAYING.swap(playing, Ordering::SeqCst);
    if was != playing {
        debug!("Playback state: {}", if playing { "playing" } else { "stopped" });
    }
}

/// Whether the engine is currently playing.
pub fn is_playing() -> bool {
    PLAYING.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        set_playing(true);
        assert!(is_playing());
        set_playing(false);
        assert!(!is_playing());
    }
}
