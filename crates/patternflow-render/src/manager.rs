//! Shared visualization loop and widget registry.
//!
//! One manager instance drives every inline visualization. The embedding
//! driver owns the actual frame cadence: it calls [`VizManager::on_frame`]
//! once per display refresh for as long as the last call returned `true`,
//! and a registered [`FrameScheduler`] is woken whenever a stopped loop
//! must start again. This mirrors a self-rescheduling animation-frame
//! callback with cooperative cancellation: stopping takes effect at the
//! top of the next iteration, one frame late at worst.
//!
//! All state is mutated through `&mut self` on the UI thread; a render
//! pass therefore always completes before any unregistration can be
//! observed.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use patternflow_audio::Analyser;
use patternflow_core::PatternClock;

use crate::roll::RollRenderer;
use crate::scope::ScopeRenderer;
use crate::spiral::SpiralRenderer;
use crate::widget::{VisualizationWidget, WidgetId, WidgetKind};
use crate::Result;

/// Everything a renderer may consult during one frame
pub struct FrameContext<'a> {
    /// Display-clock timestamp in seconds (not pattern time)
    pub now: f64,
    /// The spliced analyser, when interception has happened
    pub analyser: Option<&'a Analyser>,
    /// Pattern/transport accessors, when the engine is wired
    pub clock: Option<&'a PatternClock>,
}

/// A per-widget renderer. Errors are logged by the loop and never abort
/// the render pass.
pub trait Renderer: Send {
    /// Paint one frame for `widget`
    fn render(&mut self, widget: &VisualizationWidget, frame: &FrameContext<'_>) -> Result<()>;
}

/// Woken by the manager when a stopped loop needs to start again
pub trait FrameScheduler: Send + Sync {
    /// Request that the driver begin calling `on_frame` each refresh
    fn wake(&self);
}

struct WidgetEntry {
    widget: VisualizationWidget,
    /// `None` for spectrum widgets, which are never painted here
    renderer: Option<Box<dyn Renderer>>,
}

/// Registry plus shared animation loop for all inline visualizations.
#[derive(Default)]
pub struct VizManager {
    widgets: HashMap<WidgetId, WidgetEntry>,
    analyser: Option<Analyser>,
    clock: Option<PatternClock>,
    scheduler: Option<Arc<dyn FrameScheduler>>,
    running: bool,
    playing: bool,
}

impl VizManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the driver's scheduler
    pub fn set_scheduler(&mut self, scheduler: Arc<dyn FrameScheduler>) {
        self.scheduler = Some(scheduler);
    }

    /// Wire the spliced analyser (scope widgets need it)
    pub fn set_analyser(&mut self, analyser: Analyser) {
        self.analyser = Some(analyser);
    }

    /// Wire the pattern/transport accessors
    pub fn set_pattern_clock(&mut self, clock: PatternClock) {
        self.clock = Some(clock);
    }

    /// Number of registered widgets
    pub fn widget_count(&self) -> usize {
        self.widgets.len()
    }

    /// Whether a widget with this id is registered
    pub fn has_widget(&self, id: &str) -> bool {
        self.widgets.contains_key(id)
    }

    /// Whether the loop is currently scheduled
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Register or update a widget (upsert by id).
    ///
    /// Starts the loop when playback is active and the loop is stopped;
    /// repeat registrations never schedule a second loop.
    pub fn register_widget(&mut self, widget: VisualizationWidget) {
        let renderer = build_renderer(&widget);
        debug!("Registering widget {} ({})", widget.id, widget.kind);
        self.widgets
            .insert(widget.id.clone(), WidgetEntry { widget, renderer });

        if self.playing && !self.running {
            self.start_loop();
        }
    }

    /// Remove a widget by id; an empty registry stops the loop
    pub fn unregister_widget(&mut self, id: &str) {
        if self.widgets.remove(id).is_some() {
            debug!("Unregistered widget {}", id);
        }
        if self.widgets.is_empty() {
            self.running = false;
        }
    }

    /// Report a playback transition.
    ///
    /// Starting playback with widgets present starts the loop; stopping
    /// lets the loop halt itself on its next iteration and blanks every
    /// canvas so no stale frame lingers.
    pub fn set_playback_state(&mut self, playing: bool) {
        self.playing = playing;
        if playing {
            if !self.widgets.is_empty() && !self.running {
                self.start_loop();
            }
        } else {
            self.clear();
        }
    }

    fn start_loop(&mut self) {
        self.running = true;
        if let Some(scheduler) = &self.scheduler {
            scheduler.wake();
        }
    }

    /// One loop iteration. Returns `true` when the driver should call
    /// again next refresh.
    ///
    /// Renders every registered widget; a failing widget is logged and
    /// skipped without affecting its siblings. Spectrum widgets are
    /// engine-rendered and always skipped.
    pub fn on_frame(&mut self, now: f64) -> bool {
        if !(self.running && self.playing) {
            self.running = false;
            return false;
        }

        let frame = FrameContext {
            now,
            analyser: self.analyser.as_ref(),
            clock: self.clock.as_ref(),
        };

        for entry in self.widgets.values_mut() {
            if entry.widget.kind == WidgetKind::Spectrum {
                trace!("Widget {}: spectrum is engine-rendered; skipping", entry.widget.id);
                continue;
            }
            let Some(renderer) = entry.renderer.as_mut() else {
                continue;
            };
            if let Err(e) = renderer.render(&entry.widget, &frame) {
                warn!(
                    "Widget {} ({}): render skipped: {e}",
                    entry.widget.id, entry.widget.kind
                );
            }
        }

        true
    }

    /// Blank every registered widget's canvas without touching the
    /// registry
    pub fn clear(&mut self) {
        for entry in self.widgets.values() {
            entry
                .widget
                .canvas
                .lock()
                .clear(patternflow_core::Rgba::TRANSPARENT);
        }
    }
}

fn build_renderer(widget: &VisualizationWidget) -> Option<Box<dyn Renderer>> {
    match widget.kind {
        WidgetKind::Scope => Some(Box::new(ScopeRenderer::new(parse_options(widget)))),
        WidgetKind::PianoRoll => Some(Box::new(RollRenderer::horizontal(parse_options(widget)))),
        WidgetKind::PunchCard => Some(Box::new(RollRenderer::vertical(parse_options(widget)))),
        WidgetKind::Spiral => Some(Box::new(SpiralRenderer::new(parse_options(widget)))),
        WidgetKind::Spectrum => None,
    }
}

fn parse_options<T>(widget: &VisualizationWidget) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    match serde_json::from_value(widget.options.clone()) {
        Ok(options) => options,
        Err(e) => {
            warn!(
                "Widget {} ({}): unusable options ({e}); falling back to defaults",
                widget.id, widget.kind
            );
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::shared_canvas;
    use crate::RenderError;
    use patternflow_core::Rgba;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingScheduler {
        wakes: AtomicUsize,
    }

    impl FrameScheduler for CountingScheduler {
        fn wake(&self) {
            self.wakes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct RecordingRenderer {
        renders: Arc<AtomicUsize>,
    }

    impl Renderer for RecordingRenderer {
        fn render(&mut self, _: &VisualizationWidget, _: &FrameContext<'_>) -> Result<()> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingRenderer;

    impl Renderer for FailingRenderer {
        fn render(&mut self, _: &VisualizationWidget, _: &FrameContext<'_>) -> Result<()> {
            Err(RenderError::NoPattern)
        }
    }

    fn widget(id: &str, kind: WidgetKind) -> VisualizationWidget {
        VisualizationWidget {
            id: id.to_string(),
            kind,
            canvas: shared_canvas(16, 16).unwrap(),
            options: serde_json::json!({}),
        }
    }

    fn manager_with_scheduler() -> (VizManager, Arc<CountingScheduler>) {
        let mut manager = VizManager::new();
        let scheduler = Arc::new(CountingScheduler::default());
        manager.set_scheduler(Arc::clone(&scheduler) as Arc<dyn FrameScheduler>);
        (manager, scheduler)
    }

    #[test]
    fn test_register_while_playing_starts_loop_once() {
        let (mut manager, scheduler) = manager_with_scheduler();
        manager.set_playback_state(true);

        manager.register_widget(widget("a", WidgetKind::Scope));
        assert!(manager.is_running());
        assert_eq!(scheduler.wakes.load(Ordering::SeqCst), 1);

        // Additional registrations must not schedule a second loop
        manager.register_widget(widget("b", WidgetKind::Spiral));
        assert_eq!(scheduler.wakes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register_while_stopped_does_not_start() {
        let (mut manager, scheduler) = manager_with_scheduler();
        manager.register_widget(widget("a", WidgetKind::Scope));
        assert!(!manager.is_running());
        assert_eq!(scheduler.wakes.load(Ordering::SeqCst), 0);
        assert!(!manager.on_frame(0.0));
    }

    #[test]
    fn test_upsert_by_id() {
        let (mut manager, _) = manager_with_scheduler();
        manager.register_widget(widget("a", WidgetKind::Scope));
        manager.register_widget(widget("a", WidgetKind::Spiral));
        assert_eq!(manager.widget_count(), 1);
    }

    #[test]
    fn test_unregister_last_widget_stops_within_one_frame() {
        let (mut manager, _) = manager_with_scheduler();
        manager.set_playback_state(true);
        manager.register_widget(widget("a", WidgetKind::Scope));
        assert!(manager.on_frame(0.0));

        manager.unregister_widget("a");
        assert!(!manager.on_frame(0.016), "no rescheduling after the registry empties");
        assert!(!manager.is_running());
    }

    #[test]
    fn test_playback_stop_halts_next_frame() {
        let (mut manager, _) = manager_with_scheduler();
        manager.set_playback_state(true);
        manager.register_widget(widget("a", WidgetKind::Scope));
        assert!(manager.on_frame(0.0));

        manager.set_playback_state(false);
        assert!(!manager.on_frame(0.016), "bounded one-frame stop latency");
    }

    #[test]
    fn test_restart_after_stop_wakes_again() {
        let (mut manager, scheduler) = manager_with_scheduler();
        manager.set_playback_state(true);
        manager.register_widget(widget("a", WidgetKind::Scope));
        manager.set_playback_state(false);
        assert!(!manager.on_frame(0.0));

        manager.set_playback_state(true);
        assert_eq!(scheduler.wakes.load(Ordering::SeqCst), 2);
        assert!(manager.on_frame(0.016));
    }

    #[test]
    fn test_failing_widget_does_not_block_siblings() {
        let (mut manager, _) = manager_with_scheduler();
        manager.set_playback_state(true);
        manager.register_widget(widget("a", WidgetKind::Scope));
        manager.register_widget(widget("b", WidgetKind::Scope));

        let renders = Arc::new(AtomicUsize::new(0));
        manager.widgets.get_mut("a").unwrap().renderer = Some(Box::new(FailingRenderer));
        manager.widgets.get_mut("b").unwrap().renderer = Some(Box::new(RecordingRenderer {
            renders: Arc::clone(&renders),
        }));

        assert!(manager.on_frame(0.0));
        assert_eq!(renders.load(Ordering::SeqCst), 1, "b renders despite a failing");

        assert!(manager.on_frame(0.016));
        assert_eq!(renders.load(Ordering::SeqCst), 2, "and keeps rendering next frame");
    }

    #[test]
    fn test_spectrum_is_never_painted() {
        let (mut manager, _) = manager_with_scheduler();
        manager.set_playback_state(true);

        let spectrum = widget("s", WidgetKind::Spectrum);
        let canvas = Arc::clone(&spectrum.canvas);
        canvas.lock().clear(Rgba::BLACK);
        manager.register_widget(spectrum);

        manager.on_frame(0.0);
        assert!(
            !canvas.lock().has_paint_over(Rgba::BLACK),
            "spectrum canvases belong to the engine"
        );
    }

    #[test]
    fn test_clear_blanks_canvases_and_keeps_entries() {
        let (mut manager, _) = manager_with_scheduler();
        let w = widget("a", WidgetKind::Scope);
        let canvas = Arc::clone(&w.canvas);
        canvas.lock().clear(Rgba::WHITE);
        manager.register_widget(w);

        manager.clear();
        assert_eq!(manager.widget_count(), 1);
        assert_eq!(
            canvas.lock().pixel(0, 0),
            Some(Rgba::TRANSPARENT),
            "stale frame blanked"
        );
    }
}
