//! Descriptor-to-canvas reconciliation.
//!
//! Evaluation hands the hook a fresh descriptor list; the editor
//! materializes canvases asynchronously. The hook therefore works in two
//! phases: `update` applies decorations and stages a pending resolution,
//! and `resolve_pending` (driven on the next refresh tick) matches
//! descriptors to the canvases that have appeared, registering the
//! result with the visualization manager. Descriptors whose canvas has
//! not materialized yet are retried a bounded number of ticks, then
//! dropped with a warning rather than kept forever.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use patternflow_render::{SharedCanvas, VisualizationWidget, VizManager, WidgetId, WidgetKind};

use crate::descriptor::{DescriptorKind, WidgetDescriptor};
use crate::editor::EditorSurface;
use crate::ids::{positional_id, IdentityIdTable};

/// Resolution attempts before a descriptor is dropped
const MAX_RESOLVE_ATTEMPTS: u32 = 3;

/// Manager handle shared between the hook and the frame driver
pub type SharedVizManager = Arc<Mutex<VizManager>>;

struct PendingItem {
    id: WidgetId,
    kind: WidgetKind,
    anchor: Option<usize>,
    options: serde_json::Value,
}

struct PendingResolution {
    items: Vec<PendingItem>,
    /// Ids of every visual in the update that staged this resolution
    current_ids: HashSet<WidgetId>,
    attempts: u32,
}

/// Reconciles evaluated widget descriptors with editor canvases.
pub struct WidgetBindingHook {
    manager: SharedVizManager,
    ids: IdentityIdTable,
    /// Currently registered widgets and the canvas each one holds; the
    /// canvas handle keeps later resolution rounds from handing a bound
    /// canvas to a second widget
    registered: HashMap<WidgetId, SharedCanvas>,
    pending: Option<PendingResolution>,
}

impl WidgetBindingHook {
    /// Create a hook bound to the given manager
    pub fn new(manager: SharedVizManager) -> Self {
        Self {
            manager,
            ids: IdentityIdTable::new(),
            registered: HashMap::new(),
            pending: None,
        }
    }

    /// Accept a fresh descriptor list from evaluation.
    ///
    /// An empty list tears everything down. Otherwise sliders and visuals
    /// are decorated and a pending resolution is staged for the next
    /// refresh tick; staging always replaces a previously pending one, so
    /// rapid re-evaluations cannot resolve against stale descriptors.
    pub fn update(&mut self, editor: &mut dyn EditorSurface, descriptors: &[Arc<WidgetDescriptor>]) {
        if descriptors.is_empty() {
            editor.clear_decorations();
            let mut manager = self.manager.lock();
            for (id, _) in self.registered.drain() {
                manager.unregister_widget(&id);
            }
            self.pending = None;
            return;
        }

        let mut sliders = Vec::new();
        let mut visuals = Vec::new();
        for descriptor in descriptors {
            match &descriptor.kind {
                DescriptorKind::Slider(spec) => {
                    if let Err(e) = spec.validate() {
                        warn!("Skipping slider descriptor: {e}");
                        continue;
                    }
                    sliders.push(Arc::clone(descriptor));
                }
                DescriptorKind::Visual(_) => visuals.push(Arc::clone(descriptor)),
            }
        }

        editor.apply_slider_decorations(&sliders);
        editor.apply_widget_decorations(&visuals);

        let mut items = Vec::with_capacity(visuals.len());
        let mut current_ids = HashSet::new();
        for descriptor in &visuals {
            let DescriptorKind::Visual(kind) = &descriptor.kind else {
                continue;
            };
            let kind = *kind;
            let id = match descriptor.range {
                Some(range) => positional_id(kind, range.start, range.end),
                None => self.ids.id_for(descriptor, kind),
            };
            current_ids.insert(id.clone());
            items.push(PendingItem {
                id,
                kind,
                anchor: descriptor.range.map(|r| r.start),
                options: descriptor.options.clone(),
            });
        }

        debug!("Staged {} visual(s) for resolution", items.len());
        self.pending = Some(PendingResolution {
            items,
            current_ids,
            attempts: 0,
        });
    }

    /// Resolve the staged descriptors against the editor's canvases.
    ///
    /// Matching order per descriptor: explicit canvas marker equal to the
    /// widget id, then the canvas whose document position lies nearest the
    /// descriptor's source start, then (warned) a lone unclaimed canvas.
    /// Ids registered by a previous update but absent from the current one
    /// are unregistered here.
    pub fn resolve_pending(&mut self, editor: &dyn EditorSurface) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        {
            let mut manager = self.manager.lock();
            let stale: Vec<WidgetId> = self
                .registered
                .keys()
                .filter(|id| !pending.current_ids.contains(*id))
                .cloned()
                .collect();
            for id in stale {
                manager.unregister_widget(&id);
                self.registered.remove(&id);
            }
        }

        let canvases = editor.canvases();
        // Canvases held by a widget registered in an earlier round are not
        // up for grabs; without this, a retry round would hand an occupied
        // canvas to a second widget and both would paint it every frame
        let mut claimed: Vec<bool> = canvases
            .iter()
            .map(|c| {
                self.registered
                    .values()
                    .any(|held| Arc::ptr_eq(held, &c.canvas))
            })
            .collect();
        let mut matched: Vec<(SharedCanvas, PendingItem)> = Vec::new();
        let mut rest: Vec<PendingItem> = Vec::new();

        // Marker matches first: an explicit tag always wins over proximity
        for item in pending.items {
            // An id that is already bound rebinds in place, so a
            // re-evaluation refreshes its options
            if let Some(held) = self.registered.get(&item.id) {
                matched.push((Arc::clone(held), item));
                continue;
            }
            let hit = canvases.iter().enumerate().find(|(i, c)| {
                !claimed[*i] && c.marker.as_deref() == Some(item.id.as_str())
            });
            match hit {
                Some((i, _)) => {
                    claimed[i] = true;
                    matched.push((Arc::clone(&canvases[i].canvas), item));
                }
                None => rest.push(item),
            }
        }

        let mut unresolved = Vec::new();
        for item in rest {
            let by_position = item.anchor.and_then(|anchor| {
                canvases
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !claimed[*i])
                    .filter_map(|(i, c)| c.doc_pos.map(|p| (i, p.abs_diff(anchor))))
                    .min_by_key(|&(_, distance)| distance)
                    .map(|(i, _)| i)
            });

            let slot = by_position.or_else(|| {
                // Last resort: exactly one canvas is still unclaimed
                let mut free = claimed.iter().enumerate().filter(|(_, &c)| !c);
                match (free.next(), free.next()) {
                    (Some((i, _)), None) => {
                        warn!(
                            "Widget {}: no marker or position match; using the only free canvas",
                            item.id
                        );
                        Some(i)
                    }
                    _ => None,
                }
            });

            match slot {
                Some(i) => {
                    claimed[i] = true;
                    matched.push((Arc::clone(&canvases[i].canvas), item));
                }
                None => unresolved.push(item),
            }
        }

        {
            let mut manager = self.manager.lock();
            for (canvas, item) in matched {
                debug!("Widget {} bound to a canvas", item.id);
                self.registered.insert(item.id.clone(), Arc::clone(&canvas));
                manager.register_widget(VisualizationWidget {
                    id: item.id,
                    kind: item.kind,
                    canvas,
                    options: item.options,
                });
            }
        }

        if !unresolved.is_empty() {
            let attempts = pending.attempts + 1;
            if attempts >= MAX_RESOLVE_ATTEMPTS {
                for item in &unresolved {
                    warn!(
                        "Widget {}: no canvas after {} attempts; dropping",
                        item.id, attempts
                    );
                }
            } else {
                self.pending = Some(PendingResolution {
                    items: unresolved,
                    current_ids: pending.current_ids,
                    attempts,
                });
            }
        }
    }

    /// Whether a resolution is still staged
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}
