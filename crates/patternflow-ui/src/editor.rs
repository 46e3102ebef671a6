//! The editor surface as seen from the binding hook.
//!
//! The actual editor is an external collaborator; the hook only needs to
//! hand it decorations and enumerate the inline canvases it has
//! materialized.

use std::sync::Arc;

use patternflow_render::SharedCanvas;

use crate::descriptor::WidgetDescriptor;

/// One inline canvas the editor has materialized
#[derive(Clone)]
pub struct EditorCanvas {
    /// The paint surface
    pub canvas: SharedCanvas,
    /// Explicit widget-id marker, when the editor tagged the canvas
    pub marker: Option<String>,
    /// Document offset where the canvas sits, when known
    pub doc_pos: Option<usize>,
}

impl std::fmt::Debug for EditorCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorCanvas")
            .field("marker", &self.marker)
            .field("doc_pos", &self.doc_pos)
            .finish()
    }
}

/// Editor operations the binding hook drives.
pub trait EditorSurface {
    /// Place inline slider decorations for the given descriptors
    fn apply_slider_decorations(&mut self, sliders: &[Arc<WidgetDescriptor>]);

    /// Place inline canvas decorations for the given descriptors
    fn apply_widget_decorations(&mut self, visuals: &[Arc<WidgetDescriptor>]);

    /// Remove every decoration previously placed
    fn clear_decorations(&mut self);

    /// Canvases currently materialized in the document.
    ///
    /// Decoration application is asynchronous on the editor side, so a
    /// canvas requested by `apply_widget_decorations` may only appear
    /// here one or more refresh ticks later.
    fn canvases(&self) -> Vec<EditorCanvas>;
}
