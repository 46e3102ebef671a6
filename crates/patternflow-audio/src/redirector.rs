//! Output redirector: the explicit singleton behind graph interception.
//!
//! The music engine cannot be changed to accept an injected output node,
//! so its destination connections are captured here instead. The first
//! connection targeting a context's destination (while a bridge-ready
//! callback is registered) captures that context, builds an
//! [`AnalysisBridge`] for it, and substitutes the bridge input for the
//! real destination. Every later destination connection on the captured
//! context is redirected the same way; other contexts pass through
//! untouched. The redirector binds to exactly one context for the process
//! lifetime.
//!
//! This is deliberate global state, kept in one documented place rather
//! than spread over ad hoc patches of the connection primitive.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::analyser::AnalyserConfig;
use crate::bridge::AnalysisBridge;
use crate::graph::{AudioContext, NodeId};

/// Shared handle to the bridge built by the redirector
pub type BridgeHandle = Arc<Mutex<AnalysisBridge>>;

type BridgeReadyFn = Arc<dyn Fn(&AudioContext, &BridgeHandle) + Send + Sync>;

struct Captured {
    context: AudioContext,
    bridge: Option<BridgeHandle>,
}

#[derive(Default)]
struct RedirectorState {
    on_bridge_ready: Option<BridgeReadyFn>,
    captured: Option<Captured>,
}

/// Process-wide output redirector.
pub struct OutputRedirector {
    state: Mutex<RedirectorState>,
}

static GLOBAL: Lazy<OutputRedirector> = Lazy::new(OutputRedirector::new);

/// The process-wide redirector consulted by [`AudioContext::connect`]
pub fn global() -> &'static OutputRedirector {
    &GLOBAL
}

impl OutputRedirector {
    /// Create a standalone redirector (tests drive instances directly;
    /// production code uses [`global`])
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RedirectorState::default()),
        }
    }

    /// Register the bridge-ready callback. Without one, destination
    /// connections pass through and no analysis is ever created.
    pub fn on_bridge_ready<F>(&self, callback: F)
    where
        F: Fn(&AudioContext, &BridgeHandle) + Send + Sync + 'static,
    {
        self.state.lock().on_bridge_ready = Some(Arc::new(callback));
    }

    /// The current bridge, if a context has been captured this session
    pub fn bridge(&self) -> Option<BridgeHandle> {
        self.state
            .lock()
            .captured
            .as_ref()
            .and_then(|c| c.bridge.clone())
    }

    /// Decide the effective destination for a connection to `dest` on
    /// `ctx`. Non-destination targets and foreign contexts pass through.
    pub fn resolve(&self, ctx: &AudioContext, dest: NodeId) -> NodeId {
        if dest != ctx.destination() {
            return dest;
        }

        // The callback is invoked after the lock is released; it may well
        // call back into the redirector or the graph.
        let mut ready: Option<(AudioContext, BridgeHandle, BridgeReadyFn)> = None;

        let effective = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            match &mut state.captured {
                Some(captured) if captured.context.id() == ctx.id() => {
                    if let Some(bridge) = &captured.bridge {
                        bridge.lock().input()
                    } else {
                        // A session reset dropped the bridge; rebuild on
                        // the next output connection of the bound context
                        match Self::build_bridge(ctx) {
                            Some(handle) => {
                                let input = handle.lock().input();
                                captured.bridge = Some(Arc::clone(&handle));
                                if let Some(cb) = &state.on_bridge_ready {
                                    ready = Some((ctx.clone(), handle, Arc::clone(cb)));
                                }
                                input
                            }
                            None => dest,
                        }
                    }
                }
                Some(_) => {
                    // Bound to an earlier context for the process lifetime
                    trace!(
                        "Output connection on context {} ignored; already bound",
                        ctx.id()
                    );
                    dest
                }
                None => {
                    let Some(cb) = state.on_bridge_ready.clone() else {
                        // Silent degrade: nobody asked for analysis
                        trace!("No bridge-ready callback registered; passing through");
                        return dest;
                    };
                    match Self::build_bridge(ctx) {
                        Some(handle) => {
                            let input = handle.lock().input();
                            state.captured = Some(Captured {
                                context: ctx.clone(),
                                bridge: Some(Arc::clone(&handle)),
                            });
                            debug!("Captured audio context {} for analysis", ctx.id());
                            ready = Some((ctx.clone(), handle, cb));
                            input
                        }
                        None => dest,
                    }
                }
            }
        };

        if let Some((ctx, handle, cb)) = ready {
            cb(&ctx, &handle);
        }
        effective
    }

    fn build_bridge(ctx: &AudioContext) -> Option<BridgeHandle> {
        match AnalysisBridge::new(ctx, AnalyserConfig::default()) {
            Ok(bridge) => Some(Arc::new(Mutex::new(bridge))),
            Err(e) => {
                warn!("Failed to build analysis bridge: {e}");
                None
            }
        }
    }

    /// Start a new engine session: disconnect and drop the current bridge.
    ///
    /// The captured-context binding is kept; the next output connection on
    /// that context builds a fresh bridge.
    pub fn begin_session(&self) {
        let mut state = self.state.lock();
        if let Some(captured) = &mut state.captured {
            if let Some(bridge) = captured.bridge.take() {
                bridge.lock().disconnect();
                debug!("Session reset: analysis bridge dropped");
            }
        }
    }
}

impl Default for OutputRedirector {
    fn default() -> Self {
        Self::new()
    }
}
