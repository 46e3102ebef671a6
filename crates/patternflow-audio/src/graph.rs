//! Minimal retained audio graph.
//!
//! This stands in for the engine's audio backend: nodes are created on a
//! context, connected with [`AudioContext::connect`], and the engine pushes
//! rendered sample blocks through the graph with
//! [`AudioContext::process_block`]. The only processing nodes modeled are
//! the ones the analysis bridge needs (gain, analyser, destination sink);
//! everything upstream is an opaque source.
//!
//! `connect` is THE interception point: every call is routed through the
//! global [`crate::redirector::OutputRedirector`], which may substitute the
//! effective destination.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::trace;

use crate::analyser::Analyser;
use crate::redirector;
use crate::{AudioError, Result};

/// Identifier of a node within one context
pub type NodeId = u64;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

enum NodeKind {
    /// Opaque engine-side source; an entry point for sample blocks
    Source,
    /// Scales samples by a fixed factor
    Gain(f32),
    /// Feeds samples to an [`Analyser`], passing them through unchanged
    Analyser(Sender<Vec<f32>>),
    /// Final output sink; samples are discarded here
    Destination,
}

struct ContextInner {
    id: u64,
    sample_rate: u32,
    destination: NodeId,
    nodes: Mutex<HashMap<NodeId, NodeKind>>,
    edges: Mutex<HashMap<NodeId, Vec<NodeId>>>,
    next_node: AtomicU64,
}

/// One audio context: a node set, an edge set, and a fixed destination.
///
/// Cheap to clone (shared interior).
#[derive(Clone)]
pub struct AudioContext {
    inner: Arc<ContextInner>,
}

impl AudioContext {
    /// Create a context with its destination sink
    pub fn new(sample_rate: u32) -> Self {
        let inner = ContextInner {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            sample_rate,
            destination: 0,
            nodes: Mutex::new(HashMap::new()),
            edges: Mutex::new(HashMap::new()),
            next_node: AtomicU64::new(1),
        };
        inner.nodes.lock().insert(0, NodeKind::Destination);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Process-unique context id
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Sample rate this context renders at
    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    /// The context's final output endpoint
    pub fn destination(&self) -> NodeId {
        self.inner.destination
    }

    fn add_node(&self, kind: NodeKind) -> NodeId {
        let id = self.inner.next_node.fetch_add(1, Ordering::Relaxed);
        self.inner.nodes.lock().insert(id, kind);
        id
    }

    /// Create an opaque source node (engine output, sample player, ...)
    pub fn create_source(&self) -> NodeId {
        self.add_node(NodeKind::Source)
    }

    /// Create a gain node with a fixed factor
    pub fn create_gain(&self, gain: f32) -> NodeId {
        self.add_node(NodeKind::Gain(gain))
    }

    /// Create a node feeding the given analyser
    pub fn create_analyser(&self, analyser: &Analyser) -> NodeId {
        self.add_node(NodeKind::Analyser(analyser.feed_sender()))
    }

    fn check_node(&self, node: NodeId) -> Result<()> {
        if self.inner.nodes.lock().contains_key(&node) {
            Ok(())
        } else {
            Err(AudioError::UnknownNode(node))
        }
    }

    /// Connect `source` to `dest`.
    ///
    /// The connection primitive. The global output redirector inspects
    /// every call and may substitute the effective destination (splicing
    /// the analysis bridge in front of the real output); the id actually
    /// connected is returned.
    pub fn connect(&self, source: NodeId, dest: NodeId) -> Result<NodeId> {
        self.check_node(source)?;
        self.check_node(dest)?;

        let effective = redirector::global().resolve(self, dest);
        // The substitute node was created on this same context by the
        // bridge; still verify before wiring.
        self.check_node(effective)?;

        self.add_edge(source, effective);
        Ok(effective)
    }

    /// Connect without consulting the redirector.
    ///
    /// Used for wiring the analysis bridge itself, which must reach the
    /// real destination.
    pub(crate) fn connect_direct(&self, source: NodeId, dest: NodeId) -> Result<()> {
        self.check_node(source)?;
        self.check_node(dest)?;
        self.add_edge(source, dest);
        Ok(())
    }

    fn add_edge(&self, source: NodeId, dest: NodeId) {
        let mut edges = self.inner.edges.lock();
        let outs = edges.entry(source).or_default();
        if !outs.contains(&dest) {
            outs.push(dest);
        }
    }

    /// Remove the edge `source -> dest`. Removing a missing edge is a no-op.
    pub fn disconnect(&self, source: NodeId, dest: NodeId) {
        let mut edges = self.inner.edges.lock();
        if let Some(outs) = edges.get_mut(&source) {
            outs.retain(|&d| d != dest);
            if outs.is_empty() {
                edges.remove(&source);
            }
        }
    }

    /// Whether the edge `source -> dest` currently exists
    pub fn is_connected(&self, source: NodeId, dest: NodeId) -> bool {
        self.inner
            .edges
            .lock()
            .get(&source)
            .map(|outs| outs.contains(&dest))
            .unwrap_or(false)
    }

    /// Push one block of mono samples into the graph at `source`.
    ///
    /// The block flows along edges; gain nodes scale it, analyser nodes
    /// capture a copy, the destination discards it. Each node is visited
    /// at most once per block, which also makes accidental cycles safe.
    pub fn process_block(&self, source: NodeId, samples: &[f32]) {
        let nodes = self.inner.nodes.lock();
        let edges = self.inner.edges.lock();

        let mut visited: Vec<NodeId> = vec![source];
        let mut queue: VecDeque<(NodeId, Arc<Vec<f32>>)> = VecDeque::new();
        let block: Arc<Vec<f32>> = Arc::new(samples.to_vec());

        if let Some(outs) = edges.get(&source) {
            for &out in outs {
                queue.push_back((out, Arc::clone(&block)));
            }
        }

        while let Some((node, block)) = queue.pop_front() {
            if visited.contains(&node) {
                continue;
            }
            visited.push(node);

            let forwarded = match nodes.get(&node) {
                Some(NodeKind::Gain(gain)) => {
                    Arc::new(block.iter().map(|s| s * gain).collect::<Vec<f32>>())
                }
                Some(NodeKind::Analyser(feed)) => {
                    if feed.try_send(block.as_ref().clone()).is_err() {
                        trace!("analyser feed full; dropping block of {} samples", block.len());
                    }
                    block
                }
                Some(NodeKind::Destination) | Some(NodeKind::Source) | None => continue,
            };

            if let Some(outs) = edges.get(&node) {
                for &out in outs {
                    queue.push_back((out, Arc::clone(&forwarded)));
                }
            }
        }
    }
}

impl std::fmt::Debug for AudioContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioContext")
            .field("id", &self.id())
            .field("sample_rate", &self.sample_rate())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::AnalyserConfig;

    #[test]
    fn test_connect_rejects_unknown_nodes() {
        let ctx = AudioContext::new(44100);
        let src = ctx.create_source();
        assert!(matches!(
            ctx.connect(src, 999),
            Err(AudioError::UnknownNode(999))
        ));
    }

    #[test]
    fn test_gain_scales_block() {
        let ctx = AudioContext::new(44100);
        let src = ctx.create_source();
        let gain = ctx.create_gain(0.5);
        let analyser = Analyser::new(AnalyserConfig {
            fft_size: 32,
            ..Default::default()
        })
        .unwrap();
        let tap = ctx.create_analyser(&analyser);

        ctx.connect_direct(src, gain).unwrap();
        ctx.connect_direct(gain, tap).unwrap();

        ctx.process_block(src, &[1.0; 32]);

        let mut out = vec![0.0; 32];
        analyser.get_float_time_domain_data(&mut out);
        assert!(
            out.iter().all(|&s| (s - 0.5).abs() < 1e-6),
            "gain of 0.5 should halve every sample, got {:?}",
            &out[..4]
        );
    }

    #[test]
    fn test_disconnect_removes_flow() {
        let ctx = AudioContext::new(44100);
        let src = ctx.create_source();
        let analyser = Analyser::new(AnalyserConfig {
            fft_size: 32,
            ..Default::default()
        })
        .unwrap();
        let tap = ctx.create_analyser(&analyser);

        ctx.connect_direct(src, tap).unwrap();
        assert!(ctx.is_connected(src, tap));

        ctx.disconnect(src, tap);
        assert!(!ctx.is_connected(src, tap));
        // Disconnecting again is fine
        ctx.disconnect(src, tap);

        ctx.process_block(src, &[1.0; 32]);
        let mut out = vec![0.0; 32];
        analyser.get_float_time_domain_data(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_cycle_does_not_hang() {
        let ctx = AudioContext::new(44100);
        let a = ctx.create_gain(1.0);
        let b = ctx.create_gain(1.0);
        ctx.connect_direct(a, b).unwrap();
        ctx.connect_direct(b, a).unwrap();
        ctx.process_block(a, &[0.0; 16]);
    }
}
