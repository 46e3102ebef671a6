//! Analysis bridge: the gain/analyser pair spliced in front of the real
//! output.
//!
//! The bridge owns exactly one gain node and one analyser node on its
//! context, wired `gain -> analyser -> destination` once at construction.
//! The redirector points every intercepted output connection at the gain
//! node, so the engine keeps "connecting to the destination" while audio
//! actually flows through the analyser.
//!
//! `tick()` is driven every display frame by the embedding driver,
//! independent of playback state; metering is cheap and deliberately
//! decoupled from the visualization loop.

use tracing::debug;

use crate::analyser::{Analyser, AnalyserConfig};
use crate::graph::{AudioContext, NodeId};
use crate::Result;

/// Default number of folded spectrum bins
pub const DEFAULT_BINS: usize = 8;

/// Frequency analysis bridge for one audio context.
pub struct AnalysisBridge {
    context: AudioContext,
    analyser: Analyser,
    gain: NodeId,
    analyser_node: NodeId,
    bins: usize,
    fft: Vec<f32>,
    test_mode: bool,
    connected: bool,
    byte_buf: Vec<u8>,
}

impl AnalysisBridge {
    /// Build the bridge on `context` and wire it to the real destination.
    pub fn new(context: &AudioContext, config: AnalyserConfig) -> Result<Self> {
        let analyser = Analyser::new(config)?;
        let gain = context.create_gain(1.0);
        let analyser_node = context.create_analyser(&analyser);

        context.connect_direct(gain, analyser_node)?;
        context.connect_direct(analyser_node, context.destination())?;

        debug!(
            "AnalysisBridge wired on context {} (fft_size={})",
            context.id(),
            analyser.fft_size()
        );

        let bin_count = analyser.frequency_bin_count();
        Ok(Self {
            context: context.clone(),
            analyser,
            gain,
            analyser_node,
            bins: DEFAULT_BINS,
            fft: vec![0.0; DEFAULT_BINS],
            test_mode: false,
            connected: true,
            byte_buf: vec![0; bin_count],
        })
    }

    /// The node the engine must treat as the true output
    pub fn input(&self) -> NodeId {
        self.gain
    }

    /// The underlying analyser (shared handle)
    pub fn analyser(&self) -> &Analyser {
        &self.analyser
    }

    /// The context this bridge is bound to
    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    /// Current number of spectrum bins
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// The folded, normalized spectrum: `bins()` floats in [0, 1]
    pub fn fft(&self) -> &[f32] {
        &self.fft
    }

    /// Resize the bin array. Clamped to at least one bin; previous values
    /// are discarded (fresh zeros).
    pub fn set_bins(&mut self, n: i32) {
        let n = n.max(1) as usize;
        self.bins = n;
        self.fft = vec![0.0; n];
    }

    /// Suppress live sampling so injected values survive `tick()`
    pub fn set_test_mode(&mut self, on: bool) {
        self.test_mode = on;
    }

    /// Whether live sampling is suppressed
    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    /// Overwrite the bin array (typically under test mode). Extra values
    /// are ignored; missing ones leave the existing entries in place.
    pub fn inject_fft(&mut self, values: &[f32]) {
        for (slot, &v) in self.fft.iter_mut().zip(values) {
            *slot = v;
        }
    }

    /// Sample the analyser into the bin array.
    ///
    /// Runs every display frame regardless of playback state. No-op while
    /// in test mode or after `disconnect()`.
    pub fn tick(&mut self) {
        if self.test_mode || !self.connected {
            return;
        }
        let mut bytes = std::mem::take(&mut self.byte_buf);
        self.analyser.get_byte_frequency_data(&mut bytes);
        fold_bins(&bytes, &mut self.fft);
        self.byte_buf = bytes;
    }

    /// Detach both nodes from the graph. Idempotent.
    pub fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.context.disconnect(self.gain, self.analyser_node);
        self.context
            .disconnect(self.analyser_node, self.context.destination());
        self.connected = false;
        debug!("AnalysisBridge disconnected from context {}", self.context.id());
    }
}

/// Partition `bytes` into `out.len()` equal contiguous slices (the last
/// slice absorbs the remainder), average each, normalize by the byte
/// maximum.
///
/// With fewer bytes than bins the slice length degenerates to zero: every
/// bin reads 0.0 except the last, which averages the whole buffer. Bin
/// counts beyond the spectrum size are not meaningful, so this stays the
/// remainder rule rather than becoming a special case.
fn fold_bins(bytes: &[u8], out: &mut [f32]) {
    let bins = out.len();
    if bins == 0 {
        return;
    }
    let slice_len = bytes.len() / bins;
    for (i, slot) in out.iter_mut().enumerate() {
        let start = i * slice_len;
        let end = if i == bins - 1 {
            bytes.len()
        } else {
            start + slice_len
        };
        *slot = if end > start {
            let sum: u32 = bytes[start..end].iter().map(|&b| b as u32).sum();
            sum as f32 / (end - start) as f32 / 255.0
        } else {
            0.0
        };
    }
}
