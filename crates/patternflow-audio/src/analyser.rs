//! FFT analyser node.
//!
//! Mirrors the byte-frequency / float-time-domain shape the visualizers
//! expect: sample blocks arrive over a bounded channel (the graph side is
//! allowed to run on the engine's audio thread), and reads drain the
//! channel into a time-domain ring before analysing.

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};
use num_complex::Complex;
use parking_lot::Mutex;
use rustfft::{Fft, FftPlanner};

use crate::{AudioError, Result};

/// Sample blocks buffered between graph pushes and analysis reads
const FEED_CAPACITY: usize = 16;

/// Configuration for an [`Analyser`]
#[derive(Debug, Clone)]
pub struct AnalyserConfig {
    /// FFT window size in samples (power of 2)
    pub fft_size: usize,
    /// Exponential smoothing applied to magnitudes (0.0 - <1.0)
    pub smoothing: f32,
    /// Magnitude mapped to byte value 0
    pub min_decibels: f32,
    /// Magnitude mapped to byte value 255
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyserConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(AudioError::InvalidConfig(format!(
                "fft_size must be a power of two in 32..=32768, got {}",
                self.fft_size
            )));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(AudioError::InvalidConfig(format!(
                "smoothing must be in [0, 1), got {}",
                self.smoothing
            )));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(AudioError::InvalidConfig(format!(
                "min_decibels ({}) must be below max_decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        Ok(())
    }
}

struct AnalyserState {
    ring: Vec<f32>,
    write_pos: usize,
    fft: Arc<dyn Fft<f32>>,
    fft_buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    window: Vec<f32>,
    smoothed_magnitudes: Vec<f32>,
}

struct AnalyserInner {
    config: AnalyserConfig,
    feed_tx: Sender<Vec<f32>>,
    feed_rx: Receiver<Vec<f32>>,
    state: Mutex<AnalyserState>,
}

/// Shared-handle FFT analyser. Cloning shares the underlying state.
#[derive(Clone)]
pub struct Analyser {
    inner: Arc<AnalyserInner>,
}

impl Analyser {
    /// Create an analyser with the given configuration
    pub fn new(config: AnalyserConfig) -> Result<Self> {
        config.validate()?;

        let fft_size = config.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch_len = fft.get_inplace_scratch_len();

        // Pre-compute Hann window
        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                let t = i as f32 / (fft_size - 1) as f32;
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * t).cos())
            })
            .collect();

        let (feed_tx, feed_rx) = bounded(FEED_CAPACITY);

        let state = AnalyserState {
            ring: vec![0.0; fft_size],
            write_pos: 0,
            fft,
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            window,
            smoothed_magnitudes: vec![0.0; fft_size / 2],
        };

        Ok(Self {
            inner: Arc::new(AnalyserInner {
                config,
                feed_tx,
                feed_rx,
                state: Mutex::new(state),
            }),
        })
    }

    /// Configured FFT window size
    pub fn fft_size(&self) -> usize {
        self.inner.config.fft_size
    }

    /// Number of frequency bins produced (half the FFT size)
    pub fn frequency_bin_count(&self) -> usize {
        self.inner.config.fft_size / 2
    }

    /// Sender used by graph analyser nodes to feed sample blocks
    pub(crate) fn feed_sender(&self) -> Sender<Vec<f32>> {
        self.inner.feed_tx.clone()
    }

    /// Feed a sample block directly (engine glue and tests).
    ///
    /// Non-blocking; blocks are dropped when reads fall too far behind.
    pub fn push_block(&self, samples: &[f32]) {
        let _ = self.inner.feed_tx.try_send(samples.to_vec());
    }

    fn drain_feed(&self, state: &mut AnalyserState) {
        let n = state.ring.len();
        while let Ok(block) = self.inner.feed_rx.try_recv() {
            for &sample in &block {
                // Sanitize: NaN/Inf would contaminate the whole spectrum
                state.ring[state.write_pos] = if sample.is_finite() { sample } else { 0.0 };
                state.write_pos = (state.write_pos + 1) % n;
            }
        }
    }

    /// Copy the most recent `fft_size` time-domain samples, oldest first.
    ///
    /// `out` may be shorter (a prefix is written) or longer (the tail is
    /// zeroed).
    pub fn get_float_time_domain_data(&self, out: &mut [f32]) {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        self.drain_feed(state);

        let n = state.ring.len();
        let copied = out.len().min(n);
        for (i, slot) in out.iter_mut().take(copied).enumerate() {
            *slot = state.ring[(state.write_pos + i) % n];
        }
        for slot in out.iter_mut().skip(copied) {
            *slot = 0.0;
        }
    }

    /// Compute byte-domain frequency magnitudes into `out`.
    ///
    /// Hann window, forward FFT, per-bin magnitude, exponential smoothing,
    /// then a linear mapping of `[min_decibels, max_decibels]` onto
    /// `[0, 255]`.
    pub fn get_byte_frequency_data(&self, out: &mut [u8]) {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        self.drain_feed(state);

        let n = state.ring.len();
        for i in 0..n {
            let sample = state.ring[(state.write_pos + i) % n];
            state.fft_buffer[i] = Complex::new(sample * state.window[i], 0.0);
        }

        state
            .fft
            .process_with_scratch(&mut state.fft_buffer, &mut state.scratch);

        let config = &self.inner.config;
        let norm = 1.0 / n as f32;
        let db_span = config.max_decibels - config.min_decibels;
        let bin_count = state.smoothed_magnitudes.len();

        for (i, slot) in out.iter_mut().enumerate().take(bin_count) {
            let magnitude = state.fft_buffer[i].norm() * norm;
            state.smoothed_magnitudes[i] = state.smoothed_magnitudes[i] * config.smoothing
                + magnitude * (1.0 - config.smoothing);

            let db = 20.0 * state.smoothed_magnitudes[i].log10();
            let scaled = (db - config.min_decibels) / db_span * 255.0;
            *slot = scaled.clamp(0.0, 255.0) as u8;
        }
        for slot in out.iter_mut().skip(bin_count) {
            *slot = 0;
        }
    }

    /// Index of the bin closest to `hz` for a given sample rate
    pub fn hz_to_bin(&self, hz: f32, sample_rate: u32) -> usize {
        let bin_width = sample_rate as f32 / self.fft_size() as f32;
        (hz / bin_width).round() as usize
    }

    /// Dominant bin of the current spectrum (tests and diagnostics)
    pub fn peak_bin(&self) -> usize {
        let mut bytes = vec![0u8; self.frequency_bin_count()];
        self.get_byte_frequency_data(&mut bytes);
        bytes
            .iter()
            .enumerate()
            .max_by_key(|(_, &v)| v)
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for Analyser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyser")
            .field("fft_size", &self.fft_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_config_validation() {
        assert!(AnalyserConfig::default().validate().is_ok());

        let bad = AnalyserConfig {
            fft_size: 1000,
            ..Default::default()
        };
        assert!(bad.validate().is_err(), "non-power-of-two must be rejected");

        let bad = AnalyserConfig {
            min_decibels: -10.0,
            max_decibels: -30.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_time_domain_returns_latest_samples() {
        let analyser = Analyser::new(AnalyserConfig {
            fft_size: 64,
            ..Default::default()
        })
        .unwrap();

        // Push two blocks; the ring must hold the latest 64 samples
        analyser.push_block(&vec![1.0; 64]);
        analyser.push_block(&vec![2.0; 32]);

        let mut out = vec![0.0; 64];
        analyser.get_float_time_domain_data(&mut out);
        assert!(out[..32].iter().all(|&s| s == 1.0), "oldest first");
        assert!(out[32..].iter().all(|&s| s == 2.0));
    }

    #[test]
    fn test_sine_peaks_in_expected_bin() {
        let sample_rate = 44100.0;
        let analyser = Analyser::new(AnalyserConfig {
            fft_size: 1024,
            smoothing: 0.0,
            ..Default::default()
        })
        .unwrap();

        analyser.push_block(&sine(1000.0, sample_rate, 1024));

        let expected = analyser.hz_to_bin(1000.0, sample_rate as u32);
        let peak = analyser.peak_bin();
        assert!(
            (peak as i64 - expected as i64).abs() <= 1,
            "peak bin {} should be within one bin of {}",
            peak,
            expected
        );
    }

    #[test]
    fn test_silence_maps_to_zero_bytes() {
        let analyser = Analyser::new(AnalyserConfig {
            fft_size: 256,
            ..Default::default()
        })
        .unwrap();
        analyser.push_block(&vec![0.0; 256]);

        let mut bytes = vec![255u8; analyser.frequency_bin_count()];
        analyser.get_byte_frequency_data(&mut bytes);
        assert!(bytes.iter().all(|&b| b == 0), "silence is the dB floor");
    }

    #[test]
    fn test_non_finite_samples_are_sanitized() {
        let analyser = Analyser::new(AnalyserConfig {
            fft_size: 32,
            ..Default::default()
        })
        .unwrap();
        analyser.push_block(&[f32::NAN, f32::INFINITY, f32::NEG_INFINITY, 1.0]);

        let mut out = vec![0.0; 32];
        analyser.get_float_time_domain_data(&mut out);
        assert!(out.iter().all(|s| s.is_finite()));

        let mut bytes = vec![0u8; 16];
        analyser.get_byte_frequency_data(&mut bytes);
        // No assertion on values beyond their existence; the point is no
        // NaN propagation panic and finite output
    }

    #[test]
    fn test_short_and_long_outputs() {
        let analyser = Analyser::new(AnalyserConfig {
            fft_size: 64,
            ..Default::default()
        })
        .unwrap();
        analyser.push_block(&vec![1.0; 64]);

        let mut short = vec![0.0; 16];
        analyser.get_float_time_domain_data(&mut short);
        assert!(short.iter().all(|&s| s == 1.0));

        let mut long = vec![9.9; 128];
        analyser.get_float_time_domain_data(&mut long);
        assert!(long[64..].iter().all(|&s| s == 0.0), "tail zeroed");
    }
}
