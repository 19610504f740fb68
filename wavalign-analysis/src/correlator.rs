//! FFT cross-correlation of two interleaved signals
//!
//! Each signal in turn is the "probe": its leading `probe_count + window_len`
//! frames are correlated against the first `window_len` frames of the other
//! signal at every lag `0..probe_count`. Interleaved channels are treated as
//! one flat stream, so lag `k` lands on sample `k * channels`.

use crate::params::{AlignError, AlignParams};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;
use tracing::debug;

/// Cross-correlation at every lag, one sequence per direction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationPair {
    /// `2 * sum(a[k*C + i] * b[i])`, first signal shifted
    pub forward: Vec<f64>,
    /// `2 * sum(b[k*C + i] * a[i])`, second signal shifted
    pub reverse: Vec<f64>,
}

/// Zero-padded FFT correlator for one set of alignment sizes
///
/// The forward and inverse plans are built once and shared by both directions.
pub struct CrossCorrelator {
    params: AlignParams,
    fft_size: usize,
    fft_forward: Arc<dyn Fft<f32>>,
    fft_inverse: Arc<dyn Fft<f32>>,
    /// Probe signal, then product spectrum, then correlation
    long_buffer: Vec<Complex<f32>>,
    /// Fixed window of the other signal
    window_buffer: Vec<Complex<f32>>,
}

impl CrossCorrelator {
    /// Plan transforms for the given sizes
    ///
    /// The transform size is the smallest power of two holding
    /// `(probe_count + window_len) * channels` samples, which keeps the
    /// circular correlation free of wrap-around for every lag of interest.
    pub fn new(params: AlignParams) -> Self {
        let fft_size = params.required_samples().next_power_of_two();
        let mut planner = FftPlanner::new();
        let fft_forward = planner.plan_fft_forward(fft_size);
        let fft_inverse = planner.plan_fft_inverse(fft_size);

        debug!(
            fft_size,
            probe_count = params.probe_count,
            window_len = params.window_len,
            channels = params.channels,
            "planned cross-correlation"
        );

        Self {
            params,
            fft_size,
            fft_forward,
            fft_inverse,
            long_buffer: vec![Complex::new(0.0, 0.0); fft_size],
            window_buffer: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    /// Transform size in samples
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Correlate both directions
    pub fn process(&mut self, a: &[f64], b: &[f64]) -> Result<CorrelationPair, AlignError> {
        self.params.validate(a, b)?;
        Ok(CorrelationPair {
            forward: self.correlate_one(a, b),
            reverse: self.correlate_one(b, a),
        })
    }

    /// Correlation of `probe` shifted over the leading window of `fixed`
    fn correlate_one(&mut self, probe: &[f64], fixed: &[f64]) -> Vec<f64> {
        load_padded(
            &mut self.long_buffer,
            &probe[..self.params.required_samples()],
        );
        load_padded(
            &mut self.window_buffer,
            &fixed[..self.params.window_samples()],
        );

        self.fft_forward.process(&mut self.long_buffer);
        self.fft_forward.process(&mut self.window_buffer);

        // Unnormalized inverse leaves a factor of N; 2/N yields twice the
        // correlation, matching the energy identity used by the scorer.
        let scale = 2.0 / self.fft_size as f32;
        for (long, window) in self.long_buffer.iter_mut().zip(&self.window_buffer) {
            *long = *long * window.conj() * scale;
        }

        self.fft_inverse.process(&mut self.long_buffer);

        let channels = self.params.channels;
        (0..self.params.probe_count)
            .map(|k| self.long_buffer[k * channels].re as f64)
            .collect()
    }
}

/// Copy real samples into a complex buffer, zero padding the rest
fn load_padded(buffer: &mut [Complex<f32>], samples: &[f64]) {
    for (slot, &sample) in buffer.iter_mut().zip(samples) {
        *slot = Complex::new(sample as f32, 0.0);
    }
    for slot in buffer.iter_mut().skip(samples.len()) {
        *slot = Complex::new(0.0, 0.0);
    }
}

/// Cross-correlate two signals in both directions
pub fn correlate(a: &[f64], b: &[f64], params: &AlignParams) -> Result<CorrelationPair, AlignError> {
    params.validate(a, b)?;
    CrossCorrelator::new(*params).process(a, b)
}
