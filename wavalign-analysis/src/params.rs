//! Alignment sizes and precondition checks

use thiserror::Error;

/// Number of best candidates reported by the ranker
pub const NUM_BEST: usize = 3;

/// Errors that can occur before any alignment work is done
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlignError {
    #[error("channel count must be at least 1")]
    ZeroChannels,
    #[error("probe count must be at least 1")]
    ZeroProbeCount,
    #[error("window length must be at least 1")]
    ZeroWindow,
    #[error("{signal} signal holds {actual} samples, {required} required")]
    BufferTooShort {
        signal: &'static str,
        required: usize,
        actual: usize,
    },
    #[error("insufficient probe count: {probe_count} lags searched, {required} candidates required")]
    InsufficientProbes { probe_count: usize, required: usize },
    #[error("offset overflow: lag {lag} plus initial offset {initial_offset}")]
    OffsetOverflow { lag: i64, initial_offset: i64 },
}

/// Sizes shared by every stage of an alignment run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignParams {
    /// Interleaved channel count
    pub channels: usize,
    /// Number of lags evaluated per direction (in frames)
    pub probe_count: usize,
    /// Number of frames compared at each lag
    pub window_len: usize,
}

impl AlignParams {
    pub fn new(channels: usize, probe_count: usize, window_len: usize) -> Self {
        Self {
            channels,
            probe_count,
            window_len,
        }
    }

    /// Samples each input buffer must hold: `(probe_count + window_len) * channels`
    pub fn required_samples(&self) -> usize {
        (self.probe_count + self.window_len) * self.channels
    }

    /// Samples in one comparison window
    pub fn window_samples(&self) -> usize {
        self.window_len * self.channels
    }

    /// Check sizes and buffer lengths
    pub fn validate(&self, a: &[f64], b: &[f64]) -> Result<(), AlignError> {
        if self.channels == 0 {
            return Err(AlignError::ZeroChannels);
        }
        if self.probe_count == 0 {
            return Err(AlignError::ZeroProbeCount);
        }
        if self.window_len == 0 {
            return Err(AlignError::ZeroWindow);
        }

        let required = self.required_samples();
        for (signal, buf) in [("first", a), ("second", b)] {
            if buf.len() < required {
                return Err(AlignError::BufferTooShort {
                    signal,
                    required,
                    actual: buf.len(),
                });
            }
        }
        Ok(())
    }
}
