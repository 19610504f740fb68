//! Sum of squared differences at every lag
//!
//! Uses `SSD(k) = E_probe(k) + E_fixed(0) - xcorr(k)` where `xcorr` already
//! carries the factor of two from the correlator. The probe's window energy
//! slides one frame per lag, so scoring costs O(probe_count * channels) on
//! top of the correlation.

use crate::correlator::CrossCorrelator;
use crate::params::{AlignError, AlignParams};

/// SSD at every lag, parallel to [`CorrelationPair`](crate::CorrelationPair)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DifferencePair {
    /// First signal's window at lag `k` against the second signal's leading window
    pub forward: Vec<f64>,
    /// Second signal's window at lag `k` against the first signal's leading window
    pub reverse: Vec<f64>,
}

/// Running energy of a window sliding over an interleaved signal
struct WindowEnergy<'a> {
    signal: &'a [f64],
    channels: usize,
    window_len: usize,
    /// Frame index of the window start
    position: usize,
    energy: f64,
}

impl<'a> WindowEnergy<'a> {
    fn new(signal: &'a [f64], channels: usize, window_len: usize) -> Self {
        let energy = signal[..window_len * channels].iter().map(|s| s * s).sum();
        Self {
            signal,
            channels,
            window_len,
            position: 0,
            energy,
        }
    }

    fn energy(&self) -> f64 {
        self.energy
    }

    /// Move the window one frame forward
    fn advance(&mut self) {
        let leaving = self.position * self.channels;
        let entering = (self.position + self.window_len) * self.channels;
        for ch in 0..self.channels {
            let old = self.signal[leaving + ch];
            let new = self.signal[entering + ch];
            self.energy += new * new - old * old;
        }
        self.position += 1;
    }
}

/// Sum of squared differences between the two signals at every lag, both directions
pub fn score_differences(
    a: &[f64],
    b: &[f64],
    params: &AlignParams,
) -> Result<DifferencePair, AlignError> {
    params.validate(a, b)?;
    let xcorr = CrossCorrelator::new(*params).process(a, b)?;

    let mut energy_a = WindowEnergy::new(a, params.channels, params.window_len);
    let mut energy_b = WindowEnergy::new(b, params.channels, params.window_len);
    let fixed_a = energy_a.energy();
    let fixed_b = energy_b.energy();

    let mut forward = Vec::with_capacity(params.probe_count);
    let mut reverse = Vec::with_capacity(params.probe_count);

    for k in 0..params.probe_count {
        forward.push(energy_a.energy() + fixed_b - xcorr.forward[k]);
        reverse.push(energy_b.energy() + fixed_a - xcorr.reverse[k]);

        // The last lag has no successor; advancing would read one frame past
        // the required length.
        if k + 1 < params.probe_count {
            energy_a.advance();
            energy_b.advance();
        }
    }

    Ok(DifferencePair { forward, reverse })
}
