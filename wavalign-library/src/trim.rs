//! Leading silence detection
//!
//! Two stages, both measured in whole frames from the start of the signal:
//! exact digital silence, then a low-energy lead-in found with a moving
//! average over the region that will actually be aligned.

use tracing::debug;

/// Policy for the low-energy stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimConfig {
    /// Moving average length in frames
    pub moving_average_len: usize,
    /// A window is "signal" once its energy times this ratio exceeds the
    /// region's mean energy per window
    pub threshold_ratio: f64,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            moving_average_len: 128,
            threshold_ratio: 256.0,
        }
    }
}

/// Leading frames to skip before alignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimReport {
    /// Frames whose samples are all exactly zero
    pub zeros: usize,
    /// Low-energy frames following the zeros
    pub low_energy: usize,
}

impl TrimReport {
    pub fn total(&self) -> usize {
        self.zeros + self.low_energy
    }
}

/// Measure the leading silence of an interleaved signal
///
/// The low-energy stage only looks at the `search_frames` frames following
/// the zeros.
pub fn trim_leading(
    samples: &[f64],
    channels: usize,
    search_frames: usize,
    config: &TrimConfig,
) -> TrimReport {
    let channels = channels.max(1);
    let total_frames = samples.len() / channels;

    let zeros = samples
        .chunks_exact(channels)
        .take_while(|frame| frame.iter().all(|&s| s == 0.0))
        .count();

    let region_frames = (total_frames - zeros).min(search_frames);
    let start = zeros * channels;
    let region = &samples[start..start + region_frames * channels];
    let low_energy = low_energy_frames(region, channels, config);

    debug!(zeros, low_energy, region_frames, "measured leading silence");

    TrimReport { zeros, low_energy }
}

fn low_energy_frames(region: &[f64], channels: usize, config: &TrimConfig) -> usize {
    let frames = region.len() / channels;
    let ma_len = config.moving_average_len;
    if ma_len == 0 || frames < ma_len {
        return 0;
    }

    let window = ma_len * channels;
    let total: f64 = region.iter().map(|s| s * s).sum();
    let reference = total / frames as f64 * ma_len as f64;

    let mut energy: f64 = region[..window].iter().map(|s| s * s).sum();
    let mut position = 0;
    while energy * config.threshold_ratio <= reference && position + window < region.len() {
        let entering = region[position + window];
        let leaving = region[position];
        energy += entering * entering - leaving * leaving;
        position += 1;
    }

    position / channels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_then_tone(quiet: usize, loud: usize, channels: usize) -> Vec<f64> {
        let mut samples = Vec::with_capacity((quiet + loud) * channels);
        for _ in 0..quiet {
            for _ in 0..channels {
                samples.push(1e-4);
            }
        }
        for i in 0..loud {
            let s = (i as f64 * 0.2 + 0.3).sin() * 0.5;
            for _ in 0..channels {
                samples.push(s);
            }
        }
        samples
    }

    #[test]
    fn test_counts_leading_zero_frames() {
        // The second frame has one nonzero channel, so it ends the silence
        let samples = [0.0, 0.0, 0.0, 0.5, 0.3, 0.3, 0.2, 0.2];
        let report = trim_leading(&samples, 2, 100, &TrimConfig::default());
        assert_eq!(report.zeros, 1);
        assert_eq!(report.low_energy, 0);
    }

    #[test]
    fn test_all_zero_signal() {
        let samples = vec![0.0; 64];
        let report = trim_leading(&samples, 2, 100, &TrimConfig::default());
        assert_eq!(report.zeros, 32);
        assert_eq!(report.low_energy, 0);
        assert_eq!(report.total(), 32);
    }

    #[test]
    fn test_loud_signal_is_not_trimmed() {
        let samples = quiet_then_tone(0, 4000, 1);
        let report = trim_leading(&samples, 1, 4000, &TrimConfig::default());
        assert_eq!(report, TrimReport::default());
    }

    #[test]
    fn test_quiet_lead_in_mono() {
        let samples = quiet_then_tone(1000, 3000, 1);
        let report = trim_leading(&samples, 1, 4000, &TrimConfig::default());

        assert_eq!(report.zeros, 0);
        assert!(
            report.low_energy > 850 && report.low_energy <= 1000,
            "low energy frames: {}",
            report.low_energy
        );
    }

    #[test]
    fn test_quiet_lead_in_counts_frames_not_samples() {
        let mono = trim_leading(&quiet_then_tone(1000, 3000, 1), 1, 4000, &TrimConfig::default());
        let stereo = trim_leading(&quiet_then_tone(1000, 3000, 2), 2, 4000, &TrimConfig::default());
        assert!(
            (mono.low_energy as i64 - stereo.low_energy as i64).abs() <= 1,
            "mono {} vs stereo {}",
            mono.low_energy,
            stereo.low_energy
        );
    }

    #[test]
    fn test_zeros_then_quiet_lead_in() {
        let mut samples = vec![0.0; 200];
        samples.extend(quiet_then_tone(1000, 3000, 1));
        let report = trim_leading(&samples, 1, 4000, &TrimConfig::default());

        assert_eq!(report.zeros, 200);
        assert!(report.low_energy > 850 && report.low_energy <= 1000);
    }

    #[test]
    fn test_short_region_skips_low_energy_stage() {
        let samples = quiet_then_tone(50, 50, 1);
        let report = trim_leading(&samples, 1, 4000, &TrimConfig::default());
        assert_eq!(report.low_energy, 0);
    }
}
