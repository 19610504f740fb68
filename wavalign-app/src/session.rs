//! One alignment run: trim both signals, fit the search sizes, rank offsets

use anyhow::{bail, Result};
use tracing::{debug, info};
use wavalign_analysis::{best_offsets, AlignParams, Alignment};
use wavalign_library::{check_compatible, trim_leading, Config, LoadedSignal, TrimConfig, TrimReport};

/// Smallest accepted SSD window, in frames
pub const MIN_WINDOW: usize = 1024;
/// Smallest accepted search range, in frames
pub const MIN_PROBES: usize = 1024;

/// Search range and SSD window, in frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSizes {
    pub probe_count: usize,
    pub window_len: usize,
}

impl SearchSizes {
    /// Sizes from the configured durations at the given sample rate
    pub fn from_config(config: &Config, sample_rate: u32) -> Self {
        let frames = |ms: u32| (sample_rate as u64 * ms as u64 / 1000) as usize;
        Self {
            probe_count: frames(config.probe_ms),
            window_len: frames(config.window_ms),
        }
    }

    pub fn total(&self) -> usize {
        self.probe_count + self.window_len
    }

    /// Shrink to `available` frames, keeping the window's share of the total
    pub fn fit(self, available: usize) -> Self {
        if available >= self.total() {
            return self;
        }
        let ratio = self.window_len as f64 / self.total() as f64;
        let window_len = ((ratio * available as f64) as usize).max(MIN_WINDOW);
        Self {
            probe_count: available.saturating_sub(window_len),
            window_len,
        }
    }
}

/// Everything an alignment run found
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub reference_trim: TrimReport,
    pub test_trim: TrimReport,
    pub sizes: SearchSizes,
    pub alignment: Alignment,
}

/// Refuse offsets that would insert more than `back_max` frames of silence
///
/// Any negative `back_max` means unlimited.
pub fn check_backward_limit(offset: i64, back_max: i64) -> Result<()> {
    if back_max >= 0 && offset < -back_max {
        bail!(
            "too long backward offset {}, max value is {}",
            offset.unsigned_abs(),
            back_max
        );
    }
    Ok(())
}

/// Samples the aligner sees: the first `params.required_samples()` after the trimmed lead-in
fn leading_window<'a>(signal: &'a LoadedSignal, trim: &TrimReport, params: &AlignParams) -> &'a [f64] {
    let start = trim.total() * params.channels;
    &signal.samples[start..start + params.required_samples()]
}

/// Align `test` to `reference`
pub fn align(
    reference: &LoadedSignal,
    test: &LoadedSignal,
    sizes: SearchSizes,
    trim: &TrimConfig,
) -> Result<SessionReport> {
    check_compatible(reference, test)?;
    let channels = reference.channels as usize;

    let reference_trim = trim_leading(&reference.samples, channels, sizes.total(), trim);
    let test_trim = trim_leading(&test.samples, channels, sizes.total(), trim);

    let mut available = sizes.total();
    for (name, signal, report) in [
        ("reference", reference, &reference_trim),
        ("test", test, &test_trim),
    ] {
        let remaining = signal.frames() - report.total();
        if remaining < MIN_PROBES + MIN_WINDOW {
            bail!(
                "{} zeros removed, not enough samples ({}) to align the {} signal",
                report.zeros,
                remaining,
                name
            );
        }
        available = available.min(remaining);
    }

    let sizes = sizes.fit(available);
    debug!(?sizes, available, "fitted search sizes");

    let bias = test_trim.total() as i64 - reference_trim.total() as i64;
    let params = AlignParams::new(channels, sizes.probe_count, sizes.window_len);
    let alignment = best_offsets(
        leading_window(reference, &reference_trim, &params),
        leading_window(test, &test_trim, &params),
        &params,
        bias,
    )?;

    info!(
        offset = alignment.best().offset,
        ssd = alignment.best().score,
        bias,
        "aligned"
    );

    Ok(SessionReport {
        reference_trim,
        test_trim,
        sizes,
        alignment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavalign_analysis::Direction;
    use wavalign_library::SampleFormat;

    fn source(frames: usize) -> Vec<f64> {
        (0..frames)
            .map(|i| {
                let t = i as f64;
                0.5 * (0.05 * t + 0.7).sin() + 0.3 * (0.013 * t + 0.2).sin()
            })
            .collect()
    }

    fn mono(lead_zeros: usize, body: &[f64]) -> LoadedSignal {
        let mut samples = vec![0.0; lead_zeros];
        samples.extend_from_slice(body);
        LoadedSignal {
            samples,
            sample_rate: 8000,
            channels: 1,
            format: SampleFormat::Int(16),
        }
    }

    fn sizes() -> SearchSizes {
        SearchSizes {
            probe_count: 1024,
            window_len: 2048,
        }
    }

    #[test]
    fn test_sizes_from_config() {
        let sizes = SearchSizes::from_config(&Config::default(), 48000);
        assert_eq!(sizes.probe_count, 24000);
        assert_eq!(sizes.window_len, 144000);
    }

    #[test]
    fn test_fit_keeps_sizes_when_room() {
        assert_eq!(sizes().fit(10_000), sizes());
    }

    #[test]
    fn test_fit_keeps_ratio() {
        let sizes = SearchSizes {
            probe_count: 1024,
            window_len: 3072,
        };
        let fitted = sizes.fit(2400);
        assert_eq!(fitted.window_len, 1800);
        assert_eq!(fitted.probe_count, 600);
        assert_eq!(fitted.total(), 2400);
    }

    #[test]
    fn test_fit_respects_min_window() {
        let sizes = SearchSizes {
            probe_count: 3000,
            window_len: 1000,
        };
        let fitted = sizes.fit(2048);
        assert_eq!(fitted.window_len, MIN_WINDOW);
        assert_eq!(fitted.probe_count, 1024);
    }

    #[test]
    fn test_backward_limit() {
        assert!(check_backward_limit(-1, 1).is_ok());
        assert!(check_backward_limit(-2, 1).is_err());
        assert!(check_backward_limit(0, 0).is_ok());
        assert!(check_backward_limit(-1, 0).is_err());
        assert!(check_backward_limit(5000, 1).is_ok());
    }

    #[test]
    fn test_negative_backward_limit_is_unlimited() {
        assert!(check_backward_limit(-1000, -1).is_ok());
        assert!(check_backward_limit(-5, -7).is_ok());
        assert!(check_backward_limit(i64::MIN, -1).is_ok());
    }

    #[test]
    fn test_bias_from_leading_zeros() {
        let body = source(5000);
        let reference = mono(500, &body);
        let test = mono(800, &body);

        let report = align(&reference, &test, sizes(), &TrimConfig::default()).unwrap();

        assert_eq!(report.reference_trim.zeros, 500);
        assert_eq!(report.test_trim.zeros, 800);
        assert_eq!(report.alignment.initial_offset(), 300);
        assert_eq!(report.alignment.best().offset, 300);
        assert_eq!(report.alignment.best().lag, 0);
    }

    #[test]
    fn test_backward_lag_within_bias() {
        let body = source(5000);
        let reference = mono(500, &body);
        let test = mono(800, &body[40..]);

        let report = align(&reference, &test, sizes(), &TrimConfig::default()).unwrap();

        let best = report.alignment.best();
        assert_eq!(best.direction, Direction::Backward);
        assert_eq!(best.lag, 40);
        assert_eq!(best.offset, 260);
    }

    #[test]
    fn test_rejects_short_signal() {
        let reference = mono(0, &source(5000));
        let test = mono(4000, &source(1500));
        assert!(align(&reference, &test, sizes(), &TrimConfig::default()).is_err());
    }

    #[test]
    fn test_rejects_channel_mismatch() {
        let reference = mono(0, &source(5000));
        let mut test = mono(0, &source(5000));
        test.channels = 2;
        assert!(align(&reference, &test, sizes(), &TrimConfig::default()).is_err());
    }
}
