//! Corrected output file
//!
//! Applies an alignment offset to the test signal and writes the result as
//! WAV: a positive offset drops leading frames, a negative one prepends
//! silence.

use crate::loader::{LoadedSignal, SampleFormat};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors that can occur while writing the corrected file
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("can't remove {offset} frames, signal holds {frames}")]
    TooShort { offset: i64, frames: usize },
}

/// Sample format of the written file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Same encoding as the reference
    SameAsReference,
    /// Same encoding as the test
    #[default]
    SameAsTest,
    /// Integer PCM, 16, 24 or 32 bits
    Int(u16),
    /// 32-bit float
    Float,
}

impl OutputFormat {
    /// Concrete sample format for the given inputs
    pub fn resolve(self, reference: SampleFormat, test: SampleFormat) -> SampleFormat {
        match self {
            OutputFormat::SameAsReference => reference,
            OutputFormat::SameAsTest => test,
            OutputFormat::Int(bits) => SampleFormat::Int(bits),
            OutputFormat::Float => SampleFormat::Float,
        }
    }
}

fn wav_spec(signal: &LoadedSignal, format: SampleFormat) -> hound::WavSpec {
    let (bits_per_sample, sample_format) = match format {
        SampleFormat::Float => (32, hound::SampleFormat::Float),
        SampleFormat::Int(bits) => {
            let bits = match bits {
                0..=16 => 16,
                17..=24 => 24,
                _ => 32,
            };
            (bits, hound::SampleFormat::Int)
        }
    };
    hound::WavSpec {
        channels: signal.channels,
        sample_rate: signal.sample_rate,
        bits_per_sample,
        sample_format,
    }
}

/// Write `test` shifted by `offset` frames to `path`
pub fn write_aligned(
    path: &Path,
    test: &LoadedSignal,
    offset: i64,
    format: SampleFormat,
) -> Result<(), WriteError> {
    let channels = test.channels.max(1) as usize;
    let frames = test.frames();

    let (silence, body) = if offset >= 0 {
        let skip = offset as usize;
        if skip > frames {
            return Err(WriteError::TooShort { offset, frames });
        }
        (0, &test.samples[skip * channels..])
    } else {
        (offset.unsigned_abs() as usize * channels, &test.samples[..])
    };

    let spec = wav_spec(test, format);
    let mut writer = hound::WavWriter::create(path, spec)?;
    let samples = std::iter::repeat(0.0).take(silence).chain(body.iter().copied());

    match spec.sample_format {
        hound::SampleFormat::Float => {
            for sample in samples {
                writer.write_sample(sample as f32)?;
            }
        }
        hound::SampleFormat::Int => {
            let max_val = (1u64 << (spec.bits_per_sample - 1)) as f64;
            for sample in samples {
                // +1.0 maps one code past the positive range
                let scaled = (sample.clamp(-1.0, 1.0) * max_val).min(max_val - 1.0);
                writer.write_sample(scaled as i32)?;
            }
        }
    }
    writer.finalize()?;

    info!(
        path = %path.display(),
        offset,
        bits = spec.bits_per_sample,
        "wrote aligned signal"
    );
    Ok(())
}
