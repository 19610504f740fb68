//! Audio file loading and decoding

use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::SampleFormat as CodecSampleFormat;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during signal loading
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No audio track found in file")]
    NoAudioTrack,
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("different channel count: {reference} vs. {test}")]
    ChannelMismatch { reference: u16, test: u16 },
    #[error("different sample rate: {reference} vs. {test}")]
    SampleRateMismatch { reference: u32, test: u32 },
}

/// Sample encoding of the source stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Integer PCM with the given bits per sample
    Int(u16),
    /// IEEE float
    Float,
}

/// A decoded signal
#[derive(Debug, Clone)]
pub struct LoadedSignal {
    /// Interleaved samples, normalized to -1.0 to 1.0
    pub samples: Vec<f64>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
    /// Encoding of the source stream
    pub format: SampleFormat,
}

impl LoadedSignal {
    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }
}

/// Audio file loader using Symphonia
#[derive(Debug, Default)]
pub struct SignalLoader;

impl SignalLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load and decode an audio file at its native sample rate
    pub fn load(&self, path: &Path) -> Result<LoadedSignal, LoadError> {
        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(LoadError::NoAudioTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params.sample_rate.unwrap_or(44100);
        let channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(2);
        let sample_format = source_format(
            codec_params.sample_format,
            codec_params.bits_per_sample,
        );

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut samples: Vec<f64> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(e) => {
                    end_of_stream(e)?;
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            // A skipped packet would shift every later sample, so it fails the load
            let decoded = decoder
                .decode(&packet)
                .map_err(|e| LoadError::Decode(e.to_string()))?;

            let spec = *decoded.spec();
            let duration = decoded.capacity() as u64;

            let mut sample_buf = SampleBuffer::<f64>::new(duration, spec);
            sample_buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(sample_buf.samples());
        }

        debug!(
            path = %path.display(),
            sample_rate,
            channels,
            frames = samples.len() / channels.max(1) as usize,
            "decoded signal"
        );

        Ok(LoadedSignal {
            samples,
            sample_rate,
            channels,
            format: sample_format,
        })
    }
}

/// End of stream finishes the signal; any other read failure fails the load
fn end_of_stream(err: SymphoniaError) -> Result<(), LoadError> {
    match err {
        SymphoniaError::IoError(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(()),
        e => Err(LoadError::Decode(e.to_string())),
    }
}

fn source_format(format: Option<CodecSampleFormat>, bits: Option<u32>) -> SampleFormat {
    match format {
        Some(CodecSampleFormat::F32) | Some(CodecSampleFormat::F64) => SampleFormat::Float,
        _ => SampleFormat::Int(bits.map(|b| b as u16).unwrap_or(16)),
    }
}

/// Reference and test must share channel layout and sample rate
pub fn check_compatible(reference: &LoadedSignal, test: &LoadedSignal) -> Result<(), LoadError> {
    if reference.channels != test.channels {
        return Err(LoadError::ChannelMismatch {
            reference: reference.channels,
            test: test.channels,
        });
    }
    if reference.sample_rate != test.sample_rate {
        return Err(LoadError::SampleRateMismatch {
            reference: reference.sample_rate,
            test: test.sample_rate,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(name: &str, spec: hound::WavSpec, samples: &[i16]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("wavalign-loader-{}-{}.wav", name, std::process::id()));
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    fn signal(channels: u16, sample_rate: u32) -> LoadedSignal {
        LoadedSignal {
            samples: vec![0.0; 8],
            sample_rate,
            channels,
            format: SampleFormat::Int(16),
        }
    }

    #[test]
    fn test_load_pcm16_stereo() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let raw: Vec<i16> = (0..400).map(|i| ((i % 50) as i16 - 25) * 1000).collect();
        let path = write_wav("pcm16", spec, &raw);

        let loaded = SignalLoader::new().load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.channels, 2);
        assert_eq!(loaded.sample_rate, 8000);
        assert_eq!(loaded.frames(), 200);
        assert_eq!(loaded.format, SampleFormat::Int(16));
        for (&got, &want) in loaded.samples.iter().zip(&raw) {
            assert!((got - want as f64 / 32768.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_missing_file() {
        let result = SignalLoader::new().load(Path::new("/nonexistent/wavalign.wav"));
        assert!(matches!(result, Err(LoadError::Io(_))));
    }

    #[test]
    fn test_only_eof_ends_the_stream() {
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "end of stream");
        assert!(end_of_stream(SymphoniaError::IoError(eof)).is_ok());

        let broken = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad chunk");
        assert!(matches!(
            end_of_stream(SymphoniaError::IoError(broken)),
            Err(LoadError::Decode(_))
        ));
        assert!(matches!(
            end_of_stream(SymphoniaError::DecodeError("invalid block")),
            Err(LoadError::Decode(_))
        ));
        assert!(matches!(
            end_of_stream(SymphoniaError::ResetRequired),
            Err(LoadError::Decode(_))
        ));
    }

    #[test]
    fn test_corrupted_header_fails() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let raw: Vec<i16> = (0..800).map(|i| (i % 100) as i16 * 100).collect();
        let path = write_wav("corrupt", spec, &raw);

        // Overwrite the format chunk so no decoder can be built for the stream
        let mut bytes = std::fs::read(&path).unwrap();
        for b in &mut bytes[12..36] {
            *b = 0xA5;
        }
        std::fs::write(&path, &bytes).unwrap();

        let result = SignalLoader::new().load(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(LoadError::Decode(_))));
    }

    #[test]
    fn test_source_format() {
        assert_eq!(
            source_format(Some(CodecSampleFormat::F32), Some(32)),
            SampleFormat::Float
        );
        assert_eq!(
            source_format(Some(CodecSampleFormat::S24), Some(24)),
            SampleFormat::Int(24)
        );
        assert_eq!(source_format(None, None), SampleFormat::Int(16));
    }

    #[test]
    fn test_check_compatible() {
        assert!(check_compatible(&signal(2, 48000), &signal(2, 48000)).is_ok());
        assert!(matches!(
            check_compatible(&signal(2, 48000), &signal(1, 48000)),
            Err(LoadError::ChannelMismatch {
                reference: 2,
                test: 1
            })
        ));
        assert!(matches!(
            check_compatible(&signal(2, 48000), &signal(2, 44100)),
            Err(LoadError::SampleRateMismatch { .. })
        ));
    }
}
