//! Signal I/O for wavalign - decoding, silence trimming, corrected output, and config

mod config;
mod loader;
mod trim;
mod writer;

pub use config::Config;
pub use loader::{check_compatible, LoadError, LoadedSignal, SampleFormat, SignalLoader};
pub use trim::{trim_leading, TrimConfig, TrimReport};
pub use writer::{write_aligned, OutputFormat, WriteError};
