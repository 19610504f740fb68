//! Alignment core for wavalign
//!
//! Finds the sample offset that best aligns a test signal to a reference by
//! minimum sum of squared differences: FFT cross-correlation, incremental
//! SSD scoring, and top-K offset ranking over both shift directions.

mod correlator;
mod params;
mod ranker;
mod scorer;

pub use correlator::{correlate, CorrelationPair, CrossCorrelator};
pub use params::{AlignError, AlignParams, NUM_BEST};
pub use ranker::{best_offsets, rank_candidates, Alignment, Direction, OffsetCandidate};
pub use scorer::{score_differences, DifferencePair};
