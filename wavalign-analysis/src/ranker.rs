//! Top-K offset selection across both shift directions

use crate::params::{AlignError, AlignParams, NUM_BEST};
use crate::scorer::{score_differences, DifferencePair};
use std::cmp::Ordering;
use tracing::debug;

/// Which signal is shifted to reach a candidate lag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Test delayed relative to reference: drop leading test samples
    Forward,
    /// Test advanced relative to reference: prepend silence to the test
    Backward,
}

/// A scored lag before the initial offset is applied
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    score: f64,
    direction: Direction,
    lag: usize,
}

impl Candidate {
    fn signed_lag(&self) -> i64 {
        match self.direction {
            Direction::Forward => self.lag as i64,
            Direction::Backward => -(self.lag as i64),
        }
    }

    /// Ascending score, then ascending signed lag
    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.signed_lag().cmp(&other.signed_lag()))
    }
}

/// One ranked offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetCandidate {
    /// Sum of squared differences at this offset
    pub score: f32,
    /// Signed lag plus the initial offset, in frames
    pub offset: i64,
    /// Shift direction of the underlying lag
    pub direction: Direction,
    /// Unsigned lag in frames, before the initial offset
    pub lag: usize,
}

/// The best candidates of one alignment run, best first
///
/// Only [`rank_candidates`] builds one, so it always holds [`NUM_BEST`] entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    candidates: Vec<OffsetCandidate>,
    initial_offset: i64,
}

impl Alignment {
    /// Lowest-SSD candidate
    pub fn best(&self) -> &OffsetCandidate {
        &self.candidates[0]
    }

    /// All ranked candidates, best first
    pub fn candidates(&self) -> &[OffsetCandidate] {
        &self.candidates
    }

    /// Bias added to every signed lag
    pub fn initial_offset(&self) -> i64 {
        self.initial_offset
    }

    /// Final offsets, best first
    pub fn offsets(&self) -> Vec<i64> {
        self.candidates.iter().map(|c| c.offset).collect()
    }
}

/// Rank precomputed SSD arrays
///
/// `scores.forward` holds the test-shifted direction and becomes the
/// non-negative lags; `scores.reverse` holds the reference-shifted direction
/// and contributes lags `-1..=-initial_offset` only. Lag zero is represented
/// once, by the forward direction. Equal scores are ordered by ascending
/// signed lag so results are reproducible.
pub fn rank_candidates(scores: &DifferencePair, initial_offset: i64) -> Result<Alignment, AlignError> {
    let probe_count = scores.forward.len();
    if probe_count < NUM_BEST {
        return Err(AlignError::InsufficientProbes {
            probe_count,
            required: NUM_BEST,
        });
    }

    let backward_limit = usize::try_from(initial_offset.max(0))
        .unwrap_or(usize::MAX)
        .min(scores.reverse.len().saturating_sub(1));

    let forward = scores
        .forward
        .iter()
        .enumerate()
        .map(|(lag, &score)| Candidate {
            score,
            direction: Direction::Forward,
            lag,
        });
    let backward = scores
        .reverse
        .iter()
        .enumerate()
        .skip(1)
        .take(backward_limit)
        .map(|(lag, &score)| Candidate {
            score,
            direction: Direction::Backward,
            lag,
        });

    let mut candidates: Vec<Candidate> = forward.chain(backward).collect();
    debug!(
        total = candidates.len(),
        backward = backward_limit,
        initial_offset,
        "ranking candidates"
    );

    candidates.select_nth_unstable_by(NUM_BEST - 1, Candidate::rank_cmp);
    candidates.truncate(NUM_BEST);
    candidates.sort_by(Candidate::rank_cmp);

    let candidates = candidates
        .into_iter()
        .map(|c| {
            let lag = c.signed_lag();
            let offset = lag
                .checked_add(initial_offset)
                .ok_or(AlignError::OffsetOverflow {
                    lag,
                    initial_offset,
                })?;
            Ok(OffsetCandidate {
                score: c.score as f32,
                offset,
                direction: c.direction,
                lag: c.lag,
            })
        })
        .collect::<Result<Vec<_>, AlignError>>()?;

    Ok(Alignment {
        candidates,
        initial_offset,
    })
}

/// Find the offsets that best align `test` to `reference`
///
/// A positive offset means the test lags the reference and its leading
/// samples should be dropped; a negative offset means silence should be
/// prepended to the test.
pub fn best_offsets(
    reference: &[f64],
    test: &[f64],
    params: &AlignParams,
    initial_offset: i64,
) -> Result<Alignment, AlignError> {
    params.validate(reference, test)?;
    if params.probe_count < NUM_BEST {
        return Err(AlignError::InsufficientProbes {
            probe_count: params.probe_count,
            required: NUM_BEST,
        });
    }

    // Probe the test first so `forward` is the test-shifted direction
    let scores = score_differences(test, reference, params)?;
    rank_candidates(&scores, initial_offset)
}
