//! Representative frame selection
//!
//! Two modes:
//! - temporal: best-scoring frame within `[target - window, target + window]`,
//!   falling back to the frame nearest in time when the window is empty
//! - fixed-count: split the sequence into `k` contiguous groups of near-equal
//!   size and take the best-scoring frame of each group
//!
//! Scoring runs on a dedicated rayon pool; picking the winner is sequential so
//! ties always go to the earliest offset.

use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

use crate::domain::model::{Frame, QualityScore, ScoredFrame};
use crate::error::{PipelineError, PipelineResult};
use crate::quality::FrameScorer;

/// Default tolerance window around a target timestamp, in seconds
pub const DEFAULT_WINDOW_SECS: f64 = 120.0;

/// Why a frame was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    /// Highest score among the candidates
    BestScore,
    /// No candidate could be scored; nearest frame in time
    NearestFallback,
    /// No frame in the group could be scored; first frame of the group
    Unscored,
}

/// Outcome of one selection
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub frame: Frame,
    pub quality: Option<QualityScore>,
    pub reason: SelectionReason,
}

impl From<ScoredFrame> for Selection {
    fn from(scored: ScoredFrame) -> Self {
        Self {
            frame: scored.frame,
            quality: Some(scored.quality),
            reason: SelectionReason::BestScore,
        }
    }
}

/// Picks frames by quality and time
pub struct FrameSelector {
    scorer: Arc<dyn FrameScorer>,
    pool: ThreadPool,
}

impl FrameSelector {
    pub fn new(scorer: Arc<dyn FrameScorer>, threads: usize) -> PipelineResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("frame-scorer-{}", i))
            .build()
            .map_err(|e| PipelineError::config(format!("Failed to build scoring pool: {}", e)))?;
        Ok(Self { scorer, pool })
    }

    /// Choose one frame for `target` seconds
    pub fn select_near(
        &self,
        frames: &[Frame],
        target: f64,
        window: f64,
    ) -> PipelineResult<Selection> {
        if frames.is_empty() {
            return Err(PipelineError::precondition(
                "Cannot select from an empty frame sequence",
            ));
        }
        if !target.is_finite() {
            return Err(PipelineError::validation(format!(
                "Target timestamp must be finite, got {}",
                target
            )));
        }
        if !window.is_finite() || window < 0.0 {
            return Err(PipelineError::validation(format!(
                "Tolerance window must be non-negative, got {}",
                window
            )));
        }

        let low = target - window;
        let high = target + window;
        let candidates: Vec<&Frame> = frames
            .iter()
            .filter(|f| f.offset >= low && f.offset <= high)
            .collect();

        debug!(
            "Target {:.2}s window ±{:.0}s: {} candidate frame(s)",
            target,
            window,
            candidates.len()
        );

        if let Some(best) = best_scored(self.score_all(&candidates)) {
            return Ok(best.into());
        }

        let nearest = nearest_frame(frames, target)?;
        Ok(Selection {
            frame: nearest.clone(),
            quality: None,
            reason: SelectionReason::NearestFallback,
        })
    }

    /// Split `frames` into `k` contiguous non-empty groups and pick the best
    /// of each.
    ///
    /// Group `i` spans `[i * len / k, (i + 1) * len / k)`. With fewer than `k`
    /// frames every frame is its own group, so `len` selections are returned.
    pub fn select_evenly(&self, frames: &[Frame], k: usize) -> PipelineResult<Vec<Selection>> {
        if frames.is_empty() {
            return Err(PipelineError::precondition(
                "Cannot select from an empty frame sequence",
            ));
        }
        if k == 0 {
            return Err(PipelineError::validation("Selection count must be positive"));
        }

        let all: Vec<&Frame> = frames.iter().collect();
        let scores = self.score_all(&all);

        let selections = group_bounds(frames.len(), k)
            .into_iter()
            .map(|(start, end)| match best_scored(scores[start..end].to_vec()) {
                Some(best) => best.into(),
                None => Selection {
                    frame: frames[start].clone(),
                    quality: None,
                    reason: SelectionReason::Unscored,
                },
            })
            .collect();

        Ok(selections)
    }

    /// Score frames in parallel; results keep the input order
    fn score_all(&self, frames: &[&Frame]) -> Vec<Option<ScoredFrame>> {
        let scorer = &self.scorer;
        self.pool.install(|| {
            frames
                .par_iter()
                .map(|frame| match scorer.score_frame(frame) {
                    Ok(quality) => Some(ScoredFrame {
                        frame: (*frame).clone(),
                        quality,
                    }),
                    Err(e) => {
                        warn!("Skipping unscorable frame {}: {}", frame.path.display(), e);
                        None
                    }
                })
                .collect()
        })
    }
}

/// Half-open index ranges of `min(len, k)` contiguous groups covering `len` items
fn group_bounds(len: usize, k: usize) -> Vec<(usize, usize)> {
    let groups = k.min(len);
    if groups == 0 {
        return Vec::new();
    }
    (0..groups)
        .map(|i| (i * len / groups, (i + 1) * len / groups))
        .collect()
}

/// Highest score, ties to the earliest offset
fn best_scored(scored: Vec<Option<ScoredFrame>>) -> Option<ScoredFrame> {
    let mut best: Option<ScoredFrame> = None;
    for candidate in scored.into_iter().flatten() {
        let replace = match &best {
            None => true,
            Some(current) => {
                candidate.quality.score > current.quality.score
                    || (candidate.quality.score == current.quality.score
                        && candidate.frame.offset < current.frame.offset)
            }
        };
        if replace {
            best = Some(candidate);
        }
    }
    best
}

/// Frame whose offset is closest to `target`, ties to the earliest offset
pub fn nearest_frame(frames: &[Frame], target: f64) -> PipelineResult<&Frame> {
    let mut best: Option<&Frame> = None;
    for frame in frames {
        let replace = match best {
            None => true,
            Some(current) => {
                let d = (frame.offset - target).abs();
                let current_d = (current.offset - target).abs();
                d < current_d || (d == current_d && frame.offset < current.offset)
            }
        };
        if replace {
            best = Some(frame);
        }
    }
    best.ok_or_else(|| PipelineError::precondition("Cannot select from an empty frame sequence"))
}
