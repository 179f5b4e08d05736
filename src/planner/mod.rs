//! Frame sampling plan
//!
//! Derives the decoder sampling rate and the nominal frame spacing from the
//! source duration and a target frame count.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Default number of frames to sample from a video
pub const DEFAULT_FRAME_COUNT: u32 = 100;

/// Sampling cadence for one extraction run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingPlan {
    /// Source duration in seconds
    pub duration: f64,
    /// Target frame count; the decoder may emit one more or one fewer
    pub target_count: u32,
    /// Frames per second passed to the decoder (`target_count / duration`)
    pub fps: f64,
    /// Seconds between nominal frame offsets (`duration / target_count`)
    pub interval: f64,
}

impl SamplingPlan {
    /// Validate inputs and compute the cadence
    pub fn new(duration: f64, target_count: u32) -> PipelineResult<Self> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(PipelineError::validation(format!(
                "Video duration must be positive, got {}",
                duration
            )));
        }
        if target_count == 0 {
            return Err(PipelineError::validation(
                "Target frame count must be positive",
            ));
        }

        let n = target_count as f64;
        Ok(Self {
            duration,
            target_count,
            fps: n / duration,
            interval: duration / n,
        })
    }

    /// Nominal offset of the `index`-th emitted frame
    pub fn offset_of(&self, index: usize) -> f64 {
        index as f64 * self.interval
    }

    /// Decoder filter expression selecting this sampling rate
    pub fn fps_filter(&self) -> String {
        format!("fps={}", self.fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_math() {
        let plan = SamplingPlan::new(120.0, 4).unwrap();
        assert!((plan.fps - 1.0 / 30.0).abs() < 1e-12);
        assert_eq!(plan.interval, 30.0);
        let offsets: Vec<f64> = (0..4).map(|i| plan.offset_of(i)).collect();
        assert_eq!(offsets, vec![0.0, 30.0, 60.0, 90.0]);
    }

    #[test]
    fn test_offsets_follow_emitted_count() {
        let plan = SamplingPlan::new(10.0, 4).unwrap();
        // Decoder rounding may hand back one extra frame
        let offsets: Vec<f64> = (0..5).map(|i| plan.offset_of(i)).collect();
        assert_eq!(offsets.len(), 5);
        assert!(offsets.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(offsets[4], 10.0);
    }

    #[test]
    fn test_rejects_bad_duration() {
        assert!(matches!(
            SamplingPlan::new(0.0, 10),
            Err(PipelineError::Validation { .. })
        ));
        assert!(SamplingPlan::new(-1.0, 10).is_err());
        assert!(SamplingPlan::new(f64::NAN, 10).is_err());
    }

    #[test]
    fn test_rejects_zero_count() {
        assert!(matches!(
            SamplingPlan::new(60.0, 0),
            Err(PipelineError::Validation { .. })
        ));
    }

    #[test]
    fn test_fps_filter() {
        let plan = SamplingPlan::new(50.0, 100).unwrap();
        assert_eq!(plan.fps_filter(), "fps=2");
    }
}
