//! Frame quality scoring
//!
//! Scores a greyscale image by focus and exposure:
//!
//! - brightness: mean intensity normalised to `[0, 1]`
//! - sharpness: root mean square of the 4-neighbour Laplacian over interior
//!   pixels (border rows and columns are skipped so nothing wraps)
//! - score: `sharpness / 255 × (1 − 2·|brightness − 0.5|)`
//!
//! Sums are accumulated in integers, so identical pixels always produce
//! bit-identical results.

use std::path::Path;

use image::GrayImage;

use crate::domain::model::{Frame, QualityScore};
use crate::error::{PipelineError, PipelineResult};

/// Mid-grey brightness that receives no exposure penalty
const IDEAL_BRIGHTNESS: f64 = 0.5;

/// Score a row-major 8-bit greyscale buffer of the given width
pub fn score_pixels(pixels: &[u8], width: usize) -> PipelineResult<QualityScore> {
    if width == 0 || pixels.is_empty() {
        return Err(PipelineError::validation("Cannot score an empty image"));
    }
    if pixels.len() % width != 0 {
        return Err(PipelineError::validation(format!(
            "Pixel buffer of {} bytes is not a multiple of width {}",
            pixels.len(),
            width
        )));
    }

    let brightness = mean_intensity(pixels);
    let sharpness = rms_laplacian(pixels, width);
    let exposure = 1.0 - 2.0 * (brightness - IDEAL_BRIGHTNESS).abs();

    Ok(QualityScore {
        sharpness,
        brightness,
        score: (sharpness / 255.0) * exposure,
    })
}

/// Score an already decoded image
pub fn score_image(image: &GrayImage) -> PipelineResult<QualityScore> {
    score_pixels(image.as_raw(), image.width() as usize)
}

fn mean_intensity(pixels: &[u8]) -> f64 {
    let sum: u64 = pixels.iter().map(|&p| p as u64).sum();
    sum as f64 / (pixels.len() as f64 * 255.0)
}

fn rms_laplacian(pixels: &[u8], width: usize) -> f64 {
    let height = pixels.len() / width;
    if width < 3 || height < 3 {
        return 0.0;
    }

    let mut sum_sq: u64 = 0;
    let mut count: u64 = 0;

    for y in 1..height - 1 {
        let row = y * width;
        for x in 1..width - 1 {
            let i = row + x;
            let p = |idx: usize| pixels[idx] as i64;
            let laplacian = -4 * p(i) + p(i - 1) + p(i + 1) + p(i - width) + p(i + width);
            sum_sq += (laplacian * laplacian) as u64;
            count += 1;
        }
    }

    (sum_sq as f64 / count as f64).sqrt()
}

/// Source of quality scores for frames on storage
pub trait FrameScorer: Send + Sync {
    fn score_frame(&self, frame: &Frame) -> PipelineResult<QualityScore>;
}

/// Decodes frame files and scores their luma channel
#[derive(Debug, Clone, Default)]
pub struct ImageFileScorer;

impl ImageFileScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score_file(&self, path: &Path) -> PipelineResult<QualityScore> {
        let image = image::open(path)?.to_luma8();
        score_image(&image)
    }
}

impl FrameScorer for ImageFileScorer {
    fn score_frame(&self, frame: &Frame) -> PipelineResult<QualityScore> {
        self.score_file(&frame.path)
    }
}
