//! ABOUTME: Frame preprocessing and rolling-reference motion scoring
//! ABOUTME: Turns color frames into smoothed grayscale and scores frame-to-frame change

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::trace;
use tw_core::Result;

pub mod preprocess;
pub mod scorer;

pub use preprocess::{kernel_sigma, FramePreprocessor};
pub use scorer::RollingDiffScorer;

// Re-export image types for downstream crates
pub use image;

/// Intensity written into the mask for a changed pixel
pub const MAX_INTENSITY: u8 = 255;

/// Settings for preprocessing and scoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Width frames are resized to before scoring
    pub frame_width: u32,
    /// Odd Gaussian kernel size; 1 disables smoothing
    pub blur_kernel_size: u32,
    /// Per-pixel difference above which a pixel counts as changed
    pub pixel_diff_threshold: u8,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            frame_width: 500,
            blur_kernel_size: 5,
            pixel_diff_threshold: 25,
        }
    }
}

/// Pixels in a `width` x `height` frame, without u32 overflow
pub fn pixel_count(width: u32, height: u32) -> u64 {
    u64::from(width) * u64::from(height)
}

/// Outcome of scoring one frame against the rolling reference
#[derive(Debug, Clone)]
pub struct MotionReading {
    /// Sum of mask intensities
    pub score: u64,
    /// Number of pixels set in the mask
    pub changed_pixels: u64,
    /// Pixels compared
    pub total_pixels: u64,
    /// Binary difference mask, for display only
    pub mask: GrayImage,
    /// True when this frame only seeded the reference and was not compared
    pub seeded: bool,
}

impl MotionReading {
    /// Reading for a frame that had nothing to be compared against
    pub fn seed(width: u32, height: u32) -> Self {
        Self {
            score: 0,
            changed_pixels: 0,
            total_pixels: pixel_count(width, height),
            mask: GrayImage::new(width, height),
            seeded: true,
        }
    }
}

/// Trait for per-cycle motion scorers
pub trait MotionScorer: Send {
    /// Score a preprocessed frame; the frame becomes the new reference
    fn score(&mut self, frame: GrayImage) -> MotionReading;

    /// Drop the reference so the next frame seeds a fresh one
    fn reset(&mut self);

    /// Get algorithm name
    fn algorithm_name(&self) -> &'static str;
}

/// Preprocessor and scorer combined into the per-cycle motion stage
pub struct MotionAnalyzer {
    preprocessor: FramePreprocessor,
    scorer: Box<dyn MotionScorer>,
}

impl MotionAnalyzer {
    /// Build the standard analyzer: resize + grayscale + blur, then rolling diff
    pub fn new(config: &VisionConfig) -> Result<Self> {
        let preprocessor = FramePreprocessor::new(config.frame_width, config.blur_kernel_size)?;
        let scorer = Box::new(RollingDiffScorer::new(config.pixel_diff_threshold));
        Ok(Self::with_scorer(preprocessor, scorer))
    }

    /// Build an analyzer around a custom scorer
    pub fn with_scorer(preprocessor: FramePreprocessor, scorer: Box<dyn MotionScorer>) -> Self {
        Self {
            preprocessor,
            scorer,
        }
    }

    /// Preprocess a raw color frame and score it
    pub fn analyze(&mut self, frame: &RgbImage) -> Result<MotionReading> {
        let start = Instant::now();
        let gray = self.preprocessor.process(frame)?;
        let reading = self.scorer.score(gray);

        trace!(
            algorithm = self.scorer.algorithm_name(),
            score = reading.score,
            changed_pixels = reading.changed_pixels,
            seeded = reading.seeded,
            elapsed_us = start.elapsed().as_micros() as u64,
            "Frame analyzed"
        );

        Ok(reading)
    }

    /// Forget the rolling reference
    pub fn reset(&mut self) {
        self.scorer.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::{color_frame, color_frame_with_block};

    #[test]
    fn test_vision_config_default() {
        let config = VisionConfig::default();
        assert_eq!(config.frame_width, 500);
        assert_eq!(config.blur_kernel_size, 5);
        assert_eq!(config.pixel_diff_threshold, 25);
    }

    #[test]
    fn test_vision_config_serialization() {
        let config = VisionConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: VisionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_first_frame_seeds_even_when_maximally_different() {
        let config = VisionConfig {
            frame_width: 64,
            ..Default::default()
        };
        let mut analyzer = MotionAnalyzer::new(&config).unwrap();

        let first = analyzer.analyze(&color_frame(128, 96, 255)).unwrap();
        assert!(first.seeded);
        assert_eq!(first.score, 0);
        assert_eq!(first.mask.dimensions(), (64, 48));

        let second = analyzer.analyze(&color_frame(128, 96, 0)).unwrap();
        assert!(!second.seeded);
        assert_eq!(second.changed_pixels, 64 * 48);
        assert_eq!(second.score, 64 * 48 * MAX_INTENSITY as u64);
    }

    #[test]
    fn test_reset_reseeds() {
        let config = VisionConfig {
            frame_width: 32,
            ..Default::default()
        };
        let mut analyzer = MotionAnalyzer::new(&config).unwrap();

        analyzer.analyze(&color_frame(32, 32, 10)).unwrap();
        analyzer.reset();
        let reading = analyzer
            .analyze(&color_frame_with_block(32, 32, 0, 0, 16, 16))
            .unwrap();
        assert!(reading.seeded);
        assert_eq!(reading.score, 0);
    }

    #[test]
    fn test_seed_reading_counts_pixels() {
        let reading = MotionReading::seed(10, 10);
        assert_eq!(reading.changed_pixels, 0);
        assert_eq!(reading.total_pixels, 100);
    }

    #[test]
    fn test_pixel_count_exceeds_u32() {
        assert_eq!(pixel_count(70_000, 70_000), 4_900_000_000);
        assert_eq!(
            pixel_count(u32::MAX, u32::MAX),
            u64::from(u32::MAX) * u64::from(u32::MAX)
        );
    }
}
