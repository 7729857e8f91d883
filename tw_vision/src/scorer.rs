//! ABOUTME: Rolling-reference absolute-difference motion scorer
//! ABOUTME: Thresholds per-pixel change into a binary mask and sums it into a score

use crate::{pixel_count, MotionReading, MotionScorer, MAX_INTENSITY};
use image::GrayImage;
use tracing::debug;

/// Compares each frame against the frame before it.
///
/// The reference is replaced after every comparison, so motion that keeps
/// going at a steady pace scores only the leading and trailing edges, and a
/// scene that changes once and then holds still scores zero from the next
/// frame on.
pub struct RollingDiffScorer {
    pixel_diff_threshold: u8,
    reference: Option<GrayImage>,
}

impl RollingDiffScorer {
    /// Create a scorer that counts a pixel as changed when its absolute
    /// difference exceeds `pixel_diff_threshold`
    pub fn new(pixel_diff_threshold: u8) -> Self {
        Self {
            pixel_diff_threshold,
            reference: None,
        }
    }

    /// Whether a reference frame is held
    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    fn compare(&self, current: &GrayImage, reference: &GrayImage) -> MotionReading {
        let (width, height) = current.dimensions();
        let mut mask = GrayImage::new(width, height);
        let mut changed_pixels = 0u64;

        for ((out, cur), prev) in mask
            .pixels_mut()
            .zip(current.pixels())
            .zip(reference.pixels())
        {
            if cur.0[0].abs_diff(prev.0[0]) > self.pixel_diff_threshold {
                out.0[0] = MAX_INTENSITY;
                changed_pixels += 1;
            }
        }

        MotionReading {
            score: changed_pixels * u64::from(MAX_INTENSITY),
            changed_pixels,
            total_pixels: pixel_count(width, height),
            mask,
            seeded: false,
        }
    }
}

impl MotionScorer for RollingDiffScorer {
    fn score(&mut self, frame: GrayImage) -> MotionReading {
        let reading = match &self.reference {
            Some(reference) if reference.dimensions() == frame.dimensions() => {
                self.compare(&frame, reference)
            }
            Some(reference) => {
                debug!(
                    previous = ?reference.dimensions(),
                    current = ?frame.dimensions(),
                    "Frame size changed, reseeding reference"
                );
                MotionReading::seed(frame.width(), frame.height())
            }
            None => {
                debug!("No reference frame yet, seeding from current frame");
                MotionReading::seed(frame.width(), frame.height())
            }
        };

        self.reference = Some(frame);
        reading
    }

    fn reset(&mut self) {
        self.reference = None;
    }

    fn algorithm_name(&self) -> &'static str {
        "RollingDiff"
    }
}
