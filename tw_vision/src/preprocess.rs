//! ABOUTME: Converts raw color frames into smoothed grayscale frames
//! ABOUTME: Aspect-preserving resize to a fixed width, luma conversion, Gaussian blur

use image::{imageops, GrayImage, RgbImage};
use tracing::debug;
use tw_core::{Error, Result};

/// Sigma used for a Gaussian kernel of size `kernel_size` when no sigma is given
///
/// Follows the usual computer-vision convention
/// `0.3 * ((k - 1) * 0.5 - 1) + 0.8`.
pub fn kernel_sigma(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalizes raw frames for differencing
#[derive(Debug, Clone)]
pub struct FramePreprocessor {
    target_width: u32,
    sigma: Option<f32>,
}

impl FramePreprocessor {
    /// Create a preprocessor producing frames `target_width` pixels wide
    pub fn new(target_width: u32, kernel_size: u32) -> Result<Self> {
        if target_width == 0 {
            return Err(Error::Validation(
                "target frame width must be positive".to_string(),
            ));
        }
        if kernel_size == 0 || kernel_size % 2 == 0 {
            return Err(Error::Validation(format!(
                "blur kernel size must be odd and positive, got {}",
                kernel_size
            )));
        }

        let sigma = (kernel_size > 1).then(|| kernel_sigma(kernel_size));
        debug!(target_width, kernel_size, ?sigma, "Frame preprocessor configured");

        Ok(Self {
            target_width,
            sigma,
        })
    }

    /// Height a `width` x `height` frame has after resizing
    pub fn target_height(&self, width: u32, height: u32) -> u32 {
        let scaled = (height as u64 * self.target_width as u64 + width as u64 / 2) / width as u64;
        scaled.max(1) as u32
    }

    /// Resize, convert to grayscale, and smooth a color frame
    ///
    /// An empty frame is an acquisition failure.
    pub fn process(&self, frame: &RgbImage) -> Result<GrayImage> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::Acquisition(format!(
                "received an empty {}x{} frame",
                width, height
            )));
        }

        let gray = if width == self.target_width {
            imageops::grayscale(frame)
        } else {
            let target_height = self.target_height(width, height);
            let resized = imageops::resize(
                frame,
                self.target_width,
                target_height,
                imageops::FilterType::Triangle,
            );
            imageops::grayscale(&resized)
        };

        Ok(match self.sigma {
            Some(sigma) => imageops::blur(&gray, sigma),
            None => gray,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use test_support::{color_frame, color_frame_with_block};

    #[test]
    fn test_kernel_sigma_matches_convention() {
        assert!((kernel_sigma(5) - 1.1).abs() < 1e-6);
        assert!((kernel_sigma(21) - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_even_kernel_and_zero_width() {
        assert!(FramePreprocessor::new(500, 4).is_err());
        assert!(FramePreprocessor::new(500, 0).is_err());
        assert!(FramePreprocessor::new(0, 5).is_err());
        assert!(FramePreprocessor::new(500, 1).is_ok());
    }

    #[test]
    fn test_aspect_preserving_resize() {
        let pre = FramePreprocessor::new(500, 5).unwrap();
        let out = pre.process(&color_frame(640, 480, 100)).unwrap();
        assert_eq!(out.dimensions(), (500, 375));

        // Upscaling also lands on the target width
        let out = pre.process(&color_frame(250, 100, 100)).unwrap();
        assert_eq!(out.dimensions(), (500, 200));
    }

    #[test]
    fn test_empty_frame_is_acquisition_failure() {
        let pre = FramePreprocessor::new(500, 5).unwrap();
        let result = pre.process(&RgbImage::new(0, 0));
        assert!(matches!(result, Err(Error::Acquisition(_))));
    }

    #[test]
    fn test_grayscale_of_uniform_frame() {
        let pre = FramePreprocessor::new(40, 1).unwrap();
        let frame = RgbImage::from_pixel(40, 30, Rgb([200, 200, 200]));
        let out = pre.process(&frame).unwrap();
        assert!(out.pixels().all(|p| p.0[0] == 200));
    }

    #[test]
    fn test_blur_softens_hard_edges() {
        let frame = color_frame_with_block(40, 40, 0, 0, 20, 40);
        let sharp = FramePreprocessor::new(40, 1).unwrap().process(&frame).unwrap();
        let smooth = FramePreprocessor::new(40, 9).unwrap().process(&frame).unwrap();

        // Right at the edge the sharp frame jumps, the smoothed one ramps
        assert_eq!(sharp.get_pixel(19, 20).0[0], 255);
        assert_eq!(sharp.get_pixel(20, 20).0[0], 64);
        let left = smooth.get_pixel(19, 20).0[0];
        let right = smooth.get_pixel(20, 20).0[0];
        assert!(left < 255 && right > 64);
    }

    #[test]
    fn test_deterministic() {
        let pre = FramePreprocessor::new(64, 5).unwrap();
        let frame = color_frame_with_block(128, 128, 30, 30, 40, 40);
        assert_eq!(pre.process(&frame).unwrap(), pre.process(&frame).unwrap());
    }
}
