//! ABOUTME: Frame sources and display sinks used by the capture loop
//! ABOUTME: Provides trait-based acquisition with in-memory, directory, and camera backends

use image::{DynamicImage, RgbImage};
use tracing::debug;
use tw_core::Result;

pub mod directory;
pub mod memory;

#[cfg(feature = "opencv")]
pub mod camera;

pub use directory::DirectorySource;
pub use memory::MemorySource;

#[cfg(feature = "opencv")]
pub use camera::{HighGuiDisplay, HighGuiKeys, OpenCvCamera};

/// Width and height the camera is asked to deliver
pub const CAPTURE_WIDTH: u32 = 600;
pub const CAPTURE_HEIGHT: u32 = 600;

/// Blocking source of color frames, read once per cycle
pub trait FrameSource: Send {
    /// Read the next frame.
    ///
    /// `Ok(None)` means the source is finished, which ends the loop cleanly.
    /// A failed or empty read from a live device is an error.
    fn read(&mut self) -> Result<Option<RgbImage>>;

    /// Release the device; must be safe to call more than once
    fn close(&mut self) -> Result<()>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Output surface for the frame of each cycle
pub trait Display: Send {
    /// Show an image in the named window
    fn show(&mut self, window: &str, frame: &DynamicImage) -> Result<()>;

    /// Tear down every window
    fn close(&mut self) -> Result<()>;
}

/// Display that discards frames, for headless runs
#[derive(Debug, Default)]
pub struct NullDisplay {
    shown: u64,
}

impl NullDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames handed to this display so far
    pub fn shown(&self) -> u64 {
        self.shown
    }
}

impl Display for NullDisplay {
    fn show(&mut self, _window: &str, _frame: &DynamicImage) -> Result<()> {
        self.shown += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        debug!(frames = self.shown, "Headless display closed");
        Ok(())
    }
}
