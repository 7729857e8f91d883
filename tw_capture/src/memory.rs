//! ABOUTME: Frame source replaying frames held in memory
//! ABOUTME: Used for tests and for driving the loop from pre-decoded frames

use crate::FrameSource;
use image::RgbImage;
use std::collections::VecDeque;
use tw_core::Result;

/// Replays a fixed list of frames, then reports exhaustion
#[derive(Debug, Default)]
pub struct MemorySource {
    frames: VecDeque<RgbImage>,
    served: usize,
}

impl MemorySource {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self {
            frames: frames.into(),
            served: 0,
        }
    }

    /// Frames not yet read
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for MemorySource {
    fn read(&mut self) -> Result<Option<RgbImage>> {
        let frame = self.frames.pop_front();
        if frame.is_some() {
            self.served += 1;
        }
        Ok(frame)
    }

    fn close(&mut self) -> Result<()> {
        self.frames.clear();
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory ({} frames served)", self.served)
    }
}
