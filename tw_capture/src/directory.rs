//! ABOUTME: Frame source reading numbered still images from a directory
//! ABOUTME: Replays recorded footage through the loop without a camera

use crate::FrameSource;
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tw_core::{Error, Result};

const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Reads `png`/`jpg` frames in file-name order, decoding one per read
#[derive(Debug)]
pub struct DirectorySource {
    dir: PathBuf,
    frames: Vec<PathBuf>,
    next: usize,
    looping: bool,
    closed: bool,
}

impl DirectorySource {
    /// Index the frames in `dir`; with `looping` the sequence restarts at the end
    pub fn open<P: AsRef<Path>>(dir: P, looping: bool) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(Error::Config(format!(
                "Frame directory does not exist: {}",
                dir.display()
            )));
        }

        let mut frames = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && has_frame_extension(&path) {
                frames.push(path);
            }
        }
        frames.sort();

        if frames.is_empty() {
            return Err(Error::Config(format!(
                "No png or jpg frames found in {}",
                dir.display()
            )));
        }

        info!(dir = %dir.display(), frames = frames.len(), looping, "Frame directory opened");

        Ok(Self {
            dir,
            frames,
            next: 0,
            looping,
            closed: false,
        })
    }

    /// Number of frames found
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

fn has_frame_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for DirectorySource {
    fn read(&mut self) -> Result<Option<RgbImage>> {
        if self.closed {
            return Ok(None);
        }
        if self.next >= self.frames.len() {
            if !self.looping {
                return Ok(None);
            }
            debug!(dir = %self.dir.display(), "Restarting frame sequence");
            self.next = 0;
        }

        let path = &self.frames[self.next];
        self.next += 1;

        let frame = image::open(path)
            .map_err(|e| Error::Acquisition(format!("Failed to decode {}: {}", path.display(), e)))?
            .to_rgb8();
        Ok(Some(frame))
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("directory {}", self.dir.display())
    }
}
