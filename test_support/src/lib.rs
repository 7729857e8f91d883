//! ABOUTME: Shared testing utilities and helper functions
//! ABOUTME: Synthetic frames and frame-directory fixtures for all crates

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use std::path::{Path, PathBuf};

/// Background intensity used by the synthetic frames
pub const BACKGROUND: u8 = 64;

/// Uniform dark-gray grayscale frame
pub fn gray_frame(width: u32, height: u32) -> GrayImage {
    ImageBuffer::from_pixel(width, height, Luma([BACKGROUND]))
}

/// Grayscale frame with a bright rectangle drawn on the background
pub fn gray_frame_with_block(
    width: u32,
    height: u32,
    x: u32,
    y: u32,
    block_width: u32,
    block_height: u32,
    intensity: u8,
) -> GrayImage {
    let mut img = gray_frame(width, height);
    for py in y..(y + block_height).min(height) {
        for px in x..(x + block_width).min(width) {
            img.put_pixel(px, py, Luma([intensity]));
        }
    }
    img
}

/// Uniform color frame
pub fn color_frame(width: u32, height: u32, value: u8) -> RgbImage {
    ImageBuffer::from_pixel(width, height, Rgb([value, value, value]))
}

/// Color frame with a white rectangle on a dark background
pub fn color_frame_with_block(
    width: u32,
    height: u32,
    x: u32,
    y: u32,
    block_width: u32,
    block_height: u32,
) -> RgbImage {
    let mut img = color_frame(width, height, BACKGROUND);
    for py in y..(y + block_height).min(height) {
        for px in x..(x + block_width).min(width) {
            img.put_pixel(px, py, Rgb([255, 255, 255]));
        }
    }
    img
}

/// Frames where a block jumps between two positions every frame, so each
/// consecutive pair differs
pub fn moving_block_frames(width: u32, height: u32, count: usize) -> Vec<RgbImage> {
    let block = (width.min(height) / 4).max(1);
    (0..count)
        .map(|i| {
            let x = if i % 2 == 0 { 0 } else { width - block };
            color_frame_with_block(width, height, x, 0, block, block)
        })
        .collect()
}

/// Identical frames with nothing moving
pub fn still_frames(width: u32, height: u32, count: usize) -> Vec<RgbImage> {
    (0..count).map(|_| color_frame(width, height, BACKGROUND)).collect()
}

/// Write frames as numbered PNG files into `dir`
pub fn write_frames(dir: &Path, frames: &[RgbImage]) -> Vec<PathBuf> {
    frames
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            let path = dir.join(format!("frame_{:04}.png", i));
            frame.save(&path).expect("write test frame");
            path
        })
        .collect()
}
