//! ABOUTME: OpenCV-backed camera, window and keyboard surfaces
//! ABOUTME: Converts between OpenCV BGR matrices and image buffers

use crate::{Display, FrameSource, CAPTURE_HEIGHT, CAPTURE_WIDTH};
use image::{DynamicImage, RgbImage};
use opencv::{
    core::{self, Mat, Scalar},
    highgui, imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use tracing::{debug, info, warn};
use tw_alarm::KeySource;
use tw_core::{Error, Result};

fn acquisition(context: &str) -> impl FnOnce(opencv::Error) -> Error + '_ {
    move |e| Error::Acquisition(format!("{}: {}", context, e))
}

fn display(context: &str) -> impl FnOnce(opencv::Error) -> Error + '_ {
    move |e| Error::Display(format!("{}: {}", context, e))
}

/// Local video device opened through OpenCV
pub struct OpenCvCamera {
    index: i32,
    capture: VideoCapture,
    frame: Mat,
    released: bool,
}

impl OpenCvCamera {
    /// Open camera `index` and request the standard capture resolution
    pub fn open(index: u32) -> Result<Self> {
        let index = index as i32;
        let mut capture =
            VideoCapture::new(index, videoio::CAP_ANY).map_err(acquisition("open camera"))?;

        if !capture.is_opened().map_err(acquisition("open camera"))? {
            return Err(Error::Acquisition(format!(
                "Camera {} could not be opened",
                index
            )));
        }

        let width_set = capture
            .set(videoio::CAP_PROP_FRAME_WIDTH, CAPTURE_WIDTH as f64)
            .map_err(acquisition("set frame width"))?;
        let height_set = capture
            .set(videoio::CAP_PROP_FRAME_HEIGHT, CAPTURE_HEIGHT as f64)
            .map_err(acquisition("set frame height"))?;
        if !(width_set && height_set) {
            warn!(index, "Camera ignored the requested resolution");
        }

        info!(index, "Camera opened");

        Ok(Self {
            index,
            capture,
            frame: Mat::default(),
            released: false,
        })
    }
}

impl FrameSource for OpenCvCamera {
    fn read(&mut self) -> Result<Option<RgbImage>> {
        let grabbed = self
            .capture
            .read(&mut self.frame)
            .map_err(acquisition("read frame"))?;

        if !grabbed || self.frame.rows() <= 0 || self.frame.cols() <= 0 {
            return Err(Error::Acquisition(format!(
                "Camera {} returned an empty frame",
                self.index
            )));
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color_def(&self.frame, &mut rgb, imgproc::COLOR_BGR2RGB)
            .map_err(acquisition("convert frame"))?;

        let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
        let bytes = rgb.data_bytes().map_err(acquisition("copy frame"))?.to_vec();
        let frame = RgbImage::from_raw(width, height, bytes).ok_or_else(|| {
            Error::Acquisition(format!(
                "Camera {} frame buffer does not match {}x{}",
                self.index, width, height
            ))
        })?;

        Ok(Some(frame))
    }

    fn close(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.capture
            .release()
            .map_err(acquisition("release camera"))?;
        debug!(index = self.index, "Camera released");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("camera {}", self.index)
    }
}

/// Windows drawn with OpenCV HighGUI
#[derive(Debug, Default)]
pub struct HighGuiDisplay;

impl HighGuiDisplay {
    pub fn new() -> Self {
        Self
    }
}

fn to_mat(frame: &DynamicImage) -> Result<Mat> {
    let (mat_type, bytes, code) = match frame {
        DynamicImage::ImageLuma8(gray) => (core::CV_8UC1, gray.as_raw().clone(), None),
        other => (
            core::CV_8UC3,
            other.to_rgb8().into_raw(),
            Some(imgproc::COLOR_RGB2BGR),
        ),
    };

    let mut mat = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        mat_type,
        Scalar::all(0.0),
    )
    .map_err(display("allocate frame"))?;
    mat.data_bytes_mut()
        .map_err(display("copy frame"))?
        .copy_from_slice(&bytes);

    match code {
        Some(code) => {
            let mut bgr = Mat::default();
            imgproc::cvt_color_def(&mat, &mut bgr, code).map_err(display("convert frame"))?;
            Ok(bgr)
        }
        None => Ok(mat),
    }
}

impl Display for HighGuiDisplay {
    fn show(&mut self, window: &str, frame: &DynamicImage) -> Result<()> {
        let mat = to_mat(frame)?;
        highgui::imshow(window, &mat).map_err(display("show frame"))
    }

    fn close(&mut self) -> Result<()> {
        highgui::destroy_all_windows().map_err(display("close windows"))
    }
}

/// Key presses read from the HighGUI event loop
#[derive(Debug, Default)]
pub struct HighGuiKeys;

impl HighGuiKeys {
    pub fn new() -> Self {
        Self
    }
}

impl KeySource for HighGuiKeys {
    fn poll_key(&mut self) -> Result<Option<i32>> {
        let key = highgui::wait_key(1).map_err(display("poll keyboard"))?;
        if key < 0 {
            Ok(None)
        } else {
            Ok(Some(key & 0xFF))
        }
    }
}
