//! ABOUTME: Picks the frame source, display and key input for this build
//! ABOUTME: Camera and window support exist only with the opencv feature

use crate::cli::Cli;
use tw_alarm::{CommandSource, KeyBindings};
use tw_capture::{DirectorySource, Display, FrameSource, NullDisplay};
use tw_config::Config;
use tw_core::Result;

/// Everything the capture loop reads from or draws to
pub struct Surfaces {
    pub source: Box<dyn FrameSource>,
    pub display: Box<dyn Display>,
    /// Keys pressed in the display window, when there is one
    pub keys: Option<Box<dyn CommandSource>>,
}

pub fn open(cli: &Cli, config: &Config, bindings: KeyBindings) -> Result<Surfaces> {
    let source: Box<dyn FrameSource> = match &cli.frames {
        Some(dir) => Box::new(DirectorySource::open(dir, cli.loop_frames)?),
        None => camera(config)?,
    };
    let (display, keys) = window(config, bindings);

    Ok(Surfaces {
        source,
        display,
        keys,
    })
}

#[cfg(feature = "opencv")]
fn camera(config: &Config) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(tw_capture::OpenCvCamera::open(config.camera.index)?))
}

#[cfg(not(feature = "opencv"))]
fn camera(config: &Config) -> Result<Box<dyn FrameSource>> {
    Err(tw_core::Error::Config(format!(
        "camera {} needs a build with the `opencv` feature; use --frames DIR to replay recorded frames",
        config.camera.index
    )))
}

#[cfg(feature = "opencv")]
fn window(
    config: &Config,
    bindings: KeyBindings,
) -> (Box<dyn Display>, Option<Box<dyn CommandSource>>) {
    use tw_alarm::KeyboardControl;
    use tw_capture::{HighGuiDisplay, HighGuiKeys};

    if config.pipeline.display {
        let keys = KeyboardControl::new(HighGuiKeys::new(), bindings);
        (Box::new(HighGuiDisplay::new()), Some(Box::new(keys)))
    } else {
        (Box::new(NullDisplay::new()), None)
    }
}

#[cfg(not(feature = "opencv"))]
fn window(
    config: &Config,
    _bindings: KeyBindings,
) -> (Box<dyn Display>, Option<Box<dyn CommandSource>>) {
    if config.pipeline.display {
        tracing::info!("Built without the opencv feature, frames are not displayed");
    }
    (Box::new(NullDisplay::new()), None)
}
