//! ABOUTME: Command-line flags and how they override the loaded configuration
//! ABOUTME: Flags win over the config file and environment variables

use clap::Parser;
use std::path::PathBuf;
use tw_config::Config;

/// Motion-triggered alarm for a local camera
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "tripwire", version, about)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Camera device index
    #[arg(long, value_name = "N")]
    pub camera: Option<u32>,

    /// Width frames are resized to before scoring
    #[arg(long, value_name = "PX")]
    pub width: Option<u32>,

    /// Motion score a cycle must exceed to count as motion
    #[arg(long, value_name = "N")]
    pub motion_threshold: Option<u64>,

    /// Debounce counter value that fires the alarm
    #[arg(long, value_name = "N")]
    pub trigger_count: Option<u32>,

    /// Cap on cycles per second; 0 runs unpaced
    #[arg(long, value_name = "N")]
    pub max_fps: Option<u32>,

    /// Do not open a window
    #[arg(long)]
    pub no_display: bool,

    /// Replay png/jpg frames from a directory instead of a camera
    #[arg(long, value_name = "DIR")]
    pub frames: Option<PathBuf>,

    /// Restart the frame directory when it runs out
    #[arg(long, requires = "frames")]
    pub loop_frames: bool,
}

impl Cli {
    /// Apply flag overrides on top of a loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(index) = self.camera {
            config.camera.index = index;
        }
        if let Some(width) = self.width {
            config.camera.frame_width = width;
        }
        if let Some(threshold) = self.motion_threshold {
            config.detection.motion_threshold = threshold;
        }
        if let Some(count) = self.trigger_count {
            config.detection.trigger_count = count;
        }
        if let Some(max_fps) = self.max_fps {
            config.pipeline.max_fps = max_fps;
        }
        if self.no_display {
            config.pipeline.display = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_keep_config() {
        let cli = Cli::try_parse_from(["tripwire"]).unwrap();
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.camera.index, 1);
        assert_eq!(config.detection.motion_threshold, 500);
        assert!(config.pipeline.display);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "tripwire",
            "--camera",
            "0",
            "--width",
            "320",
            "--motion-threshold",
            "1500",
            "--trigger-count",
            "4",
            "--max-fps",
            "15",
            "--no-display",
        ])
        .unwrap();

        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.camera.index, 0);
        assert_eq!(config.camera.frame_width, 320);
        assert_eq!(config.detection.motion_threshold, 1500);
        assert_eq!(config.detection.trigger_count, 4);
        assert_eq!(config.pipeline.max_fps, 15);
        assert!(!config.pipeline.display);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_loop_frames_requires_frames() {
        assert!(Cli::try_parse_from(["tripwire", "--loop-frames"]).is_err());
        let cli =
            Cli::try_parse_from(["tripwire", "--frames", "recordings", "--loop-frames"]).unwrap();
        assert_eq!(cli.frames, Some(PathBuf::from("recordings")));
        assert!(cli.loop_frames);
    }

    #[test]
    fn test_trigger_count_help_names_debounce_counter() {
        use clap::CommandFactory;

        let command = Cli::command();
        let arg = command
            .get_arguments()
            .find(|arg| arg.get_id() == "trigger_count")
            .unwrap();
        assert_eq!(
            arg.get_help().unwrap().to_string(),
            "Debounce counter value that fires the alarm"
        );
    }

    #[test]
    fn test_override_can_make_config_invalid() {
        let cli = Cli::try_parse_from(["tripwire", "--trigger-count", "0"]).unwrap();
        let mut config = Config::default();
        cli.apply(&mut config);
        assert!(config.check().is_err());
    }
}
