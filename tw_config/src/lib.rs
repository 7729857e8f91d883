//! ABOUTME: Configuration management with validation and environment loading
//! ABOUTME: Handles detection, alarm, and control settings from files and environment variables

use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tw_core::{Error, Result};
use validator::Validate;

/// Key code reported for the escape key
pub const KEY_ESC: i32 = 27;

/// Main configuration struct
#[derive(Debug, Clone, Deserialize, Serialize, Validate, Default)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub camera: CameraConfig,
    #[validate(nested)]
    pub detection: DetectionConfig,
    #[validate(nested)]
    pub controls: ControlsConfig,
    #[validate(nested)]
    pub alarm: AlarmConfig,
    #[validate(nested)]
    pub pipeline: PipelineConfig,
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

/// Camera selection and frame geometry
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct CameraConfig {
    /// Index of the capture device
    #[validate(range(max = 64))]
    pub index: u32,
    /// Width every frame is resized to before scoring (aspect preserved)
    #[validate(range(min = 16, max = 4096))]
    pub frame_width: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 1,
            frame_width: 500,
        }
    }
}

/// Motion scoring and debounce parameters
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct DetectionConfig {
    /// Motion score a cycle must exceed to count as motion
    pub motion_threshold: u64,
    /// Debounce counter value that fires the alarm
    #[validate(range(min = 1))]
    pub trigger_count: u32,
    /// Gaussian kernel size, odd; 1 disables smoothing
    #[validate(range(min = 1, max = 51))]
    pub blur_kernel_size: u32,
    /// Per-pixel absolute difference above which a pixel counts as changed
    pub pixel_diff_threshold: u8,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            motion_threshold: 500,
            trigger_count: 10,
            blur_kernel_size: 5,
            pixel_diff_threshold: 25,
        }
    }
}

/// Key bindings for operator commands
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct ControlsConfig {
    #[validate(length(min = 1, max = 8))]
    pub arm_key: String,
    #[validate(length(min = 1, max = 8))]
    pub silence_key: String,
    #[validate(length(min = 1, max = 8))]
    pub exit_key: String,
    #[validate(length(min = 1, max = 8))]
    pub counter_key: String,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            arm_key: "t".to_string(),
            silence_key: "s".to_string(),
            exit_key: "esc".to_string(),
            counter_key: "c".to_string(),
        }
    }
}

/// Alert sequence played when the alarm fires
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct AlarmConfig {
    /// Upper bound on alerts emitted per alarm episode
    #[validate(range(min = 1, max = 100))]
    pub attempts: u32,
    /// Tone frequency in hertz
    #[validate(range(min = 37, max = 32767))]
    pub frequency_hz: u32,
    /// Tone length per attempt in milliseconds
    #[validate(range(min = 1, max = 60000))]
    pub duration_ms: u64,
    /// Ring the terminal bell in addition to logging
    pub bell: bool,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            frequency_hz: 1000,
            duration_ms: 1000,
            bell: true,
        }
    }
}

/// Capture loop behaviour
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum cycles per second; 0 runs the loop unpaced
    #[validate(range(max = 1000))]
    pub max_fps: u32,
    /// Show frames in a window
    pub display: bool,
    #[validate(length(min = 1))]
    pub window_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_fps: 0,
            display: true,
            window_name: "tripwire".to_string(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct TelemetryConfig {
    /// "production" switches to JSON log lines
    #[validate(length(min = 1))]
    pub env: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            env: "development".to_string(),
        }
    }
}

/// Resolve a key name to the code a key poller reports.
///
/// Accepts a single character or one of `esc`, `space`, `enter`, `tab`.
pub fn key_code(name: &str) -> Option<i32> {
    match name.to_ascii_lowercase().as_str() {
        "esc" | "escape" => Some(KEY_ESC),
        "space" => Some(b' ' as i32),
        "enter" | "return" => Some(b'\r' as i32),
        "tab" => Some(b'\t' as i32),
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_graphic() => Some(c as i32),
                _ => None,
            }
        }
    }
}

impl Config {
    /// Load configuration from `tripwire.*` in the working directory (if any)
    /// and `TRIPWIRE_*` environment variables
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, reading `path` instead of the default file name.
    ///
    /// An explicit path must exist. Environment variables use `__` between
    /// nesting levels, e.g. `TRIPWIRE_DETECTION__MOTION_THRESHOLD=300`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let defaults = ConfigBuilder::try_from(&Config::default())?;
        let mut builder = ConfigBuilder::builder().add_source(defaults);

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("tripwire").required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix("TRIPWIRE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build config: {}", e)))?;

        let parsed: Config = config
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Failed to deserialize config: {}", e)))?;

        parsed.check()?;
        Ok(parsed)
    }

    /// Run field validation plus the cross-field rules derive cannot express
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| Error::Config(format!("Config validation failed: {}", e)))?;

        if self.detection.blur_kernel_size % 2 == 0 {
            return Err(Error::Config(format!(
                "detection.blur_kernel_size must be odd, got {}",
                self.detection.blur_kernel_size
            )));
        }

        let keys = [
            ("controls.arm_key", &self.controls.arm_key),
            ("controls.silence_key", &self.controls.silence_key),
            ("controls.exit_key", &self.controls.exit_key),
            ("controls.counter_key", &self.controls.counter_key),
        ];
        let mut codes = Vec::with_capacity(keys.len());
        for (field, name) in keys {
            let code = key_code(name)
                .ok_or_else(|| Error::Config(format!("{} has unknown key name '{}'", field, name)))?;
            if codes.contains(&code) {
                return Err(Error::Config(format!(
                    "{} reuses key '{}' bound to another command",
                    field, name
                )));
            }
            codes.push(code);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;
    use std::sync::Mutex;

    // Serializes tests that touch process environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: [&str; 4] = [
        "TRIPWIRE_DETECTION__MOTION_THRESHOLD",
        "TRIPWIRE_DETECTION__TRIGGER_COUNT",
        "TRIPWIRE_DETECTION__BLUR_KERNEL_SIZE",
        "TRIPWIRE_CAMERA__INDEX",
    ];

    fn clear_vars() {
        for key in VARS {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_config_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_vars();

        let config = Config::load().expect("Should load with defaults");

        assert_eq!(config.camera.index, 1);
        assert_eq!(config.camera.frame_width, 500);
        assert_eq!(config.detection.motion_threshold, 500);
        assert_eq!(config.detection.trigger_count, 10);
        assert_eq!(config.detection.blur_kernel_size, 5);
        assert_eq!(config.detection.pixel_diff_threshold, 25);
        assert_eq!(config.alarm.attempts, 5);
        assert_eq!(config.controls.exit_key, "esc");
        assert_eq!(config.pipeline.max_fps, 0);
    }

    #[test]
    fn test_config_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_vars();

        env::set_var("TRIPWIRE_DETECTION__MOTION_THRESHOLD", "300");
        env::set_var("TRIPWIRE_DETECTION__TRIGGER_COUNT", "400");
        env::set_var("TRIPWIRE_CAMERA__INDEX", "0");

        let config = Config::load().expect("Should load from env");

        assert_eq!(config.detection.motion_threshold, 300);
        assert_eq!(config.detection.trigger_count, 400);
        assert_eq!(config.camera.index, 0);

        clear_vars();
    }

    #[test]
    fn test_even_kernel_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_vars();

        env::set_var("TRIPWIRE_DETECTION__BLUR_KERNEL_SIZE", "4");
        let result = Config::load();
        assert!(matches!(result, Err(Error::Config(_))));

        clear_vars();
    }

    #[test]
    fn test_zero_trigger_count_rejected() {
        let mut config = Config::default();
        config.detection.trigger_count = 0;
        assert!(config.check().is_err());
    }

    #[test]
    fn test_unknown_and_duplicate_keys_rejected() {
        let mut config = Config::default();
        config.controls.arm_key = "ctrl".to_string();
        assert!(config.check().is_err());

        let mut config = Config::default();
        config.controls.silence_key = "t".to_string();
        assert!(config.check().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_vars();

        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "[detection]\nmotion_threshold = 300\nblur_kernel_size = 21\n\n[controls]\nexit_key = \"q\""
        )
        .unwrap();

        let config = Config::load_from(Some(file.path())).expect("Should load file");
        assert_eq!(config.detection.motion_threshold, 300);
        assert_eq!(config.detection.blur_kernel_size, 21);
        // Unspecified values keep their defaults
        assert_eq!(config.detection.trigger_count, 10);
        assert_eq!(config.controls.exit_key, "q");
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let result = Config::load_from(Some(Path::new("/nonexistent/tripwire.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_key_code() {
        assert_eq!(key_code("esc"), Some(KEY_ESC));
        assert_eq!(key_code("ESC"), Some(KEY_ESC));
        assert_eq!(key_code("t"), Some('t' as i32));
        assert_eq!(key_code("space"), Some(32));
        assert_eq!(key_code("tt"), None);
        assert_eq!(key_code(""), None);
    }
}
