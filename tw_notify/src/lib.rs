//! ABOUTME: Alarm notifier running bounded alert sequences off the capture loop
//! ABOUTME: Fans alerts out to sinks such as the terminal bell and the log

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tw_config::AlarmConfig;
use tw_core::Id;

pub mod notifier;
pub mod sinks;

pub use notifier::{AlarmNotifier, EpisodeOutcome, NotifierHandle};
pub use sinks::{BellSink, LogSink};

/// Result type for notification operations
pub type Result<T> = std::result::Result<T, NotifyError>;

/// Errors that can occur while emitting alerts
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Sink {sink} failed: {message}")]
    Sink { sink: String, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Delivery failed: {0}")]
    Delivery(String),
    #[error("Notifier is not running")]
    NotifierStopped,
}

impl From<NotifyError> for tw_core::Error {
    fn from(err: NotifyError) -> Self {
        tw_core::Error::Notify(err.to_string())
    }
}

/// Tone and repeat settings for one alarm episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSettings {
    /// Upper bound on alerts per episode
    pub attempts: u32,
    pub frequency_hz: u32,
    /// How long each alert sounds before the next attempt
    pub duration: Duration,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self::from(&AlarmConfig::default())
    }
}

impl From<&AlarmConfig> for AlertSettings {
    fn from(config: &AlarmConfig) -> Self {
        Self {
            attempts: config.attempts,
            frequency_hz: config.frequency_hz,
            duration: Duration::from_millis(config.duration_ms),
        }
    }
}

/// Request to sound the alarm, sent when the state machine enters `Alarming`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmTrigger {
    /// Correlates every alert of one episode
    pub episode: Id,
    /// Debounce counter at the moment of triggering
    pub counter: u32,
}

impl AlarmTrigger {
    pub fn new(counter: u32) -> Self {
        Self {
            episode: Id::new(),
            counter,
        }
    }
}

/// A single alert attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub episode: Id,
    /// 1-based attempt number within the episode
    pub attempt: u32,
    pub attempts: u32,
    pub frequency_hz: u32,
    pub duration: Duration,
    pub counter: u32,
    /// RFC3339 timestamp of the attempt
    pub raised_at: String,
}

/// Core trait for alert outputs
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Emit one alert; must return promptly
    async fn alert(&self, alert: &Alert) -> Result<()>;

    /// Get the sink's name for logging
    fn name(&self) -> &str;
}

/// Delivers each alert to every registered sink concurrently
#[derive(Clone, Default)]
pub struct AlertManager {
    sinks: Vec<Arc<dyn AlertSink>>,
}

impl AlertManager {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Register a sink
    pub fn register_sink(&mut self, sink: Arc<dyn AlertSink>) {
        self.sinks.push(sink);
    }

    /// Names of registered sinks, in registration order
    pub fn sinks(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Send an alert through all sinks; every sink is tried even if some fail
    pub async fn send(&self, alert: &Alert) -> Result<()> {
        let futures = self.sinks.iter().map(|sink| async move {
            sink.alert(alert)
                .await
                .map_err(|e| format!("{}: {}", sink.name(), e))
        });

        let errors: Vec<String> = join_all(futures)
            .await
            .into_iter()
            .filter_map(|r| r.err())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(NotifyError::Delivery(errors.join(", ")))
        }
    }
}
