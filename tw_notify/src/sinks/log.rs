//! ABOUTME: Structured log alert sink
//! ABOUTME: Emits each alert as a warning with the alert serialized as JSON

use crate::{Alert, AlertSink, Result};
use async_trait::async_trait;
use tracing::warn;

/// Writes every alert to the log at warn level
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertSink for LogSink {
    async fn alert(&self, alert: &Alert) -> Result<()> {
        let payload = serde_json::to_string(alert)?;
        warn!(
            episode = %alert.episode,
            attempt = alert.attempt,
            attempts = alert.attempts,
            counter = alert.counter,
            alert = %payload,
            "ALARM"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
