//! ABOUTME: Terminal bell alert sink
//! ABOUTME: Rings the BEL character on a writer, stdout by default

use crate::{Alert, AlertSink, Result};
use async_trait::async_trait;
use std::io::Write;
use std::sync::Mutex;
use tracing::trace;

const BEL: &[u8] = b"\x07";

/// Rings the terminal bell once per alert.
///
/// Terminals have no notion of pitch or length, so the tone frequency and
/// duration are only carried through for other sinks.
pub struct BellSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl BellSink {
    /// Bell on stdout
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    /// Bell on an arbitrary writer
    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

#[async_trait]
impl AlertSink for BellSink {
    async fn alert(&self, alert: &Alert) -> Result<()> {
        let mut out = self.out.lock().map_err(|e| crate::NotifyError::Sink {
            sink: self.name().to_string(),
            message: format!("writer lock poisoned: {}", e),
        })?;
        out.write_all(BEL)?;
        out.flush()?;
        trace!(episode = %alert.episode, attempt = alert.attempt, "Bell rung");
        Ok(())
    }

    fn name(&self) -> &str {
        "bell"
    }
}
