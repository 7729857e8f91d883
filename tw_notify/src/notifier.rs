//! ABOUTME: Background task that plays alarm episodes without blocking capture
//! ABOUTME: Each episode is bounded and stops as soon as the alarm leaves Alarming

use crate::{AlarmTrigger, Alert, AlertManager, AlertSettings, NotifyError, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use tw_alarm::AlarmState;

/// How an episode ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeOutcome {
    /// All attempts were emitted
    Completed { attempts: u32 },
    /// A silence or disarm arrived first
    Interrupted { emitted: u32 },
}

/// Handle used by the capture loop to request an alarm
#[derive(Debug, Clone)]
pub struct NotifierHandle {
    tx: mpsc::UnboundedSender<AlarmTrigger>,
}

impl NotifierHandle {
    /// Create a handle and the receiver the notifier task consumes
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AlarmTrigger>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue an episode; never blocks
    pub fn trigger(&self, trigger: AlarmTrigger) -> Result<()> {
        self.tx
            .send(trigger)
            .map_err(|_| NotifyError::NotifierStopped)
    }
}

/// Plays bounded alert sequences for each trigger it receives
pub struct AlarmNotifier {
    manager: AlertManager,
    settings: AlertSettings,
    state_rx: watch::Receiver<AlarmState>,
}

impl AlarmNotifier {
    pub fn new(
        manager: AlertManager,
        settings: AlertSettings,
        state_rx: watch::Receiver<AlarmState>,
    ) -> Self {
        Self {
            manager,
            settings,
            state_rx,
        }
    }

    /// Spawn the notifier on the current runtime
    pub fn spawn(self) -> (NotifierHandle, JoinHandle<()>) {
        let (handle, rx) = NotifierHandle::channel();
        let task = tokio::spawn(self.run(rx));
        (handle, task)
    }

    /// Process triggers until every handle is dropped
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<AlarmTrigger>) {
        info!(
            attempts = self.settings.attempts,
            sinks = ?self.manager.sinks(),
            "Alarm notifier started"
        );

        while let Some(trigger) = rx.recv().await {
            let outcome = self.play(&trigger).await;
            info!(
                episode = %trigger.episode,
                ?outcome,
                elapsed_ms = trigger.episode.age().as_millis() as u64,
                "Alarm episode finished"
            );
        }

        debug!("Alarm notifier stopped");
    }

    fn still_alarming(&self) -> bool {
        *self.state_rx.borrow() == AlarmState::Alarming
    }

    /// Emit up to `attempts` alerts for one trigger.
    ///
    /// The state is checked before every attempt, and each attempt's tone
    /// duration is cut short the moment the alarm leaves `Alarming`.
    pub async fn play(&mut self, trigger: &AlarmTrigger) -> EpisodeOutcome {
        let attempts = self.settings.attempts;

        for attempt in 1..=attempts {
            if !self.still_alarming() {
                return EpisodeOutcome::Interrupted {
                    emitted: attempt - 1,
                };
            }

            let alert = Alert {
                episode: trigger.episode.clone(),
                attempt,
                attempts,
                frequency_hz: self.settings.frequency_hz,
                duration: self.settings.duration,
                counter: trigger.counter,
                raised_at: tw_core::now_rfc3339(),
            };

            if let Err(e) = self.manager.send(&alert).await {
                error!(episode = %trigger.episode, attempt, error = %e, "Alert delivery failed");
            }

            let duration = self.settings.duration;
            let left_alarming = tokio::select! {
                _ = sleep(duration) => false,
                _ = self.state_rx.wait_for(|s| *s != AlarmState::Alarming) => true,
            };

            if left_alarming {
                warn!(episode = %trigger.episode, attempt, "Alarm sequence interrupted");
                return EpisodeOutcome::Interrupted { emitted: attempt };
            }
        }

        EpisodeOutcome::Completed { attempts }
    }
}
