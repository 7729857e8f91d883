//! ABOUTME: Thread-safe handle around the alarm state machine
//! ABOUTME: Serializes pipeline and operator updates and publishes state changes

use crate::machine::{AlarmMachine, AlarmState, Command, Thresholds, Transition};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tw_core::{Error, Result};

/// Point-in-time view of the alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmSnapshot {
    pub state: AlarmState,
    pub counter: u32,
}

/// Cloneable handle shared by the capture loop, the control surface, and the
/// notifier.
///
/// All mutations go through one mutex. Every state change is published on a
/// watch channel so the notifier can stop mid-sequence without polling.
#[derive(Debug, Clone)]
pub struct SharedAlarm {
    machine: Arc<Mutex<AlarmMachine>>,
    state_tx: Arc<watch::Sender<AlarmState>>,
}

impl SharedAlarm {
    pub fn new(thresholds: Thresholds) -> Self {
        let machine = AlarmMachine::new(thresholds);
        let (state_tx, _) = watch::channel(machine.state());
        Self {
            machine: Arc::new(Mutex::new(machine)),
            state_tx: Arc::new(state_tx),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, AlarmMachine>> {
        self.machine
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to lock alarm state: {}", e)))
    }

    /// Callers hold the machine guard so publications follow lock order
    fn publish(&self, _guard: &MutexGuard<'_, AlarmMachine>, state: AlarmState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<AlarmState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> Result<AlarmState> {
        Ok(self.lock()?.state())
    }

    pub fn snapshot(&self) -> Result<AlarmSnapshot> {
        let machine = self.lock()?;
        Ok(AlarmSnapshot {
            state: machine.state(),
            counter: machine.counter(),
        })
    }

    /// Feed one cycle's motion score
    pub fn on_cycle(&self, score: u64) -> Result<Transition> {
        let (transition, snapshot) = {
            let mut machine = self.lock()?;
            let transition = machine.on_cycle(score);
            let snapshot = AlarmSnapshot {
                state: machine.state(),
                counter: machine.counter(),
            };
            self.publish(&machine, snapshot.state);
            (transition, snapshot)
        };

        debug!(score, counter = snapshot.counter, state = %snapshot.state, "Cycle scored");

        if let Transition::Triggered { counter } = transition {
            warn!(counter, "Sustained motion, alarm triggered");
        }

        Ok(transition)
    }

    /// Apply an operator command
    pub fn apply(&self, command: Command) -> Result<Transition> {
        let transition = {
            let mut machine = self.lock()?;
            let transition = machine.apply(command);
            let state = machine.state();
            self.publish(&machine, state);
            transition
        };

        match transition {
            Transition::Armed => info!("Alarm mode is on"),
            Transition::Disarmed { was_alarming } => {
                info!(was_alarming, "Alarm mode is off")
            }
            Transition::Silenced { counter } => info!(counter, "Alarm silenced"),
            Transition::CounterReport { state, counter } => {
                info!(%state, counter, "Alarm counter")
            }
            Transition::Exit => info!("Exit requested"),
            Transition::None => debug!(?command, "Command had no effect"),
            Transition::Triggered { .. } => {}
        }

        Ok(transition)
    }
}
