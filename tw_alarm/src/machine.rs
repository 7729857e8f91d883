//! Debounced alarm state machine.
//!
//! ```text
//!              toggle_arm                      counter >= trigger_count
//!  Disarmed ─────────────────► Armed ─────────────────────────────► Alarming
//!     ▲                         │  ▲                                   │
//!     │       toggle_arm        │  │             silence               │
//!     ├─────────────────────────┘  └───────────────────────────────────┤
//!     │                         toggle_arm                             │
//!     └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! While armed (and while alarming) every cycle moves the debounce counter:
//! up by one when the motion score exceeds `motion_threshold`, down by one
//! (never below zero) otherwise. A single quiet frame in the middle of real
//! motion costs one step instead of wiping the count, and a single noisy frame
//! in a still scene gains one step that decays on the next quiet frame.
//!
//! Entering `Alarming` is edge-triggered: the notifier fires on the
//! `Armed -> Alarming` edge only, never again while alarming. A silence
//! keeps the counter, so if motion is still at or above `trigger_count` on
//! the next cycle the alarm fires again.
//!
//! Every method is a pure function of `(state, counter, score, command)`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tw_config::DetectionConfig;

/// Process-wide alarm mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlarmState {
    Disarmed,
    Armed,
    Alarming,
}

impl AlarmState {
    /// Whether motion scores are being accumulated
    pub fn is_armed(self) -> bool {
        !matches!(self, AlarmState::Disarmed)
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlarmState::Disarmed => "disarmed",
            AlarmState::Armed => "armed",
            AlarmState::Alarming => "alarming",
        };
        f.write_str(name)
    }
}

/// Operator commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Flip between disarmed and armed
    ToggleArm,
    /// Stop an alarm that is sounding, staying armed
    Silence,
    /// Shut the process down
    Exit,
    /// Report the current debounce counter
    ShowCounter,
}

/// What a call on [`AlarmMachine`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed state
    None,
    /// Disarmed -> Armed
    Armed,
    /// Armed or Alarming -> Disarmed
    Disarmed { was_alarming: bool },
    /// Armed -> Alarming; the notifier must fire exactly once
    Triggered { counter: u32 },
    /// Alarming -> Armed
    Silenced { counter: u32 },
    /// The operator asked to exit
    Exit,
    /// The operator asked for the counter
    CounterReport { state: AlarmState, counter: u32 },
}

/// Debounce parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// A cycle counts as motion when its score is strictly greater
    pub motion_threshold: u64,
    /// Counter value at which the alarm fires
    pub trigger_count: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            motion_threshold: 500,
            trigger_count: 10,
        }
    }
}

impl From<&DetectionConfig> for Thresholds {
    fn from(detection: &DetectionConfig) -> Self {
        Self {
            motion_threshold: detection.motion_threshold,
            trigger_count: detection.trigger_count,
        }
    }
}

/// The alarm state and its debounce counter
#[derive(Debug, Clone)]
pub struct AlarmMachine {
    thresholds: Thresholds,
    state: AlarmState,
    counter: u32,
}

impl AlarmMachine {
    /// Create a disarmed machine
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            state: AlarmState::Disarmed,
            counter: 0,
        }
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Feed one cycle's motion score
    pub fn on_cycle(&mut self, score: u64) -> Transition {
        if self.state == AlarmState::Disarmed {
            return Transition::None;
        }

        if score > self.thresholds.motion_threshold {
            self.counter = self.counter.saturating_add(1);
        } else {
            self.counter = self.counter.saturating_sub(1);
        }

        if self.state == AlarmState::Armed && self.counter >= self.thresholds.trigger_count {
            self.state = AlarmState::Alarming;
            return Transition::Triggered {
                counter: self.counter,
            };
        }

        Transition::None
    }

    /// Apply an operator command
    pub fn apply(&mut self, command: Command) -> Transition {
        match command {
            Command::ToggleArm => {
                let previous = self.state;
                self.counter = 0;
                if previous == AlarmState::Disarmed {
                    self.state = AlarmState::Armed;
                    Transition::Armed
                } else {
                    self.state = AlarmState::Disarmed;
                    Transition::Disarmed {
                        was_alarming: previous == AlarmState::Alarming,
                    }
                }
            }
            Command::Silence => {
                if self.state == AlarmState::Alarming {
                    self.state = AlarmState::Armed;
                    Transition::Silenced {
                        counter: self.counter,
                    }
                } else {
                    Transition::None
                }
            }
            Command::Exit => Transition::Exit,
            Command::ShowCounter => Transition::CounterReport {
                state: self.state,
                counter: self.counter,
            },
        }
    }
}
