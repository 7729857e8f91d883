//! ABOUTME: Alarm state machine, shared alarm handle, and operator control surface
//! ABOUTME: Debounces motion scores into edge-triggered alarms and maps keys to commands

pub mod control;
pub mod machine;
pub mod shared;

pub use control::{
    spawn_stdin_reader, ChannelCommands, CommandSender, CommandSource, KeyBindings,
    KeyboardControl, KeySource,
};
pub use machine::{AlarmMachine, AlarmState, Command, Thresholds, Transition};
pub use shared::{AlarmSnapshot, SharedAlarm};
