//! ABOUTME: Operator control surface mapping key presses to alarm commands
//! ABOUTME: Non-blocking command sources polled once per capture cycle

use crate::machine::Command;
use std::io::BufRead;
use std::thread;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, info, warn};
use tw_config::{key_code, ControlsConfig};
use tw_core::{Error, Result};

/// Key codes bound to each command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    pub arm: i32,
    pub silence: i32,
    pub exit: i32,
    pub counter: i32,
}

impl KeyBindings {
    /// Resolve configured key names
    pub fn from_config(controls: &ControlsConfig) -> Result<Self> {
        let resolve = |field: &str, name: &str| {
            key_code(name)
                .ok_or_else(|| Error::Config(format!("{} has unknown key name '{}'", field, name)))
        };
        Ok(Self {
            arm: resolve("arm_key", &controls.arm_key)?,
            silence: resolve("silence_key", &controls.silence_key)?,
            exit: resolve("exit_key", &controls.exit_key)?,
            counter: resolve("counter_key", &controls.counter_key)?,
        })
    }

    /// Command bound to a key code, if any
    pub fn command_for(&self, key: i32) -> Option<Command> {
        if key == self.arm {
            Some(Command::ToggleArm)
        } else if key == self.silence {
            Some(Command::Silence)
        } else if key == self.exit {
            Some(Command::Exit)
        } else if key == self.counter {
            Some(Command::ShowCounter)
        } else {
            None
        }
    }

    /// Command for a line typed on a terminal: a key name such as `t` or `esc`
    pub fn command_for_line(&self, line: &str) -> Option<Command> {
        let name = line.trim();
        if name.is_empty() {
            return None;
        }
        key_code(name).and_then(|key| self.command_for(key))
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            arm: 't' as i32,
            silence: 's' as i32,
            exit: tw_config::KEY_ESC,
            counter: 'c' as i32,
        }
    }
}

/// Per-cycle, non-blocking source of operator commands
pub trait CommandSource: Send {
    /// Return the next pending command, or `None` when there is no input
    fn poll(&mut self) -> Result<Option<Command>>;
}

/// Raw key poller, e.g. a GUI event pump
pub trait KeySource: Send {
    /// Return a pressed key code without blocking, or `None`
    fn poll_key(&mut self) -> Result<Option<i32>>;
}

/// Translates raw key presses into commands through key bindings
pub struct KeyboardControl<K> {
    keys: K,
    bindings: KeyBindings,
}

impl<K: KeySource> KeyboardControl<K> {
    pub fn new(keys: K, bindings: KeyBindings) -> Self {
        Self { keys, bindings }
    }
}

impl<K: KeySource> CommandSource for KeyboardControl<K> {
    fn poll(&mut self) -> Result<Option<Command>> {
        Ok(match self.keys.poll_key()? {
            Some(key) => {
                let command = self.bindings.command_for(key);
                if command.is_none() {
                    debug!(key, "Ignoring unbound key");
                }
                command
            }
            None => None,
        })
    }
}

/// Sending half of a [`ChannelCommands`] source
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<Command>,
}

impl CommandSender {
    /// Queue a command for the next cycle
    pub fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| Error::Internal("command channel closed".to_string()))
    }
}

/// Commands injected from other threads or tasks
pub struct ChannelCommands {
    rx: mpsc::UnboundedReceiver<Command>,
}

impl ChannelCommands {
    /// Create a connected sender and source
    pub fn channel() -> (CommandSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (CommandSender { tx }, Self { rx })
    }
}

impl CommandSource for ChannelCommands {
    fn poll(&mut self) -> Result<Option<Command>> {
        match self.rx.try_recv() {
            Ok(command) => Ok(Some(command)),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(None),
        }
    }
}

/// Read key names from stdin on a helper thread and forward their commands.
///
/// Each line is one key press, e.g. `t` then Enter to toggle arming. The thread
/// ends at end of input or once the receiving side is gone.
pub fn spawn_stdin_reader(
    bindings: KeyBindings,
    sender: CommandSender,
) -> Result<thread::JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            forward_lines(stdin.lock(), bindings, &sender);
            debug!("stdin command reader finished");
        })?;
    info!("Reading commands from stdin, one key per line");
    Ok(handle)
}

fn forward_lines<R: BufRead>(reader: R, bindings: KeyBindings, sender: &CommandSender) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to read command input");
                return;
            }
        };
        match bindings.command_for_line(&line) {
            Some(command) => {
                if sender.send(command).is_err() {
                    return;
                }
            }
            None => debug!(input = %line.trim(), "Ignoring unbound input"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct ScriptedKeys(VecDeque<Option<i32>>);

    impl KeySource for ScriptedKeys {
        fn poll_key(&mut self) -> Result<Option<i32>> {
            Ok(self.0.pop_front().flatten())
        }
    }

    #[test]
    fn test_default_bindings() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.command_for('t' as i32), Some(Command::ToggleArm));
        assert_eq!(bindings.command_for('s' as i32), Some(Command::Silence));
        assert_eq!(bindings.command_for(27), Some(Command::Exit));
        assert_eq!(bindings.command_for('c' as i32), Some(Command::ShowCounter));
        assert_eq!(bindings.command_for('x' as i32), None);
    }

    #[test]
    fn test_custom_bindings() {
        let controls = ControlsConfig {
            arm_key: "a".to_string(),
            silence_key: "space".to_string(),
            exit_key: "q".to_string(),
            counter_key: "n".to_string(),
        };
        let bindings = KeyBindings::from_config(&controls).unwrap();
        assert_eq!(bindings.command_for('a' as i32), Some(Command::ToggleArm));
        assert_eq!(bindings.command_for(' ' as i32), Some(Command::Silence));
        assert_eq!(bindings.command_for('q' as i32), Some(Command::Exit));
        assert_eq!(bindings.command_for('t' as i32), None);
    }

    #[test]
    fn test_unknown_key_name_rejected() {
        let controls = ControlsConfig {
            arm_key: "shift".to_string(),
            ..Default::default()
        };
        assert!(KeyBindings::from_config(&controls).is_err());
    }

    #[test]
    fn test_keyboard_control_maps_and_ignores() {
        let keys = ScriptedKeys(VecDeque::from(vec![
            None,
            Some('x' as i32),
            Some('t' as i32),
            Some(27),
        ]));
        let mut control = KeyboardControl::new(keys, KeyBindings::default());

        assert_eq!(control.poll().unwrap(), None);
        assert_eq!(control.poll().unwrap(), None);
        assert_eq!(control.poll().unwrap(), Some(Command::ToggleArm));
        assert_eq!(control.poll().unwrap(), Some(Command::Exit));
        assert_eq!(control.poll().unwrap(), None);
    }

    #[test]
    fn test_channel_commands_are_non_blocking() {
        let (sender, mut commands) = ChannelCommands::channel();
        assert_eq!(commands.poll().unwrap(), None);

        sender.send(Command::ToggleArm).unwrap();
        sender.send(Command::Silence).unwrap();
        assert_eq!(commands.poll().unwrap(), Some(Command::ToggleArm));
        assert_eq!(commands.poll().unwrap(), Some(Command::Silence));
        assert_eq!(commands.poll().unwrap(), None);

        drop(sender);
        assert_eq!(commands.poll().unwrap(), None);
    }

    #[test]
    fn test_forward_lines() {
        let (sender, mut commands) = ChannelCommands::channel();
        let input = "t\n\nwhat\nESC\nc\n";
        forward_lines(input.as_bytes(), KeyBindings::default(), &sender);

        assert_eq!(commands.poll().unwrap(), Some(Command::ToggleArm));
        assert_eq!(commands.poll().unwrap(), Some(Command::Exit));
        assert_eq!(commands.poll().unwrap(), Some(Command::ShowCounter));
        assert_eq!(commands.poll().unwrap(), None);
    }
}
