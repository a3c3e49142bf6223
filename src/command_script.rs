use anyhow::{Context, Result};
use serde::Deserialize;
use std::{collections::VecDeque, fs, path::Path};
use stowaway_core::SimTick;

use crate::commands::{parse_command, SessionCommand};

#[derive(Debug, Deserialize)]
struct CommandScriptFile {
    steps: Vec<CommandScriptStepDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct CommandScriptStepDef {
    tick: u64,
    command: String,
}

/// One validated script step, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedCommand {
    pub tick: SimTick,
    /// The step as written, for echoing.
    pub line: String,
    pub command: SessionCommand,
}

/// Deterministic session script runner.
///
/// Scripts are a list of `{tick, command}` steps executed in file order.
/// Every step is parsed when the script loads, so a typo in step 40 fails
/// before step 0 touches any container.
#[derive(Debug)]
pub struct CommandScriptPlayer {
    pending: VecDeque<ScriptedCommand>,
}

impl CommandScriptPlayer {
    /// Load a command script from a JSON file on disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read command script {}", path.display()))?;
        Self::from_str(&contents)
            .with_context(|| format!("invalid command script {}", path.display()))
    }

    /// Load a command script from an in-memory JSON string.
    pub fn from_str(contents: &str) -> Result<Self> {
        let file: CommandScriptFile =
            serde_json::from_str(contents).context("command script is not valid JSON")?;
        if file.steps.is_empty() {
            anyhow::bail!("command script contains no steps");
        }

        let mut pending = VecDeque::with_capacity(file.steps.len());
        let mut last_tick = SimTick::ZERO;
        for (index, step) in file.steps.into_iter().enumerate() {
            let line = step.command.trim().to_string();
            if line.is_empty() {
                anyhow::bail!("step {index}: command script contains an empty command");
            }

            let tick = SimTick(step.tick);
            if tick < last_tick {
                anyhow::bail!("step {index}: command script steps must be sorted by tick");
            }
            last_tick = tick;

            let command = parse_command(&line)
                .with_context(|| format!("step {index} (tick {}): `{line}`", tick.0))?;
            pending.push_back(ScriptedCommand {
                tick,
                line,
                command,
            });
        }

        Ok(Self { pending })
    }

    /// Drain and return all commands scheduled for ticks `<= tick`.
    pub fn drain_ready_commands(&mut self, tick: SimTick) -> Vec<ScriptedCommand> {
        let mut commands = Vec::new();
        while self.pending.front().is_some_and(|step| step.tick <= tick) {
            if let Some(step) = self.pending.pop_front() {
                commands.push(step);
            }
        }
        commands
    }

    /// Number of steps not yet drained.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(commands: Vec<ScriptedCommand>) -> Vec<String> {
        commands.into_iter().map(|step| step.line).collect()
    }

    #[test]
    fn test_command_script_rejects_unsorted_ticks() {
        let json = r#"{
            "steps": [
                {"tick": 2, "command": "give wood 10"},
                {"tick": 1, "command": "status"}
            ]
        }"#;
        let err = CommandScriptPlayer::from_str(json).unwrap_err();
        assert!(
            err.to_string().contains("sorted by tick"),
            "unexpected error: {err:#}"
        );
    }

    #[test]
    fn test_command_script_rejects_empty_commands() {
        let json = r#"{ "steps": [ {"tick": 0, "command": "   "} ] }"#;
        let err = CommandScriptPlayer::from_str(json).unwrap_err();
        assert!(err.to_string().contains("empty command"));
        assert!(CommandScriptPlayer::from_str(r#"{ "steps": [] }"#).is_err());
    }

    #[test]
    fn test_command_script_rejects_bad_steps_at_load_time() {
        let cases = [
            ("teleport 1 2 3", "Unknown command"),
            ("move inv zero 1 1", "Invalid slot"),
            ("give Wood!", "Invalid item"),
            ("drop inv 0 1 NaN 0 0", "Invalid coordinate"),
        ];
        for (bad, expected) in cases {
            let json = format!(
                r#"{{ "steps": [
                    {{"tick": 0, "command": "give wood 5"}},
                    {{"tick": 1, "command": "{bad}"}}
                ] }}"#
            );
            let err = CommandScriptPlayer::from_str(&json).unwrap_err();
            let message = format!("{err:#}");
            assert!(message.contains("step 1 (tick 1)"), "{bad}: {message}");
            assert!(message.contains(expected), "{bad}: {message}");
        }
    }

    #[test]
    fn test_command_script_drains_in_order_and_is_deterministic() {
        let json = r#"{
            "steps": [
                {"tick": 1, "command": "give wood 30"},
                {"tick": 1, "command": "drag inv 0 half"},
                {"tick": 3, "command": "release-world 0 0 0"}
            ]
        }"#;
        let mut script = CommandScriptPlayer::from_str(json).expect("script should parse");
        assert_eq!(script.remaining(), 3);

        assert_eq!(
            lines(script.drain_ready_commands(SimTick(0))),
            Vec::<String>::new()
        );
        let ready = script.drain_ready_commands(SimTick(1));
        assert!(matches!(
            ready[1].command,
            SessionCommand::Drag {
                mode: stowaway_world::DragMode::Half,
                ..
            }
        ));
        assert_eq!(
            lines(ready),
            vec!["give wood 30".to_string(), "drag inv 0 half".to_string()]
        );
        assert_eq!(
            lines(script.drain_ready_commands(SimTick(2))),
            Vec::<String>::new()
        );
        assert_eq!(
            lines(script.drain_ready_commands(SimTick(3))),
            vec!["release-world 0 0 0".to_string()]
        );
        assert!(script.is_finished());
    }
}
