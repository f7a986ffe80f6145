//! Slash commands typed at the chat prompt.
//!
//! Parsing is pure: [`process_input`] turns a line into a [`CommandResult`]
//! and the chat loop carries it out.

mod registry;

pub use registry::{all_commands, matching_commands, Command, CommandInvocation};

use std::path::PathBuf;

use crate::capture::file::parse_dropped_path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Nothing to do (blank input).
    Continue,
    ProcessAsMessage(String),
    AttachFile(PathBuf),
    StartRecording,
    StopRecording,
    ShowHelp,
    ShowStatus,
    ToggleLog,
    SetLogFile(PathBuf),
    /// The command was recognised but its arguments were not.
    Usage(&'static str),
    /// An unknown `/name` that prefixes one or more real commands.
    UnknownCommand {
        name: String,
        suggestions: Vec<&'static str>,
    },
    Quit,
}

pub fn process_input(input: &str) -> CommandResult {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return CommandResult::Continue;
    }

    if looks_like_drop(trimmed) {
        if let Some(path) = parse_dropped_path(trimmed) {
            return CommandResult::AttachFile(path);
        }
    }

    let Some(rest) = trimmed.strip_prefix('/') else {
        return CommandResult::ProcessAsMessage(trimmed.to_string());
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command_name = match parts.next() {
        Some(name) if !name.is_empty() => name,
        _ => return CommandResult::ProcessAsMessage(trimmed.to_string()),
    };
    let args = parts.next().unwrap_or("").trim();

    match registry::find_command(command_name) {
        Some(command) => (command.handler)(CommandInvocation {
            input: trimmed,
            args,
        }),
        None => {
            let suggestions: Vec<&'static str> = matching_commands(command_name)
                .into_iter()
                .map(|command| command.name)
                .collect();
            if suggestions.is_empty() {
                CommandResult::ProcessAsMessage(trimmed.to_string())
            } else {
                CommandResult::UnknownCommand {
                    name: command_name.to_string(),
                    suggestions,
                }
            }
        }
    }
}

/// Terminals paste dropped files as absolute, quoted, `~` or `file://` paths.
fn looks_like_drop(input: &str) -> bool {
    input.starts_with('/')
        || input.starts_with("~/")
        || input.starts_with('\'')
        || input.starts_with('"')
        || input.starts_with("file://")
}

/// Help text listing every command.
pub fn help_text() -> String {
    let width = all_commands()
        .iter()
        .map(|command| command.usage.len())
        .max()
        .unwrap_or(0);
    let mut help = String::from("Type a message and press Enter to ask Sage.\n");
    help.push_str("Drop a file path onto the prompt to attach it.\n\nCommands:\n");
    for command in all_commands() {
        help.push_str(&format!(
            "  {:width$}  {}\n",
            command.usage,
            command.help,
            width = width
        ));
    }
    help
}

pub(super) fn handle_help(_invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::ShowHelp
}

pub(super) fn handle_file(invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        return CommandResult::Usage("Usage: /file <path>");
    }
    let path = parse_dropped_path(invocation.args)
        .unwrap_or_else(|| PathBuf::from(invocation.args));
    CommandResult::AttachFile(path)
}

pub(super) fn handle_record(invocation: CommandInvocation<'_>) -> CommandResult {
    if !invocation.args.is_empty() {
        return CommandResult::Usage("Usage: /record");
    }
    CommandResult::StartRecording
}

pub(super) fn handle_stop(_invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::StopRecording
}

pub(super) fn handle_status(_invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::ShowStatus
}

pub(super) fn handle_log(invocation: CommandInvocation<'_>) -> CommandResult {
    let parts: Vec<&str> = invocation.input.split_whitespace().collect();
    match parts.len() {
        1 => CommandResult::ToggleLog,
        2 => CommandResult::SetLogFile(PathBuf::from(parts[1])),
        _ => CommandResult::Usage("Usage: /log [filename]"),
    }
}

pub(super) fn handle_quit(_invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Quit
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn plain_lines_are_messages_and_blank_lines_are_ignored() {
        assert_eq!(
            process_input("  why did the deploy fail?  "),
            CommandResult::ProcessAsMessage("why did the deploy fail?".to_string())
        );
        assert_eq!(process_input("   "), CommandResult::Continue);
        assert_eq!(process_input(""), CommandResult::Continue);
    }

    #[test]
    fn commands_are_case_insensitive() {
        assert_eq!(process_input("/HELP"), CommandResult::ShowHelp);
        assert_eq!(process_input("/Record"), CommandResult::StartRecording);
        assert_eq!(process_input("/stop"), CommandResult::StopRecording);
        assert_eq!(process_input("/status"), CommandResult::ShowStatus);
        assert_eq!(process_input("/quit"), CommandResult::Quit);
    }

    #[test]
    fn file_command_requires_a_path() {
        assert_eq!(
            process_input("/file"),
            CommandResult::Usage("Usage: /file <path>")
        );
        assert_eq!(
            process_input("/file missing.log"),
            CommandResult::AttachFile(PathBuf::from("missing.log"))
        );
    }

    #[test]
    fn file_command_unquotes_existing_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("with space.log");
        std::fs::write(&path, "x").unwrap();
        assert_eq!(
            process_input(&format!("/file '{}'", path.display())),
            CommandResult::AttachFile(path)
        );
    }

    #[test]
    fn log_command_toggles_or_sets_file() {
        assert_eq!(process_input("/log"), CommandResult::ToggleLog);
        assert_eq!(
            process_input("/log chat.txt"),
            CommandResult::SetLogFile(PathBuf::from("chat.txt"))
        );
        assert_eq!(
            process_input("/log a b"),
            CommandResult::Usage("Usage: /log [filename]")
        );
    }

    #[test]
    fn unknown_commands_are_sent_as_text_unless_they_name_a_file() {
        assert_eq!(
            process_input("/var/log/does-not-exist.log"),
            CommandResult::ProcessAsMessage("/var/log/does-not-exist.log".to_string())
        );
        assert_eq!(
            process_input("/shrug"),
            CommandResult::ProcessAsMessage("/shrug".to_string())
        );

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "x").unwrap();
        assert_eq!(
            process_input(path.to_str().unwrap()),
            CommandResult::AttachFile(path.clone())
        );
        assert_eq!(
            process_input(&format!("\"{}\"", path.display())),
            CommandResult::AttachFile(path)
        );
    }

    #[test]
    fn help_lists_every_command() {
        let help = help_text();
        for command in all_commands() {
            assert!(help.contains(command.usage), "missing {}", command.name);
        }
        assert_eq!(matching_commands("st").len(), 2);
    }

    #[test]
    fn command_prefix_typos_suggest_instead_of_sending() {
        assert_eq!(
            process_input("/st"),
            CommandResult::UnknownCommand {
                name: "st".to_string(),
                suggestions: vec!["stop", "status"],
            }
        );
        assert_eq!(
            process_input("/REC"),
            CommandResult::UnknownCommand {
                name: "REC".to_string(),
                suggestions: vec!["record"],
            }
        );
        assert_eq!(
            process_input("/xyz what now"),
            CommandResult::ProcessAsMessage("/xyz what now".to_string())
        );
    }
}
