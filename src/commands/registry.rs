use super::CommandResult;

pub type CommandHandler = fn(CommandInvocation<'_>) -> CommandResult;

pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub handler: CommandHandler,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub input: &'a str,
    pub args: &'a str,
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

/// Commands whose name starts with `prefix`, for "did you mean" hints.
pub fn matching_commands(prefix: &str) -> Vec<&'static Command> {
    let prefix = prefix.to_ascii_lowercase();
    all_commands()
        .iter()
        .filter(|command| command.name.starts_with(&prefix))
        .collect()
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        usage: "/help",
        help: "Show available commands.",
        handler: super::handle_help,
    },
    Command {
        name: "file",
        usage: "/file <path>",
        help: "Attach a log, document or image (10 MB max) for analysis.",
        handler: super::handle_file,
    },
    Command {
        name: "record",
        usage: "/record",
        help: "Start recording a voice message.",
        handler: super::handle_record,
    },
    Command {
        name: "stop",
        usage: "/stop",
        help: "Stop recording and send the voice message.",
        handler: super::handle_stop,
    },
    Command {
        name: "status",
        usage: "/status",
        help: "Show backend, recorder and logging status.",
        handler: super::handle_status,
    },
    Command {
        name: "log",
        usage: "/log [file]",
        help: "Toggle transcript logging or log to a new file.",
        handler: super::handle_log,
    },
    Command {
        name: "quit",
        usage: "/quit",
        help: "End the session.",
        handler: super::handle_quit,
    },
];
