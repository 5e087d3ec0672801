//! Slash command parsing.
//!
//! Input starting with `/` controls the session and is never sent to the
//! model.  The bare words `exit` and `file` are accepted as well, since they
//! are what the line-oriented reviewer has always understood.

/// A parsed command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Display help information.
    Help,

    /// Exit the application.
    Quit,

    /// Clear the conversation history.
    Clear,

    /// Review an attachment.  `None` reviews the configured file.
    Review(Option<String>),

    /// Have the model introduce itself.
    Intro,

    /// List the prompt catalog.
    Prompts,

    /// Use the catalog entry with this 1-based number as system instruction.
    Prompt(usize),

    /// Set or clear the system instruction.
    /// `None` clears the current system instruction.
    System(Option<String>),

    /// Cancel the generation in flight.
    Cancel,

    /// Display session statistics.
    Stats,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a message.
///
/// # Examples
///
/// ```
/// # use aifun::commands::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("file").is_some());
/// assert!(parse_command("Review this please").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    match input {
        "exit" => return Some(ChatCommand::Quit),
        "file" => return Some(ChatCommand::Review(None)),
        _ => {}
    }

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "clear" | "reset" => ChatCommand::Clear,
        "review" | "file" => ChatCommand::Review(argument.map(|s| s.to_string())),
        "intro" => ChatCommand::Intro,
        "prompts" => ChatCommand::Prompts,
        "prompt" => match argument {
            Some(arg) => match arg.parse::<usize>() {
                Ok(n) if n > 0 => ChatCommand::Prompt(n),
                _ => ChatCommand::Invalid("/prompt expects a positive number".to_string()),
            },
            None => ChatCommand::Invalid("/prompt requires a number (see /prompts)".to_string()),
        },
        "system" => ChatCommand::System(argument.map(|s| s.to_string())),
        "cancel" => ChatCommand::Cancel,
        "stats" | "status" => ChatCommand::Stats,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /review [path]         Upload a diff and review it (bare 'file' works too)
  /intro                 Ask the model to introduce itself
  /prompts               List the system instruction catalog
  /prompt <n>            Use catalog entry n as system instruction
  /system [text]         Set system instruction (no argument clears it)
  /cancel                Cancel the response being streamed
  /clear                 Clear conversation history
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit (bare 'exit' works too)"#
}
