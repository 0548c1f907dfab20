#![forbid(unsafe_code)]

//! Command-line grammar of the harness.

use std::fmt;
use std::time::Duration;

pub const HELP_TEXT: &str = "\
COMMANDS:
    show                        Print every view
    edit <view> <field> [text]  Live edit of one field
    commit <view> <field> [text]
                                Committed edit (blur / confirm)
    paste <view> <text>         Paste text across a view's fields
    hash [fragment]             Print the fragment, or load one
    rand                        Generate a random version-4 value
    export <view>               Print the view's clipboard text
    wait <ms>                   Let background lookups finish
    help                        Show this help
    quit                        Exit";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show,
    Edit {
        view: String,
        field: usize,
        text: String,
    },
    Commit {
        view: String,
        field: usize,
        text: String,
    },
    Paste {
        view: String,
        text: String,
    },
    Hash(Option<String>),
    Rand,
    Export(String),
    Wait(Duration),
    Help,
    Quit,
}

/// Why a line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Blank line.
    Empty,
    Unknown(String),
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    InvalidNumber {
        argument: &'static str,
        value: String,
    },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::Unknown(word) => write!(f, "unknown command: {word} (try `help`)"),
            Self::MissingArgument { command, argument } => {
                write!(f, "{command}: missing <{argument}>")
            }
            Self::InvalidNumber { argument, value } => {
                write!(f, "<{argument}> must be a number, got {value:?}")
            }
        }
    }
}

impl std::error::Error for CommandError {}

/// Split off the first whitespace-delimited word.
fn next_word(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    match input.find(char::is_whitespace) {
        Some(end) => Some((&input[..end], input[end..].trim_start())),
        None => Some((input, "")),
    }
}

fn required<'a>(
    input: &'a str,
    command: &'static str,
    argument: &'static str,
) -> Result<(&'a str, &'a str), CommandError> {
    next_word(input).ok_or(CommandError::MissingArgument { command, argument })
}

fn number<T: std::str::FromStr>(value: &str, argument: &'static str) -> Result<T, CommandError> {
    value.parse().map_err(|_| CommandError::InvalidNumber {
        argument,
        value: value.to_owned(),
    })
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let Some((word, rest)) = next_word(line) else {
            return Err(CommandError::Empty);
        };
        match word.to_ascii_lowercase().as_str() {
            "show" => Ok(Self::Show),
            "edit" | "commit" => {
                let command = if word.eq_ignore_ascii_case("edit") {
                    "edit"
                } else {
                    "commit"
                };
                let (view, rest) = required(rest, command, "view")?;
                let (field, rest) = required(rest, command, "field")?;
                let field = number(field, "field")?;
                let view = view.to_owned();
                // The rest of the line is the text, verbatim; empty clears.
                let text = rest.trim_end().to_owned();
                Ok(if command == "edit" {
                    Self::Edit { view, field, text }
                } else {
                    Self::Commit { view, field, text }
                })
            }
            "paste" => {
                let (view, rest) = required(rest, "paste", "view")?;
                if rest.trim().is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "paste",
                        argument: "text",
                    });
                }
                Ok(Self::Paste {
                    view: view.to_owned(),
                    text: rest.trim_end().to_owned(),
                })
            }
            "hash" => Ok(Self::Hash(next_word(rest).map(|_| rest.trim().to_owned()))),
            "rand" => Ok(Self::Rand),
            "export" => {
                let (view, _) = required(rest, "export", "view")?;
                Ok(Self::Export(view.to_owned()))
            }
            "wait" => {
                let (ms, _) = required(rest, "wait", "ms")?;
                Ok(Self::Wait(Duration::from_millis(number(ms, "ms")?)))
            }
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            _ => Err(CommandError::Unknown(word.to_owned())),
        }
    }
}
