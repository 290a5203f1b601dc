//! Line command grammar.

use core_events::Command;
use core_step::Bias;
use thiserror::Error;

pub const HELP_TEXT: &str = "\
commands:
  doc <TEXT>             replace the document
  pos <N>                move the tracked cursor
  track <LABEL> <N>      track another position
  untrack <ID>           stop tracking a position
  insert [FROM] [TEXT]   switch to an insert step
  delete [FROM] [TO]     switch to a delete step
  from <N> | to <N>      move the step bounds
  text <TEXT>            change the inserted text
  bias left|right        side taken at the insertion point
  show                   redraw the playground
  explain                ask the AI tutor about the current mapping
  ask <QUESTION>         ask the AI tutor anything
  help                   this text
  quit                   leave";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("`{command}` needs {arg}")]
    MissingArgument {
        command: &'static str,
        arg: &'static str,
    },
    #[error("`{command}`: `{value}` is not a non-negative number")]
    InvalidNumber {
        command: &'static str,
        value: String,
    },
    #[error("bias must be `left` or `right`, got `{0}`")]
    InvalidBias(String),
    #[error("`{command}` got unexpected extra input `{extra}`")]
    Trailing {
        command: &'static str,
        extra: String,
    },
}

impl ParseError {
    /// Variant name, safe to log (the Display form quotes user input).
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::Unknown(_) => "unknown",
            ParseError::MissingArgument { .. } => "missing_argument",
            ParseError::InvalidNumber { .. } => "invalid_number",
            ParseError::InvalidBias(_) => "invalid_bias",
            ParseError::Trailing { .. } => "trailing",
        }
    }
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let cmd = match word.to_ascii_lowercase().as_str() {
        "doc" => Command::SetDocument(rest.to_string()),
        "pos" => Command::SetTracked(number("pos", single("pos", rest, "a position")?)?),
        "track" => {
            let (label, pos) = rest.split_once(char::is_whitespace).ok_or(
                ParseError::MissingArgument {
                    command: "track",
                    arg: "a label and a position",
                },
            )?;
            Command::Track {
                label: label.to_string(),
                pos: number("track", single("track", pos.trim(), "a position")?)?,
            }
        }
        "untrack" => {
            let raw = single("untrack", rest, "an id")?;
            let id = raw.parse::<u32>().map_err(|_| ParseError::InvalidNumber {
                command: "untrack",
                value: raw.to_string(),
            })?;
            Command::Untrack(id)
        }
        "insert" => {
            let (from, text) = match rest.split_once(char::is_whitespace) {
                Some((f, t)) => (f, Some(t.trim())),
                None if rest.is_empty() => ("", None),
                None => (rest, None),
            };
            let from = if from.is_empty() {
                None
            } else {
                Some(number("insert", from)?)
            };
            Command::Insert {
                from,
                text: text.map(str::to_string),
            }
        }
        "delete" | "del" => {
            let mut parts = rest.split_whitespace();
            let from = parts.next().map(|v| number("delete", v)).transpose()?;
            let to = parts.next().map(|v| number("delete", v)).transpose()?;
            if let Some(extra) = parts.next() {
                return Err(ParseError::Trailing {
                    command: "delete",
                    extra: extra.to_string(),
                });
            }
            Command::Delete { from, to }
        }
        "from" => Command::SetFrom(number("from", single("from", rest, "a position")?)?),
        "to" => Command::SetTo(number("to", single("to", rest, "a position")?)?),
        "text" => Command::SetText(rest.to_string()),
        "bias" => Command::SetBias(parse_bias(single("bias", rest, "`left` or `right`")?)?),
        "show" => Command::Show,
        "explain" => Command::Explain,
        "ask" => {
            if rest.is_empty() {
                return Err(ParseError::MissingArgument {
                    command: "ask",
                    arg: "a question",
                });
            }
            Command::Ask(rest.to_string())
        }
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => return Err(ParseError::Unknown(word.to_string())),
    };
    Ok(Some(cmd))
}

/// Exactly one whitespace-free argument.
fn single<'a>(
    command: &'static str,
    rest: &'a str,
    arg: &'static str,
) -> Result<&'a str, ParseError> {
    let mut parts = rest.split_whitespace();
    let first = parts
        .next()
        .ok_or(ParseError::MissingArgument { command, arg })?;
    if let Some(extra) = parts.next() {
        return Err(ParseError::Trailing {
            command,
            extra: extra.to_string(),
        });
    }
    Ok(first)
}

fn number(command: &'static str, raw: &str) -> Result<usize, ParseError> {
    raw.parse::<usize>().map_err(|_| ParseError::InvalidNumber {
        command,
        value: raw.to_string(),
    })
}

/// `left`/`right` (or `l`/`r`), or a signed number: negative is left.
fn parse_bias(raw: &str) -> Result<Bias, ParseError> {
    match raw.to_ascii_lowercase().as_str() {
        "left" | "l" => Ok(Bias::Left),
        "right" | "r" => Ok(Bias::Right),
        other => other
            .parse::<i64>()
            .map(Bias::from_signed)
            .map_err(|_| ParseError::InvalidBias(raw.to_string())),
    }
}
