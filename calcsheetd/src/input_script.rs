//! # Edit Script Parser
//!
//! A line-based script format for replaying editing sessions
//! deterministically, in tests and from the command line.
//!
//! ## Format
//!
//! One command per line. Line numbers are 1-based; a caret column counts the
//! characters before the caret.
//!
//! - `load "<path>"`: replace the document with a file
//! - `set N "<text>"`, `insert N "<text>"`, `append "<text>"`, `delete N`
//! - `caret L C`: move the caret
//! - `type "<text>"`: type at the caret (`\n` starts a new line)
//! - `backspace [count]`
//! - `wait 100ms` / `wait 2s`: advance the virtual clock
//! - `eval`: run a pass now
//! - `vars`, `show`: record the variable listing or the document text
//! - `# comment`
//!
//! ## Example
//!
//! ```text
//! set 1 "price = 20"
//! append "price * 3"
//! caret 2 9
//! type " =>"          # marker typed: evaluates at once
//! show
//! ```

use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputScriptError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Empty script")]
    EmptyScript,

    #[error("Invalid delay format: {0}")]
    InvalidDelay(String),
}

/// A single scripted action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    Load(String),
    /// Replace line `line` (1-based)
    Set { line: usize, text: String },
    /// Insert before line `line` (1-based)
    Insert { line: usize, text: String },
    Append(String),
    Delete(usize),
    Caret { line: usize, column: usize },
    Type(String),
    Backspace(usize),
    /// Advance the clock (milliseconds)
    Wait(u64),
    Eval,
    Vars,
    Show,
}

impl ScriptCommand {
    /// True for commands that change the document text
    pub fn is_edit(&self) -> bool {
        matches!(
            self,
            ScriptCommand::Load(_)
                | ScriptCommand::Set { .. }
                | ScriptCommand::Insert { .. }
                | ScriptCommand::Append(_)
                | ScriptCommand::Delete(_)
                | ScriptCommand::Type(_)
                | ScriptCommand::Backspace(_)
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct InputScript {
    commands: VecDeque<ScriptCommand>,
}

impl InputScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a script from text
    pub fn from_text(text: &str) -> Result<Self, InputScriptError> {
        let mut commands = VecDeque::new();

        for (index, line) in text.lines().enumerate() {
            let line = strip_comment(line).trim();
            if line.is_empty() {
                continue;
            }
            commands.push_back(Self::parse_line(line, index + 1)?);
        }

        if commands.is_empty() {
            return Err(InputScriptError::EmptyScript);
        }
        Ok(Self { commands })
    }

    fn parse_line(line: &str, line_num: usize) -> Result<ScriptCommand, InputScriptError> {
        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (line, ""),
        };
        let err = |message: String| InputScriptError::ParseError {
            line: line_num,
            message,
        };

        let command = match keyword.to_lowercase().as_str() {
            "load" => ScriptCommand::Load(parse_quoted(rest).map_err(err)?),
            "set" => {
                let (line, text) = parse_line_and_text(rest).map_err(err)?;
                ScriptCommand::Set { line, text }
            }
            "insert" => {
                let (line, text) = parse_line_and_text(rest).map_err(err)?;
                ScriptCommand::Insert { line, text }
            }
            "append" => ScriptCommand::Append(parse_quoted(rest).map_err(err)?),
            "delete" => ScriptCommand::Delete(parse_line_number(rest).map_err(err)?),
            "caret" => {
                let mut parts = rest.split_whitespace();
                let (Some(line), Some(column), None) = (parts.next(), parts.next(), parts.next())
                else {
                    return Err(err("caret expects a line and a column".to_string()));
                };
                ScriptCommand::Caret {
                    line: parse_line_number(line).map_err(err)?,
                    column: column
                        .parse()
                        .map_err(|_| err(format!("invalid column: {}", column)))?,
                }
            }
            "type" => ScriptCommand::Type(parse_quoted(rest).map_err(err)?),
            "backspace" if rest.is_empty() => ScriptCommand::Backspace(1),
            "backspace" => ScriptCommand::Backspace(
                rest.parse()
                    .map_err(|_| err(format!("invalid count: {}", rest)))?,
            ),
            "wait" => ScriptCommand::Wait(parse_duration(rest).map_err(|e| err(e.to_string()))?),
            "eval" => ScriptCommand::Eval,
            "vars" => ScriptCommand::Vars,
            "show" => ScriptCommand::Show,
            _ => return Err(InputScriptError::UnknownCommand(keyword.to_string())),
        };

        if !rest.is_empty() && matches!(command, ScriptCommand::Eval | ScriptCommand::Vars | ScriptCommand::Show) {
            return Err(err(format!("{} takes no arguments", keyword)));
        }
        Ok(command)
    }

    pub fn next_command(&mut self) -> Option<ScriptCommand> {
        self.commands.pop_front()
    }

    pub fn has_more(&self) -> bool {
        !self.commands.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.commands.len()
    }
}

/// Drops a `#` comment that is not inside a quoted string
fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let mut escaped = false;
    for (offset, ch) in line.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => return &line[..offset],
            _ => {}
        }
    }
    line
}

fn parse_line_number(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(0) => Err("line numbers start at 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("invalid line number: {}", s.trim())),
    }
}

fn parse_line_and_text(s: &str) -> Result<(usize, String), String> {
    let (number, rest) = s
        .split_once(char::is_whitespace)
        .ok_or_else(|| "expected a line number and quoted text".to_string())?;
    Ok((parse_line_number(number)?, parse_quoted(rest.trim())?))
}

/// Parses a double-quoted string with `\"`, `\\`, `\n` and `\t` escapes
fn parse_quoted(s: &str) -> Result<String, String> {
    let inner = s
        .strip_prefix('"')
        .ok_or_else(|| format!("expected quoted text, got: {}", s))?;
    let mut text = String::new();
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                let trailing = chars.as_str().trim();
                if !trailing.is_empty() {
                    return Err(format!("unexpected text after string: {}", trailing));
                }
                return Ok(text);
            }
            '\\' => match chars.next() {
                Some('n') => text.push('\n'),
                Some('t') => text.push('\t'),
                Some('"') => text.push('"'),
                Some('\\') => text.push('\\'),
                Some(other) => return Err(format!("unknown escape: \\{}", other)),
                None => break,
            },
            other => text.push(other),
        }
    }
    Err("unterminated string".to_string())
}

/// Parses a duration string (e.g., "100ms", "1s")
fn parse_duration(s: &str) -> Result<u64, InputScriptError> {
    let s = s.trim().to_lowercase();
    let invalid = || InputScriptError::InvalidDelay(s.clone());

    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().map_err(|_| invalid())
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim()
            .parse::<u64>()
            .ok()
            .and_then(|secs| secs.checked_mul(1000))
            .ok_or_else(invalid)
    } else {
        Err(invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(line: &str) -> ScriptCommand {
        InputScript::from_text(line).unwrap().next_command().unwrap()
    }

    #[test]
    fn test_edit_commands() {
        assert_eq!(
            parse_one(r#"set 2 "x = 1 =>""#),
            ScriptCommand::Set {
                line: 2,
                text: "x = 1 =>".to_string()
            }
        );
        assert_eq!(
            parse_one(r#"insert 1 "top""#),
            ScriptCommand::Insert {
                line: 1,
                text: "top".to_string()
            }
        );
        assert_eq!(parse_one(r#"append "tail""#), ScriptCommand::Append("tail".to_string()));
        assert_eq!(parse_one("delete 3"), ScriptCommand::Delete(3));
        assert_eq!(parse_one("caret 1 8"), ScriptCommand::Caret { line: 1, column: 8 });
        assert_eq!(parse_one("backspace"), ScriptCommand::Backspace(1));
        assert_eq!(parse_one("backspace 3"), ScriptCommand::Backspace(3));
        assert_eq!(parse_one(r#"load "sheet.md""#), ScriptCommand::Load("sheet.md".to_string()));
    }

    #[test]
    fn test_quoted_escapes() {
        assert_eq!(
            parse_one(r#"type "a\n\"b\" \\ c""#),
            ScriptCommand::Type("a\n\"b\" \\ c".to_string())
        );
    }

    #[test]
    fn test_control_commands() {
        let mut script = InputScript::from_text("eval\nVARS\nshow").unwrap();
        assert_eq!(script.remaining(), 3);
        assert_eq!(script.next_command(), Some(ScriptCommand::Eval));
        assert_eq!(script.next_command(), Some(ScriptCommand::Vars));
        assert_eq!(script.next_command(), Some(ScriptCommand::Show));
        assert!(!script.has_more());
    }

    #[test]
    fn test_wait() {
        assert_eq!(parse_one("wait 100ms"), ScriptCommand::Wait(100));
        assert_eq!(parse_one("wait 2s"), ScriptCommand::Wait(2000));
        assert!(matches!(
            InputScript::from_text("wait soon"),
            Err(InputScriptError::ParseError { line: 1, .. })
        ));
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let script =
            InputScript::from_text("# setup\n\nappend \"a # not a comment\"  # trailing\n").unwrap();
        let mut script = script;
        assert_eq!(
            script.next_command(),
            Some(ScriptCommand::Append("a # not a comment".to_string()))
        );
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        assert_eq!(
            InputScript::from_text("eval\nset 0 \"x\"").unwrap_err(),
            InputScriptError::ParseError {
                line: 2,
                message: "line numbers start at 1".to_string()
            }
        );
        assert!(matches!(
            InputScript::from_text("type \"open"),
            Err(InputScriptError::ParseError { line: 1, .. })
        ));
        assert!(matches!(
            InputScript::from_text("show now"),
            Err(InputScriptError::ParseError { .. })
        ));
        assert_eq!(
            InputScript::from_text("jump 4").unwrap_err(),
            InputScriptError::UnknownCommand("jump".to_string())
        );
    }

    #[test]
    fn test_empty_script_error() {
        assert_eq!(
            InputScript::from_text("# nothing\n").unwrap_err(),
            InputScriptError::EmptyScript
        );
    }

    #[test]
    fn test_is_edit() {
        assert!(ScriptCommand::Type("x".to_string()).is_edit());
        assert!(!ScriptCommand::Caret { line: 1, column: 0 }.is_edit());
        assert!(!ScriptCommand::Wait(5).is_edit());
    }
}
