//! # Error Types
//!
//! This module defines all error types for the GUIDO parser.
//!
//! Parse failures come in two flavours:
//! - `WrongToken` - no grammar alternative matched. Raised only once every
//!   alternative at the top level has been tried, and located at the deepest
//!   position any attempt reached.
//! - `Structural` - the input was recognised but is invalid (mismatched tags,
//!   bad tag arguments, octave out of range, zero denominator...). These abort
//!   the parse immediately.
//!
//! Both carry a pre-rendered `report`: the line number, a window of source
//! around the failure, a caret under the failing column, and the wrapped
//! message.
//!
//! Non-fatal problems (unknown tags, trailing text) are [`Warning`]s and are
//! returned alongside the score instead of as an `Err`.
//!
//! ## Usage
//! ```rust
//! use guido::{parse, GuidoError};
//!
//! match parse("[ \\slurEnd a ]") {
//!     Ok(_) => unreachable!(),
//!     Err(GuidoError::Structural { line, message, .. }) => {
//!         assert_eq!(line, 1);
//!         assert!(message.contains("slurEnd"));
//!     }
//!     Err(e) => panic!("unexpected error: {}", e),
//! }
//! ```

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::lexer::Position;

/// Half-width of the source window shown in a report.
const WINDOW: usize = 35;

/// Column at which report messages are wrapped.
const WRAP_WIDTH: usize = 70;

pub type Result<T> = std::result::Result<T, GuidoError>;

#[derive(Error, Debug)]
pub enum GuidoError {
    /// No grammar alternative matched at the deepest position reached.
    ///
    /// `found` names the lexical kind that does start at that position, or
    /// `<unknown>` when nothing recognisable does.
    #[error("{report}")]
    WrongToken {
        line: usize,
        column: usize,
        found: String,
        report: String,
    },

    /// Fatal error tied to a source position.
    #[error("{report}")]
    Structural {
        line: usize,
        column: usize,
        message: String,
        report: String,
    },

    /// Fatal error raised where no source position is known, e.g. when a
    /// converter builds nodes directly.
    #[error("{message}")]
    Unpositioned { message: String },

    /// Parser configuration could not be read.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// An input file could not be read.
    #[error("Error reading '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GuidoError {
    /// Build a fatal error at `pos`, or an unpositioned one if there is no
    /// position to report.
    pub fn structural(pos: Option<&Position>, message: impl Into<String>) -> Self {
        let message = message.into();
        match pos {
            Some(pos) => GuidoError::Structural {
                line: pos.line(),
                column: pos.column(),
                report: render_report(pos, &message),
                message,
            },
            None => GuidoError::Unpositioned { message },
        }
    }

    pub fn wrong_token(pos: &Position, found: impl Into<String>) -> Self {
        let found = found.into();
        let message = format!("Parse error.  Cannot have {} here.", found);
        GuidoError::WrongToken {
            line: pos.line(),
            column: pos.column(),
            report: render_report(pos, &message),
            found,
        }
    }

    /// Line of the failure, if the error is positioned.
    pub fn line(&self) -> Option<usize> {
        match self {
            GuidoError::WrongToken { line, .. } | GuidoError::Structural { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Advisory diagnostics collected during a parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Text remained after the top-level production finished.
    TrailingInput { line: usize, column: usize },
    /// Tags whose names matched no registered kind, as written.
    UnknownTags(Vec<String>),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::TrailingInput { line, column } => {
                write!(f, "Extra text at end of file (line {}, column {})", line, column)
            }
            Warning::UnknownTags(names) => {
                let names: Vec<String> = names.iter().map(|n| format!("\\{}", n)).collect();
                write!(f, "Unknown tags:\n{}", wrap(&names.join(", "), WRAP_WIDTH))
            }
        }
    }
}

/// Render the multi-line diagnostic for `message` at `pos`.
pub fn render_report(pos: &Position, message: &str) -> String {
    let source = pos.source();
    let mut offset = pos.offset().min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }

    let mut before: Vec<char> = source[..offset]
        .chars()
        .rev()
        .take(WINDOW)
        .take_while(|c| *c != '\n')
        .collect();
    before.reverse();
    let after: String = source[offset..]
        .chars()
        .take(WINDOW)
        .take_while(|c| *c != '\n')
        .collect();

    let excerpt: String = before.iter().collect::<String>() + &after;
    let excerpt = excerpt.replace(['\r', '\n'], "");

    format!(
        "\nAt line {}:\n{}\n{}^\n{}",
        pos.line(),
        excerpt,
        " ".repeat(before.len()),
        wrap(message, WRAP_WIDTH)
    )
}

/// Greedy word wrap.
fn wrap(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn position(source: &str, offset: usize) -> Position {
        let line = source[..offset].matches('\n').count() + 1;
        Position::new(Arc::from(source), offset, line)
    }

    #[test]
    fn test_report_has_caret_under_column() {
        let source = "[ a b\n  c } ]";
        let pos = position(source, 10);
        let report = render_report(&pos, "Parse error.");
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[1], "At line 2:");
        assert_eq!(lines[2], "  c } ]");
        assert_eq!(lines[3], "    ^");
        assert_eq!(lines[4], "Parse error.");
    }

    #[test]
    fn test_report_window_is_clipped() {
        let source = format!("[{}]", "a ".repeat(100));
        let pos = position(&source, 101);
        let report = render_report(&pos, "x");
        let excerpt = report.lines().nth(2).unwrap();
        assert_eq!(excerpt.chars().count(), 70);
        assert_eq!(report.lines().nth(3).unwrap(), format!("{}^", " ".repeat(35)));
    }

    #[test]
    fn test_wrap_long_message() {
        let message = "word ".repeat(40);
        let wrapped = wrap(&message, 70);
        assert!(wrapped.lines().count() > 1);
        assert!(wrapped.lines().all(|l| l.chars().count() <= 70));
    }

    #[test]
    fn test_structural_without_position() {
        let err = GuidoError::structural(None, "Too many dots.");
        assert!(matches!(err, GuidoError::Unpositioned { .. }));
        assert_eq!(err.to_string(), "Too many dots.");
        assert_eq!(err.line(), None);
    }

    #[test]
    fn test_unknown_tags_warning_display() {
        let warning = Warning::UnknownTags(vec!["foo".to_string(), "barBegin".to_string()]);
        assert_eq!(warning.to_string(), "Unknown tags:\n\\foo, \\barBegin");
    }
}
