//! # Public API
//!
//! Entry points for turning GUIDO text into a [`Score`].
//!
//! ## Parsing Functions
//!
//! - [`parse()`] - Parse with the default configuration
//! - [`parse_with_config()`] - Parse with explicit warning/trace/strict options
//! - [`parse_file()`] - Read a file and parse it
//!
//! All of them run the time-spine pass before returning, so every node's
//! `time_spine` is its offset from the start of its Sequence.
//!
//! ## Typical Usage
//!
//! ```rust
//! use guido::parse;
//!
//! let source = r#"
//! % two voices
//! { [ \clef<"treble"> c d e f | g*1/2 ],
//!   [ \clef<"bass"> c0/1 ] }
//! "#;
//!
//! let parsed = parse(source)?;
//! assert_eq!(parsed.score.sequences().len(), 2);
//! assert!(parsed.warnings.is_empty());
//! # Ok::<(), guido::GuidoError>(())
//! ```

use std::fs;
use std::path::Path;

use crate::config::ParserConfig;
use crate::error::{GuidoError, Result, Warning};
use crate::parser::Parser;
use crate::score::Score;

/// A successfully parsed document.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub score: Score,
    /// Advisory diagnostics; empty when warnings are disabled.
    pub warnings: Vec<Warning>,
}

/// Parse GUIDO text with the default configuration.
///
/// # Example
/// ```rust
/// use guido::parse;
///
/// let parsed = parse("[ c d e ]")?;
/// let seq = parsed.score.sequences()[0];
/// assert_eq!(parsed.score.children(seq).len(), 3);
/// # Ok::<(), guido::GuidoError>(())
/// ```
///
/// # Errors
/// Returns [`GuidoError::WrongToken`] if the text does not match the grammar,
/// or [`GuidoError::Structural`] for invalid input such as an End tag with no
/// Begin or an octave out of range.
pub fn parse(source: &str) -> Result<Parsed> {
    parse_with_config(source, &ParserConfig::default())
}

/// Parse GUIDO text with explicit options.
///
/// # Example
/// ```rust
/// use guido::{parse_with_config, ParserConfig};
///
/// let strict = ParserConfig { strict: true, ..ParserConfig::default() };
/// assert!(parse_with_config("[ \\mystery c ]", &strict).is_err());
/// ```
pub fn parse_with_config(source: &str, config: &ParserConfig) -> Result<Parsed> {
    Parser::new(config).parse(source)
}

/// Read `path` and parse its contents.
pub fn parse_file(path: impl AsRef<Path>, config: &ParserConfig) -> Result<Parsed> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| GuidoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_with_config(&source, config)
}
