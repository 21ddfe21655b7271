//! # Tokenizer
//!
//! Regex-driven, on-demand tokenizer for GUIDO text. Unlike a classic lexer
//! it does not produce a token stream up front: the parser asks for one token
//! kind at a time with [`Tokenizer::match_token`], which first skips any
//! whitespace and comments and then tries that kind's pattern at the current
//! offset (longest match per kind, anchored at the cursor).
//!
//! Backtracking is done by cloning the cursor. Clones share the source text
//! and a single "deepest position" high-water mark, which is what a failed
//! parse is ultimately reported against.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::GuidoError;

/// Pattern for a note, rest or empty: pitch name, first octave, accidental,
/// second octave, `*num`, `/den`, dots. Every part but the name is optional.
pub(crate) const NOTE_PATTERN: &str = concat!(
    r"(?P<pitch_name>(?:do)|(?:re)|(?:mi)|(?:me)|(?:fa)|(?:sol)|(?:la)|(?:ti)|(?:si)|(?:h)|(?:empty)|[a-g_])",
    r"(?P<octave1>[+\-]?[0-9]+)?",
    r"(?P<accidental>(?:is)|#+|&+)?",
    r"(?P<octave2>[+\-]?[0-9]+)?",
    r"(?:\*(?P<num>[0-9]+))?",
    r"(?:/(?P<den>[0-9]+))?",
    r"(?P<dotting>\.*)",
);

/// Pattern for a tag: `\name`, optional `:id`, optional `<args>`.
pub(crate) const TAG_PATTERN: &str =
    r"\\(?P<name>[A-Za-z_][A-Za-z0-9_]*)(?::(?P<id>[0-9]+))?(?:<(?P<args>[^>]*)>)?";

fn anchored(pattern: &str) -> Regex {
    // Patterns are compile-time constants.
    Regex::new(&format!("^(?:{})", pattern)).expect("invalid built-in token pattern")
}

static NOTE_RE: Lazy<Regex> = Lazy::new(|| anchored(NOTE_PATTERN));
static TAG_RE: Lazy<Regex> = Lazy::new(|| anchored(TAG_PATTERN));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| anchored(r"\s+"));
static LINE_COMMENT_RE: Lazy<Regex> = Lazy::new(|| anchored(r"%(?P<comment>[^\n]*)"));
static BLOCK_COMMENT_RE: Lazy<Regex> = Lazy::new(|| anchored(r"(?s)\(\*.*?\*\)"));

/// Token kinds of the GUIDO language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Barline,        // |
    Note,           // c#1*1/4.
    Tag,            // \name:id<args>
    SequenceStart,  // [
    SequenceEnd,    // ]
    SegmentStart,   // { (also opens a chord)
    SegmentEnd,     // } (also closes a chord)
    GroupingStart,  // ( but not (*
    GroupingEnd,    // )
    Comma,          // ,

    // Filtered: skipped wherever they appear
    Whitespace,
    LineComment,    // % ...
    BlockComment,   // (* ... *)
}

impl TokenKind {
    pub const CHORD_START: TokenKind = TokenKind::SegmentStart;
    pub const CHORD_END: TokenKind = TokenKind::SegmentEnd;

    /// Every significant kind, in the order used to name what was found at a
    /// failure position.
    pub const SIGNIFICANT: [TokenKind; 10] = [
        TokenKind::Barline,
        TokenKind::Note,
        TokenKind::Tag,
        TokenKind::SequenceStart,
        TokenKind::SequenceEnd,
        TokenKind::SegmentStart,
        TokenKind::SegmentEnd,
        TokenKind::GroupingStart,
        TokenKind::GroupingEnd,
        TokenKind::Comma,
    ];

    /// Kinds skipped before every match, tried in this order.
    pub const FILTERED: [TokenKind; 3] = [
        TokenKind::Whitespace,
        TokenKind::LineComment,
        TokenKind::BlockComment,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Barline => "Barline",
            TokenKind::Note => "Note",
            TokenKind::Tag => "Tag",
            TokenKind::SequenceStart => "SequenceStart",
            TokenKind::SequenceEnd => "SequenceEnd",
            TokenKind::SegmentStart => "SegmentStart",
            TokenKind::SegmentEnd => "SegmentEnd",
            TokenKind::GroupingStart => "GroupingStart",
            TokenKind::GroupingEnd => "GroupingEnd",
            TokenKind::Comma => "Comma",
            TokenKind::Whitespace => "Whitespace",
            TokenKind::LineComment => "SingleLineComment",
            TokenKind::BlockComment => "MultiLineComment",
        }
    }

    fn regex(self) -> Option<&'static Regex> {
        match self {
            TokenKind::Note => Some(&*NOTE_RE),
            TokenKind::Tag => Some(&*TAG_RE),
            TokenKind::Whitespace => Some(&*WHITESPACE_RE),
            TokenKind::LineComment => Some(&*LINE_COMMENT_RE),
            TokenKind::BlockComment => Some(&*BLOCK_COMMENT_RE),
            _ => None,
        }
    }

    /// Try this kind at the start of `rest`.
    fn match_at(self, rest: &str) -> Option<Token> {
        let literal = match self {
            TokenKind::Barline => Some("|"),
            TokenKind::SequenceStart => Some("["),
            TokenKind::SequenceEnd => Some("]"),
            TokenKind::SegmentStart => Some("{"),
            TokenKind::SegmentEnd => Some("}"),
            TokenKind::GroupingEnd => Some(")"),
            TokenKind::Comma => Some(","),
            TokenKind::GroupingStart => {
                if rest.starts_with('(') && !rest.starts_with("(*") {
                    Some("(")
                } else {
                    return None;
                }
            }
            _ => None,
        };
        if let Some(literal) = literal {
            return rest.starts_with(literal).then(|| Token {
                kind: self,
                text: literal.to_string(),
                groups: HashMap::new(),
            });
        }

        let regex = self.regex()?;
        let captures = regex.captures(rest)?;
        let whole = captures.get(0)?;
        let groups = regex
            .capture_names()
            .flatten()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|m| (name.to_string(), m.as_str().to_string()))
            })
            .collect();
        Some(Token {
            kind: self,
            text: whole.as_str().to_string(),
            groups,
        })
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A matched token with its named sub-fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Named groups that took part in the match.
    groups: HashMap<String, String>,
}

impl Token {
    /// A named sub-field, or `None` if that group did not participate.
    pub fn get(&self, group: &str) -> Option<&str> {
        self.groups.get(group).map(String::as_str)
    }
}

/// A location in the source, used for diagnostics.
#[derive(Clone, PartialEq, Eq)]
pub struct Position {
    source: Arc<str>,
    offset: usize,
    line: usize,
}

impl Position {
    pub fn new(source: Arc<str>, offset: usize, line: usize) -> Self {
        Self { source, offset, line }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Byte offset into the source.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// 1-based line number.
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based column, counted in characters.
    pub fn column(&self) -> usize {
        let offset = self.offset.min(self.source.len());
        let line_start = self.source[..offset].rfind('\n').map_or(0, |i| i + 1);
        self.source[line_start..offset].chars().count() + 1
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position")
            .field("offset", &self.offset)
            .field("line", &self.line)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mark {
    offset: usize,
    line: usize,
}

/// Cursor over GUIDO source.
///
/// `clone()` produces an independent cursor over the same text that still
/// reports into the shared deepest-position tracker, so a parser can try an
/// alternative on a clone and only adopt it if it succeeds.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    source: Arc<str>,
    current: Mark,
    last: Mark,
    deepest: Rc<Cell<Mark>>,
}

impl Tokenizer {
    pub fn new(source: &str) -> Self {
        let start = Mark { offset: 0, line: 1 };
        Self {
            source: Arc::from(source),
            current: start,
            last: start,
            deepest: Rc::new(Cell::new(start)),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Position of the cursor.
    pub fn position(&self) -> Position {
        self.position_of(self.current)
    }

    /// Start of the most recently matched token.
    pub fn last_position(&self) -> Position {
        self.position_of(self.last)
    }

    /// The deepest position any clone of this cursor has reached.
    pub fn deepest_position(&self) -> Position {
        self.position_of(self.deepest.get())
    }

    fn position_of(&self, mark: Mark) -> Position {
        Position::new(Arc::clone(&self.source), mark.offset, mark.line)
    }

    fn advance(&mut self, len: usize) {
        let end = self.current.offset + len;
        self.current.line += self.source[self.current.offset..end].matches('\n').count();
        self.current.offset = end;
    }

    fn update_deepest(&self) {
        if self.current.offset > self.deepest.get().offset {
            self.deepest.set(self.current);
        }
    }

    fn skip_filtered(&mut self) {
        loop {
            let rest = &self.source[self.current.offset..];
            let skipped = TokenKind::FILTERED
                .iter()
                .find_map(|kind| kind.match_at(rest))
                .map(|token| token.text.len())
                .filter(|len| *len > 0);
            match skipped {
                Some(len) => self.advance(len),
                None => break,
            }
        }
    }

    /// Skip whitespace and comments, then try to match `kind`.
    ///
    /// On success the cursor moves past the token. On failure the cursor is
    /// left after the skipped whitespace and `None` is returned; either way
    /// the deepest-position tracker is updated.
    pub fn match_token(&mut self, kind: TokenKind) -> Option<Token> {
        self.skip_filtered();
        let start = self.current;
        let matched = kind.match_at(&self.source[self.current.offset..]);
        if let Some(token) = &matched {
            self.advance(token.text.len());
            self.last = start;
        }
        self.update_deepest();
        matched
    }

    /// True if only whitespace and comments remain.
    pub fn at_end(&self) -> bool {
        let mut probe = self.clone();
        probe.skip_filtered();
        probe.source[probe.current.offset..].trim().is_empty()
    }

    /// Where the next significant text starts, past whitespace and comments.
    pub fn next_position(&self) -> Position {
        let mut probe = self.clone();
        probe.skip_filtered();
        probe.position()
    }

    /// The error to report when no alternative matched: names the first
    /// significant kind that would match at the deepest position.
    pub fn wrong_token_error(&self) -> GuidoError {
        let deepest = self.deepest.get();
        let rest = &self.source[deepest.offset..];
        let found = TokenKind::SIGNIFICANT
            .iter()
            .find(|kind| kind.match_at(rest).is_some())
            .map_or("<unknown>", |kind| kind.name());
        GuidoError::wrong_token(&self.position_of(deepest), found)
    }

    /// Up to `len` characters of upcoming source on one line, for tracing.
    pub fn preview(&self, len: usize) -> String {
        self.source[self.current.offset..]
            .chars()
            .take(len)
            .filter(|c| *c != '\n' && *c != '\r')
            .collect()
    }
}
