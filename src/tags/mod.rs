//! # Tags
//!
//! A tag is an annotation: `\name:id<args>`. It can stand alone, open a scope
//! with a `Begin` suffix and close it with `End`, or wrap a parenthesized
//! span: `\slur(a b c)`.
//!
//! Names resolve through a fixed registry ([`TagKind`]) with aliases
//! (`\sl` is a slur). An unregistered name becomes a `Generic` tag that keeps
//! its name as written; the parser reports those as a warning.
//!
//! Registered kinds whose arguments matter downstream carry typed data
//! ([`TagData`]) that is validated at construction.

pub mod args;
pub mod kind;
pub mod payload;

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

pub use args::TagArgs;
pub use kind::TagKind;
pub use payload::{Clef, KeySignature, Mode, TagData, Tempo, TimeSignature};

use crate::ast::NodeId;
use crate::error::{GuidoError, Result};
use crate::lexer::{Position, TAG_PATTERN};

static TAG_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("invalid tag name pattern"));

static TAG_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{}$", TAG_PATTERN)).expect("invalid tag pattern"));

/// Scope mode of a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagMode {
    /// Self-contained
    #[default]
    None,
    Begin,
    End,
}

impl TagMode {
    pub fn suffix(self) -> &'static str {
        match self {
            TagMode::None => "",
            TagMode::Begin => "Begin",
            TagMode::End => "End",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub kind: TagKind,
    /// Name as written, minus any Begin/End suffix.
    pub name: String,
    pub id: Option<u32>,
    pub mode: TagMode,
    /// Written as `\name( ... )`.
    pub use_parens: bool,
    pub args: Vec<String>,
    pub kwargs: Vec<(String, String)>,
    /// Nodes in this tag's scope, in the order they were added.
    pub events: Vec<NodeId>,
    pub data: TagData,
}

impl Tag {
    /// Key under which tagged nodes record this tag.
    pub fn key(&self) -> &str {
        match self.kind {
            TagKind::Generic => &self.name,
            kind => kind.canonical_name(),
        }
    }

    pub fn full_name(&self) -> String {
        match self.id {
            Some(id) => format!("{}:{}", self.name, id),
            None => self.name.clone(),
        }
    }

    pub fn is_generic(&self) -> bool {
        self.kind == TagKind::Generic
    }

    pub fn kwarg(&self, key: &str) -> Option<&str> {
        self.kwargs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// True for the same (name, id) pair, which is how End tags find their Begin.
    pub fn same_scope(&self, other: &Tag) -> bool {
        self.name == other.name && self.id == other.id
    }

    /// Text of a text-family or lyrics tag.
    pub fn text(&self) -> Option<&str> {
        match &self.data {
            TagData::Text(text) | TagData::Lyrics { text, .. } => Some(text),
            TagData::Fingering { text, .. } => Some(text),
            _ => None,
        }
    }

    /// An End-mode copy with no arguments and an empty scope, used to close
    /// this tag.
    pub fn closing_copy(&self) -> Tag {
        Tag {
            mode: TagMode::End,
            args: Vec::new(),
            kwargs: Vec::new(),
            events: Vec::new(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\\{}{}", self.name, self.mode.suffix())?;
        if let Some(id) = self.id {
            write!(f, ":{}", id)?;
        }
        Ok(())
    }
}

/// Builds tags from a name, optional id and arguments.
pub struct TagFactory;

impl TagFactory {
    /// Resolve `name` and construct the tag.
    ///
    /// A registered name is used whole (`repeatBegin` is its own kind).
    /// Otherwise a `Begin`/`End` suffix is stripped into the mode and the
    /// rest looked up again; still unknown gives a `Generic` tag.
    pub fn create(
        name: &str,
        id: Option<&str>,
        args: TagArgs,
        pos: Option<&Position>,
    ) -> Result<Tag> {
        if name.starts_with('\\') {
            return TagFactory::from_text(name, pos);
        }
        if !TAG_NAME_RE.is_match(name) {
            return Err(GuidoError::structural(pos, format!("'{}' is an invalid tag name.", name)));
        }

        let id = id
            .map(|id| {
                id.parse::<u32>().map_err(|_| {
                    GuidoError::structural(pos, format!("'{}' is an invalid tag id number.", id))
                })
            })
            .transpose()?;

        let (args, kwargs) = args.split(name, pos)?;

        let (kind, base, mode) = match TagKind::lookup(name) {
            Some(kind) => (kind, name, TagMode::None),
            None => {
                let (base, mode) = if let Some(base) = name.strip_suffix("Begin").filter(|b| !b.is_empty()) {
                    (base, TagMode::Begin)
                } else if let Some(base) = name.strip_suffix("End").filter(|b| !b.is_empty()) {
                    (base, TagMode::End)
                } else {
                    (name, TagMode::None)
                };
                (TagKind::lookup(base).unwrap_or(TagKind::Generic), base, mode)
            }
        };

        // Closing tags don't repeat their opening arguments.
        let data = if mode == TagMode::End {
            TagData::None
        } else {
            TagData::build(kind, base, &args, &kwargs, pos)?
        };

        Ok(Tag {
            kind,
            name: base.to_string(),
            id,
            mode,
            use_parens: false,
            args,
            kwargs,
            events: Vec::new(),
            data,
        })
    }

    /// Construct from tag text such as `\clef<"treble">`.
    pub fn from_text(text: &str, pos: Option<&Position>) -> Result<Tag> {
        let captures = TAG_TEXT_RE
            .captures(text)
            .ok_or_else(|| GuidoError::structural(pos, format!("'{}' is not a valid tag.", text)))?;
        let args = TagArgs::from(captures.name("args").map(|m| m.as_str()));
        TagFactory::create(
            &captures["name"],
            captures.name("id").map(|m| m.as_str()),
            args,
            pos,
        )
    }
}
