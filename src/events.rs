//! # Event Construction
//!
//! Turns a note token into a Note, Rest or Empty.
//!
//! GUIDO lets consecutive events omit what they share with the previous one
//! (`[c2*1/8 d e f]` is four eighth notes in octave 2). [`FillForward`] holds
//! the previous event's resolved fields for the current sequence and fills
//! the gaps:
//!
//! - no `*num` and no `/den`: both inherited, and the dots too if none are written
//! - `/den` only: numerator is 1
//! - `*num` only: denominator inherited
//! - octave: first octave, else the one after the accidental, else inherited
//!
//! What is remembered is the event's *stored* duration, after normalization,
//! so `[a*3/8 b]` gives `b` a dotted quarter, not a raw 3/8.

use crate::ast::{Duration, Note, NodeKind, Pitch};
use crate::error::{GuidoError, Result};
use crate::lexer::{Position, Token, NOTE_PATTERN};

use once_cell::sync::Lazy;
use regex::Regex;

static NOTE_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^(?:{})$", NOTE_PATTERN)).expect("invalid note pattern"));

/// Raw sub-fields of a note token, as written.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NoteFields {
    pub pitch_name: String,
    pub octave1: Option<String>,
    pub accidental: Option<String>,
    pub octave2: Option<String>,
    pub num: Option<String>,
    pub den: Option<String>,
    pub dotting: String,
}

impl NoteFields {
    pub fn from_token(token: &Token) -> Self {
        let field = |name: &str| token.get(name).map(str::to_string);
        Self {
            pitch_name: token.get("pitch_name").unwrap_or_default().to_string(),
            octave1: field("octave1"),
            accidental: field("accidental"),
            octave2: field("octave2"),
            num: field("num"),
            den: field("den"),
            dotting: token.get("dotting").unwrap_or_default().to_string(),
        }
    }

    /// Parse standalone event text such as `"fis2*3/8."`.
    pub fn parse(text: &str) -> Option<Self> {
        let captures = NOTE_TEXT_RE.captures(text)?;
        let field = |name: &str| captures.name(name).map(|m| m.as_str().to_string());
        Some(Self {
            pitch_name: field("pitch_name")?,
            octave1: field("octave1"),
            accidental: field("accidental"),
            octave2: field("octave2"),
            num: field("num"),
            den: field("den"),
            dotting: field("dotting").unwrap_or_default(),
        })
    }
}

/// Fully resolved event description.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSpec {
    pub pitch_name: String,
    pub octave: i64,
    pub accidental: String,
    pub num: u32,
    pub den: u32,
    pub dotting: Option<u8>,
}

/// Per-sequence memory of the previous event.
#[derive(Debug, Clone, PartialEq)]
pub struct FillForward {
    pub octave: i64,
    pub num: u32,
    pub den: u32,
    pub dotting: u8,
}

impl Default for FillForward {
    fn default() -> Self {
        Self {
            octave: 1,
            num: 1,
            den: 4,
            dotting: 0,
        }
    }
}

fn parse_number<T: std::str::FromStr>(text: &str, what: &str, pos: Option<&Position>) -> Result<T> {
    text.trim_start_matches('+')
        .parse()
        .map_err(|_| GuidoError::structural(pos, format!("'{}' is not a valid {}.", text, what)))
}

impl FillForward {
    /// Fill the omitted fields of `fields` from the previous event.
    pub fn resolve(&self, fields: &NoteFields, pos: Option<&Position>) -> Result<EventSpec> {
        let dots = u8::try_from(fields.dotting.len()).unwrap_or(u8::MAX);
        let num = fields
            .num
            .as_deref()
            .map(|n| parse_number::<u32>(n, "duration numerator", pos))
            .transpose()?;
        let den = fields
            .den
            .as_deref()
            .map(|d| parse_number::<u32>(d, "duration denominator", pos))
            .transpose()?;

        let (num, den, dotting) = match (num, den) {
            (None, None) => {
                let dotting = if fields.dotting.is_empty() { self.dotting } else { dots };
                (self.num, self.den, dotting)
            }
            (None, Some(den)) => (1, den, dots),
            (Some(num), None) => (num, self.den, dots),
            (Some(num), Some(den)) => (num, den, dots),
        };

        let octave = match fields.octave1.as_deref().or(fields.octave2.as_deref()) {
            Some(octave) => parse_number::<i64>(octave, "octave", pos)?,
            None => self.octave,
        };

        Ok(EventSpec {
            pitch_name: fields.pitch_name.clone(),
            octave,
            accidental: fields.accidental.clone().unwrap_or_default(),
            num,
            den,
            dotting: Some(dotting),
        })
    }

    /// Remember a constructed event for the next one.
    pub fn remember(&mut self, octave: i64, duration: &Duration) {
        self.octave = octave;
        self.num = duration.num();
        self.den = duration.den();
        self.dotting = duration.dotting();
    }
}

/// Builds event nodes.
pub struct EventFactory;

impl EventFactory {
    /// `_` is a rest, `empty` an empty, anything else a note.
    pub fn create(spec: &EventSpec, pos: Option<&Position>) -> Result<NodeKind> {
        match spec.pitch_name.as_str() {
            "_" => Ok(NodeKind::Rest(Duration::new(spec.num, spec.den, spec.dotting, pos)?)),
            "empty" => Ok(NodeKind::Empty(Duration::new(spec.num, spec.den, spec.dotting, pos)?)),
            name => {
                let pitch = Pitch::new(name, spec.octave, &spec.accidental, pos)?;
                let duration = Duration::new(spec.num, spec.den, spec.dotting, pos)?;
                Ok(NodeKind::Note(Note { pitch, duration }))
            }
        }
    }

    /// Build from event text with default fill-forward state.
    pub fn from_text(text: &str, pos: Option<&Position>) -> Result<NodeKind> {
        let fields = NoteFields::parse(text).ok_or_else(|| {
            GuidoError::structural(
                pos,
                format!("'{}' is not a valid GUIDO pitch name, note or rest.", text),
            )
        })?;
        let spec = FillForward::default().resolve(&fields, pos)?;
        EventFactory::create(&spec, pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(text: &str) -> NoteFields {
        NoteFields::parse(text).unwrap()
    }

    #[test]
    fn test_defaults() {
        let spec = FillForward::default().resolve(&fields("c"), None).unwrap();
        assert_eq!((spec.octave, spec.num, spec.den, spec.dotting), (1, 1, 4, Some(0)));
        assert_eq!(spec.accidental, "");
    }

    #[test]
    fn test_inherit_both_and_dots() {
        let prev = FillForward { octave: 2, num: 1, den: 4, dotting: 1 };
        let spec = prev.resolve(&fields("d"), None).unwrap();
        assert_eq!((spec.octave, spec.num, spec.den, spec.dotting), (2, 1, 4, Some(1)));

        let spec = prev.resolve(&fields("d.."), None).unwrap();
        assert_eq!(spec.dotting, Some(2));
    }

    #[test]
    fn test_denominator_only_sets_numerator_one() {
        let prev = FillForward { octave: 1, num: 3, den: 8, dotting: 0 };
        let spec = prev.resolve(&fields("e/16"), None).unwrap();
        assert_eq!((spec.num, spec.den), (1, 16));
    }

    #[test]
    fn test_numerator_only_inherits_denominator() {
        let prev = FillForward { octave: 1, num: 1, den: 8, dotting: 0 };
        let spec = prev.resolve(&fields("e*3"), None).unwrap();
        assert_eq!((spec.num, spec.den), (3, 8));
    }

    #[test]
    fn test_octave_preference() {
        let prev = FillForward::default();
        assert_eq!(prev.resolve(&fields("c2#-1"), None).unwrap().octave, 2);
        assert_eq!(prev.resolve(&fields("c#-1"), None).unwrap().octave, -1);
        assert_eq!(prev.resolve(&fields("c+3"), None).unwrap().octave, 3);
    }

    #[test]
    fn test_create_kinds() {
        assert!(matches!(EventFactory::from_text("_/8", None).unwrap(), NodeKind::Rest(_)));
        assert!(matches!(EventFactory::from_text("empty*1/2", None).unwrap(), NodeKind::Empty(_)));
        match EventFactory::from_text("fis2*3/8", None).unwrap() {
            NodeKind::Note(note) => {
                assert_eq!(note.pitch.octave(), 2);
                assert_eq!(note.pitch.accidental().as_str(), "is");
                assert_eq!(
                    (note.duration.num(), note.duration.den(), note.duration.dotting()),
                    (1, 4, 1)
                );
            }
            other => panic!("Expected note, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_event_text() {
        assert!(EventFactory::from_text("x", None).is_err());
        assert!(EventFactory::from_text("c7", None).is_err());
        assert!(EventFactory::from_text("c###", None).is_err());
        assert!(EventFactory::from_text("c/0", None).is_err());
        assert!(EventFactory::from_text("c...", None).is_err());
    }

    #[test]
    fn test_remember_uses_stored_fields() {
        let mut state = FillForward::default();
        let duration = Duration::new(3, 8, None, None).unwrap();
        state.remember(2, &duration);
        assert_eq!(state, FillForward { octave: 2, num: 1, den: 4, dotting: 1 });
    }
}
