//! # Parser Module
//!
//! Recursive-descent parser for GUIDO text, feeding a [`TreeBuilder`].
//!
//! ## Grammar
//! ```text
//! FILE         := SEGMENT | SEQUENCE
//! SEGMENT      := '{' SEQUENCE? (',' SEQUENCE)* '}'
//! SEQUENCE     := '[' VOICE ']'
//! VOICE        := (BARLINE | EVENT | CHORD | TAG)*
//! CHORD        := '{' CHORD_VOICE (',' CHORD_VOICE)* '}'
//! CHORD_VOICE  := EVENT | TAG*
//! TAG          := tag TAG_GROUPING?
//! TAG_GROUPING := '(' <the production TAG was called from> ')'
//! EVENT        := note
//! BARLINE      := '|'
//! ```
//!
//! ## Backtracking
//! Every alternative runs on a clone of the cursor and the clone is adopted
//! only if the alternative succeeds. A production returns:
//! - `Ok(Some(tokens))` - matched; `tokens` is the advanced cursor
//! - `Ok(None)` - did not match here; the caller tries the next alternative
//! - `Err(_)` - fatal (bad octave, unbalanced tag, ...), aborts the parse
//!
//! When the top level does not match, the error is reported at the deepest
//! position any alternative reached.
//!
//! ## Example
//! ```rust
//! use guido::parse;
//!
//! let parsed = parse(r"[ \clef<treble> c*1/8 d e | \slur(f g) ]").unwrap();
//! let score = &parsed.score;
//! let seq = score.sequences()[0];
//! assert_eq!(score.children(seq).len(), 9);
//! ```

use log::{debug, trace, warn};

use crate::api::Parsed;
use crate::ast::NodeId;
use crate::builder::TreeBuilder;
use crate::config::ParserConfig;
use crate::error::{GuidoError, Result, Warning};
use crate::events::NoteFields;
use crate::lexer::{TokenKind, Tokenizer};
use crate::tags::TagMode;

#[cfg(test)]
mod tests;

/// Outcome of trying one production.
type Step = Result<Option<Tokenizer>>;

/// Which production a parenthesized tag scope contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inner {
    Voice,
    ChordVoice,
}

pub struct Parser<'a> {
    config: &'a ParserConfig,
    builder: TreeBuilder,
    /// Unregistered tag names as written, first occurrence first.
    unknown_tags: Vec<String>,
}

impl<'a> Parser<'a> {
    pub fn new(config: &'a ParserConfig) -> Self {
        Self {
            config,
            builder: TreeBuilder::new(),
            unknown_tags: Vec::new(),
        }
    }

    /// Parse a whole document. The time-spine pass has run on the result.
    pub fn parse(mut self, source: &str) -> Result<Parsed> {
        let tokens = Tokenizer::new(source);
        let end = match self.file(tokens.clone())? {
            Some(end) => end,
            None => return Err(tokens.wrong_token_error()),
        };

        let mut warnings = Vec::new();
        if !end.at_end() {
            let pos = end.next_position();
            if self.config.strict {
                return Err(GuidoError::structural(Some(&pos), "Extra text at end of file."));
            }
            warnings.push(Warning::TrailingInput {
                line: pos.line(),
                column: pos.column(),
            });
        }
        if !self.unknown_tags.is_empty() {
            let warning = Warning::UnknownTags(std::mem::take(&mut self.unknown_tags));
            if self.config.strict {
                return Err(GuidoError::Unpositioned {
                    message: warning.to_string(),
                });
            }
            warnings.push(warning);
        }
        if self.config.warnings {
            for warning in &warnings {
                warn!("{}", warning);
            }
        } else {
            warnings.clear();
        }

        let mut score = self.builder.finish();
        score.calc_time_spines()?;
        debug!("parsed {} nodes", score.node_count());
        Ok(Parsed { score, warnings })
    }

    fn trace(&self, production: &str, tokens: &Tokenizer) {
        if self.config.trace {
            trace!("{:<20}: {}", production, tokens.preview(20));
        }
    }

    fn file(&mut self, tokens: Tokenizer) -> Step {
        self.trace("FILE", &tokens);
        if let Some(tokens) = self.segment(tokens.clone())? {
            return Ok(Some(tokens));
        }
        self.sequence(tokens)
    }

    fn segment(&mut self, mut tokens: Tokenizer) -> Step {
        self.trace("SEGMENT", &tokens);
        if tokens.match_token(TokenKind::SegmentStart).is_none() {
            return Ok(None);
        }
        self.builder.begin_segment(Some(tokens.last_position()))?;
        if let Some(next) = self.sequence(tokens.clone())? {
            tokens = next;
        }
        loop {
            let mut attempt = tokens.clone();
            if attempt.match_token(TokenKind::Comma).is_none() {
                break;
            }
            tokens = match self.sequence(attempt)? {
                Some(next) => next,
                None => return Ok(None),
            };
        }
        if tokens.match_token(TokenKind::SegmentEnd).is_none() {
            return Ok(None);
        }
        self.builder.end_segment()?;
        Ok(Some(tokens))
    }

    fn sequence(&mut self, mut tokens: Tokenizer) -> Step {
        self.trace("SEQUENCE", &tokens);
        if tokens.match_token(TokenKind::SequenceStart).is_none() {
            return Ok(None);
        }
        self.builder.begin_sequence(Some(tokens.last_position()))?;
        let mut tokens = self.voice(tokens)?;
        if tokens.match_token(TokenKind::SequenceEnd).is_none() {
            return Ok(None);
        }
        self.builder.end_sequence()?;
        Ok(Some(tokens))
    }

    /// Never fails to match: stops at the first thing it doesn't recognise.
    fn voice(&mut self, mut tokens: Tokenizer) -> Result<Tokenizer> {
        self.trace("VOICE", &tokens);
        loop {
            if let Some(next) = self.barline(tokens.clone())? {
                tokens = next;
            } else if let Some(next) = self.event(tokens.clone())? {
                tokens = next;
            } else if let Some(next) = self.chord(tokens.clone())? {
                tokens = next;
            } else if let Some(next) = self.tag(tokens.clone(), Inner::Voice)? {
                tokens = next;
            } else {
                return Ok(tokens);
            }
        }
    }

    fn event(&mut self, mut tokens: Tokenizer) -> Step {
        self.trace("EVENT", &tokens);
        let Some(note) = tokens.match_token(TokenKind::Note) else {
            return Ok(None);
        };
        let fields = NoteFields::from_token(&note);
        self.builder.add_note_fields(&fields, Some(tokens.last_position()))?;
        Ok(Some(tokens))
    }

    fn tag(&mut self, mut tokens: Tokenizer, inner: Inner) -> Step {
        self.trace("TAG", &tokens);
        let Some(token) = tokens.match_token(TokenKind::Tag) else {
            return Ok(None);
        };
        let name = token.get("name").unwrap_or_default();
        let node = self.builder.add_tag(
            name,
            token.get("id"),
            token.get("args"),
            Some(tokens.last_position()),
        )?;

        let (generic, mode) = match self.builder.score().tag(node) {
            Some(tag) => (tag.is_generic(), tag.mode),
            None => (false, TagMode::None),
        };
        if generic && !self.unknown_tags.iter().any(|t| t == name) {
            self.unknown_tags.push(name.to_string());
        }

        // An End tag closes a scope, it cannot open one.
        if mode != TagMode::End {
            if let Some(next) = self.tag_grouping(tokens.clone(), node, inner)? {
                tokens = next;
            }
        }
        Ok(Some(tokens))
    }

    fn tag_grouping(&mut self, mut tokens: Tokenizer, tag: NodeId, inner: Inner) -> Step {
        self.trace("TAG_GROUPING", &tokens);
        if tokens.match_token(TokenKind::GroupingStart).is_none() {
            return Ok(None);
        }
        self.builder.begin_tag_grouping(tag);
        let mut tokens = match inner {
            Inner::Voice => self.voice(tokens)?,
            Inner::ChordVoice => self.chord_voice(tokens)?,
        };
        if tokens.match_token(TokenKind::GroupingEnd).is_none() {
            return Ok(None);
        }
        self.builder.end_tag_grouping(tag)?;
        Ok(Some(tokens))
    }

    fn chord(&mut self, mut tokens: Tokenizer) -> Step {
        self.trace("CHORD", &tokens);
        if tokens.match_token(TokenKind::CHORD_START).is_none() {
            return Ok(None);
        }
        self.builder.begin_chord(Some(tokens.last_position()))?;
        let mut tokens = self.chord_voice(tokens)?;
        loop {
            let mut attempt = tokens.clone();
            if attempt.match_token(TokenKind::Comma).is_none() {
                break;
            }
            tokens = self.chord_voice(attempt)?;
        }
        if tokens.match_token(TokenKind::CHORD_END).is_none() {
            return Ok(None);
        }
        self.builder.end_chord()?;
        Ok(Some(tokens))
    }

    /// One event, or else any number of tags.
    fn chord_voice(&mut self, mut tokens: Tokenizer) -> Result<Tokenizer> {
        self.trace("CHORD_VOICE", &tokens);
        if let Some(next) = self.event(tokens.clone())? {
            return Ok(next);
        }
        while let Some(next) = self.tag(tokens.clone(), Inner::ChordVoice)? {
            tokens = next;
        }
        Ok(tokens)
    }

    fn barline(&mut self, mut tokens: Tokenizer) -> Step {
        self.trace("BARLINE", &tokens);
        if tokens.match_token(TokenKind::Barline).is_none() {
            return Ok(None);
        }
        self.builder.add_barline(Some(tokens.last_position()))?;
        Ok(Some(tokens))
    }
}
