//! # Tree Builder
//!
//! Receives notifications from the parser (begin/end a collection, add an
//! event, tag or barline) and assembles the [`Score`] arena.
//!
//! ## State
//! - `stack`: open collections; the top is where `add` appends.
//! - `active_tags`: Begin-mode and parenthesized tags still open, oldest
//!   first. Every node added while a tag is active is attached to it.
//! - `fill_forward`: previous event's fields, reset at each Sequence.
//!
//! ## Tag scopes
//! An End tag closes the most recent open tag with the same name and id; an
//! End with nothing to close is fatal. At the end of a Sequence any tag
//! still open is closed with a synthetic End tag, innermost first, so no tag
//! leaks into the next Sequence.
//!
//! Nodes added inside a chord are recorded on the node for every active tag,
//! but only join a tag's scope list if the chord itself is not already in it.

use log::debug;

use crate::ast::{CollectionKind, NodeId, NodeKind};
use crate::error::{GuidoError, Result};
use crate::events::{EventFactory, EventSpec, FillForward, NoteFields};
use crate::lexer::Position;
use crate::score::Score;
use crate::tags::{TagArgs, TagFactory, TagMode};

pub struct TreeBuilder {
    score: Score,
    stack: Vec<NodeId>,
    active_tags: Vec<NodeId>,
    fill_forward: FillForward,
    last_event: Option<NodeId>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        let score = Score::new();
        let root = score.root();
        Self {
            score,
            stack: vec![root],
            active_tags: Vec::new(),
            fill_forward: FillForward::default(),
            last_event: None,
        }
    }

    pub fn score(&self) -> &Score {
        &self.score
    }

    /// Hand over the finished score.
    pub fn finish(self) -> Score {
        self.score
    }

    /// The collection `add` appends to.
    pub fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.score.root())
    }

    fn current_is(&self, kind: CollectionKind) -> bool {
        self.score.collection_kind(self.current()) == Some(kind)
    }

    pub fn active_tags(&self) -> &[NodeId] {
        &self.active_tags
    }

    // High-level interface, one call per parser notification.

    pub fn begin_segment(&mut self, pos: Option<Position>) -> Result<NodeId> {
        self.set_as_collection(CollectionKind::Segment, pos)
    }

    pub fn end_segment(&mut self) -> Result<()> {
        self.reset_collection(CollectionKind::Segment)
    }

    pub fn begin_sequence(&mut self, pos: Option<Position>) -> Result<NodeId> {
        self.fill_forward = FillForward::default();
        self.set_as_collection(CollectionKind::Sequence, pos)
    }

    pub fn end_sequence(&mut self) -> Result<()> {
        if self.current_is(CollectionKind::Chord) {
            self.reset_collection(CollectionKind::Chord)?;
        }
        while let Some(open) = self.active_tags.pop() {
            let Some(tag) = self.score.tag(open) else { continue };
            debug!("closing unterminated {} at end of sequence", tag);
            let closing = tag.closing_copy();
            let pos = self.score.node(open).pos.clone();
            let node = self.score.alloc(NodeKind::Tag(closing), pos);
            self.add(node)?;
        }
        self.reset_collection(CollectionKind::Sequence)
    }

    pub fn begin_chord(&mut self, pos: Option<Position>) -> Result<NodeId> {
        self.set_as_collection(CollectionKind::Chord, pos)
    }

    pub fn end_chord(&mut self) -> Result<()> {
        self.reset_collection(CollectionKind::Chord)
    }

    /// Resolve a note token against fill-forward state and add the event.
    pub fn add_note_fields(&mut self, fields: &NoteFields, pos: Option<Position>) -> Result<NodeId> {
        let spec = self.fill_forward.resolve(fields, pos.as_ref())?;
        self.add_event(&spec, pos)
    }

    pub fn add_event(&mut self, spec: &EventSpec, pos: Option<Position>) -> Result<NodeId> {
        let node = self.create_event(spec, pos)?;
        self.add(node)?;
        self.last_event = Some(node);
        Ok(node)
    }

    pub fn add_empty(&mut self, num: u32, den: u32) -> Result<NodeId> {
        let spec = EventSpec {
            pitch_name: "empty".to_string(),
            octave: self.fill_forward.octave,
            accidental: String::new(),
            num,
            den,
            dotting: None,
        };
        self.add_event(&spec, None)
    }

    /// Add an event sounding with the previous one, turning the previous
    /// event into a chord if it is not in one already.
    pub fn add_event_to_chord(&mut self, spec: &EventSpec, pos: Option<Position>) -> Result<NodeId> {
        let node = self.create_event(spec, pos)?;
        if !self.current_is(CollectionKind::Chord) {
            let last = self.last_event.ok_or_else(|| {
                GuidoError::structural(None, "There is no previous event to build a chord from.")
            })?;
            let current = self.current();
            let chord = self.score.alloc(NodeKind::collection(CollectionKind::Chord), None);
            self.score.replace_child(current, last, chord)?;
            self.score.append(chord, last)?;
            self.stack.push(chord);
        }
        self.add(node)?;
        self.last_event = Some(node);
        Ok(node)
    }

    /// Add an event after closing any chord left open by
    /// [`add_event_to_chord`](Self::add_event_to_chord).
    pub fn add_event_not_in_chord(&mut self, spec: &EventSpec, pos: Option<Position>) -> Result<NodeId> {
        if self.current_is(CollectionKind::Chord) {
            self.reset_collection(CollectionKind::Chord)?;
        }
        self.add_event(spec, pos)
    }

    fn create_event(&mut self, spec: &EventSpec, pos: Option<Position>) -> Result<NodeId> {
        let kind = EventFactory::create(spec, pos.as_ref())?;
        let node = self.score.alloc(kind, pos);
        if let Some(duration) = self.score.node(node).duration().copied() {
            self.fill_forward.remember(spec.octave, &duration);
        }
        Ok(node)
    }

    /// Construct a tag and add it, opening or closing a scope per its mode.
    pub fn add_tag(
        &mut self,
        name: &str,
        id: Option<&str>,
        args: impl Into<TagArgs>,
        pos: Option<Position>,
    ) -> Result<NodeId> {
        let tag = TagFactory::create(name, id, args.into(), pos.as_ref())?;
        let mode = tag.mode;
        let node = self.score.alloc(NodeKind::Tag(tag), pos);
        match mode {
            TagMode::Begin => {
                self.add(node)?;
                self.add_active_tag(node);
            }
            TagMode::End => {
                self.remove_active_tag(node)?;
                self.add(node)?;
            }
            TagMode::None => self.add(node)?,
        }
        Ok(node)
    }

    pub fn add_barline(&mut self, pos: Option<Position>) -> Result<NodeId> {
        if self.current_is(CollectionKind::Chord) {
            self.reset_collection(CollectionKind::Chord)?;
        }
        let node = self.score.alloc(NodeKind::Barline, pos);
        self.add(node)?;
        Ok(node)
    }

    /// Turn a just-added self-contained tag into a parenthesized scope.
    pub fn begin_tag_grouping(&mut self, tag: NodeId) {
        if let Some(t) = self.score.tag_mut(tag) {
            t.mode = TagMode::Begin;
            t.use_parens = true;
        }
        // A Begin tag is already active.
        if !self.active_tags.contains(&tag) {
            self.add_active_tag(tag);
        }
    }

    /// Close a parenthesized scope: the tag stops being active and an empty
    /// End copy marks the `)`.
    pub fn end_tag_grouping(&mut self, tag: NodeId) -> Result<NodeId> {
        if let Some(index) = self.active_tags.iter().rposition(|t| *t == tag) {
            self.active_tags.remove(index);
        }
        let closing = self
            .score
            .tag(tag)
            .map(|t| t.closing_copy())
            .ok_or_else(|| GuidoError::structural(None, "Tag grouping closed on a node that is not a tag."))?;
        let pos = self.score.node(tag).pos.clone();
        let node = self.score.alloc(NodeKind::Tag(closing), pos);
        self.add(node)?;
        Ok(node)
    }

    // Low-level interface

    /// Append to the current collection and attach every active tag.
    pub fn add(&mut self, node: NodeId) -> Result<()> {
        let current = self.current();
        self.score.append(current, node)?;
        let in_chord = self.current_is(CollectionKind::Chord);
        for i in 0..self.active_tags.len() {
            let tag = self.active_tags[i];
            let in_scope = !in_chord
                || !self
                    .score
                    .tag(tag)
                    .map_or(false, |t| t.events.contains(&current));
            self.score.attach_tag(tag, node, in_scope);
        }
        Ok(())
    }

    /// Add a new collection and make it current.
    pub fn set_as_collection(&mut self, kind: CollectionKind, pos: Option<Position>) -> Result<NodeId> {
        let node = self.score.alloc(NodeKind::collection(kind), pos);
        self.add(node)?;
        self.stack.push(node);
        debug!("begin {} (depth {})", kind.name(), self.stack.len() - 1);
        Ok(node)
    }

    /// Close the current collection, which must be of kind `expected`.
    pub fn reset_collection(&mut self, expected: CollectionKind) -> Result<()> {
        if self.stack.len() <= 1 {
            return Err(GuidoError::structural(
                None,
                format!("Cannot end a {}: no collection is open.", expected.name()),
            ));
        }
        let top = self.current();
        let found = self.score.collection_kind(top);
        if found != Some(expected) {
            let pos = self.score.node(top).pos.clone();
            return Err(GuidoError::structural(
                pos.as_ref(),
                format!(
                    "Expected to end a {}, but the open collection is a {}.",
                    expected.name(),
                    found.map_or("node", CollectionKind::name)
                ),
            ));
        }
        self.stack.pop();
        debug!("end {} (depth {})", expected.name(), self.stack.len());
        Ok(())
    }

    pub fn add_active_tag(&mut self, tag: NodeId) {
        self.active_tags.push(tag);
    }

    /// Close the most recent open tag matching `closing` by name and id.
    pub fn remove_active_tag(&mut self, closing: NodeId) -> Result<()> {
        let Some(end) = self.score.tag(closing) else {
            return Ok(());
        };
        let index = self.active_tags.iter().rposition(|open| {
            self.score
                .tag(*open)
                .map_or(false, |t| t.same_scope(end))
        });
        match index {
            Some(index) => {
                self.active_tags.remove(index);
                Ok(())
            }
            None => {
                let id = end.id.map(|id| format!(":{}", id)).unwrap_or_default();
                let message = format!(
                    "'\\{name}End{id}' appears before '\\{name}Begin{id}'",
                    name = end.name,
                    id = id
                );
                Err(GuidoError::structural(self.score.node(closing).pos.as_ref(), message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(name: &str) -> EventSpec {
        EventSpec {
            pitch_name: name.to_string(),
            octave: 1,
            accidental: String::new(),
            num: 1,
            den: 4,
            dotting: None,
        }
    }

    fn open_sequence() -> (TreeBuilder, NodeId) {
        let mut builder = TreeBuilder::new();
        let seq = builder.begin_sequence(None).unwrap();
        (builder, seq)
    }

    #[test]
    fn test_begin_end_tag_scope() {
        let (mut builder, _) = open_sequence();
        let slur = builder.add_tag("slurBegin", None, TagArgs::None, None).unwrap();
        let a = builder.add_event(&note("a"), None).unwrap();
        let b = builder.add_event(&note("b"), None).unwrap();
        builder.add_tag("slurEnd", None, TagArgs::None, None).unwrap();
        let c = builder.add_event(&note("c"), None).unwrap();
        builder.end_sequence().unwrap();

        let score = builder.finish();
        assert_eq!(score.tag(slur).unwrap().events, vec![a, b]);
        assert_eq!(score.tags_of(a, "slur"), &[slur]);
        assert!(score.tags_of(c, "slur").is_empty());
    }

    #[test]
    fn test_end_without_begin_is_fatal() {
        let (mut builder, _) = open_sequence();
        let err = builder.add_tag("slurEnd", None, TagArgs::None, None).unwrap_err();
        assert!(err.to_string().contains(r"'\slurEnd' appears before '\slurBegin'"));
    }

    #[test]
    fn test_end_matches_by_id() {
        let (mut builder, _) = open_sequence();
        builder.add_tag("slurBegin", Some("1"), TagArgs::None, None).unwrap();
        let two = builder.add_tag("slurBegin", Some("2"), TagArgs::None, None).unwrap();
        builder.add_tag("slurEnd", Some("1"), TagArgs::None, None).unwrap();
        assert_eq!(builder.active_tags(), &[two]);
        assert!(builder.add_tag("slurEnd", Some("1"), TagArgs::None, None).is_err());
    }

    #[test]
    fn test_forced_closure_innermost_first() {
        let (mut builder, seq) = open_sequence();
        let outer = builder.add_tag("slurBegin", None, TagArgs::None, None).unwrap();
        builder.add_tag("beamBegin", None, TagArgs::None, None).unwrap();
        builder.add_event(&note("a"), None).unwrap();
        builder.end_sequence().unwrap();
        assert!(builder.active_tags().is_empty());

        let score = builder.finish();
        let children = score.children(seq);
        let closers: Vec<&str> = children[3..]
            .iter()
            .map(|id| score.tag(*id).unwrap().name.as_str())
            .collect();
        assert_eq!(closers, vec!["beam", "slur"]);
        for closer in &children[3..] {
            let tag = score.tag(*closer).unwrap();
            assert_eq!(tag.mode, TagMode::End);
            assert!(tag.events.is_empty());
        }
        // The outer slur scope took in the inner beam's closing tag too.
        assert_eq!(score.tag(outer).unwrap().events.len(), 3);
    }

    #[test]
    fn test_chord_members_are_not_rescoped() {
        let (mut builder, _) = open_sequence();
        let slur = builder.add_tag("slurBegin", None, TagArgs::None, None).unwrap();
        let chord = builder.begin_chord(None).unwrap();
        let a = builder.add_event(&note("a"), None).unwrap();
        let c = builder.add_event(&note("c"), None).unwrap();
        builder.end_chord().unwrap();

        let score = builder.score();
        assert_eq!(score.tag(slur).unwrap().events, vec![chord]);
        assert_eq!(score.tags_of(a, "slur"), &[slur]);
        assert_eq!(score.tags_of(c, "slur"), &[slur]);
        assert!(score.is_first(slur, a));
        assert!(score.is_last(slur, c));
    }

    #[test]
    fn test_tag_opened_inside_chord_scopes_members() {
        let (mut builder, _) = open_sequence();
        builder.begin_chord(None).unwrap();
        let tie = builder.add_tag("tieBegin", None, TagArgs::None, None).unwrap();
        let a = builder.add_event(&note("a"), None).unwrap();
        builder.end_chord().unwrap();
        assert_eq!(builder.score().tag(tie).unwrap().events, vec![a]);
    }

    #[test]
    fn test_tag_grouping() {
        let (mut builder, _) = open_sequence();
        let slur = builder.add_tag("slur", None, TagArgs::None, None).unwrap();
        builder.begin_tag_grouping(slur);
        let a = builder.add_event(&note("a"), None).unwrap();
        let closing = builder.end_tag_grouping(slur).unwrap();
        builder.add_event(&note("b"), None).unwrap();

        let score = builder.score();
        let tag = score.tag(slur).unwrap();
        assert!(tag.use_parens);
        assert_eq!(tag.mode, TagMode::Begin);
        assert_eq!(tag.events, vec![a]);
        let end = score.tag(closing).unwrap();
        assert_eq!(end.mode, TagMode::End);
        assert!(end.use_parens);
        assert!(builder.active_tags().is_empty());
    }

    #[test]
    fn test_add_event_to_chord_wraps_previous() {
        let (mut builder, seq) = open_sequence();
        let a = builder.add_event(&note("a"), None).unwrap();
        let c = builder.add_event_to_chord(&note("c"), None).unwrap();
        let e = builder.add_event_to_chord(&note("e"), None).unwrap();
        let g = builder.add_event_not_in_chord(&note("g"), None).unwrap();

        let score = builder.score();
        let children = score.children(seq);
        assert_eq!(children.len(), 2);
        assert_eq!(score.children(children[0]), &[a, c, e]);
        assert_eq!(children[1], g);
        assert_eq!(score.parent(a), Some(seq));
    }

    #[test]
    fn test_add_event_to_chord_needs_previous_event() {
        let (mut builder, _) = open_sequence();
        assert!(builder.add_event_to_chord(&note("c"), None).is_err());
    }

    #[test]
    fn test_mismatched_collection_end() {
        let (mut builder, _) = open_sequence();
        builder.begin_chord(None).unwrap();
        assert!(builder.end_segment().is_err());

        let mut builder = TreeBuilder::new();
        assert!(builder.end_sequence().is_err());
    }

    #[test]
    fn test_fill_forward_resets_per_sequence() {
        let mut builder = TreeBuilder::new();
        builder.begin_segment(None).unwrap();
        builder.begin_sequence(None).unwrap();
        let fields = NoteFields::parse("c3*1/8").unwrap();
        builder.add_note_fields(&fields, None).unwrap();
        builder.end_sequence().unwrap();
        builder.begin_sequence(None).unwrap();
        let d = builder.add_note_fields(&NoteFields::parse("d").unwrap(), None).unwrap();
        builder.end_sequence().unwrap();
        builder.end_segment().unwrap();

        let score = builder.finish();
        let pitch = score.pitch(d).unwrap();
        assert_eq!(pitch.octave(), 1);
        let duration = score[d].duration().unwrap();
        assert_eq!((duration.num(), duration.den()), (1, 4));
    }

    #[test]
    fn test_add_empty() {
        let (mut builder, _) = open_sequence();
        let empty = builder.add_empty(1, 2).unwrap();
        assert!(matches!(builder.score()[empty].kind, NodeKind::Empty(_)));
    }
}
