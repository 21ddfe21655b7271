//! # Score Arena
//!
//! A parsed score is a flat `Vec<Node>` addressed by [`NodeId`]. Collections
//! own their children by id, children point back at their parent by id, and
//! tags refer to the nodes in their scope by id. Node 0 is always the Score
//! collection.
//!
//! ```rust
//! use guido::parse;
//!
//! let parsed = parse("{ [ c d ], [ e ] }").unwrap();
//! let score = &parsed.score;
//! assert_eq!(score.sequences().len(), 2);
//! ```

use std::ops::{Index, IndexMut};

use crate::ast::{CollectionKind, Node, NodeId, NodeKind, Pitch};
use crate::error::{GuidoError, Result};
use crate::lexer::Position;
use crate::rational::Rational;
use crate::tags::{Tag, TagData};

#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    nodes: Vec<Node>,
}

impl Default for Score {
    fn default() -> Self {
        Self::new()
    }
}

impl Score {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::collection(CollectionKind::Score), None)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes in the arena, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// True until something is appended to the Score collection.
    pub fn is_empty(&self) -> bool {
        self.children(self.root()).is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Allocate a detached node. It becomes part of the tree once appended.
    pub fn alloc(&mut self, kind: NodeKind, pos: Option<Position>) -> NodeId {
        self.nodes.push(Node::new(kind, pos));
        NodeId(self.nodes.len() - 1)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).children()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn collection_kind(&self, id: NodeId) -> Option<CollectionKind> {
        self.node(id).collection_kind()
    }

    pub fn tag(&self, id: NodeId) -> Option<&Tag> {
        self.node(id).as_tag()
    }

    pub fn tag_mut(&mut self, id: NodeId) -> Option<&mut Tag> {
        match &mut self.node_mut(id).kind {
            NodeKind::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    fn children_mut(&mut self, id: NodeId) -> Result<&mut Vec<NodeId>> {
        let pos = self.node(id).pos.clone();
        let name = self.node(id).kind.name();
        match &mut self.node_mut(id).kind {
            NodeKind::Collection { children, .. } => Ok(children),
            _ => Err(GuidoError::structural(
                pos.as_ref(),
                format!("Cannot append to a {}: it is not a collection.", name),
            )),
        }
    }

    /// Append `child` to the collection `parent`.
    ///
    /// The Score takes exactly one child: a Segment, or a Sequence which is
    /// wrapped in a new Segment. Chord members take the chord's own parent.
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        match self.collection_kind(parent) {
            Some(CollectionKind::Score) => self.append_toplevel(parent, child),
            Some(CollectionKind::Chord) => {
                let grandparent = self.parent(parent);
                self.children_mut(parent)?.push(child);
                self.node_mut(child).parent = grandparent;
                Ok(())
            }
            _ => {
                self.children_mut(parent)?.push(child);
                self.node_mut(child).parent = Some(parent);
                Ok(())
            }
        }
    }

    fn append_toplevel(&mut self, root: NodeId, child: NodeId) -> Result<()> {
        let pos = self.node(child).pos.clone();
        if !self.children(root).is_empty() {
            return Err(GuidoError::structural(
                pos.as_ref(),
                "A score may only have one top-level element.",
            ));
        }
        let segment = match self.collection_kind(child) {
            Some(CollectionKind::Segment) => child,
            Some(CollectionKind::Sequence) => {
                let segment = self.alloc(NodeKind::collection(CollectionKind::Segment), pos);
                self.append(segment, child)?;
                segment
            }
            _ => {
                return Err(GuidoError::structural(
                    pos.as_ref(),
                    "A score can only have a Sequence or a Segment as the top-level element.",
                ))
            }
        };
        self.children_mut(root)?.push(segment);
        self.node_mut(segment).parent = Some(root);
        Ok(())
    }

    /// Put `new` where `old` was among `parent`'s children.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> Result<()> {
        let children = self.children_mut(parent)?;
        let index = children.iter().position(|c| *c == old).ok_or_else(|| {
            GuidoError::structural(None, "Cannot replace a node that is not a child of this collection.")
        })?;
        children[index] = new;
        self.node_mut(new).parent = Some(parent);
        Ok(())
    }

    /// Record that `tag` applies to `node`: on the node, keyed by the tag's
    /// kind, and (if `in_scope`) in the tag's own scope list.
    pub fn attach_tag(&mut self, tag: NodeId, node: NodeId, in_scope: bool) {
        let key = match self.tag(tag) {
            Some(t) => t.key().to_string(),
            None => return,
        };
        self.node_mut(node).tags.entry(key).or_default().push(tag);
        if in_scope {
            if let Some(t) = self.tag_mut(tag) {
                t.events.push(node);
            }
        }
    }

    /// The top-level Segment, once one exists.
    pub fn toplevel(&self) -> Option<NodeId> {
        self.children(self.root()).first().copied()
    }

    /// Sequences (parts) of the top-level Segment.
    pub fn sequences(&self) -> Vec<NodeId> {
        self.toplevel()
            .map(|segment| {
                self.children(segment)
                    .iter()
                    .copied()
                    .filter(|id| self.collection_kind(*id) == Some(CollectionKind::Sequence))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Effective duration. A Chord lasts as long as its longest member;
    /// tags, barlines and other collections take no time.
    pub fn duration(&self, id: NodeId) -> Rational {
        let node = self.node(id);
        if let Some(duration) = node.duration() {
            return duration.value();
        }
        if node.is_chord() {
            return node
                .children()
                .iter()
                .map(|c| self.duration(*c))
                .max()
                .unwrap_or_default();
        }
        Rational::zero()
    }

    pub fn pitch(&self, id: NodeId) -> Option<&Pitch> {
        self.node(id).pitch()
    }

    /// Tags of kind `key` attached to `node`, in attach order.
    pub fn tags_of(&self, node: NodeId, key: &str) -> &[NodeId] {
        self.node(node).tags_of(key)
    }

    /// Pre-order walk of everything under `id`, `id` included.
    pub fn visit_flat(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk(id, &mut out, &|_| true);
        out
    }

    /// Like [`visit_flat`](Self::visit_flat) but chords are not entered.
    pub fn visit_flat_with_chords(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk(id, &mut out, &|node| !node.is_chord());
        out
    }

    /// Chords yield themselves and their first member only.
    pub fn visit_flat_chord_first_note(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for item in self.visit_flat_with_chords(id) {
            out.push(item);
            if self.node(item).is_chord() {
                out.extend(self.children(item).first().copied());
            }
        }
        out
    }

    fn walk(&self, id: NodeId, out: &mut Vec<NodeId>, descend: &dyn Fn(&Node) -> bool) {
        out.push(id);
        let node = self.node(id);
        if descend(node) {
            for child in node.children() {
                self.walk(*child, out, descend);
            }
        }
    }

    /// Notes and chords in `tag`'s scope.
    fn scope_events(&self, tag: NodeId) -> Vec<NodeId> {
        self.tag(tag)
            .map(|t| {
                t.events
                    .iter()
                    .copied()
                    .filter(|id| self.node(*id).is_note() || self.node(*id).is_chord())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn matches_event(&self, event: NodeId, note: NodeId) -> bool {
        event == note || (self.node(event).is_chord() && self.children(event).contains(&note))
    }

    /// True if `note` is (or is in) the first note or chord under `tag`.
    pub fn is_first(&self, tag: NodeId, note: NodeId) -> bool {
        self.scope_events(tag)
            .first()
            .map_or(false, |event| self.matches_event(*event, note))
    }

    /// True if `note` is (or is in) the last note or chord under `tag`, or in
    /// the last chord under it.
    pub fn is_last(&self, tag: NodeId, note: NodeId) -> bool {
        let events = self.scope_events(tag);
        if events.last().map_or(false, |event| self.matches_event(*event, note)) {
            return true;
        }
        events
            .iter()
            .rev()
            .find(|id| self.node(**id).is_chord())
            .map_or(false, |chord| self.children(*chord).contains(&note))
    }

    /// The lyric syllable sung on `note` under the lyrics tag `tag`, and
    /// whether it is the last one. Empty when the note is not in scope.
    pub fn syllable_for(&self, tag: NodeId, note: NodeId) -> (String, bool) {
        let syllables = match self.tag(tag).map(|t| &t.data) {
            Some(TagData::Lyrics { syllables, .. }) => syllables,
            _ => return (String::new(), false),
        };
        for (i, event) in self.scope_events(tag).into_iter().enumerate() {
            if i >= syllables.len() {
                break;
            }
            if event == note {
                return (syllables[i].clone(), i == syllables.len() - 1);
            }
        }
        (String::new(), false)
    }
}

impl Index<NodeId> for Score {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        self.node(id)
    }
}

impl IndexMut<NodeId> for Score {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        self.node_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Duration;

    fn rest(score: &mut Score) -> NodeId {
        score.alloc(NodeKind::Rest(Duration::default()), None)
    }

    #[test]
    fn test_sequence_is_wrapped_in_segment() {
        let mut score = Score::new();
        let seq = score.alloc(NodeKind::collection(CollectionKind::Sequence), None);
        score.append(score.root(), seq).unwrap();

        let segment = score.toplevel().unwrap();
        assert_eq!(score.collection_kind(segment), Some(CollectionKind::Segment));
        assert_eq!(score.children(segment), &[seq]);
        assert_eq!(score.parent(seq), Some(segment));
        assert_eq!(score.sequences(), vec![seq]);
    }

    #[test]
    fn test_score_takes_one_child() {
        let mut score = Score::new();
        let a = score.alloc(NodeKind::collection(CollectionKind::Segment), None);
        let b = score.alloc(NodeKind::collection(CollectionKind::Segment), None);
        score.append(score.root(), a).unwrap();
        assert!(score.append(score.root(), b).is_err());

        let mut score = Score::new();
        let r = rest(&mut score);
        assert!(score.append(score.root(), r).is_err());
    }

    #[test]
    fn test_chord_members_take_chord_parent() {
        let mut score = Score::new();
        let seq = score.alloc(NodeKind::collection(CollectionKind::Sequence), None);
        score.append(score.root(), seq).unwrap();
        let chord = score.alloc(NodeKind::collection(CollectionKind::Chord), None);
        score.append(seq, chord).unwrap();
        let r = rest(&mut score);
        score.append(chord, r).unwrap();

        assert_eq!(score.children(chord), &[r]);
        assert_eq!(score.parent(r), Some(seq));
    }

    #[test]
    fn test_cannot_append_to_event() {
        let mut score = Score::new();
        let a = rest(&mut score);
        let b = rest(&mut score);
        assert!(score.append(a, b).is_err());
    }

    #[test]
    fn test_chord_duration_is_longest_member() {
        let mut score = Score::new();
        let seq = score.alloc(NodeKind::collection(CollectionKind::Sequence), None);
        score.append(score.root(), seq).unwrap();
        let chord = score.alloc(NodeKind::collection(CollectionKind::Chord), None);
        score.append(seq, chord).unwrap();
        for (num, den) in [(1, 4), (1, 2), (1, 8)] {
            let r = score.alloc(NodeKind::Rest(Duration::new(num, den, None, None).unwrap()), None);
            score.append(chord, r).unwrap();
        }
        assert_eq!(score.duration(chord), Rational::new(1, 2).unwrap());
        assert_eq!(score.duration(seq), Rational::zero());
    }

    #[test]
    fn test_node_count_includes_detached_nodes() {
        let mut score = Score::new();
        assert!(score.is_empty());
        assert_eq!(score.node_count(), 1);

        let detached = rest(&mut score);
        assert_eq!(score.node_count(), 2);
        assert!(score.is_empty());
        assert_eq!(score.parent(detached), None);

        let seq = score.alloc(NodeKind::collection(CollectionKind::Sequence), None);
        score.append(score.root(), seq).unwrap();
        assert!(!score.is_empty());
    }
}
