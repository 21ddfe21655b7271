//! # GUIDO Writer
//!
//! Re-emits a [`Score`] as canonical GUIDO text.
//!
//! Comments and layout are not preserved. Notes only spell out what the
//! parser would not carry forward from the previous event: the octave is
//! written when it changes and the duration when any of its fields change.
//! Parsing the output gives back the same tree.
//!
//! ```rust
//! use guido::{parse, write_guido};
//!
//! let parsed = parse("[ c d2*1/8 e | \\slur(f g) ]").unwrap();
//! assert_eq!(
//!     write_guido(&parsed.score),
//!     "{ [ c d2/8 e |\n  \\slur( f g ) ] }\n"
//! );
//! ```

use crate::ast::{CollectionKind, Duration, NodeId, NodeKind, Pitch, DEFAULT_OCTAVE};
use crate::score::Score;
use crate::tags::{Tag, TagMode};

/// Render `score` as GUIDO text.
pub fn write_guido(score: &Score) -> String {
    let mut writer = GuidoWriter::new(score);
    if let Some(segment) = score.toplevel() {
        writer.segment(segment);
        writer.out.push('\n');
    }
    writer.out
}

struct GuidoWriter<'a> {
    score: &'a Score,
    out: String,
    last_octave: i8,
    last_duration: Duration,
    /// Open parenthesized scopes inside the current chord.
    chord_depth: usize,
}

impl<'a> GuidoWriter<'a> {
    fn new(score: &'a Score) -> Self {
        Self {
            score,
            out: String::new(),
            last_octave: DEFAULT_OCTAVE,
            last_duration: Duration::default(),
            chord_depth: 0,
        }
    }

    fn segment(&mut self, segment: NodeId) {
        let sequences = self.score.children(segment);
        if sequences.is_empty() {
            self.out.push_str("{ }");
            return;
        }
        self.out.push_str("{ ");
        for (i, sequence) in sequences.iter().enumerate() {
            if i > 0 {
                self.out.push_str(",\n  ");
            }
            self.sequence(*sequence);
        }
        self.out.push_str(" }");
    }

    fn sequence(&mut self, sequence: NodeId) {
        self.last_octave = DEFAULT_OCTAVE;
        self.last_duration = Duration::default();

        self.out.push('[');
        for child in self.score.children(sequence) {
            self.separate();
            self.item(*child);
        }
        if self.out.ends_with("\n  ") {
            self.out.push(']');
        } else {
            self.out.push_str(" ]");
        }
    }

    /// Space before the next item unless a barline just started a line.
    fn separate(&mut self) {
        if !self.out.ends_with("\n  ") {
            self.out.push(' ');
        }
    }

    fn item(&mut self, id: NodeId) {
        match &self.score[id].kind {
            NodeKind::Note(note) => {
                let pitch = note.pitch.clone();
                let duration = note.duration;
                self.note(&pitch, &duration);
            }
            NodeKind::Rest(duration) => {
                let duration = *duration;
                self.out.push('_');
                self.duration(&duration);
            }
            NodeKind::Empty(duration) => {
                let duration = *duration;
                self.out.push_str("empty");
                self.duration(&duration);
            }
            NodeKind::Barline => self.out.push_str("|\n  "),
            NodeKind::Tag(tag) => self.out.push_str(&tag_text(tag)),
            NodeKind::Collection { kind: CollectionKind::Chord, .. } => self.chord(id),
            NodeKind::Collection { kind: CollectionKind::Sequence, .. } => self.sequence(id),
            NodeKind::Collection { kind: CollectionKind::Segment, .. } => self.segment(id),
            NodeKind::Collection { kind: CollectionKind::Score, .. } => {}
        }
    }

    fn note(&mut self, pitch: &Pitch, duration: &Duration) {
        self.out.push_str(pitch.name().as_str());
        self.out.push_str(pitch.accidental().as_str());
        if pitch.octave() != self.last_octave {
            self.out.push_str(&pitch.octave().to_string());
            self.last_octave = pitch.octave();
        }
        self.duration(duration);
    }

    fn duration(&mut self, duration: &Duration) {
        if *duration == self.last_duration {
            return;
        }
        if duration.num() != 1 {
            self.out.push_str(&format!("*{}", duration.num()));
        }
        self.out.push_str(&format!("/{}", duration.den()));
        for _ in 0..duration.dotting() {
            self.out.push('.');
        }
        self.last_duration = *duration;
    }

    /// A chord voice is one event or a run of tags; a parenthesized scope
    /// holds a single chord voice, so its contents are not comma-separated.
    fn chord(&mut self, chord: NodeId) {
        self.out.push('{');
        self.chord_depth = 0;
        for (i, member) in self.score.children(chord).iter().enumerate() {
            let closes = self
                .score
                .tag(*member)
                .map_or(false, |t| t.use_parens && t.mode == TagMode::End);
            if closes {
                self.chord_depth = self.chord_depth.saturating_sub(1);
            }
            if i > 0 {
                if self.chord_depth == 0 && !closes {
                    self.out.push_str(", ");
                } else {
                    self.out.push(' ');
                }
            }
            self.item(*member);
            if self.score.tag(*member).map_or(false, opens_group) {
                self.chord_depth += 1;
            }
        }
        self.out.push('}');
    }
}

fn opens_group(tag: &Tag) -> bool {
    tag.use_parens && tag.mode == TagMode::Begin
}

/// `\name[Begin|End][:id]<args>`, or `(`/`)` for a parenthesized scope.
fn tag_text(tag: &Tag) -> String {
    if tag.use_parens && tag.mode == TagMode::End {
        return ")".to_string();
    }

    let mut text = format!("\\{}", tag.name);
    if !tag.use_parens {
        text.push_str(tag.mode.suffix());
    }
    if let Some(id) = tag.id {
        text.push_str(&format!(":{}", id));
    }

    let args: Vec<String> = tag
        .args
        .iter()
        .map(|value| quote(value))
        .chain(tag.kwargs.iter().map(|(key, value)| format!("{}={}", key, quote(value))))
        .collect();
    if !args.is_empty() {
        text.push('<');
        text.push_str(&args.join(", "));
        text.push('>');
    }

    if opens_group(tag) {
        text.push('(');
    }
    text
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::parse;

    fn rewrite(source: &str) -> String {
        write_guido(&parse(source).unwrap().score)
    }

    #[test]
    fn test_fill_forward_fields_are_elided() {
        assert_eq!(rewrite("[ c d e ]"), "{ [ c d e ] }\n");
        assert_eq!(rewrite("[ c2*1/8 d e1 ]"), "{ [ c2/8 d e1 ] }\n");
        assert_eq!(rewrite("[ c*3/8 d*1/2 ]"), "{ [ c/4. d/2 ] }\n");
    }

    #[test]
    fn test_dotting_change_is_written() {
        assert_eq!(rewrite("[ c/4. d/4 ]"), "{ [ c/4. d/4 ] }\n");
    }

    #[test]
    fn test_state_resets_per_sequence() {
        assert_eq!(
            rewrite("{ [ c2/8 ], [ d2/8 ] }"),
            "{ [ c2/8 ],\n  [ d2/8 ] }\n"
        );
    }

    #[test]
    fn test_rests_and_empties() {
        // 3/4 is stored as a dotted half.
        assert_eq!(rewrite("[ _/2 empty*3/4 ]"), "{ [ _/2 empty/2. ] }\n");
    }

    #[test]
    fn test_tags_and_arguments() {
        assert_eq!(
            rewrite(r#"[ \clef<treble> \text<"say \"hi\"", dy=3> c ]"#),
            "{ [ \\clef<\"treble\"> \\text<\"say \\\"hi\\\"\", dy=\"3\"> c ] }\n"
        );
    }

    #[test]
    fn test_begin_end_and_forced_closure() {
        assert_eq!(
            rewrite(r"[ \slurBegin:2 c \beamBegin d ]"),
            "{ [ \\slurBegin:2 c \\beamBegin d \\beamEnd \\slurEnd:2 ] }\n"
        );
    }

    #[test]
    fn test_chords() {
        assert_eq!(rewrite("[ {c, e, g/2} ]"), "{ [ {c, e, g/2} ] }\n");
        assert_eq!(
            rewrite(r"[ {\tie(c), \stacc, e} ]"),
            "{ [ {\\tie( c ), \\stacc, e} ] }\n"
        );
    }

    #[test]
    fn test_output_parses_to_same_tree() {
        let source = r#"{ [ \clef<"treble"> \meter<"3/4"> c2*3/8 d | \slur(e& f#) {g, b/2} _ ],
                          [ \lyrics<"la-la">(a1 h) \beamBegin sol ti empty \beamEnd ] }"#;
        let first = parse(source).unwrap().score;
        let text = write_guido(&first);
        let second = parse(&text).unwrap().score;
        assert_eq!(write_guido(&second), text);

        let shape = |score: &Score| -> Vec<String> {
            score
                .visit_flat(score.root())
                .into_iter()
                .map(|id| match &score[id].kind {
                    NodeKind::Note(note) => format!("{}{}", note.pitch, note.duration),
                    NodeKind::Tag(tag) => tag.to_string(),
                    other => other.name().to_string(),
                })
                .collect()
        };
        assert_eq!(shape(&first), shape(&second));
    }
}
