use super::*;
use crate::api::parse;
use crate::ast::{CollectionKind, NodeKind};
use crate::rational::Rational;
use crate::score::Score;
use crate::tags::TagKind;

fn first_sequence(score: &Score) -> NodeId {
    score.sequences()[0]
}

/// Short label per child of the first Sequence, e.g. `note c`, `tag slur`.
fn labels(score: &Score) -> Vec<String> {
    score
        .children(first_sequence(score))
        .iter()
        .map(|id| match &score[*id].kind {
            NodeKind::Note(note) => format!("note {}", note.pitch.name().as_str()),
            NodeKind::Rest(_) => "rest".to_string(),
            NodeKind::Empty(_) => "empty".to_string(),
            NodeKind::Barline => "|".to_string(),
            NodeKind::Tag(tag) => format!("tag {}{}", tag.name, tag.mode.suffix()),
            NodeKind::Collection { kind, .. } => kind.name().to_lowercase(),
        })
        .collect()
}

fn note_fields(score: &Score, id: NodeId) -> (u32, u32, u8) {
    let d = score[id].duration().copied().expect("not a duration node");
    (d.num(), d.den(), d.dotting())
}

#[test]
fn test_sequence_is_wrapped_in_segment() {
    let parsed = parse("[ a b ]").unwrap();
    let score = &parsed.score;
    let segment = score.toplevel().unwrap();
    assert_eq!(score.collection_kind(segment), Some(CollectionKind::Segment));
    assert_eq!(score.children(segment).len(), 1);
    assert_eq!(labels(score), vec!["note a", "note b"]);
    assert!(parsed.warnings.is_empty());
}

#[test]
fn test_segment_structure() {
    let parsed = parse("{[a b |c], [d e |f]}").unwrap();
    let score = &parsed.score;
    let seqs = score.sequences();
    assert_eq!(seqs.len(), 2);
    for seq in &seqs {
        let kinds: Vec<&str> = score
            .children(*seq)
            .iter()
            .map(|c| score[*c].kind.name())
            .collect();
        assert_eq!(kinds, vec!["Note", "Note", "Barline", "Note"]);
    }
}

#[test]
fn test_empty_segment_and_sequence() {
    let parsed = parse("{ }").unwrap();
    assert!(parsed.score.sequences().is_empty());

    let parsed = parse("[ ]").unwrap();
    assert!(parsed.score.children(first_sequence(&parsed.score)).is_empty());
}

#[test]
fn test_defaults_for_bare_event() {
    let parsed = parse("[ c ]").unwrap();
    let score = &parsed.score;
    let note = score.children(first_sequence(score))[0];
    let pitch = score.pitch(note).unwrap();
    assert_eq!(pitch.octave(), 1);
    assert_eq!(pitch.accidental().as_str(), "");
    assert_eq!(note_fields(score, note), (1, 4, 0));
}

#[test]
fn test_explicit_fields() {
    let parsed = parse("[ f#-1*1/8.. ]").unwrap();
    let score = &parsed.score;
    let note = score.children(first_sequence(score))[0];
    let pitch = score.pitch(note).unwrap();
    assert_eq!(pitch.octave(), -1);
    assert_eq!(pitch.accidental().as_str(), "#");
    assert_eq!(note_fields(score, note), (1, 8, 2));
}

#[test]
fn test_fill_forward_uses_canonical_fields() {
    let parsed = parse("[ a*3/8 b ]").unwrap();
    let score = &parsed.score;
    let children = score.children(first_sequence(score));
    assert_eq!(note_fields(score, children[0]), (1, 4, 1));
    assert_eq!(note_fields(score, children[1]), (1, 4, 1));
}

#[test]
fn test_fill_forward_octave_and_denominator() {
    let parsed = parse("[ c2/8 d e*3 f/2 ]").unwrap();
    let score = &parsed.score;
    let children = score.children(first_sequence(score));
    let octaves: Vec<i8> = children.iter().map(|c| score.pitch(*c).unwrap().octave()).collect();
    assert_eq!(octaves, vec![2, 2, 2, 2]);
    assert_eq!(note_fields(score, children[1]), (1, 8, 0));
    // 3/8 is stored as a dotted quarter.
    assert_eq!(note_fields(score, children[2]), (1, 4, 1));
    assert_eq!(note_fields(score, children[3]), (1, 2, 0));
}

#[test]
fn test_fill_forward_resets_per_sequence() {
    let parsed = parse("{ [ c3/2 ], [ d ] }").unwrap();
    let score = &parsed.score;
    let d = score.children(score.sequences()[1])[0];
    assert_eq!(score.pitch(d).unwrap().octave(), 1);
    assert_eq!(note_fields(score, d), (1, 4, 0));
}

#[test]
fn test_rests_and_empties() {
    let parsed = parse("[ _/2 empty*1/8 ]").unwrap();
    assert_eq!(labels(&parsed.score), vec!["rest", "empty"]);
}

#[test]
fn test_tag_balance() {
    let parsed = parse(r"[ \slurBegin a b \slurEnd ]").unwrap();
    let score = &parsed.score;
    assert_eq!(
        labels(score),
        vec!["tag slurBegin", "note a", "note b", "tag slurEnd"]
    );
    let begin = score.children(first_sequence(score))[0];
    assert_eq!(score.tag(begin).unwrap().events.len(), 2);
}

#[test]
fn test_end_before_begin_is_fatal() {
    let err = parse(r"[ \slurEnd a ]").unwrap_err();
    match err {
        GuidoError::Structural { message, line, .. } => {
            assert!(message.contains(r"\slurEnd"));
            assert!(message.contains(r"\slurBegin"));
            assert_eq!(line, 1);
        }
        other => panic!("Expected Structural, got {:?}", other),
    }
}

#[test]
fn test_forced_closure_at_sequence_end() {
    let parsed = parse(r"[ \slurBegin a \beamBegin b ]").unwrap();
    let score = &parsed.score;
    assert_eq!(
        labels(score),
        vec![
            "tag slurBegin",
            "note a",
            "tag beamBegin",
            "note b",
            "tag beamEnd",
            "tag slurEnd",
        ]
    );
    let children = score.children(first_sequence(score));
    let closing = score.tag(children[5]).unwrap();
    assert!(closing.events.is_empty());
    assert!(closing.args.is_empty());
}

#[test]
fn test_open_tag_does_not_leak_into_next_sequence() {
    let parsed = parse(r"{ [ \slurBegin a ], [ b ] }").unwrap();
    let score = &parsed.score;
    let b = score.children(score.sequences()[1])[0];
    assert!(score.tags_of(b, "slur").is_empty());
}

#[test]
fn test_parenthesized_scope() {
    let parsed = parse(r"[ \slur(a b) c ]").unwrap();
    let score = &parsed.score;
    assert_eq!(
        labels(score),
        vec!["tag slurBegin", "note a", "note b", "tag slurEnd", "note c"]
    );
    let children = score.children(first_sequence(score));
    let slur = score.tag(children[0]).unwrap();
    assert!(slur.use_parens);
    assert_eq!(slur.events, vec![children[1], children[2]]);
    assert!(score.tags_of(children[4], "slur").is_empty());
}

#[test]
fn test_begin_tag_with_parentheses() {
    let parsed = parse(r"[ \slurBegin(a) b ]").unwrap();
    let score = &parsed.score;
    assert_eq!(
        labels(score),
        vec!["tag slurBegin", "note a", "tag slurEnd", "note b"]
    );
}

#[test]
fn test_nested_and_overlapping_scopes() {
    let parsed = parse(r"[ \beamBegin \slur(a b) c \beamEnd d ]").unwrap();
    let score = &parsed.score;
    let children = score.children(first_sequence(score));
    let a = children[2];
    let c = children[5];
    let d = children[7];
    assert_eq!(score.tags_of(a, "beam").len(), 1);
    assert_eq!(score.tags_of(a, "slur").len(), 1);
    assert_eq!(score.tags_of(c, "beam").len(), 1);
    assert!(score.tags_of(c, "slur").is_empty());
    assert!(score.tags_of(d, "beam").is_empty());
}

#[test]
fn test_tag_ids_keep_scopes_apart() {
    let parsed = parse(r"[ \slurBegin:1 a \slurBegin:2 b \slurEnd:1 c \slurEnd:2 ]").unwrap();
    let score = &parsed.score;
    let children = score.children(first_sequence(score));
    let first = score.tag(children[0]).unwrap();
    let second = score.tag(children[2]).unwrap();
    assert_eq!(first.events.len(), 3);
    assert_eq!(second.events.len(), 3);
    assert_eq!(first.id, Some(1));
    assert_eq!(second.id, Some(2));
}

#[test]
fn test_alias_resolves_to_canonical_kind() {
    let parsed = parse(r"[ \sl(a) ]").unwrap();
    let score = &parsed.score;
    let children = score.children(first_sequence(score));
    assert_eq!(score.tag(children[0]).unwrap().kind, TagKind::Slur);
    assert_eq!(score.tags_of(children[1], "slur").len(), 1);
}

#[test]
fn test_tag_arguments() {
    let parsed = parse(r#"[ \clef<"bass"> \meter<"3/4"> \text<"Allegro", dy=3> c ]"#).unwrap();
    let score = &parsed.score;
    let children = score.children(first_sequence(score));
    let text = score.tag(children[2]).unwrap();
    assert_eq!(text.text(), Some("Allegro"));
    assert_eq!(text.kwarg("dy"), Some("3"));
}

#[test]
fn test_malformed_arguments_are_fatal() {
    let err = parse(r#"[ \text<"a" "b"> c ]"#).unwrap_err();
    assert!(matches!(err, GuidoError::Structural { .. }));
    assert!(err.to_string().contains("text"));
}

#[test]
fn test_chord() {
    let parsed = parse("[ {a, c, e/2} d ]").unwrap();
    let score = &parsed.score;
    let children = score.children(first_sequence(score));
    let chord = children[0];
    assert_eq!(score.collection_kind(chord), Some(CollectionKind::Chord));
    assert_eq!(score.children(chord).len(), 3);
    assert_eq!(score.duration(chord), Rational::new(1, 2).unwrap());
    for member in score.children(chord) {
        assert_eq!(score.parent(*member), Some(first_sequence(score)));
    }
    // d inherits e's half note.
    assert_eq!(note_fields(score, children[1]), (1, 2, 0));
}

#[test]
fn test_tag_and_event_in_one_chord_voice_fails() {
    // A chord voice is one event or a run of tags, not both.
    assert!(parse(r"[ {\stacc a, c} ]").is_err());
}

#[test]
fn test_tag_grouping_inside_chord() {
    let parsed = parse(r"[ {\tie(a), c} ]").unwrap();
    let score = &parsed.score;
    let chord = score.children(first_sequence(score))[0];
    let names: Vec<&str> = score
        .children(chord)
        .iter()
        .map(|m| score[*m].kind.name())
        .collect();
    assert_eq!(names, vec!["Tag", "Note", "Tag", "Note"]);
}

#[test]
fn test_unknown_tags_are_warnings() {
    let parsed = parse(r"[ \foo a \barBegin b \barEnd \foo ]").unwrap();
    assert_eq!(
        parsed.warnings,
        vec![Warning::UnknownTags(vec![
            "foo".to_string(),
            "barBegin".to_string(),
            "barEnd".to_string(),
        ])]
    );
    assert_eq!(parsed.score.sequences().len(), 1);
}

#[test]
fn test_trailing_input_is_a_warning() {
    let parsed = parse("[ a ]\n  [ b ]").unwrap();
    assert_eq!(
        parsed.warnings,
        vec![Warning::TrailingInput { line: 2, column: 3 }]
    );
    assert_eq!(labels(&parsed.score), vec!["note a"]);
}

#[test]
fn test_trailing_comments_are_not_input() {
    let parsed = parse("[ a ] % done\n(* really *)\n").unwrap();
    assert!(parsed.warnings.is_empty());
}

#[test]
fn test_strict_promotes_warnings() {
    let config = ParserConfig {
        strict: true,
        ..ParserConfig::default()
    };
    let err = Parser::new(&config).parse("[ a ] b").unwrap_err();
    assert!(matches!(err, GuidoError::Structural { .. }));

    let err = Parser::new(&config).parse(r"[ \foo a ]").unwrap_err();
    match err {
        GuidoError::Unpositioned { message } => assert!(message.contains(r"\foo")),
        other => panic!("Expected Unpositioned, got {:?}", other),
    }
}

#[test]
fn test_warnings_disabled() {
    let config = ParserConfig {
        warnings: false,
        ..ParserConfig::default()
    };
    let parsed = Parser::new(&config).parse(r"[ \foo a ] b").unwrap();
    assert!(parsed.warnings.is_empty());
}

#[test]
fn test_wrong_token_reports_deepest_position() {
    let err = parse("[ a b }").unwrap_err();
    match err {
        GuidoError::WrongToken { found, line, column, report } => {
            assert_eq!(found, "SegmentEnd");
            assert_eq!(line, 1);
            assert_eq!(column, 7);
            assert!(report.contains('^'));
        }
        other => panic!("Expected WrongToken, got {:?}", other),
    }
}

#[test]
fn test_wrong_token_on_second_line() {
    let err = parse("{ [ a ],\n  [ b @ ] }").unwrap_err();
    match err {
        GuidoError::WrongToken { found, line, column, .. } => {
            assert_eq!(found, "<unknown>");
            assert_eq!(line, 2);
            assert_eq!(column, 7);
        }
        other => panic!("Expected WrongToken, got {:?}", other),
    }
}

#[test]
fn test_invalid_octave_is_fatal() {
    let err = parse("[ c7 ]").unwrap_err();
    assert!(err.to_string().contains("not a valid octave"));
    assert!(parse("[ c6 d-4 ]").is_ok());
    assert!(parse("[ c-5 ]").is_err());
}

#[test]
fn test_zero_denominator_is_fatal() {
    assert!(matches!(
        parse("[ c/0 ]").unwrap_err(),
        GuidoError::Structural { .. }
    ));
}

#[test]
fn test_comments_anywhere() {
    let source = "% header\n[ a (* inline *) b % tail\n c ]";
    let parsed = parse(source).unwrap();
    assert_eq!(labels(&parsed.score), vec!["note a", "note b", "note c"]);
}

#[test]
fn test_grouping_paren_vs_block_comment() {
    let parsed = parse(r"[ \slur(* not a scope *) a ]").unwrap();
    assert_eq!(labels(&parsed.score), vec!["tag slur", "note a"]);
}

#[test]
fn test_positions_recorded() {
    let parsed = parse("[ a\n  b ]").unwrap();
    let score = &parsed.score;
    let b = score.children(first_sequence(score))[1];
    let pos = score[b].pos.as_ref().unwrap();
    assert_eq!(pos.line(), 2);
    assert_eq!(pos.column(), 3);
}

#[test]
fn test_time_spines_are_computed() {
    let parsed = parse("[ c/2 d e ]").unwrap();
    let score = &parsed.score;
    let e = score.children(first_sequence(score))[2];
    assert_eq!(score[e].time_spine, Rational::new(1, 1).unwrap());
}
