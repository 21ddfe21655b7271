//! # Score Object Model
//!
//! Node types for a parsed GUIDO score.
//!
//! ## Type Hierarchy
//! ```text
//! Score (arena, see score.rs)
//!   └── Collection::Score           exactly one child
//!         └── Collection::Segment   comma-separated sequences
//!               └── Collection::Sequence
//!                     ├── Note      Pitch + Duration
//!                     ├── Rest      Duration ("_")
//!                     ├── Empty     Duration (zero-width filler)
//!                     ├── Tag       annotation, see tags/
//!                     ├── Barline
//!                     └── Collection::Chord
//!                           └── events and tags sharing one time position
//! ```
//!
//! ## Key Concepts
//!
//! ### Duration
//! Stored as a canonical `(num, den, dotting)` triple. A raw fraction that is
//! exactly a dotted power-of-two value (3/8 = dotted 1/4) is rewritten to its
//! undotted base with a dot. The effective value is always recomputed from
//! the stored fields: base x 3/2 for one dot, base x 7/4 for two.
//!
//! ### Pitch
//! Letter or solfège name, octave in [-4, 6], accidental. Absolute pitch is
//! `semitone(name) + semitone(accidental) + 12 * octave`.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::error::{GuidoError, Result};
use crate::lexer::Position;
use crate::rational::Rational;
use crate::tags::Tag;

pub const MIN_OCTAVE: i8 = -4;
pub const MAX_OCTAVE: i8 = 6;
/// Octave of a Sequence's first note when none is written.
pub const DEFAULT_OCTAVE: i8 = 1;

/// Pitch names: the seven letters plus solfège names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchName {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
    Do,
    Re,
    Mi,
    Me,
    Fa,
    Sol,
    La,
    Ti,
    Si,
    H,
}

impl PitchName {
    pub const ALL: [PitchName; 17] = [
        PitchName::C,
        PitchName::D,
        PitchName::E,
        PitchName::F,
        PitchName::G,
        PitchName::A,
        PitchName::B,
        PitchName::Do,
        PitchName::Re,
        PitchName::Mi,
        PitchName::Me,
        PitchName::Fa,
        PitchName::Sol,
        PitchName::La,
        PitchName::Ti,
        PitchName::Si,
        PitchName::H,
    ];

    pub fn from_name(s: &str) -> Option<Self> {
        PitchName::ALL.iter().copied().find(|p| p.as_str() == s)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PitchName::C => "c",
            PitchName::D => "d",
            PitchName::E => "e",
            PitchName::F => "f",
            PitchName::G => "g",
            PitchName::A => "a",
            PitchName::B => "b",
            PitchName::Do => "do",
            PitchName::Re => "re",
            PitchName::Mi => "mi",
            PitchName::Me => "me",
            PitchName::Fa => "fa",
            PitchName::Sol => "sol",
            PitchName::La => "la",
            PitchName::Ti => "ti",
            PitchName::Si => "si",
            PitchName::H => "h",
        }
    }

    /// Semitones above C
    pub fn semitone(self) -> i32 {
        match self.normal() {
            PitchName::C => 0,
            PitchName::D => 2,
            PitchName::E => 4,
            PitchName::F => 5,
            PitchName::G => 7,
            PitchName::A => 9,
            _ => 11, // B
        }
    }

    /// The letter name for a solfège (or German `h`) name.
    pub fn normal(self) -> PitchName {
        match self {
            PitchName::Do => PitchName::C,
            PitchName::Re => PitchName::D,
            PitchName::Mi | PitchName::Me => PitchName::E,
            PitchName::Fa => PitchName::F,
            PitchName::Sol => PitchName::G,
            PitchName::La => PitchName::A,
            PitchName::Ti | PitchName::Si | PitchName::H => PitchName::B,
            letter => letter,
        }
    }
}

/// Accidentals, as written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Accidental {
    DoubleFlat,  // &&
    Flat,        // &
    #[default]
    Natural,     // (none)
    Sharp,       // #
    DoubleSharp, // ##
    Is,          // is (sharp)
}

impl Accidental {
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "&&" => Some(Accidental::DoubleFlat),
            "&" => Some(Accidental::Flat),
            "" => Some(Accidental::Natural),
            "#" => Some(Accidental::Sharp),
            "##" => Some(Accidental::DoubleSharp),
            "is" => Some(Accidental::Is),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Accidental::DoubleFlat => "&&",
            Accidental::Flat => "&",
            Accidental::Natural => "",
            Accidental::Sharp => "#",
            Accidental::DoubleSharp => "##",
            Accidental::Is => "is",
        }
    }

    pub fn semitones(self) -> i32 {
        match self {
            Accidental::DoubleFlat => -2,
            Accidental::Flat => -1,
            Accidental::Natural => 0,
            Accidental::Sharp | Accidental::Is => 1,
            Accidental::DoubleSharp => 2,
        }
    }
}

/// Pitched part of a note
#[derive(Debug, Clone, PartialEq)]
pub struct Pitch {
    name: PitchName,
    octave: i8,
    accidental: Accidental,
    volume: f32,
}

impl Default for Pitch {
    fn default() -> Self {
        Self {
            name: PitchName::C,
            octave: DEFAULT_OCTAVE,
            accidental: Accidental::Natural,
            volume: 0.5,
        }
    }
}

impl Pitch {
    pub fn new(name: &str, octave: i64, accidental: &str, pos: Option<&Position>) -> Result<Self> {
        let mut pitch = Pitch::default();
        pitch.set_name(name, pos)?;
        pitch.set_octave(octave, pos)?;
        pitch.set_accidental(accidental, pos)?;
        Ok(pitch)
    }

    pub fn name(&self) -> PitchName {
        self.name
    }

    pub fn octave(&self) -> i8 {
        self.octave
    }

    pub fn accidental(&self) -> Accidental {
        self.accidental
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_name(&mut self, name: &str, pos: Option<&Position>) -> Result<()> {
        self.name = PitchName::from_name(name).ok_or_else(|| {
            let legal: Vec<String> = PitchName::ALL.iter().map(|p| format!("'{}'", p.as_str())).collect();
            GuidoError::structural(
                pos,
                format!("'{}' is not a valid pitch name.  Legal values are {}.", name, legal.join(", ")),
            )
        })?;
        Ok(())
    }

    pub fn set_octave(&mut self, octave: i64, pos: Option<&Position>) -> Result<()> {
        if octave < i64::from(MIN_OCTAVE) || octave > i64::from(MAX_OCTAVE) {
            return Err(GuidoError::structural(
                pos,
                format!("'{}' is not a valid octave.  Legal values are in range [-4, 6].", octave),
            ));
        }
        self.octave = octave as i8;
        Ok(())
    }

    pub fn set_accidental(&mut self, accidental: &str, pos: Option<&Position>) -> Result<()> {
        self.accidental = Accidental::from_symbol(accidental).ok_or_else(|| {
            GuidoError::structural(
                pos,
                format!(
                    "'{}' is not a valid accidental.  Legal values are '&&', '&', '#', '##', 'is', ''.",
                    accidental
                ),
            )
        })?;
        Ok(())
    }

    pub fn set_volume(&mut self, volume: f32, pos: Option<&Position>) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(GuidoError::structural(
                pos,
                format!("'{}' is not a valid volume level.  Legal values are in range [0,1].", volume),
            ));
        }
        self.volume = volume;
        Ok(())
    }

    pub fn absolute_pitch(&self) -> i32 {
        self.name.semitone() + self.accidental.semitones() + 12 * i32::from(self.octave)
    }

    /// Letter name, with solfège names translated.
    pub fn normal_pitch_name(&self) -> PitchName {
        self.name.normal()
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name.as_str(), self.accidental.as_str(), self.octave)
    }
}

/// Standard power-of-two durations, 2 down to 1/128.
fn standard_durations() -> impl Iterator<Item = f64> {
    std::iter::once(2.0).chain((0..8).map(|x| 1.0 / f64::from(1u32 << x)))
}

/// Values of the single-dotted standard durations.
static ONE_DOT_VALUES: Lazy<Vec<f64>> =
    Lazy::new(|| standard_durations().map(|d| d * 1.5).collect());

/// Values of the double-dotted standard durations.
static TWO_DOT_VALUES: Lazy<Vec<f64>> =
    Lazy::new(|| standard_durations().map(|d| d * 1.75).collect());

/// Durational part of an event: a canonical base fraction plus dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Duration {
    num: u32,
    den: u32,
    dotting: u8,
}

impl Default for Duration {
    fn default() -> Self {
        Self { num: 1, den: 4, dotting: 0 }
    }
}

impl Duration {
    pub const ONE_DOT: (i64, i64) = (3, 2);
    pub const TWO_DOTS: (i64, i64) = (7, 4);

    /// Build a duration from raw fields.
    ///
    /// With no dots (`None` or `Some(0)`) the fraction is normalized: if it
    /// is exactly a dotted or double-dotted standard duration it is stored as
    /// the undotted base with `dotting = 1`. Explicit dots are stored as-is.
    pub fn new(num: u32, den: u32, dotting: Option<u8>, pos: Option<&Position>) -> Result<Self> {
        if den == 0 {
            return Err(GuidoError::structural(
                pos,
                format!("'*{}/0' is not a valid duration: the denominator is zero.", num),
            ));
        }
        let dotting = dotting.unwrap_or(0);
        if dotting > 2 {
            return Err(GuidoError::structural(
                pos,
                format!(
                    "'{}' is not a valid dotting.  Legal values are '', '.', '..', 0, 1, or 2.",
                    ".".repeat(usize::from(dotting))
                ),
            ));
        }
        let mut duration = Self { num, den, dotting };
        duration.normalize(pos)?;
        Ok(duration)
    }

    /// An undotted duration from an exact value (normalized like `new`).
    pub fn from_rational(value: Rational, pos: Option<&Position>) -> Result<Self> {
        let num = u32::try_from(value.numer())
            .map_err(|_| GuidoError::structural(pos, format!("'{}' is not a valid duration.", value)))?;
        let den = u32::try_from(value.denom())
            .map_err(|_| GuidoError::structural(pos, format!("'{}' is not a valid duration.", value)))?;
        Duration::new(num, den, None, pos)
    }

    /// Rewrite an undotted dotted-looking fraction to base + dot.
    ///
    /// NOTE: a double-dotted match also yields `dotting = 1`, not 2. Existing
    /// GUIDO corpora were written against this behaviour, so it is kept.
    pub fn normalize(&mut self, pos: Option<&Position>) -> Result<()> {
        if self.dotting != 0 {
            return Ok(());
        }
        let value = f64::from(self.num) / f64::from(self.den);
        let factor = if ONE_DOT_VALUES.contains(&value) {
            Duration::ONE_DOT
        } else if TWO_DOT_VALUES.contains(&value) {
            Duration::TWO_DOTS
        } else {
            return Ok(());
        };

        let base = Rational::new(i64::from(self.num), i64::from(self.den))?
            .checked_div(Rational::new(factor.0, factor.1)?)?;
        let invalid = || GuidoError::structural(pos, format!("'{}' is not a valid duration.", base));
        self.num = u32::try_from(base.numer()).map_err(|_| invalid())?;
        self.den = u32::try_from(base.denom()).map_err(|_| invalid())?;
        self.dotting = 1;
        Ok(())
    }

    pub fn num(&self) -> u32 {
        self.num
    }

    pub fn den(&self) -> u32 {
        self.den
    }

    pub fn dotting(&self) -> u8 {
        self.dotting
    }

    /// The stored undotted fraction.
    pub fn base(&self) -> Rational {
        Rational::new(i64::from(self.num), i64::from(self.den)).unwrap_or_default()
    }

    /// Effective length, with the dot multiplier applied.
    pub fn value(&self) -> Rational {
        let base = self.base();
        let (num, den) = match self.dotting {
            0 => return base,
            1 => Duration::ONE_DOT,
            _ => Duration::TWO_DOTS,
        };
        base * Rational::new(num, den).unwrap_or_default()
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*{}/{}{}", self.num, self.den, ".".repeat(usize::from(self.dotting)))
    }
}

/// A pitched event
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub pitch: Pitch,
    pub duration: Duration,
}

/// Collection flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Score,
    Segment,
    Sequence,
    Chord,
}

impl CollectionKind {
    pub fn name(self) -> &'static str {
        match self {
            CollectionKind::Score => "Score",
            CollectionKind::Segment => "Segment",
            CollectionKind::Sequence => "Sequence",
            CollectionKind::Chord => "Chord",
        }
    }
}

/// Handle of a node in a [`crate::Score`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node is
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Collection {
        kind: CollectionKind,
        children: Vec<NodeId>,
    },
    Note(Note),
    Rest(Duration),
    Empty(Duration),
    Tag(Tag),
    Barline,
}

impl NodeKind {
    pub fn collection(kind: CollectionKind) -> Self {
        NodeKind::Collection { kind, children: Vec::new() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Collection { kind, .. } => kind.name(),
            NodeKind::Note(_) => "Note",
            NodeKind::Rest(_) => "Rest",
            NodeKind::Empty(_) => "Empty",
            NodeKind::Tag(_) => "Tag",
            NodeKind::Barline => "Barline",
        }
    }
}

/// A node of the score tree
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub pos: Option<Position>,
    /// Tags attached to this node, keyed by tag kind name, in attach order.
    pub tags: BTreeMap<String, Vec<NodeId>>,
    /// Owning collection (for chord members: the chord's own parent).
    pub parent: Option<NodeId>,
    /// Offset from the start of the enclosing sequence. Set by the time-spine pass.
    pub time_spine: Rational,
}

impl Node {
    pub fn new(kind: NodeKind, pos: Option<Position>) -> Self {
        Self {
            kind,
            pos,
            tags: BTreeMap::new(),
            parent: None,
            time_spine: Rational::zero(),
        }
    }

    pub fn collection_kind(&self) -> Option<CollectionKind> {
        match &self.kind {
            NodeKind::Collection { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Collection { children, .. } => children,
            _ => &[],
        }
    }

    pub fn duration(&self) -> Option<&Duration> {
        match &self.kind {
            NodeKind::Note(note) => Some(&note.duration),
            NodeKind::Rest(d) | NodeKind::Empty(d) => Some(d),
            _ => None,
        }
    }

    pub fn pitch(&self) -> Option<&Pitch> {
        match &self.kind {
            NodeKind::Note(note) => Some(&note.pitch),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match &self.kind {
            NodeKind::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn is_note(&self) -> bool {
        matches!(self.kind, NodeKind::Note(_))
    }

    pub fn is_event(&self) -> bool {
        matches!(self.kind, NodeKind::Note(_) | NodeKind::Rest(_) | NodeKind::Empty(_))
    }

    pub fn is_chord(&self) -> bool {
        self.collection_kind() == Some(CollectionKind::Chord)
    }

    /// Tags of kind `key` attached to this node.
    pub fn tags_of(&self, key: &str) -> &[NodeId] {
        self.tags.get(key).map_or(&[], Vec::as_slice)
    }
}
