//! Registered tag kinds and the name lookup table.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

/// Every tag kind the builder knows by name. Anything else is `Generic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    // Basic GUIDO
    Meter,
    Key,
    Clef,
    Tempo,
    Accelerando,
    Ritardando,
    Text,
    Label,
    Title,
    Composer,
    Mark,
    Lyricist,
    Grace,
    Cue,
    Trill,
    Mordent,
    Turn,
    Tremolo,
    Instrument,
    Beam,
    StemsAuto,
    StemsUp,
    StemsDown,
    Slur,
    Tie,
    Intensity,
    Crescendo,
    Diminuendo,
    Staccato,
    Accent,
    Tenuto,
    Marcato,
    Fermata,
    Staff,
    DoubleBar,
    RepeatBegin,
    RepeatEnd,
    Coda,
    Segno,
    // Advanced GUIDO
    Lyrics,
    Fingering,
    BarFormat,
    /// Unregistered name, kept as written.
    Generic,
}

/// Name (or alias) to kind.
static REGISTRY: &[(&str, TagKind)] = &[
    ("meter", TagKind::Meter),
    ("key", TagKind::Key),
    ("clef", TagKind::Clef),
    ("tempo", TagKind::Tempo),
    ("accelerando", TagKind::Accelerando),
    ("accel", TagKind::Accelerando),
    ("ritardando", TagKind::Ritardando),
    ("rit", TagKind::Ritardando),
    ("text", TagKind::Text),
    ("t", TagKind::Text),
    ("label", TagKind::Label),
    ("title", TagKind::Title),
    ("composer", TagKind::Composer),
    ("mark", TagKind::Mark),
    ("lyricist", TagKind::Lyricist),
    ("grace", TagKind::Grace),
    ("cue", TagKind::Cue),
    ("trill", TagKind::Trill),
    ("tr", TagKind::Trill),
    ("mordent", TagKind::Mordent),
    ("mord", TagKind::Mordent),
    ("turn", TagKind::Turn),
    ("tremolo", TagKind::Tremolo),
    ("trem", TagKind::Tremolo),
    ("instrument", TagKind::Instrument),
    ("instr", TagKind::Instrument),
    ("beam", TagKind::Beam),
    ("bm", TagKind::Beam),
    ("stemsAuto", TagKind::StemsAuto),
    ("stemsUp", TagKind::StemsUp),
    ("stemsDown", TagKind::StemsDown),
    ("slur", TagKind::Slur),
    ("sl", TagKind::Slur),
    ("tie", TagKind::Tie),
    ("intensity", TagKind::Intensity),
    ("intens", TagKind::Intensity),
    ("i", TagKind::Intensity),
    ("crescendo", TagKind::Crescendo),
    ("cresc", TagKind::Crescendo),
    ("diminuendo", TagKind::Diminuendo),
    ("dim", TagKind::Diminuendo),
    ("decrescendo", TagKind::Diminuendo),
    ("staccato", TagKind::Staccato),
    ("stacc", TagKind::Staccato),
    ("accent", TagKind::Accent),
    ("tenuto", TagKind::Tenuto),
    ("ten", TagKind::Tenuto),
    ("marcato", TagKind::Marcato),
    ("fermata", TagKind::Fermata),
    ("staff", TagKind::Staff),
    ("doubleBar", TagKind::DoubleBar),
    ("repeatBegin", TagKind::RepeatBegin),
    ("repeatEnd", TagKind::RepeatEnd),
    ("coda", TagKind::Coda),
    ("segno", TagKind::Segno),
    ("lyrics", TagKind::Lyrics),
    ("fingering", TagKind::Fingering),
    ("barFormat", TagKind::BarFormat),
];

static LOOKUP: Lazy<HashMap<&'static str, TagKind>> =
    Lazy::new(|| REGISTRY.iter().copied().collect());

impl TagKind {
    /// Look up a registered name or alias.
    pub fn lookup(name: &str) -> Option<TagKind> {
        LOOKUP.get(name).copied()
    }

    /// Name used as the attachment key on tagged nodes. `Generic` tags are
    /// keyed by their own name instead.
    pub fn canonical_name(self) -> &'static str {
        match self {
            TagKind::Meter => "meter",
            TagKind::Key => "key",
            TagKind::Clef => "clef",
            TagKind::Tempo => "tempo",
            TagKind::Accelerando => "accelerando",
            TagKind::Ritardando => "ritardando",
            TagKind::Text => "text",
            TagKind::Label => "label",
            TagKind::Title => "title",
            TagKind::Composer => "composer",
            TagKind::Mark => "mark",
            TagKind::Lyricist => "lyricist",
            TagKind::Grace => "grace",
            TagKind::Cue => "cue",
            TagKind::Trill => "trill",
            TagKind::Mordent => "mordent",
            TagKind::Turn => "turn",
            TagKind::Tremolo => "tremolo",
            TagKind::Instrument => "instrument",
            TagKind::Beam => "beam",
            TagKind::StemsAuto => "stemsAuto",
            TagKind::StemsUp => "stemsUp",
            TagKind::StemsDown => "stemsDown",
            TagKind::Slur => "slur",
            TagKind::Tie => "tie",
            TagKind::Intensity => "intensity",
            TagKind::Crescendo => "crescendo",
            TagKind::Diminuendo => "diminuendo",
            TagKind::Staccato => "staccato",
            TagKind::Accent => "accent",
            TagKind::Tenuto => "tenuto",
            TagKind::Marcato => "marcato",
            TagKind::Fermata => "fermata",
            TagKind::Staff => "staff",
            TagKind::DoubleBar => "doubleBar",
            TagKind::RepeatBegin => "repeatBegin",
            TagKind::RepeatEnd => "repeatEnd",
            TagKind::Coda => "coda",
            TagKind::Segno => "segno",
            TagKind::Lyrics => "lyrics",
            TagKind::Fingering => "fingering",
            TagKind::BarFormat => "barFormat",
            TagKind::Generic => "generic",
        }
    }

    pub fn is_text(self) -> bool {
        matches!(
            self,
            TagKind::Text
                | TagKind::Label
                | TagKind::Title
                | TagKind::Composer
                | TagKind::Mark
                | TagKind::Lyricist
        )
    }

    pub fn is_ornament(self) -> bool {
        matches!(
            self,
            TagKind::Trill | TagKind::Mordent | TagKind::Turn | TagKind::Tremolo
        )
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}
