//! Typed data for the tags downstream converters read.
//!
//! Built once when the tag is constructed; bad arguments are a fatal error
//! naming the tag.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::args::{Keyword, Positional};
use super::kind::TagKind;
use crate::error::{GuidoError, Result};
use crate::lexer::Position;
use crate::rational::Rational;

/// Time signature (e.g. 4/4, 3/4, 6/8)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSignature {
    pub beats: u32,
    pub beat_type: u32,
    /// `C` or `C/` when written by name.
    pub named: Option<String>,
}

/// Mode for key signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Major,
    Minor,
}

/// Key signature (number of sharps/flats)
/// Positive = sharps, Negative = flats, Zero = C major / A minor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySignature {
    pub fifths: i32,
    /// `None` when given as a bare number.
    pub mode: Option<Mode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clef {
    pub name: String,
    /// `g`, `gg`, `f`, `c`, `perc`
    pub sign: String,
    pub line: u8,
    /// Octave transposition: 0, +-8, +-15
    pub octave: i8,
}

/// Tempo specification with optional rhythm modifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tempo {
    pub name: Option<String>,
    pub num: u32,
    pub den: u32,
    pub dots: u8,
    pub bpm: u32,
}

impl Default for Tempo {
    fn default() -> Self {
        Self {
            name: None,
            num: 1,
            den: 4,
            dots: 0,
            bpm: 120,
        }
    }
}

/// Per-kind payload of a tag
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TagData {
    #[default]
    None,
    Meter(TimeSignature),
    Key(KeySignature),
    Clef(Clef),
    Tempo(Tempo),
    /// accelerando / ritardando; the target tempo is optional.
    TempoChange(Option<Tempo>),
    Text(String),
    Lyrics {
        text: String,
        syllables: Vec<String>,
    },
    /// grace notes and ornaments
    Ornament {
        duration: Rational,
    },
    Cue {
        instrument: String,
    },
    Instrument(String),
    Fingering {
        text: String,
        dy: Option<String>,
        fsize: Option<String>,
    },
    BarFormat {
        style: String,
    },
    Intensity {
        named: Option<String>,
    },
}

static METER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<num>[0-9]+)/(?P<den>[0-9]+)").expect("invalid meter pattern"));

static TEMPO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<num>[0-9]+)/(?P<den>[0-9]+)(?P<dots>\.?\.?)=(?P<bpm>[0-9]+)")
        .expect("invalid tempo pattern")
});

static CLEF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<type>gg|[gfc]|perc|)(?P<line>[1-5])?(?P<octave>\+8|-8|\+15|-15)?$")
        .expect("invalid clef pattern")
});

static NAMED_TEMPI: &[(&str, &str)] = &[
    ("largo", "1/4=54"),
    ("lento", "1/4=58"),
    ("adagio", "1/4=63"),
    ("moderato", "1/4=70"),
    ("andante", "1/4=72"),
    ("allegro", "1/4=114"),
    ("vivace", "1/4=120"),
    ("presto", "1/4=126"),
];

static NAMED_CLEFS: &[(&str, (&str, u8, i8))] = &[
    ("treble", ("g", 2, 0)),
    ("violino", ("g", 2, 0)),
    ("bass", ("f", 4, 0)),
    ("basso", ("f", 4, 0)),
    ("tenor", ("c", 4, 0)),
    ("alto", ("c", 3, 0)),
];

/// Key names to sharps (+) or flats (-). Upper case is major, lower minor.
static KEY_NAMES: Lazy<HashMap<&'static str, i32>> = Lazy::new(|| {
    [
        ("C", 0), ("C#", 7), ("D&", -5), ("D", 2), ("E&", -3),
        ("E", 4), ("F", -1), ("F#", 6), ("G&", -7), ("G", 1),
        ("A&", -4), ("A", 3), ("B&", -2), ("B", 5),
        ("a", 0), ("a#", 7), ("b&", -5), ("b", 2), ("c", -3),
        ("c#", 4), ("d", -1), ("d#", 6), ("a&", -7), ("e", 1),
        ("e&", -6), ("f", -4), ("f#", 3), ("g", -2), ("g#", 5),
    ]
    .into_iter()
    .collect()
});

fn kwarg<'a>(kwargs: &'a Keyword, key: &str) -> Option<&'a str> {
    kwargs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

impl TagData {
    /// Validate `args`/`kwargs` for `kind` and extract its payload.
    pub fn build(
        kind: TagKind,
        name: &str,
        args: &Positional,
        kwargs: &Keyword,
        pos: Option<&Position>,
    ) -> Result<TagData> {
        let error = |message: String| GuidoError::structural(pos, message);
        let first = args.first().map(String::as_str);

        let data = match kind {
            TagKind::Meter => {
                let spec = first
                    .or_else(|| kwarg(kwargs, "type"))
                    .ok_or_else(|| error("Invalid number of arguments on \\meter tag.".into()))?;
                TagData::Meter(parse_meter(spec).ok_or_else(|| {
                    error(format!("'{}' is not a valid meter specification.", spec))
                })?)
            }
            TagKind::Key => {
                let spec = first.ok_or_else(|| error("Invalid number of arguments on \\key tag.".into()))?;
                TagData::Key(
                    parse_key(spec).ok_or_else(|| error(format!("'{}' is an invalid key name.", spec)))?,
                )
            }
            TagKind::Clef => {
                let spec = first.ok_or_else(|| error("Invalid number of arguments on \\clef tag.".into()))?;
                TagData::Clef(parse_clef(spec).ok_or_else(|| error(format!("Invalid clef name '{}'", spec)))?)
            }
            TagKind::Tempo => {
                if args.is_empty() {
                    return Err(error("\\tempo tag must have at least one argument".into()));
                }
                TagData::Tempo(build_tempo(args, pos)?.unwrap_or_default())
            }
            TagKind::Accelerando | TagKind::Ritardando => TagData::TempoChange(build_tempo(args, pos)?),
            kind if kind.is_text() => TagData::Text(text_argument(name, args, kwargs, pos)?),
            TagKind::Lyrics => {
                let text = text_argument(name, args, kwargs, pos)?;
                TagData::Lyrics {
                    syllables: split_syllables(&text),
                    text,
                }
            }
            TagKind::Grace => {
                if args.len() > 1 || !kwargs.is_empty() {
                    return Err(error("Invalid arguments for \\grace".into()));
                }
                TagData::Ornament {
                    duration: short_duration(first, name, pos)?,
                }
            }
            kind if kind.is_ornament() => TagData::Ornament {
                duration: short_duration(first, name, pos)?,
            },
            TagKind::Cue => {
                if args.len() > 1 || !kwargs.is_empty() {
                    return Err(error("Invalid arguments for \\cue".into()));
                }
                TagData::Cue {
                    instrument: first.unwrap_or_default().to_string(),
                }
            }
            TagKind::Instrument => {
                let instrument =
                    first.ok_or_else(|| error("Invalid number of arguments on \\instrument tag.".into()))?;
                TagData::Instrument(instrument.to_string())
            }
            TagKind::Fingering => {
                if args.is_empty() && kwargs.is_empty() {
                    return Err(error("Invalid arguments to \\fingering".into()));
                }
                let text = kwarg(kwargs, "text")
                    .or(first)
                    .ok_or_else(|| error("You must give some fingering text.".into()))?;
                TagData::Fingering {
                    text: text.to_string(),
                    dy: kwarg(kwargs, "dy").map(str::to_string),
                    fsize: kwarg(kwargs, "fsize").map(str::to_string),
                }
            }
            TagKind::BarFormat => {
                let style = kwarg(kwargs, "style")
                    .or(first)
                    .ok_or_else(|| error(format!("Invalid arguments for \\{}", name)))?;
                TagData::BarFormat {
                    style: style.to_string(),
                }
            }
            TagKind::Intensity => TagData::Intensity {
                named: first.or_else(|| kwarg(kwargs, "type")).map(str::to_string),
            },
            _ => TagData::None,
        };
        Ok(data)
    }
}

fn parse_meter(spec: &str) -> Option<TimeSignature> {
    let upper = spec.to_uppercase();
    let (fraction, named) = match upper.as_str() {
        "C" => ("4/4", Some(upper.clone())),
        "C/" => ("2/2", Some(upper.clone())),
        _ => (spec, None),
    };
    let captures = METER_RE.captures(fraction)?;
    Some(TimeSignature {
        beats: captures["num"].parse().ok()?,
        beat_type: captures["den"].parse().ok()?,
        named,
    })
}

fn parse_key(spec: &str) -> Option<KeySignature> {
    if let Ok(fifths) = spec.trim().parse::<i32>() {
        return Some(KeySignature { fifths, mode: None });
    }
    let fifths = *KEY_NAMES.get(spec)?;
    let mode = if spec == spec.to_uppercase() {
        Mode::Major
    } else {
        Mode::Minor
    };
    Some(KeySignature {
        fifths,
        mode: Some(mode),
    })
}

fn parse_clef(spec: &str) -> Option<Clef> {
    if let Some((_, (sign, line, octave))) = NAMED_CLEFS.iter().find(|(name, _)| *name == spec) {
        return Some(Clef {
            name: spec.to_string(),
            sign: sign.to_string(),
            line: *line,
            octave: *octave,
        });
    }
    let captures = CLEF_RE.captures(spec)?;
    let sign = captures.name("type").map_or("", |m| m.as_str());
    let default_line = match sign {
        "g" | "gg" => 2,
        "f" => 4,
        "c" | "perc" => 3,
        _ => return None,
    };
    Some(Clef {
        name: spec.to_string(),
        sign: sign.to_string(),
        line: captures
            .name("line")
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(default_line),
        octave: captures
            .name("octave")
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0),
    })
}

fn parse_tempo(spec: &str) -> Option<Tempo> {
    let captures = TEMPO_RE.captures(spec)?;
    Some(Tempo {
        name: None,
        num: captures["num"].parse().ok()?,
        den: captures["den"].parse().ok()?,
        dots: captures["dots"].len() as u8,
        bpm: captures["bpm"].parse().ok()?,
    })
}

/// One argument: a tempo name or `1/4=120`. Two: a name and `1/4=120`.
fn build_tempo(args: &Positional, pos: Option<&Position>) -> Result<Option<Tempo>> {
    match args.as_slice() {
        [spec] => {
            let lower = spec.to_lowercase();
            if let Some((_, fraction)) = NAMED_TEMPI.iter().find(|(name, _)| *name == lower) {
                let mut tempo = parse_tempo(fraction).unwrap_or_default();
                tempo.name = Some(spec.clone());
                return Ok(Some(tempo));
            }
            parse_tempo(&lower).map(Some).ok_or_else(|| {
                GuidoError::structural(
                    pos,
                    format!(
                        "I don't know how fast '{}' is.  Please specify a second argument of the form '1/4=120'.",
                        lower
                    ),
                )
            })
        }
        [name, spec] => {
            let mut tempo = parse_tempo(spec).ok_or_else(|| {
                GuidoError::structural(
                    pos,
                    format!(
                        "'{}' is not a valid tempo specification.  Must be of the form '1/4=120'.",
                        spec
                    ),
                )
            })?;
            tempo.name = Some(name.clone());
            Ok(Some(tempo))
        }
        _ => Ok(None),
    }
}

fn text_argument(name: &str, args: &Positional, kwargs: &Keyword, pos: Option<&Position>) -> Result<String> {
    kwarg(kwargs, "name")
        .or_else(|| args.first().map(String::as_str))
        .map(str::to_string)
        .ok_or_else(|| GuidoError::structural(pos, format!("Invalid arguments for \\{}", name)))
}

/// `1/n` from an optional denominator argument, default 1/32.
fn short_duration(den: Option<&str>, name: &str, pos: Option<&Position>) -> Result<Rational> {
    let invalid = |den: &str| {
        GuidoError::structural(
            pos,
            format!("'{}' is not a valid duration for \\{}.", den, name),
        )
    };
    match den {
        None => Rational::new(1, 32),
        Some(den) => {
            let value: i64 = den.trim().parse().map_err(|_| invalid(den))?;
            if value <= 0 {
                return Err(invalid(den));
            }
            Rational::new(1, value)
        }
    }
}

/// Split lyric text into syllables. `-` and `_` split words and stay on both
/// sides, `~` is a non-breaking space, `__` is a literal underscore.
pub fn split_syllables(text: &str) -> Vec<String> {
    text.replace('-', "- -")
        .replace('_', "_ _")
        .split_whitespace()
        .map(|s| s.replace('~', " ").replace("__", "_"))
        .collect()
}
