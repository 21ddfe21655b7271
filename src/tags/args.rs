//! Tag argument lists: `<"value", key="value", bare>`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{GuidoError, Result};
use crate::lexer::Position;

/// One argument at the head of the remaining text: optional `key=`, then a
/// quoted value (with `\"` escapes) or a bare value running to the next comma.
static ARG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:(?P<key>[A-Za-z_][A-Za-z0-9_]*)\s*=\s*)?(?:"(?P<quoted>(?:[^"\\]|\\.)*)"|(?P<bare>[^",]*))"#,
    )
    .expect("invalid built-in argument pattern")
});

pub type Positional = Vec<String>;
pub type Keyword = Vec<(String, String)>;

/// Arguments as handed to the tag factory.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TagArgs {
    #[default]
    None,
    /// Unparsed text between `<` and `>`.
    Raw(String),
    List(Positional),
    Map(Keyword),
}

impl From<&str> for TagArgs {
    fn from(raw: &str) -> Self {
        TagArgs::Raw(raw.to_string())
    }
}

impl From<Option<&str>> for TagArgs {
    fn from(raw: Option<&str>) -> Self {
        raw.map_or(TagArgs::None, TagArgs::from)
    }
}

impl From<Vec<String>> for TagArgs {
    fn from(list: Vec<String>) -> Self {
        TagArgs::List(list)
    }
}

impl TagArgs {
    /// Split into positional and keyword arguments.
    pub fn split(self, tag_name: &str, pos: Option<&Position>) -> Result<(Positional, Keyword)> {
        match self {
            TagArgs::None => Ok((Vec::new(), Vec::new())),
            TagArgs::List(list) => Ok((list, Vec::new())),
            TagArgs::Map(map) => Ok((Vec::new(), map)),
            TagArgs::Raw(raw) => parse_raw(&raw, tag_name, pos),
        }
    }
}

fn parse_raw(raw: &str, tag_name: &str, pos: Option<&Position>) -> Result<(Positional, Keyword)> {
    let mut positional = Vec::new();
    let mut keyword: Keyword = Vec::new();
    let mut rest = raw.trim();
    let mut first = true;

    while !rest.is_empty() {
        if !first {
            rest = rest
                .strip_prefix(',')
                .ok_or_else(|| {
                    GuidoError::structural(pos, format!("Couldn't parse arguments to tag '{}'", tag_name))
                })?
                .trim_start();
            // A trailing comma ends the list.
            if rest.is_empty() {
                break;
            }
        }
        first = false;

        let captures = ARG_RE.captures(rest).ok_or_else(|| {
            GuidoError::structural(
                pos,
                format!("'{}' is an invalid argument to tag '{}'.", rest, tag_name),
            )
        })?;
        let value = match captures.name("quoted") {
            Some(quoted) => quoted.as_str().replace("\\\"", "\""),
            None => captures.name("bare").map_or("", |m| m.as_str()).trim().to_string(),
        };
        match captures.name("key") {
            Some(key) => {
                let key = key.as_str().to_string();
                // Later values win, like a mapping.
                match keyword.iter_mut().find(|(k, _)| *k == key) {
                    Some(entry) => entry.1 = value,
                    None => keyword.push((key, value)),
                }
            }
            None => positional.push(value),
        }

        let consumed = captures.get(0).map_or(0, |m| m.end());
        rest = rest[consumed..].trim_start();
    }

    Ok((positional, keyword))
}
