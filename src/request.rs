//! Parsing of the `fetch[...]` argument block into a [`FetchRequest`].
//!
//! The argument block is a sequence of `key = value;` clauses in any order.
//! A value is either a single quoted string or a bracketed list of single
//! quoted strings:
//!
//! ```text
//! container-by-name='Japanese::Vocab';
//! type-by-name='Word';
//! match-field='Kanji';
//! pick-policy='least_reps[0]';
//! destination-field='Meaning';
//! deck-allow-list=['Japanese::Reading', 'Kanji'];
//! result-count='3'; separator=' / ';
//! ```
//!
//! Grammar details live in `fetch.pest`. Parsing is a pure function of its
//! input, so parsing the same block twice yields equal requests.

use lazy_static::lazy_static;
use pest::Parser;
use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest_derive::Parser;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::str::FromStr;

use crate::collection::{DeckRef, NoteTypeRef};
use crate::error::ParseError;

#[derive(Parser)]
#[grammar = "fetch.pest"]
struct ArgumentParser;

lazy_static! {
    static ref POLICY: Regex = Regex::new(r"^\s*([A-Za-z_]+)\s*(?:\[(.*)\])?\s*$").unwrap();
}

/// Prefix and suffix that mark a fetch filter in a template placeholder.
pub const FILTER_OPEN: &str = "fetch[";
pub const FILTER_CLOSE: &str = "]";

/// How the selected notes are chosen among the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// The first candidates in store order.
    None,
    /// A fresh random draw on every evaluation.
    Random,
    /// A random draw seeded by the query shape, so it repeats.
    RandomStable,
    /// The candidates whose cards were reviewed the least, optionally only
    /// looking at cards of one template ordinal.
    LeastReps(Option<u32>),
}

impl SelectionPolicy {
    pub fn ordinal(&self) -> Option<u32> {
        match self {
            Self::LeastReps(ordinal) => *ordinal,
            _ => None,
        }
    }
}

impl FromStr for SelectionPolicy {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseError::MalformedValue {
            key: Argument::PickPolicy.key().to_string(),
            value: text.to_string(),
        };
        let captures = POLICY.captures(text).ok_or_else(malformed)?;
        let name = captures
            .get(1)
            .map(|m| m.as_str().to_ascii_lowercase())
            .unwrap_or_default();
        let ordinal = captures.get(2).map(|m| m.as_str().trim());
        match (name.as_str(), ordinal) {
            ("none", None) => Ok(Self::None),
            ("random", None) => Ok(Self::Random),
            ("random_stable", None) => Ok(Self::RandomStable),
            ("least_reps", None) => Ok(Self::LeastReps(None)),
            ("least_reps", Some(ordinal)) => ordinal
                .parse::<u32>()
                .map(|ordinal| Self::LeastReps(Some(ordinal)))
                .map_err(|_| ParseError::InvalidOrdinal {
                    value: ordinal.to_string(),
                }),
            ("none" | "random" | "random_stable", Some(_)) => Err(malformed()),
            _ => Err(ParseError::UnknownPolicy {
                value: text.trim().to_string(),
            }),
        }
    }
}

/// The recognized argument keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Argument {
    ContainerById,
    ContainerByName,
    TypeById,
    TypeByName,
    MatchField,
    PickPolicy,
    DestinationField,
    DeckAllowList,
    ResultCount,
    Separator,
    TransformChain,
}

impl Argument {
    const ALL: [Argument; 11] = [
        Self::ContainerById,
        Self::ContainerByName,
        Self::TypeById,
        Self::TypeByName,
        Self::MatchField,
        Self::PickPolicy,
        Self::DestinationField,
        Self::DeckAllowList,
        Self::ResultCount,
        Self::Separator,
        Self::TransformChain,
    ];

    fn key(&self) -> &'static str {
        match self {
            Self::ContainerById => "container-by-id",
            Self::ContainerByName => "container-by-name",
            Self::TypeById => "type-by-id",
            Self::TypeByName => "type-by-name",
            Self::MatchField => "match-field",
            Self::PickPolicy => "pick-policy",
            Self::DestinationField => "destination-field",
            Self::DeckAllowList => "deck-allow-list",
            Self::ResultCount => "result-count",
            Self::Separator => "separator",
            Self::TransformChain => "transform-chain",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|argument| argument.key() == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RawValue {
    Single(String),
    List(Vec<String>),
    Malformed(String),
}

impl RawValue {
    fn text(&self) -> String {
        match self {
            Self::Single(value) => format!("'{value}'"),
            Self::List(values) => format!("['{}']", values.join("', '")),
            Self::Malformed(value) => value.clone(),
        }
    }
}

/// A parsed and validated `fetch[...]` argument block.
///
/// Text values are kept as written; `{{Field}}` references inside them are
/// only expanded at resolution time against the invoking note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchRequest {
    pub deck: DeckRef,
    pub note_type: NoteTypeRef,
    pub match_field: String,
    pub policy: SelectionPolicy,
    pub destination_field: String,
    pub deck_allow_list: Option<Vec<String>>,
    pub result_count: NonZeroUsize,
    pub separator: Option<String>,
    pub transform_chain: Option<String>,
}

impl FetchRequest {
    /// Parses the argument block, i.e. the text between `fetch[` and `]`.
    pub fn parse(block: &str) -> Result<Self, ParseError> {
        let pairs = ArgumentParser::parse(Rule::arguments, block).map_err(syntax_error)?;
        let mut arguments: HashMap<Argument, RawValue> = HashMap::new();
        for clause in pairs.flat_map(|pair| pair.into_inner()) {
            if clause.as_rule() != Rule::clause {
                continue;
            }
            let mut parts = clause.into_inner();
            let key = parts.next().map(|p| p.as_str()).unwrap_or_default();
            let argument = Argument::from_key(key).ok_or_else(|| ParseError::UnknownArgument {
                key: key.to_string(),
            })?;
            let value = parts
                .next()
                .and_then(|value| value.into_inner().next())
                .map(raw_value)
                .unwrap_or_else(|| RawValue::Malformed(String::new()));
            if arguments.insert(argument, value).is_some() {
                return Err(ParseError::DuplicateArgument {
                    key: key.to_string(),
                });
            }
        }
        Self::from_arguments(arguments)
    }

    /// Parses a whole filter, e.g. `fetch[match-field='Kanji'; ...]`.
    /// Returns `None` when the filter is not a fetch filter at all.
    pub fn from_filter(filter: &str) -> Option<Result<Self, ParseError>> {
        let filter = filter.trim();
        let block = filter
            .strip_prefix(FILTER_OPEN)?
            .strip_suffix(FILTER_CLOSE)?;
        Some(Self::parse(block))
    }

    /// The separator to join several results with, falling back to `default`.
    pub fn separator_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.separator.as_deref().unwrap_or(default)
    }

    fn from_arguments(mut arguments: HashMap<Argument, RawValue>) -> Result<Self, ParseError> {
        let deck = match (
            arguments.remove(&Argument::ContainerById),
            arguments.remove(&Argument::ContainerByName),
        ) {
            (Some(_), Some(_)) => {
                return Err(conflict(Argument::ContainerById, Argument::ContainerByName));
            }
            (Some(id), None) => DeckRef::Id(id_value(Argument::ContainerById, id)?),
            (None, Some(name)) => DeckRef::Name(single(Argument::ContainerByName, name)?),
            (None, None) => return Err(missing(Argument::ContainerByName)),
        };
        let note_type = match (
            arguments.remove(&Argument::TypeById),
            arguments.remove(&Argument::TypeByName),
        ) {
            (Some(_), Some(_)) => return Err(conflict(Argument::TypeById, Argument::TypeByName)),
            (Some(id), None) => NoteTypeRef::Id(id_value(Argument::TypeById, id)?),
            (None, Some(name)) => NoteTypeRef::Name(single(Argument::TypeByName, name)?),
            (None, None) => return Err(missing(Argument::TypeByName)),
        };
        let match_field = required(&mut arguments, Argument::MatchField)?;
        let policy = required(&mut arguments, Argument::PickPolicy)?.parse::<SelectionPolicy>()?;
        let destination_field = required(&mut arguments, Argument::DestinationField)?;

        let deck_allow_list = match arguments.remove(&Argument::DeckAllowList) {
            // a single quoted name is taken as a list of one
            Some(RawValue::Single(name)) if !name.contains('"') => Some(vec![name]),
            Some(RawValue::List(names)) if !names.iter().any(|name| name.contains('"')) => {
                Some(names).filter(|names| !names.is_empty())
            }
            Some(malformed) => {
                return Err(malformed_value(Argument::DeckAllowList, &malformed));
            }
            None => None,
        };
        let result_count = match arguments.remove(&Argument::ResultCount) {
            Some(raw) => {
                let text = single(Argument::ResultCount, raw)?;
                text.trim()
                    .parse::<NonZeroUsize>()
                    .map_err(|_| ParseError::InvalidCount { value: text })?
            }
            None => NonZeroUsize::MIN,
        };
        let separator = arguments
            .remove(&Argument::Separator)
            .map(|raw| single(Argument::Separator, raw))
            .transpose()?;
        let transform_chain = arguments
            .remove(&Argument::TransformChain)
            .map(|raw| single(Argument::TransformChain, raw))
            .transpose()?;

        Ok(Self {
            deck,
            note_type,
            match_field,
            policy,
            destination_field,
            deck_allow_list,
            result_count,
            separator,
            transform_chain,
        })
    }
}

impl FromStr for FetchRequest {
    type Err = ParseError;

    fn from_str(block: &str) -> Result<Self, Self::Err> {
        Self::parse(block)
    }
}

fn raw_value(pair: Pair<Rule>) -> RawValue {
    match pair.as_rule() {
        Rule::quoted => RawValue::Single(unquote(pair)),
        Rule::list => RawValue::List(pair.into_inner().map(unquote).collect()),
        _ => RawValue::Malformed(pair.as_str().trim().to_string()),
    }
}

fn unquote(quoted: Pair<Rule>) -> String {
    quoted
        .into_inner()
        .next()
        .map(|inner| inner.as_str().replace("''", "'"))
        .unwrap_or_default()
}

fn syntax_error(error: pest::error::Error<Rule>) -> ParseError {
    let (line, col) = match error.line_col {
        LineColLocation::Pos(position) => position,
        LineColLocation::Span(start, _) => start,
    };
    ParseError::Syntax {
        message: error.variant.message().to_string(),
        line,
        col,
    }
}

fn missing(argument: Argument) -> ParseError {
    ParseError::MissingRequiredArgument {
        key: argument.key().to_string(),
    }
}

fn conflict(first: Argument, second: Argument) -> ParseError {
    ParseError::ConflictingArgument {
        first: first.key().to_string(),
        second: second.key().to_string(),
    }
}

fn malformed_value(argument: Argument, raw: &RawValue) -> ParseError {
    ParseError::MalformedValue {
        key: argument.key().to_string(),
        value: raw.text(),
    }
}

// Double quotes never belong in a value; they mean the quoting got mixed up,
// as in 'a", "b'.
fn single(argument: Argument, raw: RawValue) -> Result<String, ParseError> {
    match raw {
        RawValue::Single(value) if !value.contains('"') => Ok(value),
        other => Err(malformed_value(argument, &other)),
    }
}

fn required(
    arguments: &mut HashMap<Argument, RawValue>,
    argument: Argument,
) -> Result<String, ParseError> {
    match arguments.remove(&argument) {
        Some(raw) => single(argument, raw),
        None => Err(missing(argument)),
    }
}

fn id_value(argument: Argument, raw: RawValue) -> Result<u64, ParseError> {
    let text = single(argument, raw)?;
    text.trim().parse::<u64>().map_err(|_| ParseError::InvalidId {
        key: argument.key().to_string(),
        value: text,
    })
}
