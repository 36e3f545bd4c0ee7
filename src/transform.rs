//! Ordered text transforms applied to each fetched value.
//!
//! A chain is a list of [`TransformStep`]s; each step gets the previous
//! step's output. Regex steps may reference fields of the invoking note with
//! `{{FieldName}}` in both their pattern and their replacement. Processor
//! steps hand the text to a named [`TextProcessor`].

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::collection::Note;
use crate::error::TransformError;
use crate::interpolate::{expand, interpolate_with};

lazy_static! {
    // \1 and \g<name> style group references
    static ref BACKSLASH_GROUP: Regex = Regex::new(r"\\(\d+)|\\g<(\w+)>").unwrap();
    static ref HTML_TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
    static ref FLAG_SEPARATOR: Regex = Regex::new(r"[\s,|]+").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformStep {
    /// Replace every match of `pattern` with `replacement`.
    Regex {
        pattern: String,
        #[serde(default)]
        replacement: String,
        #[serde(default)]
        flags: Option<String>,
    },
    /// Run a registered processor.
    Processor { name: String },
}

impl TransformStep {
    pub fn regex(pattern: &str, replacement: &str) -> Self {
        Self::Regex {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            flags: None,
        }
    }
    pub fn processor(name: &str) -> Self {
        Self::Processor {
            name: name.to_string(),
        }
    }
}

/// A text to text function usable as a transform step. It also sees the
/// note the placeholder is rendered for.
pub trait TextProcessor: Send + Sync {
    fn process(&self, text: &str, note: &Note) -> Result<String, TransformError>;
}

impl<F> TextProcessor for F
where
    F: Fn(&str, &Note) -> Result<String, TransformError> + Send + Sync,
{
    fn process(&self, text: &str, note: &Note) -> Result<String, TransformError> {
        self(text, note)
    }
}

/// Named processors available to processor steps.
#[derive(Clone)]
pub struct Processors {
    registered: HashMap<String, Arc<dyn TextProcessor>>,
}

impl Processors {
    /// A registry without any processors.
    pub fn empty() -> Self {
        Self {
            registered: HashMap::new(),
        }
    }
    pub fn register(&mut self, name: &str, processor: impl TextProcessor + 'static) {
        self.registered.insert(name.to_string(), Arc::new(processor));
    }
    pub fn get(&self, name: &str) -> Option<&dyn TextProcessor> {
        self.registered.get(name).map(|processor| processor.as_ref())
    }
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.registered.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Comes with the built-in `strip-html` and `trim` processors.
impl Default for Processors {
    fn default() -> Self {
        let mut processors = Self::empty();
        processors.register("strip-html", |text: &str, _: &Note| -> Result<String, TransformError> {
            Ok(HTML_TAG.replace_all(text, "").replace("&nbsp;", " "))
        });
        processors.register("trim", |text: &str, _: &Note| -> Result<String, TransformError> {
            Ok(text.trim().to_string())
        });
        processors
    }
}

/// Applies `steps` in order to `text`. `invoking` is the note the
/// placeholder is rendered for, never the note the text was fetched from.
pub fn apply(
    steps: &[TransformStep],
    text: &str,
    invoking: &Note,
    processors: &Processors,
) -> Result<String, TransformError> {
    let mut text = text.to_string();
    for step in steps {
        text = match step {
            TransformStep::Regex {
                pattern,
                replacement,
                flags,
            } => replace(&text, pattern, replacement, flags.as_deref(), invoking)?,
            TransformStep::Processor { name } => processors
                .get(name)
                .ok_or_else(|| TransformError::UnknownProcessor(name.clone()))?
                .process(&text, invoking)?,
        };
    }
    Ok(text)
}

fn replace(
    text: &str,
    pattern: &str,
    replacement: &str,
    flags: Option<&str>,
    invoking: &Note,
) -> Result<String, TransformError> {
    let pattern = format!("{}{}", inline_flags(flags)?, expand(pattern, invoking));
    // group references are rewritten before field values go in, and `$` in
    // a field value stays literal
    let replacement = interpolate_with(&dollar_groups(replacement), invoking, |value| {
        value.replace('$', "$$")
    })
    .text;
    let invalid = |e: fancy_regex::Error| TransformError::InvalidPattern {
        pattern: pattern.clone(),
        message: e.to_string(),
    };
    let compiled = fancy_regex::Regex::new(&pattern).map_err(invalid)?;
    let replaced = compiled
        .try_replacen(text, 0, replacement.as_str())
        .map_err(|e| {
            warn!(%pattern, error = %e, "regex step failed while matching");
            invalid(e)
        })?;
    Ok(replaced.into_owned())
}

/// Turns a flag list such as `IGNORECASE, DOTALL` or `i m` into an inline
/// flag group such as `(?is)`.
fn inline_flags(flags: Option<&str>) -> Result<String, TransformError> {
    let Some(flags) = flags.map(str::trim).filter(|flags| !flags.is_empty()) else {
        return Ok(String::new());
    };
    let mut inline = String::new();
    for flag in FLAG_SEPARATOR.split(flags).filter(|flag| !flag.is_empty()) {
        let name = flag.strip_prefix("re.").unwrap_or(flag);
        let letter = match name {
            "IGNORECASE" | "I" | "i" => 'i',
            "MULTILINE" | "M" | "m" => 'm',
            "DOTALL" | "S" | "s" => 's',
            "VERBOSE" | "X" | "x" => 'x',
            _ => return Err(TransformError::UnknownFlag(flag.to_string())),
        };
        if !inline.contains(letter) {
            inline.push(letter);
        }
    }
    if inline.is_empty() {
        return Ok(inline);
    }
    Ok(format!("(?{inline})"))
}

/// Rewrites `\1` and `\g<name>` group references to `${1}` and `${name}`.
fn dollar_groups(replacement: &str) -> String {
    BACKSLASH_GROUP
        .replace_all(replacement, |captures: &Captures| {
            let group = captures
                .get(1)
                .or_else(|| captures.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            format!("${{{group}}}")
        })
        .into_owned()
}
