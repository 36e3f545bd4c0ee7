//! Expansion of `{{FieldName}}` references against a note.
//!
//! Expansion is a single pass: text substituted for a reference is never
//! scanned again, so field content cannot inject further references.
//! A reference to a field the note does not have expands to the empty
//! string; with queries spanning several note types that is routine and
//! not an error.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::debug;

use crate::collection::Note;

lazy_static! {
    static ref FIELD_REFERENCE: Regex = Regex::new(r"\{\{(.+?)\}\}").unwrap();
    static ref UNSAFE_IN_FILE_NAME: Regex = Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).unwrap();
}

/// Special reference that expands to the id of the note.
pub const NOTE_ID_FIELD: &str = "__Note ID";

/// Result of an interpolation together with the references that did not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolated {
    pub text: String,
    pub missing: Vec<String>,
}

/// Replaces every `{{FieldName}}` in `text` with the value of that field of
/// `note`. Field names are matched ignoring case.
pub fn interpolate(text: &str, note: &Note) -> Interpolated {
    interpolate_with(text, note, str::to_string)
}

/// Like [`interpolate`], but every substituted value first goes through
/// `escape`, so values can be spliced into text with a syntax of its own.
pub fn interpolate_with(text: &str, note: &Note, escape: impl Fn(&str) -> String) -> Interpolated {
    let mut missing = Vec::new();
    let expanded = FIELD_REFERENCE.replace_all(text, |captures: &Captures| {
        let name = captures[1].trim();
        match reference_value(note, name) {
            Some(value) => escape(&value),
            None => {
                missing.push(name.to_string());
                String::new()
            }
        }
    });
    if !missing.is_empty() {
        debug!(note = note.id(), ?missing, "unresolved field references");
    }
    Interpolated {
        text: expanded.into_owned(),
        missing,
    }
}

/// Interpolates and only keeps the text.
pub fn expand(text: &str, note: &Note) -> String {
    interpolate(text, note).text
}

/// Interpolates a file name, replacing characters that would escape the
/// target directory or are not allowed in file names.
pub fn interpolate_file_name(text: &str, note: &Note) -> String {
    let expanded = expand(text, note);
    UNSAFE_IN_FILE_NAME
        .replace_all(expanded.trim(), "_")
        .into_owned()
}

fn reference_value(note: &Note, name: &str) -> Option<String> {
    if name.eq_ignore_ascii_case(NOTE_ID_FIELD) {
        return Some(note.id().to_string());
    }
    note.field_ignore_case(name).map(String::from)
}
