//! Rendering of card templates that hold `{{fetch[...]:Field}}` placeholders.
//!
//! A template is scanned once from left to right. Fetch placeholders are
//! parsed and resolved by the [`Engine`]; a plain `{{Field}}` reference is
//! expanded against the invoking note. Sections (`{{#Field}}`, `{{^Field}}`,
//! `{{/Field}}`), comments, other filters such as `{{text:Field}}` and
//! `{{FrontSide}}` are left in place for the card template engine. A
//! placeholder that fails to parse or resolve is replaced by the configured
//! error marker and the rest of the template still renders.

use tracing::warn;

use crate::error::{FetchError, ParseError, Result};
use crate::interpolate::expand;
use crate::request::{FILTER_OPEN, FetchRequest};
use crate::resolve::{Engine, Invocation, MatchSource};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const QUOTE: char = '\'';
const SECTION_MARKS: [char; 4] = ['#', '^', '/', '!'];
const FRONT_SIDE: &str = "FrontSide";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'t> {
    Text(&'t str),
    // content between the braces
    Placeholder(&'t str),
}

pub struct Renderer<'s, 'c> {
    engine: Engine<'s, 'c>,
}

impl<'s, 'c> Renderer<'s, 'c> {
    pub fn new(engine: Engine<'s, 'c>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine<'s, 'c> {
        &self.engine
    }

    /// Renders `template` for the card in `invocation`. Only failures of the
    /// collection itself are returned as errors.
    pub fn render(&self, template: &str, invocation: &Invocation) -> Result<String> {
        let mut rendered = String::with_capacity(template.len());
        for segment in segments(template) {
            match segment {
                Segment::Text(text) => rendered.push_str(text),
                Segment::Placeholder(content) => {
                    let value = self.placeholder(content, invocation)?;
                    rendered.push_str(&value);
                }
            }
        }
        Ok(rendered)
    }

    /// Applies a single field filter, as a template engine calls it for
    /// `{{filter:Field}}` with `text` being the content of `Field`. Filters
    /// other than `fetch[...]` leave the text as it is.
    pub fn render_field(&self, text: &str, filter: &str, invocation: &Invocation) -> Result<String> {
        match FetchRequest::from_filter(filter) {
            None => Ok(text.to_string()),
            Some(Err(error)) => Ok(self.marker(FetchError::Parse(error))),
            Some(Ok(request)) => self.fetch(&request, invocation, MatchSource::Text(text)),
        }
    }

    fn placeholder(&self, content: &str, invocation: &Invocation) -> Result<String> {
        let trimmed = content.trim_start();
        if !trimmed.starts_with(FILTER_OPEN) {
            let reference = format!("{OPEN}{content}{CLOSE}");
            if left_in_place(trimmed) {
                return Ok(reference);
            }
            return Ok(expand(&reference, invocation.note));
        }
        let (block, field) = match split_fetch(trimmed) {
            Ok(parts) => parts,
            Err(error) => return Ok(self.marker(FetchError::Parse(error))),
        };
        match FetchRequest::parse(block) {
            Ok(request) => self.fetch(&request, invocation, MatchSource::Field(field)),
            Err(error) => Ok(self.marker(FetchError::Parse(error))),
        }
    }

    fn fetch(&self, request: &FetchRequest, invocation: &Invocation, source: MatchSource) -> Result<String> {
        match self.engine.resolve(request, invocation, source) {
            Ok(resolved) => Ok(resolved.into_text()),
            Err(error) if error.is_placeholder_scoped() => Ok(self.marker(error)),
            Err(error) => Err(error),
        }
    }

    fn marker(&self, error: FetchError) -> String {
        warn!(%error, "placeholder rendered as error");
        match error {
            FetchError::Parse(error) => self.engine.settings().error_marker(&error),
            FetchError::Resolution(error) => self.engine.settings().error_marker(&error),
            FetchError::Transform(error) => self.engine.settings().error_marker(&error),
            other => self.engine.settings().error_marker(&other),
        }
    }
}

// References that belong to the card template engine rather than to a field.
fn left_in_place(reference: &str) -> bool {
    reference.starts_with(SECTION_MARKS)
        || reference.contains(':')
        || reference.trim_end() == FRONT_SIDE
}

/// Splits a template into text and placeholders. Inside a fetch placeholder
/// a `}}` between single quotes does not close it. If the quotes never
/// balance, the first `}}` closes it so the parser can report the value.
fn segments(template: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        let close = if after.trim_start().starts_with(FILTER_OPEN) {
            quoted_find(after, CLOSE).or_else(|| after.find(CLOSE))
        } else {
            after.find(CLOSE)
        };
        let Some(close) = close else {
            break;
        };
        if start > 0 {
            segments.push(Segment::Text(&rest[..start]));
        }
        segments.push(Segment::Placeholder(&after[..close]));
        rest = &after[close + CLOSE.len()..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    segments
}

// Byte offset of the first `needle` outside single quotes.
fn quoted_find(text: &str, needle: &str) -> Option<usize> {
    let mut in_quote = false;
    for (i, c) in text.char_indices() {
        if c == QUOTE {
            in_quote = !in_quote;
        } else if !in_quote && text[i..].starts_with(needle) {
            return Some(i);
        }
    }
    None
}

/// Splits `fetch[ARGS]:Field` into the argument block and the field name.
fn split_fetch(content: &str) -> std::result::Result<(&str, &str), ParseError> {
    let args = &content[FILTER_OPEN.len()..];
    let close = block_end(args).or_else(|| args.rfind("]:"));
    let Some(close) = close else {
        return Err(ParseError::Syntax {
            message: "expected ']:' after the argument block".to_string(),
            line: 1,
            col: content.len() + 1,
        });
    };
    let block = &args[..close];
    match args[close + 1..].strip_prefix(':') {
        Some(field) if !field.trim().is_empty() => Ok((block, field.trim())),
        _ => Err(ParseError::Syntax {
            message: "expected a field name after the argument block".to_string(),
            line: 1,
            col: FILTER_OPEN.len() + close + 2,
        }),
    }
}

// Offset of the `]` that closes the argument block, skipping quoted text
// and nested lists.
fn block_end(args: &str) -> Option<usize> {
    let mut in_quote = false;
    let mut depth = 0usize;
    for (i, c) in args.char_indices() {
        match c {
            QUOTE => in_quote = !in_quote,
            '[' if !in_quote => depth += 1,
            ']' if !in_quote => {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    None
}
