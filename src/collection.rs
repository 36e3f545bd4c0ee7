//! The collection a `fetch[...]` placeholder is resolved against.
//!
//! The resolution engine never talks to storage directly; it only consumes the
//! [`Collection`] trait. [`crate::persist::SqliteCollection`] is the bundled
//! implementation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

pub type NoteId = u64;
pub type CardId = u64;
pub type DeckId = u64;
pub type NoteTypeId = u64;

/// Separator between deck path segments, e.g. `Japanese::Vocab`.
pub const DECK_SEPARATOR: &str = "::";

// ------------- Note -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    id: NoteId,
    note_type: NoteTypeId,
    fields: Vec<(String, String)>,
}

impl Note {
    pub fn new(id: NoteId, note_type: NoteTypeId, fields: Vec<(String, String)>) -> Self {
        Self {
            id,
            note_type,
            fields,
        }
    }
    pub fn id(&self) -> NoteId {
        self.id
    }
    pub fn note_type(&self) -> NoteTypeId {
        self.note_type
    }
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
    /// Exact field lookup. `None` means the note type has no such field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }
    pub fn field_ignore_case(&self, name: &str) -> Option<&str> {
        self.field(name).or_else(|| {
            let lowered = name.to_lowercase();
            self.fields
                .iter()
                .find(|(field, _)| field.to_lowercase() == lowered)
                .map(|(_, value)| value.as_str())
        })
    }
}

// ------------- Card -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub note: NoteId,
    pub deck: DeckId,
    /// Zero based template ordinal.
    pub ordinal: u32,
    /// Number of reviews.
    pub reps: u32,
    pub suspended: bool,
}

// ------------- Deck -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    pub id: DeckId,
    /// Full path, nested decks joined by [`DECK_SEPARATOR`].
    pub name: String,
}

// ------------- NoteType -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteType {
    id: NoteTypeId,
    name: String,
    fields: Vec<String>,
    templates: u32,
}

impl NoteType {
    pub fn new(id: NoteTypeId, name: String, fields: Vec<String>, templates: u32) -> Self {
        Self {
            id,
            name,
            fields,
            templates,
        }
    }
    pub fn id(&self) -> NoteTypeId {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
    /// Number of card templates, i.e. valid ordinals are `0..templates`.
    pub fn templates(&self) -> u32 {
        self.templates
    }
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field == name)
    }
}

// ------------- References -------------
/// A deck given either by id or by name, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeckRef {
    Id(DeckId),
    Name(String),
}

impl fmt::Display for DeckRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

/// A note type given either by id or by name, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteTypeRef {
    Id(NoteTypeId),
    Name(String),
}

impl fmt::Display for NoteTypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

/// Read access to a note collection.
///
/// Implementations must return results in a stable order for identical
/// inputs within one session, and must be safe to read from several
/// threads at once.
pub trait Collection: Sync {
    /// Every deck with its full path name.
    fn decks(&self) -> Result<Vec<Deck>>;
    /// Resolves a deck reference, `None` if no such deck exists.
    fn deck_id(&self, deck: &DeckRef) -> Result<Option<DeckId>>;
    /// Resolves a note type reference, `None` if no such note type exists.
    fn note_type(&self, note_type: &NoteTypeRef) -> Result<Option<NoteType>>;
    /// Notes of `note_type` whose `field` contains `needle`, in store order.
    fn find_notes(&self, note_type: NoteTypeId, field: &str, needle: &str) -> Result<Vec<Note>>;
    fn note(&self, id: NoteId) -> Result<Option<Note>>;
    /// All cards of a note, ordered by ordinal.
    fn cards(&self, note: NoteId) -> Result<Vec<Card>>;
    /// Ids of all notes of a note type, in store order.
    fn notes_of_type(&self, note_type: NoteTypeId) -> Result<Vec<NoteId>>;
}
