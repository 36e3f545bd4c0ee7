//! Per-session context for resolving placeholders.
//!
//! A session wraps a [`Collection`] and remembers what it has already looked
//! up: the deck hierarchy, note searches, cards of notes and note types.
//! The collection is only read while a session lives, so remembering a
//! lookup never changes a result. Nothing is kept between sessions.

use core::hash::BuildHasherDefault;
use seahash::SeaHasher;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::collection::{Card, Collection, DeckId, DeckRef, Note, NoteId, NoteType, NoteTypeId, NoteTypeRef};
use crate::error::Result;
use crate::gate::DeckTree;

pub type OtherHasher = BuildHasherDefault<SeaHasher>;

type NoteSearch = (NoteTypeId, String, String);

pub struct Session<'c> {
    collection: &'c dyn Collection,
    deck_tree: Mutex<Option<Arc<DeckTree>>>,
    note_types: Mutex<HashMap<NoteTypeRef, Option<NoteType>, OtherHasher>>,
    searches: Mutex<HashMap<NoteSearch, Arc<Vec<Note>>, OtherHasher>>,
    cards: Mutex<HashMap<NoteId, Arc<Vec<Card>>, OtherHasher>>,
}

impl<'c> Session<'c> {
    pub fn new(collection: &'c dyn Collection) -> Self {
        Self {
            collection,
            deck_tree: Mutex::new(None),
            note_types: Mutex::new(HashMap::default()),
            searches: Mutex::new(HashMap::default()),
            cards: Mutex::new(HashMap::default()),
        }
    }

    pub fn collection(&self) -> &'c dyn Collection {
        self.collection
    }

    /// The deck hierarchy, built on first use.
    pub fn deck_tree(&self) -> Result<Arc<DeckTree>> {
        let mut kept = self.deck_tree.lock()?;
        if let Some(tree) = kept.as_ref() {
            return Ok(Arc::clone(tree));
        }
        let tree = Arc::new(DeckTree::new(self.collection.decks()?));
        debug!(decks = tree.len(), "built deck tree");
        *kept = Some(Arc::clone(&tree));
        Ok(tree)
    }

    pub fn deck_id(&self, deck: &DeckRef) -> Result<Option<DeckId>> {
        self.collection.deck_id(deck)
    }

    pub fn note_type(&self, note_type: &NoteTypeRef) -> Result<Option<NoteType>> {
        if let Some(found) = self.note_types.lock()?.get(note_type) {
            return Ok(found.clone());
        }
        let found = self.collection.note_type(note_type)?;
        self.note_types
            .lock()?
            .insert(note_type.clone(), found.clone());
        Ok(found)
    }

    pub fn find_notes(&self, note_type: NoteTypeId, field: &str, needle: &str) -> Result<Arc<Vec<Note>>> {
        let search = (note_type, field.to_string(), needle.to_string());
        if let Some(notes) = self.searches.lock()?.get(&search) {
            return Ok(Arc::clone(notes));
        }
        let notes = Arc::new(self.collection.find_notes(note_type, field, needle)?);
        debug!(note_type, field, needle, found = notes.len(), "searched notes");
        self.searches.lock()?.insert(search, Arc::clone(&notes));
        Ok(notes)
    }

    pub fn cards(&self, note: NoteId) -> Result<Arc<Vec<Card>>> {
        if let Some(cards) = self.cards.lock()?.get(&note) {
            return Ok(Arc::clone(cards));
        }
        let cards = Arc::new(self.collection.cards(note)?);
        self.cards.lock()?.insert(note, Arc::clone(&cards));
        Ok(cards)
    }
}
