#![allow(dead_code)]

use cardfetch::collection::{Collection, DeckId, Note, NoteId, NoteTypeId};
use cardfetch::config::Settings;
use cardfetch::error::Result;
use cardfetch::persist::{PersistenceMode, SqliteCollection};
use cardfetch::render::Renderer;
use cardfetch::request::FetchRequest;
use cardfetch::resolve::{Engine, Invocation, MatchSource, Resolved};
use cardfetch::session::Session;
use cardfetch::transform::{Processors, TransformStep};

/// A small Japanese study collection.
///
/// Decks: `Japanese`, `Japanese::Vocab`, `Japanese::Vocab::Extra`,
/// `Japanese::Reading`, `Other`.
/// Note types: `Vocab` (Kanji, Reading, Meaning; 2 templates) and
/// `Sentence` (Expression, Kanji, Translation; 1 template).
pub struct Fixture {
    pub store: SqliteCollection,
    pub japanese: DeckId,
    pub vocab_deck: DeckId,
    pub extra_deck: DeckId,
    pub reading_deck: DeckId,
    pub other_deck: DeckId,
    pub vocab: NoteTypeId,
    pub sentence: NoteTypeId,
}

impl Fixture {
    pub fn new() -> Self {
        let store = SqliteCollection::new(PersistenceMode::InMemory).unwrap();
        let japanese = store.add_deck("Japanese").unwrap();
        let vocab_deck = store.add_deck("Japanese::Vocab").unwrap();
        let extra_deck = store.add_deck("Japanese::Vocab::Extra").unwrap();
        let reading_deck = store.add_deck("Japanese::Reading").unwrap();
        let other_deck = store.add_deck("Other").unwrap();
        let vocab = store
            .add_note_type("Vocab", &["Kanji", "Reading", "Meaning"], 2)
            .unwrap();
        let sentence = store
            .add_note_type("Sentence", &["Expression", "Kanji", "Translation"], 1)
            .unwrap();
        Self {
            store,
            japanese,
            vocab_deck,
            extra_deck,
            reading_deck,
            other_deck,
            vocab,
            sentence,
        }
    }

    /// Adds a vocab note with a single card of ordinal 0 in `deck`.
    pub fn vocab(&self, kanji: &str, reading: &str, meaning: &str, deck: DeckId) -> NoteId {
        let note = self.store.add_note(self.vocab, &[kanji, reading, meaning]).unwrap();
        self.store.add_card(note, deck, 0).unwrap();
        note
    }

    /// Adds a sentence note with a card in the reading deck and returns it.
    pub fn sentence(&self, expression: &str, kanji: &str) -> Note {
        let id = self
            .store
            .add_note(self.sentence, &[expression, kanji, ""])
            .unwrap();
        self.store.add_card(id, self.reading_deck, 0).unwrap();
        self.note(id)
    }

    pub fn note(&self, id: NoteId) -> Note {
        self.store.note(id).unwrap().unwrap()
    }

    pub fn render(&self, template: &str, note: &Note, deck: DeckId) -> String {
        self.render_with(&Settings::default(), template, note, deck)
    }

    pub fn render_with(&self, settings: &Settings, template: &str, note: &Note, deck: DeckId) -> String {
        let processors = Processors::default();
        let session = Session::new(&self.store);
        let renderer = Renderer::new(Engine::new(&session, settings, &processors));
        renderer
            .render(template, &Invocation { note, deck })
            .unwrap()
    }

    /// Resolves `block` matching on the invoking note's `Kanji` field.
    pub fn resolve(&self, block: &str, note: &Note, deck: DeckId) -> Result<Resolved> {
        self.resolve_with(block, note, deck, &[])
    }

    pub fn resolve_with(&self, block: &str, note: &Note, deck: DeckId, steps: &[TransformStep]) -> Result<Resolved> {
        let request = FetchRequest::parse(block)?;
        let settings = Settings::default();
        let processors = Processors::default();
        let session = Session::new(&self.store);
        let engine = Engine::new(&session, &settings, &processors);
        engine.resolve_with(&request, &Invocation { note, deck }, MatchSource::Field("Kanji"), steps)
    }
}

/// A request for the `Meaning` of vocab notes in `Japanese::Vocab` whose
/// `Kanji` contains the match text, with `extra` clauses appended.
pub fn vocab_block(policy: &str, extra: &str) -> String {
    format!(
        "container-by-name='Japanese::Vocab'; type-by-name='Vocab'; match-field='Kanji'; \
         pick-policy='{policy}'; destination-field='Meaning'; {extra}"
    )
}

pub fn placeholder(block: &str) -> String {
    format!("{{{{fetch[{block}]:Kanji}}}}")
}

pub fn values(resolved: &Resolved) -> Vec<NoteId> {
    match resolved {
        Resolved::Values { notes, .. } => notes.clone(),
        _ => Vec::new(),
    }
}
