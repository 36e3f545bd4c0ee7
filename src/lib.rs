//! Cardfetch – resolves `fetch[...]` placeholders in flashcard templates.
//!
//! A card template may pull a value out of *another* note in the collection:
//!
//! ```text
//! {{fetch[container-by-name='Japanese::Vocab'; type-by-name='Vocab';
//!         match-field='Kanji'; pick-policy='least_reps[0]';
//!         destination-field='Reading']:Kanji}}
//! ```
//!
//! Here the text of the rendered note's `Kanji` field is looked up in the
//! `Kanji` field of `Vocab` notes in the `Japanese::Vocab` deck (and decks
//! nested below it). One of the matching notes is selected and its `Reading`
//! field is rendered in place of the placeholder.
//!
//! * A [`collection::Note`] is a record with ordered, named fields.
//! * A [`collection::Card`] places a note in a deck, once per card template
//!   (its *ordinal*), and carries the review count.
//! * A [`collection::Deck`] is named by its full path, `Parent::Child`.
//! * A [`collection::NoteType`] defines field names and the number of card templates.
//!
//! ## Modules
//! * [`request`] – The argument mini-language (grammar in `fetch.pest`) parsed
//!   into a [`request::FetchRequest`].
//! * [`interpolate`] – Single pass expansion of `{{Field}}` references.
//! * [`collection`] – Domain types and the [`collection::Collection`] store trait.
//! * [`persist`] – The SQLite backed collection.
//! * [`gate`] – The deck hierarchy and the deck allow-list gate.
//! * [`select`] – Selection policies: `none`, `random`, `random_stable`, `least_reps`.
//! * [`transform`] – Regex and processor steps run on each fetched value.
//! * [`aggregate`] – Joining of several fetched values.
//! * [`session`] – Lookups remembered while rendering.
//! * [`resolve`] – The [`resolve::Engine`] running a request against a session.
//! * [`render`] – Rendering of whole templates, errors shown inline.
//! * [`batch`] – Rendering one template for many notes on worker threads.
//! * [`config`] – [`config::Settings`] from a file and the environment.
//!
//! ## Failure Policy
//! A placeholder that cannot be parsed, or that names an unknown deck, note
//! type, field or ordinal, renders as an error marker; the rest of the
//! template is unaffected. A card outside the deck allow-list, or a query
//! without matches, renders as the empty string. A transform that fails for
//! one selected note leaves only that note's value out.
//!
//! ## Quick Start
//! ```
//! use cardfetch::collection::Collection;
//! use cardfetch::config::Settings;
//! use cardfetch::persist::{PersistenceMode, SqliteCollection};
//! use cardfetch::render::Renderer;
//! use cardfetch::resolve::{Engine, Invocation};
//! use cardfetch::session::Session;
//! use cardfetch::transform::Processors;
//!
//! let store = SqliteCollection::new(PersistenceMode::InMemory).unwrap();
//! let deck = store.add_deck("Vocab").unwrap();
//! let vocab = store.add_note_type("Vocab", &["Word", "Meaning"], 1).unwrap();
//! let cat = store.add_note(vocab, &["neko", "cat"]).unwrap();
//! store.add_card(cat, deck, 0).unwrap();
//!
//! let settings = Settings::default();
//! let processors = Processors::default();
//! let session = Session::new(&store);
//! let renderer = Renderer::new(Engine::new(&session, &settings, &processors));
//! let note = store.note(cat).unwrap().unwrap();
//! let rendered = renderer
//!     .render(
//!         "{{Word}}: {{fetch[container-by-name='Vocab'; type-by-name='Vocab'; \
//!          match-field='Word'; pick-policy='none'; destination-field='Meaning']:Word}}",
//!         &Invocation { note: &note, deck },
//!     )
//!     .unwrap();
//! assert_eq!(rendered, "neko: cat");
//! ```

pub mod aggregate;
pub mod batch;
pub mod collection;
pub mod config;
pub mod error;
pub mod gate;
pub mod interpolate;
pub mod persist;
pub mod render;
pub mod request;
pub mod resolve;
pub mod select;
pub mod session;
pub mod transform;
