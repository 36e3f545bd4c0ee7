//! Resolution of one parsed placeholder against the collection.
//!
//! The [`Engine`] runs the steps in a fixed order: the deck allow-list gate,
//! checks of the request against the note type, the note search, scoping to
//! the queried deck, selection, and finally the transform chain and joining
//! of the fetched values.

use tracing::{debug, trace};

use crate::aggregate::{Aggregate, aggregate};
use crate::collection::{DeckId, Note, NoteId, NoteType};
use crate::config::Settings;
use crate::error::{ResolutionError, Result};
use crate::gate::admits;
use crate::interpolate::expand;
use crate::request::FetchRequest;
use crate::select::{Candidate, StableKey, select};
use crate::session::Session;
use crate::transform::{Processors, TransformStep, apply};

/// Where the text to match on comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource<'a> {
    /// A field of the invoking note, read by name ignoring case.
    Field(&'a str),
    /// Text already taken from the invoking note.
    Text(&'a str),
}

/// The card a placeholder is rendered for.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub note: &'a Note,
    /// Deck of the card being rendered.
    pub deck: DeckId,
}

/// Outcome of resolving one placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// The card's deck is not in the allow-list.
    Excluded,
    /// The match text is empty, or no note in the queried decks matches.
    NoMatch,
    /// Values of the selected notes, in selection order.
    Values {
        notes: Vec<NoteId>,
        aggregate: Aggregate,
    },
}

impl Resolved {
    /// What is rendered in place of the placeholder.
    pub fn text(&self) -> &str {
        match self {
            Self::Values { aggregate, .. } => &aggregate.text,
            Self::Excluded | Self::NoMatch => "",
        }
    }
    pub fn into_text(self) -> String {
        match self {
            Self::Values { aggregate, .. } => aggregate.text,
            Self::Excluded | Self::NoMatch => String::new(),
        }
    }
}

pub struct Engine<'s, 'c> {
    session: &'s Session<'c>,
    settings: &'s Settings,
    processors: &'s Processors,
}

impl<'s, 'c> Engine<'s, 'c> {
    pub fn new(session: &'s Session<'c>, settings: &'s Settings, processors: &'s Processors) -> Self {
        Self {
            session,
            settings,
            processors,
        }
    }

    pub fn session(&self) -> &'s Session<'c> {
        self.session
    }

    pub fn settings(&self) -> &'s Settings {
        self.settings
    }

    /// Resolves `request` for the card described by `invocation`, applying
    /// the transform chain named in the request, if any.
    pub fn resolve(&self, request: &FetchRequest, invocation: &Invocation, source: MatchSource) -> Result<Resolved> {
        let steps: &[TransformStep] = match request.transform_chain.as_deref() {
            Some(name) => self
                .settings
                .transform_chain(name)
                .ok_or_else(|| ResolutionError::UnknownTransformChain(name.to_string()))?,
            None => &[],
        };
        self.resolve_with(request, invocation, source, steps)
    }

    /// Resolves `request` and runs every fetched value through `steps`.
    pub fn resolve_with(
        &self,
        request: &FetchRequest,
        invocation: &Invocation,
        source: MatchSource,
        steps: &[TransformStep],
    ) -> Result<Resolved> {
        let tree = self.session.deck_tree()?;
        if !admits(&tree, invocation.deck, request.deck_allow_list.as_deref(), invocation.note) {
            return Ok(Resolved::Excluded);
        }

        let deck = self
            .session
            .deck_id(&request.deck)?
            .ok_or_else(|| ResolutionError::UnknownDeck(request.deck.to_string()))?;
        let note_type = self
            .session
            .note_type(&request.note_type)?
            .ok_or_else(|| ResolutionError::UnknownNoteType(request.note_type.to_string()))?;
        check_request(request, &note_type)?;

        let needle = match source {
            MatchSource::Field(name) => expand(&format!("{{{{{name}}}}}"), invocation.note),
            MatchSource::Text(text) => text.to_string(),
        };
        if needle.is_empty() {
            trace!(note = invocation.note.id(), "empty match text");
            return Ok(Resolved::NoMatch);
        }

        let found = self
            .session
            .find_notes(note_type.id(), &request.match_field, &needle)?;
        let scope = tree.descendants(deck);
        let mut candidates = Vec::with_capacity(found.len());
        for note in found.iter() {
            let cards: Vec<_> = self
                .session
                .cards(note.id())?
                .iter()
                .filter(|card| !card.suspended && scope.contains(card.deck))
                .copied()
                .collect();
            if !cards.is_empty() {
                candidates.push(Candidate { note, cards });
            }
        }
        debug!(
            deck,
            note_type = note_type.name(),
            found = found.len(),
            candidates = candidates.len(),
            "matched notes"
        );
        if candidates.is_empty() {
            return Ok(Resolved::NoMatch);
        }

        let key = StableKey {
            deck,
            note_type: note_type.id(),
            match_field: &request.match_field,
        };
        let selected = select(&candidates, request.policy, request.result_count.get(), &key);
        let notes: Vec<NoteId> = selected.iter().map(|note| note.id()).collect();
        let values = selected
            .into_iter()
            .map(|note| {
                let raw = note.field(&request.destination_field).unwrap_or_default();
                (note.id(), apply(steps, raw, invocation.note, self.processors))
            })
            .collect();
        let aggregate = aggregate(values, request.separator_or(&self.settings.default_separator));
        Ok(Resolved::Values { notes, aggregate })
    }
}

// Field names and ordinals the request uses must exist in the note type.
fn check_request(request: &FetchRequest, note_type: &NoteType) -> std::result::Result<(), ResolutionError> {
    for field in [&request.match_field, &request.destination_field] {
        if !note_type.has_field(field) {
            return Err(ResolutionError::UnknownField {
                field: field.clone(),
                note_type: note_type.name().to_string(),
            });
        }
    }
    if let Some(ordinal) = request.policy.ordinal() {
        if ordinal >= note_type.templates() {
            return Err(ResolutionError::InvalidOrdinal {
                ordinal,
                note_type: note_type.name().to_string(),
                templates: note_type.templates(),
            });
        }
    }
    Ok(())
}
