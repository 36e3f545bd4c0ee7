//! Choosing which of the matching notes a placeholder returns.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use roaring::RoaringTreemap;
use tracing::debug;

use crate::collection::{Card, DeckId, Note, NoteTypeId};
use crate::request::SelectionPolicy;

/// A matching note together with its cards that are in the queried decks
/// and not suspended.
#[derive(Debug, Clone)]
pub struct Candidate<'n> {
    pub note: &'n Note,
    pub cards: Vec<Card>,
}

/// The query shape a `random_stable` draw is keyed on. Two placeholders
/// querying the same deck, note type and match field draw the same notes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StableKey<'a> {
    pub deck: DeckId,
    pub note_type: NoteTypeId,
    pub match_field: &'a str,
}

impl StableKey<'_> {
    pub fn seed(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.deck.to_le_bytes());
        hasher.update(&self.note_type.to_le_bytes());
        hasher.update(self.match_field.as_bytes());
        *hasher.finalize().as_bytes()
    }
}

/// Picks up to `count` notes among `candidates` according to `policy`.
///
/// When fewer than `count` candidates are eligible, all of them are
/// returned in store order and the policy has no effect. With exactly
/// `count` eligible the policy still decides the order. Under
/// `least_reps[n]` a candidate without a card of ordinal `n` is not eligible.
pub fn select<'n>(
    candidates: &[Candidate<'n>],
    policy: SelectionPolicy,
    count: usize,
    key: &StableKey,
) -> Vec<&'n Note> {
    let eligible: Vec<&Candidate<'n>> = candidates
        .iter()
        .filter(|candidate| match policy.ordinal() {
            Some(ordinal) => candidate.cards.iter().any(|card| card.ordinal == ordinal),
            None => true,
        })
        .collect();
    if eligible.len() < count {
        return eligible.iter().map(|candidate| candidate.note).collect();
    }
    let selected = match policy {
        SelectionPolicy::None => eligible
            .iter()
            .take(count)
            .map(|candidate| candidate.note)
            .collect(),
        SelectionPolicy::Random => {
            let mut rng = rand::rng();
            index::sample(&mut rng, eligible.len(), count)
                .into_iter()
                .map(|i| eligible[i].note)
                .collect()
        }
        SelectionPolicy::RandomStable => {
            let mut rng = StdRng::from_seed(key.seed());
            index::sample(&mut rng, eligible.len(), count)
                .into_iter()
                .map(|i| eligible[i].note)
                .collect()
        }
        SelectionPolicy::LeastReps(ordinal) => least_reps(&eligible, ordinal, count),
    };
    debug!(
        ?policy,
        eligible = eligible.len(),
        selected = selected.len(),
        "selected notes"
    );
    selected
}

// Cards are ranked by review count, ties keep store order. Several cards of
// one note count once.
fn least_reps<'n>(eligible: &[&Candidate<'n>], ordinal: Option<u32>, count: usize) -> Vec<&'n Note> {
    let mut ranked: Vec<(usize, &Card)> = eligible
        .iter()
        .enumerate()
        .flat_map(|(position, candidate)| {
            candidate
                .cards
                .iter()
                .filter(move |card| ordinal.is_none_or(|ordinal| card.ordinal == ordinal))
                .map(move |card| (position, card))
        })
        .collect();
    ranked.sort_by_key(|(_, card)| card.reps);

    let mut seen = RoaringTreemap::new();
    let mut selected = Vec::with_capacity(count);
    for (position, card) in ranked {
        if selected.len() == count {
            break;
        }
        if seen.insert(card.note) {
            selected.push(eligible[position].note);
        }
    }
    selected
}
