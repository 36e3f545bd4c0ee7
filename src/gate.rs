//! Deck hierarchy and the deck allow-list gate.
//!
//! Nested decks are named by their full path (`Parent::Child`), so the
//! hierarchy is kept as a flat map from deck id to path. Ancestors are found
//! by cutting the path at its separators rather than by walking links.

use bimap::BiMap;
use roaring::RoaringTreemap;
use tracing::{debug, warn};

use crate::collection::{DECK_SEPARATOR, Deck, DeckId, Note};
use crate::interpolate::expand;

#[derive(Debug, Default)]
pub struct DeckTree {
    // deck id <-> lower case full path
    paths: BiMap<DeckId, String>,
}

impl DeckTree {
    pub fn new(decks: impl IntoIterator<Item = Deck>) -> Self {
        let mut paths = BiMap::new();
        for deck in decks {
            if let Err((id, path)) = paths.insert_no_overwrite(deck.id, normalize(&deck.name)) {
                warn!(deck = id, %path, "deck id or path already taken, deck ignored");
            }
        }
        Self { paths }
    }
    pub fn len(&self) -> usize {
        self.paths.len()
    }
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
    /// Lower case full path of a deck.
    pub fn path(&self, deck: DeckId) -> Option<&str> {
        self.paths.get_by_left(&deck).map(String::as_str)
    }
    /// Deck id for a path, ignoring case.
    pub fn id(&self, path: &str) -> Option<DeckId> {
        self.paths.get_by_right(&normalize(path)).copied()
    }
    /// The deck's own path followed by the paths of its ancestors, nearest first.
    pub fn lineage(&self, deck: DeckId) -> Vec<&str> {
        let Some(path) = self.path(deck) else {
            return Vec::new();
        };
        let mut lineage = vec![path];
        let mut rest = path;
        while let Some((parent, _)) = rest.rsplit_once(DECK_SEPARATOR) {
            lineage.push(parent);
            rest = parent;
        }
        lineage
    }
    /// The deck and every deck nested below it.
    pub fn descendants(&self, deck: DeckId) -> RoaringTreemap {
        let mut subtree = RoaringTreemap::new();
        let Some(root) = self.path(deck) else {
            return subtree;
        };
        let prefix = format!("{root}{DECK_SEPARATOR}");
        for (id, path) in self.paths.iter() {
            if path == root || path.starts_with(&prefix) {
                subtree.insert(*id);
            }
        }
        subtree
    }
    /// Whether `deck`, or one of its ancestors, is named in `allowed`.
    pub fn allows(&self, deck: DeckId, allowed: &[String]) -> bool {
        let allowed: Vec<String> = allowed.iter().map(|name| normalize(name)).collect();
        self.lineage(deck)
            .into_iter()
            .any(|path| allowed.iter().any(|name| name == path))
    }
}

/// Applies the deck allow-list of a request for the card being rendered.
///
/// Entries are interpolated against the invoking note first. A missing or
/// empty list admits everything; a deck outside a non-empty list is not an
/// error, the placeholder is just inert there.
pub fn admits(tree: &DeckTree, deck: DeckId, allow_list: Option<&[String]>, note: &Note) -> bool {
    let Some(allow_list) = allow_list.filter(|list| !list.is_empty()) else {
        return true;
    };
    let expanded: Vec<String> = allow_list.iter().map(|entry| expand(entry, note)).collect();
    let admitted = tree.allows(deck, &expanded);
    if !admitted {
        debug!(deck, allow_list = ?expanded, "deck not in allow-list");
    }
    admitted
}

fn normalize(path: &str) -> String {
    path.split(DECK_SEPARATOR)
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(DECK_SEPARATOR)
        .to_lowercase()
}
