//! Threaded rendering of one template for many notes.
//!
//! Notes are handed out to a fixed number of worker threads. Each worker
//! owns its own [`Session`], so lookups are remembered per worker and never
//! shared. Cancellation is cooperative: workers check the [`CancelToken`]
//! before taking the next note and finish the one they are on.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;
use tracing::{info, warn};

use crate::collection::{Collection, DeckId, NoteId};
use crate::config::Settings;
use crate::error::{FetchError, Result};
use crate::interpolate::interpolate_file_name;
use crate::render::Renderer;
use crate::resolve::{Engine, Invocation};
use crate::session::Session;
use crate::transform::Processors;

/// Cancellation token shared with the worker threads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);
impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The rendering of one note.
#[derive(Debug)]
pub struct BatchRow {
    pub note: NoteId,
    /// The label template expanded for this note, e.g. an output file name.
    pub label: String,
    pub output: Result<String>,
}

#[derive(Debug)]
pub struct BatchReport {
    /// Rows of the notes that were rendered, in input order.
    pub rows: Vec<BatchRow>,
    pub cancelled: bool,
}

pub struct Batch<'a> {
    collection: &'a dyn Collection,
    settings: &'a Settings,
    processors: &'a Processors,
    cancel: CancelToken,
}

impl<'a> Batch<'a> {
    pub fn new(collection: &'a dyn Collection, settings: &'a Settings, processors: &'a Processors) -> Self {
        Self {
            collection,
            settings,
            processors,
            cancel: CancelToken::new(),
        }
    }

    /// A token that stops this batch when cancelled, also from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Renders `template` for every note in `notes`. The invoking deck is
    /// `deck` when given, otherwise the deck of the note's first card.
    pub fn run(&self, template: &str, label_template: &str, notes: &[NoteId], deck: Option<DeckId>) -> BatchReport {
        let started = Instant::now();
        let workers = self.settings.workers.clamp(1, notes.len().max(1));
        let next = &AtomicUsize::new(0);
        let mut indexed: Vec<(usize, BatchRow)> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(move || {
                        let session = Session::new(self.collection);
                        let renderer = Renderer::new(Engine::new(&session, self.settings, self.processors));
                        let mut rows = Vec::new();
                        while !self.cancel.is_cancelled() {
                            let index = next.fetch_add(1, Ordering::SeqCst);
                            let Some(&note) = notes.get(index) else {
                                break;
                            };
                            rows.push((index, self.render_note(&renderer, note, template, label_template, deck)));
                        }
                        rows
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(rows) => rows,
                    Err(_) => {
                        warn!("batch worker panicked");
                        Vec::new()
                    }
                })
                .collect()
        });
        indexed.sort_by_key(|(index, _)| *index);
        let cancelled = self.cancel.is_cancelled();
        info!(
            rendered = indexed.len(),
            total = notes.len(),
            workers,
            cancelled,
            elapsed = ?started.elapsed(),
            "batch finished"
        );
        BatchReport {
            rows: indexed.into_iter().map(|(_, row)| row).collect(),
            cancelled,
        }
    }

    fn render_note(
        &self,
        renderer: &Renderer,
        note: NoteId,
        template: &str,
        label_template: &str,
        deck: Option<DeckId>,
    ) -> BatchRow {
        let session = renderer.engine().session();
        let Some(found) = session.collection().note(note).transpose() else {
            warn!(note, "note not in collection");
            return BatchRow {
                note,
                label: String::new(),
                output: Err(FetchError::Persistence(format!("Unknown note {note}"))),
            };
        };
        let output = found.and_then(|found| {
            let deck = match deck {
                Some(deck) => deck,
                None => session
                    .cards(note)?
                    .first()
                    .map(|card| card.deck)
                    .unwrap_or_default(),
            };
            let invocation = Invocation { note: &found, deck };
            let rendered = renderer.render(template, &invocation)?;
            Ok((interpolate_file_name(label_template, &found), rendered))
        });
        match output {
            Ok((label, rendered)) => BatchRow {
                note,
                label,
                output: Ok(rendered),
            },
            Err(error) => {
                warn!(note, %error, "note could not be rendered");
                BatchRow {
                    note,
                    label: String::new(),
                    output: Err(error),
                }
            }
        }
    }
}
