// used for persistence
use rusqlite::{Connection, OptionalExtension, params};
use std::sync::Mutex;
use tracing::debug;

use crate::collection::{
    Card, CardId, Collection, DECK_SEPARATOR, Deck, DeckId, DeckRef, Note, NoteId, NoteType,
    NoteTypeId, NoteTypeRef,
};
use crate::error::{FetchError, Result};

/// Field values of a note are kept in one column, separated by the unit separator.
pub const FIELD_SEPARATOR: char = '\x1f';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    InMemory,
    File(String),
}

const SCHEMA: &str = "
    create table if not exists Deck (
        Deck_Identity integer not null primary key,
        Name text not null collate nocase,
        constraint unique_Deck_Name unique (Name)
    );
    create table if not exists NoteType (
        NoteType_Identity integer not null primary key,
        Name text not null collate nocase,
        Fields text not null,
        Templates integer not null,
        constraint unique_NoteType_Name unique (Name)
    );
    create table if not exists Note (
        Note_Identity integer not null primary key,
        NoteType_Identity integer not null,
        Fields text not null,
        constraint referenced_NoteType foreign key (NoteType_Identity) references NoteType(NoteType_Identity)
    );
    create table if not exists Card (
        Card_Identity integer not null primary key,
        Note_Identity integer not null,
        Deck_Identity integer not null,
        Ordinal integer not null,
        Reps integer not null default 0,
        Suspended integer not null default 0,
        constraint referenced_Note foreign key (Note_Identity) references Note(Note_Identity),
        constraint referenced_Deck foreign key (Deck_Identity) references Deck(Deck_Identity),
        constraint unique_Card unique (Note_Identity, Ordinal)
    );
    create index if not exists Note_NoteType on Note (NoteType_Identity);
    create index if not exists Card_Note on Card (Note_Identity);
";

/// A [`Collection`] stored in SQLite.
///
/// Reads and writes are serialized through a single connection.
pub struct SqliteCollection {
    connection: Mutex<Connection>,
}

impl SqliteCollection {
    pub fn new(mode: PersistenceMode) -> Result<Self> {
        let connection = match &mode {
            PersistenceMode::InMemory => Connection::open_in_memory()?,
            PersistenceMode::File(path) => Connection::open(path)?,
        };
        connection.execute_batch(SCHEMA)?;
        debug!(?mode, "opened collection");
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Adds a deck, creating any missing parent decks along its path.
    /// Returns the id of the (possibly pre-existing) deck.
    pub fn add_deck(&self, name: &str) -> Result<DeckId> {
        let connection = self.connection.lock()?;
        let mut path = String::new();
        let mut id = 0;
        for segment in name.split(DECK_SEPARATOR) {
            if !path.is_empty() {
                path.push_str(DECK_SEPARATOR);
            }
            path.push_str(segment.trim());
            connection.execute("insert or ignore into Deck (Name) values (?)", params![&path])?;
            id = connection.query_row(
                "select Deck_Identity from Deck where Name = ?",
                params![&path],
                |r| r.get(0),
            )?;
        }
        Ok(id)
    }

    pub fn add_note_type(&self, name: &str, fields: &[&str], templates: u32) -> Result<NoteTypeId> {
        let connection = self.connection.lock()?;
        let joined = fields.join(&FIELD_SEPARATOR.to_string());
        connection.execute(
            "insert into NoteType (Name, Fields, Templates) values (?, ?, ?)",
            params![name, &joined, templates],
        )?;
        Ok(connection.last_insert_rowid() as NoteTypeId)
    }

    /// Adds a note whose values are given in the note type's field order.
    pub fn add_note(&self, note_type: NoteTypeId, values: &[&str]) -> Result<NoteId> {
        let connection = self.connection.lock()?;
        let names: String = connection
            .query_row(
                "select Fields from NoteType where NoteType_Identity = ?",
                params![note_type],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| FetchError::Persistence(format!("Unknown note type {note_type}")))?;
        let expected = names.split(FIELD_SEPARATOR).count();
        if values.len() != expected {
            return Err(FetchError::Persistence(format!(
                "Note type {note_type} has {expected} field(s), got {} value(s)",
                values.len()
            )));
        }
        let joined = values.join(&FIELD_SEPARATOR.to_string());
        connection.execute(
            "insert into Note (NoteType_Identity, Fields) values (?, ?)",
            params![note_type, &joined],
        )?;
        Ok(connection.last_insert_rowid() as NoteId)
    }

    pub fn add_card(&self, note: NoteId, deck: DeckId, ordinal: u32) -> Result<CardId> {
        let connection = self.connection.lock()?;
        connection.execute(
            "insert into Card (Note_Identity, Deck_Identity, Ordinal) values (?, ?, ?)",
            params![note, deck, ordinal],
        )?;
        Ok(connection.last_insert_rowid() as CardId)
    }

    pub fn set_reps(&self, card: CardId, reps: u32) -> Result<()> {
        let connection = self.connection.lock()?;
        connection.execute(
            "update Card set Reps = ? where Card_Identity = ?",
            params![reps, card],
        )?;
        Ok(())
    }

    pub fn set_suspended(&self, card: CardId, suspended: bool) -> Result<()> {
        let connection = self.connection.lock()?;
        connection.execute(
            "update Card set Suspended = ? where Card_Identity = ?",
            params![suspended, card],
        )?;
        Ok(())
    }
}

fn zip_fields(names: &str, values: &str) -> Vec<(String, String)> {
    let mut values = values.split(FIELD_SEPARATOR);
    names
        .split(FIELD_SEPARATOR)
        .map(|name| (name.to_string(), values.next().unwrap_or_default().to_string()))
        .collect()
}

fn note_type_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NoteType> {
    let fields: String = row.get(2)?;
    Ok(NoteType::new(
        row.get(0)?,
        row.get(1)?,
        fields.split(FIELD_SEPARATOR).map(String::from).collect(),
        row.get(3)?,
    ))
}

impl Collection for SqliteCollection {
    fn decks(&self) -> Result<Vec<Deck>> {
        let connection = self.connection.lock()?;
        let mut statement =
            connection.prepare_cached("select Deck_Identity, Name from Deck order by Deck_Identity")?;
        let decks = statement
            .query_map([], |row| {
                Ok(Deck {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(decks)
    }

    fn deck_id(&self, deck: &DeckRef) -> Result<Option<DeckId>> {
        let connection = self.connection.lock()?;
        let id = match deck {
            DeckRef::Id(id) => connection
                .prepare_cached("select Deck_Identity from Deck where Deck_Identity = ?")?
                .query_row(params![id], |r| r.get(0))
                .optional()?,
            DeckRef::Name(name) => connection
                .prepare_cached("select Deck_Identity from Deck where Name = ?")?
                .query_row(params![name.trim()], |r| r.get(0))
                .optional()?,
        };
        Ok(id)
    }

    fn note_type(&self, note_type: &NoteTypeRef) -> Result<Option<NoteType>> {
        let connection = self.connection.lock()?;
        let found = match note_type {
            NoteTypeRef::Id(id) => connection
                .prepare_cached(
                    "select NoteType_Identity, Name, Fields, Templates from NoteType where NoteType_Identity = ?",
                )?
                .query_row(params![id], note_type_from_row)
                .optional()?,
            NoteTypeRef::Name(name) => connection
                .prepare_cached(
                    "select NoteType_Identity, Name, Fields, Templates from NoteType where Name = ?",
                )?
                .query_row(params![name.trim()], note_type_from_row)
                .optional()?,
        };
        Ok(found)
    }

    fn find_notes(&self, note_type: NoteTypeId, field: &str, needle: &str) -> Result<Vec<Note>> {
        let connection = self.connection.lock()?;
        let mut statement = connection.prepare_cached(
            "
            select n.Note_Identity, t.Fields, n.Fields
                from Note n
                join NoteType t
                on t.NoteType_Identity = n.NoteType_Identity
                where n.NoteType_Identity = ?
                order by n.Note_Identity
        ",
        )?;
        let mut rows = statement.query(params![note_type])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            let names: String = row.get(1)?;
            let values: String = row.get(2)?;
            let fields = zip_fields(&names, &values);
            let matches = fields
                .iter()
                .any(|(name, value)| name == field && value.contains(needle));
            if matches {
                notes.push(Note::new(row.get(0)?, note_type, fields));
            }
        }
        Ok(notes)
    }

    fn note(&self, id: NoteId) -> Result<Option<Note>> {
        let connection = self.connection.lock()?;
        let note = connection
            .prepare_cached(
                "
                select n.NoteType_Identity, t.Fields, n.Fields
                    from Note n
                    join NoteType t
                    on t.NoteType_Identity = n.NoteType_Identity
                    where n.Note_Identity = ?
            ",
            )?
            .query_row(params![id], |row| {
                let names: String = row.get(1)?;
                let values: String = row.get(2)?;
                Ok(Note::new(id, row.get(0)?, zip_fields(&names, &values)))
            })
            .optional()?;
        Ok(note)
    }

    fn cards(&self, note: NoteId) -> Result<Vec<Card>> {
        let connection = self.connection.lock()?;
        let mut statement = connection.prepare_cached(
            "
            select Card_Identity, Deck_Identity, Ordinal, Reps, Suspended
                from Card
                where Note_Identity = ?
                order by Ordinal, Card_Identity
        ",
        )?;
        let cards = statement
            .query_map(params![note], |row| {
                Ok(Card {
                    id: row.get(0)?,
                    note,
                    deck: row.get(1)?,
                    ordinal: row.get(2)?,
                    reps: row.get(3)?,
                    suspended: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(cards)
    }

    fn notes_of_type(&self, note_type: NoteTypeId) -> Result<Vec<NoteId>> {
        let connection = self.connection.lock()?;
        let mut statement = connection.prepare_cached(
            "select Note_Identity from Note where NoteType_Identity = ? order by Note_Identity",
        )?;
        let ids = statement
            .query_map(params![note_type], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}
