use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cardfetch::batch::Batch;
use cardfetch::collection::{Collection, DeckId, NoteId, NoteTypeRef};
use cardfetch::config::Settings;
use cardfetch::error::{FetchError, ResolutionError, Result};
use cardfetch::persist::{PersistenceMode, SqliteCollection};
use cardfetch::render::Renderer;
use cardfetch::request::FetchRequest;
use cardfetch::resolve::{Engine, Invocation};
use cardfetch::session::Session;
use cardfetch::transform::Processors;

#[derive(Parser, Debug)]
#[command(name = "cardfetch", version, about = "Resolves fetch[...] placeholders in card templates")]
struct Cli {
    #[arg(long, global = true, help = "Config file, defaults to cardfetch.* in the working directory")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "SQLite collection, overrides the configured database")]
    db: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse an argument block and print the request as JSON.
    Check { arguments: String },
    /// Render a template for one note.
    Render {
        #[arg(long)]
        note: NoteId,
        #[arg(long, help = "Deck of the rendered card, defaults to the deck of the note's first card")]
        deck: Option<DeckId>,
        #[arg(long)]
        template: PathBuf,
    },
    /// Render a template for every note of a note type.
    Batch {
        #[arg(long)]
        note_type: String,
        #[arg(long)]
        template: PathBuf,
        #[arg(long, default_value = "{{__Note ID}}", help = "Label printed before each rendering")]
        label: String,
        #[arg(long)]
        deck: Option<DeckId>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check { arguments } => {
            let request = FetchRequest::parse(&arguments)?;
            println!("{}", serde_json::to_string_pretty(&request)?);
        }
        Commands::Render { note, deck, template } => {
            let store = open(cli.db, &settings)?;
            let template = fs::read_to_string(&template)?;
            let processors = Processors::default();
            let session = Session::new(&store);
            let found = store
                .note(note)?
                .ok_or_else(|| FetchError::Persistence(format!("Unknown note {note}")))?;
            let deck = match deck {
                Some(deck) => deck,
                None => session.cards(note)?.first().map(|card| card.deck).unwrap_or_default(),
            };
            let renderer = Renderer::new(Engine::new(&session, &settings, &processors));
            println!("{}", renderer.render(&template, &Invocation { note: &found, deck })?);
        }
        Commands::Batch {
            note_type,
            template,
            label,
            deck,
        } => {
            let store = open(cli.db, &settings)?;
            let template = fs::read_to_string(&template)?;
            let processors = Processors::default();
            let found = store
                .note_type(&NoteTypeRef::Name(note_type.clone()))?
                .ok_or(ResolutionError::UnknownNoteType(note_type))?;
            let notes = store.notes_of_type(found.id())?;
            info!(note_type = found.name(), notes = notes.len(), "rendering batch");
            let report = Batch::new(&store, &settings, &processors).run(&template, &label, &notes, deck);
            for row in report.rows {
                match row.output {
                    Ok(output) => println!("{}\t{}", row.label, output),
                    Err(e) => error!(note = row.note, error = %e, "render failed"),
                }
            }
        }
    }
    Ok(())
}

fn open(db: Option<String>, settings: &Settings) -> Result<SqliteCollection> {
    let path = db
        .or_else(|| settings.database.clone())
        .ok_or_else(|| FetchError::Config("no database given, use --db or set database".to_string()))?;
    SqliteCollection::new(PersistenceMode::File(path))
}
