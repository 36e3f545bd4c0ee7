use thiserror::Error;

/// Problems with the argument block of a `fetch[...]` placeholder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown argument '{key}'")]
    UnknownArgument { key: String },
    #[error("Missing required argument '{key}'")]
    MissingRequiredArgument { key: String },
    #[error("Malformed value for '{key}': {value}")]
    MalformedValue { key: String, value: String },
    #[error("Invalid ordinal '{value}', expected a non-negative integer")]
    InvalidOrdinal { value: String },
    #[error("Invalid result-count '{value}', expected a positive integer")]
    InvalidCount { value: String },
    #[error("Unknown pick-policy '{value}', expected none, random, random_stable or least_reps")]
    UnknownPolicy { value: String },
    #[error("Arguments '{first}' and '{second}' cannot both be given")]
    ConflictingArgument { first: String, second: String },
    #[error("Argument '{key}' given more than once")]
    DuplicateArgument { key: String },
    #[error("Invalid id for '{key}': {value}")]
    InvalidId { key: String, value: String },
    #[error("Syntax error at line {line}, column {col}: {message}")]
    Syntax { message: String, line: usize, col: usize },
}

/// Problems that only show once the request meets the collection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Unknown deck '{0}'")]
    UnknownDeck(String),
    #[error("Unknown note type '{0}'")]
    UnknownNoteType(String),
    #[error("No field '{field}' in note type '{note_type}'")]
    UnknownField { field: String, note_type: String },
    #[error("Invalid ordinal {ordinal} for note type '{note_type}' with {templates} card template(s)")]
    InvalidOrdinal { ordinal: u32, note_type: String, templates: u32 },
    #[error("Unknown transform chain '{0}'")]
    UnknownTransformChain(String),
}

/// Problems within a single transform step. Scoped to one candidate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("Unknown regex flag '{0}'")]
    UnknownFlag(String),
    #[error("Unknown processor '{0}'")]
    UnknownProcessor(String),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FetchError {
    /// Errors that belong to one placeholder and are rendered inline
    /// rather than aborting the whole render.
    pub fn is_placeholder_scoped(&self) -> bool {
        matches!(
            self,
            Self::Parse(_) | Self::Resolution(_) | Self::Transform(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

// Helper conversions
impl From<rusqlite::Error> for FetchError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<config::ConfigError> for FetchError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for FetchError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Lock(e.to_string())
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
