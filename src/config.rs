//! Settings read from an optional config file and `CARDFETCH_*` environment
//! variables, on top of built-in defaults.
//!
//! ```toml
//! database = "collection.db"
//! default_separator = ", "
//! log_filter = "cardfetch=debug"
//!
//! [[transform_chains.plain]]
//! kind = "processor"
//! name = "strip-html"
//!
//! [[transform_chains.plain]]
//! kind = "regex"
//! pattern = "\\s*\\(.*?\\)"
//! replacement = ""
//! ```

use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;

use crate::aggregate::DEFAULT_SEPARATOR;
use crate::error::Result;
use crate::transform::TransformStep;

/// Looked up in the working directory when no config file is given.
pub const DEFAULT_CONFIG: &str = "cardfetch";
pub const ENVIRONMENT_PREFIX: &str = "CARDFETCH";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path of the SQLite collection.
    pub database: Option<String>,
    /// Joins several fetched values when a placeholder gives no separator.
    pub default_separator: String,
    /// Rendered in place of a failing placeholder; `{error}` is replaced by the message.
    pub error_marker: String,
    pub log_filter: String,
    /// Worker threads for batch rendering.
    pub workers: usize,
    /// Named chains a placeholder can pick with `transform-chain`.
    pub transform_chains: HashMap<String, Vec<TransformStep>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: None,
            default_separator: DEFAULT_SEPARATOR.to_string(),
            error_marker: r#"<span class="fetch-error">{error}</span>"#.to_string(),
            log_filter: "cardfetch=info".to_string(),
            workers: 4,
            transform_chains: HashMap::new(),
        }
    }
}

impl Settings {
    /// Reads `path` if given, otherwise `cardfetch.*` in the working
    /// directory when present, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG).required(false),
        };
        let settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENVIRONMENT_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }

    pub fn transform_chain(&self, name: &str) -> Option<&[TransformStep]> {
        self.transform_chains.get(name).map(Vec::as_slice)
    }

    /// The inline marker for a failed placeholder.
    pub fn error_marker(&self, error: &impl Display) -> String {
        self.error_marker
            .replace("{error}", &escape_html(&error.to_string()))
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
