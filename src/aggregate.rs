use tracing::warn;

use crate::collection::NoteId;
use crate::error::TransformError;

pub const DEFAULT_SEPARATOR: &str = ",";

/// The joined value of a placeholder together with the candidates that
/// failed to transform and were left out of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    pub text: String,
    pub failures: Vec<(NoteId, TransformError)>,
}

/// Joins the per note values in selection order. A failed note is skipped,
/// the others still contribute. No values give an empty string.
pub fn aggregate(values: Vec<(NoteId, Result<String, TransformError>)>, separator: &str) -> Aggregate {
    let mut joined = Vec::with_capacity(values.len());
    let mut failures = Vec::new();
    for (note, value) in values {
        match value {
            Ok(text) => joined.push(text),
            Err(error) => {
                warn!(note, %error, "transform failed, value left out");
                failures.push((note, error));
            }
        }
    }
    Aggregate {
        text: joined.join(separator),
        failures,
    }
}
