//! Remote village document source and payload decoding.
//!
//! # Responsibility
//! - Abstract where the initial village document comes from.
//! - Decode and shape-check the JSON payload into records.
//!
//! # Invariants
//! - A decoded payload is always a JSON array of villages with unique ids.
//! - Decoding never partially succeeds; one bad element rejects the payload.

use crate::model::village::{Village, VillageId};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub type SourceResult<T> = Result<T, SourceError>;

/// Payload shape errors.
#[derive(Debug)]
pub enum FormatError {
    /// Payload is not parseable JSON.
    InvalidJson(serde_json::Error),
    /// Payload parsed but the top-level value is not an array.
    NotAnArray { found: &'static str },
    /// One array element does not decode as a village.
    InvalidRecord {
        index: usize,
        source: serde_json::Error,
    },
    /// Two elements share the same id.
    DuplicateId(VillageId),
}

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(err) => write!(f, "village payload is not valid JSON: {err}"),
            Self::NotAnArray { found } => {
                write!(f, "village payload must be an array, found {found}")
            }
            Self::InvalidRecord { index, source } => {
                write!(f, "village payload element {index} is invalid: {source}")
            }
            Self::DuplicateId(id) => write!(f, "village payload repeats id {id}"),
        }
    }
}

impl Error for FormatError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidJson(err) => Some(err),
            Self::InvalidRecord { source, .. } => Some(source),
            Self::NotAnArray { .. } | Self::DuplicateId(_) => None,
        }
    }
}

/// Failure to obtain a usable document from a source.
#[derive(Debug)]
pub enum SourceError {
    /// Transport-level failure (file missing, unreadable, ...).
    Unavailable {
        location: String,
        message: String,
    },
    Format(FormatError),
}

impl SourceError {
    pub fn unavailable(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable { location, message } => {
                write!(f, "village source `{location}` unavailable: {message}")
            }
            Self::Format(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unavailable { .. } => None,
            Self::Format(err) => Some(err),
        }
    }
}

impl From<FormatError> for SourceError {
    fn from(value: FormatError) -> Self {
        Self::Format(value)
    }
}

/// Read-only provider of the initial village document.
///
/// Implementations return the raw JSON text; decoding is shared.
pub trait VillageSource {
    /// Human-readable location used in logs and errors.
    fn location(&self) -> String;
    /// Fetches the raw document.
    fn fetch(&self) -> SourceResult<String>;
}

impl<S: VillageSource + ?Sized> VillageSource for &S {
    fn location(&self) -> String {
        (**self).location()
    }

    fn fetch(&self) -> SourceResult<String> {
        (**self).fetch()
    }
}

/// Static JSON document on the local file system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VillageSource for FileSource {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> SourceResult<String> {
        std::fs::read_to_string(&self.path)
            .map_err(|err| SourceError::unavailable(self.location(), err.to_string()))
    }
}

/// Decodes a village document.
///
/// # Errors
/// - `InvalidJson` when the text is not JSON.
/// - `NotAnArray` when the top-level value is not an array.
/// - `InvalidRecord` when an element does not decode.
/// - `DuplicateId` when two elements share an id.
pub fn decode_villages(payload: &str) -> Result<Vec<Village>, FormatError> {
    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(FormatError::InvalidJson)?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        other => {
            return Err(FormatError::NotAnArray {
                found: json_kind(&other),
            })
        }
    };

    let mut seen = HashSet::with_capacity(items.len());
    let mut villages = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let village: Village = serde_json::from_value(item)
            .map_err(|source| FormatError::InvalidRecord { index, source })?;
        if !seen.insert(village.id) {
            return Err(FormatError::DuplicateId(village.id));
        }
        villages.push(village);
    }
    Ok(villages)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
