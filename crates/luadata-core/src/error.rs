//! Error types for loading, comparing and serializing Lua data files.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur anywhere between reading a data file and writing its
/// canonical form.
#[derive(Error, Debug)]
pub enum LuaDataError {
    /// The source file could not be read, or the output could not be written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Lua rejected the source text, or raised an error while running it.
    #[error("failed to execute {chunk}: {source}")]
    Exec {
        chunk: String,
        #[source]
        source: mlua::Error,
    },

    /// A global or field that must hold a table holds something else.
    #[error("{name} is not a table (found {found})")]
    NotATable { name: String, found: &'static str },

    /// The entry field is absent from the module table.
    #[error("entry {name} is missing")]
    MissingEntry { name: String },

    /// Decoding went deeper than the configured limit.
    #[error("table nesting exceeds {limit} levels at {path}")]
    TooDeep { path: String, limit: usize },

    /// The loaded files do not yield exactly two matching entries.
    #[error("aggregation error: {0}")]
    Aggregation(String),

    /// The comparator could not produce a boolean result.
    #[error("comparison error: {0}")]
    Comparison(String),

    /// The value tree could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification of [`LuaDataError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Load,
    Aggregation,
    Comparison,
    Serialization,
}

impl LuaDataError {
    /// Returns the error class this variant belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LuaDataError::Io { .. }
            | LuaDataError::Exec { .. }
            | LuaDataError::NotATable { .. }
            | LuaDataError::MissingEntry { .. }
            | LuaDataError::TooDeep { .. } => ErrorKind::Load,
            LuaDataError::Aggregation(_) => ErrorKind::Aggregation,
            LuaDataError::Comparison(_) => ErrorKind::Comparison,
            LuaDataError::Serialization(_) => ErrorKind::Serialization,
        }
    }
}

/// Convenience alias used throughout luadata-core.
pub type Result<T> = std::result::Result<T, LuaDataError>;
