//! Error types for the data-loader crate.
//!
//! Two families live here: failures while reading the MovieLens tables, and
//! lookup failures against the loaded store (unknown user, unknown movie).
//! Both abort the current request and carry the offending identifier.

use thiserror::Error;

use crate::types::{MovieId, UserId};

/// Errors raised while loading or querying the rating store.
#[derive(Error, Debug)]
pub enum DataError {
    /// Dataset name is not one of the known MovieLens releases
    #[error("Unknown dataset: {name}")]
    InvalidDataset { name: String },

    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Row in a CSV table couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: u64,
        reason: String,
    },

    /// A data field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Referenced entity doesn't exist (e.g., rating for non-existent movie)
    #[error("Missing reference: {entity} with id {id}")]
    MissingReference { entity: String, id: u32 },

    /// The user never appears in the ratings table
    #[error("There is no user with userId={0}.")]
    UnknownUser(UserId),

    /// The movie is not in the movies table
    #[error("There is no movie with movieId={0}.")]
    UnknownMovie(MovieId),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataError>;
