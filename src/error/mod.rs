//! # Error Module
//!
//! Error types for the media library core.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, tokens, offsets, what went wrong
//! - **Nothing is fatal** - every failure maps to a job status or a rejected call

use std::path::PathBuf;
use thiserror::Error;

/// Top-level library error
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Histogram error: {0}")]
    Histogram(#[from] HistogramError),

    #[error("Query error: {0}")]
    Query(#[from] QuerySyntaxError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Finder error: {0}")]
    Finder(#[from] FinderError),

    #[error("Library error: {0}")]
    Model(#[from] ModelError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur while building or restoring a histogram
#[derive(Error, Debug)]
pub enum HistogramError {
    #[error("Failed to decode image {source_name}: {reason}")]
    Decode { source_name: String, reason: String },

    #[error("Corrupt histogram blob: expected {expected} bytes, got {actual}")]
    Corrupt { expected: usize, actual: usize },
}

impl HistogramError {
    pub(crate) fn decode(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        HistogramError::Decode {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

/// A malformed search query. The whole query is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid query near '{token}' at offset {offset}: {reason}")]
pub struct QuerySyntaxError {
    /// The offending token as written by the user
    pub token: String,
    /// Character offset of the token within the query
    pub offset: usize,
    /// What was wrong with it
    pub reason: String,
}

impl QuerySyntaxError {
    pub(crate) fn new(token: impl Into<String>, offset: usize, reason: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            offset,
            reason: reason.into(),
        }
    }
}

/// Errors that occur while importing a file or URL
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read {path}: {source}")]
    HashIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Cannot import {source_name}: {reason}")]
    InvalidSource { source_name: String, reason: String },

    #[error("Import worker has stopped")]
    WorkerStopped,
}

/// Errors raised by an external duplicate finder
#[derive(Error, Debug)]
pub enum FinderError {
    #[error("{finder}: request failed: {reason}")]
    Io { finder: String, reason: String },

    #[error("{finder}: malformed response: {reason}")]
    MalformedResponse { finder: String, reason: String },

    #[error("Item {item} has no file to search for")]
    Unsupported { item: u64 },
}

/// Errors from mutating the item/tag model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid tag name '{name}': tag names must be non-empty and contain no whitespace")]
    InvalidTagName { name: String },

    #[error("A tag named '{name}' already exists")]
    DuplicateTag { name: String },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, LibraryError>;
