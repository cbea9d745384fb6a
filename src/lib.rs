//! # Media Library
//!
//! The content intelligence core of a personal media library.
//!
//! ## Subsystems
//! - **Histograms** - compact color fingerprints and a symmetric similarity score
//! - **Search** - a small `key:value` query language compiled into rules
//! - **Import** - a queued, pausable job worker with exact and near duplicate checks
//!
//! ## Architecture
//! The library is split into a GUI-agnostic core and presentation layers:
//! - `core` - item model, histograms, similarity, search, import, online matches
//! - `events` - Event-driven progress reporting (GUI-ready)
//! - `error` - Error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{LibraryError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
pub fn init_tracing() -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| LibraryError::Config(format!("failed to install tracing subscriber: {e}")))
}
