//! # Core Module
//!
//! The GUI-agnostic media library engine.
//!
//! ## Modules
//! - `model` - Items, groups, tags and the store they live in
//! - `cancel` - Cooperative cancellation for background work
//! - `histogram` - Color histograms and their similarity metric
//! - `similarity` - Near-duplicate rules and the `no_similar` flag rebuild
//! - `search` - Query parsing, rule evaluation and ordering
//! - `import` - The import job queue and its worker
//! - `online` - Aggregating matches from external finders

pub mod cancel;
pub mod histogram;
pub mod import;
pub mod model;
pub mod online;
pub mod search;
pub mod similarity;

// Re-export commonly used types
pub use cancel::CancellationToken;
pub use histogram::Histogram;
pub use import::{ImportJob, ImportSource, Importer, JobStatus};
pub use model::{InMemoryLibrary, Item, ItemId, ItemKind, ItemStore, Tag};
pub use search::{parse_query, Search, SearchRule};
pub use similarity::SimilarityConfig;
