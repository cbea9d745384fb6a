//! # Import Module
//!
//! Queued ingestion of files and URLs into the library.
//!
//! ## Per-job Steps
//! 1. **Resolve** - download URLs into the download directory
//! 2. **Hash** - MD5 of the file contents
//! 3. **Deduplicate** - an existing item with the same hash fails the job
//! 4. **Create** - new media item, with a histogram for images
//! 5. **Compare** - histogram similarity against every existing item
//!
//! ## Concurrency
//! One worker thread drains a FIFO queue. Jobs can be cancelled only while
//! waiting; pausing stops dequeuing but lets the in-flight job finish.

mod hasher;
mod job;
mod source;
mod worker;

pub use hasher::ContentHasher;
pub use job::{ImportJob, JobStatus};
pub use source::{download_target, Downloader, HttpDownloader, ImportSource};
pub use worker::{ImportConfig, Importer, ImporterBuilder};
