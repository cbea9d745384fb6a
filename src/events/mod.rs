//! # Events Module
//!
//! Event-driven architecture for GUI-ready progress reporting.
//!
//! ## Design
//! Background activities (import worker, similarity rebuild, match retrieval)
//! emit events through channels, allowing any UI (CLI, GUI, web) to subscribe.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Import(ImportEvent::StatusChanged { job_id, status }) => {
//!                 println!("{job_id}: {status}")
//!             }
//!             Event::Similarity(SimilarityEvent::Progress(p)) => {
//!                 println!("Checked {}/{}", p.processed, p.total)
//!             }
//!             _ => {}
//!         }
//!     }
//! });
//!
//! let importer = Importer::builder().events(sender).build(store)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
