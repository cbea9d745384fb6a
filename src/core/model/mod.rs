//! # Model Module
//!
//! The entities every other subsystem operates on.
//!
//! ## Entities
//! - `Item` - a media file or a titled group of media files
//! - `Tag` - a label with a live usage count
//!
//! ## Ownership
//! Items and tags are owned by an `ItemStore` and handed out as `Arc`s.
//! Subsystems borrow them for the duration of a single operation.

mod item;
mod library;
mod tag;

pub use item::{GroupItem, GroupMembership, Item, ItemId, ItemKind, MediaItem, MediaType};
pub use library::InMemoryLibrary;
pub use tag::{Tag, TagId};

use crate::error::ModelError;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The persistence collaborator the core reads and writes items and tags through.
///
/// Implementations must hand out consistent snapshots when iterated.
pub trait ItemStore: Send + Sync {
    /// Snapshot of every item, in id order
    fn all_items(&self) -> Vec<Arc<Item>>;

    /// Find the media item whose MD5 matches (case-insensitive)
    fn item_by_hash(&self, md5: &str) -> Option<Arc<Item>>;

    /// Find an item by id
    fn item_by_id(&self, id: ItemId) -> Option<Arc<Item>>;

    /// Allocate a fresh, never reused item id
    fn reserve_item_id(&self) -> ItemId;

    /// Add an item to the collection
    fn add_item(&self, item: Arc<Item>);

    /// Remove items from the collection
    fn remove_items(&self, items: &[Arc<Item>]);

    /// Register a new tag. Names are unique regardless of case.
    fn create_tag(&self, name: &str) -> Result<Arc<Tag>, ModelError>;

    /// Find a tag by name (case-insensitive)
    fn tag_by_name(&self, name: &str) -> Option<Arc<Tag>>;

    /// All registered tags, sorted by id
    fn tags(&self) -> Vec<Arc<Tag>>;

    /// Delete a tag, detaching it from every item first
    fn delete_tag(&self, tag: &Tag) -> bool;

    /// Look up a tag by name, creating it if it doesn't exist yet
    fn get_or_create_tag(&self, name: &str) -> Result<Arc<Tag>, ModelError> {
        match self.tag_by_name(name) {
            Some(tag) => Ok(tag),
            None => self.create_tag(name),
        }
    }
}

// Lock poisoning only means another thread panicked mid-update; the model's
// fields are all valid on their own, so keep going with the inner value.
pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
