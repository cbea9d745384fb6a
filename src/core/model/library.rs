//! In-memory item store.

use super::{read_lock, write_lock, Item, ItemId, ItemStore, Tag, TagId};
use crate::error::ModelError;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// An `ItemStore` that keeps everything in memory
///
/// Useful for tests, the CLI, and as a front for a real database layer.
pub struct InMemoryLibrary {
    items: RwLock<BTreeMap<ItemId, Arc<Item>>>,
    tags: RwLock<HashMap<String, Arc<Tag>>>,
    next_item_id: AtomicU64,
    next_tag_id: AtomicU64,
}

impl InMemoryLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            tags: RwLock::new(HashMap::new()),
            next_item_id: AtomicU64::new(1),
            next_tag_id: AtomicU64::new(1),
        }
    }

    /// Create and add a media item for `file`
    pub fn create_media(&self, file: impl Into<PathBuf>) -> Arc<Item> {
        let item = Arc::new(Item::media(self.reserve_item_id(), file));
        self.add_item(Arc::clone(&item));
        item
    }

    /// Create and add an empty group
    pub fn create_group(&self, title: impl Into<String>) -> Arc<Item> {
        let item = Arc::new(Item::group(self.reserve_item_id(), title));
        self.add_item(Arc::clone(&item));
        item
    }

    pub fn len(&self) -> usize {
        read_lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        read_lock(&self.items).is_empty()
    }
}

impl Default for InMemoryLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemStore for InMemoryLibrary {
    fn all_items(&self) -> Vec<Arc<Item>> {
        read_lock(&self.items).values().cloned().collect()
    }

    fn item_by_hash(&self, md5: &str) -> Option<Arc<Item>> {
        let md5 = md5.to_lowercase();
        read_lock(&self.items)
            .values()
            .find(|item| {
                item.as_media()
                    .and_then(|media| media.md5())
                    .is_some_and(|hash| hash == md5)
            })
            .cloned()
    }

    fn item_by_id(&self, id: ItemId) -> Option<Arc<Item>> {
        read_lock(&self.items).get(&id).cloned()
    }

    fn reserve_item_id(&self) -> ItemId {
        ItemId(self.next_item_id.fetch_add(1, Ordering::SeqCst))
    }

    fn add_item(&self, item: Arc<Item>) {
        // Items restored with explicit ids must not collide with future reservations
        self.next_item_id
            .fetch_max(item.id().0 + 1, Ordering::SeqCst);
        write_lock(&self.items).insert(item.id(), item);
    }

    fn remove_items(&self, items: &[Arc<Item>]) {
        let mut stored = write_lock(&self.items);
        for item in items {
            if stored.remove(&item.id()).is_none() {
                continue;
            }
            item.clear_tags();

            if let Some(membership) = item.as_media().and_then(|m| m.membership()) {
                if let Some(group) = stored.get(&membership.group) {
                    group.remove_element(item);
                }
            }
            if item.is_group() {
                item.clear_elements();
            }
        }
    }

    fn create_tag(&self, name: &str) -> Result<Arc<Tag>, ModelError> {
        let normalized = Tag::normalize_name(name)?;
        let mut tags = write_lock(&self.tags);
        if tags.contains_key(&normalized) {
            return Err(ModelError::DuplicateTag { name: normalized });
        }

        let id = TagId(self.next_tag_id.fetch_add(1, Ordering::SeqCst));
        let tag = Arc::new(Tag::new(id, &normalized)?);
        tags.insert(normalized, Arc::clone(&tag));
        Ok(tag)
    }

    fn tag_by_name(&self, name: &str) -> Option<Arc<Tag>> {
        read_lock(&self.tags).get(&name.to_lowercase()).cloned()
    }

    fn tags(&self) -> Vec<Arc<Tag>> {
        let mut tags: Vec<_> = read_lock(&self.tags).values().cloned().collect();
        tags.sort_by_key(|t| t.id());
        tags
    }

    fn delete_tag(&self, tag: &Tag) -> bool {
        let removed = write_lock(&self.tags).remove(tag.name()).is_some();
        if removed {
            for item in read_lock(&self.items).values() {
                item.remove_tag(tag);
            }
        }
        removed
    }
}
