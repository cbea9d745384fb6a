//! Items: single media files and titled groups of them.

use super::tag::Tag;
use super::{read_lock, write_lock};
use crate::core::histogram::Histogram;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Unique item identifier, assigned on creation and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Broad media category, derived from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    Image,
    Video,
    Other,
}

impl MediaType {
    /// Detect from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "tiff" | "tif" => MediaType::Image,
            "mp4" | "m4v" | "webm" | "mkv" | "avi" | "mov" | "wmv" | "flv" | "mpg" | "mpeg" => {
                MediaType::Video
            }
            _ => MediaType::Other,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(MediaType::Other)
    }

    /// Whether files of this type are worth importing
    pub fn is_supported(&self) -> bool {
        !matches!(self, MediaType::Other)
    }
}

/// Position of a media item inside a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub group: ItemId,
    pub index: usize,
}

/// An item wrapping exactly one file
#[derive(Debug)]
pub struct MediaItem {
    file: PathBuf,
    md5: RwLock<Option<String>>,
    histogram: RwLock<Option<Arc<Histogram>>>,
    membership: RwLock<Option<GroupMembership>>,
    no_similar: AtomicBool,
}

impl MediaItem {
    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn media_type(&self) -> MediaType {
        MediaType::from_path(&self.file)
    }

    /// Lowercase hex MD5 of the file contents, if computed
    pub fn md5(&self) -> Option<String> {
        read_lock(&self.md5).clone()
    }

    pub fn set_md5(&self, md5: Option<String>) {
        *write_lock(&self.md5) = md5.map(|m| m.to_lowercase());
    }

    pub fn histogram(&self) -> Option<Arc<Histogram>> {
        read_lock(&self.histogram).clone()
    }

    pub fn has_histogram(&self) -> bool {
        read_lock(&self.histogram).is_some()
    }

    pub fn set_histogram(&self, histogram: Option<Histogram>) {
        *write_lock(&self.histogram) = histogram.map(Arc::new);
    }

    pub fn membership(&self) -> Option<GroupMembership> {
        *read_lock(&self.membership)
    }

    pub fn is_in_group(&self) -> bool {
        self.membership().is_some()
    }

    /// Cached result of the last similarity rebuild
    pub fn has_no_similar(&self) -> bool {
        self.no_similar.load(Ordering::SeqCst)
    }

    pub fn set_no_similar(&self, value: bool) {
        self.no_similar.store(value, Ordering::SeqCst);
    }

    fn set_membership(&self, membership: Option<GroupMembership>) {
        *write_lock(&self.membership) = membership;
    }

    /// Join a group unless already in one; checked and set under one lock
    fn claim_membership(&self, membership: GroupMembership) -> bool {
        let mut current = write_lock(&self.membership);
        if current.is_some() {
            return false;
        }
        *current = Some(membership);
        true
    }
}

/// An ordered collection of media items sharing a title
#[derive(Debug)]
pub struct GroupItem {
    title: RwLock<String>,
    elements: RwLock<Vec<Arc<Item>>>,
}

impl GroupItem {
    pub fn title(&self) -> String {
        read_lock(&self.title).clone()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        *write_lock(&self.title) = title.into();
    }

    /// Snapshot of the elements in order
    pub fn elements(&self) -> Vec<Arc<Item>> {
        read_lock(&self.elements).clone()
    }

    pub fn len(&self) -> usize {
        read_lock(&self.elements).len()
    }

    pub fn is_empty(&self) -> bool {
        read_lock(&self.elements).is_empty()
    }
}

/// The two item variants
#[derive(Debug)]
pub enum ItemKind {
    Media(MediaItem),
    Group(GroupItem),
}

/// A unit in the library: a media file or a group of them
#[derive(Debug)]
pub struct Item {
    id: ItemId,
    added: i64,
    tags: RwLock<Vec<Arc<Tag>>>,
    kind: ItemKind,
}

impl Item {
    /// Create a media item, stamped with the current time
    pub fn media(id: ItemId, file: impl Into<PathBuf>) -> Self {
        Self::new(
            id,
            ItemKind::Media(MediaItem {
                file: file.into(),
                md5: RwLock::new(None),
                histogram: RwLock::new(None),
                membership: RwLock::new(None),
                no_similar: AtomicBool::new(false),
            }),
        )
    }

    /// Create an empty group, stamped with the current time
    pub fn group(id: ItemId, title: impl Into<String>) -> Self {
        Self::new(
            id,
            ItemKind::Group(GroupItem {
                title: RwLock::new(title.into()),
                elements: RwLock::new(Vec::new()),
            }),
        )
    }

    fn new(id: ItemId, kind: ItemKind) -> Self {
        Self {
            id,
            added: chrono::Utc::now().timestamp_millis(),
            tags: RwLock::new(Vec::new()),
            kind,
        }
    }

    /// Override the creation timestamp (epoch millis), e.g. when restoring
    pub fn with_added(mut self, added: i64) -> Self {
        self.added = added;
        self
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Creation time in epoch milliseconds
    pub fn added(&self) -> i64 {
        self.added
    }

    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    pub fn as_media(&self) -> Option<&MediaItem> {
        match &self.kind {
            ItemKind::Media(media) => Some(media),
            ItemKind::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupItem> {
        match &self.kind {
            ItemKind::Group(group) => Some(group),
            ItemKind::Media(_) => None,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, ItemKind::Group(_))
    }

    pub fn is_media(&self) -> bool {
        matches!(self.kind, ItemKind::Media(_))
    }

    /// Snapshot of the item's tags
    pub fn tags(&self) -> Vec<Arc<Tag>> {
        read_lock(&self.tags).clone()
    }

    pub fn tag_count(&self) -> usize {
        read_lock(&self.tags).len()
    }

    pub fn has_tag(&self, tag: &Tag) -> bool {
        read_lock(&self.tags).iter().any(|t| t.id() == tag.id())
    }

    /// Case-insensitive lookup by tag name
    pub fn has_tag_named(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        read_lock(&self.tags).iter().any(|t| t.name() == name)
    }

    /// Attach a tag. Returns false if the item already had it.
    pub fn add_tag(&self, tag: &Arc<Tag>) -> bool {
        let mut tags = write_lock(&self.tags);
        if tags.iter().any(|t| t.id() == tag.id()) {
            return false;
        }
        tags.push(Arc::clone(tag));
        tag.increment_frequency();
        true
    }

    /// Detach a tag. Returns false if the item didn't have it.
    pub fn remove_tag(&self, tag: &Tag) -> bool {
        let mut tags = write_lock(&self.tags);
        match tags.iter().position(|t| t.id() == tag.id()) {
            Some(index) => {
                let removed = tags.remove(index);
                removed.decrement_frequency();
                true
            }
            None => false,
        }
    }

    /// Detach every tag, keeping frequencies consistent
    pub fn clear_tags(&self) {
        let mut tags = write_lock(&self.tags);
        for tag in tags.drain(..) {
            tag.decrement_frequency();
        }
    }

    /// Append a media item to this group.
    ///
    /// Returns false if `self` is not a group, `element` is not a media item,
    /// or the element already belongs to a group.
    pub fn add_element(&self, element: &Arc<Item>) -> bool {
        let (Some(group), Some(media)) = (self.as_group(), element.as_media()) else {
            return false;
        };
        let mut elements = write_lock(&group.elements);
        let claimed = media.claim_membership(GroupMembership {
            group: self.id,
            index: elements.len(),
        });
        if claimed {
            elements.push(Arc::clone(element));
        }
        claimed
    }

    /// Remove a media item from this group, re-indexing the remaining elements.
    pub fn remove_element(&self, element: &Item) -> bool {
        let Some(group) = self.as_group() else {
            return false;
        };

        let mut elements = write_lock(&group.elements);
        let Some(position) = elements.iter().position(|e| e.id() == element.id()) else {
            return false;
        };

        let removed = elements.remove(position);
        if let Some(media) = removed.as_media() {
            media.set_membership(None);
        }
        for (index, remaining) in elements.iter().enumerate().skip(position) {
            if let Some(media) = remaining.as_media() {
                media.set_membership(Some(GroupMembership {
                    group: self.id,
                    index,
                }));
            }
        }
        true
    }

    /// Remove every element from this group
    pub fn clear_elements(&self) {
        if let Some(group) = self.as_group() {
            for element in write_lock(&group.elements).drain(..) {
                if let Some(media) = element.as_media() {
                    media.set_membership(None);
                }
            }
        }
    }
}
