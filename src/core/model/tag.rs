//! Tags and their live usage counts.

use super::{read_lock, write_lock};
use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

/// Unique tag identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TagId(pub u64);

/// A user-defined label attached to items
///
/// Names are stored lowercased, so two tags can never differ only by case.
/// `frequency` always equals the number of items currently holding the tag.
#[derive(Debug)]
pub struct Tag {
    id: TagId,
    name: String,
    color: RwLock<Option<String>>,
    notes: RwLock<Vec<String>>,
    frequency: AtomicUsize,
}

impl Tag {
    /// Create a tag, validating and normalizing its name
    pub fn new(id: TagId, name: &str) -> Result<Self, ModelError> {
        let name = Self::normalize_name(name)?;
        Ok(Self {
            id,
            name,
            color: RwLock::new(None),
            notes: RwLock::new(Vec::new()),
            frequency: AtomicUsize::new(0),
        })
    }

    /// Lowercase a candidate tag name, rejecting empty or whitespace-bearing names
    pub fn normalize_name(name: &str) -> Result<String, ModelError> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(ModelError::InvalidTagName {
                name: name.to_string(),
            });
        }
        Ok(name.to_lowercase())
    }

    pub fn id(&self) -> TagId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive name comparison
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name.to_lowercase()
    }

    pub fn color(&self) -> Option<String> {
        read_lock(&self.color).clone()
    }

    pub fn set_color(&self, color: Option<String>) {
        *write_lock(&self.color) = color;
    }

    pub fn notes(&self) -> Vec<String> {
        read_lock(&self.notes).clone()
    }

    pub fn add_note(&self, note: impl Into<String>) {
        write_lock(&self.notes).push(note.into());
    }

    /// Remove a note; returns false if it wasn't present
    pub fn remove_note(&self, note: &str) -> bool {
        let mut notes = write_lock(&self.notes);
        match notes.iter().position(|n| n == note) {
            Some(index) => {
                notes.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of items currently holding this tag
    pub fn frequency(&self) -> usize {
        self.frequency.load(Ordering::SeqCst)
    }

    pub(super) fn increment_frequency(&self) {
        self.frequency.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn decrement_frequency(&self) {
        let _ = self
            .frequency
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |f| f.checked_sub(1));
    }
}
