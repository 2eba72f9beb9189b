//! Ordered, in-memory model of the images making up the report.

use std::sync::Arc;

use shared::{
    domain::{EntryId, RemoteName},
    protocol::PdfImage,
};

use crate::error::CollectionError;

/// Immutable image bytes held by an entry. Clones share the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHandle(Arc<[u8]>);

impl LocalHandle {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for LocalHandle {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    id: EntryId,
    remote_name: Option<RemoteName>,
    display_name: String,
    mime_type: String,
    description: String,
    local_handle: LocalHandle,
}

impl ImageEntry {
    pub fn new(
        id: EntryId,
        display_name: impl Into<String>,
        mime_type: impl Into<String>,
        local_handle: LocalHandle,
    ) -> Self {
        Self {
            id,
            remote_name: None,
            display_name: display_name.into(),
            mime_type: mime_type.into(),
            description: String::new(),
            local_handle,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn remote_name(&self) -> Option<&RemoteName> {
        self.remote_name.as_ref()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn local_handle(&self) -> &LocalHandle {
        &self.local_handle
    }

    pub fn is_uploaded(&self) -> bool {
        self.remote_name.is_some()
    }
}

/// The ordered set of entries. Order is page order in the compiled document.
#[derive(Debug, Default)]
pub struct Collection {
    entries: Vec<ImageEntry>,
    next_id: u64,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a fresh id. The counter survives `clear`, so ids are never reused.
    pub fn allocate_id(&mut self) -> EntryId {
        self.next_id += 1;
        EntryId(self.next_id)
    }

    pub fn add(&mut self, entry: ImageEntry) -> Result<(), CollectionError> {
        if self.position(entry.id).is_some() {
            return Err(CollectionError::DuplicateId(entry.id));
        }
        // Keep the allocator ahead of ids minted elsewhere.
        self.next_id = self.next_id.max(entry.id.0);
        self.entries.push(entry);
        Ok(())
    }

    /// Appends a new entry under a freshly allocated id.
    pub fn accept(
        &mut self,
        display_name: impl Into<String>,
        mime_type: impl Into<String>,
        local_handle: LocalHandle,
    ) -> EntryId {
        let id = self.allocate_id();
        self.entries
            .push(ImageEntry::new(id, display_name, mime_type, local_handle));
        id
    }

    pub fn remove_by_id(&mut self, id: EntryId) -> Result<ImageEntry, CollectionError> {
        let index = self.position(id).ok_or(CollectionError::NotFound(id))?;
        Ok(self.entries.remove(index))
    }

    pub fn update_description(
        &mut self,
        id: EntryId,
        text: impl Into<String>,
    ) -> Result<(), CollectionError> {
        let entry = self.get_mut(id)?;
        entry.description = text.into();
        Ok(())
    }

    pub fn assign_remote_name(
        &mut self,
        id: EntryId,
        remote_name: RemoteName,
    ) -> Result<(), CollectionError> {
        let entry = self.get_mut(id)?;
        entry.remote_name = Some(remote_name);
        Ok(())
    }

    /// Moves `id` to `new_index`, clamped to the last position. Returns whether
    /// the order changed.
    pub fn move_to(&mut self, id: EntryId, new_index: usize) -> Result<bool, CollectionError> {
        let current = self.position(id).ok_or(CollectionError::NotFound(id))?;
        let target = new_index.min(self.entries.len() - 1);
        if target == current {
            return Ok(false);
        }
        let entry = self.entries.remove(current);
        self.entries.insert(target, entry);
        Ok(true)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn snapshot(&self) -> CollectionSnapshot {
        CollectionSnapshot {
            entries: self.entries.clone(),
        }
    }

    pub fn get(&self, id: EntryId) -> Option<&ImageEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn position(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get_mut(&mut self, id: EntryId) -> Result<&mut ImageEntry, CollectionError> {
        self.entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(CollectionError::NotFound(id))
    }
}

/// Frozen copy of the collection for rendering or export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSnapshot {
    entries: Vec<ImageEntry>,
}

impl CollectionSnapshot {
    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageEntry> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<EntryId> {
        self.entries.iter().map(ImageEntry::id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_generate(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn pending_uploads(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.is_uploaded()).count()
    }

    pub fn find_by_display_name(&self, name: &str) -> Option<&ImageEntry> {
        self.entries.iter().find(|entry| entry.display_name == name)
    }

    /// Document pages in order. Entries still uploading are left out.
    pub fn compile_items(&self) -> Vec<PdfImage> {
        self.entries
            .iter()
            .filter_map(|entry| {
                entry.remote_name.as_ref().map(|remote_name| PdfImage {
                    filename: remote_name.clone(),
                    description: entry.description.clone(),
                })
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a CollectionSnapshot {
    type Item = &'a ImageEntry;
    type IntoIter = std::slice::Iter<'a, ImageEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
#[path = "tests/collection_tests.rs"]
mod tests;
