//! Update operations queued against a backing store.

use super::trait_def::BackingStore;
use crate::catalog::{MediaItem, Tag, TagType};
use anyhow::Result;

/// A single catalog mutation, as recorded for a backing store.
///
/// Applying an operation includes its cascades: `PutItem` creates missing
/// tags, `PutTag` creates a missing tag type, `RemoveTag` detaches the tag from
/// every item and `RemoveTagType` clears the type of every tag using it. Every
/// backend must implement them identically, the write-back cache relies on it.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateOp {
    SetDefaultTagType(TagType),
    PutItem { key: String, item: MediaItem },
    RemoveItem { key: String },
    PutTag { name: String, tag: Tag },
    RemoveTag { name: String },
    PutTagType { name: String, tag_type: TagType },
    RemoveTagType { name: String },
    PutExtra { key: String, value: String },
    RemoveExtra { key: String },
}

impl UpdateOp {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            UpdateOp::SetDefaultTagType(_) => "set-default-tag-type",
            UpdateOp::PutItem { .. } => "put-item",
            UpdateOp::RemoveItem { .. } => "remove-item",
            UpdateOp::PutTag { .. } => "put-tag",
            UpdateOp::RemoveTag { .. } => "remove-tag",
            UpdateOp::PutTagType { .. } => "put-tag-type",
            UpdateOp::RemoveTagType { .. } => "remove-tag-type",
            UpdateOp::PutExtra { .. } => "put-extra",
            UpdateOp::RemoveExtra { .. } => "remove-extra",
        }
    }
}

/// An ordered list of operations, applied first-in first-out.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateBatch {
    ops: Vec<UpdateOp>,
}

impl UpdateBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: UpdateOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

impl FromIterator<UpdateOp> for UpdateBatch {
    fn from_iter<T: IntoIterator<Item = UpdateOp>>(iter: T) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

/// Builder that accumulates operations for one store and applies them in a
/// single round-trip on [`Updater::commit`].
///
/// Dropping an updater without committing discards its operations.
pub struct Updater<'a> {
    store: &'a mut dyn BackingStore,
    batch: UpdateBatch,
}

impl<'a> Updater<'a> {
    pub fn new(store: &'a mut dyn BackingStore) -> Self {
        Self {
            store,
            batch: UpdateBatch::new(),
        }
    }

    pub fn set_default_tag_type(mut self, tag_type: TagType) -> Self {
        self.batch.push(UpdateOp::SetDefaultTagType(tag_type));
        self
    }

    pub fn put_item(mut self, key: impl Into<String>, item: MediaItem) -> Self {
        self.batch.push(UpdateOp::PutItem {
            key: key.into(),
            item,
        });
        self
    }

    pub fn remove_item(mut self, key: impl Into<String>) -> Self {
        self.batch.push(UpdateOp::RemoveItem { key: key.into() });
        self
    }

    pub fn put_tag(mut self, name: impl Into<String>, tag: Tag) -> Self {
        self.batch.push(UpdateOp::PutTag {
            name: name.into(),
            tag,
        });
        self
    }

    pub fn remove_tag(mut self, name: impl Into<String>) -> Self {
        self.batch.push(UpdateOp::RemoveTag { name: name.into() });
        self
    }

    pub fn put_tag_type(mut self, name: impl Into<String>, tag_type: TagType) -> Self {
        self.batch.push(UpdateOp::PutTagType {
            name: name.into(),
            tag_type,
        });
        self
    }

    pub fn remove_tag_type(mut self, name: impl Into<String>) -> Self {
        self.batch.push(UpdateOp::RemoveTagType { name: name.into() });
        self
    }

    pub fn put_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.batch.push(UpdateOp::PutExtra {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn remove_extra(mut self, key: impl Into<String>) -> Self {
        self.batch.push(UpdateOp::RemoveExtra { key: key.into() });
        self
    }

    /// Queues an already built operation.
    pub fn op(mut self, op: UpdateOp) -> Self {
        self.batch.push(op);
        self
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Applies every queued operation to the store, all or nothing.
    pub fn commit(self) -> Result<()> {
        self.store.commit(&self.batch)
    }
}
