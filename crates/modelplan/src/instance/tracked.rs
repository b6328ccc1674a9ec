//! Tracked array handle: array mutations that log themselves.

use super::canonical::{canonical_item, canonical_items};
use super::mutation::{ArrayOp, MutationRecord};
use super::InstanceError;
use crate::schema::FieldDescriptor;
use crate::value::Value;

/// A mutable ordered collection that reports each structural operation.
///
/// Inserted items are canonicalized against the field's item type before
/// they are stored or logged; a rejected item leaves the collection and
/// its log untouched.
pub trait TrackedCollection {
    /// Appends items; returns the new length.
    fn push(&mut self, items: Vec<Value>) -> Result<usize, InstanceError>;
    /// Prepends items; returns the new length.
    fn unshift(&mut self, items: Vec<Value>) -> Result<usize, InstanceError>;
    fn pop(&mut self) -> Option<Value>;
    fn shift(&mut self) -> Option<Value>;
    /// Removes `delete_count` items at `start` and inserts `items` there.
    /// Returns the removed items.
    fn splice(&mut self, start: usize, delete_count: usize, items: Vec<Value>) -> Result<Vec<Value>, InstanceError>;
    /// Replaces the item at `index`; `index == len` appends. Returns the
    /// previous item.
    fn set(&mut self, index: usize, value: Value) -> Result<Option<Value>, InstanceError>;
}

/// Borrowed view of an array field that records its operations into the
/// owning instance's mutation record.
#[derive(Debug)]
pub struct TrackedArray<'a> {
    model: &'a str,
    field: &'a FieldDescriptor,
    items: &'a mut Vec<Value>,
    record: Option<&'a mut MutationRecord>,
}

impl<'a> TrackedArray<'a> {
    /// `record` is `None` for fields that never participate in tracking.
    pub(crate) fn new(
        model: &'a str,
        field: &'a FieldDescriptor,
        items: &'a mut Vec<Value>,
        record: Option<&'a mut MutationRecord>,
    ) -> Self {
        Self {
            model,
            field,
            items,
            record,
        }
    }

    pub fn key(&self) -> &str {
        &self.field.key
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    fn canonical(&self, items: Vec<Value>) -> Result<Vec<Value>, InstanceError> {
        canonical_items(self.model, self.field, items)
    }

    fn log(&mut self, op: ArrayOp) {
        if let Some(record) = self.record.as_deref_mut() {
            record.record_array_op(&self.field.key, op);
        }
    }
}

impl TrackedCollection for TrackedArray<'_> {
    fn push(&mut self, items: Vec<Value>) -> Result<usize, InstanceError> {
        let items = self.canonical(items)?;
        self.log(ArrayOp::Push(items.clone()));
        self.items.extend(items);
        Ok(self.items.len())
    }

    fn unshift(&mut self, items: Vec<Value>) -> Result<usize, InstanceError> {
        let items = self.canonical(items)?;
        self.log(ArrayOp::Unshift(items.clone()));
        self.items.splice(0..0, items);
        Ok(self.items.len())
    }

    fn pop(&mut self) -> Option<Value> {
        self.log(ArrayOp::Pop);
        self.items.pop()
    }

    fn shift(&mut self) -> Option<Value> {
        self.log(ArrayOp::Shift);
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.remove(0))
        }
    }

    fn splice(&mut self, start: usize, delete_count: usize, items: Vec<Value>) -> Result<Vec<Value>, InstanceError> {
        let items = self.canonical(items)?;
        let len = self.items.len();
        let start = start.min(len);
        let delete_count = delete_count.min(len - start);
        self.log(ArrayOp::Splice {
            start,
            delete_count,
            items: items.clone(),
        });
        Ok(self.items.splice(start..start + delete_count, items).collect())
    }

    fn set(&mut self, index: usize, value: Value) -> Result<Option<Value>, InstanceError> {
        let len = self.items.len();
        if index > len {
            return Err(InstanceError::IndexOutOfBounds {
                key: self.field.key.clone(),
                index,
                len,
            });
        }
        let value = canonical_item(self.model, self.field, value)?;
        self.log(ArrayOp::IndexSet {
            index,
            value: value.clone(),
        });
        if index == len {
            self.items.push(value);
            Ok(None)
        } else {
            Ok(Some(std::mem::replace(&mut self.items[index], value)))
        }
    }
}
