//! Change-tracked views over mutable container attributes.
//!
//! Each wrapper marks its attribute changed on the owning record when an
//! operation actually modifies the value, so the new value is re-persisted
//! on the next flush. Mutation nested inside an element is not observed.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Error;
use crate::value::Value;

pub(crate) struct ChangeMarker<'a> {
    attribute: String,
    changed: &'a mut BTreeSet<String>,
}

impl<'a> ChangeMarker<'a> {
    pub(crate) fn new(attribute: impl Into<String>, changed: &'a mut BTreeSet<String>) -> Self {
        Self {
            attribute: attribute.into(),
            changed,
        }
    }

    fn mark(&mut self) {
        if !self.changed.contains(&self.attribute) {
            self.changed.insert(self.attribute.clone());
        }
    }

    fn mark_if(&mut self, changed: bool) {
        if changed {
            self.mark();
        }
    }
}

/// Tracked list attribute.
pub struct TrackedList<'a> {
    items: &'a mut Vec<Value>,
    marker: ChangeMarker<'a>,
}

impl<'a> TrackedList<'a> {
    pub(crate) fn new(items: &'a mut Vec<Value>, marker: ChangeMarker<'a>) -> Self {
        Self { items, marker }
    }

    /// Append an item.
    pub fn push(&mut self, item: impl Into<Value>) {
        self.items.push(item.into());
        self.marker.mark();
    }

    /// Alias of [`TrackedList::push`].
    pub fn append(&mut self, item: impl Into<Value>) {
        self.push(item);
    }

    /// Append every item.
    pub fn extend<T: Into<Value>>(&mut self, items: impl IntoIterator<Item = T>) {
        let before = self.items.len();
        self.items.extend(items.into_iter().map(Into::into));
        let grew = self.items.len() != before;
        self.marker.mark_if(grew);
    }

    /// Remove and return the last item.
    pub fn pop(&mut self) -> Option<Value> {
        let item = self.items.pop();
        self.marker.mark_if(item.is_some());
        item
    }

    /// Insert an item at `index`.
    pub fn insert(&mut self, index: usize, item: impl Into<Value>) -> Result<(), Error> {
        if index > self.items.len() {
            return Err(out_of_range(index, self.items.len()));
        }
        self.items.insert(index, item.into());
        self.marker.mark();
        Ok(())
    }

    /// Remove and return the item at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Value, Error> {
        if index >= self.items.len() {
            return Err(out_of_range(index, self.items.len()));
        }
        let item = self.items.remove(index);
        self.marker.mark();
        Ok(item)
    }

    /// Replace the item at `index`, returning the previous one.
    pub fn set(&mut self, index: usize, item: impl Into<Value>) -> Result<Value, Error> {
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or_else(|| out_of_range(index, len))?;
        let item = item.into();
        let changed = *slot != item;
        let previous = std::mem::replace(slot, item);
        self.marker.mark_if(changed);
        Ok(previous)
    }

    /// Shorten the list to `len` items.
    pub fn truncate(&mut self, len: usize) {
        let shrunk = len < self.items.len();
        self.items.truncate(len);
        self.marker.mark_if(shrunk);
    }

    /// Remove every item.
    pub fn clear(&mut self) {
        let had_items = !self.items.is_empty();
        self.items.clear();
        self.marker.mark_if(had_items);
    }

    /// Item at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items as a slice.
    pub fn as_slice(&self) -> &[Value] {
        self.items
    }

    /// Iterate over items.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }
}

fn out_of_range(index: usize, len: usize) -> Error {
    Error::InvalidValue(format!("index {} out of range for length {}", index, len))
}

/// Tracked mapping attribute.
pub struct TrackedMapping<'a> {
    entries: &'a mut BTreeMap<String, Value>,
    marker: ChangeMarker<'a>,
}

impl<'a> TrackedMapping<'a> {
    pub(crate) fn new(entries: &'a mut BTreeMap<String, Value>, marker: ChangeMarker<'a>) -> Self {
        Self { entries, marker }
    }

    /// Insert an entry, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let value = value.into();
        let previous = self.entries.insert(key.into(), value.clone());
        self.marker.mark_if(previous.as_ref() != Some(&value));
        previous
    }

    /// Remove an entry.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let previous = self.entries.remove(key);
        self.marker.mark_if(previous.is_some());
        previous
    }

    /// Insert every entry.
    pub fn extend<K, V>(&mut self, entries: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            self.insert(key, value);
        }
    }

    /// Alias of [`TrackedMapping::extend`].
    pub fn update<K, V>(&mut self, entries: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.extend(entries);
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        let had_entries = !self.entries.is_empty();
        self.entries.clear();
        self.marker.mark_if(had_entries);
    }

    /// Value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Check if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, String, Value> {
        self.entries.iter()
    }
}

/// Tracked set attribute.
pub struct TrackedSet<'a> {
    items: &'a mut Vec<Value>,
    marker: ChangeMarker<'a>,
}

impl<'a> TrackedSet<'a> {
    pub(crate) fn new(items: &'a mut Vec<Value>, marker: ChangeMarker<'a>) -> Self {
        Self { items, marker }
    }

    /// Add an item. Returns whether it was new.
    pub fn insert(&mut self, item: impl Into<Value>) -> bool {
        let item = item.into();
        if self.items.contains(&item) {
            return false;
        }
        self.items.push(item);
        self.marker.mark();
        true
    }

    /// Alias of [`TrackedSet::insert`].
    pub fn add(&mut self, item: impl Into<Value>) -> bool {
        self.insert(item)
    }

    /// Remove an item. Returns whether it was present.
    pub fn remove(&mut self, item: &Value) -> bool {
        match self.items.iter().position(|existing| existing == item) {
            Some(index) => {
                self.items.remove(index);
                self.marker.mark();
                true
            }
            None => false,
        }
    }

    /// Alias of [`TrackedSet::remove`].
    pub fn discard(&mut self, item: &Value) -> bool {
        self.remove(item)
    }

    /// Add every item.
    pub fn extend<T: Into<Value>>(&mut self, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.insert(item);
        }
    }

    /// Alias of [`TrackedSet::extend`].
    pub fn update<T: Into<Value>>(&mut self, items: impl IntoIterator<Item = T>) {
        self.extend(items);
    }

    /// Remove every item.
    pub fn clear(&mut self) {
        let had_items = !self.items.is_empty();
        self.items.clear();
        self.marker.mark_if(had_items);
    }

    /// Check if `item` is present.
    pub fn contains(&self, item: &Value) -> bool {
        self.items.contains(item)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over items in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }
}
