//! Unit of work: a transactional scope over one connection checkout.
//!
//! Records are owned by the unit of work and addressed through [`Handle`]s.
//! Loading the same row twice yields the same handle. Writes are validated
//! and staged by [`UnitOfWork::flush`], and reach the storage only on
//! [`UnitOfWork::commit`], in one atomic batch.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::MutexGuard;

use crate::codec::{decode_row, encode_opaque, encode_row, get_column};
use crate::error::Error;
use crate::model::RegisteredModel;
use crate::record::Record;
use crate::registry::ModelRegistry;
use crate::schema::domain::SESSION_MODEL;
use crate::storage::{StoredRow, WriteBatch};
use crate::value::Value;

type RawRow = Vec<(String, Value)>;

/// Rows of one column grouped by [`unique_bucket`].
type UniqueIndex = HashMap<Vec<u8>, Vec<(u64, Value)>>;

static NULL: Value = Value::Null;

/// Reference to a record owned by a [`UnitOfWork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    /// Added, not yet flushed.
    Pending,
    /// Flushed or loaded.
    Persistent,
    /// Marked for deletion, not yet flushed.
    Deleted,
    /// Deleted and flushed, or discarded before its first flush.
    Removed,
}

struct Entry {
    record: Record,
    state: EntryState,
}

struct StagedWrite {
    model: Arc<RegisteredModel>,
    id: u64,
    row: Option<StoredRow>,
    raw: Option<RawRow>,
}

/// A transactional scope bound to one connection checkout.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] discards
/// every staged write.
pub struct UnitOfWork<'r> {
    registry: &'r ModelRegistry,
    entries: Vec<Entry>,
    identity: HashMap<(String, i64), Handle>,
    links: BTreeMap<(usize, String), Handle>,
    staged: BTreeMap<(String, u64), Option<StoredRow>>,
    sequences: BTreeMap<String, u64>,
    known_tables: HashSet<String>,
    finished: bool,
    _checkout: MutexGuard<'r, ()>,
}

impl<'r> UnitOfWork<'r> {
    pub(crate) fn new(
        registry: &'r ModelRegistry,
        checkout: MutexGuard<'r, ()>,
    ) -> Result<Self, Error> {
        if !registry.exists() {
            return Err(Error::StorageUnavailable(
                registry.storage().address().to_string(),
            ));
        }
        tracing::debug!(storage = %registry.storage().address(), "Opened unit of work");
        Ok(Self {
            registry,
            entries: Vec::new(),
            identity: HashMap::new(),
            links: BTreeMap::new(),
            staged: BTreeMap::new(),
            sequences: BTreeMap::new(),
            known_tables: HashSet::new(),
            finished: false,
            _checkout: checkout,
        })
    }

    /// The registry this unit of work belongs to.
    pub fn registry(&self) -> &'r ModelRegistry {
        self.registry
    }

    // ========== Records ==========

    /// Stage a new record.
    pub fn add(&mut self, record: Record) -> Handle {
        if let Some(id) = record.id() {
            let key = (record.model_name().to_string(), id);
            if let Some(&existing) = self.identity.get(&key) {
                if let Some(entry) = self.entries.get_mut(existing.0) {
                    entry.record = record;
                    return existing;
                }
            }
            let handle = self.push(record, EntryState::Persistent);
            self.identity.insert(key, handle);
            return handle;
        }
        self.push(record, EntryState::Pending)
    }

    /// Instantiate and stage a new record of `model`.
    pub fn create(&mut self, model: &str) -> Result<Handle, Error> {
        let record = self.registry.instantiate(model)?;
        Ok(self.add(record))
    }

    fn push(&mut self, record: Record, state: EntryState) -> Handle {
        let handle = Handle(self.entries.len());
        self.entries.push(Entry { record, state });
        handle
    }

    /// Access a record.
    pub fn record(&self, handle: Handle) -> Result<&Record, Error> {
        self.entries
            .get(handle.0)
            .map(|e| &e.record)
            .ok_or_else(|| stale(handle))
    }

    /// Access a record mutably.
    pub fn record_mut(&mut self, handle: Handle) -> Result<&mut Record, Error> {
        self.entries
            .get_mut(handle.0)
            .map(|e| &mut e.record)
            .ok_or_else(|| stale(handle))
    }

    /// Mark a record for deletion.
    pub fn delete(&mut self, handle: Handle) -> Result<(), Error> {
        let entry = self.entries.get_mut(handle.0).ok_or_else(|| stale(handle))?;
        entry.state = match entry.state {
            EntryState::Pending | EntryState::Removed => EntryState::Removed,
            EntryState::Persistent | EntryState::Deleted => EntryState::Deleted,
        };
        Ok(())
    }

    // ========== Lookups ==========

    /// Load a record by primary key.
    pub fn get(&mut self, model: &str, id: i64) -> Result<Handle, Error> {
        let model = self.registry.model(model)?;
        let not_found = || Error::NotFound {
            model: model.name().to_string(),
        };

        if let Some(&handle) = self.identity.get(&(model.name().to_string(), id)) {
            return match self.entries.get(handle.0).map(|e| e.state) {
                Some(EntryState::Pending | EntryState::Persistent) => Ok(handle),
                _ => Err(not_found()),
            };
        }

        let row_id = u64::try_from(id).map_err(|_| not_found())?;
        match self.stored_row(model.table_name(), row_id)? {
            Some(row) => {
                let raw = decode_row(&row.data)?;
                self.materialize(Arc::clone(&model), id, raw)
            }
            None => Err(not_found()),
        }
    }

    /// Every record of `model`, ordered by primary key.
    pub fn all(&mut self, model: &str) -> Result<Vec<Handle>, Error> {
        self.select(model, None)
    }

    /// Records whose `attribute` equals `value`, ordered by primary key.
    ///
    /// `attribute` may be a column or a relationship (compared by primary
    /// key). Pending writes are flushed first.
    pub fn find_all(
        &mut self,
        model: &str,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<Handle>, Error> {
        self.select(model, Some((attribute, value.into())))
    }

    /// First record whose `attribute` equals `value`.
    pub fn find_first(
        &mut self,
        model: &str,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Handle>, Error> {
        Ok(self.find_all(model, attribute, value)?.into_iter().next())
    }

    /// The only record whose `attribute` equals `value`.
    pub fn find_one(
        &mut self,
        model: &str,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Result<Handle, Error> {
        let handles = self.find_all(model, attribute, value)?;
        match handles.as_slice() {
            [handle] => Ok(*handle),
            [] => Err(Error::NotFound {
                model: model.to_string(),
            }),
            _ => Err(Error::MultipleResults {
                model: model.to_string(),
            }),
        }
    }

    /// Find the registered `Session` by code (text) or primary key (integer).
    pub fn get_session(&mut self, code_or_id: impl Into<Value>) -> Result<Handle, Error> {
        match code_or_id.into() {
            Value::Integer(id) => self.get(SESSION_MODEL, id),
            Value::Text(code) => self.find_one(SESSION_MODEL, "code", code),
            other => Err(Error::InvalidValue(format!(
                "session lookup expects a code or an id, found {}",
                other.type_name()
            ))),
        }
    }

    fn select(
        &mut self,
        model: &str,
        filter: Option<(&str, Value)>,
    ) -> Result<Vec<Handle>, Error> {
        self.flush()?;
        let model = self.registry.model(model)?;

        let filter = match filter {
            Some((attribute, value)) => {
                let column = model
                    .column(attribute)
                    .or_else(|| {
                        model
                            .relationship(attribute)
                            .and_then(|r| model.column(&r.column))
                    })
                    .ok_or_else(|| Error::UnknownAttribute {
                        model: model.name().to_string(),
                        attribute: attribute.to_string(),
                    })?;
                Some((column, value))
            }
            None => None,
        };

        let mut handles = Vec::new();
        for (row_id, row) in self.rows_of(model.table_name())? {
            if let Some((column, value)) = &filter {
                let stored = get_column(&row.data, &column.name)?.unwrap_or(Value::Null);
                if column.load(stored)? != *value {
                    continue;
                }
            }
            let id = i64::try_from(row_id)
                .map_err(|_| Error::InvalidData(format!("row id {} out of range", row_id)))?;
            let handle = match self.identity.get(&(model.name().to_string(), id)) {
                Some(&handle) => handle,
                None => {
                    let raw = decode_row(&row.data)?;
                    self.materialize(Arc::clone(&model), id, raw)?
                }
            };
            handles.push(handle);
        }
        Ok(handles)
    }

    fn materialize(
        &mut self,
        model: Arc<RegisteredModel>,
        id: i64,
        raw: RawRow,
    ) -> Result<Handle, Error> {
        let mut values = Vec::with_capacity(raw.len());
        for (name, stored) in raw {
            if let Some(column) = model.column(&name) {
                values.push((name, column.load(stored)?));
            }
        }
        let collections = self.registry.collection_names(model.name());
        let record = Record::loaded(Arc::clone(&model), collections, id, values);
        let handle = self.push(record, EntryState::Persistent);
        self.identity.insert((model.name().to_string(), id), handle);
        Ok(handle)
    }

    /// Row image as seen by this unit of work.
    fn stored_row(&self, table: &str, id: u64) -> Result<Option<StoredRow>, Error> {
        match self.staged.get(&(table.to_string(), id)) {
            Some(row) => Ok(row.clone()),
            None => self.registry.storage().get_row(table, id),
        }
    }

    /// Every row of a table as seen by this unit of work.
    fn rows_of(&self, table: &str) -> Result<BTreeMap<u64, StoredRow>, Error> {
        let mut rows = BTreeMap::new();
        for result in self.registry.storage().scan_table(table)? {
            let (id, row) = result?;
            rows.insert(id, row);
        }
        let range = (table.to_string(), 0)..=(table.to_string(), u64::MAX);
        for ((_, id), row) in self.staged.range(range) {
            match row {
                Some(row) => rows.insert(*id, row.clone()),
                None => rows.remove(id),
            };
        }
        Ok(rows)
    }

    // ========== Relationships ==========

    /// Point the relationship `field` of `handle` at `target`.
    pub fn set_reference(&mut self, handle: Handle, field: &str, target: Handle) -> Result<(), Error> {
        let source = self.record(handle)?;
        let relationship = source
            .model()
            .relationship(field)
            .cloned()
            .ok_or_else(|| Error::UnknownAttribute {
                model: source.model_name().to_string(),
                attribute: field.to_string(),
            })?;

        let target_record = self.record(target)?;
        if target_record.model_name() != relationship.target {
            return Err(Error::InvalidValue(format!(
                "'{}' expects a {} record, found {}",
                field,
                relationship.target,
                target_record.model_name()
            )));
        }

        match target_record.id() {
            Some(id) => {
                self.links.remove(&(handle.0, relationship.column.clone()));
                let record = self.record_mut(handle)?;
                record.put_value(&relationship.column, Value::Integer(id));
                record.mark_changed(&relationship.column);
            }
            None => {
                self.links
                    .insert((handle.0, relationship.column.clone()), target);
                self.record_mut(handle)?.mark_changed(&relationship.column);
            }
        }
        Ok(())
    }

    /// Read the relationship `field` of `handle`, loading the target lazily.
    pub fn related(&mut self, handle: Handle, field: &str) -> Result<Option<Handle>, Error> {
        let record = self.record(handle)?;
        let relationship = record
            .model()
            .relationship(field)
            .cloned()
            .ok_or_else(|| Error::UnknownAttribute {
                model: record.model_name().to_string(),
                attribute: field.to_string(),
            })?;

        if let Some(&target) = self.links.get(&(handle.0, relationship.column.clone())) {
            return Ok(Some(target));
        }

        match record.get(&relationship.column)?.clone() {
            Value::Null => Ok(None),
            Value::Integer(id) => self.get(&relationship.target, id).map(Some),
            other => Err(Error::InvalidValue(format!(
                "'{}' holds {}, not a primary key",
                relationship.column,
                other.type_name()
            ))),
        }
    }

    /// Records of other models whose relationship points at `handle`,
    /// through the collection `name`.
    pub fn back_reference(&mut self, handle: Handle, name: &str) -> Result<Vec<Handle>, Error> {
        let record = self.record(handle)?;
        let model = record.model_name().to_string();
        let back_references: Vec<_> = self
            .registry
            .back_references(&model)
            .iter()
            .filter(|b| b.name == name)
            .cloned()
            .collect();
        if back_references.is_empty() {
            return Err(Error::UnknownAttribute {
                model,
                attribute: name.to_string(),
            });
        }

        if record.id().is_none() {
            self.flush()?;
        }
        let id = match self.record(handle)?.id() {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let mut handles = Vec::new();
        for back_reference in back_references {
            handles.extend(self.find_all(
                &back_reference.source,
                &back_reference.column,
                Value::Integer(id),
            )?);
        }
        Ok(handles)
    }

    // ========== Flush / Commit ==========

    /// Assign primary keys, apply defaults, validate every written value and
    /// stage the resulting rows.
    pub fn flush(&mut self) -> Result<(), Error> {
        self.assign_ids()?;
        self.resolve_links()?;

        let mut writes = Vec::new();
        for index in 0..self.entries.len() {
            let (state, dirty) = match self.entries.get(index) {
                Some(entry) => (entry.state, entry.record.changed().next().is_some()),
                None => continue,
            };
            match state {
                EntryState::Pending => writes.push(self.insert_write(index)?),
                EntryState::Persistent if dirty => writes.push(self.update_write(index)?),
                EntryState::Deleted => writes.push(self.delete_write(index)?),
                _ => {}
            }
        }

        self.check_constraints(&writes)?;

        let count = writes.len();
        for write in writes {
            self.staged
                .insert((write.model.table_name().to_string(), write.id), write.row);
        }
        for entry in &mut self.entries {
            match entry.state {
                EntryState::Pending => {
                    entry.state = EntryState::Persistent;
                    entry.record.clear_changes();
                }
                EntryState::Persistent => entry.record.clear_changes(),
                EntryState::Deleted => entry.state = EntryState::Removed,
                EntryState::Removed => {}
            }
        }

        if count > 0 {
            tracing::debug!(rows = count, "Flushed unit of work");
        }
        Ok(())
    }

    fn assign_ids(&mut self) -> Result<(), Error> {
        let registry = self.registry;
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if entry.state != EntryState::Pending || entry.record.id().is_some() {
                continue;
            }
            let model = Arc::clone(entry.record.model_arc());
            ensure_table(registry, &mut self.known_tables, model.table_name())?;

            let sequence = model.sequence().ok_or_else(|| {
                Error::InvalidData(format!("model '{}' has no primary key", model.name()))
            })?;
            let id = next_id(registry, &mut self.sequences, sequence)?;
            entry.record.assign_id(id);
            self.identity
                .insert((model.name().to_string(), id), Handle(index));
        }
        Ok(())
    }

    fn resolve_links(&mut self) -> Result<(), Error> {
        let links = std::mem::take(&mut self.links);
        for ((index, column), target) in links {
            let target_id = self
                .entries
                .get(target.0)
                .filter(|e| matches!(e.state, EntryState::Pending | EntryState::Persistent))
                .and_then(|e| e.record.id())
                .ok_or_else(|| {
                    Error::InvalidValue(format!("record referenced by '{}' was deleted", column))
                })?;
            if let Some(entry) = self.entries.get_mut(index) {
                entry.record.put_value(&column, Value::Integer(target_id));
                entry.record.mark_changed(&column);
            }
        }
        Ok(())
    }

    fn insert_write(&mut self, index: usize) -> Result<StagedWrite, Error> {
        let entry = self.entries.get_mut(index).ok_or_else(|| stale(Handle(index)))?;
        let record = &mut entry.record;
        let model = Arc::clone(record.model_arc());
        let table = model.table_name();
        let id = record_id(record)?;

        let mut raw = Vec::with_capacity(model.columns().len());
        for column in model.columns() {
            let value = if column.primary_key {
                Value::Integer(id)
            } else if record.is_changed(&column.name) {
                column.bind(table, record.get(&column.name)?)?
            } else if let Some(default) = &column.default {
                let value = default.evaluate();
                let bound = column.bind(table, &value)?;
                record.put_value(&column.name, value);
                bound
            } else if column.nullable {
                Value::Null
            } else {
                column.bind(table, &Value::Null)?
            };
            raw.push((column.name.clone(), value));
        }

        let row = StoredRow::new(encode_row(&raw)?);
        Ok(StagedWrite {
            id: row_id(id)?,
            model,
            row: Some(row),
            raw: Some(raw),
        })
    }

    fn update_write(&self, index: usize) -> Result<StagedWrite, Error> {
        let record = &self
            .entries
            .get(index)
            .ok_or_else(|| stale(Handle(index)))?
            .record;
        let model = Arc::clone(record.model_arc());
        let table = model.table_name();
        let id = record_id(record)?;

        let existing = self.stored_row(table, row_id(id)?)?;
        let existing_raw = match &existing {
            Some(row) => decode_row(&row.data)?,
            None => Vec::new(),
        };

        let mut raw = Vec::with_capacity(model.columns().len());
        for column in model.columns() {
            let value = if column.primary_key {
                Value::Integer(id)
            } else if record.is_changed(&column.name) {
                column.bind(table, record.get(&column.name)?)?
            } else {
                lookup(&existing_raw, &column.name).clone()
            };
            raw.push((column.name.clone(), value));
        }

        let data = encode_row(&raw)?;
        let row = match existing {
            Some(existing) => existing.updated(data),
            None => StoredRow::new(data),
        };
        Ok(StagedWrite {
            id: row_id(id)?,
            model,
            row: Some(row),
            raw: Some(raw),
        })
    }

    fn delete_write(&self, index: usize) -> Result<StagedWrite, Error> {
        let record = &self
            .entries
            .get(index)
            .ok_or_else(|| stale(Handle(index)))?
            .record;
        Ok(StagedWrite {
            id: row_id(record_id(record)?)?,
            model: Arc::clone(record.model_arc()),
            row: None,
            raw: None,
        })
    }

    fn check_constraints(&self, writes: &[StagedWrite]) -> Result<(), Error> {
        let mut unique_indexes: HashMap<(String, String), UniqueIndex> = HashMap::new();

        for write in writes {
            let Some(raw) = &write.raw else { continue };
            let table = write.model.table_name();

            for column in write.model.columns() {
                let value = lookup(raw, &column.name);
                if value.is_null() {
                    continue;
                }
                let violation = |reason: &str| Error::StorageConstraint {
                    table: table.to_string(),
                    column: column.name.clone(),
                    reason: reason.to_string(),
                };

                if column.unique && !column.primary_key {
                    let key = (table.to_string(), column.name.clone());
                    if !unique_indexes.contains_key(&key) {
                        let index = self.unique_index(table, &column.name, writes)?;
                        unique_indexes.insert(key.clone(), index);
                    }
                    let bucket = unique_bucket(value)?;
                    let clash = unique_indexes
                        .get(&key)
                        .and_then(|index| index.get(&bucket))
                        .is_some_and(|rows| {
                            rows.iter().any(|(id, other)| *id != write.id && other == value)
                        });
                    if clash {
                        return Err(violation("UNIQUE constraint failed"));
                    }
                }

                if let Some(foreign_key) = &column.foreign_key {
                    let target = value.as_i64().and_then(|id| u64::try_from(id).ok());
                    let exists = match target {
                        Some(target) => self.row_visible(&foreign_key.table, target, writes)?,
                        None => false,
                    };
                    if !exists {
                        return Err(violation("FOREIGN KEY constraint failed"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Non-null values of `column` across `table` once `writes` land.
    fn unique_index(
        &self,
        table: &str,
        column: &str,
        writes: &[StagedWrite],
    ) -> Result<UniqueIndex, Error> {
        let mut values = BTreeMap::new();
        for (id, row) in self.rows_of(table)? {
            values.insert(id, get_column(&row.data, column)?.unwrap_or(Value::Null));
        }
        for write in writes.iter().filter(|w| w.model.table_name() == table) {
            match &write.raw {
                Some(raw) => values.insert(write.id, lookup(raw, column).clone()),
                None => values.remove(&write.id),
            };
        }

        let mut index = UniqueIndex::new();
        for (id, value) in values {
            if !value.is_null() {
                index.entry(unique_bucket(&value)?).or_default().push((id, value));
            }
        }
        Ok(index)
    }

    fn row_visible(&self, table: &str, id: u64, writes: &[StagedWrite]) -> Result<bool, Error> {
        if let Some(write) = writes
            .iter()
            .find(|w| w.id == id && w.model.table_name() == table)
        {
            return Ok(write.raw.is_some());
        }
        Ok(self.stored_row(table, id)?.is_some())
    }

    /// Flush, then apply every staged write atomically and release the
    /// checkout. On failure nothing is written.
    pub fn commit(mut self) -> Result<(), Error> {
        let result = self.flush().and_then(|()| self.apply_staged());
        self.finished = true;
        match &result {
            Ok(()) => tracing::debug!(rows = self.staged.len(), "Committed unit of work"),
            Err(e) => tracing::debug!(error = %e, "Commit failed, rolled back unit of work"),
        }
        result
    }

    fn apply_staged(&self) -> Result<(), Error> {
        let mut batch = WriteBatch::new();
        for ((table, id), row) in &self.staged {
            match row {
                Some(row) => batch.put(table.clone(), *id, row.clone()),
                None => batch.delete(table.clone(), *id),
            };
        }
        for (sequence, value) in &self.sequences {
            batch.advance_sequence(sequence.clone(), *value);
        }
        self.registry.storage().apply(&batch)
    }

    /// Discard every staged write and release the checkout.
    pub fn rollback(mut self) {
        self.discard();
        self.finished = true;
        tracing::debug!("Rolled back unit of work");
    }

    fn discard(&mut self) {
        self.entries.clear();
        self.identity.clear();
        self.links.clear();
        self.staged.clear();
        self.sequences.clear();
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.discard();
            tracing::warn!("Unit of work dropped without commit, rolled back");
        }
    }
}

fn stale(handle: Handle) -> Error {
    Error::InvalidValue(format!("unknown record handle {}", handle.0))
}

fn lookup<'a>(raw: &'a [(String, Value)], column: &str) -> &'a Value {
    raw.iter()
        .find(|(name, _)| name == column)
        .map(|(_, value)| value)
        .unwrap_or(&NULL)
}

/// Hash key of a unique value. Equal values share a bucket; containers
/// only bucket by kind and length and are compared within it.
fn unique_bucket(value: &Value) -> Result<Vec<u8>, Error> {
    match value {
        Value::Float(f) => encode_opaque(&Value::Float(f + 0.0)),
        Value::Decimal(d) => encode_opaque(&Value::Decimal(d.normalize())),
        Value::List(items)
        | Value::Tuple(items)
        | Value::Set(items)
        | Value::FrozenSet(items) => Ok(format!("{}:{}", value.type_name(), items.len()).into_bytes()),
        Value::Mapping(entries) => Ok(format!("mapping:{}", entries.len()).into_bytes()),
        other => encode_opaque(other),
    }
}

fn record_id(record: &Record) -> Result<i64, Error> {
    record.id().ok_or_else(|| {
        Error::InvalidData(format!("{} has no primary key yet", record.model_name()))
    })
}

fn row_id(id: i64) -> Result<u64, Error> {
    u64::try_from(id).map_err(|_| Error::InvalidData(format!("invalid row id {}", id)))
}

fn ensure_table(
    registry: &ModelRegistry,
    known_tables: &mut HashSet<String>,
    table: &str,
) -> Result<(), Error> {
    if known_tables.contains(table) {
        return Ok(());
    }
    if registry.storage().table(table)?.is_none() {
        return Err(Error::MissingTable(table.to_string()));
    }
    known_tables.insert(table.to_string());
    Ok(())
}

fn next_id(
    registry: &ModelRegistry,
    sequences: &mut BTreeMap<String, u64>,
    sequence: &str,
) -> Result<i64, Error> {
    let current = match sequences.get(sequence) {
        Some(&value) => value,
        None => registry.storage().sequence_value(sequence)?,
    };
    let next = current + 1;
    sequences.insert(sequence.to_string(), next);
    i64::try_from(next).map_err(|_| Error::InvalidData(format!("sequence '{}' exhausted", sequence)))
}
