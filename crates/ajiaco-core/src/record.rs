//! Instances of registered models.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::error::Error;
use crate::model::RegisteredModel;
use crate::tracked::{ChangeMarker, TrackedList, TrackedMapping, TrackedSet};
use crate::value::Value;

/// A row of a registered model, loaded or pending.
///
/// Column values are read with [`Record::get`] and the typed getters, and
/// written with [`Record::set`]. Mutable container columns can also be
/// modified in place through [`Record::list_mut`], [`Record::mapping_mut`]
/// and [`Record::set_mut`]. Relationships and back-reference collections are
/// resolved through the unit of work.
#[derive(Debug, Clone)]
pub struct Record {
    model: Arc<RegisteredModel>,
    id: Option<i64>,
    values: BTreeMap<String, Value>,
    changed: BTreeSet<String>,
    collections: Vec<String>,
}

impl Record {
    pub(crate) fn new(model: Arc<RegisteredModel>, collections: Vec<String>) -> Self {
        let values = model
            .columns()
            .iter()
            .map(|c| (c.name.clone(), Value::Null))
            .collect();
        Self {
            model,
            id: None,
            values,
            changed: BTreeSet::new(),
            collections,
        }
    }

    pub(crate) fn loaded(
        model: Arc<RegisteredModel>,
        collections: Vec<String>,
        id: i64,
        stored: impl IntoIterator<Item = (String, Value)>,
    ) -> Self {
        let mut record = Self::new(model, collections);
        for (column, value) in stored {
            if record.values.contains_key(&column) {
                record.values.insert(column, value);
            }
        }
        record.assign_id(id);
        record
    }

    /// The registered model of this record.
    pub fn model(&self) -> &RegisteredModel {
        &self.model
    }

    pub(crate) fn model_arc(&self) -> &Arc<RegisteredModel> {
        &self.model
    }

    /// Model name.
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Primary key, absent until flushed.
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
        if let Some(pk) = self.model.primary_key() {
            self.values.insert(pk.name.clone(), Value::Integer(id));
        }
    }

    /// Value of a column.
    pub fn get(&self, attribute: &str) -> Result<&Value, Error> {
        self.values
            .get(attribute)
            .ok_or_else(|| self.unknown(attribute))
    }

    /// Assign a column. Type checks happen when the unit of work flushes.
    pub fn set(&mut self, attribute: &str, value: impl Into<Value>) -> Result<(), Error> {
        let column = self
            .model
            .column(attribute)
            .ok_or_else(|| self.unknown(attribute))?;
        if column.primary_key {
            return Err(Error::InvalidValue(format!(
                "primary key '{}' is assigned by its sequence",
                attribute
            )));
        }
        self.values.insert(attribute.to_string(), value.into());
        self.mark_changed(attribute);
        Ok(())
    }

    /// Integer column.
    pub fn get_i64(&self, attribute: &str) -> Result<Option<i64>, Error> {
        self.typed(attribute, "integer", Value::as_i64)
    }

    /// Float column.
    pub fn get_f64(&self, attribute: &str) -> Result<Option<f64>, Error> {
        self.typed(attribute, "float", Value::as_f64)
    }

    /// Boolean column.
    pub fn get_bool(&self, attribute: &str) -> Result<Option<bool>, Error> {
        self.typed(attribute, "boolean", Value::as_bool)
    }

    /// Text column.
    pub fn get_str(&self, attribute: &str) -> Result<Option<&str>, Error> {
        self.typed(attribute, "text", Value::as_str)
    }

    /// Decimal column.
    pub fn get_decimal(&self, attribute: &str) -> Result<Option<Decimal>, Error> {
        self.typed(attribute, "decimal", Value::as_decimal)
    }

    /// List column.
    pub fn get_list(&self, attribute: &str) -> Result<Option<&[Value]>, Error> {
        self.typed(attribute, "list", Value::as_list)
    }

    /// Mapping column.
    pub fn get_mapping(&self, attribute: &str) -> Result<Option<&BTreeMap<String, Value>>, Error> {
        self.typed(attribute, "mapping", Value::as_mapping)
    }

    fn typed<'a, T>(
        &'a self,
        attribute: &str,
        expected: &str,
        convert: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<Option<T>, Error> {
        let value = self.get(attribute)?;
        if value.is_null() {
            return Ok(None);
        }
        let found = value.type_name();
        convert(value).map(Some).ok_or_else(|| {
            Error::InvalidValue(format!(
                "'{}.{}' holds {}, not {}",
                self.model_name(),
                attribute,
                found,
                expected
            ))
        })
    }

    /// Change-tracked view of a list column.
    pub fn list_mut(&mut self, attribute: &str) -> Result<TrackedList<'_>, Error> {
        self.check_tracked(attribute)?;
        let model = self.model.name().to_string();
        match self.values.get_mut(attribute) {
            Some(Value::List(items)) => Ok(TrackedList::new(
                items,
                ChangeMarker::new(attribute, &mut self.changed),
            )),
            Some(other) => Err(not_a(&model, attribute, other, "list")),
            None => Err(Error::UnknownAttribute {
                model,
                attribute: attribute.to_string(),
            }),
        }
    }

    /// Change-tracked view of a mapping column.
    pub fn mapping_mut(&mut self, attribute: &str) -> Result<TrackedMapping<'_>, Error> {
        self.check_tracked(attribute)?;
        let model = self.model.name().to_string();
        match self.values.get_mut(attribute) {
            Some(Value::Mapping(entries)) => Ok(TrackedMapping::new(
                entries,
                ChangeMarker::new(attribute, &mut self.changed),
            )),
            Some(other) => Err(not_a(&model, attribute, other, "mapping")),
            None => Err(Error::UnknownAttribute {
                model,
                attribute: attribute.to_string(),
            }),
        }
    }

    /// Change-tracked view of a set column.
    pub fn set_mut(&mut self, attribute: &str) -> Result<TrackedSet<'_>, Error> {
        self.check_tracked(attribute)?;
        let model = self.model.name().to_string();
        match self.values.get_mut(attribute) {
            Some(Value::Set(items)) => Ok(TrackedSet::new(
                items,
                ChangeMarker::new(attribute, &mut self.changed),
            )),
            Some(other) => Err(not_a(&model, attribute, other, "set")),
            None => Err(Error::UnknownAttribute {
                model,
                attribute: attribute.to_string(),
            }),
        }
    }

    fn check_tracked(&self, attribute: &str) -> Result<(), Error> {
        match self.model.column(attribute) {
            Some(column) if column.tracked => Ok(()),
            Some(_) => Err(Error::InvalidValue(format!(
                "'{}.{}' is not a mutable container column",
                self.model_name(),
                attribute
            ))),
            None => Err(self.unknown(attribute)),
        }
    }

    /// Whether the attribute changed since load (or since the last flush).
    pub fn is_changed(&self, attribute: &str) -> bool {
        self.changed.contains(attribute)
    }

    /// Attributes changed since load (or since the last flush).
    pub fn changed(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(String::as_str)
    }

    pub(crate) fn mark_changed(&mut self, attribute: &str) {
        if !self.changed.contains(attribute) {
            self.changed.insert(attribute.to_string());
        }
    }

    pub(crate) fn clear_changes(&mut self) {
        self.changed.clear();
    }

    pub(crate) fn put_value(&mut self, column: &str, value: Value) {
        self.values.insert(column.to_string(), value);
    }

    /// Names of the relationships declared by the model.
    pub fn relationships(&self) -> impl Iterator<Item = &str> {
        self.model.relationships().iter().map(|r| r.name.as_str())
    }

    /// Names of the back-reference collections other models added.
    pub fn collections(&self) -> &[String] {
        &self.collections
    }

    /// Every attribute: columns, relationships and collections.
    pub fn attributes(&self) -> Vec<&str> {
        self.model
            .columns()
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.relationships())
            .chain(self.collections.iter().map(String::as_str))
            .collect()
    }

    /// Check if the record exposes `attribute`.
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attributes().contains(&attribute)
    }

    fn unknown(&self, attribute: &str) -> Error {
        Error::UnknownAttribute {
            model: self.model_name().to_string(),
            attribute: attribute.to_string(),
        }
    }
}

fn not_a(model: &str, attribute: &str, value: &Value, expected: &str) -> Error {
    Error::InvalidValue(format!(
        "'{}.{}' holds {}, not {}",
        model,
        attribute,
        value.type_name(),
        expected
    ))
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(id=", self.model_name())?;
        match self.id {
            Some(id) => write!(f, "{}", id)?,
            None => f.write_str("None")?,
        }
        if let Some(Value::Text(code)) = self.values.get("code") {
            write!(f, ", code='{}'", code)?;
        }
        f.write_str(")")
    }
}
