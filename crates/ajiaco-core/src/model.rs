//! Registered (physical) models.

use std::sync::Arc;

use crate::column::ColumnDef;
use crate::error::Error;
use crate::schema::{Declaration, ModelConfig};
use crate::storage::TableSchema;

/// Cardinality of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Each row points at one target row.
    ManyToOne,
    /// Each row is pointed at by many rows.
    OneToMany,
}

/// A many-to-one relationship compiled from a model reference field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDef {
    /// Accessor name (the field name).
    pub name: String,
    /// Referenced model.
    pub target: String,
    /// Shadow foreign key column on this model.
    pub column: String,
    /// Name of the collection added to the target.
    pub back_reference: String,
    /// Always [`Cardinality::ManyToOne`].
    pub cardinality: Cardinality,
}

/// A collection another model contributed to a target model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackReference {
    /// Collection name (the referencing model's related name).
    pub name: String,
    /// Referencing model.
    pub source: String,
    /// Relationship on the referencing model.
    pub relationship: String,
    /// Foreign key column on the referencing model.
    pub column: String,
}

impl BackReference {
    /// Back-references are always one-to-many.
    pub fn cardinality(&self) -> Cardinality {
        Cardinality::OneToMany
    }
}

/// The physical counterpart of a concrete [`ModelConfig`].
///
/// Created once per registration and never mutated afterwards. Collections
/// contributed by later registrations are tracked by the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredModel {
    config: ModelConfig,
    table_name: String,
    related_name: String,
    columns: Vec<ColumnDef>,
    relationships: Vec<RelationshipDef>,
}

impl RegisteredModel {
    pub(crate) fn new(
        config: ModelConfig,
        table_name: String,
        related_name: String,
        columns: Vec<ColumnDef>,
        relationships: Vec<RelationshipDef>,
    ) -> Self {
        Self {
            config,
            table_name,
            related_name,
            columns,
            relationships,
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        self.config.name()
    }

    /// The logical config this model was compiled from.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Related name.
    pub fn related_name(&self) -> &str {
        &self.related_name
    }

    /// Compiled columns in declaration order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The primary key column.
    pub fn primary_key(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.primary_key)
    }

    /// Sequence feeding the primary key.
    pub fn sequence(&self) -> Option<&str> {
        self.primary_key().and_then(|c| c.sequence.as_deref())
    }

    /// Compiled relationships.
    pub fn relationships(&self) -> &[RelationshipDef] {
        &self.relationships
    }

    /// Look up a relationship by accessor name.
    pub fn relationship(&self, name: &str) -> Option<&RelationshipDef> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// DDL description of the model's table.
    pub fn table_schema(&self) -> TableSchema {
        TableSchema {
            table: self.table_name.clone(),
            model: self.name().to_string(),
            columns: self.columns.iter().map(|c| c.name.clone()).collect(),
            sequence: self.sequence().unwrap_or_default().to_string(),
            foreign_keys: self
                .columns
                .iter()
                .filter_map(|c| c.foreign_key.clone())
                .collect(),
            unique: self
                .columns
                .iter()
                .filter(|c| c.unique && !c.primary_key)
                .map(|c| c.name.clone())
                .collect(),
            indexes: self
                .columns
                .iter()
                .filter(|c| c.indexed)
                .map(|c| c.name.clone())
                .collect(),
        }
    }

    /// Human readable description of the model.
    pub fn describe(&self) -> String {
        self.config.describe()
    }
}

/// Values accepted by [`crate::ModelRegistry::register`].
pub trait IntoModelConfig {
    /// Produce the config to register, or refuse.
    fn into_model_config(self) -> Result<ModelConfig, Error>;
}

impl IntoModelConfig for ModelConfig {
    fn into_model_config(self) -> Result<ModelConfig, Error> {
        Ok(self)
    }
}

impl IntoModelConfig for &ModelConfig {
    fn into_model_config(self) -> Result<ModelConfig, Error> {
        Ok(self.rebase())
    }
}

impl IntoModelConfig for Declaration {
    fn into_model_config(self) -> Result<ModelConfig, Error> {
        Ok(self.compose()?)
    }
}

impl IntoModelConfig for &RegisteredModel {
    fn into_model_config(self) -> Result<ModelConfig, Error> {
        Err(Error::UnsupportedOperation(format!(
            "'{}' is already a physical model",
            self.name()
        )))
    }
}

impl IntoModelConfig for &Arc<RegisteredModel> {
    fn into_model_config(self) -> Result<ModelConfig, Error> {
        self.as_ref().into_model_config()
    }
}
