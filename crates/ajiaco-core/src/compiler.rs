//! Column compiler: turns resolved field declarations into physical columns
//! and relationships.

use crate::column::ColumnDef;
use crate::error::Error;
use crate::model::{BackReference, Cardinality, RelationshipDef};
use crate::registry::ModelRegistry;
use crate::schema::{FieldType, ModelConfig, StorageKind};
use crate::storage::ForeignKeyRef;

/// Output of compiling one model.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledModel {
    /// Table name.
    pub table_name: String,
    /// Related name.
    pub related_name: String,
    /// Columns in field order; reference fields contribute their shadow column.
    pub columns: Vec<ColumnDef>,
    /// Many-to-one relationships.
    pub relationships: Vec<RelationshipDef>,
    /// Collections to add to referenced models, keyed by target model.
    pub back_references: Vec<(String, BackReference)>,
}

/// Name of the primary key sequence of a table.
pub fn sequence_name(table_name: &str) -> String {
    format!("{}_id_seq", table_name)
}

/// Name of the shadow foreign key column of a reference field.
pub fn shadow_column(field: &str) -> String {
    format!("_{}_id", field)
}

/// Compile a concrete config.
///
/// References are resolved against models already in `registry`; nothing is
/// produced if any of them is missing.
pub fn compile(config: &ModelConfig, registry: &ModelRegistry) -> Result<CompiledModel, Error> {
    let (table_name, related_name) = match (config.table_name(), config.related_name()) {
        (Some(table), Some(related)) if !config.is_abstract() => (table, related),
        _ => {
            return Err(Error::UnsupportedOperation(format!(
                "can't compile abstract model '{}'",
                config.name()
            )))
        }
    };

    let mut columns = Vec::with_capacity(config.fields().len());
    let mut relationships = Vec::new();
    let mut back_references = Vec::new();

    for (field, field_type) in config.fields() {
        match field_type {
            FieldType::PrimaryKey => {
                let mut column = ColumnDef::new(field.clone(), StorageKind::Integer);
                column.nullable = false;
                column.primary_key = true;
                column.sequence = Some(sequence_name(table_name));
                columns.push(column);
            }
            FieldType::Column(spec) => {
                let mut column = ColumnDef::new(field.clone(), spec.kind);
                column.nullable = spec.nullable;
                column.default = spec.default.clone();
                column.unique = spec.unique;
                column.indexed = spec.indexed;
                column.tracked = column.container().is_some_and(|k| k.is_mutable());
                column.doc = spec.doc.clone();
                columns.push(column);
            }
            FieldType::Reference(target) => {
                let target_model = registry.get(target).ok_or_else(|| Error::Lookup {
                    model: config.name().to_string(),
                    field: field.clone(),
                    target: target.clone(),
                })?;
                let target_column = target_model
                    .primary_key()
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| "id".to_string());

                let name = shadow_column(field);
                let mut column = ColumnDef::new(name.clone(), StorageKind::Integer);
                column.field = field.clone();
                column.nullable = false;
                column.foreign_key = Some(ForeignKeyRef {
                    column: name.clone(),
                    table: target_model.table_name().to_string(),
                    target_column,
                });
                columns.push(column);

                relationships.push(RelationshipDef {
                    name: field.clone(),
                    target: target_model.name().to_string(),
                    column: name.clone(),
                    back_reference: related_name.to_string(),
                    cardinality: Cardinality::ManyToOne,
                });
                back_references.push((
                    target_model.name().to_string(),
                    BackReference {
                        name: related_name.to_string(),
                        source: config.name().to_string(),
                        relationship: field.clone(),
                        column: name,
                    },
                ));
            }
            FieldType::Primitive(primitive) => {
                let mapping = primitive.resolve();
                let mut column = ColumnDef::new(field.clone(), mapping.kind);
                column.tracked = mapping.mutable;
                columns.push(column);
            }
            FieldType::Abstract => {
                return Err(Error::UnsupportedOperation(format!(
                    "field '{}.{}' is abstract",
                    config.name(),
                    field
                )))
            }
        }
    }

    tracing::debug!(
        model = %config.name(),
        table = table_name,
        columns = columns.len(),
        relationships = relationships.len(),
        "Compiled model"
    );

    Ok(CompiledModel {
        table_name: table_name.to_string(),
        related_name: related_name.to_string(),
        columns,
        relationships,
        back_references,
    })
}
