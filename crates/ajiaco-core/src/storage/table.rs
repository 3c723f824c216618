//! Table descriptions persisted in the schema catalog.

use crate::error::Error;
use rkyv::{Archive, Deserialize, Serialize};

/// A foreign key from a column to another table's primary key.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Referencing column.
    pub column: String,
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub target_column: String,
}

/// DDL description of one table.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub table: String,
    /// Name of the model mapped to the table.
    pub model: String,
    /// Column names in declaration order.
    pub columns: Vec<String>,
    /// Name of the primary key sequence.
    pub sequence: String,
    /// Foreign keys.
    pub foreign_keys: Vec<ForeignKeyRef>,
    /// Unique columns.
    pub unique: Vec<String>,
    /// Indexed columns.
    pub indexes: Vec<String>,
}

impl TableSchema {
    /// Serialize to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}
