//! Core error types.

use thiserror::Error;

/// Misconfiguration of a model field, raised while composing a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The declared kind is not one of the recognized field kinds.
    #[error("invalid type '{kind}' of '{model}.{field}'")]
    InvalidType {
        /// Model being declared.
        model: String,
        /// Offending field.
        field: String,
        /// The rejected kind token.
        kind: String,
    },

    /// Field names can't be empty.
    #[error("field name can't be empty in model '{model}'")]
    EmptyName {
        /// Model being declared.
        model: String,
    },

    /// Field names can't start with the reserved prefix.
    #[error("field can't start with an underscore: '{model}.{field}'")]
    ReservedPrefix {
        /// Model being declared.
        model: String,
        /// Offending field.
        field: String,
    },

    /// Only abstract fields can be redefined.
    #[error("'{model}' can't redefine field '{field}'")]
    Redefinition {
        /// Model being declared.
        model: String,
        /// Offending field.
        field: String,
    },

    /// A concrete model still has an abstract field.
    #[error("field '{model}.{field}' must be redefined if the model is concrete")]
    UnresolvedAbstract {
        /// Model being declared.
        model: String,
        /// Field left abstract.
        field: String,
    },

    /// A concrete model is missing its table or related name.
    #[error("model '{model}' must define the attribute '{attribute}'")]
    MissingAttribute {
        /// Model being declared.
        model: String,
        /// Missing attribute name.
        attribute: &'static str,
    },
}

/// Core errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Field misconfiguration.
    #[error("field error: {0}")]
    Field(#[from] FieldError),

    /// A model with the same name is already registered.
    #[error("duplicated model '{0}'")]
    DuplicateRegistration(String),

    /// Another registered model already owns the table.
    #[error("table '{table}' of '{model}' is already defined by '{owner}'")]
    DuplicateTable {
        /// Model being registered.
        model: String,
        /// Contested table name.
        table: String,
        /// Model that owns the table.
        owner: String,
    },

    /// The value can't be registered (abstract or already physical).
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A model reference names a model that isn't registered.
    #[error("model '{target}' referenced by '{model}.{field}' is not registered")]
    Lookup {
        /// Referencing model.
        model: String,
        /// Referencing field.
        field: String,
        /// Missing target model.
        target: String,
    },

    /// Model lookup by name failed.
    #[error("unknown model '{0}'")]
    UnknownModel(String),

    /// The storage rejected a written value.
    #[error("storage constraint violated on '{table}.{column}': {reason}")]
    StorageConstraint {
        /// Table being written.
        table: String,
        /// Offending column.
        column: String,
        /// Description of the violation.
        reason: String,
    },

    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Invalid data format.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Malformed or unsupported storage address.
    #[error("invalid storage address '{address}': {reason}")]
    InvalidAddress {
        /// The rejected address.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The storage has not been created (or was dropped).
    #[error("storage '{0}' is not available")]
    StorageUnavailable(String),

    /// The connection checkout is held by another unit of work.
    #[error("storage '{0}' is busy with another unit of work")]
    ScopeBusy(String),

    /// The table has no schema in the storage.
    #[error("no such table '{0}'")]
    MissingTable(String),

    /// Record not found.
    #[error("{model} not found")]
    NotFound {
        /// Model searched.
        model: String,
    },

    /// More than one record matched a lookup expecting exactly one.
    #[error("multiple {model} rows found where one was expected")]
    MultipleResults {
        /// Model searched.
        model: String,
    },

    /// Attribute access on a record failed.
    #[error("'{model}' has no attribute '{attribute}'")]
    UnknownAttribute {
        /// Model of the record.
        model: String,
        /// Requested attribute.
        attribute: String,
    },

    /// The current value of an attribute doesn't support the operation.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The stamp table already holds its single row.
    #[error("storage is already stamped")]
    StampExists,

    /// Transaction error.
    #[error("transaction error: {0}")]
    Transaction(String),
}

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
