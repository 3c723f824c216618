//! Semantic field types and their physical storage kinds.

use std::fmt;

/// Container shapes stored as encoded blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Growable sequence.
    List,
    /// String-keyed mapping.
    Mapping,
    /// Fixed sequence.
    Tuple,
    /// Unique values.
    Set,
    /// Unique values, immutable.
    FrozenSet,
}

impl ContainerKind {
    /// Whether values of this kind can be mutated in place.
    pub fn is_mutable(self) -> bool {
        matches!(
            self,
            ContainerKind::List | ContainerKind::Mapping | ContainerKind::Set
        )
    }

    /// Declaration token of this kind.
    pub fn token(self) -> &'static str {
        match self {
            ContainerKind::List => "list",
            ContainerKind::Mapping => "mapping",
            ContainerKind::Tuple => "tuple",
            ContainerKind::Set => "set",
            ContainerKind::FrozenSet => "frozen-set",
        }
    }
}

/// Physical column kinds understood by the storage engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Encoded blob holding any value.
    Opaque,
    /// 64-bit integer.
    BigInteger,
    /// Integer (primary and foreign keys).
    Integer,
    /// Double precision float.
    Float,
    /// Boolean.
    Boolean,
    /// Unbounded text.
    Text,
    /// Text with a maximum length in characters.
    VarChar(u32),
    /// Fixed-point decimal.
    Numeric,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// Time of day.
    Time,
    /// Encoded blob validated against a container kind.
    Container(ContainerKind),
}

impl StorageKind {
    /// Whether values are written through the opaque-value encoder.
    pub fn is_encoded(&self) -> bool {
        matches!(self, StorageKind::Opaque | StorageKind::Container(_))
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Opaque => write!(f, "BLOB"),
            StorageKind::BigInteger => write!(f, "BIGINT"),
            StorageKind::Integer => write!(f, "INTEGER"),
            StorageKind::Float => write!(f, "FLOAT"),
            StorageKind::Boolean => write!(f, "BOOLEAN"),
            StorageKind::Text => write!(f, "TEXT"),
            StorageKind::VarChar(len) => write!(f, "VARCHAR({})", len),
            StorageKind::Numeric => write!(f, "NUMERIC"),
            StorageKind::Date => write!(f, "DATE"),
            StorageKind::DateTime => write!(f, "DATETIME"),
            StorageKind::Time => write!(f, "TIME"),
            StorageKind::Container(kind) => write!(f, "BLOB[{}]", kind.token()),
        }
    }
}

/// Semantic primitive types a field can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// Any value, stored as an encoded blob.
    Opaque,
    /// Integer.
    Integer,
    /// Float.
    Float,
    /// Boolean.
    Boolean,
    /// Text.
    Text,
    /// List.
    List,
    /// Mapping.
    Mapping,
    /// Tuple.
    Tuple,
    /// Set.
    Set,
    /// Frozen set.
    FrozenSet,
    /// Fixed-point decimal.
    Decimal,
    /// Date.
    Date,
    /// Date-time.
    DateTime,
    /// Time.
    Time,
}

/// Result of mapping a primitive type to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMapping {
    /// Physical column kind.
    pub kind: StorageKind,
    /// Whether loaded values must be change-tracked.
    pub mutable: bool,
}

impl PrimitiveType {
    /// Every supported primitive type.
    pub const ALL: [PrimitiveType; 14] = [
        PrimitiveType::Opaque,
        PrimitiveType::Integer,
        PrimitiveType::Float,
        PrimitiveType::Boolean,
        PrimitiveType::Text,
        PrimitiveType::List,
        PrimitiveType::Mapping,
        PrimitiveType::Tuple,
        PrimitiveType::Set,
        PrimitiveType::FrozenSet,
        PrimitiveType::Decimal,
        PrimitiveType::Date,
        PrimitiveType::DateTime,
        PrimitiveType::Time,
    ];

    /// Parse a declaration token. Returns `None` for unsupported tags.
    pub fn from_token(token: &str) -> Option<Self> {
        let primitive = match token {
            "opaque-object" => PrimitiveType::Opaque,
            "integer" => PrimitiveType::Integer,
            "float" => PrimitiveType::Float,
            "boolean" => PrimitiveType::Boolean,
            "text" => PrimitiveType::Text,
            "list" => PrimitiveType::List,
            "mapping" => PrimitiveType::Mapping,
            "tuple" => PrimitiveType::Tuple,
            "set" => PrimitiveType::Set,
            "frozen-set" => PrimitiveType::FrozenSet,
            "decimal" => PrimitiveType::Decimal,
            "date" => PrimitiveType::Date,
            "date-time" => PrimitiveType::DateTime,
            "time" => PrimitiveType::Time,
            _ => return None,
        };
        Some(primitive)
    }

    /// Declaration token of this type.
    pub fn token(self) -> &'static str {
        match self {
            PrimitiveType::Opaque => "opaque-object",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Float => "float",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Text => "text",
            PrimitiveType::List => "list",
            PrimitiveType::Mapping => "mapping",
            PrimitiveType::Tuple => "tuple",
            PrimitiveType::Set => "set",
            PrimitiveType::FrozenSet => "frozen-set",
            PrimitiveType::Decimal => "decimal",
            PrimitiveType::Date => "date",
            PrimitiveType::DateTime => "date-time",
            PrimitiveType::Time => "time",
        }
    }

    /// Map this type to its storage kind and mutability.
    pub fn resolve(self) -> TypeMapping {
        let kind = match self {
            PrimitiveType::Opaque => StorageKind::Opaque,
            PrimitiveType::Integer => StorageKind::BigInteger,
            PrimitiveType::Float => StorageKind::Float,
            PrimitiveType::Boolean => StorageKind::Boolean,
            PrimitiveType::Text => StorageKind::Text,
            PrimitiveType::List => StorageKind::Container(ContainerKind::List),
            PrimitiveType::Mapping => StorageKind::Container(ContainerKind::Mapping),
            PrimitiveType::Tuple => StorageKind::Container(ContainerKind::Tuple),
            PrimitiveType::Set => StorageKind::Container(ContainerKind::Set),
            PrimitiveType::FrozenSet => StorageKind::Container(ContainerKind::FrozenSet),
            PrimitiveType::Decimal => StorageKind::Numeric,
            PrimitiveType::Date => StorageKind::Date,
            PrimitiveType::DateTime => StorageKind::DateTime,
            PrimitiveType::Time => StorageKind::Time,
        };
        let mutable = match kind {
            StorageKind::Container(container) => container.is_mutable(),
            _ => false,
        };
        TypeMapping { kind, mutable }
    }
}
