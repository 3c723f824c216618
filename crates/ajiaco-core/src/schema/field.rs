//! Field declarations.

use std::fmt;

use chrono::Utc;
use uuid::Uuid;

use super::types::{PrimitiveType, StorageKind};
use crate::value::Value;

/// Alphabet of generated short codes (no lookalike characters).
const SHORT_CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Length of generated short codes.
pub const SHORT_CODE_LEN: usize = 22;

/// The declared kind of a model field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// A semantic primitive resolved through the type mapper.
    Primitive(PrimitiveType),
    /// A caller-specified physical column.
    Column(ColumnSpec),
    /// Many-to-one reference to another registered model, by name.
    Reference(String),
    /// The autoincrementing primary key.
    PrimaryKey,
    /// Placeholder that a concrete descendant must redefine.
    Abstract,
}

impl FieldType {
    /// Reference to the model registered under `target`.
    pub fn reference(target: impl Into<String>) -> Self {
        FieldType::Reference(target.into())
    }

    /// Parse a declaration token.
    ///
    /// Raw columns and references carry a payload, so their tokens are not
    /// accepted here.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "primary-key-marker" => Some(FieldType::PrimaryKey),
            "abstract" => Some(FieldType::Abstract),
            other => PrimitiveType::from_token(other).map(FieldType::Primitive),
        }
    }

    /// Check if this field is still abstract.
    pub fn is_abstract(&self) -> bool {
        matches!(self, FieldType::Abstract)
    }

    /// Name of the declaration kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldType::Primitive(_) => "primitive",
            FieldType::Column(_) => "raw-column-spec",
            FieldType::Reference(_) => "model-reference",
            FieldType::PrimaryKey => "primary-key-marker",
            FieldType::Abstract => "abstract",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Primitive(primitive) => f.write_str(primitive.token()),
            FieldType::Column(spec) => write!(f, "{}", spec.kind),
            FieldType::Reference(target) => f.write_str(target),
            FieldType::PrimaryKey => f.write_str("primary-key-marker"),
            FieldType::Abstract => f.write_str("None (Abstract field)"),
        }
    }
}

impl From<PrimitiveType> for FieldType {
    fn from(primitive: PrimitiveType) -> Self {
        FieldType::Primitive(primitive)
    }
}

impl From<ColumnSpec> for FieldType {
    fn from(spec: ColumnSpec) -> Self {
        FieldType::Column(spec)
    }
}

/// A physical column specified verbatim by the declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    /// Storage kind.
    pub kind: StorageKind,
    /// Whether the column accepts null.
    pub nullable: bool,
    /// Value applied when the attribute is never assigned.
    pub default: Option<DefaultValue>,
    /// Whether values must be unique across the table.
    pub unique: bool,
    /// Whether the column should be indexed.
    pub indexed: bool,
    /// Help text shown in model descriptions.
    pub doc: Option<String>,
}

impl ColumnSpec {
    /// Create a nullable column with no default.
    pub fn new(kind: StorageKind) -> Self {
        Self {
            kind,
            nullable: true,
            default: None,
            unique: false,
            indexed: false,
            doc: None,
        }
    }

    /// Reject null values.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Mark as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark as indexed.
    pub fn with_index(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Attach help text.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// A literal value.
    Value(Value),
    /// A generated short unique code (evaluated at insert time).
    ShortCode,
    /// Current UTC timestamp (evaluated at insert time).
    CurrentTimestamp,
}

impl DefaultValue {
    /// Produce the value to store.
    pub fn evaluate(&self) -> Value {
        match self {
            DefaultValue::Value(value) => value.clone(),
            DefaultValue::ShortCode => Value::Text(short_code()),
            DefaultValue::CurrentTimestamp => Value::DateTime(Utc::now().naive_utc()),
        }
    }
}

impl From<Value> for DefaultValue {
    fn from(value: Value) -> Self {
        DefaultValue::Value(value)
    }
}

/// Generate a random short code from a v4 UUID.
pub fn short_code() -> String {
    let base = SHORT_CODE_ALPHABET.len() as u128;
    let mut n = Uuid::new_v4().as_u128();
    let mut code = Vec::with_capacity(SHORT_CODE_LEN);
    for _ in 0..SHORT_CODE_LEN {
        code.push(SHORT_CODE_ALPHABET[(n % base) as usize]);
        n /= base;
    }
    code.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_token() {
        assert_eq!(FieldType::from_token("abstract"), Some(FieldType::Abstract));
        assert_eq!(
            FieldType::from_token("primary-key-marker"),
            Some(FieldType::PrimaryKey)
        );
        assert_eq!(
            FieldType::from_token("list"),
            Some(FieldType::Primitive(PrimitiveType::List))
        );
        assert_eq!(FieldType::from_token("raw-column-spec"), None);
        assert_eq!(FieldType::from_token("model-reference"), None);
        assert_eq!(FieldType::from_token("str"), None);
    }

    #[test]
    fn test_column_builder() {
        let spec = ColumnSpec::new(StorageKind::VarChar(30))
            .unique()
            .with_index()
            .with_default(DefaultValue::ShortCode);
        assert!(spec.nullable);
        assert!(spec.unique);
        assert!(spec.indexed);
        assert_eq!(spec.default, Some(DefaultValue::ShortCode));

        let spec = ColumnSpec::new(StorageKind::Integer).not_null();
        assert!(!spec.nullable);
        assert!(spec.default.is_none());
    }

    #[test]
    fn test_short_codes() {
        let a = short_code();
        let b = short_code();
        assert_eq!(a.len(), SHORT_CODE_LEN);
        assert_ne!(a, b);
        assert!(a.bytes().all(|c| SHORT_CODE_ALPHABET.contains(&c)));
    }

    #[test]
    fn test_default_evaluate() {
        let literal = DefaultValue::from(Value::Integer(0));
        assert_eq!(literal.evaluate(), Value::Integer(0));
        assert!(matches!(DefaultValue::ShortCode.evaluate(), Value::Text(_)));
        assert!(matches!(
            DefaultValue::CurrentTimestamp.evaluate(),
            Value::DateTime(_)
        ));
    }
}
