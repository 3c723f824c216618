//! Compiled physical columns and their write-boundary processing.

use rust_decimal::Decimal;

use crate::codec::{decode_opaque, encode_opaque};
use crate::error::Error;
use crate::schema::{ContainerKind, DefaultValue, StorageKind};
use crate::storage::ForeignKeyRef;
use crate::value::Value;

/// A physical column of a registered model.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name, also the record attribute holding its value.
    pub name: String,
    /// Field the column was compiled from.
    pub field: String,
    /// Storage kind.
    pub kind: StorageKind,
    /// Whether null is accepted.
    pub nullable: bool,
    /// Value applied on insert when the attribute was never assigned.
    pub default: Option<DefaultValue>,
    /// Whether values must be unique across the table.
    pub unique: bool,
    /// Whether the column is indexed.
    pub indexed: bool,
    /// Whether this is the primary key.
    pub primary_key: bool,
    /// Sequence feeding the primary key.
    pub sequence: Option<String>,
    /// Referenced table, for shadow foreign key columns.
    pub foreign_key: Option<ForeignKeyRef>,
    /// Whether in-place mutation of loaded values is tracked.
    pub tracked: bool,
    /// Help text.
    pub doc: Option<String>,
}

impl ColumnDef {
    /// A nullable column with no default.
    pub fn new(name: impl Into<String>, kind: StorageKind) -> Self {
        let name = name.into();
        Self {
            field: name.clone(),
            name,
            kind,
            nullable: true,
            default: None,
            unique: false,
            indexed: false,
            primary_key: false,
            sequence: None,
            foreign_key: None,
            tracked: false,
            doc: None,
        }
    }

    /// Container kind enforced at the write boundary.
    pub fn container(&self) -> Option<ContainerKind> {
        match self.kind {
            StorageKind::Container(kind) => Some(kind),
            _ => None,
        }
    }

    /// Validate a written value and convert it to its stored form.
    ///
    /// Blob columns are run through the opaque-value encoder.
    pub fn bind(&self, table: &str, value: &Value) -> Result<Value, Error> {
        let violation = |reason: String| Error::StorageConstraint {
            table: table.to_string(),
            column: self.name.clone(),
            reason,
        };

        if value.is_null() {
            if let Some(container) = self.container() {
                return Err(violation(format!(
                    "must be '{}' type, found null",
                    container.token()
                )));
            }
            if !self.nullable {
                return Err(violation("NOT NULL constraint failed".into()));
            }
            return Ok(Value::Null);
        }

        let bound = match (&self.kind, value) {
            (StorageKind::Opaque, v) => Value::Bytes(encode_opaque(v)?),
            (StorageKind::Container(container), v) => {
                if v.container_kind() != Some(*container) {
                    return Err(violation(format!(
                        "must be '{}' type, found {}",
                        container.token(),
                        v.type_name()
                    )));
                }
                Value::Bytes(encode_opaque(v)?)
            }
            (StorageKind::BigInteger | StorageKind::Integer, Value::Integer(n)) => {
                Value::Integer(*n)
            }
            (StorageKind::Float, Value::Float(f)) => Value::Float(*f),
            (StorageKind::Float, Value::Integer(n)) => Value::Float(*n as f64),
            (StorageKind::Boolean, Value::Boolean(b)) => Value::Boolean(*b),
            (StorageKind::Text, Value::Text(s)) => Value::Text(s.clone()),
            (StorageKind::VarChar(len), Value::Text(s)) => {
                if s.chars().count() > *len as usize {
                    return Err(violation(format!("value too long for VARCHAR({})", len)));
                }
                Value::Text(s.clone())
            }
            (StorageKind::Numeric, Value::Decimal(d)) => Value::Decimal(*d),
            (StorageKind::Numeric, Value::Integer(n)) => Value::Decimal(Decimal::from(*n)),
            (StorageKind::Date, Value::Date(d)) => Value::Date(*d),
            (StorageKind::DateTime, Value::DateTime(dt)) => Value::DateTime(*dt),
            (StorageKind::Time, Value::Time(t)) => Value::Time(*t),
            (kind, v) => {
                return Err(violation(format!(
                    "expected {}, found {}",
                    kind,
                    v.type_name()
                )))
            }
        };
        Ok(bound)
    }

    /// Convert a stored value back to its runtime form.
    pub fn load(&self, stored: Value) -> Result<Value, Error> {
        match stored {
            Value::Bytes(bytes) if self.kind.is_encoded() => decode_opaque(&bytes),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_column() -> ColumnDef {
        let mut column = ColumnDef::new("numbers", StorageKind::Container(ContainerKind::List));
        column.tracked = true;
        column
    }

    #[test]
    fn test_container_round_trip() {
        let column = list_column();
        let value = Value::list([1, 2, 3]);
        let bound = column.bind("foos", &value).unwrap();
        assert!(matches!(bound, Value::Bytes(_)));
        assert_eq!(column.load(bound).unwrap(), value);
    }

    #[test]
    fn test_container_rejects_other_types() {
        let column = list_column();
        for value in [
            Value::Null,
            Value::tuple([1]),
            Value::set([1]),
            Value::Integer(1),
        ] {
            assert!(matches!(
                column.bind("foos", &value),
                Err(Error::StorageConstraint { .. })
            ));
        }
    }

    #[test]
    fn test_not_null() {
        let mut column = ColumnDef::new("demo", StorageKind::Boolean);
        assert_eq!(column.bind("foos", &Value::Null).unwrap(), Value::Null);
        column.nullable = false;
        let err = column.bind("foos", &Value::Null).unwrap_err();
        assert!(err.to_string().contains("NOT NULL"));
    }

    #[test]
    fn test_scalar_coercions() {
        let float = ColumnDef::new("x", StorageKind::Float);
        assert_eq!(float.bind("t", &Value::Integer(2)).unwrap(), Value::Float(2.0));

        let numeric = ColumnDef::new("x", StorageKind::Numeric);
        assert_eq!(
            numeric.bind("t", &Value::Integer(3)).unwrap(),
            Value::Decimal(Decimal::from(3))
        );

        let integer = ColumnDef::new("x", StorageKind::BigInteger);
        assert!(integer.bind("t", &Value::Text("1".into())).is_err());
    }

    #[test]
    fn test_varchar_length() {
        let column = ColumnDef::new("code", StorageKind::VarChar(3));
        assert!(column.bind("t", &Value::from("abc")).is_ok());
        assert!(column.bind("t", &Value::from("abcd")).is_err());
    }

    #[test]
    fn test_opaque_accepts_anything() {
        let column = ColumnDef::new("blob", StorageKind::Opaque);
        let value = Value::mapping([("a", Value::tuple([1, 2]))]);
        let bound = column.bind("t", &value).unwrap();
        assert_eq!(column.load(bound).unwrap(), value);
    }
}
