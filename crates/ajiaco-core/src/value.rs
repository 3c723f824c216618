//! Runtime values stored in model columns.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::schema::ContainerKind;

/// A runtime value held by a record attribute.
///
/// Containers are recursive: a list may hold mappings, a mapping may hold
/// tuples, and so on. Sets keep insertion order and never hold duplicates.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// Boolean value.
    Boolean(bool),
    /// UTF-8 text.
    Text(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Fixed-point decimal.
    Decimal(Decimal),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time without zone.
    DateTime(NaiveDateTime),
    /// Time of day.
    Time(NaiveTime),
    /// Growable sequence.
    List(Vec<Value>),
    /// String-keyed mapping.
    Mapping(BTreeMap<String, Value>),
    /// Fixed sequence.
    Tuple(Vec<Value>),
    /// Unique values.
    Set(Vec<Value>),
    /// Unique values, immutable.
    FrozenSet(Vec<Value>),
}

impl Value {
    /// Build a list value.
    pub fn list<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Build a tuple value.
    pub fn tuple<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Value::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Build a set value, dropping duplicates.
    pub fn set<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Value::Set(unique(items))
    }

    /// Build a frozen set value, dropping duplicates.
    pub fn frozen_set<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Value::FrozenSet(unique(items))
    }

    /// Build a mapping value.
    pub fn mapping<K: Into<String>, V: Into<Value>>(
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Value::Mapping(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// An empty mapping.
    pub fn empty_mapping() -> Self {
        Value::Mapping(BTreeMap::new())
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The container kind of this value, if it is a container.
    pub fn container_kind(&self) -> Option<ContainerKind> {
        match self {
            Value::List(_) => Some(ContainerKind::List),
            Value::Mapping(_) => Some(ContainerKind::Mapping),
            Value::Tuple(_) => Some(ContainerKind::Tuple),
            Value::Set(_) => Some(ContainerKind::Set),
            Value::FrozenSet(_) => Some(ContainerKind::FrozenSet),
            _ => None,
        }
    }

    /// Short name of the runtime type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Decimal(_) => "decimal",
            Value::Date(_) => "date",
            Value::DateTime(_) => "date-time",
            Value::Time(_) => "time",
            Value::List(_) => "list",
            Value::Mapping(_) => "mapping",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::FrozenSet(_) => "frozen-set",
        }
    }

    /// Try to get as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get as f64. Integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bytes reference.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get as decimal.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Try to get as date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Try to get as date-time.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Try to get as time.
    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// Try to get the items of a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get the items of a tuple.
    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get the members of a set or frozen set.
    pub fn as_set(&self) -> Option<&[Value]> {
        match self {
            Value::Set(items) | Value::FrozenSet(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get the entries of a mapping.
    pub fn as_mapping(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Mapping(entries) => Some(entries),
            _ => None,
        }
    }
}

fn unique<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for item in items {
        let item = item.into();
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn same_members(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().all(|item| b.contains(item))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Mapping(a), Value::Mapping(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => same_members(a, b),
            (Value::FrozenSet(a), Value::FrozenSet(b)) => same_members(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
            write!(f, "{}", open)?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", item)?;
            }
            write!(f, "{}", close)
        }

        match self {
            Value::Null => write!(f, "null"),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Date(d) => write!(f, "{}", d),
            Value::DateTime(dt) => write!(f, "{}", dt),
            Value::Time(t) => write!(f, "{}", t),
            Value::List(items) => seq(f, "[", items, "]"),
            Value::Tuple(items) => seq(f, "(", items, ")"),
            Value::Set(items) => seq(f, "{", items, "}"),
            Value::FrozenSet(items) => seq(f, "frozen{", items, "}"),
            Value::Mapping(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<NaiveTime> for Value {
    fn from(t: NaiveTime) -> Self {
        Value::Time(t)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Mapping(entries)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_drops_duplicates() {
        let set = Value::set([1, 2, 2, 3, 1]);
        assert_eq!(set.as_set().unwrap().len(), 3);
    }

    #[test]
    fn test_set_equality_ignores_order() {
        assert_eq!(Value::set([1, 2, 3]), Value::set([3, 1, 2]));
        assert_ne!(Value::set([1, 2]), Value::frozen_set([1, 2]));
        assert_ne!(Value::list([1, 2]), Value::list([2, 1]));
    }

    #[test]
    fn test_container_kind() {
        assert_eq!(Value::list([1]).container_kind(), Some(ContainerKind::List));
        assert_eq!(Value::empty_mapping().container_kind(), Some(ContainerKind::Mapping));
        assert_eq!(Value::Null.container_kind(), None);
    }

    #[test]
    fn test_option_conversion() {
        assert!(Value::from(None::<i64>).is_null());
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }

    #[test]
    fn test_integer_widens_to_float() {
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(3.0).as_i64(), None);
    }
}
