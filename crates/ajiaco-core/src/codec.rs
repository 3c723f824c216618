//! Value codec for encoding/decoding rows and opaque values to/from bytes.
//!
//! The same tagged format backs two things: whole rows (a list of
//! column name/value pairs) and the opaque-value encoder used by blob and
//! container columns.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::error::Error;
use crate::value::Value;

/// Type tag for encoded values.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueTag {
    Null = 0,
    Integer = 1,
    Float = 2,
    Boolean = 3,
    Text = 4,
    Bytes = 5,
    Decimal = 6,
    Date = 7,
    DateTime = 8,
    Time = 9,
    List = 10,
    Mapping = 11,
    Tuple = 12,
    Set = 13,
    FrozenSet = 14,
}

impl TryFrom<u8> for ValueTag {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ValueTag::Null),
            1 => Ok(ValueTag::Integer),
            2 => Ok(ValueTag::Float),
            3 => Ok(ValueTag::Boolean),
            4 => Ok(ValueTag::Text),
            5 => Ok(ValueTag::Bytes),
            6 => Ok(ValueTag::Decimal),
            7 => Ok(ValueTag::Date),
            8 => Ok(ValueTag::DateTime),
            9 => Ok(ValueTag::Time),
            10 => Ok(ValueTag::List),
            11 => Ok(ValueTag::Mapping),
            12 => Ok(ValueTag::Tuple),
            13 => Ok(ValueTag::Set),
            14 => Ok(ValueTag::FrozenSet),
            _ => Err(Error::InvalidData(format!("Unknown value tag: {}", value))),
        }
    }
}

/// Encode a list of column name/value pairs to bytes.
///
/// Format:
/// - Column count (4 bytes, little-endian)
/// - For each column:
///   - Name length (2 bytes, little-endian)
///   - Name (UTF-8 bytes)
///   - Value tag (1 byte)
///   - Value data (variable length, depends on type)
pub fn encode_row(columns: &[(String, Value)]) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(columns.len() as u32).to_le_bytes());

    for (name, value) in columns {
        write_name(&mut buf, name)?;
        encode_value(&mut buf, value)?;
    }

    Ok(buf)
}

/// Decode bytes back to column name/value pairs.
pub fn decode_row(data: &[u8]) -> Result<Vec<(String, Value)>, Error> {
    let count = read_u32(data, 0, "column count")? as usize;
    let mut cursor = 4;
    let mut columns = Vec::with_capacity(count);

    for _ in 0..count {
        let (name, read) = read_name(tail(data, cursor)?)?;
        cursor += read;

        let (value, read) = decode_value(tail(data, cursor)?)?;
        cursor += read;

        columns.push((name.to_string(), value));
    }

    Ok(columns)
}

/// Get a single column value by name.
///
/// Uses skip_value() to avoid decoding values for non-matching columns.
pub fn get_column(data: &[u8], column: &str) -> Result<Option<Value>, Error> {
    let count = read_u32(data, 0, "column count")? as usize;
    let mut cursor = 4;

    for _ in 0..count {
        let (name, read) = read_name(tail(data, cursor)?)?;
        cursor += read;

        if name == column {
            let (value, _) = decode_value(tail(data, cursor)?)?;
            return Ok(Some(value));
        }
        cursor += skip_value(tail(data, cursor)?)?;
    }

    Ok(None)
}

/// Serialize an arbitrary value into an opaque blob.
pub fn encode_opaque(value: &Value) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    encode_value(&mut buf, value)?;
    Ok(buf)
}

/// Deserialize an opaque blob produced by [`encode_opaque`].
pub fn decode_opaque(data: &[u8]) -> Result<Value, Error> {
    let (value, read) = decode_value(data)?;
    if read != data.len() {
        return Err(Error::InvalidData(format!(
            "Trailing {} bytes after opaque value",
            data.len() - read
        )));
    }
    Ok(value)
}

/// Skip a value without decoding it.
///
/// Returns the number of bytes to skip (including the tag byte).
pub fn skip_value(data: &[u8]) -> Result<usize, Error> {
    if data.is_empty() {
        return Err(Error::InvalidData("Empty data for value".into()));
    }

    let tag = ValueTag::try_from(data[0])?;

    let size = match tag {
        ValueTag::Null => 1,
        ValueTag::Boolean => 2,
        ValueTag::Date => 5,
        ValueTag::Integer | ValueTag::Float | ValueTag::Time => 9,
        ValueTag::DateTime => 13,
        ValueTag::Decimal => 17,
        ValueTag::Text | ValueTag::Bytes => 5 + read_u32(data, 1, "text/bytes length")? as usize,
        ValueTag::List | ValueTag::Tuple | ValueTag::Set | ValueTag::FrozenSet => {
            let len = read_u32(data, 1, "sequence length")? as usize;
            let mut cursor = 5;
            for _ in 0..len {
                cursor += skip_value(tail(data, cursor)?)?;
            }
            cursor
        }
        ValueTag::Mapping => {
            let len = read_u32(data, 1, "mapping length")? as usize;
            let mut cursor = 5;
            for _ in 0..len {
                let (_, read) = read_name(tail(data, cursor)?)?;
                cursor += read;
                cursor += skip_value(tail(data, cursor)?)?;
            }
            cursor
        }
    };

    if size > data.len() {
        return Err(Error::InvalidData("Data too short for value".into()));
    }
    Ok(size)
}

/// Encode a single value to the buffer.
fn encode_value(buf: &mut Vec<u8>, value: &Value) -> Result<(), Error> {
    match value {
        Value::Null => {
            buf.push(ValueTag::Null as u8);
        }
        Value::Integer(n) => {
            buf.push(ValueTag::Integer as u8);
            buf.extend_from_slice(&n.to_le_bytes());
        }
        Value::Float(f) => {
            buf.push(ValueTag::Float as u8);
            buf.extend_from_slice(&f.to_le_bytes());
        }
        Value::Boolean(b) => {
            buf.push(ValueTag::Boolean as u8);
            buf.push(if *b { 1 } else { 0 });
        }
        Value::Text(s) => {
            buf.push(ValueTag::Text as u8);
            write_bytes(buf, s.as_bytes())?;
        }
        Value::Bytes(b) => {
            buf.push(ValueTag::Bytes as u8);
            write_bytes(buf, b)?;
        }
        Value::Decimal(d) => {
            buf.push(ValueTag::Decimal as u8);
            buf.extend_from_slice(&d.serialize());
        }
        Value::Date(d) => {
            buf.push(ValueTag::Date as u8);
            buf.extend_from_slice(&d.num_days_from_ce().to_le_bytes());
        }
        Value::DateTime(dt) => {
            buf.push(ValueTag::DateTime as u8);
            let utc = dt.and_utc();
            buf.extend_from_slice(&utc.timestamp().to_le_bytes());
            buf.extend_from_slice(&utc.timestamp_subsec_nanos().to_le_bytes());
        }
        Value::Time(t) => {
            buf.push(ValueTag::Time as u8);
            buf.extend_from_slice(&t.num_seconds_from_midnight().to_le_bytes());
            buf.extend_from_slice(&t.nanosecond().to_le_bytes());
        }
        Value::List(items) => encode_sequence(buf, ValueTag::List, items)?,
        Value::Tuple(items) => encode_sequence(buf, ValueTag::Tuple, items)?,
        Value::Set(items) => encode_sequence(buf, ValueTag::Set, items)?,
        Value::FrozenSet(items) => encode_sequence(buf, ValueTag::FrozenSet, items)?,
        Value::Mapping(entries) => {
            buf.push(ValueTag::Mapping as u8);
            write_len(buf, entries.len())?;
            for (key, item) in entries {
                write_name(buf, key)?;
                encode_value(buf, item)?;
            }
        }
    }
    Ok(())
}

fn encode_sequence(buf: &mut Vec<u8>, tag: ValueTag, items: &[Value]) -> Result<(), Error> {
    buf.push(tag as u8);
    write_len(buf, items.len())?;
    for item in items {
        encode_value(buf, item)?;
    }
    Ok(())
}

/// Decode a single value from the buffer.
///
/// Returns the decoded value and the number of bytes consumed.
fn decode_value(data: &[u8]) -> Result<(Value, usize), Error> {
    if data.is_empty() {
        return Err(Error::InvalidData("Empty data for value".into()));
    }

    let tag = ValueTag::try_from(data[0])?;

    match tag {
        ValueTag::Null => Ok((Value::Null, 1)),
        ValueTag::Integer => Ok((Value::Integer(i64::from_le_bytes(fixed(data, 1)?)), 9)),
        ValueTag::Float => Ok((Value::Float(f64::from_le_bytes(fixed(data, 1)?)), 9)),
        ValueTag::Boolean => {
            let [b] = fixed::<1>(data, 1)?;
            Ok((Value::Boolean(b != 0), 2))
        }
        ValueTag::Text => {
            let len = read_u32(data, 1, "text length")? as usize;
            let bytes = slice(data, 5, len)?;
            let s = String::from_utf8(bytes.to_vec())
                .map_err(|_| Error::InvalidData("Invalid UTF-8 in text".into()))?;
            Ok((Value::Text(s), 5 + len))
        }
        ValueTag::Bytes => {
            let len = read_u32(data, 1, "bytes length")? as usize;
            Ok((Value::Bytes(slice(data, 5, len)?.to_vec()), 5 + len))
        }
        ValueTag::Decimal => Ok((Value::Decimal(Decimal::deserialize(fixed(data, 1)?)), 17)),
        ValueTag::Date => {
            let days = i32::from_le_bytes(fixed(data, 1)?);
            let date = NaiveDate::from_num_days_from_ce_opt(days)
                .ok_or_else(|| Error::InvalidData(format!("Invalid date: {}", days)))?;
            Ok((Value::Date(date), 5))
        }
        ValueTag::DateTime => {
            let secs = i64::from_le_bytes(fixed(data, 1)?);
            let nanos = u32::from_le_bytes(fixed(data, 9)?);
            let dt = DateTime::from_timestamp(secs, nanos)
                .ok_or_else(|| Error::InvalidData(format!("Invalid date-time: {}s", secs)))?;
            Ok((Value::DateTime(dt.naive_utc()), 13))
        }
        ValueTag::Time => {
            let secs = u32::from_le_bytes(fixed(data, 1)?);
            let nanos = u32::from_le_bytes(fixed(data, 5)?);
            let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
                .ok_or_else(|| Error::InvalidData(format!("Invalid time: {}s", secs)))?;
            Ok((Value::Time(time), 9))
        }
        ValueTag::List | ValueTag::Tuple | ValueTag::Set | ValueTag::FrozenSet => {
            let len = read_u32(data, 1, "sequence length")? as usize;
            let mut cursor = 5;
            let mut items = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                let (item, read) = decode_value(tail(data, cursor)?)?;
                cursor += read;
                items.push(item);
            }
            let value = match tag {
                ValueTag::List => Value::List(items),
                ValueTag::Tuple => Value::Tuple(items),
                ValueTag::Set => Value::Set(items),
                _ => Value::FrozenSet(items),
            };
            Ok((value, cursor))
        }
        ValueTag::Mapping => {
            let len = read_u32(data, 1, "mapping length")? as usize;
            let mut cursor = 5;
            let mut entries = BTreeMap::new();
            for _ in 0..len {
                let (key, read) = read_name(tail(data, cursor)?)?;
                let key = key.to_string();
                cursor += read;
                let (item, read) = decode_value(tail(data, cursor)?)?;
                cursor += read;
                entries.insert(key, item);
            }
            Ok((Value::Mapping(entries), cursor))
        }
    }
}

fn write_len(buf: &mut Vec<u8>, len: usize) -> Result<(), Error> {
    let len = u32::try_from(len).map_err(|_| Error::InvalidData("Value too long".into()))?;
    buf.extend_from_slice(&len.to_le_bytes());
    Ok(())
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) -> Result<(), Error> {
    write_len(buf, bytes.len())?;
    buf.extend_from_slice(bytes);
    Ok(())
}

fn write_name(buf: &mut Vec<u8>, name: &str) -> Result<(), Error> {
    let bytes = name.as_bytes();
    let len = u16::try_from(bytes.len())
        .map_err(|_| Error::InvalidData("Column name too long".into()))?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Read a length-prefixed name. Returns the name and bytes consumed.
fn read_name(data: &[u8]) -> Result<(&str, usize), Error> {
    let len = u16::from_le_bytes(fixed(data, 0)?) as usize;
    let name = std::str::from_utf8(slice(data, 2, len)?)
        .map_err(|_| Error::InvalidData("Invalid UTF-8 in name".into()))?;
    Ok((name, 2 + len))
}

fn read_u32(data: &[u8], at: usize, what: &str) -> Result<u32, Error> {
    fixed(data, at)
        .map(u32::from_le_bytes)
        .map_err(|_| Error::InvalidData(format!("Data too short for {}", what)))
}

fn fixed<const N: usize>(data: &[u8], at: usize) -> Result<[u8; N], Error> {
    let bytes = slice(data, at, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

fn slice(data: &[u8], at: usize, len: usize) -> Result<&[u8], Error> {
    data.get(at..at + len)
        .ok_or_else(|| Error::InvalidData("Unexpected end of data".into()))
}

fn tail(data: &[u8], at: usize) -> Result<&[u8], Error> {
    data.get(at..)
        .ok_or_else(|| Error::InvalidData("Unexpected end of data".into()))
}
