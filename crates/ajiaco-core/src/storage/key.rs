//! Row key encoding.
//!
//! Key format: `[table name (UTF-8)][0x00][row id (8 bytes, big-endian)]`
//!
//! Big-endian ids keep a table's rows ordered by primary key in prefix scans.

/// Size of the encoded row id.
pub const ROW_ID_SIZE: usize = 8;

/// Encode the key of a row.
pub fn row_key(table: &str, id: u64) -> Vec<u8> {
    let mut key = table_prefix(table);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

/// Prefix shared by every row of a table.
pub fn table_prefix(table: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(table.len() + 1 + ROW_ID_SIZE);
    prefix.extend_from_slice(table.as_bytes());
    prefix.push(0); // Null separator
    prefix
}

/// Extract the row id from a key produced by [`row_key`].
pub fn decode_row_id(key: &[u8], prefix_len: usize) -> Option<u64> {
    if key.len() != prefix_len + ROW_ID_SIZE {
        return None;
    }
    let mut id_bytes = [0u8; ROW_ID_SIZE];
    id_bytes.copy_from_slice(&key[prefix_len..]);
    Some(u64::from_be_bytes(id_bytes))
}

/// Current time in microseconds since Unix epoch.
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_micros() as u64)
        .unwrap_or_default()
}
