//! Atomic application of staged row writes and sequence advances.

use std::collections::BTreeMap;

use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionalTree};
use sled::Transactional;

use super::engine::decode_u64;
use super::key::row_key;
use super::{StorageEngine, StoredRow};
use crate::error::Error;

/// A pending row operation.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Insert or replace a row.
    Put {
        /// Table name.
        table: String,
        /// Primary key.
        id: u64,
        /// Row image.
        row: StoredRow,
    },
    /// Delete a row.
    Delete {
        /// Table name.
        table: String,
        /// Primary key.
        id: u64,
    },
}

/// Writes collected by a unit of work, applied all-or-nothing.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
    sequences: BTreeMap<String, u64>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a row write.
    pub fn put(&mut self, table: impl Into<String>, id: u64, row: StoredRow) -> &mut Self {
        self.ops.push(WriteOp::Put {
            table: table.into(),
            id,
            row,
        });
        self
    }

    /// Queue a row delete.
    pub fn delete(&mut self, table: impl Into<String>, id: u64) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            table: table.into(),
            id,
        });
        self
    }

    /// Advance a sequence to at least `value`.
    pub fn advance_sequence(&mut self, sequence: impl Into<String>, value: u64) -> &mut Self {
        let entry = self.sequences.entry(sequence.into()).or_insert(0);
        *entry = (*entry).max(value);
        self
    }

    /// Check if there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.sequences.is_empty()
    }
}

impl StorageEngine {
    /// Apply a batch atomically.
    ///
    /// All operations succeed or none do. Sequences never move backwards.
    pub fn apply(&self, batch: &WriteBatch) -> Result<(), Error> {
        if batch.is_empty() {
            return Ok(());
        }

        let backend = self.backend()?;
        let result: Result<(), TransactionError<Error>> = (&backend.rows, &backend.sequences)
            .transaction(|(rows_tx, sequences_tx)| {
                for op in &batch.ops {
                    match op {
                        WriteOp::Put { table, id, row } => {
                            Self::execute_put(rows_tx, table, *id, row)?;
                        }
                        WriteOp::Delete { table, id } => {
                            rows_tx.remove(row_key(table, *id))?;
                        }
                    }
                }
                for (sequence, value) in &batch.sequences {
                    Self::execute_advance(sequences_tx, sequence, *value)?;
                }
                Ok(())
            });

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(Error::Storage(e)),
        }
    }

    /// Execute a put operation within a transaction.
    fn execute_put(
        rows_tx: &TransactionalTree,
        table: &str,
        id: u64,
        row: &StoredRow,
    ) -> Result<(), ConflictableTransactionError<Error>> {
        let value_bytes = row.to_bytes().map_err(ConflictableTransactionError::Abort)?;
        rows_tx.insert(row_key(table, id), value_bytes)?;
        Ok(())
    }

    /// Execute a sequence advance within a transaction.
    fn execute_advance(
        sequences_tx: &TransactionalTree,
        sequence: &str,
        value: u64,
    ) -> Result<(), ConflictableTransactionError<Error>> {
        let current = match sequences_tx.get(sequence.as_bytes())? {
            Some(bytes) => decode_u64(&bytes).map_err(ConflictableTransactionError::Abort)?,
            None => 0,
        };
        if value > current {
            sequences_tx.insert(sequence.as_bytes(), &value.to_be_bytes())?;
        }
        Ok(())
    }
}
