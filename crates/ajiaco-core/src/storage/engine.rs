//! Storage engine implementation.

use std::sync::Arc;

use parking_lot::RwLock;
use sled::{Db, Tree};

use super::key::{decode_row_id, row_key, table_prefix};
use super::{Stamp, StorageAddress, StorageConfig, StoredRow, TableSchema};
use crate::error::Error;

/// Tree name for row data.
const ROWS_TREE: &str = "rows";

/// Tree name for primary key sequences.
const SEQUENCES_TREE: &str = "sequences";

/// Tree name for the schema catalog.
const SCHEMA_TREE: &str = "schema";

/// Tree name for the stamp table.
const STAMP_TREE: &str = "stamp";

/// Key of the single stamp row.
const STAMP_KEY: &[u8] = b"stamp";

/// Open sled handles.
pub(crate) struct Backend {
    db: Db,
    pub(crate) rows: Tree,
    pub(crate) sequences: Tree,
    schema: Tree,
    stamp: Tree,
}

impl Backend {
    fn open(config: &StorageConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        let rows = db.open_tree(ROWS_TREE)?;
        let sequences = db.open_tree(SEQUENCES_TREE)?;
        let schema = db.open_tree(SCHEMA_TREE)?;
        let stamp = db.open_tree(STAMP_TREE)?;
        Ok(Self {
            db,
            rows,
            sequences,
            schema,
            stamp,
        })
    }

    fn clear(&self) -> Result<(), Error> {
        self.rows.clear()?;
        self.sequences.clear()?;
        self.schema.clear()?;
        self.stamp.clear()?;
        Ok(())
    }
}

/// The storage engine wrapping sled.
///
/// The sled database is opened lazily: an on-disk storage is only opened
/// once it exists (see [`StorageEngine::exists`]) or is created.
pub struct StorageEngine {
    address: StorageAddress,
    config: StorageConfig,
    backend: RwLock<Option<Arc<Backend>>>,
}

impl StorageEngine {
    /// Bind an engine to an address. No IO happens until first use.
    pub fn new(address: StorageAddress) -> Self {
        let config = StorageConfig::from_address(&address);
        Self::with_config(address, config)
    }

    /// Bind an engine to an address with an explicit configuration.
    pub fn with_config(address: StorageAddress, config: StorageConfig) -> Self {
        Self {
            address,
            config,
            backend: RwLock::new(None),
        }
    }

    /// The bound address.
    pub fn address(&self) -> &StorageAddress {
        &self.address
    }

    /// The engine configuration.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Whether the address is an in-memory storage.
    pub fn is_memory(&self) -> bool {
        self.address.is_memory()
    }

    /// Whether the storage exists. In-memory storages always exist.
    pub fn exists(&self) -> bool {
        if self.is_memory() || self.config.temporary {
            return true;
        }
        let path = &self.config.path;
        path.join("conf").exists() || path.join("db").exists()
    }

    /// Create the storage.
    pub fn create(&self) -> Result<(), Error> {
        let mut slot = self.backend.write();
        if slot.is_none() {
            *slot = Some(Arc::new(Backend::open(&self.config)?));
        }
        tracing::info!(storage = %self.address, "Created storage");
        Ok(())
    }

    /// Drop the storage. In-memory storages are only cleared.
    pub fn drop_storage(&self) -> Result<(), Error> {
        let mut slot = self.backend.write();
        if self.is_memory() || self.config.temporary {
            if let Some(backend) = slot.as_ref() {
                backend.clear()?;
            }
        } else {
            if let Some(backend) = slot.take() {
                backend.db.flush()?;
            }
            if self.config.path.exists() {
                std::fs::remove_dir_all(&self.config.path)?;
            }
        }
        tracing::info!(storage = %self.address, "Dropped storage");
        Ok(())
    }

    /// Open sled handles, failing if an on-disk storage doesn't exist.
    pub(crate) fn backend(&self) -> Result<Arc<Backend>, Error> {
        if let Some(backend) = self.backend.read().as_ref() {
            return Ok(Arc::clone(backend));
        }
        if !self.exists() {
            return Err(Error::StorageUnavailable(self.address.to_string()));
        }
        let mut slot = self.backend.write();
        match slot.as_ref() {
            Some(backend) => Ok(Arc::clone(backend)),
            None => {
                let backend = Arc::new(Backend::open(&self.config)?);
                *slot = Some(Arc::clone(&backend));
                Ok(backend)
            }
        }
    }

    // ========== Schema Catalog ==========

    /// Create (or replace) table descriptions.
    pub fn apply_schema(&self, tables: &[TableSchema]) -> Result<(), Error> {
        let backend = self.backend()?;
        for table in tables {
            backend
                .schema
                .insert(table.table.as_bytes(), table.to_bytes()?)?;
            tracing::debug!(table = %table.table, model = %table.model, "Created table");
        }
        Ok(())
    }

    /// Remove tables together with their rows and sequences.
    pub fn retract_schema(&self, tables: &[&str]) -> Result<(), Error> {
        let backend = self.backend()?;
        for &table in tables {
            if let Some(bytes) = backend.schema.remove(table.as_bytes())? {
                let schema = TableSchema::from_bytes(&bytes)?;
                backend.sequences.remove(schema.sequence.as_bytes())?;
            }

            let mut batch = sled::Batch::default();
            for result in backend.rows.scan_prefix(table_prefix(table)) {
                let (key, _) = result?;
                batch.remove(key);
            }
            backend.rows.apply_batch(batch)?;
            tracing::debug!(table, "Dropped table");
        }
        Ok(())
    }

    /// Get a table description.
    pub fn table(&self, table: &str) -> Result<Option<TableSchema>, Error> {
        match self.backend()?.schema.get(table.as_bytes())? {
            Some(bytes) => Ok(Some(TableSchema::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// List all table descriptions ordered by table name.
    pub fn tables(&self) -> Result<Vec<TableSchema>, Error> {
        self.backend()?
            .schema
            .iter()
            .map(|result| {
                let (_, bytes) = result?;
                TableSchema::from_bytes(&bytes)
            })
            .collect()
    }

    // ========== Rows ==========

    /// Last value handed out by a sequence (0 if never used).
    pub fn sequence_value(&self, sequence: &str) -> Result<u64, Error> {
        match self.backend()?.sequences.get(sequence.as_bytes())? {
            Some(bytes) => decode_u64(&bytes),
            None => Ok(0),
        }
    }

    /// Get a row by primary key.
    pub fn get_row(&self, table: &str, id: u64) -> Result<Option<StoredRow>, Error> {
        match self.backend()?.rows.get(row_key(table, id))? {
            Some(bytes) => Ok(Some(StoredRow::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Scan all rows of a table in primary key order.
    pub fn scan_table(
        &self,
        table: &str,
    ) -> Result<impl Iterator<Item = Result<(u64, StoredRow), Error>>, Error> {
        let prefix = table_prefix(table);
        let prefix_len = prefix.len();
        let iter = self.backend()?.rows.scan_prefix(prefix);

        Ok(iter.map(move |result| {
            let (key, bytes) = result?;
            let id = decode_row_id(&key, prefix_len)
                .ok_or_else(|| Error::InvalidData("Malformed row key".into()))?;
            Ok((id, StoredRow::from_bytes(&bytes)?))
        }))
    }

    // ========== Stamp ==========

    /// Write the stamp row. Fails if the storage is already stamped.
    pub fn write_stamp(&self, stamp: &Stamp) -> Result<(), Error> {
        let bytes = stamp.to_bytes()?;
        self.backend()?
            .stamp
            .compare_and_swap(STAMP_KEY, None as Option<&[u8]>, Some(bytes))?
            .map_err(|_| Error::StampExists)?;
        tracing::info!(storage = %self.address, created_at = %stamp.utc_created_at, "Stamped storage");
        Ok(())
    }

    /// Read the stamp row.
    pub fn read_stamp(&self) -> Result<Option<Stamp>, Error> {
        match self.backend()?.stamp.get(STAMP_KEY)? {
            Some(bytes) => Ok(Some(Stamp::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.backend()?.db.flush()?;
        Ok(())
    }
}

pub(crate) fn decode_u64(bytes: &[u8]) -> Result<u64, Error> {
    let array: [u8; 8] = bytes
        .try_into()
        .map_err(|_| Error::InvalidData("Malformed sequence value".into()))?;
    Ok(u64::from_be_bytes(array))
}
