//! # RocksDB Command Store
//!
//! Durable `CommandStore`. Rows are bincode-encoded under
//! `cmd:` + big-endian id, so a prefix scan returns them in insertion order.
//! The id sequence is persisted under `meta:next_id` in the same write batch
//! as the row it allocates.

use crate::domain::entities::{CommandId, CommandStatus, QueueStats, QueuedCommand};
use crate::domain::errors::PersistenceError;
use crate::ports::outbound::CommandStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, WriteOptions, DB};

const ROW_PREFIX: &[u8] = b"cmd:";
const NEXT_ID_KEY: &[u8] = b"meta:next_id";

/// RocksDB configuration.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: String,
    /// Write buffer size in bytes (default: 8MB)
    pub write_buffer_size: usize,
    /// Enable fsync after each write (default: true for durability)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/command-queue".to_string(),
            write_buffer_size: 8 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Create config for testing (smaller buffers, no sync)
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            write_buffer_size: 1024 * 1024,
            sync_writes: false,
        }
    }
}

pub struct RocksDbCommandStore {
    db: DB,
    config: RocksDbConfig,
    /// Serializes id allocation and every check-then-write path, so a row
    /// deleted by a purge cannot be written back by a late update.
    writes: Mutex<()>,
}

fn row_key(id: CommandId) -> Vec<u8> {
    let mut key = Vec::with_capacity(ROW_PREFIX.len() + 8);
    key.extend_from_slice(ROW_PREFIX);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

fn io_err(context: &str, e: rocksdb::Error) -> PersistenceError {
    PersistenceError::Io(format!("RocksDB {context} failed: {e}"))
}

impl RocksDbCommandStore {
    /// Open or create the database.
    pub fn open(config: RocksDbConfig) -> Result<Self, PersistenceError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let db = DB::open(&opts, &config.path).map_err(|e| io_err("open", e))?;
        Ok(Self {
            db,
            config,
            writes: Mutex::new(()),
        })
    }

    fn write_opts(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.config.sync_writes);
        opts
    }

    fn encode(row: &QueuedCommand) -> Result<Vec<u8>, PersistenceError> {
        bincode::serialize(row).map_err(|e| PersistenceError::Encoding(e.to_string()))
    }

    fn decode(bytes: &[u8]) -> Result<QueuedCommand, PersistenceError> {
        bincode::deserialize(bytes).map_err(|e| PersistenceError::Encoding(e.to_string()))
    }

    fn next_id(&self) -> Result<CommandId, PersistenceError> {
        let stored = self.db.get(NEXT_ID_KEY).map_err(|e| io_err("get", e))?;
        match stored {
            None => Ok(1),
            Some(bytes) => {
                let array = <[u8; 8]>::try_from(bytes.as_slice())
                    .map_err(|_| PersistenceError::Encoding("corrupt id sequence".into()))?;
                Ok(u64::from_be_bytes(array))
            }
        }
    }

    /// Every row in insertion order.
    fn scan(&self) -> Result<Vec<QueuedCommand>, PersistenceError> {
        let mut rows = Vec::new();
        for item in self.db.iterator(IteratorMode::From(ROW_PREFIX, Direction::Forward)) {
            let (key, value) = item.map_err(|e| io_err("scan", e))?;
            if !key.starts_with(ROW_PREFIX) {
                break;
            }
            rows.push(Self::decode(&value)?);
        }
        Ok(rows)
    }

    fn delete_where<F>(&self, predicate: F) -> Result<usize, PersistenceError>
    where
        F: Fn(&QueuedCommand) -> bool,
    {
        let _writes = self.writes.lock();
        let mut batch = WriteBatch::default();
        let mut removed = 0;
        for row in self.scan()? {
            if predicate(&row) {
                batch.delete(row_key(row.id));
                removed += 1;
            }
        }
        if removed > 0 {
            self.db
                .write_opt(batch, &self.write_opts())
                .map_err(|e| io_err("batch delete", e))?;
        }
        Ok(removed)
    }
}

#[async_trait]
impl CommandStore for RocksDbCommandStore {
    async fn insert(&self, mut row: QueuedCommand) -> Result<CommandId, PersistenceError> {
        let _writes = self.writes.lock();
        let id = self.next_id()?;
        row.id = id;

        let mut batch = WriteBatch::default();
        batch.put(row_key(id), Self::encode(&row)?);
        batch.put(NEXT_ID_KEY, (id + 1).to_be_bytes());
        self.db
            .write_opt(batch, &self.write_opts())
            .map_err(|e| io_err("insert", e))?;
        Ok(id)
    }

    async fn update(&self, row: &QueuedCommand) -> Result<(), PersistenceError> {
        let key = row_key(row.id);
        let _writes = self.writes.lock();
        if self.db.get_pinned(&key).map_err(|e| io_err("get", e))?.is_none() {
            return Err(PersistenceError::NotFound(row.id));
        }
        self.db
            .put_opt(&key, Self::encode(row)?, &self.write_opts())
            .map_err(|e| io_err("put", e))
    }

    async fn delete_by_id(&self, id: CommandId) -> Result<bool, PersistenceError> {
        let key = row_key(id);
        let _writes = self.writes.lock();
        if self.db.get_pinned(&key).map_err(|e| io_err("get", e))?.is_none() {
            return Ok(false);
        }
        self.db
            .delete_opt(&key, &self.write_opts())
            .map_err(|e| io_err("delete", e))?;
        Ok(true)
    }

    async fn get(&self, id: CommandId) -> Result<Option<QueuedCommand>, PersistenceError> {
        self.db
            .get(row_key(id))
            .map_err(|e| io_err("get", e))?
            .map(|bytes| Self::decode(&bytes))
            .transpose()
    }

    async fn get_commands_by_status(
        &self,
        status: CommandStatus,
    ) -> Result<Vec<QueuedCommand>, PersistenceError> {
        Ok(self.scan()?.into_iter().filter(|row| row.status == status).collect())
    }

    async fn get_recent_commands(&self, limit: usize) -> Result<Vec<QueuedCommand>, PersistenceError> {
        let mut rows = self.scan()?;
        rows.reverse();
        rows.truncate(limit);
        Ok(rows)
    }

    async fn count_by_status(&self) -> Result<QueueStats, PersistenceError> {
        Ok(QueueStats::from_statuses(self.scan()?.into_iter().map(|row| row.status)))
    }

    async fn delete_old_commands(&self, cutoff_ms: u64) -> Result<usize, PersistenceError> {
        self.delete_where(|row| row.timestamp < cutoff_ms)
    }

    async fn delete_pending(&self) -> Result<usize, PersistenceError> {
        self.delete_where(|row| row.status == CommandStatus::Pending)
    }
}
