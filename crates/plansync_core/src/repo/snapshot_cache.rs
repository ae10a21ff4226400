//! Durable local snapshot cache.
//!
//! # Responsibility
//! - Persist one serialized snapshot blob under a fixed namespace.
//! - Encode/decode the versioned cache envelope.
//!
//! # Invariants
//! - Exactly one row per namespace; writes overwrite the previous blob.
//! - Decoding never guesses: unknown envelope versions and malformed JSON are
//!   reported so the store can fall back to defaults.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::snapshot::Snapshot;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Default namespace key for the cached snapshot blob.
pub const DEFAULT_CACHE_NAMESPACE: &str = "plansync.snapshot.v1";
/// Envelope version written by this binary.
pub const CACHE_FORMAT_VERSION: u32 = 1;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug)]
pub enum CacheError {
    Db(DbError),
    Encode(serde_json::Error),
    Malformed(serde_json::Error),
    UnsupportedVersion(u32),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode snapshot: {err}"),
            Self::Malformed(err) => write!(f, "cached snapshot is malformed: {err}"),
            Self::UnsupportedVersion(version) => write!(
                f,
                "cached snapshot version {version} is not supported (expected {CACHE_FORMAT_VERSION})"
            ),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) | Self::Malformed(err) => Some(err),
            Self::UnsupportedVersion(_) => None,
        }
    }
}

impl From<DbError> for CacheError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    snapshot: &'a Snapshot,
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    version: u32,
}

#[derive(Deserialize)]
struct Envelope {
    snapshot: Snapshot,
}

/// Serializes a snapshot into the versioned cache envelope.
pub fn encode_snapshot(snapshot: &Snapshot) -> CacheResult<String> {
    serde_json::to_string(&EnvelopeRef {
        version: CACHE_FORMAT_VERSION,
        snapshot,
    })
    .map_err(CacheError::Encode)
}

/// Parses a cache envelope written by [`encode_snapshot`].
pub fn decode_snapshot(payload: &str) -> CacheResult<Snapshot> {
    let header: EnvelopeHeader = serde_json::from_str(payload).map_err(CacheError::Malformed)?;
    if header.version != CACHE_FORMAT_VERSION {
        return Err(CacheError::UnsupportedVersion(header.version));
    }
    let envelope: Envelope = serde_json::from_str(payload).map_err(CacheError::Malformed)?;
    Ok(envelope.snapshot)
}

/// Storage for the single serialized snapshot blob.
pub trait SnapshotCache: Send {
    /// Returns the raw blob, or `None` when nothing was ever written.
    fn load(&self) -> CacheResult<Option<String>>;
    /// Overwrites the blob.
    fn save(&self, payload: &str) -> CacheResult<()>;
    /// Removes the blob.
    fn clear(&self) -> CacheResult<()>;
}

/// SQLite-backed cache; one row in `snapshot_cache` per namespace.
pub struct SqliteSnapshotCache {
    conn: Connection,
    namespace: String,
}

impl SqliteSnapshotCache {
    /// Opens (or creates) the cache database at `path`.
    pub fn open(path: impl AsRef<Path>, namespace: impl Into<String>) -> CacheResult<Self> {
        Ok(Self::from_connection(open_db(path)?, namespace))
    }

    pub fn in_memory(namespace: impl Into<String>) -> CacheResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?, namespace))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection, namespace: impl Into<String>) -> Self {
        Self {
            conn,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl SnapshotCache for SqliteSnapshotCache {
    fn load(&self) -> CacheResult<Option<String>> {
        let payload = self
            .conn
            .query_row(
                "SELECT payload FROM snapshot_cache WHERE namespace = ?1;",
                [self.namespace.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn save(&self, payload: &str) -> CacheResult<()> {
        self.conn.execute(
            "INSERT INTO snapshot_cache (namespace, payload, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(namespace) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at;",
            params![self.namespace.as_str(), payload],
        )?;
        Ok(())
    }

    fn clear(&self) -> CacheResult<()> {
        self.conn.execute(
            "DELETE FROM snapshot_cache WHERE namespace = ?1;",
            [self.namespace.as_str()],
        )?;
        Ok(())
    }
}

/// Process-local cache; clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotCache {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemorySnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates the slot, e.g. with a corrupt blob in tests.
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(payload.into()))),
        }
    }

    /// Returns the current raw blob.
    pub fn contents(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SnapshotCache for MemorySnapshotCache {
    fn load(&self) -> CacheResult<Option<String>> {
        Ok(self.contents())
    }

    fn save(&self, payload: &str) -> CacheResult<()> {
        *self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(payload.to_string());
        Ok(())
    }

    fn clear(&self) -> CacheResult<()> {
        *self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}
