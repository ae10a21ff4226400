//! Remote store boundary.
//!
//! # Responsibility
//! - Define the per-table contract the sync worker pushes to.
//! - Provide an in-process adapter for tests and local tooling.
//!
//! # Invariants
//! - Every call is scoped to one table; rows are flat JSON objects keyed by
//!   `id` and carrying `user_id`.
//! - Adapters never assign ids; the writer already did.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

/// One flat remote record.
pub type RemoteRow = Map<String, Value>;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Remote tables mirrored from snapshot collections.
///
/// Declared parents first: a table only references tables declared before
/// it (tasks -> goals, habit_logs -> habits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RemoteTable {
    Profiles,
    Goals,
    Items,
    Habits,
    HabitLogs,
    Reflections,
    LifeAreaScores,
    Messages,
}

impl RemoteTable {
    pub const ALL: [RemoteTable; 8] = [
        Self::Profiles,
        Self::Goals,
        Self::Items,
        Self::Habits,
        Self::HabitLogs,
        Self::Reflections,
        Self::LifeAreaScores,
        Self::Messages,
    ];

    /// Remote table name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Profiles => "profiles",
            Self::Items => "tasks",
            Self::Habits => "habits",
            Self::HabitLogs => "habit_logs",
            Self::Goals => "goals",
            Self::Reflections => "reflections",
            Self::LifeAreaScores => "life_area_scores",
            Self::Messages => "chat_messages",
        }
    }

    /// Returns whether rows are only ever inserted (never re-upserted).
    pub fn is_append_only(self) -> bool {
        matches!(
            self,
            Self::Reflections | Self::LifeAreaScores | Self::Messages
        )
    }
}

impl Display for RemoteTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote adapter failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network or service unavailable.
    Transport(String),
    /// Remote rejected the batch (constraint, permission, ...).
    Rejected { table: RemoteTable, message: String },
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "remote transport failed: {message}"),
            Self::Rejected { table, message } => {
                write!(f, "remote rejected batch for `{table}`: {message}")
            }
        }
    }
}

impl Error for RemoteError {}

/// Per-account remote persistence.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Inserts or fully replaces rows by `id`.
    async fn upsert_many(&self, table: RemoteTable, rows: Vec<RemoteRow>) -> RemoteResult<()>;
    /// Deletes rows whose `id` is in `ids`.
    async fn delete_many(&self, table: RemoteTable, ids: Vec<String>) -> RemoteResult<()>;
    /// Returns every row owned by `user_id`.
    async fn select_all(&self, table: RemoteTable, user_id: &str) -> RemoteResult<Vec<RemoteRow>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOp {
    Upsert,
    Delete,
    Select,
}

/// One recorded adapter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub table: RemoteTable,
    pub op: RemoteOp,
    pub size: usize,
}

#[derive(Debug, Default)]
struct RemoteState {
    tables: BTreeMap<RemoteTable, BTreeMap<String, RemoteRow>>,
    calls: Vec<RemoteCall>,
    failing: BTreeSet<RemoteTable>,
}

/// In-process remote store. Clones share state.
///
/// Records every call and can be told to fail writes for a table, which is
/// how sync failure paths are exercised.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRemoteStore {
    state: Arc<Mutex<RemoteState>>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut RemoteState) -> R) -> R {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Makes subsequent writes to `table` fail with a transport error.
    pub fn fail_writes(&self, table: RemoteTable) {
        self.with_state(|state| {
            state.failing.insert(table);
        });
    }

    pub fn restore_writes(&self, table: RemoteTable) {
        self.with_state(|state| {
            state.failing.remove(&table);
        });
    }

    /// Rows currently stored for `table`, ordered by id.
    pub fn rows(&self, table: RemoteTable) -> Vec<RemoteRow> {
        self.with_state(|state| {
            state
                .tables
                .get(&table)
                .map(|rows| rows.values().cloned().collect())
                .unwrap_or_default()
        })
    }

    pub fn row(&self, table: RemoteTable, id: &str) -> Option<RemoteRow> {
        self.with_state(|state| state.tables.get(&table).and_then(|rows| rows.get(id).cloned()))
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.with_state(|state| state.calls.clone())
    }

    /// Number of write calls (upserts + deletes) received so far.
    pub fn write_count(&self) -> usize {
        self.with_state(|state| {
            state
                .calls
                .iter()
                .filter(|call| call.op != RemoteOp::Select)
                .count()
        })
    }
}

fn row_id(row: &RemoteRow) -> Option<String> {
    row.get("id").and_then(Value::as_str).map(str::to_owned)
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn upsert_many(&self, table: RemoteTable, rows: Vec<RemoteRow>) -> RemoteResult<()> {
        self.with_state(|state| {
            state.calls.push(RemoteCall {
                table,
                op: RemoteOp::Upsert,
                size: rows.len(),
            });
            if state.failing.contains(&table) {
                return Err(RemoteError::Transport(format!(
                    "simulated outage for `{table}`"
                )));
            }
            let stored = state.tables.entry(table).or_default();
            for row in rows {
                let id = row_id(&row).ok_or_else(|| RemoteError::Rejected {
                    table,
                    message: "row is missing string `id`".to_string(),
                })?;
                stored.insert(id, row);
            }
            Ok(())
        })
    }

    async fn delete_many(&self, table: RemoteTable, ids: Vec<String>) -> RemoteResult<()> {
        self.with_state(|state| {
            state.calls.push(RemoteCall {
                table,
                op: RemoteOp::Delete,
                size: ids.len(),
            });
            if state.failing.contains(&table) {
                return Err(RemoteError::Transport(format!(
                    "simulated outage for `{table}`"
                )));
            }
            if let Some(stored) = state.tables.get_mut(&table) {
                for id in &ids {
                    stored.remove(id);
                }
            }
            Ok(())
        })
    }

    async fn select_all(&self, table: RemoteTable, user_id: &str) -> RemoteResult<Vec<RemoteRow>> {
        self.with_state(|state| {
            let rows: Vec<RemoteRow> = state
                .tables
                .get(&table)
                .map(|rows| {
                    rows.values()
                        .filter(|row| row.get("user_id").and_then(Value::as_str) == Some(user_id))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            state.calls.push(RemoteCall {
                table,
                op: RemoteOp::Select,
                size: rows.len(),
            });
            Ok(rows)
        })
    }
}
