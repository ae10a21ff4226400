//! Background sync worker.
//!
//! # Responsibility
//! - Drain queued sync jobs in submission order and push their changes.
//!
//! # Invariants
//! - Submitting never blocks and never waits for the network.
//! - Tables without changes produce no remote call.
//! - Upserts run in `RemoteTable` order and deletions in reverse, so a
//!   child row never outlives or precedes its parent remotely.
//! - Failed batches are logged and dropped; nothing is retried and local
//!   state is never rolled back.
//! - The worker stops once every `SyncHandle` is dropped and the queue is
//!   empty.

use crate::model::snapshot::Snapshot;
use crate::sync::reconcile::{reconcile, ReconcilePlan};
use crate::sync::remote::{RemoteStore, RemoteTable};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Unit of background sync work.
#[derive(Debug, Clone)]
pub enum SyncJob {
    /// Diff two snapshots and push the result.
    Reconcile {
        previous: Arc<Snapshot>,
        next: Arc<Snapshot>,
    },
    /// Delete rows from a table outside the diff path.
    Purge {
        table: RemoteTable,
        ids: Vec<String>,
    },
}

/// Counters reported when the worker stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub jobs: usize,
    pub remote_calls: usize,
    pub rows_upserted: usize,
    pub ids_deleted: usize,
    pub failed_batches: usize,
}

/// Sending side of the job queue.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    sender: mpsc::UnboundedSender<SyncJob>,
}

impl SyncHandle {
    /// Queues `job`; returns `false` when the worker is gone.
    pub fn submit(&self, job: SyncJob) -> bool {
        if self.sender.send(job).is_err() {
            warn!("event=sync_submit module=sync status=dropped reason=worker_stopped");
            return false;
        }
        true
    }
}

/// Receiving side: owns the remote adapter and processes jobs one at a time.
pub struct SyncWorker {
    remote: Arc<dyn RemoteStore>,
    account_id: String,
    receiver: mpsc::UnboundedReceiver<SyncJob>,
    stats: SyncStats,
}

impl SyncWorker {
    pub fn new(remote: Arc<dyn RemoteStore>, account_id: impl Into<String>) -> (SyncHandle, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = Self {
            remote,
            account_id: account_id.into(),
            receiver,
            stats: SyncStats::default(),
        };
        (SyncHandle { sender }, worker)
    }

    /// Runs until every handle is dropped.
    pub async fn run(mut self) -> SyncStats {
        info!(
            "event=sync_worker module=sync status=start account_id={}",
            self.account_id
        );
        while let Some(job) = self.receiver.recv().await {
            self.process(job).await;
        }
        info!(
            "event=sync_worker module=sync status=stop jobs={} remote_calls={} failed_batches={}",
            self.stats.jobs, self.stats.remote_calls, self.stats.failed_batches
        );
        self.stats
    }

    async fn process(&mut self, job: SyncJob) {
        self.stats.jobs += 1;
        match job {
            SyncJob::Reconcile { previous, next } => {
                let plan = if Arc::ptr_eq(&previous, &next) {
                    ReconcilePlan::default()
                } else {
                    reconcile(&previous, &next, &self.account_id)
                };
                self.push_plan(plan).await;
            }
            SyncJob::Purge { table, ids } => {
                if !ids.is_empty() {
                    self.delete(table, ids).await;
                }
            }
        }
    }

    async fn push_plan(&mut self, plan: ReconcilePlan) {
        if plan.is_empty() {
            debug!("event=sync_push module=sync status=skipped reason=no_changes");
            return;
        }

        let started_at = Instant::now();
        // Upserts go parents first, deletions children first.
        let mut deletions = Vec::new();
        for (table, changes) in plan.into_tables() {
            if !changes.upserts.is_empty() {
                let count = changes.upserts.len();
                self.stats.remote_calls += 1;
                match self.remote.upsert_many(table, changes.upserts).await {
                    Ok(()) => self.stats.rows_upserted += count,
                    Err(err) => {
                        self.stats.failed_batches += 1;
                        warn!(
                            "event=sync_upsert module=sync status=error table={table} rows={count} error={err}"
                        );
                    }
                }
            }
            if !changes.deletions.is_empty() {
                deletions.push((table, changes.deletions));
            }
        }
        for (table, ids) in deletions.into_iter().rev() {
            self.delete(table, ids).await;
        }
        info!(
            "event=sync_push module=sync status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        );
    }

    async fn delete(&mut self, table: RemoteTable, ids: Vec<String>) {
        let count = ids.len();
        self.stats.remote_calls += 1;
        match self.remote.delete_many(table, ids).await {
            Ok(()) => self.stats.ids_deleted += count,
            Err(err) => {
                self.stats.failed_batches += 1;
                warn!("event=sync_delete module=sync status=error table={table} ids={count} error={err}");
            }
        }
    }
}

/// Spawns a [`SyncWorker`] on the current tokio runtime.
pub fn spawn_sync_worker(
    remote: Arc<dyn RemoteStore>,
    account_id: impl Into<String>,
) -> (SyncHandle, JoinHandle<SyncStats>) {
    let (handle, worker) = SyncWorker::new(remote, account_id);
    (handle, tokio::spawn(worker.run()))
}

#[cfg(test)]
mod tests {
    use super::{spawn_sync_worker, SyncJob};
    use crate::model::habit::HabitLog;
    use crate::model::snapshot::Snapshot;
    use crate::sync::remote::{InMemoryRemoteStore, RemoteOp, RemoteTable};
    use std::sync::Arc;

    #[tokio::test]
    async fn purge_deletes_and_worker_stops_when_handles_drop() {
        let remote = InMemoryRemoteStore::new();
        let (handle, join) = spawn_sync_worker(Arc::new(remote.clone()), "acct");

        let seeded = Arc::new(Snapshot::seeded());
        assert!(handle.submit(SyncJob::Reconcile {
            previous: Arc::new(Snapshot::default()),
            next: seeded.clone(),
        }));
        assert!(handle.submit(SyncJob::Purge {
            table: RemoteTable::Items,
            ids: vec![seeded.items[0].id.to_string()],
        }));
        drop(handle);

        let stats = join.await.unwrap();
        assert_eq!(stats.jobs, 2);
        assert_eq!(stats.failed_batches, 0);
        assert_eq!(remote.rows(RemoteTable::Items).len(), 2);
        assert_eq!(remote.rows(RemoteTable::Habits).len(), 2);
    }

    #[tokio::test]
    async fn child_rows_are_deleted_before_their_parents() {
        let remote = InMemoryRemoteStore::new();
        let (handle, join) = spawn_sync_worker(Arc::new(remote.clone()), "acct");

        let mut with_log = Snapshot::seeded();
        let habit_id = with_log.habits[0].id;
        let day = chrono::NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        with_log.habit_logs.push(HabitLog::new(habit_id, day, true));
        let with_log = Arc::new(with_log);
        let mut without_habit = (*with_log).clone();
        without_habit.habits.retain(|habit| habit.id != habit_id);
        without_habit.habit_logs.clear();

        handle.submit(SyncJob::Reconcile {
            previous: Arc::new(Snapshot::default()),
            next: with_log.clone(),
        });
        handle.submit(SyncJob::Reconcile {
            previous: with_log,
            next: Arc::new(without_habit),
        });
        drop(handle);
        assert_eq!(join.await.unwrap().failed_batches, 0);

        let upserts: Vec<RemoteTable> = remote
            .calls()
            .iter()
            .filter(|call| call.op == RemoteOp::Upsert)
            .map(|call| call.table)
            .collect();
        let position = |table| upserts.iter().position(|t| *t == table).unwrap();
        assert!(position(RemoteTable::Goals) < position(RemoteTable::Items));
        assert!(position(RemoteTable::Habits) < position(RemoteTable::HabitLogs));

        let deletes: Vec<RemoteTable> = remote
            .calls()
            .iter()
            .filter(|call| call.op == RemoteOp::Delete)
            .map(|call| call.table)
            .collect();
        assert_eq!(deletes, vec![RemoteTable::HabitLogs, RemoteTable::Habits]);
        assert!(remote.row(RemoteTable::Habits, &habit_id.to_string()).is_none());
    }
}
