//! Engine bootstrap.
//!
//! # Responsibility
//! - Wire config, logging, cache, hydration and the sync worker into one
//!   running planner.
//!
//! # Invariants
//! - A sync worker runs only for synced sessions with a remote store.
//! - Remote hydration failures fall back to the local cache; startup never
//!   fails because the network is down.

use crate::config::{ConfigError, EngineConfig};
use crate::logging::{default_log_level, init_logging, LoggingError};
use crate::repo::snapshot_cache::{CacheError, SnapshotCache, SqliteSnapshotCache};
use crate::service::PlannerService;
use crate::store::{HydrationSource, SnapshotStore};
use crate::sync::{load_remote_snapshot, spawn_sync_worker, RemoteStore, SyncStats};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug)]
pub enum EngineError {
    Config(ConfigError),
    Cache(CacheError),
    Logging(LoggingError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Cache(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Cache(err) => Some(err),
            Self::Logging(err) => Some(err),
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<CacheError> for EngineError {
    fn from(value: CacheError) -> Self {
        Self::Cache(value)
    }
}

impl From<LoggingError> for EngineError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

/// Running planner: the service plus its optional sync worker.
pub struct PlannerEngine {
    service: PlannerService,
    worker: Option<JoinHandle<SyncStats>>,
}

impl PlannerEngine {
    /// Starts the engine. Must run inside a tokio runtime when a remote store
    /// is given.
    pub async fn start(
        config: &EngineConfig,
        remote: Option<Arc<dyn RemoteStore>>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        if let Some(log_dir) = &config.log_dir {
            let level = config.log_level.as_deref().unwrap_or(default_log_level());
            init_logging(level, log_dir)?;
        }

        let mut store = build_store(config)?;
        let account_id = config.account.account_id.as_str();
        let remote = remote.filter(|_| config.account.synced);

        let source = match &remote {
            Some(remote) => match load_remote_snapshot(remote.as_ref(), account_id).await {
                Ok(Some(snapshot)) => store.hydrate_from_remote(snapshot),
                Ok(None) => store.hydrate(),
                Err(err) => {
                    warn!("event=engine_start module=engine status=degraded reason=remote_hydrate error={err}");
                    store.hydrate()
                }
            },
            None => store.hydrate(),
        };

        let worker = remote.map(|remote| {
            let (handle, worker) = spawn_sync_worker(remote, account_id);
            store.attach_sync(handle);
            worker
        });

        info!(
            "event=engine_start module=engine status=ok source={} synced={}",
            source.as_str(),
            worker.is_some()
        );
        Ok(Self {
            service: PlannerService::new(store),
            worker,
        })
    }

    /// Starts a local-only engine without a runtime.
    pub fn open_local(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let mut store = build_store(config)?;
        let source: HydrationSource = store.hydrate();
        info!(
            "event=engine_start module=engine status=ok source={} synced=false",
            source.as_str()
        );
        Ok(Self {
            service: PlannerService::new(store),
            worker: None,
        })
    }

    pub fn service(&self) -> &PlannerService {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut PlannerService {
        &mut self.service
    }

    /// Drops the store, waits for queued sync work and returns worker stats.
    pub async fn shutdown(self) -> Option<SyncStats> {
        let Self { service, worker } = self;
        drop(service);
        let worker = worker?;
        match worker.await {
            Ok(stats) => Some(stats),
            Err(err) => {
                warn!("event=engine_shutdown module=engine status=error error={err}");
                None
            }
        }
    }
}

fn build_store(config: &EngineConfig) -> Result<SnapshotStore, EngineError> {
    let cache: Box<dyn SnapshotCache> = match &config.cache_path {
        Some(path) => Box::new(SqliteSnapshotCache::open(path, config.cache_namespace.as_str())?),
        None => Box::new(SqliteSnapshotCache::in_memory(config.cache_namespace.as_str())?),
    };
    Ok(SnapshotStore::new(cache).with_undo_window_ms(config.undo_window_ms))
}
