// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use dialer_config::model::StorageConfig;
use dialer_core::types::{Agent, CallRecord, ClaimOutcome, Lead, QueueItem, QueueStatusCounts};
use dialer_core::{
    AdapterType, AgentStore, CallRecordStore, DialerError, HealthStatus, LeadStore,
    PluginAdapter, QueueStore, StorageAdapter,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database. The adapter counts as initialized.
    pub fn from_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    pub fn db(&self) -> Result<&Database, DialerError> {
        self.db.get().ok_or_else(|| DialerError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(db: &Database) -> Result<(), DialerError> {
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, DialerError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("storage not initialized".into()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DialerError> {
        if let Some(db) = self.db.get() {
            Self::checkpoint(db).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), DialerError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| DialerError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), DialerError> {
        let db = self.db()?;
        Self::checkpoint(db).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl QueueStore for SqliteStorage {
    async fn count_in_progress(&self) -> Result<i64, DialerError> {
        queries::queue::count_in_progress(self.db()?).await
    }

    async fn select_pending(&self, limit: i64) -> Result<Vec<QueueItem>, DialerError> {
        queries::queue::select_pending(self.db()?, limit).await
    }

    async fn claim(
        &self,
        id: &str,
        max_concurrent: i64,
        now: &str,
    ) -> Result<ClaimOutcome, DialerError> {
        queries::queue::claim(self.db()?, id, max_concurrent, now).await
    }

    async fn mark_failed(&self, id: &str, error: &str, now: &str) -> Result<(), DialerError> {
        queries::queue::mark_failed(self.db()?, id, error, now).await
    }

    async fn link_call(&self, id: &str, call_id: &str) -> Result<(), DialerError> {
        queries::queue::link_call(self.db()?, id, call_id).await
    }

    async fn enqueue(&self, item: &QueueItem) -> Result<(), DialerError> {
        queries::queue::enqueue(self.db()?, item).await
    }

    async fn get_queue_item(&self, id: &str) -> Result<Option<QueueItem>, DialerError> {
        queries::queue::get_queue_item(self.db()?, id).await
    }

    async fn status_counts(&self) -> Result<QueueStatusCounts, DialerError> {
        queries::queue::status_counts(self.db()?).await
    }

    async fn requeue_failed(
        &self,
        failed_before: &str,
        max_attempts: i64,
    ) -> Result<u64, DialerError> {
        queries::queue::requeue_failed(self.db()?, failed_before, max_attempts).await
    }
}

#[async_trait]
impl LeadStore for SqliteStorage {
    async fn get_lead(&self, id: &str) -> Result<Option<Lead>, DialerError> {
        queries::leads::get_lead(self.db()?, id).await
    }

    async fn record_lead_contact(&self, id: &str, now: &str) -> Result<bool, DialerError> {
        queries::leads::record_lead_contact(self.db()?, id, now).await
    }

    async fn insert_lead(&self, lead: &Lead) -> Result<(), DialerError> {
        queries::leads::insert_lead(self.db()?, lead).await
    }
}

#[async_trait]
impl AgentStore for SqliteStorage {
    async fn get_agent(&self, id: &str) -> Result<Option<Agent>, DialerError> {
        queries::agents::get_agent(self.db()?, id).await
    }

    async fn insert_agent(&self, agent: &Agent) -> Result<(), DialerError> {
        queries::agents::insert_agent(self.db()?, agent).await
    }
}

#[async_trait]
impl CallRecordStore for SqliteStorage {
    async fn create_call_record(&self, record: &CallRecord) -> Result<(), DialerError> {
        queries::calls::create_call_record(self.db()?, record).await
    }

    async fn mark_call_queued(
        &self,
        id: &str,
        external_call_id: Option<&str>,
        now: &str,
    ) -> Result<(), DialerError> {
        queries::calls::mark_call_queued(self.db()?, id, external_call_id, now).await
    }

    async fn get_call_record(&self, id: &str) -> Result<Option<CallRecord>, DialerError> {
        queries::calls::get_call_record(self.db()?, id).await
    }
}
