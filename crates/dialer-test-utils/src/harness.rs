// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for dispatcher integration tests.
//!
//! `TestHarness` opens a temp SQLite database, wraps it in an
//! [`InstrumentedStorage`], and pairs it with a [`MockCallProvider`].
//! Seeding goes straight to SQLite so it never shows up in the counters.

use std::sync::Arc;

use dialer_config::model::StorageConfig;
use dialer_core::types::{
    Agent, ClaimOutcome, Lead, QueueItem, format_timestamp, lead_stage, now_timestamp,
};
use dialer_core::{
    AgentStore, CallProvider, DialerError, LeadStore, QueueStore, StorageAdapter,
};
use dialer_storage::SqliteStorage;

use crate::instrumented::InstrumentedStorage;
use crate::mock_provider::MockCallProvider;

/// A temp database, an instrumented view of it, and a mock provider.
pub struct TestHarness {
    sqlite: Arc<SqliteStorage>,
    storage: Arc<InstrumentedStorage>,
    provider: Arc<MockCallProvider>,
    db_path: String,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Harness with a default (always accepting) mock provider.
    pub async fn new() -> Result<Self, DialerError> {
        Self::with_provider(MockCallProvider::new()).await
    }

    pub async fn with_provider(provider: MockCallProvider) -> Result<Self, DialerError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| DialerError::Storage { source: e.into() })?;
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();

        let sqlite = SqliteStorage::new(StorageConfig {
            database_path: db_path.clone(),
            wal_mode: true,
        });
        sqlite.initialize().await?;
        let sqlite = Arc::new(sqlite);
        let storage = Arc::new(InstrumentedStorage::new(sqlite.clone()));

        Ok(Self {
            sqlite,
            storage,
            provider: Arc::new(provider),
            db_path,
            _temp_dir: temp_dir,
        })
    }

    /// The instrumented store, as the dispatcher sees it.
    pub fn storage(&self) -> Arc<dyn StorageAdapter> {
        self.storage.clone()
    }

    /// Counters and failure injection for the instrumented store.
    pub fn instrumented(&self) -> &InstrumentedStorage {
        &self.storage
    }

    /// The raw SQLite adapter, bypassing instrumentation.
    pub fn sqlite(&self) -> &SqliteStorage {
        &self.sqlite
    }

    pub fn provider(&self) -> Arc<dyn CallProvider> {
        self.provider.clone()
    }

    pub fn mock_provider(&self) -> &MockCallProvider {
        &self.provider
    }

    /// Path of the temp database file.
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    pub async fn seed_agent(&self, name: &str) -> Result<Agent, DialerError> {
        let agent = Agent {
            id: uuid::Uuid::new_v4().to_string(),
            external_agent_id: format!("ext-{name}"),
            name: name.to_string(),
        };
        self.sqlite.insert_agent(&agent).await?;
        Ok(agent)
    }

    pub async fn seed_lead(&self, name: &str, stage: &str) -> Result<Lead, DialerError> {
        let lead = Lead {
            id: uuid::Uuid::new_v4().to_string(),
            client_id: "client-1".to_string(),
            phone_number: "+15550100".to_string(),
            name: name.to_string(),
            stage: stage.to_string(),
            last_call_at: None,
        };
        self.sqlite.insert_lead(&lead).await?;
        Ok(lead)
    }

    /// Enqueue a pending item for `lead` on `agent`, queued now.
    pub async fn enqueue(
        &self,
        lead: &Lead,
        agent: &Agent,
        priority: i64,
    ) -> Result<QueueItem, DialerError> {
        self.enqueue_at(lead, agent, priority, &now_timestamp()).await
    }

    /// Enqueue a pending item with an explicit `queued_at`.
    pub async fn enqueue_at(
        &self,
        lead: &Lead,
        agent: &Agent,
        priority: i64,
        queued_at: &str,
    ) -> Result<QueueItem, DialerError> {
        let item = QueueItem {
            queued_at: queued_at.to_string(),
            ..QueueItem::pending(&lead.client_id, &lead.id, &agent.id, priority)
        };
        self.sqlite.enqueue(&item).await?;
        Ok(item)
    }

    /// Put `count` items into `in_progress`, as if their calls were still live.
    pub async fn seed_in_progress(&self, count: usize) -> Result<Vec<QueueItem>, DialerError> {
        let agent = self.seed_agent("busy").await?;
        let mut items = Vec::with_capacity(count);
        for i in 0..count {
            let lead = self.seed_lead(&format!("busy-{i}"), lead_stage::CONTACTED).await?;
            let item = self.enqueue(&lead, &agent, 0).await?;
            let outcome = self
                .sqlite
                .claim(&item.id, i64::MAX, &now_timestamp())
                .await?;
            if outcome != ClaimOutcome::Claimed {
                return Err(DialerError::Internal(format!(
                    "seed claim for {} returned {outcome:?}",
                    item.id
                )));
            }
            items.push(item);
        }
        Ok(items)
    }

    /// Remove a lead row, leaving any queue items that reference it.
    pub async fn delete_lead(&self, lead_id: &str) -> Result<(), DialerError> {
        let lead_id = lead_id.to_string();
        self.sqlite
            .db()?
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute("DELETE FROM leads WHERE id = ?1", [lead_id])?;
                Ok(())
            })
            .await
            .map_err(|e| DialerError::Storage {
                source: Box::new(e),
            })
    }

    /// Rewrite an item's `completed_at`, e.g. to age a failure past a cooldown.
    pub async fn set_completed_at(
        &self,
        item_id: &str,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), DialerError> {
        let item_id = item_id.to_string();
        let at = format_timestamp(at);
        self.sqlite
            .db()?
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE queue_items SET completed_at = ?2 WHERE id = ?1",
                    [item_id, at],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| DialerError::Storage {
                source: Box::new(e),
            })
    }

    /// Current stored state of a queue item.
    pub async fn queue_item(&self, id: &str) -> Result<QueueItem, DialerError> {
        self.sqlite
            .get_queue_item(id)
            .await?
            .ok_or_else(|| DialerError::NotFound {
                entity: "queue item",
                id: id.to_string(),
            })
    }

    pub async fn lead(&self, id: &str) -> Result<Lead, DialerError> {
        self.sqlite
            .get_lead(id)
            .await?
            .ok_or_else(|| DialerError::NotFound {
                entity: "lead",
                id: id.to_string(),
            })
    }

    pub async fn in_progress(&self) -> Result<i64, DialerError> {
        self.sqlite.count_in_progress().await
    }
}
