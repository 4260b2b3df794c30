// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call record writes made by the dispatcher.

use dialer_core::DialerError;
use dialer_core::types::{CallRecord, CallStatus};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::queries::parse_column;

/// Insert a new call record.
pub async fn create_call_record(db: &Database, record: &CallRecord) -> Result<(), DialerError> {
    let metadata = serde_json::to_string(&record.metadata).map_err(|e| DialerError::Storage {
        source: Box::new(e),
    })?;
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO call_records
                 (id, agent_id, client_id, lead_id, status, external_call_id, started_at,
                  metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    record.agent_id,
                    record.client_id,
                    record.lead_id,
                    record.status.to_string(),
                    record.external_call_id,
                    record.started_at,
                    metadata,
                    record.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Store the provider handle and move an `initiating` record to `queued`.
///
/// If the lifecycle subsystem has already advanced the record (an early
/// webhook), its status is kept and only the handle is filled in.
pub async fn mark_call_queued(
    db: &Database,
    id: &str,
    external_call_id: Option<&str>,
    now: &str,
) -> Result<(), DialerError> {
    let id = id.to_string();
    let external_call_id = external_call_id.map(str::to_string);
    let now = now.to_string();
    let key = id.clone();
    let updated = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE call_records
                 SET external_call_id = COALESCE(?2, external_call_id),
                     started_at = COALESCE(started_at, ?3),
                     status = CASE WHEN status = ?4 THEN ?5 ELSE status END,
                     updated_at = ?3
                 WHERE id = ?1",
                params![
                    id,
                    external_call_id,
                    now,
                    CallStatus::Initiating.to_string(),
                    CallStatus::Queued.to_string(),
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;

    if updated == 0 {
        return Err(DialerError::NotFound {
            entity: "call record",
            id: key,
        });
    }
    Ok(())
}

/// Fetch a call record by id.
pub async fn get_call_record(db: &Database, id: &str) -> Result<Option<CallRecord>, DialerError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, agent_id, client_id, lead_id, status, external_call_id,
                        started_at, metadata, created_at
                 FROM call_records WHERE id = ?1",
                params![id],
                |row| {
                    let metadata: String = row.get(7)?;
                    let metadata = serde_json::from_str(&metadata).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            7,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?;
                    Ok(CallRecord {
                        id: row.get(0)?,
                        agent_id: row.get(1)?,
                        client_id: row.get(2)?,
                        lead_id: row.get(3)?,
                        status: parse_column(row, 4)?,
                        external_call_id: row.get(5)?,
                        started_at: row.get(6)?,
                        metadata,
                        created_at: row.get(8)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use dialer_core::types::QueueItem;

    use super::*;

    #[tokio::test]
    async fn initiating_record_round_trips_with_metadata() {
        let db = Database::open_in_memory().await.unwrap();
        let item = QueueItem::pending("client-1", "lead-1", "agent-1", 0);
        let record = CallRecord::initiating(&item);
        create_call_record(&db, &record).await.unwrap();

        let stored = get_call_record(&db, &record.id).await.unwrap().unwrap();
        assert_eq!(stored, record);
        assert_eq!(stored.metadata["queueItemId"], item.id.as_str());
    }

    #[tokio::test]
    async fn mark_queued_sets_handle_and_status() {
        let db = Database::open_in_memory().await.unwrap();
        let item = QueueItem::pending("client-1", "lead-1", "agent-1", 0);
        let record = CallRecord::initiating(&item);
        create_call_record(&db, &record).await.unwrap();

        mark_call_queued(&db, &record.id, Some("exec-1"), "2026-01-01T00:00:00.000Z")
            .await
            .unwrap();

        let stored = get_call_record(&db, &record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CallStatus::Queued);
        assert_eq!(stored.external_call_id.as_deref(), Some("exec-1"));
        assert_eq!(stored.started_at.as_deref(), Some("2026-01-01T00:00:00.000Z"));
    }

    #[tokio::test]
    async fn mark_queued_without_handle_leaves_it_null() {
        let db = Database::open_in_memory().await.unwrap();
        let record = CallRecord::initiating(&QueueItem::pending("c", "l", "a", 0));
        create_call_record(&db, &record).await.unwrap();

        mark_call_queued(&db, &record.id, None, "2026-01-01T00:00:00.000Z")
            .await
            .unwrap();

        let stored = get_call_record(&db, &record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CallStatus::Queued);
        assert!(stored.external_call_id.is_none());
    }

    #[tokio::test]
    async fn mark_queued_keeps_advanced_status() {
        let db = Database::open_in_memory().await.unwrap();
        let record = CallRecord::initiating(&QueueItem::pending("c", "l", "a", 0));
        create_call_record(&db, &record).await.unwrap();
        let id = record.id.clone();
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE call_records SET status = 'ringing' WHERE id = ?1",
                    params![id],
                )
            })
            .await
            .unwrap();

        mark_call_queued(&db, &record.id, Some("exec-1"), "2026-01-01T00:00:00.000Z")
            .await
            .unwrap();

        let stored = get_call_record(&db, &record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CallStatus::Ringing);
        assert_eq!(stored.external_call_id.as_deref(), Some("exec-1"));
    }

    #[tokio::test]
    async fn mark_queued_on_missing_record_errors() {
        let db = Database::open_in_memory().await.unwrap();
        let err = mark_call_queued(&db, "ghost", None, "2026-01-01T00:00:00.000Z")
            .await
            .unwrap_err();
        assert!(matches!(err, DialerError::NotFound { .. }));
    }
}
