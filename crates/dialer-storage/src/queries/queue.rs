// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue operations: admission reads, the guarded claim, and terminal writes.

use dialer_core::DialerError;
use dialer_core::types::{ClaimOutcome, QueueItem, QueueStatusCounts};
use rusqlite::{OptionalExtension, TransactionBehavior, params};

use crate::database::{Database, map_tr_err};
use crate::queries::parse_column;

const QUEUE_COLUMNS: &str = "id, client_id, lead_id, agent_id, call_id, status, priority, \
                             attempts, queued_at, started_at, completed_at, error_message";

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueItem> {
    Ok(QueueItem {
        id: row.get(0)?,
        client_id: row.get(1)?,
        lead_id: row.get(2)?,
        agent_id: row.get(3)?,
        call_id: row.get(4)?,
        status: parse_column(row, 5)?,
        priority: row.get(6)?,
        attempts: row.get(7)?,
        queued_at: row.get(8)?,
        started_at: row.get(9)?,
        completed_at: row.get(10)?,
        error_message: row.get(11)?,
    })
}

/// Count items currently `in_progress`.
pub async fn count_in_progress(db: &Database) -> Result<i64, DialerError> {
    db.connection()
        .call(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM queue_items WHERE status = 'in_progress'",
                [],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Up to `limit` pending items by priority (desc), then queue time (asc).
///
/// Insertion order breaks ties between items queued in the same millisecond.
pub async fn select_pending(db: &Database, limit: i64) -> Result<Vec<QueueItem>, DialerError> {
    if limit <= 0 {
        return Ok(Vec::new());
    }
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {QUEUE_COLUMNS} FROM queue_items
                 WHERE status = 'pending'
                 ORDER BY priority DESC, queued_at ASC, rowid ASC
                 LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], row_to_item)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Claim a pending item for dispatch.
///
/// Runs under `BEGIN IMMEDIATE` so the status check, the capacity count, and
/// the update see no interleaved writer. Bumps `attempts` on success.
pub async fn claim(
    db: &Database,
    id: &str,
    max_concurrent: i64,
    now: &str,
) -> Result<ClaimOutcome, DialerError> {
    let id = id.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let status: Option<String> = tx
                .query_row(
                    "SELECT status FROM queue_items WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;

            let outcome = if status.as_deref() != Some("pending") {
                ClaimOutcome::AlreadyClaimed
            } else {
                let active: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM queue_items WHERE status = 'in_progress'",
                    [],
                    |row| row.get(0),
                )?;
                if active >= max_concurrent {
                    ClaimOutcome::AtCapacity
                } else {
                    let updated = tx.execute(
                        "UPDATE queue_items
                         SET status = 'in_progress', started_at = ?2, attempts = attempts + 1
                         WHERE id = ?1 AND status = 'pending'",
                        params![id, now],
                    )?;
                    if updated == 0 {
                        ClaimOutcome::AlreadyClaimed
                    } else {
                        ClaimOutcome::Claimed
                    }
                }
            };

            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}

/// Terminate an item as `failed`.
pub async fn mark_failed(
    db: &Database,
    id: &str,
    error: &str,
    now: &str,
) -> Result<(), DialerError> {
    let id = id.to_string();
    let error = error.to_string();
    let now = now.to_string();
    let key = id.clone();
    let updated = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue_items
                 SET status = 'failed', error_message = ?2, completed_at = ?3
                 WHERE id = ?1",
                params![id, error, now],
            )
        })
        .await
        .map_err(map_tr_err)?;
    ensure_updated(updated, key)
}

/// Record the call record created for an item.
pub async fn link_call(db: &Database, id: &str, call_id: &str) -> Result<(), DialerError> {
    let id = id.to_string();
    let call_id = call_id.to_string();
    let key = id.clone();
    let updated = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue_items SET call_id = ?2 WHERE id = ?1",
                params![id, call_id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    ensure_updated(updated, key)
}

fn ensure_updated(updated: usize, id: String) -> Result<(), DialerError> {
    if updated == 0 {
        return Err(DialerError::NotFound {
            entity: "queue item",
            id,
        });
    }
    Ok(())
}

/// Insert a new queue item.
pub async fn enqueue(db: &Database, item: &QueueItem) -> Result<(), DialerError> {
    let item = item.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO queue_items ({QUEUE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                params![
                    item.id,
                    item.client_id,
                    item.lead_id,
                    item.agent_id,
                    item.call_id,
                    item.status.to_string(),
                    item.priority,
                    item.attempts,
                    item.queued_at,
                    item.started_at,
                    item.completed_at,
                    item.error_message,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch one item by id.
pub async fn get_queue_item(db: &Database, id: &str) -> Result<Option<QueueItem>, DialerError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {QUEUE_COLUMNS} FROM queue_items WHERE id = ?1"),
                params![id],
                row_to_item,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Item counts grouped by status.
pub async fn status_counts(db: &Database) -> Result<QueueStatusCounts, DialerError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT status, COUNT(*) FROM queue_items GROUP BY status")?;
            let mut counts = QueueStatusCounts::default();
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (status, n) = row?;
                match status.as_str() {
                    "pending" => counts.pending = n,
                    "in_progress" => counts.in_progress = n,
                    "completed" => counts.completed = n,
                    "failed" => counts.failed = n,
                    _ => {}
                }
            }
            Ok(counts)
        })
        .await
        .map_err(map_tr_err)
}

/// Move eligible `failed` items back to `pending`.
///
/// Only items that failed before `failed_before` and were claimed fewer than
/// `max_attempts` times qualify. The call link is cleared so the next claim
/// creates a fresh call record.
pub async fn requeue_failed(
    db: &Database,
    failed_before: &str,
    max_attempts: i64,
) -> Result<u64, DialerError> {
    let failed_before = failed_before.to_string();
    let moved = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue_items
                 SET status = 'pending', call_id = NULL, started_at = NULL,
                     completed_at = NULL, error_message = NULL
                 WHERE status = 'failed' AND completed_at < ?1 AND attempts < ?2",
                params![failed_before, max_attempts],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(moved as u64)
}

#[cfg(test)]
mod tests {
    use dialer_core::types::QueueStatus;

    use super::*;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn item(id: &str, priority: i64, queued_at: &str) -> QueueItem {
        QueueItem {
            id: id.to_string(),
            priority,
            queued_at: queued_at.to_string(),
            ..QueueItem::pending("client-1", format!("lead-{id}"), "agent-1", priority)
        }
    }

    const T0: &str = "2026-01-01T00:00:00.000Z";
    const T1: &str = "2026-01-01T00:00:01.000Z";
    const T2: &str = "2026-01-01T00:00:02.000Z";

    #[tokio::test]
    async fn select_orders_by_priority_then_age() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, &item("low-old", 0, T0)).await.unwrap();
        enqueue(&db, &item("high-new", 5, T2)).await.unwrap();
        enqueue(&db, &item("high-old", 5, T1)).await.unwrap();

        let ids: Vec<String> = select_pending(&db, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["high-old", "high-new", "low-old"]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn select_respects_limit_and_skips_non_pending() {
        let (db, _dir) = setup_db().await;
        for (i, ts) in [T0, T1, T2].iter().enumerate() {
            enqueue(&db, &item(&format!("q{i}"), 0, ts)).await.unwrap();
        }
        assert_eq!(claim(&db, "q0", 10, T2).await.unwrap(), ClaimOutcome::Claimed);

        let picked = select_pending(&db, 1).await.unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, "q1");

        assert!(select_pending(&db, 0).await.unwrap().is_empty());
        assert!(select_pending(&db, -3).await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_is_single_winner() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, &item("q1", 0, T0)).await.unwrap();

        assert_eq!(claim(&db, "q1", 10, T1).await.unwrap(), ClaimOutcome::Claimed);
        assert_eq!(
            claim(&db, "q1", 10, T1).await.unwrap(),
            ClaimOutcome::AlreadyClaimed
        );

        let stored = get_queue_item(&db, "q1").await.unwrap().unwrap();
        assert_eq!(stored.status, QueueStatus::InProgress);
        assert_eq!(stored.started_at.as_deref(), Some(T1));
        assert_eq!(stored.attempts, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_refuses_past_capacity() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, &item("q1", 0, T0)).await.unwrap();
        enqueue(&db, &item("q2", 0, T1)).await.unwrap();

        assert_eq!(claim(&db, "q1", 1, T2).await.unwrap(), ClaimOutcome::Claimed);
        assert_eq!(claim(&db, "q2", 1, T2).await.unwrap(), ClaimOutcome::AtCapacity);

        let untouched = get_queue_item(&db, "q2").await.unwrap().unwrap();
        assert_eq!(untouched.status, QueueStatus::Pending);
        assert_eq!(untouched.attempts, 0);
        assert_eq!(count_in_progress(&db).await.unwrap(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_of_missing_item_is_not_an_error() {
        let (db, _dir) = setup_db().await;
        assert_eq!(
            claim(&db, "ghost", 10, T0).await.unwrap(),
            ClaimOutcome::AlreadyClaimed
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_failed_and_link_call() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, &item("q1", 0, T0)).await.unwrap();
        claim(&db, "q1", 10, T1).await.unwrap();
        link_call(&db, "q1", "call-1").await.unwrap();
        mark_failed(&db, "q1", "provider error: boom", T2).await.unwrap();

        let stored = get_queue_item(&db, "q1").await.unwrap().unwrap();
        assert_eq!(stored.status, QueueStatus::Failed);
        assert_eq!(stored.call_id.as_deref(), Some("call-1"));
        assert_eq!(stored.error_message.as_deref(), Some("provider error: boom"));
        assert_eq!(stored.completed_at.as_deref(), Some(T2));

        let err = mark_failed(&db, "ghost", "x", T2).await.unwrap_err();
        assert!(matches!(err, DialerError::NotFound { .. }));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn status_counts_groups_by_status() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, &item("q1", 0, T0)).await.unwrap();
        enqueue(&db, &item("q2", 0, T0)).await.unwrap();
        enqueue(&db, &item("q3", 0, T0)).await.unwrap();
        claim(&db, "q1", 10, T1).await.unwrap();
        claim(&db, "q2", 10, T1).await.unwrap();
        mark_failed(&db, "q2", "boom", T1).await.unwrap();

        let counts = status_counts(&db).await.unwrap();
        assert_eq!(
            counts,
            QueueStatusCounts {
                pending: 1,
                in_progress: 1,
                completed: 0,
                failed: 1,
            }
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn requeue_honours_cooldown_and_attempts() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, &item("old", 0, T0)).await.unwrap();
        enqueue(&db, &item("recent", 0, T0)).await.unwrap();
        enqueue(&db, &item("exhausted", 0, T0)).await.unwrap();
        for id in ["old", "recent", "exhausted"] {
            claim(&db, id, 10, T0).await.unwrap();
        }
        mark_failed(&db, "old", "boom", T0).await.unwrap();
        mark_failed(&db, "recent", "boom", T2).await.unwrap();
        mark_failed(&db, "exhausted", "boom", T0).await.unwrap();
        db.connection()
            .call(|conn| {
                conn.execute(
                    "UPDATE queue_items SET attempts = 3 WHERE id = 'exhausted'",
                    [],
                )
            })
            .await
            .unwrap();

        let moved = requeue_failed(&db, T1, 3).await.unwrap();
        assert_eq!(moved, 1);

        let old = get_queue_item(&db, "old").await.unwrap().unwrap();
        assert_eq!(old.status, QueueStatus::Pending);
        assert!(old.error_message.is_none());
        assert!(old.started_at.is_none());
        assert_eq!(old.attempts, 1);
        assert_eq!(
            get_queue_item(&db, "recent").await.unwrap().unwrap().status,
            QueueStatus::Failed
        );
        assert_eq!(
            get_queue_item(&db, "exhausted").await.unwrap().unwrap().status,
            QueueStatus::Failed
        );
        db.close().await.unwrap();
    }
}
