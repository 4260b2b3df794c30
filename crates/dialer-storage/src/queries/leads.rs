// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead reads and the dispatcher's contact stamp.

use dialer_core::DialerError;
use dialer_core::types::{Lead, lead_stage};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Fetch a lead by id.
pub async fn get_lead(db: &Database, id: &str) -> Result<Option<Lead>, DialerError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, client_id, phone_number, name, stage, last_call_at
                 FROM leads WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Lead {
                        id: row.get(0)?,
                        client_id: row.get(1)?,
                        phone_number: row.get(2)?,
                        name: row.get(3)?,
                        stage: row.get(4)?,
                        last_call_at: row.get(5)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Stamp `last_call_at` and advance `new` leads to `contacted`.
///
/// The stage update only matches rows still in `new`, so a stage set by
/// someone else in the meantime survives. Returns whether the stage moved.
pub async fn record_lead_contact(db: &Database, id: &str, now: &str) -> Result<bool, DialerError> {
    let id = id.to_string();
    let now = now.to_string();
    let key = id.clone();
    let (touched, advanced) = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let touched = tx.execute(
                "UPDATE leads SET last_call_at = ?2, updated_at = ?2 WHERE id = ?1",
                params![id, now],
            )?;
            let advanced = tx.execute(
                "UPDATE leads SET stage = ?2 WHERE id = ?1 AND stage = ?3",
                params![id, lead_stage::CONTACTED, lead_stage::NEW],
            )?;
            tx.commit()?;
            Ok((touched, advanced))
        })
        .await
        .map_err(map_tr_err)?;

    if touched == 0 {
        return Err(DialerError::NotFound {
            entity: "lead",
            id: key,
        });
    }
    Ok(advanced > 0)
}

/// Insert a lead.
pub async fn insert_lead(db: &Database, lead: &Lead) -> Result<(), DialerError> {
    let lead = lead.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO leads (id, client_id, phone_number, name, stage, last_call_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    lead.id,
                    lead.client_id,
                    lead.phone_number,
                    lead.name,
                    lead.stage,
                    lead.last_call_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
