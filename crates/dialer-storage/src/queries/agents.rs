// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent lookups.

use dialer_core::DialerError;
use dialer_core::types::Agent;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

pub async fn get_agent(db: &Database, id: &str) -> Result<Option<Agent>, DialerError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, external_agent_id, name FROM agents WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Agent {
                        id: row.get(0)?,
                        external_agent_id: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn insert_agent(db: &Database, agent: &Agent) -> Result<(), DialerError> {
    let agent = agent.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO agents (id, external_agent_id, name) VALUES (?1, ?2, ?3)",
                params![agent.id, agent.external_agent_id, agent.name],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
