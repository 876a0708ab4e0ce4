// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message rows: upsert keyed by the `(conversation_id, external_id)`
//! natural key, point reads, and status flips for the outbound path.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::params;

use botdesk_core::types::{Message, MessageStatus, SenderKind};
use botdesk_core::BotdeskError;

use crate::database::{map_tr_err, Database};

const SELECT_MESSAGE: &str = "SELECT id, conversation_id, external_id, sender_identity_id, \
     sender_kind, content, sent_at, status FROM messages \
     WHERE conversation_id = ?1 AND external_id = ?2";

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

pub(crate) fn row_to_message(row: &rusqlite::Row<'_>) -> Result<Message, rusqlite::Error> {
    let content_json: String = row.get(5)?;
    let content = serde_json::from_str(&content_json).map_err(|e| conversion_err(5, e))?;
    let sent_at_text: String = row.get(6)?;
    let sent_at = DateTime::parse_from_rfc3339(&sent_at_text)
        .map_err(|e| conversion_err(6, e))?
        .with_timezone(&Utc);
    let sender_kind_text: String = row.get(4)?;
    let sender_kind =
        SenderKind::from_str(&sender_kind_text).map_err(|e| conversion_err(4, e))?;
    let status_text: String = row.get(7)?;
    let status = MessageStatus::from_str(&status_text).map_err(|e| conversion_err(7, e))?;

    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        external_id: row.get(2)?,
        sender_identity_id: row.get(3)?,
        sender_kind,
        content,
        sent_at,
        status,
    })
}

/// Insert or update a message by its natural key, returning the row as
/// stored. A conflicting insert keeps the original row `id` and overwrites
/// the mutable columns.
pub async fn upsert_message(
    db: &Database,
    message: &Message,
    raw: &serde_json::Value,
) -> Result<Message, BotdeskError> {
    let m = message.clone();
    let raw_json = raw.to_string();
    db.connection()
        .call(move |conn| -> Result<Message, rusqlite::Error> {
            let content_json =
                serde_json::to_string(&m.content).map_err(|e| conversion_err(5, e))?;
            conn.execute(
                "INSERT INTO messages (id, conversation_id, external_id, sender_identity_id, \
                 sender_kind, content, raw, sent_at, status) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
                 ON CONFLICT(conversation_id, external_id) DO UPDATE SET \
                 sender_identity_id = excluded.sender_identity_id, \
                 sender_kind = excluded.sender_kind, \
                 content = excluded.content, \
                 raw = excluded.raw, \
                 sent_at = excluded.sent_at, \
                 status = excluded.status",
                params![
                    m.id,
                    m.conversation_id,
                    m.external_id,
                    m.sender_identity_id,
                    m.sender_kind.to_string(),
                    content_json,
                    raw_json,
                    m.sent_at.to_rfc3339(),
                    m.status.to_string(),
                ],
            )?;
            conn.query_row(
                SELECT_MESSAGE,
                params![m.conversation_id, m.external_id],
                row_to_message,
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_message(
    db: &Database,
    conversation_id: &str,
    external_id: &str,
) -> Result<Option<Message>, BotdeskError> {
    let conversation_id = conversation_id.to_string();
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Message>, rusqlite::Error> {
            conn.query_row(
                SELECT_MESSAGE,
                params![conversation_id, external_id],
                row_to_message,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Flip the status of a message, optionally adopting a provider-assigned
/// external id (outbound send completion).
pub async fn update_message_status(
    db: &Database,
    conversation_id: &str,
    external_id: &str,
    status: MessageStatus,
    new_external_id: Option<&str>,
) -> Result<(), BotdeskError> {
    let conversation_id = conversation_id.to_string();
    let external_id = external_id.to_string();
    let new_external_id = new_external_id.map(|s| s.to_string());
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE messages SET status = ?1, external_id = COALESCE(?2, external_id) \
                 WHERE conversation_id = ?3 AND external_id = ?4",
                params![status.to_string(), new_external_id, conversation_id, external_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
