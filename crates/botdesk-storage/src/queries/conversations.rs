// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation rows and the denormalized last-message projection.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::params;

use botdesk_core::types::{Conversation, ConversationKind, MessageContent};
use botdesk_core::BotdeskError;

use crate::database::{map_tr_err, Database};

const SELECT_CONVERSATION: &str = "SELECT id, bot_identity_id, kind, external_thread_id, \
     last_message, last_activity_at FROM conversations";

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> Result<Conversation, rusqlite::Error> {
    let kind_text: String = row.get(2)?;
    let kind = ConversationKind::from_str(&kind_text).map_err(|e| conversion_err(2, e))?;
    let last_message: Option<String> = row.get(4)?;
    let last_message = last_message
        .map(|json| serde_json::from_str(&json).map_err(|e| conversion_err(4, e)))
        .transpose()?;
    let last_activity_at: Option<String> = row.get(5)?;
    let last_activity_at = last_activity_at
        .map(|text| {
            DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| conversion_err(5, e))
        })
        .transpose()?;

    Ok(Conversation {
        id: row.get(0)?,
        bot_identity_id: row.get(1)?,
        kind,
        external_thread_id: row.get(3)?,
        last_message,
        last_activity_at,
    })
}

pub async fn insert_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), BotdeskError> {
    let c = conversation.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let last_message = c
                .last_message
                .as_ref()
                .map(|m| serde_json::to_string(m).map_err(|e| conversion_err(4, e)))
                .transpose()?;
            conn.execute(
                "INSERT INTO conversations (id, bot_identity_id, kind, external_thread_id, \
                 last_message, last_activity_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    c.id,
                    c.bot_identity_id,
                    c.kind.to_string(),
                    c.external_thread_id,
                    last_message,
                    c.last_activity_at.map(|t| t.to_rfc3339()),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, BotdeskError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            conn.query_row(
                &format!("{SELECT_CONVERSATION} WHERE id = ?1"),
                params![id],
                row_to_conversation,
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

pub async fn conversation_for_thread(
    db: &Database,
    bot_id: &str,
    thread_id: &str,
) -> Result<Option<Conversation>, BotdeskError> {
    let bot_id = bot_id.to_string();
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "{SELECT_CONVERSATION} WHERE bot_identity_id = ?1 AND external_thread_id = ?2"
                ),
                params![bot_id, thread_id],
                row_to_conversation,
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

/// Overwrite the `last_message`/`last_activity_at` projection.
///
/// Last-write-wins: no event-time comparison is performed.
pub async fn touch_conversation(
    db: &Database,
    conversation_id: &str,
    last_message: &MessageContent,
    at: DateTime<Utc>,
) -> Result<(), BotdeskError> {
    let conversation_id = conversation_id.to_string();
    let last_message = last_message.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let snapshot =
                serde_json::to_string(&last_message).map_err(|e| conversion_err(4, e))?;
            conn.execute(
                "UPDATE conversations SET last_message = ?1, last_activity_at = ?2 \
                 WHERE id = ?3",
                params![snapshot, at.to_rfc3339(), conversation_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
