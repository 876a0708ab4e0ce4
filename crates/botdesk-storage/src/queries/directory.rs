// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity, staff, grant, and contact-link rows.
//!
//! These tables are provisioned by the admin/sync surfaces outside the
//! real-time core; the core only reads them during ingestion and dispatch.
//! The insert functions exist for provisioning tools and tests.

use std::str::FromStr;

use rusqlite::params;

use botdesk_core::types::{Identity, IdentityKind, StaffAccount, StaffRole};
use botdesk_core::BotdeskError;

use crate::database::{map_tr_err, Database};

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

pub async fn insert_identity(db: &Database, identity: &Identity) -> Result<(), BotdeskError> {
    let i = identity.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO identities (id, external_uid, display_name, avatar_url, kind) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![i.id, i.external_uid, i.display_name, i.avatar_url, i.kind.to_string()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_identity(db: &Database, id: &str) -> Result<Option<Identity>, BotdeskError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Identity>, rusqlite::Error> {
            conn.query_row(
                "SELECT id, external_uid, display_name, avatar_url, kind \
                 FROM identities WHERE id = ?1",
                params![id],
                |row| {
                    let kind_text: String = row.get(4)?;
                    let kind = IdentityKind::from_str(&kind_text)
                        .map_err(|e| conversion_err(4, e))?;
                    Ok(Identity {
                        id: row.get(0)?,
                        external_uid: row.get(1)?,
                        display_name: row.get(2)?,
                        avatar_url: row.get(3)?,
                        kind,
                    })
                },
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

pub async fn insert_staff_account(
    db: &Database,
    staff: &StaffAccount,
) -> Result<(), BotdeskError> {
    let s = staff.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO staff_accounts (id, display_name, role) VALUES (?1, ?2, ?3)",
                params![s.id, s.display_name, s.role.to_string()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn admin_staff_ids(db: &Database) -> Result<Vec<String>, BotdeskError> {
    db.connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id FROM staff_accounts WHERE role = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![StaffRole::Admin.to_string()], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn insert_bot_account(
    db: &Database,
    account_id: &str,
    identity_id: &str,
) -> Result<(), BotdeskError> {
    let account_id = account_id.to_string();
    let identity_id = identity_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO bot_accounts (id, identity_id) VALUES (?1, ?2)",
                params![account_id, identity_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn bot_account_id(
    db: &Database,
    bot_identity_id: &str,
) -> Result<Option<String>, BotdeskError> {
    let bot_identity_id = bot_identity_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT id FROM bot_accounts WHERE identity_id = ?1",
                params![bot_identity_id],
                |row| row.get(0),
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

pub async fn insert_grant(
    db: &Database,
    bot_account_id: &str,
    staff_id: &str,
) -> Result<(), BotdeskError> {
    let bot_account_id = bot_account_id.to_string();
    let staff_id = staff_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO bot_grants (bot_account_id, staff_id) VALUES (?1, ?2)",
                params![bot_account_id, staff_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn granted_staff_ids(
    db: &Database,
    bot_account_id: &str,
) -> Result<Vec<String>, BotdeskError> {
    let bot_account_id = bot_account_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT staff_id FROM bot_grants WHERE bot_account_id = ?1 ORDER BY staff_id",
            )?;
            let rows = stmt.query_map(params![bot_account_id], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn insert_contact_link(
    db: &Database,
    bot_identity_id: &str,
    external_uid: &str,
    identity_id: &str,
) -> Result<(), BotdeskError> {
    let bot_identity_id = bot_identity_id.to_string();
    let external_uid = external_uid.to_string();
    let identity_id = identity_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO contact_links (bot_identity_id, external_uid, identity_id) \
                 VALUES (?1, ?2, ?3)",
                params![bot_identity_id, external_uid, identity_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn linked_identity(
    db: &Database,
    bot_identity_id: &str,
    external_uid: &str,
) -> Result<Option<String>, BotdeskError> {
    let bot_identity_id = bot_identity_id.to_string();
    let external_uid = external_uid.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT identity_id FROM contact_links \
                 WHERE bot_identity_id = ?1 AND external_uid = ?2",
                params![bot_identity_id, external_uid],
                |row| row.get(0),
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
