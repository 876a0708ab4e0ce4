// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`DirectoryStore`] trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use botdesk_config::model::StorageConfig;
use botdesk_core::types::{
    Conversation, Identity, Message, MessageContent, MessageStatus, StaffAccount,
};
use botdesk_core::{BotdeskError, DirectoryStore};

use crate::database::Database;
use crate::queries;

/// SQLite-backed directory store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules.
pub struct SqliteDirectoryStore {
    db: Database,
}

impl SqliteDirectoryStore {
    /// Open the database at the configured path, applying migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, BotdeskError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        Ok(Self { db })
    }

    /// Checkpoint the WAL before shutdown.
    pub async fn close(&self) -> Result<(), BotdeskError> {
        self.db.close().await
    }

    // --- Provisioning (admin/sync surfaces and tests) ---

    pub async fn insert_identity(&self, identity: &Identity) -> Result<(), BotdeskError> {
        queries::directory::insert_identity(&self.db, identity).await
    }

    pub async fn insert_staff_account(&self, staff: &StaffAccount) -> Result<(), BotdeskError> {
        queries::directory::insert_staff_account(&self.db, staff).await
    }

    pub async fn insert_bot_account(
        &self,
        account_id: &str,
        identity_id: &str,
    ) -> Result<(), BotdeskError> {
        queries::directory::insert_bot_account(&self.db, account_id, identity_id).await
    }

    pub async fn insert_grant(
        &self,
        bot_account_id: &str,
        staff_id: &str,
    ) -> Result<(), BotdeskError> {
        queries::directory::insert_grant(&self.db, bot_account_id, staff_id).await
    }

    pub async fn insert_contact_link(
        &self,
        bot_identity_id: &str,
        external_uid: &str,
        identity_id: &str,
    ) -> Result<(), BotdeskError> {
        queries::directory::insert_contact_link(&self.db, bot_identity_id, external_uid, identity_id)
            .await
    }

    pub async fn insert_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<(), BotdeskError> {
        queries::conversations::insert_conversation(&self.db, conversation).await
    }
}

#[async_trait]
impl DirectoryStore for SqliteDirectoryStore {
    async fn conversation_for_thread(
        &self,
        bot_id: &str,
        thread_id: &str,
    ) -> Result<Option<Conversation>, BotdeskError> {
        queries::conversations::conversation_for_thread(&self.db, bot_id, thread_id).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, BotdeskError> {
        queries::conversations::get_conversation(&self.db, id).await
    }

    async fn upsert_message(
        &self,
        message: &Message,
        raw: &serde_json::Value,
    ) -> Result<Message, BotdeskError> {
        queries::messages::upsert_message(&self.db, message, raw).await
    }

    async fn get_message(
        &self,
        conversation_id: &str,
        external_id: &str,
    ) -> Result<Option<Message>, BotdeskError> {
        queries::messages::get_message(&self.db, conversation_id, external_id).await
    }

    async fn update_message_status(
        &self,
        conversation_id: &str,
        external_id: &str,
        status: MessageStatus,
        new_external_id: Option<&str>,
    ) -> Result<(), BotdeskError> {
        queries::messages::update_message_status(
            &self.db,
            conversation_id,
            external_id,
            status,
            new_external_id,
        )
        .await
    }

    async fn touch_conversation(
        &self,
        conversation_id: &str,
        last_message: &MessageContent,
        at: DateTime<Utc>,
    ) -> Result<(), BotdeskError> {
        queries::conversations::touch_conversation(&self.db, conversation_id, last_message, at)
            .await
    }

    async fn identity(&self, id: &str) -> Result<Option<Identity>, BotdeskError> {
        queries::directory::get_identity(&self.db, id).await
    }

    async fn linked_identity(
        &self,
        bot_id: &str,
        external_uid: &str,
    ) -> Result<Option<String>, BotdeskError> {
        queries::directory::linked_identity(&self.db, bot_id, external_uid).await
    }

    async fn bot_account_id(
        &self,
        bot_identity_id: &str,
    ) -> Result<Option<String>, BotdeskError> {
        queries::directory::bot_account_id(&self.db, bot_identity_id).await
    }

    async fn admin_staff_ids(&self) -> Result<Vec<String>, BotdeskError> {
        queries::directory::admin_staff_ids(&self.db).await
    }

    async fn granted_staff_ids(
        &self,
        bot_account_id: &str,
    ) -> Result<Vec<String>, BotdeskError> {
        queries::directory::granted_staff_ids(&self.db, bot_account_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    use botdesk_core::types::{ConversationKind, IdentityKind, SenderKind, StaffRole};

    async fn open_store(dir: &tempfile::TempDir) -> SqliteDirectoryStore {
        let config = StorageConfig {
            database_path: dir
                .path()
                .join("store.db")
                .to_string_lossy()
                .into_owned(),
            wal_mode: true,
        };
        SqliteDirectoryStore::open(&config).await.unwrap()
    }

    fn conversation(id: &str, bot: &str, thread: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            bot_identity_id: bot.to_string(),
            kind: ConversationKind::Direct,
            external_thread_id: thread.to_string(),
            last_message: None,
            last_activity_at: None,
        }
    }

    fn message(conversation_id: &str, external_id: &str, text: &str) -> Message {
        Message {
            id: format!("m-{external_id}"),
            conversation_id: conversation_id.to_string(),
            external_id: external_id.to_string(),
            sender_identity_id: None,
            sender_kind: SenderKind::Customer,
            content: MessageContent::Text {
                text: text.to_string(),
            },
            sent_at: Utc::now(),
            status: MessageStatus::Sent,
        }
    }

    #[tokio::test]
    async fn upsert_updates_instead_of_duplicating() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;
        store
            .insert_conversation(&conversation("c-1", "bot-1", "123"))
            .await
            .unwrap();

        let first = store
            .upsert_message(&message("c-1", "ext-1", "hello"), &json!({}))
            .await
            .unwrap();

        let mut redelivery = message("c-1", "ext-1", "hello again");
        redelivery.id = "m-other".to_string();
        let second = store.upsert_message(&redelivery, &json!({})).await.unwrap();

        // Same row: original id preserved, content updated.
        assert_eq!(second.id, first.id);
        assert_eq!(
            second.content,
            MessageContent::Text {
                text: "hello again".to_string()
            }
        );

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn touch_conversation_overwrites_projection() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;
        store
            .insert_conversation(&conversation("c-1", "bot-1", "123"))
            .await
            .unwrap();

        let at = Utc::now();
        let content = MessageContent::Text {
            text: "latest".to_string(),
        };
        store.touch_conversation("c-1", &content, at).await.unwrap();

        let loaded = store.get_conversation("c-1").await.unwrap().unwrap();
        assert_eq!(loaded.last_message, Some(content));
        assert_eq!(
            loaded.last_activity_at.unwrap().timestamp(),
            at.timestamp()
        );
    }

    #[tokio::test]
    async fn conversation_lookup_is_scoped_to_bot() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;
        store
            .insert_conversation(&conversation("c-1", "bot-1", "123"))
            .await
            .unwrap();

        assert!(store
            .conversation_for_thread("bot-1", "123")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .conversation_for_thread("bot-2", "123")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn status_flip_adopts_provider_id() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;
        store
            .insert_conversation(&conversation("c-1", "bot-1", "123"))
            .await
            .unwrap();

        let mut placeholder = message("c-1", "local-1", "outgoing");
        placeholder.status = MessageStatus::Sending;
        store.upsert_message(&placeholder, &json!({})).await.unwrap();

        store
            .update_message_status("c-1", "local-1", MessageStatus::Sent, Some("prov-9"))
            .await
            .unwrap();

        assert!(store.get_message("c-1", "local-1").await.unwrap().is_none());
        let flipped = store.get_message("c-1", "prov-9").await.unwrap().unwrap();
        assert_eq!(flipped.status, MessageStatus::Sent);
    }

    #[tokio::test]
    async fn directory_rows_resolve() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;

        store
            .insert_identity(&Identity {
                id: "bot-1".to_string(),
                external_uid: "uid-bot".to_string(),
                display_name: "Support Bot".to_string(),
                avatar_url: None,
                kind: IdentityKind::Bot,
            })
            .await
            .unwrap();
        store
            .insert_identity(&Identity {
                id: "cust-1".to_string(),
                external_uid: "uid-cust".to_string(),
                display_name: "Jamie".to_string(),
                avatar_url: Some("https://cdn.example/j.png".to_string()),
                kind: IdentityKind::User,
            })
            .await
            .unwrap();
        store
            .insert_staff_account(&StaffAccount {
                id: "staff-admin".to_string(),
                display_name: "Admin".to_string(),
                role: StaffRole::Admin,
            })
            .await
            .unwrap();
        store
            .insert_staff_account(&StaffAccount {
                id: "staff-agent".to_string(),
                display_name: "Agent".to_string(),
                role: StaffRole::Agent,
            })
            .await
            .unwrap();
        store.insert_bot_account("acct-1", "bot-1").await.unwrap();
        store.insert_grant("acct-1", "staff-agent").await.unwrap();
        store
            .insert_contact_link("bot-1", "uid-cust", "cust-1")
            .await
            .unwrap();

        assert_eq!(store.admin_staff_ids().await.unwrap(), vec!["staff-admin"]);
        assert_eq!(
            store.bot_account_id("bot-1").await.unwrap().as_deref(),
            Some("acct-1")
        );
        assert_eq!(
            store.granted_staff_ids("acct-1").await.unwrap(),
            vec!["staff-agent"]
        );
        assert_eq!(
            store
                .linked_identity("bot-1", "uid-cust")
                .await
                .unwrap()
                .as_deref(),
            Some("cust-1")
        );
        assert!(store
            .linked_identity("bot-1", "uid-stranger")
            .await
            .unwrap()
            .is_none());
        let jamie = store.identity("cust-1").await.unwrap().unwrap();
        assert_eq!(jamie.display_name, "Jamie");
    }
}
