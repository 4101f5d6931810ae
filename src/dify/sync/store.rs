//! 同步存储：待写缓冲 + 按应用批量提交

use crate::dify::conversation::{Conversation, ConversationDao};
use crate::dify::message::{ConversationMessage, MessageDao, FEEDBACK_RATINGS};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use tracing::{debug, info};

/// 单个应用同步过程中排队等待提交的记录
///
/// 以 Dify ID 为键：同一轮里再次观察到同一 ID 时替换已排队的记录。
#[derive(Debug, Default)]
pub struct PendingWrites {
    conversations: Vec<Conversation>,
    conversation_index: HashMap<String, usize>,
    messages: Vec<ConversationMessage>,
    message_index: HashMap<String, usize>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persist_conversation(&mut self, conv: Conversation) {
        match self.conversation_index.get(&conv.dify_conversation_id) {
            Some(&idx) => self.conversations[idx] = conv,
            None => {
                self.conversation_index
                    .insert(conv.dify_conversation_id.clone(), self.conversations.len());
                self.conversations.push(conv);
            }
        }
    }

    pub fn persist_message(&mut self, msg: ConversationMessage) {
        match self.message_index.get(&msg.dify_message_id) {
            Some(&idx) => self.messages[idx] = msg,
            None => {
                self.message_index
                    .insert(msg.dify_message_id.clone(), self.messages.len());
                self.messages.push(msg);
            }
        }
    }

    /// 查询已排队的会话
    pub fn conversation(&self, dify_conversation_id: &str) -> Option<&Conversation> {
        self.conversation_index
            .get(dify_conversation_id)
            .map(|&idx| &self.conversations[idx])
    }

    pub fn message(&self, dify_message_id: &str) -> Option<&ConversationMessage> {
        self.message_index
            .get(dify_message_id)
            .map(|&idx| &self.messages[idx])
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty() && self.messages.is_empty()
    }

    /// 提交前校验所有记录
    pub fn validate(&self) -> Result<()> {
        for conv in &self.conversations {
            if conv.dify_conversation_id.is_empty() {
                anyhow::bail!("会话缺少 Dify ID");
            }
            if conv.dify_created_at < 0 || conv.dify_updated_at < 0 {
                anyhow::bail!(
                    "会话 {} 的时间戳不能为负数",
                    conv.dify_conversation_id
                );
            }
        }
        for msg in &self.messages {
            if msg.dify_message_id.is_empty() {
                anyhow::bail!("消息缺少 Dify ID");
            }
            if !msg.has_valid_rating() {
                anyhow::bail!(
                    "消息 {} 的反馈评分必须是 {:?} 之一，实际为 {:?}",
                    msg.dify_message_id,
                    FEEDBACK_RATINGS,
                    msg.feedback_rating
                );
            }
            if msg.dify_created_at < 0 {
                anyhow::bail!("消息 {} 的时间戳不能为负数", msg.dify_message_id);
            }
        }
        Ok(())
    }
}

/// 会话/消息存储接口（按 Dify ID 查找 + 批量提交）
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn find_conversation(&self, dify_conversation_id: &str) -> Result<Option<Conversation>>;

    async fn find_message(&self, dify_message_id: &str) -> Result<Option<ConversationMessage>>;

    /// 校验并提交一批记录；失败时整批都不生效
    async fn flush(&self, writes: PendingWrites) -> Result<()>;
}

/// 基于 SQLite 的存储实现
#[derive(Clone)]
pub struct SqliteStore {
    db: Pool<Sqlite>,
    conversation_dao: ConversationDao,
    message_dao: MessageDao,
}

impl SqliteStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self {
            conversation_dao: ConversationDao::new(db.clone()),
            message_dao: MessageDao::new(db.clone()),
            db,
        }
    }

    pub fn conversation_dao(&self) -> &ConversationDao {
        &self.conversation_dao
    }

    pub fn message_dao(&self) -> &MessageDao {
        &self.message_dao
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn find_conversation(&self, dify_conversation_id: &str) -> Result<Option<Conversation>> {
        self.conversation_dao
            .find_by_dify_conversation_id(dify_conversation_id)
            .await
    }

    async fn find_message(&self, dify_message_id: &str) -> Result<Option<ConversationMessage>> {
        self.message_dao
            .find_by_dify_message_id(dify_message_id)
            .await
    }

    async fn flush(&self, writes: PendingWrites) -> Result<()> {
        writes.validate()?;
        if writes.is_empty() {
            debug!("[Store] 没有待提交的记录");
            return Ok(());
        }

        let now = Utc::now();
        let mut tx = self.db.begin().await.context("开启事务失败")?;
        for conv in writes.conversations() {
            ConversationDao::upsert_conversation_with(&mut *tx, conv, now).await?;
        }
        for msg in writes.messages() {
            MessageDao::upsert_message_with(&mut *tx, msg, now).await?;
        }
        tx.commit().await.context("提交事务失败")?;

        info!(
            "[Store] 已提交 {} 个会话, {} 条消息",
            writes.conversations().len(),
            writes.messages().len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dify::app::DifyApp;
    use crate::dify::db::create_sqlite_pool_with_migration;

    fn app() -> DifyApp {
        DifyApp::new("app-1", "App", "http://localhost", "key")
    }

    #[test]
    fn test_pending_writes_replace_same_id() {
        let app = app();
        let mut writes = PendingWrites::new();

        let mut first = Conversation::new("c1", &app);
        first.name = "first".into();
        writes.persist_conversation(first);
        writes.persist_conversation(Conversation::new("c2", &app));
        let mut second = Conversation::new("c1", &app);
        second.name = "second".into();
        writes.persist_conversation(second);

        assert_eq!(writes.conversations().len(), 2);
        assert_eq!(writes.conversation("c1").unwrap().name, "second");
        assert_eq!(writes.conversations()[0].dify_conversation_id, "c1");

        writes.persist_message(ConversationMessage::new("m1", &app));
        writes.persist_message(ConversationMessage::new("m1", &app));
        assert_eq!(writes.messages().len(), 1);
        assert!(writes.message("m1").is_some());
        assert!(writes.message("m2").is_none());
    }

    #[tokio::test]
    async fn test_flush_commits_batch() -> Result<()> {
        let pool = create_sqlite_pool_with_migration("sqlite::memory:").await?;
        let store = SqliteStore::new(pool);
        let app = app();

        let mut writes = PendingWrites::new();
        writes.persist_conversation(Conversation::new("c1", &app));
        let mut msg = ConversationMessage::new("m1", &app);
        msg.dify_conversation_id = "c1".into();
        msg.feedback_rating = Some("like".into());
        writes.persist_message(msg);
        store.flush(writes).await?;

        assert!(store.find_conversation("c1").await?.is_some());
        let stored = store.find_message("m1").await?.unwrap();
        assert_eq!(stored.feedback_rating.as_deref(), Some("like"));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_rating_fails_whole_batch() -> Result<()> {
        let pool = create_sqlite_pool_with_migration("sqlite::memory:").await?;
        let store = SqliteStore::new(pool);
        let app = app();

        let mut writes = PendingWrites::new();
        writes.persist_conversation(Conversation::new("c1", &app));
        let mut msg = ConversationMessage::new("m1", &app);
        msg.feedback_rating = Some("meh".into());
        writes.persist_message(msg);

        let err = store.flush(writes).await.unwrap_err();
        assert!(err.to_string().contains("m1"));
        assert_eq!(store.conversation_dao().count_all().await?, 0);
        assert_eq!(store.message_dao().count_all().await?, 0);
        Ok(())
    }

    #[test]
    fn test_negative_timestamp_rejected() {
        let app = app();
        let mut writes = PendingWrites::new();
        let mut conv = Conversation::new("c1", &app);
        conv.dify_updated_at = -1;
        writes.persist_conversation(conv);

        assert!(writes.validate().is_err());
    }
}
