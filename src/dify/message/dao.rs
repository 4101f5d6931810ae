//! 消息数据访问层（DAO）

use crate::dify::conversation::dao::{decode_json, encode_json};
use crate::dify::message::models::ConversationMessage;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Executor, Pool, Row, Sqlite};
use tracing::debug;

const MESSAGE_COLUMNS: &str = r#"
    id, dify_message_id, dify_conversation_id, dify_app_id, inputs, query, answer,
    feedback_rating, message_files, retriever_resources, user, dify_created_at,
    create_time, update_time
"#;

/// 消息 DAO（基于 sqlx）
#[derive(Clone)]
pub struct MessageDao {
    db: Pool<Sqlite>,
}

impl MessageDao {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    fn row_to_message(row: SqliteRow) -> Result<ConversationMessage> {
        Ok(ConversationMessage {
            id: row.try_get("id")?,
            dify_message_id: row.try_get("dify_message_id")?,
            dify_conversation_id: row.try_get("dify_conversation_id")?,
            dify_app_id: row.try_get("dify_app_id")?,
            inputs: decode_json(&row, "inputs")?,
            query: row.try_get("query")?,
            answer: row.try_get("answer")?,
            feedback_rating: row.try_get("feedback_rating")?,
            message_files: decode_json(&row, "message_files")?,
            retriever_resources: decode_json(&row, "retriever_resources")?,
            user: row.try_get("user")?,
            dify_created_at: row.try_get("dify_created_at")?,
            create_time: Some(row.try_get("create_time")?),
            update_time: Some(row.try_get("update_time")?),
        })
    }

    async fn fetch_list(&self, sql: &str, bind: Option<&str>) -> Result<Vec<ConversationMessage>> {
        let mut query = sqlx::query(sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(&self.db)
            .await
            .context("查询消息列表失败")?;
        let messages: Vec<ConversationMessage> = rows
            .into_iter()
            .map(Self::row_to_message)
            .collect::<Result<_>>()?;
        debug!("[MsgDAO] 查询到 {} 条消息", messages.len());
        Ok(messages)
    }

    /// 插入或更新消息（可在事务中执行）
    pub async fn upsert_message_with<'e, E>(
        executor: E,
        msg: &ConversationMessage,
        now: DateTime<Utc>,
    ) -> Result<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            r#"
            INSERT INTO dify_conversation_messages ({MESSAGE_COLUMNS})
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(dify_message_id) DO UPDATE SET
                dify_conversation_id = excluded.dify_conversation_id,
                dify_app_id = excluded.dify_app_id,
                inputs = excluded.inputs,
                query = excluded.query,
                answer = excluded.answer,
                feedback_rating = excluded.feedback_rating,
                message_files = excluded.message_files,
                retriever_resources = excluded.retriever_resources,
                user = excluded.user,
                dify_created_at = excluded.dify_created_at,
                update_time = excluded.update_time
            "#
        );

        sqlx::query(&sql)
            .bind(&msg.id)
            .bind(&msg.dify_message_id)
            .bind(&msg.dify_conversation_id)
            .bind(&msg.dify_app_id)
            .bind(encode_json(&msg.inputs))
            .bind(&msg.query)
            .bind(&msg.answer)
            .bind(&msg.feedback_rating)
            .bind(encode_json(&msg.message_files))
            .bind(encode_json(&msg.retriever_resources))
            .bind(&msg.user)
            .bind(msg.dify_created_at)
            .bind(msg.create_time.unwrap_or(now))
            .bind(now)
            .execute(executor)
            .await
            .with_context(|| format!("插入或更新消息失败: {}", msg.dify_message_id))?;
        Ok(())
    }

    pub async fn upsert_message(&self, msg: &ConversationMessage) -> Result<()> {
        Self::upsert_message_with(&self.db, msg, Utc::now()).await
    }

    /// 根据 Dify 消息 ID 查询
    pub async fn find_by_dify_message_id(
        &self,
        dify_message_id: &str,
    ) -> Result<Option<ConversationMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM dify_conversation_messages WHERE dify_message_id = ?"
        );
        let row = sqlx::query(&sql)
            .bind(dify_message_id)
            .fetch_optional(&self.db)
            .await
            .context("查询单条消息失败")?;
        row.map(Self::row_to_message).transpose()
    }

    /// 根据会话 ID 查找消息（按 Dify 创建时间正序）
    pub async fn find_by_conversation_id(
        &self,
        dify_conversation_id: &str,
    ) -> Result<Vec<ConversationMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM dify_conversation_messages WHERE dify_conversation_id = ? ORDER BY dify_created_at ASC"
        );
        self.fetch_list(&sql, Some(dify_conversation_id)).await
    }

    /// 根据应用查找消息（按 Dify 创建时间倒序）
    pub async fn find_by_app(&self, dify_app_id: &str) -> Result<Vec<ConversationMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM dify_conversation_messages WHERE dify_app_id = ? ORDER BY dify_created_at DESC"
        );
        self.fetch_list(&sql, Some(dify_app_id)).await
    }

    /// 根据用户查找消息（按 Dify 创建时间倒序）
    pub async fn find_by_user(&self, user: &str) -> Result<Vec<ConversationMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM dify_conversation_messages WHERE user = ? ORDER BY dify_created_at DESC"
        );
        self.fetch_list(&sql, Some(user)).await
    }

    /// 获取最新的消息列表
    pub async fn find_latest(&self, limit: u32) -> Result<Vec<ConversationMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM dify_conversation_messages ORDER BY dify_created_at DESC LIMIT {limit}"
        );
        self.fetch_list(&sql, None).await
    }

    /// 获取有反馈的消息
    pub async fn find_with_feedback(&self) -> Result<Vec<ConversationMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM dify_conversation_messages WHERE feedback_rating IS NOT NULL ORDER BY dify_created_at DESC"
        );
        self.fetch_list(&sql, None).await
    }

    /// 统计指定会话的消息数量
    pub async fn count_by_conversation_id(&self, dify_conversation_id: &str) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(id) AS total FROM dify_conversation_messages WHERE dify_conversation_id = ?",
        )
        .bind(dify_conversation_id)
        .fetch_one(&self.db)
        .await
        .context("统计消息数量失败")?;
        Ok(row.get("total"))
    }

    /// 统计全部消息数量
    pub async fn count_all(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(id) AS total FROM dify_conversation_messages")
            .fetch_one(&self.db)
            .await
            .context("统计消息数量失败")?;
        Ok(row.get("total"))
    }

    pub async fn delete_message(&self, dify_message_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM dify_conversation_messages WHERE dify_message_id = ?")
            .bind(dify_message_id)
            .execute(&self.db)
            .await
            .context("删除消息失败")?;
        Ok(())
    }
}
