//! 会话数据访问层（DAO）
//!
//! 负责所有会话相关的数据库操作，将数据访问逻辑与业务逻辑分离。

use crate::dify::conversation::models::Conversation;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Executor, Pool, Row, Sqlite};
use tracing::debug;

const CONVERSATION_COLUMNS: &str = r#"
    id, dify_conversation_id, dify_app_id, name, inputs, status, introduction,
    user, dify_created_at, dify_updated_at, create_time, update_time
"#;

/// 会话 DAO（基于 sqlx）
#[derive(Clone)]
pub struct ConversationDao {
    db: Pool<Sqlite>,
}

/// JSON 列以文本形式存储
pub(crate) fn encode_json(value: &Option<Value>) -> Option<String> {
    value.as_ref().map(Value::to_string)
}

pub(crate) fn decode_json(row: &SqliteRow, column: &str) -> Result<Option<Value>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| serde_json::from_str(&s))
        .transpose()
        .with_context(|| format!("解析 JSON 列 {} 失败", column))
}

impl ConversationDao {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    fn row_to_conversation(row: SqliteRow) -> Result<Conversation> {
        Ok(Conversation {
            id: row.try_get("id")?,
            dify_conversation_id: row.try_get("dify_conversation_id")?,
            dify_app_id: row.try_get("dify_app_id")?,
            name: row.try_get("name")?,
            inputs: decode_json(&row, "inputs")?,
            status: row.try_get("status")?,
            introduction: row.try_get("introduction")?,
            user: row.try_get("user")?,
            dify_created_at: row.try_get("dify_created_at")?,
            dify_updated_at: row.try_get("dify_updated_at")?,
            create_time: Some(row.try_get("create_time")?),
            update_time: Some(row.try_get("update_time")?),
        })
    }

    async fn fetch_list(&self, sql: &str, bind: Option<&str>) -> Result<Vec<Conversation>> {
        let mut query = sqlx::query(sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(&self.db)
            .await
            .context("查询会话列表失败")?;
        rows.into_iter().map(Self::row_to_conversation).collect()
    }

    /// 插入或更新会话（可在事务中执行）
    ///
    /// 按 `dify_conversation_id` 冲突时保留原有本地主键和 `create_time`。
    pub async fn upsert_conversation_with<'e, E>(
        executor: E,
        conv: &Conversation,
        now: DateTime<Utc>,
    ) -> Result<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            r#"
            INSERT INTO dify_conversations ({CONVERSATION_COLUMNS})
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(dify_conversation_id) DO UPDATE SET
                dify_app_id = excluded.dify_app_id,
                name = excluded.name,
                inputs = excluded.inputs,
                status = excluded.status,
                introduction = excluded.introduction,
                user = excluded.user,
                dify_created_at = excluded.dify_created_at,
                dify_updated_at = excluded.dify_updated_at,
                update_time = excluded.update_time
            "#
        );

        sqlx::query(&sql)
            .bind(&conv.id)
            .bind(&conv.dify_conversation_id)
            .bind(&conv.dify_app_id)
            .bind(&conv.name)
            .bind(encode_json(&conv.inputs))
            .bind(&conv.status)
            .bind(&conv.introduction)
            .bind(&conv.user)
            .bind(conv.dify_created_at)
            .bind(conv.dify_updated_at)
            .bind(conv.create_time.unwrap_or(now))
            .bind(now)
            .execute(executor)
            .await
            .with_context(|| format!("插入或更新会话失败: {}", conv.dify_conversation_id))?;
        Ok(())
    }

    /// 插入或更新单个会话
    pub async fn upsert_conversation(&self, conv: &Conversation) -> Result<()> {
        Self::upsert_conversation_with(&self.db, conv, Utc::now()).await
    }

    /// 根据 Dify 会话 ID 查询
    pub async fn find_by_dify_conversation_id(
        &self,
        dify_conversation_id: &str,
    ) -> Result<Option<Conversation>> {
        let sql = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM dify_conversations WHERE dify_conversation_id = ?"
        );
        let row = sqlx::query(&sql)
            .bind(dify_conversation_id)
            .fetch_optional(&self.db)
            .await
            .context("查询单个会话失败")?;
        row.map(Self::row_to_conversation).transpose()
    }

    /// 根据应用查找会话（按 Dify 更新时间倒序）
    pub async fn find_by_app(&self, dify_app_id: &str) -> Result<Vec<Conversation>> {
        let sql = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM dify_conversations WHERE dify_app_id = ? ORDER BY dify_updated_at DESC"
        );
        self.fetch_list(&sql, Some(dify_app_id)).await
    }

    /// 根据用户查找会话（按 Dify 更新时间倒序）
    pub async fn find_by_user(&self, user: &str) -> Result<Vec<Conversation>> {
        let sql = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM dify_conversations WHERE user = ? ORDER BY dify_updated_at DESC"
        );
        self.fetch_list(&sql, Some(user)).await
    }

    /// 获取最新的会话列表
    pub async fn find_latest(&self, limit: u32) -> Result<Vec<Conversation>> {
        let sql = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM dify_conversations ORDER BY dify_updated_at DESC LIMIT {limit}"
        );
        self.fetch_list(&sql, None).await
    }

    /// 统计指定应用的会话数量
    pub async fn count_by_app(&self, dify_app_id: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(id) AS total FROM dify_conversations WHERE dify_app_id = ?")
            .bind(dify_app_id)
            .fetch_one(&self.db)
            .await
            .context("统计会话数量失败")?;
        Ok(row.get("total"))
    }

    /// 统计全部会话数量
    pub async fn count_all(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(id) AS total FROM dify_conversations")
            .fetch_one(&self.db)
            .await
            .context("统计会话数量失败")?;
        let total: i64 = row.get("total");
        debug!("[ConvDAO] 本地会话总数: {}", total);
        Ok(total)
    }

    /// 删除会话
    pub async fn delete_conversation(&self, dify_conversation_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM dify_conversations WHERE dify_conversation_id = ?")
            .bind(dify_conversation_id)
            .execute(&self.db)
            .await
            .context("删除会话失败")?;
        Ok(())
    }
}
