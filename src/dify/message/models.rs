//! 消息本地模型定义

use crate::dify::app::DifyApp;
use crate::dify::types::truncate_chars;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// 允许落库的反馈评分
pub const FEEDBACK_RATINGS: [&str; 2] = ["like", "dislike"];

/// 本地会话消息记录，以 Dify 消息 ID 作为幂等同步的键
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// 本地主键（UUID v4）
    pub id: String,
    pub dify_message_id: String,
    /// 所属 Dify 会话 ID（普通字段，不是外键）
    pub dify_conversation_id: String,
    pub dify_app_id: String,
    pub inputs: Option<Value>,
    /// 用户提问
    pub query: String,
    pub answer: String,
    /// `like` / `dislike`
    pub feedback_rating: Option<String>,
    pub message_files: Option<Value>,
    pub retriever_resources: Option<Value>,
    pub user: String,
    /// Dify 创建时间（Unix 秒）
    pub dify_created_at: i64,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl ConversationMessage {
    pub fn new(dify_message_id: impl Into<String>, app: &DifyApp) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            dify_message_id: dify_message_id.into(),
            dify_conversation_id: String::new(),
            dify_app_id: app.id.clone(),
            inputs: None,
            query: String::new(),
            answer: String::new(),
            feedback_rating: None,
            message_files: None,
            retriever_resources: None,
            user: String::new(),
            dify_created_at: 0,
            create_time: None,
            update_time: None,
        }
    }

    /// 评分是否在允许范围内（None 视为合法）
    pub fn has_valid_rating(&self) -> bool {
        self.feedback_rating
            .as_deref()
            .map_or(true, |rating| FEEDBACK_RATINGS.contains(&rating))
    }
}

impl fmt::Display for ConversationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let query = if self.query.is_empty() {
            "no query"
        } else {
            truncate_chars(&self.query, 50)
        };
        write!(f, "Message[{}]: {}", self.dify_message_id, query)
    }
}
