//! 会话本地模型定义

use crate::dify::app::DifyApp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// 本地会话记录，以 Dify 会话 ID 作为幂等同步的键
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// 本地主键（UUID v4）
    pub id: String,
    /// Dify 会话 ID
    pub dify_conversation_id: String,
    /// 所属应用 ID
    pub dify_app_id: String,
    pub name: String,
    /// 用户输入参数
    pub inputs: Option<Value>,
    pub status: String,
    /// 开场白
    pub introduction: Option<String>,
    /// 用户标识
    pub user: String,
    /// Dify 创建时间（Unix 秒）
    pub dify_created_at: i64,
    /// Dify 更新时间（Unix 秒）
    pub dify_updated_at: i64,
    /// 本地首次写入时间，未落库时为 None
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl Conversation {
    /// 首次观察到的会话：user 先用应用 ID 占位，等远端返回真实值再覆盖
    pub fn new(dify_conversation_id: impl Into<String>, app: &DifyApp) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            dify_conversation_id: dify_conversation_id.into(),
            dify_app_id: app.id.clone(),
            name: String::new(),
            inputs: None,
            status: String::new(),
            introduction: None,
            user: app.id.clone(),
            dify_created_at: 0,
            dify_updated_at: 0,
            create_time: None,
            update_time: None,
        }
    }
}

impl fmt::Display for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name.is_empty() {
            "unnamed"
        } else {
            &self.name
        };
        write!(f, "Conversation[{}]: {}", self.dify_conversation_id, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_conversation_defaults_user_to_app_id() {
        let app = DifyApp::new("app-1", "Support Bot", "http://localhost", "key");
        let conv = Conversation::new("conv-1", &app);

        assert_eq!(conv.dify_app_id, "app-1");
        assert_eq!(conv.user, "app-1");
        assert_eq!(conv.dify_created_at, 0);
        assert!(conv.create_time.is_none());
        assert_eq!(conv.to_string(), "Conversation[conv-1]: unnamed");
    }
}
