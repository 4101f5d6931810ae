//! 应用本地模型定义

use serde::{Deserialize, Serialize};

/// Dify 应用配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifyApp {
    /// 应用 ID，同时作为拉取会话时的 user 标识
    pub id: String,
    pub name: String,
    /// API 基础地址，例如 `https://api.dify.ai/v1`
    pub base_url: String,
    pub api_key: String,
    /// 是否参与同步
    pub valid: bool,
}

impl DifyApp {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            valid: true,
        }
    }
}
