//! Dify REST API 请求对象
//!
//! 每个请求描述固定的路径模板、HTTP 方法以及 header/query/body 形状，
//! 由 [`crate::dify::client::ApiClient`] 负责真正发送。

pub mod conversation;
pub mod message;

use crate::dify::types::Payload;
use reqwest::Method;
use serde_json::Value;

pub use conversation::{
    DeleteConversationRequest, GetConversationVariablesRequest, GetConversationsRequest,
    RenameConversationRequest,
};
pub use message::{
    ChatMessageRequest, GetMessagesRequest, GetSuggestedQuestionsRequest, StopChatMessageRequest,
};

/// 请求选项：header、query 参数和 JSON body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub query: Option<Payload>,
    pub json: Option<Value>,
}

impl RequestOptions {
    /// 仅带 query 参数的选项
    pub fn with_query(query: Payload) -> Self {
        Self {
            headers: json_content_type(),
            query: Some(query),
            json: None,
        }
    }

    /// 仅带 JSON body 的选项
    pub fn with_json(body: Value) -> Self {
        Self {
            headers: json_content_type(),
            query: None,
            json: Some(body),
        }
    }

    /// 取出 query 中的字符串参数
    pub fn query_str(&self, key: &str) -> Option<&str> {
        self.query.as_ref()?.get(key)?.as_str()
    }

    /// 把 query 转换为 reqwest 可用的键值对
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .iter()
            .flat_map(|q| q.iter())
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()
    }
}

fn json_content_type() -> Vec<(String, String)> {
    vec![("Content-Type".to_string(), "application/json".to_string())]
}

/// Dify API 请求
pub trait ApiRequest: Send + Sync {
    /// 相对于应用 base URL 的路径
    fn request_path(&self) -> String;

    fn request_method(&self) -> Method;

    fn request_options(&self) -> RequestOptions;
}
