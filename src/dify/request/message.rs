//! 消息相关请求

use super::{ApiRequest, RequestOptions};
use crate::dify::types::Payload;
use reqwest::Method;
use serde_json::{json, Value};

/// 获取会话历史消息请求
#[derive(Debug, Clone)]
pub struct GetMessagesRequest {
    conversation_id: String,
    user: String,
    first_id: Option<String>,
    limit: u32,
}

impl GetMessagesRequest {
    pub fn new(conversation_id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user: user.into(),
            first_id: None,
            limit: 20,
        }
    }

    /// 当前页第一条消息的 ID，用于向前翻页
    pub fn with_first_id(mut self, first_id: Option<String>) -> Self {
        self.first_id = first_id;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn first_id(&self) -> Option<&str> {
        self.first_id.as_deref()
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

impl ApiRequest for GetMessagesRequest {
    fn request_path(&self) -> String {
        "/messages".to_string()
    }

    fn request_method(&self) -> Method {
        Method::GET
    }

    fn request_options(&self) -> RequestOptions {
        let mut query = Payload::new();
        query.insert("conversation_id".into(), json!(self.conversation_id));
        query.insert("user".into(), json!(self.user));
        query.insert("limit".into(), json!(self.limit));
        if let Some(first_id) = &self.first_id {
            query.insert("first_id".into(), json!(first_id));
        }
        RequestOptions::with_query(query)
    }
}

/// 发送对话消息请求
#[derive(Debug, Clone)]
pub struct ChatMessageRequest {
    query: String,
    user: String,
    response_mode: String,
    inputs: Payload,
    conversation_id: Option<String>,
    files: Vec<Value>,
    auto_generate_name: bool,
}

impl ChatMessageRequest {
    pub fn new(query: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user: user.into(),
            response_mode: "streaming".to_string(),
            inputs: Payload::new(),
            conversation_id: None,
            files: Vec::new(),
            auto_generate_name: true,
        }
    }

    /// `streaming` 或 `blocking`
    pub fn with_response_mode(mut self, response_mode: impl Into<String>) -> Self {
        self.response_mode = response_mode.into();
        self
    }

    pub fn with_inputs(mut self, inputs: Payload) -> Self {
        self.inputs = inputs;
        self
    }

    /// 继续已有会话；不设置时由 Dify 创建新会话
    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_files(mut self, files: Vec<Value>) -> Self {
        self.files = files;
        self
    }

    pub fn with_auto_generate_name(mut self, auto_generate_name: bool) -> Self {
        self.auto_generate_name = auto_generate_name;
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn response_mode(&self) -> &str {
        &self.response_mode
    }

    pub fn inputs(&self) -> &Payload {
        &self.inputs
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn files(&self) -> &[Value] {
        &self.files
    }

    pub fn is_auto_generate_name(&self) -> bool {
        self.auto_generate_name
    }
}

impl ApiRequest for ChatMessageRequest {
    fn request_path(&self) -> String {
        "/chat-messages".to_string()
    }

    fn request_method(&self) -> Method {
        Method::POST
    }

    fn request_options(&self) -> RequestOptions {
        let mut body = Payload::new();
        body.insert("query".into(), json!(self.query));
        body.insert("user".into(), json!(self.user));
        body.insert("response_mode".into(), json!(self.response_mode));
        body.insert("inputs".into(), Value::Object(self.inputs.clone()));
        body.insert("auto_generate_name".into(), json!(self.auto_generate_name));
        if let Some(conversation_id) = &self.conversation_id {
            body.insert("conversation_id".into(), json!(conversation_id));
        }
        if !self.files.is_empty() {
            body.insert("files".into(), Value::Array(self.files.clone()));
        }
        RequestOptions::with_json(Value::Object(body))
    }
}

/// 停止流式响应请求
#[derive(Debug, Clone)]
pub struct StopChatMessageRequest {
    task_id: String,
    user: String,
}

impl StopChatMessageRequest {
    pub fn new(task_id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            user: user.into(),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

impl ApiRequest for StopChatMessageRequest {
    fn request_path(&self) -> String {
        format!("/chat-messages/{}/stop", self.task_id)
    }

    fn request_method(&self) -> Method {
        Method::POST
    }

    fn request_options(&self) -> RequestOptions {
        RequestOptions::with_json(json!({ "user": self.user }))
    }
}

/// 获取下一轮建议问题列表请求
#[derive(Debug, Clone)]
pub struct GetSuggestedQuestionsRequest {
    message_id: String,
    user: String,
}

impl GetSuggestedQuestionsRequest {
    pub fn new(message_id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            user: user.into(),
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

impl ApiRequest for GetSuggestedQuestionsRequest {
    fn request_path(&self) -> String {
        format!("/messages/{}/suggested", self.message_id)
    }

    fn request_method(&self) -> Method {
        Method::GET
    }

    fn request_options(&self) -> RequestOptions {
        let mut query = Payload::new();
        query.insert("user".into(), json!(self.user));
        RequestOptions::with_query(query)
    }
}
