//! 会话相关请求

use super::{ApiRequest, RequestOptions};
use crate::dify::types::Payload;
use reqwest::Method;
use serde_json::{json, Value};

/// 获取会话列表请求
#[derive(Debug, Clone)]
pub struct GetConversationsRequest {
    user: String,
    last_id: Option<String>,
    limit: u32,
    sort_by: String,
}

impl GetConversationsRequest {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            last_id: None,
            limit: 20,
            sort_by: "-updated_at".to_string(),
        }
    }

    /// 上一页最后一条会话的 ID（游标）
    pub fn with_last_id(mut self, last_id: Option<String>) -> Self {
        self.last_id = last_id;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = sort_by.into();
        self
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn last_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn sort_by(&self) -> &str {
        &self.sort_by
    }
}

impl ApiRequest for GetConversationsRequest {
    fn request_path(&self) -> String {
        "/conversations".to_string()
    }

    fn request_method(&self) -> Method {
        Method::GET
    }

    fn request_options(&self) -> RequestOptions {
        let mut query = Payload::new();
        query.insert("user".into(), json!(self.user));
        query.insert("limit".into(), json!(self.limit));
        query.insert("sort_by".into(), json!(self.sort_by));
        if let Some(last_id) = &self.last_id {
            query.insert("last_id".into(), json!(last_id));
        }
        RequestOptions::with_query(query)
    }
}

/// 删除会话请求
#[derive(Debug, Clone)]
pub struct DeleteConversationRequest {
    conversation_id: String,
    user: String,
}

impl DeleteConversationRequest {
    pub fn new(conversation_id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user: user.into(),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

impl ApiRequest for DeleteConversationRequest {
    fn request_path(&self) -> String {
        format!("/conversations/{}", self.conversation_id)
    }

    fn request_method(&self) -> Method {
        Method::DELETE
    }

    fn request_options(&self) -> RequestOptions {
        RequestOptions::with_json(json!({ "user": self.user }))
    }
}

/// 会话重命名请求
#[derive(Debug, Clone)]
pub struct RenameConversationRequest {
    conversation_id: String,
    user: String,
    name: Option<String>,
    auto_generate: bool,
}

impl RenameConversationRequest {
    pub fn new(conversation_id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user: user.into(),
            name: None,
            auto_generate: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 由 Dify 自动生成名称
    pub fn with_auto_generate(mut self, auto_generate: bool) -> Self {
        self.auto_generate = auto_generate;
        self
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_auto_generate(&self) -> bool {
        self.auto_generate
    }
}

impl ApiRequest for RenameConversationRequest {
    fn request_path(&self) -> String {
        format!("/conversations/{}/name", self.conversation_id)
    }

    fn request_method(&self) -> Method {
        Method::POST
    }

    fn request_options(&self) -> RequestOptions {
        let mut body = json!({
            "user": self.user,
            "auto_generate": self.auto_generate,
        });
        if let (Some(name), Value::Object(map)) = (&self.name, &mut body) {
            map.insert("name".into(), json!(name));
        }
        RequestOptions::with_json(body)
    }
}

/// 获取对话变量请求
#[derive(Debug, Clone)]
pub struct GetConversationVariablesRequest {
    conversation_id: String,
    user: String,
    last_id: Option<String>,
    limit: u32,
    variable_name: Option<String>,
}

impl GetConversationVariablesRequest {
    pub fn new(conversation_id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user: user.into(),
            last_id: None,
            limit: 20,
            variable_name: None,
        }
    }

    pub fn with_last_id(mut self, last_id: impl Into<String>) -> Self {
        self.last_id = Some(last_id.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// 按变量名过滤
    pub fn with_variable_name(mut self, variable_name: impl Into<String>) -> Self {
        self.variable_name = Some(variable_name.into());
        self
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn last_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn variable_name(&self) -> Option<&str> {
        self.variable_name.as_deref()
    }
}

impl ApiRequest for GetConversationVariablesRequest {
    fn request_path(&self) -> String {
        format!("/conversations/{}/variables", self.conversation_id)
    }

    fn request_method(&self) -> Method {
        Method::GET
    }

    fn request_options(&self) -> RequestOptions {
        let mut query = Payload::new();
        query.insert("user".into(), json!(self.user));
        query.insert("limit".into(), json!(self.limit));
        if let Some(last_id) = &self.last_id {
            query.insert("last_id".into(), json!(last_id));
        }
        if let Some(variable_name) = &self.variable_name {
            query.insert("variable_name".into(), json!(variable_name));
        }
        RequestOptions::with_query(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_get_conversations_defaults() {
        let request = GetConversationsRequest::new("user-1");

        assert_eq!(request.request_path(), "/conversations");
        assert_eq!(request.request_method(), Method::GET);
        assert_eq!(request.limit(), 20);
        assert_eq!(request.sort_by(), "-updated_at");

        let options = request.request_options();
        assert_eq!(
            options.query,
            Some(
                json!({"user": "user-1", "limit": 20, "sort_by": "-updated_at"})
                    .as_object()
                    .cloned()
                    .unwrap()
            )
        );
        assert_eq!(options.json, None);
        assert_eq!(
            options.headers,
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn test_get_conversations_with_cursor() {
        let request = GetConversationsRequest::new("user-1")
            .with_last_id(Some("conv-9".into()))
            .with_limit(100)
            .with_sort_by("created_at");

        let options = request.request_options();
        assert_eq!(options.query_str("last_id"), Some("conv-9"));
        assert_eq!(options.query_str("sort_by"), Some("created_at"));
        assert_eq!(request.last_id(), Some("conv-9"));
        assert_eq!(request.user(), "user-1");
    }

    #[test]
    fn test_delete_conversation() {
        let request = DeleteConversationRequest::new("conv-1", "user-1");

        assert_eq!(request.request_path(), "/conversations/conv-1");
        assert_eq!(request.request_method(), Method::DELETE);
        assert_eq!(request.request_options().json, Some(json!({"user": "user-1"})));
        assert_eq!(request.conversation_id(), "conv-1");
        assert_eq!(request.user(), "user-1");
    }

    #[test]
    fn test_rename_conversation() {
        let plain = RenameConversationRequest::new("conv-1", "user-1");
        assert_eq!(plain.request_path(), "/conversations/conv-1/name");
        assert_eq!(plain.request_method(), Method::POST);
        assert_eq!(
            plain.request_options().json,
            Some(json!({"user": "user-1", "auto_generate": false}))
        );

        let named = RenameConversationRequest::new("conv-1", "user-1")
            .with_name("Trip planning")
            .with_auto_generate(true);
        assert_eq!(
            named.request_options().json,
            Some(json!({"user": "user-1", "auto_generate": true, "name": "Trip planning"}))
        );
        assert_eq!(named.name(), Some("Trip planning"));
        assert!(named.is_auto_generate());
    }

    #[test]
    fn test_get_conversation_variables() {
        let request = GetConversationVariablesRequest::new("conv-1", "user-1");
        assert_eq!(request.request_path(), "/conversations/conv-1/variables");
        assert_eq!(request.request_method(), Method::GET);
        let options = request.request_options();
        assert_eq!(options.query_str("last_id"), None);
        assert_eq!(options.query_str("variable_name"), None);

        let filtered = GetConversationVariablesRequest::new("conv-1", "user-1")
            .with_last_id("var-3")
            .with_limit(5)
            .with_variable_name("city");
        let options = filtered.request_options();
        assert_eq!(options.query_str("last_id"), Some("var-3"));
        assert_eq!(options.query_str("variable_name"), Some("city"));
        assert_eq!(options.query.as_ref().unwrap()["limit"], json!(5));
        assert_eq!(filtered.variable_name(), Some("city"));
    }
}
