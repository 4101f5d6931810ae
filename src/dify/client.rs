//! Dify HTTP API 客户端
//!
//! 一个客户端实例在同一时刻只绑定一个应用：`set_app` 会按应用的 API Key
//! 重建带认证头的 reqwest 客户端，之后的请求都发往该应用的 base URL。

use crate::dify::app::DifyApp;
use crate::dify::request::ApiRequest;
use crate::dify::types::handle_http_response;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// HTTP 客户端配置
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// 单次请求超时
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("dify-chatflow-sync/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Dify API 客户端接口
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// 绑定应用的凭据与 base URL
    fn set_app(&mut self, app: &DifyApp) -> Result<()>;

    /// 执行请求，返回解析后的 JSON
    async fn request(&self, request: &dyn ApiRequest) -> Result<Value>;
}

struct BoundApp {
    app_id: String,
    base_url: String,
    client: reqwest::Client,
}

/// 基于 reqwest 的 Dify API 客户端
pub struct DifyApiClient {
    config: ClientConfig,
    bound: Option<BoundApp>,
}

impl DifyApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            bound: None,
        }
    }

    /// 当前绑定的应用 ID
    pub fn app_id(&self) -> Option<&str> {
        self.bound.as_ref().map(|b| b.app_id.as_str())
    }
}

#[async_trait]
impl ApiClient for DifyApiClient {
    fn set_app(&mut self, app: &DifyApp) -> Result<()> {
        // 创建带认证拦截器的 HTTP 客户端（token 通过 default_headers 自动添加）
        let http_client = reqwest::ClientBuilder::new()
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    reqwest::header::HeaderValue::from_str(&format!("Bearer {}", app.api_key))
                        .context("无效的 API Key")?,
                );
                headers
            })
            .user_agent(self.config.user_agent.clone())
            .timeout(self.config.timeout)
            .build()
            .context("创建 HTTP 客户端失败")?;

        info!("[DifyAPI] 绑定应用: {} ({})", app.name, app.id);
        self.bound = Some(BoundApp {
            app_id: app.id.clone(),
            base_url: app.base_url.trim_end_matches('/').to_string(),
            client: http_client,
        });
        Ok(())
    }

    async fn request(&self, request: &dyn ApiRequest) -> Result<Value> {
        let bound = self
            .bound
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("尚未绑定 Dify 应用，无法发送请求"))?;

        let method = request.request_method();
        let path = request.request_path();
        let options = request.request_options();
        let url = format!("{}{}", bound.base_url, path);
        let operation_name = format!("{} {}", method, path);

        debug!("[DifyAPI] 📡 {} {}", method, url);

        let mut builder = bound.client.request(method, &url);
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if options.query.is_some() {
            builder = builder.query(&options.query_pairs());
        }
        if let Some(body) = &options.json {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("请求失败: {}", operation_name))?;

        handle_http_response(response, &operation_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dify::request::{DeleteConversationRequest, GetConversationsRequest};
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn app_for(server: &Server) -> DifyApp {
        DifyApp::new("app-1", "Support Bot", format!("{}/v1/", server.url()), "key-1")
    }

    #[tokio::test]
    async fn test_request_without_app_fails() {
        let client = DifyApiClient::new(ClientConfig::default());
        let result = client.request(&GetConversationsRequest::new("u")).await;
        assert!(result.is_err());
        assert_eq!(client.app_id(), None);
    }

    #[tokio::test]
    async fn test_get_sends_auth_header_and_query() -> Result<()> {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/conversations")
            .match_header("authorization", "Bearer key-1")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("user".into(), "app-1".into()),
                Matcher::UrlEncoded("limit".into(), "100".into()),
                Matcher::UrlEncoded("sort_by".into(), "-updated_at".into()),
                Matcher::UrlEncoded("last_id".into(), "conv-9".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"limit": 100, "has_more": false, "data": []}"#)
            .create_async()
            .await;

        let mut client = DifyApiClient::new(ClientConfig::default());
        client.set_app(&app_for(&server))?;
        assert_eq!(client.app_id(), Some("app-1"));

        let request = GetConversationsRequest::new("app-1")
            .with_last_id(Some("conv-9".into()))
            .with_limit(100);
        let body = client.request(&request).await?;

        assert_eq!(body, json!({"limit": 100, "has_more": false, "data": []}));
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_sends_json_body() -> Result<()> {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/v1/conversations/conv-1")
            .match_body(Matcher::Json(json!({"user": "end-user"})))
            .with_status(200)
            .with_body(r#"{"result": "success"}"#)
            .create_async()
            .await;

        let mut client = DifyApiClient::new(ClientConfig::default());
        client.set_app(&app_for(&server))?;
        let body = client
            .request(&DeleteConversationRequest::new("conv-1", "end-user"))
            .await?;

        assert_eq!(body["result"], json!("success"));
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_error_status_carries_dify_message() -> Result<()> {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/v1/conversations/missing")
            .with_status(404)
            .with_body(r#"{"code": "not_found", "message": "Conversation Not Exists.", "status": 404}"#)
            .create_async()
            .await;

        let mut client = DifyApiClient::new(ClientConfig::default());
        client.set_app(&app_for(&server))?;
        let err = client
            .request(&DeleteConversationRequest::new("missing", "end-user"))
            .await
            .unwrap_err();

        let text = err.to_string();
        assert!(text.contains("not_found"), "{}", text);
        assert!(text.contains("Conversation Not Exists."), "{}", text);
        Ok(())
    }
}
