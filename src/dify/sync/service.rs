//! 会话同步服务层
//!
//! 游标分页：每页请求带上上一页最后一个会话的 ID 作为 `last_id`，
//! 只有两种终止条件：返回的 data 为空，或 `has_more` 不为 true。

use crate::dify::app::{AppRegistry, DifyApp};
use crate::dify::client::ApiClient;
use crate::dify::conversation::Conversation;
use crate::dify::message::ConversationMessage;
use crate::dify::request::{GetConversationsRequest, GetMessagesRequest};
use crate::dify::sync::listener::{EmptySyncListener, SyncListener, QUERY_PREVIEW_CHARS};
use crate::dify::sync::models::{SyncCounts, SyncOptions, SyncReport, MESSAGE_FETCH_LIMIT};
use crate::dify::sync::store::{ConversationStore, PendingWrites};
use crate::dify::types::{
    extract_feedback_rating, extract_int, extract_string, extract_structured, into_payload,
    truncate_chars, Payload,
};
use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 会话同步器
pub struct ConversationSyncer {
    /// Dify API 客户端
    api: Box<dyn ApiClient>,
    /// 会话/消息存储
    store: Arc<dyn ConversationStore>,
    /// 应用注册表
    registry: Arc<dyn AppRegistry>,
    listener: Arc<dyn SyncListener>,
}

impl ConversationSyncer {
    /// 创建新的会话同步器（使用默认空监听器）
    pub fn new(
        api: Box<dyn ApiClient>,
        store: Arc<dyn ConversationStore>,
        registry: Arc<dyn AppRegistry>,
    ) -> Self {
        Self::with_listener(api, store, registry, Arc::new(EmptySyncListener))
    }

    /// 创建新的会话同步器（带自定义监听器）
    pub fn with_listener(
        api: Box<dyn ApiClient>,
        store: Arc<dyn ConversationStore>,
        registry: Arc<dyn AppRegistry>,
        listener: Arc<dyn SyncListener>,
    ) -> Self {
        Self {
            api,
            store,
            registry,
            listener,
        }
    }

    /// 同步所有选中的应用
    ///
    /// 没有解析到任何应用时返回错误；单个应用失败只记录日志并跳过，
    /// 汇总中只包含成功应用的计数。
    pub async fn sync(&mut self, options: &SyncOptions) -> Result<SyncReport> {
        let apps = self
            .registry
            .apps_to_sync(options.app_id.as_deref())
            .await?;
        if apps.is_empty() {
            error!("[DifySync] 未找到有效的Dify应用配置");
            self.listener.on_no_apps().await;
            anyhow::bail!("未找到有效的Dify应用配置");
        }

        info!(
            "[DifySync] 🔄 开始同步，共 {} 个应用，limit={}, dry_run={}",
            apps.len(),
            options.limit,
            options.dry_run
        );
        self.listener.on_sync_start(apps.len()).await;

        let mut report = SyncReport {
            apps: apps.len(),
            ..Default::default()
        };

        for app in &apps {
            self.listener.on_app_start(app).await;
            match self.sync_app(app, options).await {
                Ok(counts) => {
                    info!(
                        "[DifySync] ✅ 应用 {} 同步完成: {} 个会话, {} 条消息",
                        app.name, counts.conversations, counts.messages
                    );
                    report.totals += counts;
                }
                Err(e) => {
                    error!("[DifySync] 应用 {} 同步失败: {:#}", app.name, e);
                    self.listener.on_app_failed(app, &e).await;
                    report.failed_apps.push(app.id.clone());
                }
            }
        }

        self.listener.on_sync_finish(&report).await;
        Ok(report)
    }

    /// 同步单个应用：绑定客户端、走完分页、非 dry-run 时一次性提交
    async fn sync_app(&mut self, app: &DifyApp, options: &SyncOptions) -> Result<SyncCounts> {
        if app.id.is_empty() {
            anyhow::bail!("App ID cannot be empty");
        }
        self.api.set_app(app)?;

        let mut writes = PendingWrites::new();
        let counts = self
            .process_paginated_conversations(app, options, &mut writes)
            .await?;

        if !options.dry_run {
            self.store.flush(writes).await?;
        }
        Ok(counts)
    }

    async fn process_paginated_conversations(
        &self,
        app: &DifyApp,
        options: &SyncOptions,
        writes: &mut PendingWrites,
    ) -> Result<SyncCounts> {
        let mut counts = SyncCounts::default();
        let mut last_id: Option<String> = None;
        let mut pages: u32 = 0;

        loop {
            if let Some(max_pages) = options.max_pages {
                if pages >= max_pages {
                    warn!(
                        "[DifySync] ⚠️ 应用 {} 已达到最大页数 {}，停止分页",
                        app.name, max_pages
                    );
                    break;
                }
            }

            let page = self
                .fetch_conversations(&app.id, last_id.clone(), options.limit)
                .await?;
            pages += 1;

            let items = match page.get("data") {
                Some(Value::Array(items)) if !items.is_empty() => items,
                _ => {
                    debug!("[DifySync] 第 {} 页没有会话数据，结束分页", pages);
                    break;
                }
            };
            debug!(
                "[DifySync] 第 {} 页，会话数: {}, last_id={:?}",
                pages,
                items.len(),
                last_id
            );

            counts += self
                .process_conversation_batch(app, items, options.dry_run, writes)
                .await?;

            last_id = next_page_id(&page);
            if last_id.is_none() {
                break;
            }
        }

        Ok(counts)
    }

    async fn process_conversation_batch(
        &self,
        app: &DifyApp,
        items: &[Value],
        dry_run: bool,
        writes: &mut PendingWrites,
    ) -> Result<SyncCounts> {
        let mut counts = SyncCounts::default();

        for item in items {
            let Some(data) = item.as_object() else {
                continue;
            };
            let Some(conversation_id) = extract_string(data, "id", None) else {
                continue;
            };

            if dry_run {
                let name = extract_string(data, "name", Some("unknown")).unwrap_or_default();
                self.listener
                    .on_conversation_preview(&conversation_id, &name)
                    .await;
            } else {
                self.save_conversation(app, &conversation_id, data, writes)
                    .await?;
            }
            counts.conversations += 1;

            counts.messages += self
                .process_conversation_messages(app, &conversation_id, dry_run, writes)
                .await?;
        }

        Ok(counts)
    }

    async fn process_conversation_messages(
        &self,
        app: &DifyApp,
        conversation_id: &str,
        dry_run: bool,
        writes: &mut PendingWrites,
    ) -> Result<u64> {
        let page = self.fetch_messages(conversation_id, &app.id).await?;
        let Some(Value::Array(items)) = page.get("data") else {
            return Ok(0);
        };

        let mut count = 0;
        for item in items {
            let Some(data) = item.as_object() else {
                continue;
            };
            let Some(message_id) = extract_string(data, "id", None) else {
                continue;
            };

            if dry_run {
                let query = extract_string(data, "query", Some("")).unwrap_or_default();
                self.listener
                    .on_message_preview(&message_id, truncate_chars(&query, QUERY_PREVIEW_CHARS))
                    .await;
            } else {
                self.save_message(app, &message_id, data, writes).await?;
            }
            count += 1;
        }

        Ok(count)
    }

    async fn fetch_conversations(
        &self,
        user: &str,
        last_id: Option<String>,
        limit: u32,
    ) -> Result<Payload> {
        let request = GetConversationsRequest::new(user)
            .with_last_id(last_id)
            .with_limit(limit);
        into_payload(self.api.request(&request).await?)
    }

    async fn fetch_messages(&self, conversation_id: &str, user: &str) -> Result<Payload> {
        let request =
            GetMessagesRequest::new(conversation_id, user).with_limit(MESSAGE_FETCH_LIMIT);
        into_payload(self.api.request(&request).await?)
    }

    async fn save_conversation(
        &self,
        app: &DifyApp,
        conversation_id: &str,
        data: &Payload,
        writes: &mut PendingWrites,
    ) -> Result<()> {
        let mut conversation = match writes.conversation(conversation_id) {
            Some(queued) => queued.clone(),
            None => match self.store.find_conversation(conversation_id).await? {
                Some(existing) => existing,
                None => Conversation::new(conversation_id, app),
            },
        };

        map_conversation_data(&mut conversation, data);
        writes.persist_conversation(conversation);
        Ok(())
    }

    async fn save_message(
        &self,
        app: &DifyApp,
        message_id: &str,
        data: &Payload,
        writes: &mut PendingWrites,
    ) -> Result<()> {
        let mut message = match writes.message(message_id) {
            Some(queued) => queued.clone(),
            None => match self.store.find_message(message_id).await? {
                Some(existing) => existing,
                None => ConversationMessage::new(message_id, app),
            },
        };

        map_message_data(&mut message, data);
        writes.persist_message(message);
        Ok(())
    }
}

/// 下一页游标：`has_more` 为 true 时取本页最后一个会话的 ID
fn next_page_id(page: &Payload) -> Option<String> {
    if page.get("has_more") != Some(&Value::Bool(true)) {
        return None;
    }
    page.get("data")?
        .as_array()?
        .last()?
        .as_object()?
        .get("id")?
        .as_str()
        .map(str::to_string)
}

fn map_conversation_data(conversation: &mut Conversation, data: &Payload) {
    conversation.name = extract_string(data, "name", Some("")).unwrap_or_default();
    conversation.status = extract_string(data, "status", Some("")).unwrap_or_default();
    conversation.introduction = extract_string(data, "introduction", None);
    conversation.inputs = extract_structured(data, "inputs");
    conversation.dify_created_at = extract_int(data, "created_at", 0);
    conversation.dify_updated_at = extract_int(data, "updated_at", 0);

    // 远端带 user 时才覆盖，否则保留原值（新会话为应用 ID）
    if let Some(user) = extract_string(data, "user", None) {
        conversation.user = user;
    }
}

fn map_message_data(message: &mut ConversationMessage, data: &Payload) {
    message.dify_conversation_id =
        extract_string(data, "conversation_id", Some("")).unwrap_or_default();
    message.query = extract_string(data, "query", Some("")).unwrap_or_default();
    message.answer = extract_string(data, "answer", Some("")).unwrap_or_default();
    message.user = extract_string(data, "user", Some("")).unwrap_or_default();
    message.dify_created_at = extract_int(data, "created_at", 0);

    message.inputs = extract_structured(data, "inputs");
    message.message_files = extract_structured(data, "message_files");
    message.retriever_resources = extract_structured(data, "retriever_resources");

    // 评分合法性由存储层在提交时校验
    message.feedback_rating = extract_feedback_rating(data);
}
