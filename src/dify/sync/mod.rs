//! 会话同步模块
//!
//! 按应用逐页拉取 Dify 会话，再逐个会话拉取消息，映射为本地记录后
//! 按应用批量落库；dry-run 模式只输出预览，不触碰存储。

pub mod listener;
pub mod models;
pub mod service;
pub mod store;

pub use listener::{
    format_app_failure, format_app_header, format_conversation_preview, format_message_preview,
    format_summary, EmptySyncListener, SyncListener,
};
pub use models::{SyncCounts, SyncOptions, SyncReport};
pub use service::ConversationSyncer;
pub use store::{ConversationStore, PendingWrites, SqliteStore};
