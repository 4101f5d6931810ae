pub mod app;
pub mod client;
pub mod conversation;
pub mod db;
pub mod message;
pub mod request;
pub mod sync;
pub mod types;

// 重新导出同步相关类型
pub use app::{AppRegistry, DifyApp, SqliteAppRegistry};
pub use client::{ApiClient, ClientConfig, DifyApiClient};
pub use sync::{
    ConversationStore, ConversationSyncer, SqliteStore, SyncListener, SyncOptions, SyncReport,
};
