pub mod dify;

// 重新导出常用类型和函数，方便外部使用
pub use dify::{
    app::{AppDao, DifyApp, SqliteAppRegistry},
    client::{ClientConfig, DifyApiClient},
    db::create_sqlite_pool_with_migration,
    sync::{ConversationSyncer, SqliteStore, SyncListener, SyncOptions, SyncReport},
};
