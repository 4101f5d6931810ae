//! Dify 应用模块
//!
//! 应用是同步的租户上下文：每个应用有独立的 base URL 和 API Key，
//! 同步下来的会话和消息都归属于某一个应用。

pub mod dao;
pub mod models;
pub mod registry;

pub use dao::AppDao;
pub use models::DifyApp;
pub use registry::{AppRegistry, SqliteAppRegistry};
