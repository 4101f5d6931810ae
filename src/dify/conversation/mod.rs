//! 会话模块
//!
//! Dify 会话的本地模型与持久化

pub mod dao;
pub mod models;

pub use dao::ConversationDao;
pub use models::Conversation;
