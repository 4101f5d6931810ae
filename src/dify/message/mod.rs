//! 会话消息模块

pub mod dao;
pub mod models;

pub use dao::MessageDao;
pub use models::{ConversationMessage, FEEDBACK_RATINGS};
