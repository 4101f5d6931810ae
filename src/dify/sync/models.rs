//! 同步配置与结果

use serde::Serialize;
use std::ops::AddAssign;

/// 每页会话数默认值
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// 每个会话一次性拉取的消息上限
pub const MESSAGE_FETCH_LIMIT: u32 = 1000;

/// 同步选项
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// 仅同步指定应用；None 表示所有有效应用
    pub app_id: Option<String>,
    /// 每页会话数
    pub limit: u32,
    /// 只预览不落库
    pub dry_run: bool,
    /// 每个应用最多拉取的会话页数；None 表示直到远端 `has_more` 为 false
    pub max_pages: Option<u32>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            app_id: None,
            limit: DEFAULT_PAGE_LIMIT,
            dry_run: false,
            max_pages: None,
        }
    }
}

/// 会话数与消息数计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounts {
    pub conversations: u64,
    pub messages: u64,
}

impl AddAssign for SyncCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.conversations += rhs.conversations;
        self.messages += rhs.messages;
    }
}

/// 一次同步的汇总结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// 解析到的应用数
    pub apps: usize,
    /// 失败的应用 ID
    pub failed_apps: Vec<String>,
    /// 仅统计成功应用
    pub totals: SyncCounts,
}
