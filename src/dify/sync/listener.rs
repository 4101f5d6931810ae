//! 同步进度回调接口

use crate::dify::app::DifyApp;
use crate::dify::sync::models::SyncReport;
use crate::dify::types::truncate_chars;
use async_trait::async_trait;

/// dry-run 预览中 query 保留的字符数
pub const QUERY_PREVIEW_CHARS: usize = 50;

/// 同步监听器：命令行用它输出分节标题、dry-run 预览和汇总
#[async_trait]
pub trait SyncListener: Send + Sync {
    /// 已解析出待同步的应用
    async fn on_sync_start(&self, app_count: usize);

    /// 没有任何应用可同步
    async fn on_no_apps(&self);

    /// 开始同步某个应用
    async fn on_app_start(&self, app: &DifyApp);

    /// dry-run 会话预览
    async fn on_conversation_preview(&self, conversation_id: &str, name: &str);

    /// dry-run 消息预览（query 已截断）
    async fn on_message_preview(&self, message_id: &str, query_preview: &str);

    /// 某个应用同步失败（不影响其他应用）
    async fn on_app_failed(&self, app: &DifyApp, error: &anyhow::Error);

    /// 全部应用处理完成
    async fn on_sync_finish(&self, report: &SyncReport);
}

/// 空实现（默认监听器）
pub struct EmptySyncListener;

#[async_trait]
impl SyncListener for EmptySyncListener {
    async fn on_sync_start(&self, _app_count: usize) {}
    async fn on_no_apps(&self) {}
    async fn on_app_start(&self, _app: &DifyApp) {}
    async fn on_conversation_preview(&self, _conversation_id: &str, _name: &str) {}
    async fn on_message_preview(&self, _message_id: &str, _query_preview: &str) {}
    async fn on_app_failed(&self, _app: &DifyApp, _error: &anyhow::Error) {}
    async fn on_sync_finish(&self, _report: &SyncReport) {}
}

/// 会话预览行
pub fn format_conversation_preview(conversation_id: &str, name: &str) -> String {
    format!("Conversation: {} - {}", conversation_id, name)
}

/// 消息预览行：query 截取前 50 个字符，末尾总是带 `...`
pub fn format_message_preview(message_id: &str, query: &str) -> String {
    format!(
        "  Message: {} - {}...",
        message_id,
        truncate_chars(query, QUERY_PREVIEW_CHARS)
    )
}

pub fn format_app_header(app: &DifyApp) -> String {
    format!("Syncing app: {} ({})", app.name, app.id)
}

pub fn format_app_failure(app: &DifyApp, error: &anyhow::Error) -> String {
    format!("App {} sync failed: {:#}", app.name, error)
}

/// 最终汇总行（只统计成功的应用）
pub fn format_summary(report: &SyncReport) -> String {
    format!(
        "Sync finished: {} conversation(s), {} message(s)",
        report.totals.conversations, report.totals.messages
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dify::sync::models::SyncCounts;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_message_preview_truncates_long_query() {
        let query = "q".repeat(80);
        assert_eq!(
            format_message_preview("msg-1", &query),
            format!("  Message: msg-1 - {}...", "q".repeat(50))
        );
    }

    #[test]
    fn test_message_preview_short_query_keeps_ellipsis() {
        assert_eq!(format_message_preview("msg-2", "hi"), "  Message: msg-2 - hi...");
        assert_eq!(format_message_preview("msg-3", ""), "  Message: msg-3 - ...");
    }

    #[test]
    fn test_message_preview_counts_characters() {
        let query = "你".repeat(60);
        let line = format_message_preview("m", &query);
        assert_eq!(line, format!("  Message: m - {}...", "你".repeat(50)));
    }

    #[test]
    fn test_conversation_and_app_lines() {
        let app = DifyApp::new("app-1", "Support Bot", "http://dify.local/v1", "k");
        assert_eq!(
            format_conversation_preview("conv-1", "unknown"),
            "Conversation: conv-1 - unknown"
        );
        assert_eq!(format_app_header(&app), "Syncing app: Support Bot (app-1)");
        assert_eq!(
            format_app_failure(&app, &anyhow::anyhow!("timeout")),
            "App Support Bot sync failed: timeout"
        );
    }

    #[test]
    fn test_summary_line() {
        let report = SyncReport {
            apps: 2,
            failed_apps: vec!["app-2".into()],
            totals: SyncCounts {
                conversations: 1,
                messages: 1,
            },
        };
        assert_eq!(
            format_summary(&report),
            "Sync finished: 1 conversation(s), 1 message(s)"
        );
    }
}
