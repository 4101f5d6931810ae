//! Dify 会话同步命令行
//!
//! 从本地 `dify_apps` 表读取应用配置，把远端会话和消息同步到 SQLite。
//! 控制台只输出同步报告，详细日志写入 stderr 和日志文件。
//!
//! 命令行不负责登记应用，首次运行前需要在 `--db-url` 指向的库里写入
//! `dify_apps` 行（表结构由迁移自动创建），`valid = 1` 的行才会参与同步：
//!
//! ```sql
//! INSERT INTO dify_apps (id, name, base_url, api_key, valid)
//! VALUES ('app-1', 'Support Bot', 'https://api.dify.ai/v1', 'app-xxxxxxxx', 1);
//! ```
//!
//! `id` 同时作为拉取会话时的 `user` 参数；`base_url` 末尾的 `/` 会被忽略。
//! 没有任何有效应用时输出 `No valid Dify app configuration found` 并以 1 退出。

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use dify_chatflow_sync::dify::app::{AppDao, DifyApp, SqliteAppRegistry};
use dify_chatflow_sync::dify::client::{ClientConfig, DifyApiClient};
use dify_chatflow_sync::dify::db::create_sqlite_pool_with_migration;
use dify_chatflow_sync::dify::sync::{
    format_app_failure, format_app_header, format_conversation_preview, format_message_preview,
    format_summary, ConversationSyncer, SqliteStore, SyncListener, SyncOptions, SyncReport,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// 同步 Dify 会话与消息到本地数据库
#[derive(Parser, Debug)]
#[command(name = "dify-sync")]
#[command(about = "同步 Dify 会话与消息到本地数据库", long_about = None)]
struct Args {
    /// 仅同步指定应用 ID（默认同步所有有效应用）
    app_id: Option<String>,

    /// 每页拉取的会话数
    #[arg(short, long, default_value_t = 100)]
    limit: u32,

    /// 只预览，不写入数据库
    #[arg(long)]
    dry_run: bool,

    /// 每个应用最多拉取的会话页数（默认不限）
    #[arg(long)]
    max_pages: Option<u32>,

    /// SQLite 连接串
    #[arg(long, default_value = "sqlite://dify-sync.db?mode=rwc")]
    db_url: String,

    /// HTTP 请求超时（秒）
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// 日志级别（RUST_LOG 优先）
    #[arg(long, default_value = "info,dify_chatflow_sync=info")]
    log_level: String,

    /// 日志文件路径（追加写入）
    #[arg(long, default_value = "dify-sync.log")]
    log_file: String,
}

/// 初始化日志（同时输出到 stderr 和文件）
fn init_logger(log_level: &str, log_path: &str) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("无法创建日志文件 {}", log_path))?;

    // stdout 留给同步报告
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    info!("[CLI] 📝 日志已同时输出到 stderr 和文件: {}", log_path);
    Ok(())
}

/// 把同步进度打印到控制台
struct ConsoleSyncListener;

#[async_trait]
impl SyncListener for ConsoleSyncListener {
    async fn on_sync_start(&self, app_count: usize) {
        println!("Found {} app(s) to sync", app_count);
    }

    async fn on_no_apps(&self) {
        println!("No valid Dify app configuration found");
    }

    async fn on_app_start(&self, app: &DifyApp) {
        println!();
        println!("{}", format_app_header(app));
        println!("{}", "-".repeat(40));
    }

    async fn on_conversation_preview(&self, conversation_id: &str, name: &str) {
        println!("{}", format_conversation_preview(conversation_id, name));
    }

    async fn on_message_preview(&self, message_id: &str, query_preview: &str) {
        println!("{}", format_message_preview(message_id, query_preview));
    }

    async fn on_app_failed(&self, app: &DifyApp, error: &anyhow::Error) {
        println!("{}", format_app_failure(app, error));
    }

    async fn on_sync_finish(&self, report: &SyncReport) {
        println!();
        println!("{}", format_summary(report));
        if !report.failed_apps.is_empty() {
            println!(
                "{} app(s) failed: {}",
                report.failed_apps.len(),
                report.failed_apps.join(", ")
            );
        }
    }
}

async fn run(args: Args) -> Result<SyncReport> {
    let pool = create_sqlite_pool_with_migration(&args.db_url).await?;
    info!("[CLI] ✅ 数据库已就绪: {}", args.db_url);

    let config = ClientConfig {
        timeout: Duration::from_secs(args.timeout),
        ..Default::default()
    };
    let mut syncer = ConversationSyncer::with_listener(
        Box::new(DifyApiClient::new(config)),
        Arc::new(SqliteStore::new(pool.clone())),
        Arc::new(SqliteAppRegistry::new(AppDao::new(pool))),
        Arc::new(ConsoleSyncListener),
    );

    let options = SyncOptions {
        app_id: args.app_id,
        limit: args.limit,
        dry_run: args.dry_run,
        max_pages: args.max_pages,
    };
    syncer.sync(&options).await
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    init_logger(&args.log_level, &args.log_file)?;

    if args.dry_run {
        println!("Dify conversation sync (dry run)");
    } else {
        println!("Dify conversation sync");
    }
    println!("{}", "=".repeat(40));

    match run(args).await {
        Ok(report) => {
            info!(
                "[CLI] 👋 同步结束: {} 个应用, 失败 {} 个",
                report.apps,
                report.failed_apps.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("[CLI] ❌ 同步中止: {:#}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
