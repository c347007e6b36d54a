/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::orchestrator::batch_processor::{BatchItem, BatchStats};

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    // 测试中可能被多次调用，重复初始化直接忽略
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config, command: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 Subnoto 嵌入签署演示 - {}", command);
    info!("🌐 API: {}", config.api_base_url);
    info!("🗂️ 工作区: {}", truncate_uuid(&config.workspace_uuid, 12));
    info!("{}", "=".repeat(60));
}

/// 记录批次中单个信封的结果
pub fn log_batch_item(index: usize, total: usize, item: &BatchItem) {
    match item {
        BatchItem::Created {
            envelope_uuid,
            title,
            ..
        } => info!(
            "[信封 {}/{}] ✓ {} ({})",
            index,
            total,
            title,
            truncate_uuid(envelope_uuid, 12)
        ),
        BatchItem::Failed { error } => {
            info!("[信封 {}/{}] ✗ {}", index, total, truncate_text(error, 80))
        }
    }
}

/// 打印批次统计信息
pub fn print_batch_stats(stats: &BatchStats) {
    info!("\n{}", "=".repeat(60));
    info!("📊 批量创建完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", stats.success, stats.total);
    info!("❌ 失败: {}", stats.failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

/// 截断信封 ID，末尾加 `…`
pub fn truncate_uuid(uuid: &str, length: usize) -> String {
    if uuid.chars().count() <= length {
        return uuid.to_string();
    }
    uuid.chars().take(length).collect::<String>() + "…"
}
