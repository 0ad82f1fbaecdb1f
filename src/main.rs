// ==========================================
// 表格导入机器人 - 主入口
// ==========================================
// 用法: sheet-intake [配置文件路径]
// 启动期错误（配置、元数据工作簿、字典快照）直接退出
// ==========================================

use anyhow::Context;
use sheet_intake::config::IntakeConfig;
use sheet_intake::importer::{ExcelParser, WorkbookParser};
use sheet_intake::registry::SchemaRegistry;
use sheet_intake::{logging, notify, pipeline};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", sheet_intake::APP_NAME);
    tracing::info!("系统版本: {}", sheet_intake::VERSION);
    tracing::info!("==================================================");

    let config_path = IntakeConfig::resolve_path(std::env::args().nth(1));
    let config = IntakeConfig::load(&config_path)
        .with_context(|| format!("无法加载配置: {}", config_path.display()))?;
    tracing::info!(path = %config_path.display(), continuous = config.continuous, "配置已加载");

    if config.create_directories {
        config.ensure_directories().context("目录初始化失败")?;
    }

    let parser: Arc<dyn WorkbookParser> = Arc::new(ExcelParser);
    let workbook_path = config.metadata.workbook_path();
    let registry = SchemaRegistry::load(parser.as_ref(), &workbook_path)
        .with_context(|| format!("无法加载元数据工作簿: {}", workbook_path.display()))?;
    registry
        .write_snapshots(&config.metadata.directory)
        .context("字典快照写入失败")?;

    let gateway = notify::gateway_for(&config.notifications);

    pipeline::run(&config, Arc::new(registry), parser, gateway).await?;

    tracing::info!("处理结束");
    Ok(())
}
