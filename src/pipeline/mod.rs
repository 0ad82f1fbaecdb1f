// ==========================================
// 表格导入机器人 - 处理流水线
// ==========================================
// 组成: IntakeScanner → Dispatcher(有界队列 + 工作池) → FileProcessor → FileLifecycleRouter
// ==========================================

pub mod dispatcher;
pub mod processor;
pub mod scanner;

pub use dispatcher::{Dispatcher, FileHandler, PoolConfig};
pub use processor::FileProcessor;
pub use scanner::IntakeScanner;

use crate::config::IntakeConfig;
use crate::importer::file_parser::WorkbookParser;
use crate::lifecycle::FileLifecycleRouter;
use crate::notify::NotificationGateway;
use crate::registry::SchemaRegistry;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("任务队列已关闭")]
    QueueClosed,
}

/// 按配置装配流水线并运行（单次模式返回,持续模式不返回）
pub async fn run(
    config: &IntakeConfig,
    registry: Arc<SchemaRegistry>,
    parser: Arc<dyn WorkbookParser>,
    gateway: Arc<dyn NotificationGateway>,
) -> Result<(), PipelineError> {
    let router = FileLifecycleRouter::new(
        config.directories.clone(),
        config.notifications.clone(),
        registry.clone(),
        gateway,
    );
    let processor = FileProcessor::new(registry, parser, router, &config.directories);
    let dispatcher = Dispatcher::start(
        Arc::new(processor),
        PoolConfig {
            workers: config.workers,
            queue_capacity: config.queue_capacity,
        },
    );

    let scanner = IntakeScanner::new(&config.directories.intake);
    let result = scanner
        .run(&dispatcher, config.continuous, config.interval())
        .await;

    dispatcher.shutdown().await;
    info!("流水线已停止");
    result
}
