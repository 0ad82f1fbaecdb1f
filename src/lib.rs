// ==========================================
// 表格导入机器人 - 核心库
// ==========================================
// 职责: 按元数据工作簿把上传的表格重映射为 CSV,并按处理结果归档原文件
// 技术栈: tokio + calamine + csv + tracing
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 元数据规则与处理结果
pub mod domain;

// 配置层 - 运行配置
pub mod config;

// 日志系统
pub mod logging;

// 导入层 - 工作簿解析、别名解析、列重映射
pub mod importer;

// 注册表 - 元数据工作簿加载与查询
pub mod registry;

// 生命周期 - CSV 导出与原文件归档
pub mod lifecycle;

// 通知 - 解析失败邮件
pub mod notify;

// 流水线 - 扫描、分发、工作池
pub mod pipeline;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::{ConfigError, IntakeConfig};
pub use domain::{ColumnType, CompanyBinding, FileOutcome, NotificationBinding, Requirement, SchemaRule};
pub use importer::{AliasResolver, ColumnRemapper, ExcelParser, ImportError, WorkbookParser};
pub use lifecycle::{Destination, FileLifecycleRouter};
pub use notify::{NotificationGateway, NotificationMessage, NotifyError};
pub use pipeline::{Dispatcher, FileProcessor, IntakeScanner, PipelineError};
pub use registry::{RegistryError, SchemaRegistry};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "表格导入机器人";
