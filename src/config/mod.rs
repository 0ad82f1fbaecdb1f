// ==========================================
// 表格导入机器人 - 配置层
// ==========================================
// 职责: 运行配置加载、校验、目录初始化
// 存储: JSON 配置文件
// ==========================================

pub mod intake_config;

// 重导出核心配置类型
pub use intake_config::{
    ConfigError, DirectoryConfig, IntakeConfig, MetadataConfig, NotificationConfig,
    CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE,
};
