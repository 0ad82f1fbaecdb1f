// ==========================================
// 表格导入机器人 - 运行配置
// ==========================================
// 存储: JSON 配置文件（默认 config.json）
// 职责: 目录角色、调度参数、通知参数
// ==========================================

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 配置文件路径环境变量
pub const CONFIG_PATH_ENV: &str = "SHEET_INTAKE_CONFIG";

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// 配置错误（启动期致命）
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置读取失败 ({path}): {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("配置解析失败 ({path}): {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("配置值非法 (key: {key}): {message}")]
    Invalid { key: String, message: String },

    #[error("目录创建失败 ({path}): {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ==========================================
// IntakeConfig - 顶层配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// 启动时是否创建全部目录
    #[serde(default)]
    pub create_directories: bool,

    /// 持续运行模式（否则扫描一次后退出）
    #[serde(default)]
    pub continuous: bool,

    /// 持续模式下两次扫描间隔（秒）
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// 工作者数量
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// 任务队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    pub directories: DirectoryConfig,

    pub metadata: MetadataConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// 目录角色
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    pub intake: PathBuf,
    pub imported: PathBuf,
    pub schema_error: PathBuf,
    pub missing_metadata: PathBuf,
    pub generated_csv: PathBuf,
    pub log: PathBuf,
}

impl DirectoryConfig {
    /// (配置键, 路径) 列表，用于校验与创建
    pub fn roles(&self) -> [(&'static str, &Path); 6] {
        [
            ("directories.intake", self.intake.as_path()),
            ("directories.imported", self.imported.as_path()),
            ("directories.schema_error", self.schema_error.as_path()),
            ("directories.missing_metadata", self.missing_metadata.as_path()),
            ("directories.generated_csv", self.generated_csv.as_path()),
            ("directories.log", self.log.as_path()),
        ]
    }
}

/// 元数据工作簿位置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    pub directory: PathBuf,
    pub file_name: String,
}

impl MetadataConfig {
    pub fn workbook_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// 失败通知参数
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub sender_account: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub port: u16,
    /// 投递目录（设置后邮件以 JSON 形式落盘，交由外部发送）
    #[serde(default)]
    pub outbox: Option<PathBuf>,
}

fn default_interval_secs() -> u64 {
    60
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    50
}

impl IntakeConfig {
    /// 从 JSON 文件加载并校验
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&raw).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// 从 JSON 文本解析并校验
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: IntakeConfig =
            serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
                path: "<inline>".to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// 配置文件路径: 命令行第一个参数 > 环境变量 > config.json
    pub fn resolve_path(cli_arg: Option<String>) -> PathBuf {
        cli_arg
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid {
                key: "workers".to_string(),
                message: "至少需要一个工作者".to_string(),
            });
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "queue_capacity".to_string(),
                message: "队列容量必须大于 0".to_string(),
            });
        }
        for (key, path) in self.directories.roles() {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid {
                    key: key.to_string(),
                    message: "目录路径为空".to_string(),
                });
            }
        }
        if self.metadata.file_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "metadata.file_name".to_string(),
                message: "元数据文件名为空".to_string(),
            });
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// 创建全部目录角色（幂等）
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        for (_, path) in self.directories.roles() {
            fs::create_dir_all(path).map_err(|source| ConfigError::CreateDir {
                path: path.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }
}
