// ==========================================
// 表格导入机器人 - 失败通知网关
// ==========================================
// 职责: 解析失败时向文件负责人发送带标记日志附件的邮件
// 红线: 投递失败只记录日志,绝不向上传播
// 传输: 外部协作方,此处提供日志传输与落盘投递目录两种实现
// ==========================================

use crate::config::NotificationConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// 通知投递错误
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("通知序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("通知写入失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("通知传输失败: {0}")]
    Transport(String),
}

/// 一封待投递的邮件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// SMTP 服务器与端口,由外部邮件程序使用
    pub server: String,
    pub port: u16,
    pub sender_name: String,
    pub sender_account: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachment: Option<PathBuf>,
}

impl NotificationMessage {
    /// 解析失败邮件
    pub fn parse_failure(
        config: &NotificationConfig,
        recipients: Vec<String>,
        alias: &str,
        attachment: &Path,
    ) -> Self {
        Self {
            server: config.server.clone(),
            port: config.port,
            sender_name: config.sender_name.clone(),
            sender_account: config.sender_account.clone(),
            recipients,
            subject: config.subject.clone(),
            body: format!("Planilha: {}.\r\n{}", alias, config.message),
            attachment: Some(attachment.to_path_buf()),
        }
    }
}

// ==========================================
// NotificationGateway Trait
// ==========================================
// 实现者: LoggingGateway, SpoolGateway, 测试中的记录实现
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), NotifyError>;
}

/// 只写日志的传输（未配置投递目录时使用）
pub struct LoggingGateway;

#[async_trait]
impl NotificationGateway for LoggingGateway {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        info!(
            recipients = ?message.recipients,
            subject = %message.subject,
            attachment = ?message.attachment,
            "失败通知（仅记录）"
        );
        Ok(())
    }
}

/// 落盘投递: 每封邮件写成投递目录下一个 JSON 文件,由外部邮件程序发送
pub struct SpoolGateway {
    outbox: PathBuf,
}

impl SpoolGateway {
    pub fn new(outbox: impl Into<PathBuf>) -> Self {
        Self {
            outbox: outbox.into(),
        }
    }
}

#[async_trait]
impl NotificationGateway for SpoolGateway {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        let payload = serde_json::to_vec_pretty(message)?;
        let path = self.outbox.join(format!("{}.json", Uuid::new_v4()));
        tokio::fs::write(&path, payload)
            .await
            .map_err(|source| NotifyError::Io {
                path: path.display().to_string(),
                source,
            })?;
        info!(path = %path.display(), recipients = ?message.recipients, "失败通知已写入投递目录");
        Ok(())
    }
}

/// 按配置选择传输: 配置了投递目录用 SpoolGateway,否则 LoggingGateway
pub fn gateway_for(config: &NotificationConfig) -> Arc<dyn NotificationGateway> {
    match &config.outbox {
        Some(outbox) => Arc::new(SpoolGateway::new(outbox.clone())),
        None => Arc::new(LoggingGateway),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NotificationConfig {
        NotificationConfig {
            enabled: true,
            sender_name: "Robo".to_string(),
            sender_account: "robo@acme.com".to_string(),
            subject: "Falha na importacao".to_string(),
            message: "Verifique o log em anexo.".to_string(),
            server: "smtp.acme.com".to_string(),
            port: 587,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_failure_message() {
        let message = NotificationMessage::parse_failure(
            &config(),
            vec!["ops@acme.com".to_string()],
            "vendas",
            Path::new("/erro/vendas_.log"),
        );

        assert_eq!(message.server, "smtp.acme.com");
        assert_eq!(message.port, 587);
        assert_eq!(message.subject, "Falha na importacao");
        assert_eq!(message.body, "Planilha: vendas.\r\nVerifique o log em anexo.");
        assert_eq!(message.attachment, Some(PathBuf::from("/erro/vendas_.log")));
    }

    #[tokio::test]
    async fn test_spool_gateway_writes_message() {
        let temp = tempfile::TempDir::new().unwrap();
        let gateway = SpoolGateway::new(temp.path());
        let message = NotificationMessage::parse_failure(
            &config(),
            vec!["ops@acme.com".to_string()],
            "vendas",
            Path::new("vendas_.log"),
        );

        gateway.deliver(&message).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let raw = std::fs::read(entries[0].as_ref().unwrap().path()).unwrap();
        let stored: NotificationMessage = serde_json::from_slice(&raw).unwrap();
        assert_eq!(stored, message);
    }

    #[tokio::test]
    async fn test_spool_gateway_missing_outbox_is_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let gateway = SpoolGateway::new(temp.path().join("nao-existe"));
        let message = NotificationMessage::parse_failure(
            &config(),
            vec![],
            "vendas",
            Path::new("vendas_.log"),
        );

        let err = gateway.deliver(&message).await.unwrap_err();
        assert!(matches!(err, NotifyError::Io { .. }));
    }
}
