// ==========================================
// 表格导入机器人 - 文件生命周期路由
// ==========================================
// 职责: 按单文件处理结果写出 CSV、迁移原文件、处理标记文件、触发通知
// 路由:
//   Imported                          → imported 目录, 删除标记
//   SchemaUnresolved/ValidationFailed → missing-metadata（可带公司前缀）, 删除标记
//   PriorAttempt                      → missing-metadata（可带公司前缀）, 删除标记
//   ParseError                        → schema-error + 标记改名 + 通知
//                                       （无扩展名形式同时迁往 missing-metadata）
// 迁移: 每个候选名独立尝试,单个失败只记录日志
// ==========================================

use super::csv_export::write_sheet_csv;
use crate::config::{DirectoryConfig, NotificationConfig};
use crate::domain::outcome::{FileOutcome, SheetExport};
use crate::importer::alias_resolver::ResolvedFile;
use crate::importer::attempt_marker::AttemptMarker;
use crate::importer::file_parser::SPREADSHEET_EXTENSIONS;
use crate::notify::{NotificationGateway, NotificationMessage};
use crate::registry::SchemaRegistry;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 原文件最终去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Imported,
    MissingMetadata,
    SchemaError,
    /// CSV 全部写入失败,原文件留在待导入目录等待下一轮
    Retained,
}

/// 路由结果（日志与测试使用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteReport {
    pub destination: Destination,
    pub csv_files: Vec<PathBuf>,
    pub moved: usize,
    pub notified: bool,
}

impl RouteReport {
    fn new(destination: Destination) -> Self {
        Self {
            destination,
            csv_files: Vec::new(),
            moved: 0,
            notified: false,
        }
    }
}

/// 迁移候选名
struct MoveCandidate {
    name: String,
    extensionless: bool,
}

pub struct FileLifecycleRouter {
    directories: DirectoryConfig,
    notifications: NotificationConfig,
    registry: Arc<SchemaRegistry>,
    gateway: Arc<dyn NotificationGateway>,
}

impl FileLifecycleRouter {
    pub fn new(
        directories: DirectoryConfig,
        notifications: NotificationConfig,
        registry: Arc<SchemaRegistry>,
        gateway: Arc<dyn NotificationGateway>,
    ) -> Self {
        Self {
            directories,
            notifications,
            registry,
            gateway,
        }
    }

    /// 按处理结果标签分派
    pub async fn route(
        &self,
        resolved: &ResolvedFile,
        marker: &AttemptMarker,
        outcome: FileOutcome,
    ) -> RouteReport {
        let label = outcome.label();
        let report = match outcome {
            FileOutcome::Imported(exports) => self.route_imported(resolved, marker, &exports),
            FileOutcome::SchemaUnresolved
            | FileOutcome::ValidationFailed { .. }
            | FileOutcome::PriorAttempt => self.route_missing_metadata(resolved, marker),
            FileOutcome::ParseError(_) => self.route_schema_error(resolved, marker).await,
        };

        info!(
            file = %resolved.file_name,
            outcome = label,
            destination = ?report.destination,
            csv_files = report.csv_files.len(),
            moved = report.moved,
            notified = report.notified,
            "文件路由完成"
        );
        report
    }

    fn route_imported(
        &self,
        resolved: &ResolvedFile,
        marker: &AttemptMarker,
        exports: &[SheetExport],
    ) -> RouteReport {
        let base_name = resolved.base_name();
        let mut csv_files = Vec::with_capacity(exports.len());

        for export in exports {
            match write_sheet_csv(&self.directories.generated_csv, export, base_name) {
                Ok(path) => {
                    debug!(path = %path.display(), rows = export.rows.len(), "CSV 已写出");
                    csv_files.push(path);
                }
                Err(e) => {
                    error!(file = %resolved.file_name, sheet = %export.sheet, error = %e, "CSV 写入失败");
                    if let Err(log_err) =
                        marker.record(&format!("[plan: {}] - CSV 写入失败: {}", export.sheet, e))
                    {
                        warn!(error = %log_err, "标记文件写入失败");
                    }
                }
            }
        }

        if csv_files.is_empty() {
            warn!(file = %resolved.file_name, "所有 CSV 写入失败,原文件保留在待导入目录");
            return RouteReport::new(Destination::Retained);
        }

        let moved = self.move_original(resolved, |_| self.directories.imported.clone(), "");
        remove_marker(marker);

        RouteReport {
            destination: Destination::Imported,
            csv_files,
            moved,
            notified: false,
        }
    }

    fn route_missing_metadata(&self, resolved: &ResolvedFile, marker: &AttemptMarker) -> RouteReport {
        let prefix = match self.registry.company_for_alias(&resolved.alias) {
            Some(company) if !company.is_empty() => format!("{}_", company),
            _ => String::new(),
        };

        let moved = self.move_original(
            resolved,
            |_| self.directories.missing_metadata.clone(),
            &prefix,
        );
        remove_marker(marker);

        RouteReport {
            moved,
            ..RouteReport::new(Destination::MissingMetadata)
        }
    }

    async fn route_schema_error(&self, resolved: &ResolvedFile, marker: &AttemptMarker) -> RouteReport {
        // 扩展名形式 → schema-error, 无扩展名形式 → missing-metadata
        let moved = self.move_original(
            resolved,
            |candidate| {
                if candidate.extensionless {
                    self.directories.missing_metadata.clone()
                } else {
                    self.directories.schema_error.clone()
                }
            },
            "",
        );

        let renamed = self
            .directories
            .schema_error
            .join(format!("{}_.log", resolved.base_name()));
        let attachment = match marker.move_to(&renamed) {
            Ok(()) => renamed,
            Err(e) => {
                warn!(
                    from = %marker.path().display(),
                    to = %renamed.display(),
                    error = %e,
                    "标记文件迁移失败"
                );
                marker.path().to_path_buf()
            }
        };

        let notified = self.notify_parse_failure(resolved, &attachment).await;

        RouteReport {
            moved,
            notified,
            ..RouteReport::new(Destination::SchemaError)
        }
    }

    /// 发送解析失败通知,投递失败只记录
    async fn notify_parse_failure(&self, resolved: &ResolvedFile, attachment: &Path) -> bool {
        if !self.notifications.enabled {
            return false;
        }

        let key = resolved.notification_key();
        let recipients = self
            .registry
            .notification(key)
            .map(|binding| binding.recipients())
            .unwrap_or_default();
        if recipients.is_empty() {
            warn!(alias = key, file = %resolved.file_name, "未找到通知收件人,跳过通知");
            return false;
        }

        let message =
            NotificationMessage::parse_failure(&self.notifications, recipients, key, attachment);
        match self.gateway.deliver(&message).await {
            Ok(()) => true,
            Err(e) => {
                warn!(alias = key, file = %resolved.file_name, error = %e, "通知投递失败");
                false
            }
        }
    }

    /// 依次尝试各候选名迁移原文件,返回成功数量
    fn move_original<F>(&self, resolved: &ResolvedFile, target_dir: F, prefix: &str) -> usize
    where
        F: Fn(&MoveCandidate) -> PathBuf,
    {
        let mut moved = 0;
        for candidate in move_candidates(resolved) {
            let from = self.directories.intake.join(&candidate.name);
            let to = target_dir(&candidate).join(format!("{}{}", prefix, candidate.name));
            match fs::rename(&from, &to) {
                Ok(()) => {
                    debug!(from = %from.display(), to = %to.display(), "原文件已迁移");
                    moved += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(from = %from.display(), "候选文件不存在");
                }
                Err(e) => {
                    warn!(from = %from.display(), to = %to.display(), error = %e, "原文件迁移失败");
                }
            }
        }
        moved
    }
}

fn move_candidates(resolved: &ResolvedFile) -> Vec<MoveCandidate> {
    let stem = resolved.source_stem();
    let mut candidates: Vec<MoveCandidate> = SPREADSHEET_EXTENSIONS
        .iter()
        .map(|ext| MoveCandidate {
            name: format!("{}{}", stem, ext),
            extensionless: false,
        })
        .collect();
    candidates.push(MoveCandidate {
        name: stem.to_string(),
        extensionless: true,
    });
    if !candidates.iter().any(|c| c.name == resolved.file_name) {
        candidates.push(MoveCandidate {
            name: resolved.file_name.clone(),
            extensionless: false,
        });
    }
    candidates
}

fn remove_marker(marker: &AttemptMarker) {
    if let Err(e) = marker.remove() {
        warn!(path = %marker.path().display(), error = %e, "标记文件删除失败");
    }
}
