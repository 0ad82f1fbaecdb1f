// ==========================================
// 表格导入机器人 - 单文件处理器
// ==========================================
// 流程: 别名解析 → 打开标记 → 已尝试? → 解析工作簿 → 逐 sheet 重映射 → 路由
// 边界: 解析与重映射在 spawn_blocking 中执行,panic 通过 JoinError 转为 ParseError
// ==========================================

use super::dispatcher::FileHandler;
use crate::config::DirectoryConfig;
use crate::domain::outcome::{FileOutcome, SheetExport, SheetRemap};
use crate::importer::alias_resolver::{AliasResolver, ResolvedFile};
use crate::importer::attempt_marker::AttemptMarker;
use crate::importer::column_remapper::ColumnRemapper;
use crate::importer::file_parser::{is_spreadsheet_name, WorkbookParser};
use crate::lifecycle::{FileLifecycleRouter, RouteReport};
use crate::registry::SchemaRegistry;
use async_trait::async_trait;
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub struct FileProcessor {
    registry: Arc<SchemaRegistry>,
    parser: Arc<dyn WorkbookParser>,
    router: FileLifecycleRouter,
    intake_dir: PathBuf,
    log_dir: PathBuf,
}

impl FileProcessor {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        parser: Arc<dyn WorkbookParser>,
        router: FileLifecycleRouter,
        directories: &DirectoryConfig,
    ) -> Self {
        Self {
            registry,
            parser,
            router,
            intake_dir: directories.intake.clone(),
            log_dir: directories.log.clone(),
        }
    }

    /// 处理单个文件
    ///
    /// # 返回
    /// - Some(RouteReport): 已完成路由
    /// - None: 标记文件无法创建,原文件留在待导入目录
    #[instrument(skip(self))]
    pub async fn process(&self, file_name: &str) -> Option<RouteReport> {
        let resolved = AliasResolver::new(&self.registry).resolve(file_name);
        debug!(alias = %resolved.alias, key = %resolved.registry_key, "别名解析完成");

        let marker = match AttemptMarker::open(&self.log_dir, resolved.base_name()) {
            Ok(marker) => marker,
            Err(e) => {
                error!(error = %e, "标记文件创建失败,跳过该文件");
                return None;
            }
        };

        let attempted = marker.is_attempted().unwrap_or_else(|e| {
            warn!(path = %marker.path().display(), error = %e, "标记文件状态读取失败");
            false
        });

        let outcome = if attempted {
            info!("标记文件已有记录,跳过解析");
            FileOutcome::PriorAttempt
        } else {
            self.evaluate_guarded(&resolved, &marker).await
        };

        Some(self.router.route(&resolved, &marker, outcome).await)
    }

    async fn evaluate_guarded(&self, resolved: &ResolvedFile, marker: &AttemptMarker) -> FileOutcome {
        let registry = self.registry.clone();
        let parser = self.parser.clone();
        let path = self.intake_dir.join(&resolved.file_name);
        let task_resolved = resolved.clone();
        let task_marker = marker.clone();

        let joined = tokio::task::spawn_blocking(move || {
            evaluate(&registry, parser.as_ref(), &path, &task_resolved, &task_marker)
        })
        .await;

        match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                let reason = if e.is_panic() {
                    format!("解析过程异常终止: {}", panic_message(e.into_panic()))
                } else {
                    "解析任务被取消".to_string()
                };
                error!(file = %resolved.file_name, reason = %reason, "单文件处理失败");
                record(
                    marker,
                    &format!(
                        "文件打开失败 [{}]，文件格式不正确。{}",
                        self.intake_dir.join(&resolved.file_name).display(),
                        reason
                    ),
                );
                FileOutcome::ParseError(reason)
            }
        }
    }
}

#[async_trait]
impl FileHandler for FileProcessor {
    async fn handle(&self, file_name: String) {
        self.process(&file_name).await;
    }
}

/// 解析工作簿并逐 sheet 重映射（同步,运行在阻塞线程池）
pub fn evaluate(
    registry: &SchemaRegistry,
    parser: &dyn WorkbookParser,
    path: &Path,
    resolved: &ResolvedFile,
    marker: &AttemptMarker,
) -> FileOutcome {
    if !is_spreadsheet_name(&resolved.file_name) {
        let reason = format!("文件格式不支持: {}", resolved.file_name);
        record(marker, &format!("文件打开失败 [{}]。{}", path.display(), reason));
        return FileOutcome::ParseError(reason);
    }

    let workbook = match parser.open(path) {
        Ok(workbook) => workbook,
        Err(e) => {
            record(
                marker,
                &format!("文件打开失败 [{}]，文件格式不正确。{}", path.display(), e),
            );
            return FileOutcome::ParseError(e.to_string());
        }
    };

    let remapper = ColumnRemapper::new(registry);
    let mut exports = Vec::new();
    let mut missing = Vec::new();

    for sheet in &workbook.sheets {
        match remapper.remap_sheet(&resolved.alias, sheet) {
            SheetRemap::Rows(rows) if !rows.is_empty() => {
                if let Some(binding) = registry.binding(&resolved.alias, &sheet.name) {
                    exports.push(SheetExport {
                        company: binding.company.clone(),
                        group: binding.group.clone(),
                        sheet: sheet.name.clone(),
                        rows,
                    });
                }
            }
            SheetRemap::Rows(_) | SheetRemap::Unresolved => {}
            SheetRemap::MissingRequired(columns) => {
                for column in columns {
                    record(
                        marker,
                        &format!(
                            "[plan: {}] - 列 [{}] 为必填列但不在表格中，请检查该文件的数据字典。",
                            sheet.name, column.source
                        ),
                    );
                    missing.push(column.destination);
                }
            }
        }
    }

    if !exports.is_empty() {
        FileOutcome::Imported(exports)
    } else if !missing.is_empty() {
        FileOutcome::ValidationFailed { missing }
    } else {
        FileOutcome::SchemaUnresolved
    }
}

fn record(marker: &AttemptMarker, message: &str) {
    if let Err(e) = marker.record(message) {
        warn!(path = %marker.path().display(), error = %e, "标记文件写入失败");
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "未知异常".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::error::{ImportError, ImportResult};
    use crate::importer::file_parser::{Sheet, Workbook};
    use tempfile::TempDir;

    struct StaticParser(Workbook);

    impl WorkbookParser for StaticParser {
        fn open(&self, _path: &Path) -> ImportResult<Workbook> {
            Ok(self.0.clone())
        }
    }

    struct BrokenParser;

    impl WorkbookParser for BrokenParser {
        fn open(&self, _path: &Path) -> ImportResult<Workbook> {
            Err(ImportError::ExcelParseError("zip invalido".to_string()))
        }
    }

    fn s(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn registry() -> SchemaRegistry {
        SchemaRegistry::from_workbook(&Workbook {
            sheets: vec![
                Sheet::new(
                    "dicionario",
                    vec![
                        s(&["empresa"]),
                        s(&["acme", "g1", "vendas", "plan1", "", "nome", "Nome", "s", ""]),
                        s(&["acme", "g1", "vendas", "plan2", "", "cod", "Codigo", "o", ""]),
                    ],
                ),
                Sheet::new("email", vec![]),
            ],
        })
        .unwrap()
    }

    fn setup(file_name: &str) -> (TempDir, SchemaRegistry, ResolvedFile, AttemptMarker) {
        let temp = TempDir::new().unwrap();
        let registry = registry();
        let resolved = AliasResolver::new(&registry).resolve(file_name);
        let marker = AttemptMarker::open(temp.path(), resolved.base_name()).unwrap();
        (temp, registry, resolved, marker)
    }

    #[test]
    fn test_evaluate_imported_sheets_only() {
        let (temp, registry, resolved, marker) = setup("vendas.xlsx");
        let parser = StaticParser(Workbook {
            sheets: vec![
                Sheet::new("Plan1", vec![s(&["nome"]), s(&["Ana"])]),
                Sheet::new("Resumo", vec![s(&["total"]), s(&["1"])]),
            ],
        });

        let outcome = evaluate(&registry, &parser, &temp.path().join("vendas.xlsx"), &resolved, &marker);

        match outcome {
            FileOutcome::Imported(exports) => {
                assert_eq!(exports.len(), 1);
                assert_eq!(exports[0].sheet, "Plan1");
                assert_eq!(exports[0].group, "g1");
                assert_eq!(exports[0].rows[1], s(&["Ana", "acme"]));
            }
            other => panic!("expected imported, got {other:?}"),
        }
        assert!(!marker.is_attempted().unwrap());
    }

    #[test]
    fn test_evaluate_missing_required_records_marker() {
        let (temp, registry, resolved, marker) = setup("vendas.xlsx");
        let parser = StaticParser(Workbook {
            sheets: vec![Sheet::new("plan1", vec![s(&["outro"]), s(&["x"])])],
        });

        let outcome = evaluate(&registry, &parser, &temp.path().join("vendas.xlsx"), &resolved, &marker);

        assert_eq!(
            outcome,
            FileOutcome::ValidationFailed {
                missing: vec!["Nome".to_string()]
            }
        );
        let log = std::fs::read_to_string(marker.path()).unwrap();
        assert!(log.contains("[plan: plan1]"));
        assert!(log.contains("[nome]"));
    }

    #[test]
    fn test_evaluate_unregistered_file_is_unresolved() {
        let (temp, registry, resolved, marker) = setup("estoque.xlsx");
        let parser = StaticParser(Workbook {
            sheets: vec![Sheet::new("plan1", vec![s(&["nome"]), s(&["Ana"])])],
        });

        let outcome = evaluate(&registry, &parser, &temp.path().join("estoque.xlsx"), &resolved, &marker);
        assert_eq!(outcome, FileOutcome::SchemaUnresolved);
    }

    #[test]
    fn test_evaluate_open_failure() {
        let (temp, registry, resolved, marker) = setup("vendas.xlsx");

        let outcome = evaluate(&registry, &BrokenParser, &temp.path().join("vendas.xlsx"), &resolved, &marker);

        assert!(matches!(outcome, FileOutcome::ParseError(_)));
        assert!(marker.is_attempted().unwrap());
    }

    #[test]
    fn test_evaluate_unsupported_extension() {
        let (temp, registry, resolved, marker) = setup("vendas.pdf");
        let parser = StaticParser(Workbook::default());

        let outcome = evaluate(&registry, &parser, &temp.path().join("vendas.pdf"), &resolved, &marker);

        assert!(matches!(outcome, FileOutcome::ParseError(_)));
    }

    struct PanickingParser;

    impl WorkbookParser for PanickingParser {
        fn open(&self, _path: &Path) -> ImportResult<Workbook> {
            panic!("celula invalida");
        }
    }

    #[tokio::test]
    async fn test_parser_panic_routes_to_schema_error() {
        use crate::config::NotificationConfig;
        use crate::lifecycle::Destination;
        use crate::notify::LoggingGateway;

        let temp = TempDir::new().unwrap();
        let dir = |name: &str| {
            let path = temp.path().join(name);
            std::fs::create_dir_all(&path).unwrap();
            path
        };
        let directories = DirectoryConfig {
            intake: dir("intake"),
            imported: dir("imported"),
            schema_error: dir("schema_error"),
            missing_metadata: dir("missing_metadata"),
            generated_csv: dir("csv"),
            log: dir("log"),
        };
        std::fs::write(directories.intake.join("vendas.xlsx"), b"x").unwrap();

        let registry = Arc::new(registry());
        let router = FileLifecycleRouter::new(
            directories.clone(),
            NotificationConfig::default(),
            registry.clone(),
            Arc::new(LoggingGateway),
        );
        let processor = FileProcessor::new(registry, Arc::new(PanickingParser), router, &directories);

        let report = processor.process("vendas.xlsx").await.unwrap();

        assert_eq!(report.destination, Destination::SchemaError);
        assert!(directories.schema_error.join("vendas.xlsx").exists());
        let log = std::fs::read_to_string(directories.schema_error.join("vendas_.log")).unwrap();
        assert!(log.contains("celula invalida"));
    }

    #[test]
    fn test_panic_message_extraction() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("boom".to_string())), "boom");
        assert_eq!(panic_message(Box::new(42)), "未知异常");
    }
}
