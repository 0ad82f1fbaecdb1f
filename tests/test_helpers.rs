// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 内存工作簿解析器、记录型通知网关、临时目录布局、示例字典
// ==========================================

#![allow(dead_code)]

use async_trait::async_trait;
use sheet_intake::config::{DirectoryConfig, IntakeConfig, MetadataConfig, NotificationConfig};
use sheet_intake::importer::{ImportError, ImportResult, Sheet, Workbook, WorkbookParser};
use sheet_intake::notify::{NotificationGateway, NotificationMessage, NotifyError};
use sheet_intake::registry::SchemaRegistry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

/// 字符串切片转一行
pub fn row(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// 按文件名返回预置工作簿的解析器；未登记的文件视为损坏
#[derive(Default)]
pub struct MemoryParser {
    workbooks: Mutex<HashMap<String, Workbook>>,
    opened: AtomicUsize,
}

impl MemoryParser {
    pub fn insert(&self, file_name: &str, sheets: Vec<Sheet>) {
        self.workbooks
            .lock()
            .unwrap()
            .insert(file_name.to_string(), Workbook { sheets });
    }

    /// open 被调用的次数
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl WorkbookParser for MemoryParser {
    fn open(&self, path: &Path) -> ImportResult<Workbook> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.workbooks
            .lock()
            .unwrap()
            .get(&name)
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError(format!("工作簿损坏: {}", name)))
    }
}

/// 记录所有投递的通知
#[derive(Default)]
pub struct RecordingGateway {
    pub sent: Mutex<Vec<NotificationMessage>>,
}

impl RecordingGateway {
    pub fn messages(&self) -> Vec<NotificationMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// 示例元数据工作簿
///
/// - acme / g1 / vendas / plan1: nome → Nome (必填)
/// - acme / g2 / estoque / plan1: item → Item (必填), saldo → Saldo (默认填充, 数值), obs → Obs (默认填充)
/// - 通知: vendas → ops@acme.com
pub fn sample_registry() -> SchemaRegistry {
    SchemaRegistry::from_workbook(&Workbook {
        sheets: vec![
            Sheet::new(
                "dicionario",
                vec![
                    row(&["empresa", "agrupador", "arquivo", "planilha", "caminho", "origem", "destino", "obrigatorio", "tipo"]),
                    row(&["acme", "g1", "vendas", "plan1", "", "nome", "Nome", "s", ""]),
                    row(&["acme", "g2", "estoque*", "plan1", "", "item", "Item", "s", ""]),
                    row(&["acme", "g2", "estoque*", "plan1", "", "saldo", "Saldo", "", "n"]),
                    row(&["acme", "g2", "estoque*", "plan1", "", "obs", "Obs", "", ""]),
                ],
            ),
            Sheet::new(
                "email",
                vec![
                    row(&["empresa", "arquivo", "email1", "email2", "email3"]),
                    row(&["acme", "vendas", "ops@acme.com", "", ""]),
                ],
            ),
        ],
    })
    .unwrap()
}

/// 临时目录布局 + 配置
pub struct TestEnv {
    _temp: TempDir,
    pub config: IntakeConfig,
}

impl TestEnv {
    pub fn new(notifications_enabled: bool) -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let config = IntakeConfig {
            create_directories: true,
            continuous: false,
            interval_secs: 1,
            workers: 4,
            queue_capacity: 50,
            directories: DirectoryConfig {
                intake: root.join("entrada"),
                imported: root.join("importados"),
                schema_error: root.join("erro_schema"),
                missing_metadata: root.join("sem_metadados"),
                generated_csv: root.join("csv"),
                log: root.join("log"),
            },
            metadata: MetadataConfig {
                directory: root.join("metadados"),
                file_name: "dicionario.xlsx".to_string(),
            },
            notifications: NotificationConfig {
                enabled: notifications_enabled,
                sender_name: "Robo".to_string(),
                sender_account: "robo@acme.com".to_string(),
                subject: "Falha na importacao".to_string(),
                message: "Verifique o log em anexo.".to_string(),
                ..Default::default()
            },
        };
        config.ensure_directories().unwrap();

        Self {
            _temp: temp,
            config,
        }
    }

    pub fn dirs(&self) -> &DirectoryConfig {
        &self.config.directories
    }

    /// 在待导入目录（或其子目录）放入文件
    pub fn drop_file(&self, relative: &str) -> PathBuf {
        let path = self.dirs().intake.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, b"conteudo").unwrap();
        path
    }

    /// 目录下的文件名（排序）
    pub fn files_in(&self, dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn read_csv(&self, name: &str) -> String {
        fs::read_to_string(self.dirs().generated_csv.join(name)).unwrap()
    }
}
