// ==========================================
// 表格导入机器人 - 字典注册表
// ==========================================
// 来源: 元数据工作簿（sheet 1: 列映射字典, sheet 2: 通知邮箱）
// 生命周期: 启动时构建一次,之后只读,持续模式下也不重新加载
// 并发: 通过 Arc 共享给所有工作者,无需加锁
// ==========================================

pub mod snapshot;

use crate::domain::schema::{
    binding_key, ColumnType, CompanyBinding, NotificationBinding, Requirement, SchemaRule,
};
use crate::importer::alias_resolver::normalize_dashes;
use crate::importer::error::ImportError;
use crate::importer::file_parser::{Sheet, Workbook, WorkbookParser};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument};

pub use snapshot::{SNAPSHOT_ALIASES, SNAPSHOT_COMPANIES, SNAPSHOT_GROUPS, SNAPSHOT_NOTIFICATIONS};

/// 注册表加载错误（启动期致命）
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("元数据工作簿打开失败 ({path}): {source}")]
    Open {
        path: String,
        #[source]
        source: ImportError,
    },

    #[error("元数据工作簿缺少第 {0} 个工作表")]
    MissingSheet(usize),

    #[error("字典快照序列化失败 ({name}): {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("字典快照写入失败 ({path}): {source}")]
    SnapshotWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// 字典 sheet 列位置
const COL_COMPANY: usize = 0;
const COL_GROUP: usize = 1;
const COL_ALIAS: usize = 2;
const COL_SHEET: usize = 3;
const COL_SOURCE: usize = 5;
const COL_DESTINATION: usize = 6;
const COL_REQUIREMENT: usize = 7;
const COL_TYPE: usize = 8;

// 通知 sheet 列位置
const COL_NOTIFY_COMPANY: usize = 0;
const COL_NOTIFY_KEY: usize = 1;
const COL_NOTIFY_EMAILS: [usize; 3] = [2, 3, 4];

// ==========================================
// SchemaRegistry
// ==========================================
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    /// group → 有序规则列表（先匹配者胜）
    groups: HashMap<String, Vec<SchemaRule>>,
    /// alias|sheet → CompanyBinding（首次出现者胜）
    companies: HashMap<String, CompanyBinding>,
    /// alias → alias|首个 sheet,保持插入顺序
    aliases: Vec<(String, String)>,
    alias_positions: HashMap<String, usize>,
    /// 文件键 → 通知绑定（首次出现者胜）
    notifications: HashMap<String, NotificationBinding>,
}

impl SchemaRegistry {
    /// 用给定解析器打开元数据工作簿并构建注册表
    #[instrument(skip(parser))]
    pub fn load(parser: &dyn WorkbookParser, path: &Path) -> Result<Self, RegistryError> {
        let workbook = parser.open(path).map_err(|source| RegistryError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_workbook(&workbook)
    }

    /// 从已物化的元数据工作簿构建
    pub fn from_workbook(workbook: &Workbook) -> Result<Self, RegistryError> {
        let schema_sheet = workbook.sheets.first().ok_or(RegistryError::MissingSheet(1))?;
        let notify_sheet = workbook.sheets.get(1).ok_or(RegistryError::MissingSheet(2))?;

        let mut registry = SchemaRegistry::default();
        registry.ingest_schema_sheet(schema_sheet);
        registry.ingest_notification_sheet(notify_sheet);

        info!(
            groups = registry.groups.len(),
            rules = registry.rule_count(),
            bindings = registry.companies.len(),
            aliases = registry.aliases.len(),
            notifications = registry.notifications.len(),
            "字典注册表构建完成"
        );
        Ok(registry)
    }

    fn ingest_schema_sheet(&mut self, sheet: &Sheet) {
        for row in sheet.rows.iter().skip(1) {
            if is_blank_row(row) {
                continue;
            }

            // 每行独立取值: 短行缺失的单元格读作空串,不沿用上一行的类型
            let raw_alias = cell(row, COL_ALIAS).to_lowercase();
            // 去掉通配符 '*' 之后的部分
            let alias_part = raw_alias.split('*').next().unwrap_or("");
            if alias_part.trim().is_empty() {
                continue;
            }
            let alias = normalize_dashes(alias_part);

            let company = cell(row, COL_COMPANY).to_lowercase();
            let group = cell(row, COL_GROUP).to_lowercase();
            let sheet_name = cell(row, COL_SHEET).to_lowercase();
            let key = binding_key(&alias, &sheet_name);

            if !self.alias_positions.contains_key(&alias) {
                self.alias_positions
                    .insert(alias.clone(), self.aliases.len());
                self.aliases.push((alias.clone(), key.clone()));
            }

            self.companies
                .entry(key)
                .or_insert_with(|| CompanyBinding {
                    company: company.clone(),
                    group: group.clone(),
                    sheet: sheet_name.clone(),
                });

            // 规则始终追加,不去重
            self.groups.entry(group).or_default().push(SchemaRule {
                sheet: sheet_name,
                source: cell(row, COL_SOURCE).to_lowercase(),
                destination: cell(row, COL_DESTINATION).to_string(),
                column_type: ColumnType::from_flag(&cell(row, COL_TYPE).to_lowercase()),
                requirement: Requirement::from_flag(&cell(row, COL_REQUIREMENT).to_lowercase()),
                company,
            });
        }
    }

    fn ingest_notification_sheet(&mut self, sheet: &Sheet) {
        for row in sheet.rows.iter().skip(1) {
            if is_blank_row(row) {
                continue;
            }
            // 缺失的邮箱单元格为空,不沿用上一行
            let key = cell(row, COL_NOTIFY_KEY).to_lowercase();
            self.notifications
                .entry(key)
                .or_insert_with(|| NotificationBinding {
                    company: cell(row, COL_NOTIFY_COMPANY).to_lowercase(),
                    emails: COL_NOTIFY_EMAILS
                        .iter()
                        .map(|&idx| cell(row, idx).to_lowercase())
                        .collect(),
                });
        }
    }

    // ==========================================
    // 只读查询
    // ==========================================

    /// group 的有序规则列表
    pub fn rules(&self, group: &str) -> Option<&[SchemaRule]> {
        self.groups.get(&group.to_lowercase()).map(Vec::as_slice)
    }

    /// 按 (alias, sheet) 查找公司绑定
    pub fn binding(&self, alias: &str, sheet: &str) -> Option<&CompanyBinding> {
        self.companies
            .get(&binding_key(alias, &sheet.to_lowercase()))
    }

    /// alias 对应的默认组合键（alias|首个 sheet）
    pub fn alias_key(&self, alias: &str) -> Option<&str> {
        self.alias_positions
            .get(alias)
            .map(|&pos| self.aliases[pos].1.as_str())
    }

    /// 按插入顺序遍历 (alias, 组合键)
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, k)| (a.as_str(), k.as_str()))
    }

    /// 经 alias 默认组合键解析出的公司
    pub fn company_for_alias(&self, alias: &str) -> Option<&str> {
        self.alias_key(alias)
            .and_then(|key| self.companies.get(key))
            .map(|binding| binding.company.as_str())
    }

    /// 文件键对应的通知绑定
    pub fn notification(&self, file_key: &str) -> Option<&NotificationBinding> {
        self.notifications.get(file_key)
    }

    pub fn rule_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}
