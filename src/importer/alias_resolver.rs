// ==========================================
// 表格导入机器人 - 文件别名解析
// ==========================================
// 职责: 观测到的文件名 → 注册表中的规范 alias
// 规则: 按注册表插入顺序,取第一个作为子串出现的 alias
// 兜底: 未登记文件以自身名称作为 alias（随后必然无法绑定 schema）
// ==========================================

use crate::importer::file_parser::{is_spreadsheet_name, strip_spreadsheet_extension};
use crate::registry::SchemaRegistry;

/// 各种破折号统一为 '-'
const DASH_VARIANTS: [char; 5] = ['\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}', '\u{2014}'];

/// 将破折号变体统一为 ASCII 连字符
pub fn normalize_dashes(value: &str) -> String {
    value
        .chars()
        .map(|c| if DASH_VARIANTS.contains(&c) { '-' } else { c })
        .collect()
}

/// 别名解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// 注册表组合键（alias|sheet）,兜底时为规范化文件名
    pub registry_key: String,
    /// 规范化后的文件名（小写 + 破折号统一,含扩展名）
    pub observed_name: String,
    /// 命中的 alias,兜底时为规范化文件名
    pub alias: String,
    /// 扫描到的原始文件名（大小写不变,用于文件迁移）
    pub file_name: String,
}

impl ResolvedFile {
    /// 规范化文件名去掉扩展名（CSV 命名与标记文件命名使用）
    pub fn base_name(&self) -> &str {
        strip_spreadsheet_extension(&self.observed_name)
    }

    /// 原始文件名去掉扩展名（文件迁移使用）
    pub fn source_stem(&self) -> &str {
        strip_spreadsheet_extension(&self.file_name)
    }

    /// 通知查找用的 alias（组合键 '|' 之前的部分）
    pub fn notification_key(&self) -> &str {
        self.registry_key
            .split('|')
            .next()
            .unwrap_or(&self.registry_key)
    }
}

pub struct AliasResolver<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> AliasResolver<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, file_name: &str) -> ResolvedFile {
        let observed = normalize_dashes(&file_name.to_lowercase());

        if is_spreadsheet_name(&observed) {
            let stem = strip_spreadsheet_extension(&observed).trim();
            if let Some((alias, key)) = self
                .registry
                .aliases()
                .find(|(alias, _)| stem.contains(alias))
            {
                return ResolvedFile {
                    registry_key: key.to_string(),
                    observed_name: observed.clone(),
                    alias: alias.to_string(),
                    file_name: file_name.to_string(),
                };
            }
        }

        ResolvedFile {
            registry_key: observed.clone(),
            observed_name: observed.clone(),
            alias: observed,
            file_name: file_name.to_string(),
        }
    }
}
