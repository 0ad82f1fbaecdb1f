// ==========================================
// 表格导入机器人 - 列重映射器
// ==========================================
// 职责: 按 (company, group, sheet) 字典规则校验并重命名列
// 表头: 源列 → 目标列,未匹配列整列剔除
// 缺失: 必填 → 整张 sheet 作废; 可补齐 → 追加默认值列; 无默认 → 忽略
// 尾列: 固定追加 company-id
// ==========================================

use crate::domain::outcome::{MissingColumn, SheetRemap};
use crate::domain::schema::{CompanyBinding, Requirement, SchemaRule};
use crate::importer::file_parser::Sheet;
use crate::registry::SchemaRegistry;
use std::collections::HashSet;
use tracing::debug;

/// 固定追加的公司列
pub const COMPANY_ID_COLUMN: &str = "company-id";

pub struct ColumnRemapper<'a> {
    registry: &'a SchemaRegistry,
}

/// 表头处理结果,数据行按同一布局输出
struct HeaderLayout {
    header: Vec<String>,
    excluded: HashSet<usize>,
    defaults: Vec<String>,
    missing: Vec<MissingColumn>,
}

impl<'a> ColumnRemapper<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// 对单张 sheet 做校验与重映射
    ///
    /// # 参数
    /// - alias: 命中的文件 alias
    /// - sheet: 已物化的 sheet
    ///
    /// # 返回
    /// - Unresolved: 无 CompanyBinding
    /// - MissingRequired: 缺少必填列,不输出任何行
    /// - Rows: 表头 + 数据行（空 sheet 时为空）
    pub fn remap_sheet(&self, alias: &str, sheet: &Sheet) -> SheetRemap {
        let Some(binding) = self.registry.binding(alias, &sheet.name) else {
            debug!(alias, sheet = %sheet.name, "sheet 无对应字典绑定");
            return SheetRemap::Unresolved;
        };

        let mut rows = sheet.rows.iter();
        let Some(header_row) = rows.next() else {
            return SheetRemap::Rows(Vec::new());
        };

        let rules = self.registry.rules(&binding.group);
        let layout = build_header(header_row, rules, binding, &sheet.name.to_lowercase());

        if !layout.missing.is_empty() {
            debug!(
                alias,
                sheet = %sheet.name,
                missing = layout.missing.len(),
                "必填列缺失, sheet 输出作废"
            );
            return SheetRemap::MissingRequired(layout.missing);
        }

        let mut output = Vec::with_capacity(sheet.rows.len());
        output.push(layout.header.clone());
        for row in rows {
            let mut line: Vec<String> = row
                .iter()
                .enumerate()
                .filter(|(idx, _)| !layout.excluded.contains(idx))
                .map(|(_, value)| value.clone())
                .collect();
            line.extend(layout.defaults.iter().cloned());
            line.push(binding.company.clone());
            output.push(line);
        }

        SheetRemap::Rows(output)
    }
}

fn build_header(
    header_row: &[String],
    rules: Option<&[SchemaRule]>,
    binding: &CompanyBinding,
    sheet_key: &str,
) -> HeaderLayout {
    let mut assigned: HashSet<&str> = HashSet::new();
    let mut excluded = HashSet::new();
    let mut header = Vec::with_capacity(header_row.len() + 1);

    for (idx, cell) in header_row.iter().enumerate() {
        // group 没有任何规则时表头原样保留
        let Some(rules) = rules else {
            header.push(cell.clone());
            continue;
        };

        let lowered = cell.to_lowercase();
        let hit = rules.iter().find(|rule| {
            rule.source == lowered
                && !assigned.contains(rule.destination.as_str())
                && rule.sheet == sheet_key
                && rule.company == binding.company
        });

        match hit {
            Some(rule) => {
                assigned.insert(rule.destination.as_str());
                header.push(rule.destination.clone());
            }
            None => {
                excluded.insert(idx);
            }
        }
    }

    let mut defaults = Vec::new();
    let mut missing: Vec<MissingColumn> = Vec::new();
    let company_rules = rules
        .unwrap_or(&[])
        .iter()
        .filter(|rule| rule.company == binding.company);

    for rule in company_rules {
        if assigned.contains(rule.destination.as_str()) {
            continue;
        }
        match rule.requirement {
            Requirement::Required => {
                // 同一源列只报告一次,继续收集完整缺失列表
                if !missing.iter().any(|m| m.source == rule.source) {
                    missing.push(MissingColumn {
                        source: rule.source.clone(),
                        destination: rule.destination.clone(),
                    });
                }
            }
            Requirement::NoDefault => {}
            Requirement::DefaultFilled => {
                header.push(rule.destination.clone());
                defaults.push(rule.column_type.default_value().to_string());
            }
        }
    }

    header.push(COMPANY_ID_COLUMN.to_string());

    HeaderLayout {
        header,
        excluded,
        defaults,
        missing,
    }
}
