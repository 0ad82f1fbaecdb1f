// ==========================================
// 表格导入机器人 - 工作簿解析器
// ==========================================
// 职责: 打开工作簿 → sheet 序列,每个 sheet 为字符串单元格行序列
// 支持: Excel (.xlsx/.xlsm/.xls)
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;

/// 可识别的表格扩展名（迁移文件时按此顺序尝试）
pub const SPREADSHEET_EXTENSIONS: [&str; 3] = [".xlsx", ".xlsm", ".xls"];

/// 单个 sheet（整张物化在内存中）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

/// 工作簿
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

// ==========================================
// WorkbookParser Trait
// ==========================================
// 实现者: ExcelParser（calamine）,测试中为内存实现
pub trait WorkbookParser: Send + Sync {
    /// 打开工作簿并物化全部 sheet
    fn open(&self, path: &Path) -> ImportResult<Workbook>;
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl WorkbookParser for ExcelParser {
    fn open(&self, path: &Path) -> ImportResult<Workbook> {
        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !matches!(ext.as_str(), "xlsx" | "xlsm" | "xls") {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(path)?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&name)?;
            sheets.push(Sheet::new(name, range_to_rows(&range)));
        }

        Ok(Workbook { sheets })
    }
}

/// 将 calamine 区域还原为从 A1 开始的行（补齐前导空行/空列）
fn range_to_rows(range: &Range<Data>) -> Vec<Vec<String>> {
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![String::new(); col_offset];
        cells.extend(row.iter().map(|cell| cell.to_string()));
        rows.push(cells);
    }
    rows
}

/// 文件名是否按表格处理（名称中含 ".xls"）
pub fn is_spreadsheet_name(file_name: &str) -> bool {
    file_name.to_lowercase().contains(".xls")
}

/// 去掉末尾可识别的扩展名（大小写不敏感）
pub fn strip_spreadsheet_extension(file_name: &str) -> &str {
    for ext in SPREADSHEET_EXTENSIONS {
        let Some(split) = file_name.len().checked_sub(ext.len()) else {
            continue;
        };
        if file_name.is_char_boundary(split) && file_name[split..].eq_ignore_ascii_case(ext) {
            return &file_name[..split];
        }
    }
    file_name
}
