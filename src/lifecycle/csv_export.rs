// ==========================================
// 表格导入机器人 - CSV 导出
// ==========================================
// 命名: {group}_{sheet}_{basename}.csv
// 说明: 各行长度可以不同（超出表头宽度的单元格会保留）
// ==========================================

use crate::domain::outcome::SheetExport;
use crate::importer::error::ImportResult;
use csv::WriterBuilder;
use std::path::{Path, PathBuf};

/// 导出文件名
pub fn export_file_name(export: &SheetExport, base_name: &str) -> String {
    format!("{}_{}_{}.csv", export.group, export.sheet, base_name)
}

/// 写出单张 sheet 的 CSV,返回文件路径
pub fn write_sheet_csv(dir: &Path, export: &SheetExport, base_name: &str) -> ImportResult<PathBuf> {
    let path = dir.join(export_file_name(export, base_name));
    let mut writer = WriterBuilder::new().flexible(true).from_path(&path)?;
    for row in &export.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(path)
}
