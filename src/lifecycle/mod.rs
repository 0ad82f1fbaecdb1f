// ==========================================
// 表格导入机器人 - 文件生命周期层
// ==========================================
// 职责: 处理结果 → 目标目录 + CSV 导出 + 通知
// ==========================================

pub mod csv_export;
pub mod router;


pub use csv_export::{export_file_name, write_sheet_csv};
pub use router::{Destination, FileLifecycleRouter, RouteReport};
