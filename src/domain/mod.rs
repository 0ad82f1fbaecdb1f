// ==========================================
// 表格导入机器人 - 领域模型层
// ==========================================
// 职责: 定义字典规则、绑定关系、单文件处理结果
// 红线: 不含文件系统逻辑,不含解析逻辑
// ==========================================

pub mod outcome;
pub mod schema;

// 重导出核心类型
pub use outcome::{FileOutcome, MissingColumn, SheetExport, SheetRemap};
pub use schema::{
    binding_key, ColumnType, CompanyBinding, NotificationBinding, Requirement, SchemaRule,
};
