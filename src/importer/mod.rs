// ==========================================
// 表格导入机器人 - 导入层
// ==========================================
// 职责: 工作簿解析、文件别名解析、列重映射、处理尝试标记
// 支持: Excel (.xlsx/.xlsm/.xls)
// ==========================================

// 模块声明
pub mod alias_resolver;
pub mod attempt_marker;
pub mod column_remapper;
pub mod error;
pub mod file_parser;

// 重导出核心类型
pub use alias_resolver::{normalize_dashes, AliasResolver, ResolvedFile};
pub use attempt_marker::AttemptMarker;
pub use column_remapper::{ColumnRemapper, COMPANY_ID_COLUMN};
pub use error::{ImportError, ImportResult};
pub use file_parser::{
    is_spreadsheet_name, strip_spreadsheet_extension, ExcelParser, Sheet, Workbook,
    WorkbookParser, SPREADSHEET_EXTENSIONS,
};
