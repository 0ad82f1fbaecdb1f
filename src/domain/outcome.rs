// ==========================================
// 表格导入机器人 - 单文件处理结果
// ==========================================
// 职责: 单文件处理返回带标签的结果,路由器只按标签分派
// ==========================================

/// 缺失的必填列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingColumn {
    pub source: String,
    pub destination: String,
}

/// 单张 sheet 的重映射结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetRemap {
    /// 没有 CompanyBinding（schema 未知）
    Unresolved,
    /// 缺少必填列（整张 sheet 输出作废）
    MissingRequired(Vec<MissingColumn>),
    /// 规范化后的行（含表头,可能为空）
    Rows(Vec<Vec<String>>),
}

/// 一张待导出的 sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetExport {
    pub company: String,
    pub group: String,
    pub sheet: String, // 工作簿中的原始 sheet 名
    pub rows: Vec<Vec<String>>,
}

/// 单文件处理结果（路由依据）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// 至少一张 sheet 产出了行
    Imported(Vec<SheetExport>),
    /// 所有 sheet 都无法解析到 schema
    SchemaUnresolved,
    /// 至少一张 sheet 缺少必填列,且没有任何 sheet 产出行（missing 为目标列名）
    ValidationFailed { missing: Vec<String> },
    /// 工作簿打开失败 / 格式不支持 / 解析异常
    ParseError(String),
    /// 标记文件已有内容,跳过处理
    PriorAttempt,
}

impl FileOutcome {
    /// 日志用标签
    pub fn label(&self) -> &'static str {
        match self {
            FileOutcome::Imported(_) => "IMPORTED",
            FileOutcome::SchemaUnresolved => "SCHEMA_UNRESOLVED",
            FileOutcome::ValidationFailed { .. } => "VALIDATION_FAILED",
            FileOutcome::ParseError(_) => "PARSE_ERROR",
            FileOutcome::PriorAttempt => "PRIOR_ATTEMPT",
        }
    }
}
