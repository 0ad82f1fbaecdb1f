// ==========================================
// 表格导入机器人 - 元数据字典领域模型
// ==========================================
// 来源: 元数据工作簿 sheet 1 (字典) / sheet 2 (通知)
// 用途: 注册表构建时写入,之后只读
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// ColumnType - 列类型标记
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// 数值列（标记 "n"），缺省值为 "0"
    Numeric,
    /// 其他类型，缺省值为空串
    Other,
}

impl ColumnType {
    /// 从字典中的类型标记解析（已小写）
    pub fn from_flag(flag: &str) -> Self {
        if flag == "n" {
            ColumnType::Numeric
        } else {
            ColumnType::Other
        }
    }

    /// 缺失列补齐时使用的默认值
    pub fn default_value(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "0",
            ColumnType::Other => "",
        }
    }
}

// ==========================================
// Requirement - 必填策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// "s": 缺失则整张 sheet 作废
    Required,
    /// "o" / "n": 缺失时静默忽略
    NoDefault,
    /// 其他任意标记（含空）: 缺失时补默认值列
    DefaultFilled,
}

impl Requirement {
    /// 从字典中的必填标记解析（已小写）
    pub fn from_flag(flag: &str) -> Self {
        match flag {
            "s" => Requirement::Required,
            "o" | "n" => Requirement::NoDefault,
            _ => Requirement::DefaultFilled,
        }
    }
}

// ==========================================
// SchemaRule - 列映射规则
// ==========================================
// 归属: 恰好一个 group + 一个 company
// 顺序: 注册表插入顺序,先匹配者胜
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRule {
    pub sheet: String,       // 目标 sheet 名（小写）
    pub source: String,      // 源列名（小写）
    pub destination: String, // 目标列名（保留大小写）
    pub column_type: ColumnType,
    pub requirement: Requirement,
    pub company: String, // 所属公司（小写）
}

// ==========================================
// CompanyBinding - alias|sheet → (company, group, sheet)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyBinding {
    pub company: String,
    pub group: String,
    pub sheet: String,
}

// ==========================================
// NotificationBinding - 文件键 → (company, 最多三个邮箱)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationBinding {
    pub company: String,
    pub emails: Vec<String>,
}

impl NotificationBinding {
    /// 非空邮箱地址
    pub fn recipients(&self) -> Vec<String> {
        self.emails
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// 组合键 `alias|sheet`
pub fn binding_key(alias: &str, sheet: &str) -> String {
    format!("{}|{}", alias, sheet)
}
