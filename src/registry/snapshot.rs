// ==========================================
// 表格导入机器人 - 字典快照
// ==========================================
// 职责: 启动时把四张字典表写成可读 JSON,供审计
// 格式: tab 缩进, key 排序
// ==========================================

use super::{RegistryError, SchemaRegistry};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SNAPSHOT_GROUPS: &str = "DicionarioAgrupador.json";
pub const SNAPSHOT_COMPANIES: &str = "DicionarioEmpresa.json";
pub const SNAPSHOT_ALIASES: &str = "DicionarioArquivo.json";
pub const SNAPSHOT_NOTIFICATIONS: &str = "DicionarioEmail.json";

impl SchemaRegistry {
    /// 写出四个快照文件,返回写入路径
    pub fn write_snapshots(&self, dir: &Path) -> Result<Vec<PathBuf>, RegistryError> {
        let groups: BTreeMap<_, _> = self.groups.iter().collect();
        let companies: BTreeMap<_, _> = self.companies.iter().collect();
        let aliases: BTreeMap<_, _> = self.aliases().collect();
        let notifications: BTreeMap<_, _> = self.notifications.iter().collect();

        let written = vec![
            write_pretty(dir, SNAPSHOT_GROUPS, &groups)?,
            write_pretty(dir, SNAPSHOT_COMPANIES, &companies)?,
            write_pretty(dir, SNAPSHOT_ALIASES, &aliases)?,
            write_pretty(dir, SNAPSHOT_NOTIFICATIONS, &notifications)?,
        ];

        info!(dir = %dir.display(), files = written.len(), "字典快照已写出");
        Ok(written)
    }
}

fn write_pretty<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf, RegistryError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|source| RegistryError::Serialize {
            name: name.to_string(),
            source,
        })?;

    let path = dir.join(name);
    fs::write(&path, buf).map_err(|source| RegistryError::SnapshotWrite {
        path: path.display().to_string(),
        source,
    })?;
    Ok(path)
}
