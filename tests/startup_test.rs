// ==========================================
// 启动流程测试
// ==========================================
// 测试目标: 配置加载 → 目录初始化 → 注册表构建 → 字典快照
// ==========================================

mod test_helpers;

use sheet_intake::config::IntakeConfig;
use sheet_intake::importer::{ExcelParser, Sheet};
use sheet_intake::registry::{
    RegistryError, SchemaRegistry, SNAPSHOT_ALIASES, SNAPSHOT_COMPANIES, SNAPSHOT_GROUPS,
    SNAPSHOT_NOTIFICATIONS,
};
use std::fs;
use tempfile::TempDir;
use test_helpers::{row, MemoryParser};

fn write_config(root: &std::path::Path) -> std::path::PathBuf {
    let config = serde_json::json!({
        "create_directories": true,
        "directories": {
            "intake": root.join("entrada"),
            "imported": root.join("importados"),
            "schema_error": root.join("erro_schema"),
            "missing_metadata": root.join("sem_metadados"),
            "generated_csv": root.join("csv"),
            "log": root.join("log")
        },
        "metadata": {
            "directory": root.join("metadados"),
            "file_name": "dicionario.xlsx"
        }
    });
    let path = root.join("config.json");
    fs::write(&path, serde_json::to_vec_pretty(&config).unwrap()).unwrap();
    path
}

#[test]
fn test_startup_builds_registry_and_snapshots() {
    let temp = TempDir::new().unwrap();
    let config = IntakeConfig::load(&write_config(temp.path())).unwrap();
    assert_eq!(config.workers, 4);
    assert_eq!(config.queue_capacity, 50);
    assert!(!config.continuous);

    config.ensure_directories().unwrap();
    fs::create_dir_all(&config.metadata.directory).unwrap();
    for (_, dir) in config.directories.roles() {
        assert!(dir.is_dir());
    }

    let parser = MemoryParser::default();
    parser.insert(
        "dicionario.xlsx",
        vec![
            Sheet::new(
                "dicionario",
                vec![
                    row(&["empresa"]),
                    row(&["ACME", "G1", "Vendas*", "Plan1", "", "Nome", "Nome", "S", "n"]),
                ],
            ),
            Sheet::new("email", vec![row(&["empresa"]), row(&["acme", "vendas", "ops@acme.com"])]),
        ],
    );

    let registry = SchemaRegistry::load(&parser, &config.metadata.workbook_path()).unwrap();
    assert_eq!(registry.alias_key("vendas"), Some("vendas|plan1"));

    let written = registry.write_snapshots(&config.metadata.directory).unwrap();
    assert_eq!(written.len(), 4);
    for name in [SNAPSHOT_GROUPS, SNAPSHOT_COMPANIES, SNAPSHOT_ALIASES, SNAPSHOT_NOTIFICATIONS] {
        assert!(config.metadata.directory.join(name).is_file());
    }
}

#[test]
fn test_missing_metadata_workbook_is_fatal() {
    let temp = TempDir::new().unwrap();
    let config = IntakeConfig::load(&write_config(temp.path())).unwrap();

    let result = SchemaRegistry::load(&ExcelParser, &config.metadata.workbook_path());

    assert!(matches!(result, Err(RegistryError::Open { .. })));
}
