// ==========================================
// 表格导入机器人 - 处理尝试标记
// ==========================================
// 存储: 日志目录下的 {basename}.log
// 语义: 文件非空 ⇔ 此前对同名文件的处理记录过错误
// 说明: 只追加不截断,进程重启后依然有效
// ==========================================

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AttemptMarker {
    path: PathBuf,
}

impl AttemptMarker {
    /// 标记文件路径
    pub fn path_for(log_dir: &Path, base_name: &str) -> PathBuf {
        log_dir.join(format!("{}.log", base_name))
    }

    /// 打开（不存在则创建）标记文件,不截断已有内容
    pub fn open(log_dir: &Path, base_name: &str) -> io::Result<Self> {
        let path = Self::path_for(log_dir, base_name);
        OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 是否已有处理记录（按文件大小判断）
    pub fn is_attempted(&self) -> io::Result<bool> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() > 0),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// 追加一行带时间戳的记录
    pub fn record(&self, message: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(
            file,
            "{} {}",
            Local::now().format("%Y/%m/%d %H:%M:%S"),
            message
        )
    }

    /// 删除标记（不存在视为成功）
    pub fn remove(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    /// 将标记移动到目标路径
    pub fn move_to(&self, target: &Path) -> io::Result<()> {
        fs::rename(&self.path, target)
    }
}
