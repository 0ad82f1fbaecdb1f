// ==========================================
// 表格导入机器人 - 待导入目录扫描
// ==========================================
// 每轮: 遍历目录树 → 子目录文件平铺到根目录 → 逐个提交 → 等待排空
// 单次模式跑一轮后返回,持续模式每轮之间休眠固定间隔
// 注册表在进程内只加载一次,各轮共用
// ==========================================

use super::dispatcher::Dispatcher;
use super::PipelineError;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct IntakeScanner {
    intake: PathBuf,
}

impl IntakeScanner {
    pub fn new(intake: impl Into<PathBuf>) -> Self {
        Self {
            intake: intake.into(),
        }
    }

    /// 遍历待导入目录,返回根目录下待处理的文件名
    ///
    /// 子目录中的文件先改名到根目录,改名失败或根目录已有同名文件时本轮跳过。
    /// 遍历完成后才开始移动,避免遍历过程中看到自己移动的文件。
    /// 返回的文件名不重复,同一文件只会交给一个工作者。
    pub fn discover(&self) -> Vec<String> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.intake).min_depth(1).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() => entries.push((entry.depth(), entry.into_path())),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "待导入目录遍历出错"),
            }
        }

        let mut seen = HashSet::with_capacity(entries.len());
        let mut names = Vec::with_capacity(entries.len());
        for (depth, path) in entries {
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            if depth > 1 && !self.flatten(&path, &name) {
                continue;
            }
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
        names
    }

    fn flatten(&self, path: &Path, name: &str) -> bool {
        let target = self.intake.join(name);
        // rename 会覆盖同名文件
        if target.exists() {
            warn!(
                from = %path.display(),
                to = %target.display(),
                "根目录已有同名文件,子目录文件本轮跳过"
            );
            return false;
        }
        match fs::rename(path, &target) {
            Ok(()) => {
                debug!(from = %path.display(), to = %target.display(), "子目录文件已移至根目录");
                true
            }
            Err(e) => {
                error!(from = %path.display(), error = %e, "子目录文件移动失败");
                false
            }
        }
    }

    /// 在阻塞线程池中执行 discover
    async fn discover_blocking(&self) -> Vec<String> {
        let scanner = self.clone();
        match tokio::task::spawn_blocking(move || scanner.discover()).await {
            Ok(names) => names,
            Err(e) => {
                error!(error = %e, "待导入目录扫描任务异常终止");
                Vec::new()
            }
        }
    }

    /// 执行一轮扫描并等待本轮提交的文件全部处理完毕
    pub async fn run_once(&self, dispatcher: &Dispatcher) -> Result<usize, PipelineError> {
        let cycle_id = Uuid::new_v4();
        async {
            let files = self.discover_blocking().await;
            info!(files = files.len(), "开始扫描待导入目录");

            let count = files.len();
            for file_name in files {
                dispatcher.submit(file_name).await?;
            }
            dispatcher.wait_idle().await;

            info!(files = count, "本轮处理完成");
            Ok::<_, PipelineError>(count)
        }
        .instrument(info_span!("scan_cycle", %cycle_id))
        .await
    }

    /// 单次或持续运行
    pub async fn run(
        &self,
        dispatcher: &Dispatcher,
        continuous: bool,
        interval: Duration,
    ) -> Result<(), PipelineError> {
        loop {
            self.run_once(dispatcher).await?;
            if !continuous {
                return Ok(());
            }
            debug!(interval_secs = interval.as_secs(), "等待下一轮扫描");
            tokio::time::sleep(interval).await;
        }
    }
}
