// ==========================================
// 表格导入机器人 - 分发器与工作池
// ==========================================
// 队列: tokio 有界 mpsc（容量来自配置）,N 个工作者共享一个接收端
// 屏障: 在途计数 + Notify,提交时 +1,处理完成时 -1
// 隔离: 单文件处理 panic 被捕获,工作者继续取下一个文件
// ==========================================

use super::PipelineError;
use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// 单文件处理入口（工作者调用）
#[async_trait]
pub trait FileHandler: Send + Sync + 'static {
    async fn handle(&self, file_name: String);
}

/// 工作池参数
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 50,
        }
    }
}

#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn begin(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    fn pending(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // 先注册再检查计数,避免错过 notify_waiters
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

pub struct Dispatcher {
    sender: mpsc::Sender<String>,
    in_flight: Arc<InFlight>,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// 启动工作池（需在 tokio 运行时内调用）
    pub fn start(handler: Arc<dyn FileHandler>, config: PoolConfig) -> Self {
        let workers = config.workers.max(1);
        let (sender, receiver) = mpsc::channel::<String>(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let in_flight = Arc::new(InFlight::default());

        let handles = (0..workers)
            .map(|worker_id| {
                let receiver = receiver.clone();
                let handler = handler.clone();
                let in_flight = in_flight.clone();
                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(file_name) = next else {
                            break;
                        };

                        debug!(worker_id, file = %file_name, "工作者开始处理文件");
                        let result = AssertUnwindSafe(handler.handle(file_name.clone()))
                            .catch_unwind()
                            .await;
                        if result.is_err() {
                            error!(worker_id, file = %file_name, "单文件处理异常终止,工作者继续运行");
                        }
                        in_flight.finish();
                    }
                    debug!(worker_id, "工作者退出");
                })
            })
            .collect();

        info!(
            workers,
            queue_capacity = config.queue_capacity,
            "工作池已启动"
        );

        Self {
            sender,
            in_flight,
            workers: handles,
        }
    }

    /// 提交文件名（队列满时等待）
    pub async fn submit(&self, file_name: String) -> Result<(), PipelineError> {
        self.in_flight.begin();
        if self.sender.send(file_name).await.is_err() {
            self.in_flight.finish();
            return Err(PipelineError::QueueClosed);
        }
        Ok(())
    }

    /// 在途文件数（已提交未处理完）
    pub fn pending(&self) -> usize {
        self.in_flight.pending()
    }

    /// 等待所有已提交文件处理完毕
    pub async fn wait_idle(&self) {
        self.in_flight.wait_idle().await;
    }

    /// 关闭队列并等待工作者退出
    pub async fn shutdown(self) {
        drop(self.sender);
        for (worker_id, result) in join_all(self.workers).await.into_iter().enumerate() {
            if let Err(e) = result {
                error!(worker_id, error = %e, "工作者异常退出");
            }
        }
        info!("工作池已关闭");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingHandler {
        seen: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl FileHandler for CountingHandler {
        async fn handle(&self, file_name: String) {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if file_name == "panic.xlsx" {
                panic!("planilha corrompida");
            }
            self.seen.lock().unwrap().push(file_name);
        }
    }

    #[tokio::test]
    async fn test_wait_idle_drains_all_submitted() {
        let handler = Arc::new(CountingHandler::default());
        let dispatcher = Dispatcher::start(
            handler.clone(),
            PoolConfig {
                workers: 3,
                queue_capacity: 2,
            },
        );

        for i in 0..10 {
            dispatcher.submit(format!("f{i}.xlsx")).await.unwrap();
        }
        dispatcher.wait_idle().await;

        assert_eq!(dispatcher.pending(), 0);
        let mut seen = handler.seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen.len(), 10);
        seen.dedup();
        assert_eq!(seen.len(), 10);

        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let handler = Arc::new(CountingHandler::default());
        let dispatcher = Dispatcher::start(
            handler.clone(),
            PoolConfig {
                workers: 1,
                queue_capacity: 4,
            },
        );

        dispatcher.submit("panic.xlsx".to_string()).await.unwrap();
        dispatcher.submit("ok.xlsx".to_string()).await.unwrap();
        dispatcher.wait_idle().await;

        assert_eq!(*handler.seen.lock().unwrap(), vec!["ok.xlsx".to_string()]);
        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_wait_idle_with_nothing_submitted_returns() {
        let dispatcher = Dispatcher::start(Arc::new(CountingHandler::default()), PoolConfig::default());
        tokio::time::timeout(Duration::from_secs(1), dispatcher.wait_idle())
            .await
            .unwrap();
        dispatcher.shutdown().await;
    }
}
