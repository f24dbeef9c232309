use async_trait::async_trait;
use evhub_core::{Action, Dispatcher, HubError, HubResult};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

/// 线程池调度器：动作在独占的 rayon 线程池上执行
///
/// 同一处理器的多次调用可能并发执行，处理器需自行保证线程安全。
pub struct ThreadPoolDispatcher {
    name: String,
    pool: ThreadPool,
}

impl ThreadPoolDispatcher {
    /// 创建指定线程数的线程池；`threads` 为 0 时由 rayon 按 CPU 数决定
    pub fn new(name: impl Into<String>, threads: usize) -> HubResult<Self> {
        let name = name.into();
        let prefix = name.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()
            .map_err(|e| HubError::dispatcher(&name, e.to_string()))?;

        debug!(dispatcher = %name, threads = pool.current_num_threads(), "Thread pool dispatcher ready");
        Ok(Self { name, pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn on_pool_thread(&self) -> bool {
        self.pool.current_thread_index().is_some()
    }
}

#[async_trait]
impl Dispatcher for ThreadPoolDispatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn dispatch(&self, action: Action) {
        self.pool.spawn(action);
    }

    /// 已在池内线程上时直接执行，避免占满线程后互相等待
    fn dispatch_and_wait(&self, action: Action) {
        if self.on_pool_thread() {
            action();
        } else {
            self.pool.install(action);
        }
    }

    async fn dispatch_and_wait_async(&self, action: Action) {
        if self.on_pool_thread() {
            action();
            return;
        }

        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
        self.pool.spawn(move || {
            action();
            let _ = done_tx.send(());
        });
        if done_rx.await.is_err() {
            warn!(dispatcher = %self.name, "Pool action dropped before completion");
        }
    }
}

impl std::fmt::Debug for ThreadPoolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPoolDispatcher")
            .field("name", &self.name)
            .field("threads", &self.threads())
            .finish()
    }
}
