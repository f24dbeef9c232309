use async_trait::async_trait;
use crossbeam::channel::{self, Receiver, Sender};
use evhub_core::{Action, Dispatcher, HubError, HubResult};
use std::thread::{self, ThreadId};
use tracing::{trace, warn};

/// 主循环调度器：动作进入无界通道，只在“主线程”调用 `pump` 时执行
///
/// 主线程为构造该调度器的线程。`dispatch_and_wait` 在主线程上直接执行，
/// 在其它线程上阻塞到主线程下一次 `pump` 执行完该动作；
/// 主线程不再 `pump` 时，其它线程上的同步等待不会返回。
pub struct MainLoopDispatcher {
    name: String,
    home: ThreadId,
    tx: Sender<Action>,
    rx: Receiver<Action>,
}

impl MainLoopDispatcher {
    /// 以当前线程为主线程
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, rx) = channel::unbounded();
        Self {
            name: name.into(),
            home: thread::current().id(),
            tx,
            rx,
        }
    }

    pub fn is_home_thread(&self) -> bool {
        thread::current().id() == self.home
    }

    /// 等待执行的动作数
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// 在主线程上执行本次调用前已排队的全部动作，返回执行数量；
    /// 执行期间新排入的动作留到下一次 `pump`
    pub fn pump(&self) -> HubResult<usize> {
        if !self.is_home_thread() {
            return Err(HubError::dispatcher(
                &self.name,
                "pump must be called on the thread that created the dispatcher",
            ));
        }

        let batch = self.rx.len();
        let mut ran = 0;
        while ran < batch {
            match self.rx.try_recv() {
                Ok(action) => {
                    action();
                    ran += 1;
                }
                Err(_) => break,
            }
        }

        if ran > 0 {
            trace!(dispatcher = %self.name, ran, "Pumped main-loop actions");
        }
        Ok(ran)
    }

    fn enqueue(&self, action: Action) -> bool {
        if self.tx.send(action).is_err() {
            warn!(dispatcher = %self.name, "Main-loop channel closed; action dropped");
            return false;
        }
        true
    }
}

#[async_trait]
impl Dispatcher for MainLoopDispatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn dispatch(&self, action: Action) {
        self.enqueue(action);
    }

    fn dispatch_and_wait(&self, action: Action) {
        if self.is_home_thread() {
            action();
            return;
        }

        let (done_tx, done_rx) = channel::bounded::<()>(1);
        let queued = self.enqueue(Box::new(move || {
            action();
            let _ = done_tx.send(());
        }));
        if queued && done_rx.recv().is_err() {
            warn!(dispatcher = %self.name, "Main-loop action dropped before completion");
        }
    }

    async fn dispatch_and_wait_async(&self, action: Action) {
        if self.is_home_thread() {
            action();
            return;
        }

        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
        let queued = self.enqueue(Box::new(move || {
            action();
            let _ = done_tx.send(());
        }));
        if queued && done_rx.await.is_err() {
            warn!(dispatcher = %self.name, "Main-loop action dropped before completion");
        }
    }
}

impl std::fmt::Debug for MainLoopDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainLoopDispatcher")
            .field("name", &self.name)
            .field("home", &self.home)
            .field("pending", &self.pending())
            .finish()
    }
}
