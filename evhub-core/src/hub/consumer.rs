//! 后台消费者：持续从投递队列取出事件并分发
//!
//! 队列为空时挂起等待通知；每处理一个事件后检查取消令牌，
//! 取消是协作式的，正在执行的处理器不会被中断。
//!
use super::shared::HubShared;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 消费者运行句柄：用于取消与等待任务结束
pub(crate) struct ConsumerHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
    runtime: Handle,
}

impl ConsumerHandle {
    pub(crate) fn spawn(shared: Arc<HubShared>, runtime: &Handle) -> Self {
        let token = CancellationToken::new();
        let task = runtime.spawn(run(shared, token.clone()));

        Self {
            token,
            task: Some(task),
            runtime: runtime.clone(),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.token.is_cancelled() && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    pub(crate) async fn join(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ConsumerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run(shared: Arc<HubShared>, token: CancellationToken) {
    let yield_every = shared.config.consumer_yield_every.max(1);
    let mut processed = 0usize;
    debug!(hub = %shared.name(), "Event consumer started");

    loop {
        if token.is_cancelled() {
            break;
        }

        match shared.queue.pop() {
            Some(event) => {
                shared.deliver(&event);
                processed += 1;
                if processed % yield_every == 0 {
                    tokio::task::yield_now().await;
                }
            }
            None => {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = shared.queue.notified() => {}
                }
            }
        }
    }

    debug!(hub = %shared.name(), processed, "Event consumer stopped");
}
