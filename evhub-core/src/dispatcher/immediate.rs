use super::{Action, Dispatcher};
use async_trait::async_trait;

/// 同步调度器：在调用线程上立即执行，是 `EventHub` 的默认调度器
///
/// 经由后台消费者投递时，处理器运行在消费者任务上，会串行化该任务的后续投递。
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateDispatcher;

#[async_trait]
impl Dispatcher for ImmediateDispatcher {
    fn name(&self) -> &str {
        "immediate"
    }

    fn dispatch(&self, action: Action) {
        action();
    }

    fn dispatch_and_wait(&self, action: Action) {
        action();
    }

    async fn dispatch_and_wait_async(&self, action: Action) {
        action();
    }
}
