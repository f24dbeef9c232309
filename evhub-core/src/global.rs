//! 进程级便捷入口
//!
//! 委托给惰性初始化的默认 `EventHub`。核心逻辑不依赖这里，
//! 需要隔离（例如并行测试）时直接构造自己的 `EventHub`。
//!
use crate::aggregate::AggregateId;
use crate::error::HubResult;
use crate::event::Event;
use crate::hub::{DeliveryReport, EventHub};
use crate::subscription::HandlerId;
use once_cell::sync::Lazy;

static DEFAULT_HUB: Lazy<EventHub> = Lazy::new(EventHub::default);

pub fn hub() -> &'static EventHub {
    &DEFAULT_HUB
}

/// 在当前 tokio 运行时上启动默认 hub 的消费者
pub fn start() -> HubResult<()> {
    hub().start()
}

pub fn send<E: Event>(payload: E) {
    hub().send(payload)
}

pub fn send_and_wait<E: Event>(payload: E) -> DeliveryReport {
    hub().send_and_wait(payload)
}

pub fn register_handler<E, F>(callback: F) -> HandlerId
where
    E: Event,
    F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
{
    hub().register_handler(callback)
}

pub fn register_aggregate_handler<E, F>(aggregate_id: AggregateId, callback: F) -> HubResult<HandlerId>
where
    E: Event,
    F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
{
    hub().register_aggregate_handler(aggregate_id, callback)
}

pub fn aggregate_ready(aggregate_id: AggregateId) -> HubResult<usize> {
    hub().aggregate_ready(aggregate_id)
}

/// 停止默认 hub；`teardown` 为真时清空其全部状态
pub fn shutdown(teardown: bool) {
    hub().cleanup(teardown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RoutableEvent;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Spawned(AggregateId);

    impl Event for Spawned {
        fn as_routable(&self) -> Option<&dyn RoutableEvent> {
            Some(self)
        }
    }

    impl RoutableEvent for Spawned {
        fn aggregate_id(&self) -> AggregateId {
            self.0
        }
    }

    // 默认 hub 为进程共享，仅在单个测试中使用
    #[test]
    fn facade_delegates_to_default_hub() {
        let id = AggregateId::new();
        send(Spawned(id));
        assert_eq!(hub().buffered_count(id), 1);

        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        register_aggregate_handler(id, move |_: &Spawned| {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        assert_eq!(aggregate_ready(id).unwrap(), 1);

        let report = send_and_wait(Spawned(id));
        assert_eq!(report.matched, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        shutdown(true);
        assert_eq!(hub().total_handlers(), 0);
        assert_eq!(hub().queue_len(), 0);
    }
}
