//! hub 内部共享状态：注册表、缓冲区、投递队列三把独立的锁
//!
//! 需要跨两个结构保持一致时，加锁顺序固定为 注册表 → 缓冲区 / 队列。
//!
use crate::aggregate::AggregateId;
use crate::buffer::BufferStore;
use crate::config::HubConfig;
use crate::event::EventDescriptor;
use crate::queue::DeliveryQueue;
use crate::registry::HandlerRegistry;
use crate::subscription::{Subscription, Tally};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

pub(crate) struct HubShared {
    pub(crate) config: HubConfig,
    pub(crate) registry: RwLock<HandlerRegistry>,
    pub(crate) buffers: Mutex<BufferStore>,
    pub(crate) queue: DeliveryQueue,
    pub(crate) tally: Arc<Tally>,
    pub(crate) unhandled: AtomicUsize,
}

impl HubShared {
    pub(crate) fn new(config: HubConfig) -> Self {
        Self {
            config,
            registry: RwLock::new(HandlerRegistry::new()),
            buffers: Mutex::new(BufferStore::new()),
            queue: DeliveryQueue::new(),
            tally: Arc::new(Tally::default()),
            unhandled: AtomicUsize::new(0),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.config.name
    }

    /// 异步发送的路由决策：
    /// - 非路由事件直接入队；
    /// - 路由事件在注册表存在精确匹配的订阅时入队，否则进入该聚合的缓冲区。
    ///
    /// 检查注册表与写入缓冲区期间持有注册表读锁，
    /// 因此“是否缓冲”与发送时刻的注册表状态一致。
    pub(crate) fn route(&self, event: EventDescriptor) {
        if !event.is_routed() {
            self.enqueue(event);
            return;
        }

        let registry = self.registry.read();
        if registry.has_subscription_for(&event.event_type(), event.aggregate_id()) {
            drop(registry);
            self.enqueue(event);
            return;
        }

        let event_name = event.event_name();
        let aggregate_id = event.aggregate_id();
        let buffered = self.buffers.lock().push(event);
        drop(registry);

        debug!(
            hub = %self.name(),
            event_type = event_name,
            aggregate_id = %aggregate_id,
            buffered,
            "Buffered event for aggregate without handlers"
        );
        if self.config.buffer_warn_threshold == Some(buffered) {
            warn!(
                hub = %self.name(),
                aggregate_id = %aggregate_id,
                buffered,
                "Aggregate buffer reached warning threshold; was aggregate_ready called?"
            );
        }
    }

    pub(crate) fn enqueue(&self, event: EventDescriptor) {
        let queued = self.queue.push(event);
        self.warn_if_queue_long(queued);
    }

    pub(crate) fn enqueue_batch(&self, events: Vec<EventDescriptor>) {
        let queued = self.queue.push_batch(events);
        self.warn_if_queue_long(queued);
    }

    fn warn_if_queue_long(&self, queued: usize) {
        if self.config.queue_warn_threshold == Some(queued) {
            warn!(
                hub = %self.name(),
                queued,
                "Delivery queue reached warning threshold"
            );
        }
    }

    /// 当前注册表中匹配该事件的订阅（按注册顺序）
    pub(crate) fn matching(&self, event: &EventDescriptor) -> Vec<Subscription> {
        let snapshot = self.registry.read().snapshot(&event.event_type());
        snapshot
            .into_iter()
            .filter(|s| s.matches(event.aggregate_id()))
            .collect()
    }

    /// 后台消费者对单个事件的处理：逐个订阅交给其调度器（非阻塞）
    pub(crate) fn deliver(&self, event: &EventDescriptor) {
        let subscriptions = self.registry.read().snapshot(&event.event_type());
        if subscriptions.is_empty() {
            self.unhandled.fetch_add(1, Ordering::Relaxed);
            warn!(
                hub = %self.name(),
                event_type = event.event_name(),
                aggregate_id = event.routed_to().map(tracing::field::display),
                "No handlers registered for event"
            );
            return;
        }

        let mut matched = 0usize;
        for sub in subscriptions
            .iter()
            .filter(|s| s.matches(event.aggregate_id()))
        {
            sub.dispatcher()
                .dispatch(sub.isolated_action(event, self.tally.clone()));
            matched += 1;
        }

        if matched == 0 {
            self.unhandled.fetch_add(1, Ordering::Relaxed);
            debug!(
                hub = %self.name(),
                event_type = event.event_name(),
                aggregate_id = event.routed_to().map(tracing::field::display),
                "No subscription matched event aggregate"
            );
        }
    }

    /// 丢弃聚合的缓冲与排队事件；调用方持有注册表写锁
    pub(crate) fn discard_events(&self, aggregate_id: AggregateId) -> usize {
        let buffered = self.buffers.lock().discard(aggregate_id);
        let queued = self.queue.remove_aggregate(aggregate_id);
        if buffered + queued > 0 {
            debug!(
                hub = %self.name(),
                aggregate_id = %aggregate_id,
                buffered,
                queued,
                "Discarded events for aggregate"
            );
        }
        buffered + queued
    }

    /// 清空全部状态；调用方负责消费者的启停
    pub(crate) fn clear_state(&self) {
        let mut registry = self.registry.write();
        let handlers = registry.clear();
        let buffered = self.buffers.lock().clear();
        let queued = self.queue.clear();
        drop(registry);

        self.tally.reset();
        self.unhandled.store(0, Ordering::Relaxed);
        debug!(
            hub = %self.name(),
            handlers,
            buffered,
            queued,
            "Cleared hub state"
        );
    }
}
