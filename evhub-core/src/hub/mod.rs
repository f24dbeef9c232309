//! 分发服务（EventHub）
//!
//! 持有注册表、缓冲区、投递队列及其锁的显式上下文对象，是唯一承载业务规则的组件：
//! - `send`：异步发送，按路由决策入队或缓冲；
//! - `send_and_wait`：同步发送，不缓冲，等待当前所有匹配处理器执行完毕；
//! - `aggregate_ready`：排空聚合缓冲区，按原顺序重新入队；
//! - `register_*` / `dispose_*`：处理器的注册与清理；
//! - `start` / `shutdown` / `clear_all`：后台消费者生命周期。
//!
mod consumer;
mod shared;
mod stats;

pub use stats::{DeliveryReport, HubStats};

use self::consumer::ConsumerHandle;
use self::shared::HubShared;
use crate::aggregate::AggregateId;
use crate::config::HubConfig;
use crate::dispatcher::{Dispatcher, ImmediateDispatcher};
use crate::error::{HubError, HubResult};
use crate::event::{Event, EventDescriptor, EventType};
use crate::subscription::{HandlerId, Subscription, Tally};
use bon::bon;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

pub struct EventHub {
    shared: Arc<HubShared>,
    default_dispatcher: Arc<dyn Dispatcher>,
    consumer: Mutex<Option<ConsumerHandle>>,
}

#[bon]
impl EventHub {
    /// 构建 hub；未指定调度器时使用 `ImmediateDispatcher`
    #[builder]
    pub fn new(
        #[builder(default)] config: HubConfig,
        default_dispatcher: Option<Arc<dyn Dispatcher>>,
    ) -> Self {
        Self {
            shared: Arc::new(HubShared::new(config)),
            default_dispatcher: default_dispatcher.unwrap_or_else(|| Arc::new(ImmediateDispatcher)),
            consumer: Mutex::new(None),
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::builder().build()
    }
}

// ---------------------------------------------------------------------------
// 生命周期
// ---------------------------------------------------------------------------

impl EventHub {
    pub fn name(&self) -> &str {
        self.shared.name()
    }

    pub fn config(&self) -> &HubConfig {
        &self.shared.config
    }

    pub fn default_dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.default_dispatcher
    }

    /// 在当前 tokio 运行时上启动后台消费者
    pub fn start(&self) -> HubResult<()> {
        let runtime = Handle::try_current().map_err(|_| HubError::NoRuntime {
            hub: self.name().to_string(),
        })?;
        self.start_on(&runtime)
    }

    /// 在指定运行时上启动后台消费者
    pub fn start_on(&self, runtime: &Handle) -> HubResult<()> {
        let mut slot = self.consumer.lock();
        if slot.as_ref().is_some_and(ConsumerHandle::is_running) {
            return Err(HubError::AlreadyRunning {
                hub: self.name().to_string(),
            });
        }

        *slot = Some(ConsumerHandle::spawn(self.shared.clone(), runtime));
        info!(hub = %self.name(), "Event hub started");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.consumer
            .lock()
            .as_ref()
            .is_some_and(ConsumerHandle::is_running)
    }

    /// 协作式取消后台消费者（不等待其退出），返回之前是否在运行
    pub fn shutdown(&self) -> bool {
        self.take_consumer().is_some_and(|c| {
            let was_running = c.is_running();
            c.cancel();
            was_running
        })
    }

    /// 取消并等待后台消费者退出
    pub async fn stop(&self) {
        let consumer = self.take_consumer();
        if let Some(c) = consumer {
            c.join().await;
            info!(hub = %self.name(), "Event hub stopped");
        }
    }

    /// 终止消费者；`teardown` 为真时同时清空注册表、队列与缓冲区
    pub fn cleanup(&self, teardown: bool) {
        self.shutdown();
        if teardown {
            self.shared.clear_state();
        }
    }

    /// 完全重置：清空全部状态，并以新的取消令牌在原运行时上重启消费者（若之前在运行）
    pub fn clear_all(&self) -> HubResult<()> {
        let previous = self.take_consumer();
        let runtime = previous
            .as_ref()
            .filter(|c| c.is_running())
            .map(|c| c.runtime().clone());
        drop(previous);

        self.shared.clear_state();

        match runtime {
            Some(rt) => self.start_on(&rt),
            None => Ok(()),
        }
    }

    fn take_consumer(&self) -> Option<ConsumerHandle> {
        self.consumer.lock().take()
    }
}

// ---------------------------------------------------------------------------
// 发送
// ---------------------------------------------------------------------------

impl EventHub {
    /// 异步发送：不阻塞，不因路由原因失败
    pub fn send<E: Event>(&self, payload: E) {
        self.shared.route(EventDescriptor::new(payload));
    }

    /// 同步发送：不缓冲；逐个调用当前匹配处理器的阻塞调度，返回时全部处理器均已执行
    pub fn send_and_wait<E: Event>(&self, payload: E) -> DeliveryReport {
        let event = EventDescriptor::new(payload);
        let targets = self.targets_for(&event);
        if targets.is_empty() {
            return DeliveryReport::default();
        }

        let tally = Arc::new(Tally::child_of(self.shared.tally.clone()));
        for sub in &targets {
            sub.dispatcher()
                .dispatch_and_wait(sub.isolated_action(&event, tally.clone()));
        }

        DeliveryReport {
            matched: targets.len(),
            failed: tally.failed(),
        }
    }

    /// `send_and_wait` 的异步完成版本，使用调度器的 `dispatch_and_wait_async`
    pub async fn send_and_wait_async<E: Event>(&self, payload: E) -> DeliveryReport {
        let event = EventDescriptor::new(payload);
        let targets = self.targets_for(&event);
        if targets.is_empty() {
            return DeliveryReport::default();
        }

        let tally = Arc::new(Tally::child_of(self.shared.tally.clone()));
        for sub in &targets {
            sub.dispatcher()
                .dispatch_and_wait_async(sub.isolated_action(&event, tally.clone()))
                .await;
        }

        DeliveryReport {
            matched: targets.len(),
            failed: tally.failed(),
        }
    }

    fn targets_for(&self, event: &EventDescriptor) -> Vec<Subscription> {
        let targets = self.shared.matching(event);
        if targets.is_empty() {
            warn!(
                hub = %self.name(),
                event_type = event.event_name(),
                aggregate_id = event.routed_to().map(tracing::field::display),
                "No handlers to wait on for event"
            );
        }
        targets
    }

    /// 聚合就绪：取出其全部缓冲事件并按原顺序重新入队，返回排空数量
    pub fn aggregate_ready(&self, aggregate_id: AggregateId) -> HubResult<usize> {
        reject_empty(aggregate_id, "aggregate_ready")?;

        let drained = self.shared.buffers.lock().take(aggregate_id);
        if drained.is_empty() {
            debug!(
                hub = %self.name(),
                aggregate_id = %aggregate_id,
                "Aggregate ready; nothing buffered"
            );
            return Ok(0);
        }

        let count = drained.len();
        self.shared.enqueue_batch(drained);
        debug!(
            hub = %self.name(),
            aggregate_id = %aggregate_id,
            count,
            "Aggregate ready; re-enqueued buffered events"
        );
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// 注册
// ---------------------------------------------------------------------------

impl EventHub {
    /// 通用注册：`aggregate_id` 为空表示全局，`dispatcher` 为 `None` 时使用默认调度器
    pub fn register_handler_with<E, F>(
        &self,
        aggregate_id: AggregateId,
        dispatcher: Option<Arc<dyn Dispatcher>>,
        callback: F,
    ) -> HandlerId
    where
        E: Event,
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let dispatcher = dispatcher.unwrap_or_else(|| self.default_dispatcher.clone());
        let subscription = Subscription::new::<E, F>(aggregate_id, dispatcher, callback);
        let handler_id = subscription.id();

        debug!(
            hub = %self.name(),
            event_type = subscription.event_type().name(),
            aggregate_id = %aggregate_id,
            handler_id = %handler_id,
            dispatcher = subscription.dispatcher().name(),
            "Registered event handler"
        );
        self.shared.registry.write().insert(subscription);
        handler_id
    }

    /// 注册全局处理器（默认调度器）
    pub fn register_handler<E, F>(&self, callback: F) -> HandlerId
    where
        E: Event,
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register_handler_with(AggregateId::EMPTY, None, callback)
    }

    /// 注册全局处理器（指定调度器）
    pub fn register_handler_on<E, F>(&self, dispatcher: Arc<dyn Dispatcher>, callback: F) -> HandlerId
    where
        E: Event,
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register_handler_with(AggregateId::EMPTY, Some(dispatcher), callback)
    }

    /// 注册限定到聚合的处理器（默认调度器）；空标识视为误用
    pub fn register_aggregate_handler<E, F>(
        &self,
        aggregate_id: AggregateId,
        callback: F,
    ) -> HubResult<HandlerId>
    where
        E: Event,
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        reject_empty(aggregate_id, "register_aggregate_handler")?;
        Ok(self.register_handler_with(aggregate_id, None, callback))
    }

    /// 注册限定到聚合的处理器（指定调度器）
    pub fn register_aggregate_handler_on<E, F>(
        &self,
        aggregate_id: AggregateId,
        dispatcher: Arc<dyn Dispatcher>,
        callback: F,
    ) -> HubResult<HandlerId>
    where
        E: Event,
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        reject_empty(aggregate_id, "register_aggregate_handler_on")?;
        Ok(self.register_handler_with(aggregate_id, Some(dispatcher), callback))
    }
}

// ---------------------------------------------------------------------------
// 清理
// ---------------------------------------------------------------------------

impl EventHub {
    /// 移除某事件类型的全部处理器（不清理事件）
    pub fn dispose_handlers<E: Event>(&self) -> usize {
        self.shared
            .registry
            .write()
            .remove_type(&EventType::of::<E>())
    }

    /// 移除全部处理器（不清理事件）
    pub fn dispose_all_handlers(&self) -> usize {
        self.shared.registry.write().clear()
    }

    /// 移除某事件类型下限定到该聚合的处理器；
    /// 若聚合在所有类型下都不再有处理器，同时清理其排队与缓冲事件
    pub fn dispose_handlers_for_aggregate<E: Event>(&self, aggregate_id: AggregateId) -> usize {
        let mut registry = self.shared.registry.write();
        let removed = registry.remove_for_aggregate(&EventType::of::<E>(), aggregate_id);
        if removed > 0 && !aggregate_id.is_empty() && !registry.has_aggregate(aggregate_id) {
            self.shared.discard_events(aggregate_id);
        }
        removed
    }

    /// 按句柄移除单个处理器；清理规则同 `dispose_handlers_for_aggregate`
    pub fn dispose_handler_from_aggregate<E: Event>(
        &self,
        handler_id: HandlerId,
        aggregate_id: AggregateId,
    ) -> bool {
        let mut registry = self.shared.registry.write();
        let removed = registry.remove_handler(&EventType::of::<E>(), aggregate_id, handler_id);
        if removed && !aggregate_id.is_empty() && !registry.has_aggregate(aggregate_id) {
            self.shared.discard_events(aggregate_id);
        }
        removed
    }

    /// 丢弃聚合的排队与缓冲事件，保留其处理器
    pub fn clear_events_for_aggregate(&self, aggregate_id: AggregateId) -> HubResult<usize> {
        reject_empty(aggregate_id, "clear_events_for_aggregate")?;
        let _registry = self.shared.registry.write();
        Ok(self.shared.discard_events(aggregate_id))
    }

    /// 移除聚合在所有类型下的处理器并丢弃其事件，返回移除的处理器数量
    pub fn reset_aggregate(&self, aggregate_id: AggregateId) -> HubResult<usize> {
        reject_empty(aggregate_id, "reset_aggregate")?;
        let mut registry = self.shared.registry.write();
        let removed = registry.remove_aggregate(aggregate_id);
        self.shared.discard_events(aggregate_id);
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// 观测（仅用于监控与测试）
// ---------------------------------------------------------------------------

impl EventHub {
    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn buffered_count(&self, aggregate_id: AggregateId) -> usize {
        self.shared.buffers.lock().count(aggregate_id)
    }

    pub fn total_buffered(&self) -> usize {
        self.shared.buffers.lock().total()
    }

    pub fn buffered_aggregates(&self) -> Vec<AggregateId> {
        self.shared.buffers.lock().aggregates()
    }

    pub fn has_buffered(&self, aggregate_id: AggregateId) -> bool {
        self.buffered_count(aggregate_id) > 0
    }

    pub fn handler_count<E: Event>(&self) -> usize {
        self.shared
            .registry
            .read()
            .count_for_type(&EventType::of::<E>())
    }

    pub fn aggregate_handler_count(&self, aggregate_id: AggregateId) -> usize {
        self.shared.registry.read().count_for_aggregate(aggregate_id)
    }

    pub fn total_handlers(&self) -> usize {
        self.shared.registry.read().len()
    }

    pub fn has_handlers<E: Event>(&self) -> bool {
        self.shared
            .registry
            .read()
            .contains_type(&EventType::of::<E>())
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            delivered: self.shared.tally.succeeded(),
            failed: self.shared.tally.failed(),
            unhandled: self.shared.unhandled.load(Ordering::Relaxed),
            queued: self.queue_len(),
            buffered: self.total_buffered(),
            handlers: self.total_handlers(),
        }
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("name", &self.name())
            .field("default_dispatcher", &self.default_dispatcher.name())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

fn reject_empty(aggregate_id: AggregateId, operation: &'static str) -> HubResult<()> {
    if aggregate_id.is_empty() {
        warn!(operation, "Rejected empty aggregate id");
        return Err(HubError::EmptyAggregateId { operation });
    }
    Ok(())
}

#[cfg(test)]
mod tests;
