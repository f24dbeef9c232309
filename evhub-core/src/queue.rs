//! 投递队列（DeliveryQueue）
//!
//! 单一 FIFO 队列，等待唯一的后台消费者异步处理。入队只持有短暂的互斥锁；
//! 队列为空时消费者通过 `Notify` 挂起，而不是轮询空转。
//!
use crate::aggregate::AggregateId;
use crate::event::EventDescriptor;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct DeliveryQueue {
    items: Mutex<VecDeque<EventDescriptor>>,
    notify: Notify,
}

impl DeliveryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 入队并唤醒消费者，返回入队后的队列长度
    pub fn push(&self, event: EventDescriptor) -> usize {
        let len = {
            let mut items = self.items.lock();
            items.push_back(event);
            items.len()
        };
        self.notify.notify_one();
        len
    }

    /// 在一次加锁内整体追加，保证这一批事件在队列中连续且有序
    pub fn push_batch(&self, events: impl IntoIterator<Item = EventDescriptor>) -> usize {
        let len = {
            let mut items = self.items.lock();
            items.extend(events);
            items.len()
        };
        self.notify.notify_one();
        len
    }

    pub fn pop(&self) -> Option<EventDescriptor> {
        self.items.lock().pop_front()
    }

    /// 等待新的入队通知；若在等待前已有通知，则立即返回
    pub async fn notified(&self) {
        self.notify.notified().await;
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// 移除属于该聚合、尚未被消费的事件
    pub fn remove_aggregate(&self, aggregate_id: AggregateId) -> usize {
        let mut items = self.items.lock();
        let before = items.len();
        items.retain(|e| e.aggregate_id() != aggregate_id);
        before - items.len()
    }

    pub fn clear(&self) -> usize {
        let mut items = self.items.lock();
        let removed = items.len();
        items.clear();
        removed
    }
}
