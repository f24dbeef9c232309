//! 缓冲区（BufferStore）
//!
//! 聚合 → 先进先出队列，存放发送时尚无匹配订阅的路由事件。
//! 条目在首次缓冲时惰性创建，排空时整体移除。由 `EventHub` 以互斥锁保护。
//!
use crate::aggregate::AggregateId;
use crate::event::EventDescriptor;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Default)]
pub struct BufferStore {
    by_aggregate: HashMap<AggregateId, VecDeque<EventDescriptor>>,
}

impl BufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加到聚合的缓冲队列，返回该聚合当前缓冲数
    pub fn push(&mut self, event: EventDescriptor) -> usize {
        let queue = self.by_aggregate.entry(event.aggregate_id()).or_default();
        queue.push_back(event);
        queue.len()
    }

    /// 取出并移除聚合的全部缓冲事件（保持原顺序）；不存在时返回空列表
    pub fn take(&mut self, aggregate_id: AggregateId) -> Vec<EventDescriptor> {
        self.by_aggregate
            .remove(&aggregate_id)
            .map(Vec::from)
            .unwrap_or_default()
    }

    /// 丢弃聚合的缓冲事件，返回丢弃数量
    pub fn discard(&mut self, aggregate_id: AggregateId) -> usize {
        self.by_aggregate.remove(&aggregate_id).map_or(0, |q| q.len())
    }

    pub fn count(&self, aggregate_id: AggregateId) -> usize {
        self.by_aggregate.get(&aggregate_id).map_or(0, VecDeque::len)
    }

    pub fn total(&self) -> usize {
        self.by_aggregate.values().map(VecDeque::len).sum()
    }

    pub fn aggregates(&self) -> Vec<AggregateId> {
        self.by_aggregate.keys().copied().collect()
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.total();
        self.by_aggregate.clear();
        removed
    }
}
