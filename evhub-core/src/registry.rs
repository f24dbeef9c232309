//! 处理器注册表（HandlerRegistry）
//!
//! 事件类型 → 订阅列表；列表内按注册顺序排列，即投递时的调用顺序。
//! 注册表本身不加锁，由 `EventHub` 以读写锁整体保护。
//!
use crate::aggregate::AggregateId;
use crate::event::EventType;
use crate::subscription::{HandlerId, Subscription};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct HandlerRegistry {
    by_type: HashMap<EventType, Vec<Subscription>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, subscription: Subscription) {
        self.by_type
            .entry(subscription.event_type())
            .or_default()
            .push(subscription);
    }

    /// 返回快照副本：分发期间并发的注册/移除不会影响本次迭代
    pub fn snapshot(&self, event_type: &EventType) -> Vec<Subscription> {
        self.by_type.get(event_type).cloned().unwrap_or_default()
    }

    /// 是否存在与该 (类型, 聚合) 精确匹配的订阅；用于决定路由事件直接入队还是缓冲
    pub fn has_subscription_for(&self, event_type: &EventType, aggregate_id: AggregateId) -> bool {
        self.by_type
            .get(event_type)
            .is_some_and(|list| list.iter().any(|s| s.aggregate_id() == aggregate_id))
    }

    /// 聚合在任意事件类型下是否还有订阅
    pub fn has_aggregate(&self, aggregate_id: AggregateId) -> bool {
        self.by_type
            .values()
            .flatten()
            .any(|s| s.aggregate_id() == aggregate_id)
    }

    pub fn contains_type(&self, event_type: &EventType) -> bool {
        self.by_type.contains_key(event_type)
    }

    pub fn count_for_type(&self, event_type: &EventType) -> usize {
        self.by_type.get(event_type).map_or(0, Vec::len)
    }

    pub fn count_for_aggregate(&self, aggregate_id: AggregateId) -> usize {
        self.by_type
            .values()
            .flatten()
            .filter(|s| s.aggregate_id() == aggregate_id)
            .count()
    }

    pub fn len(&self) -> usize {
        self.by_type.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// 移除某类型的全部订阅
    pub fn remove_type(&mut self, event_type: &EventType) -> usize {
        self.by_type.remove(event_type).map_or(0, |list| list.len())
    }

    /// 移除某类型下限定到该聚合的订阅
    pub fn remove_for_aggregate(&mut self, event_type: &EventType, aggregate_id: AggregateId) -> usize {
        self.retain_in(event_type, |s| s.aggregate_id() != aggregate_id)
    }

    /// 移除该聚合在所有类型下的订阅
    pub fn remove_aggregate(&mut self, aggregate_id: AggregateId) -> usize {
        let mut removed = 0;
        self.by_type.retain(|_, list| {
            let before = list.len();
            list.retain(|s| s.aggregate_id() != aggregate_id);
            removed += before - list.len();
            !list.is_empty()
        });
        removed
    }

    /// 按 (类型, 聚合, 句柄) 移除单个订阅
    pub fn remove_handler(
        &mut self,
        event_type: &EventType,
        aggregate_id: AggregateId,
        handler_id: HandlerId,
    ) -> bool {
        self.retain_in(event_type, |s| {
            !(s.id() == handler_id && s.aggregate_id() == aggregate_id)
        }) > 0
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.len();
        self.by_type.clear();
        removed
    }

    // 列表被清空时删除该类型条目
    fn retain_in(
        &mut self,
        event_type: &EventType,
        keep: impl FnMut(&Subscription) -> bool,
    ) -> usize {
        let Some(list) = self.by_type.get_mut(event_type) else {
            return 0;
        };

        let before = list.len();
        list.retain(keep);
        let removed = before - list.len();

        if list.is_empty() {
            self.by_type.remove(event_type);
        }
        removed
    }
}
