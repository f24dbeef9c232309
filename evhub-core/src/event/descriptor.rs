use super::event_trait::routed_aggregate;
use super::{Event, EventType};
use crate::aggregate::AggregateId;
use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// 事件描述：载荷、声明类型、路由聚合与入队时间
///
/// 创建后不可变；克隆只复制载荷的引用计数，便于同一事件分发给多个处理器。
#[derive(Clone)]
pub struct EventDescriptor {
    id: Uuid,
    event_type: EventType,
    event_name: &'static str,
    aggregate_id: AggregateId,
    payload: Arc<dyn Any + Send + Sync>,
    enqueued_at: DateTime<Utc>,
}

impl EventDescriptor {
    pub fn new<E: Event>(payload: E) -> Self {
        let aggregate_id = routed_aggregate(&payload);
        let event_name = payload.event_name();

        Self {
            id: Uuid::new_v4(),
            event_type: EventType::of::<E>(),
            event_name,
            aggregate_id,
            payload: Arc::new(payload),
            enqueued_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn event_name(&self) -> &'static str {
        self.event_name
    }

    /// 路由聚合；非路由事件为空标识
    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    /// 日志用：仅在事件被路由时返回聚合标识
    pub fn routed_to(&self) -> Option<AggregateId> {
        (!self.aggregate_id.is_empty()).then_some(self.aggregate_id)
    }

    pub fn is_routed(&self) -> bool {
        !self.aggregate_id.is_empty()
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    pub fn payload(&self) -> &(dyn Any + Send + Sync) {
        self.payload.as_ref()
    }

    pub fn payload_as<E: Event>(&self) -> Option<&E> {
        self.payload.downcast_ref::<E>()
    }
}

impl fmt::Debug for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDescriptor")
            .field("id", &self.id)
            .field("event_type", &self.event_name)
            .field("aggregate_id", &self.aggregate_id)
            .field("enqueued_at", &self.enqueued_at)
            .finish_non_exhaustive()
    }
}
