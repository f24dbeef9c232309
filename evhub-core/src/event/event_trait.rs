use crate::aggregate::AggregateId;
use std::any::{Any, type_name};

/// 事件载荷需要满足的通用能力边界
///
/// 路由能力通过 `as_routable` 在运行时查询：默认返回 `None`，事件以全局方式投递；
/// 实现了 `RoutableEvent` 的载荷应返回 `Some(self)`，事件将按其聚合标识路由。
pub trait Event: Any + Send + Sync {
    /// 事件类型名（用于日志与诊断），默认使用 Rust 类型名
    fn event_name(&self) -> &'static str {
        type_name::<Self>()
    }

    /// 查询可路由能力
    fn as_routable(&self) -> Option<&dyn RoutableEvent> {
        None
    }
}

/// 可路由事件：暴露所属聚合的标识
pub trait RoutableEvent: Send + Sync {
    fn aggregate_id(&self) -> AggregateId;
}

/// 计算事件的路由聚合：不具备路由能力时为空标识
pub(crate) fn routed_aggregate<E: Event + ?Sized>(event: &E) -> AggregateId {
    event
        .as_routable()
        .map(|r| r.aggregate_id())
        .unwrap_or(AggregateId::EMPTY)
}
