//! 事件载荷能力与事件描述
//!
//! 定义载荷需要实现的最小接口（`Event`）、可选的路由能力（`RoutableEvent`），
//! 以及入队时构造的不可变记录 `EventDescriptor`。

mod descriptor;
mod event_trait;
mod event_type;

pub use descriptor::EventDescriptor;
pub use event_trait::{Event, RoutableEvent};
pub use event_type::EventType;
