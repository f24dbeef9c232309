//! 进程内事件分发引擎（evhub-core）
//!
//! 生产者提交强类型事件载荷，独立注册的处理器接收事件：
//! - 处理器可以是全局的，也可以限定到某个聚合（`AggregateId`）；
//! - 每个处理器通过调用方指定的调度器（`Dispatcher`）执行；
//! - 发往尚无处理器的聚合的事件会被缓冲，聚合就绪（`aggregate_ready`）后按原顺序补投。
//!
//! 本 crate 只包含分发核心：处理器注册表、投递队列、按聚合缓冲/排空协议、
//! 路由决策与调度器契约。具体的执行策略（主循环、线程池）由 `evhub-dispatch` 或宿主环境提供。
//!
//! 典型用法：
//! 1. 为事件类型实现 `Event`（需要按聚合路由时同时实现 `RoutableEvent`，或使用 `#[event]` 宏）；
//! 2. 构建 `EventHub` 并在 tokio 运行时内调用 `start` 启动后台消费者；
//! 3. 通过 `register_*` 注册处理器，`send`/`send_and_wait` 发送事件；
//! 4. 聚合初始化完成后调用 `aggregate_ready`，补投其缓冲事件。
//!
pub mod aggregate;
pub mod buffer;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod global;
pub mod hub;
pub mod queue;
pub mod registry;
pub mod subscription;

pub use aggregate::AggregateId;
pub use config::HubConfig;
pub use dispatcher::{Action, Dispatcher, ImmediateDispatcher};
pub use error::{HubError, HubResult};
pub use event::{Event, EventDescriptor, EventType, RoutableEvent};
pub use hub::{DeliveryReport, EventHub, HubStats};
pub use subscription::HandlerId;

// 允许在本 crate 内部通过 ::evhub_core 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::evhub_core 路径。
extern crate self as evhub_core;
