//! 订阅（Subscription）与处理器类型擦除
//!
//! 注册时把强类型回调 `Fn(&E) -> anyhow::Result<()>` 擦除为统一形态存入注册表，
//! 调用时再向下转型回 `E`。每次调用都包裹错误隔离：回调返回的错误与 panic
//! 在这里被捕获、记录，不会影响同一事件的其他处理器或后续事件。
//!
use crate::aggregate::AggregateId;
use crate::dispatcher::{Action, Dispatcher};
use crate::error::HubError;
use crate::event::{Event, EventDescriptor, EventType};
use std::any::{Any, type_name};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{error, warn};

pub(crate) type ErasedHandler =
    Arc<dyn Fn(&(dyn Any + Send + Sync)) -> anyhow::Result<()> + Send + Sync>;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// 处理器句柄：注册时返回，用于之后移除该处理器实例
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    fn next() -> Self {
        Self(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h-{}", self.0)
    }
}

/// 一条注册记录：处理器、执行它的调度器与聚合作用域（空 = 全局）
///
/// 创建后不再修改；需要变更时先移除再重新注册。
#[derive(Clone)]
pub struct Subscription {
    id: HandlerId,
    event_type: EventType,
    aggregate_id: AggregateId,
    dispatcher: Arc<dyn Dispatcher>,
    handler: ErasedHandler,
}

impl Subscription {
    pub(crate) fn new<E, F>(
        aggregate_id: AggregateId,
        dispatcher: Arc<dyn Dispatcher>,
        callback: F,
    ) -> Self
    where
        E: Event,
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            id: HandlerId::next(),
            event_type: EventType::of::<E>(),
            aggregate_id,
            dispatcher,
            handler: erase(callback),
        }
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    pub fn is_global(&self) -> bool {
        self.aggregate_id.is_empty()
    }

    pub fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.dispatcher
    }

    /// 匹配规则：全局订阅接收所有事件；限定订阅只接收同一聚合的事件
    pub fn matches(&self, event_aggregate: AggregateId) -> bool {
        self.aggregate_id.is_empty() || self.aggregate_id == event_aggregate
    }

    /// 构造交给调度器的 `Action`，调用结果计入 `tally`
    pub(crate) fn isolated_action(&self, event: &EventDescriptor, tally: Arc<Tally>) -> Action {
        let handler = self.handler.clone();
        let handler_id = self.id;
        let event = event.clone();

        Box::new(move || {
            let ok = invoke_isolated(handler_id, &handler, &event);
            tally.record(ok);
        })
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("event_type", &self.event_type.name())
            .field("aggregate_id", &self.aggregate_id)
            .field("dispatcher", &self.dispatcher.name())
            .finish_non_exhaustive()
    }
}

fn erase<E, F>(callback: F) -> ErasedHandler
where
    E: Event,
    F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(move |payload: &(dyn Any + Send + Sync)| match payload.downcast_ref::<E>() {
        Some(event) => callback(event),
        // 正常情况下不会发生：注册表以 E 的 TypeId 为键
        None => Err(HubError::TypeMismatch {
            expected: type_name::<E>(),
            found: "unknown",
        }
        .into()),
    })
}

fn invoke_isolated(handler_id: HandlerId, handler: &ErasedHandler, event: &EventDescriptor) -> bool {
    let result = panic::catch_unwind(AssertUnwindSafe(|| handler(event.payload())));

    match result {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            warn!(
                event_type = event.event_name(),
                aggregate_id = event.routed_to().map(tracing::field::display),
                handler_id = %handler_id,
                error = %err,
                "Event handler failed"
            );
            false
        }
        Err(panic) => {
            let panic_msg = if let Some(s) = panic.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            error!(
                event_type = event.event_name(),
                aggregate_id = event.routed_to().map(tracing::field::display),
                handler_id = %handler_id,
                panic = %panic_msg,
                "Event handler panicked"
            );
            false
        }
    }
}

/// 处理器调用计数；可挂接父计数器，使单次调用的结果同时计入全局统计
#[derive(Debug, Default)]
pub(crate) struct Tally {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    parent: Option<Arc<Tally>>,
}

impl Tally {
    pub(crate) fn child_of(parent: Arc<Tally>) -> Self {
        Self {
            parent: Some(parent),
            ..Default::default()
        }
    }

    fn record(&self, ok: bool) {
        if ok {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(parent) = &self.parent {
            parent.record(ok);
        }
    }

    pub(crate) fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub(crate) fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub(crate) fn reset(&self) {
        self.succeeded.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
    }
}
