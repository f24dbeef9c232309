//! 调度器（Dispatcher）协议
//!
//! 调度器是可插拔的执行策略，决定处理器回调在哪个线程/循环上、以何种方式运行。
//! 核心只依赖本协议；主循环、线程池等具体策略由宿主环境提供。
//!
//! 核心交给调度器的 `Action` 已经包裹了错误隔离：回调返回的错误与 panic 都在
//! `Action` 内部被捕获并记录，调度器无需也不应自行吞掉它们。
//!
mod immediate;

pub use immediate::ImmediateDispatcher;

use async_trait::async_trait;

/// 交给调度器执行的一次处理器调用
pub type Action = Box<dyn FnOnce() + Send + 'static>;

/// 调度器：按自身的并发模型执行 `Action`
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// 调度器名称（用于日志）
    fn name(&self) -> &str;

    /// 安排执行并立即返回
    fn dispatch(&self, action: Action);

    /// 安排执行并阻塞调用方直到完成；
    /// 若调用方已处于该策略的宿主执行上下文，则直接内联执行
    fn dispatch_and_wait(&self, action: Action);

    /// 协作式调度环境下的异步完成版本
    async fn dispatch_and_wait_async(&self, action: Action);
}
