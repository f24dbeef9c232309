//! 宿主环境提供的调度器实现
//!
//! - `MainLoopDispatcher`：动作排入通道，由宿主主循环调用 `pump` 时在其线程上执行；
//! - `ThreadPoolDispatcher`：动作在 rayon 线程池上执行。
//!
#[cfg(feature = "main-loop")]
mod main_loop;
#[cfg(feature = "thread-pool")]
mod thread_pool;

#[cfg(feature = "main-loop")]
pub use main_loop::MainLoopDispatcher;
#[cfg(feature = "thread-pool")]
pub use thread_pool::ThreadPoolDispatcher;
