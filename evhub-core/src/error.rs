//! 分发引擎统一错误定义
//!
//! 只覆盖 API 误用与生命周期错误；处理器内部的失败在调度边界被隔离并记录日志，
//! 不会以 `HubError` 的形式返回给生产者。
//!
use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HubError {
    // --- API 误用 ---
    #[error("empty aggregate id: operation={operation}")]
    EmptyAggregateId { operation: &'static str },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    // --- 生命周期 ---
    #[error("no tokio runtime available: hub={hub}")]
    NoRuntime { hub: String },
    #[error("consumer already running: hub={hub}")]
    AlreadyRunning { hub: String },

    // --- 调度器 ---
    #[error("dispatcher error: dispatcher={dispatcher}, reason={reason}")]
    Dispatcher { dispatcher: String, reason: String },
}

impl HubError {
    pub fn dispatcher(dispatcher: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Dispatcher {
            dispatcher: dispatcher.into(),
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type HubResult<T> = Result<T, HubError>;
